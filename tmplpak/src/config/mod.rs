//! Configuration management for tmplpak
//!
//! Settings are loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `TMPLPAK_` prefix, `__` for
//!    nesting)
//! 2. The TOML file passed to [`TemplateSettings::load_from`]
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! base_dir = "./templates"
//! reload = false
//! escaping = "html"
//! error_template = "error"
//! failure_policy = "retry"
//!
//! [[templates]]
//! name = "home"
//! files = ["layout.html", "home.html"]
//!
//! [[templates]]
//! name = "error"
//! files = ["layout.html", "error.html"]
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tmplpak::config::TemplateSettings;
//! use tmplpak::template::FunctionTable;
//!
//! # fn example() -> anyhow::Result<()> {
//! let settings = TemplateSettings::load_from("./tmplpak.toml")?;
//! let helper = settings.render_helper(FunctionTable::new());
//! # Ok(())
//! # }
//! ```

use crate::render::RenderHelper;
use crate::template::{Escaping, FailurePolicy, FunctionTable, Loader, TemplateConfig};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "TMPLPAK_";

/// Template loader and render helper settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory that relative template paths are resolved against
    pub base_dir: PathBuf,

    /// Recompile templates on every lookup (development)
    pub reload: bool,

    /// Output escaping mode
    pub escaping: Escaping,

    /// Template rendered for error pages
    pub error_template: Option<String>,

    /// Whether failed compiles are cached
    pub failure_policy: FailurePolicy,

    /// Templates registered at startup
    pub templates: Vec<TemplateConfig>,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./templates"),
            reload: cfg!(debug_assertions),
            escaping: Escaping::Html,
            error_template: None,
            failure_policy: FailurePolicy::Retry,
            templates: Vec::new(),
        }
    }
}

impl TemplateSettings {
    /// Load settings from defaults, `path` and the environment
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment variable holds an
    /// invalid value.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings = Self::figment(path.as_ref()).extract()?;
        Ok(settings)
    }

    /// The layered configuration used by [`TemplateSettings::load_from`]
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Build a loader with every configured template registered
    #[must_use]
    pub fn loader(&self, functions: FunctionTable) -> Loader {
        let mut loader = Loader::builder(&self.base_dir)
            .reload(self.reload)
            .escaping(self.escaping)
            .functions(functions)
            .failure_policy(self.failure_policy)
            .build();
        for config in &self.templates {
            loader.register(config.clone());
        }
        loader
    }

    /// Build a render helper over a freshly built loader
    #[must_use]
    pub fn render_helper(&self, functions: FunctionTable) -> RenderHelper {
        let helper = RenderHelper::new(Arc::new(self.loader(functions)));
        match &self.error_template {
            Some(name) => helper.with_error_template(name.clone()),
            None => helper,
        }
    }
}
