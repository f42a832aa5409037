//! Template loader with caching support
//!
//! The [`Loader`] owns a registry of [`TemplateConfig`]s and a cache of
//! compiled templates. In reload mode templates are recompiled on every
//! lookup; otherwise they are compiled once and shared.

use super::{Escaping, FunctionTable, Template, TemplateSource};
use crate::error::LoadError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Span;

/// Registration record mapping a logical name to its source files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Logical template name, unique within a loader
    pub name: String,

    /// Template files, relative to the loader's base directory or absolute
    pub files: Vec<PathBuf>,
}

impl TemplateConfig {
    /// Create a config for `name` made of `files`
    pub fn new<I, P>(name: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve every file against `base_dir`; absolute paths are kept as-is
    #[must_use]
    pub fn resolve(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|file| {
                if file.is_absolute() {
                    file.clone()
                } else {
                    base_dir.join(file)
                }
            })
            .collect()
    }
}

/// What the loader does with a failed compile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Failures are never cached; every lookup compiles again
    #[default]
    Retry,
    /// The first failure for a name is cached and returned on later lookups
    Remember,
}

/// Lookup half of a loader, as used by the render helper
///
/// [`Loader`] is the production implementation; tests and applications can
/// plug in anything else that hands out compiled templates by name.
pub trait TemplateLoader: Send + Sync {
    /// Look up a compiled template by name
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] for unknown names, or whatever error
    /// prevented the template from being compiled.
    fn get(&self, name: &str) -> Result<Arc<dyn Template>, LoadError>;

    /// Look up a template that must exist
    ///
    /// # Panics
    ///
    /// Panics if [`TemplateLoader::get`] fails.
    fn must_get(&self, name: &str) -> Arc<dyn Template> {
        match self.get(name) {
            Ok(template) => template,
            Err(err) => panic!("cannot get template: {err}"),
        }
    }
}

/// Named template loader
///
/// Register every template before sharing the loader (registration needs
/// `&mut self`), then wrap it in an [`Arc`] and call [`Loader::get`] from as
/// many threads as needed. Concurrent misses for the same name may compile
/// it more than once; one of the results ends up in the cache.
///
/// Cached templates stay valid for the lifetime of the loader. Log records
/// are emitted in the caller's current span unless one was injected with
/// [`LoaderBuilder::span`].
pub struct Loader {
    base_dir: PathBuf,
    reload: bool,
    source: Arc<dyn TemplateSource>,
    functions: FunctionTable,
    failure_policy: FailurePolicy,
    configs: HashMap<String, TemplateConfig>,
    cache: RwLock<HashMap<String, Arc<dyn Template>>>,
    failures: RwLock<HashMap<String, LoadError>>,
    span: Span,
}

impl Loader {
    /// Create an HTML-escaping loader rooted at `base_dir`
    #[must_use]
    pub fn new(functions: FunctionTable, base_dir: impl Into<PathBuf>) -> Self {
        Self::builder(base_dir).functions(functions).build()
    }

    /// Start configuring a loader rooted at `base_dir`
    #[must_use]
    pub fn builder(base_dir: impl Into<PathBuf>) -> LoaderBuilder {
        LoaderBuilder::new(base_dir)
    }

    /// Register a template config, replacing any config with the same name
    ///
    /// Files are not checked here; missing files surface on first lookup.
    pub fn register(&mut self, config: TemplateConfig) -> &mut Self {
        let span = self.span.clone();
        let _entered = span.enter();
        tracing::trace!(template = %config.name, files = config.files.len(), "registering template");
        self.configs.insert(config.name.clone(), config);
        self
    }

    /// Look up a compiled template by name
    ///
    /// Cache hits return the shared instance without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if `name` is not registered, or the
    /// source's error unchanged if compiling fails.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Template>, LoadError> {
        let _entered = self.span.enter();
        if !self.reload {
            if let Some(template) = self.cache.read().get(name) {
                return Ok(Arc::clone(template));
            }
            if self.failure_policy == FailurePolicy::Remember {
                if let Some(err) = self.failures.read().get(name) {
                    return Err(err.clone());
                }
            }
        }

        let config = self
            .configs
            .get(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        let files = config.resolve(&self.base_dir);

        tracing::debug!(template = name, files = files.len(), "compiling template");
        match self.source.compile(name, &self.functions, &files) {
            Ok(template) => {
                if !self.reload {
                    self.cache
                        .write()
                        .insert(name.to_string(), Arc::clone(&template));
                }
                Ok(template)
            }
            Err(err) => {
                tracing::error!(template = name, error = %err, "template compile failed");
                if !self.reload && self.failure_policy == FailurePolicy::Remember {
                    self.failures.write().insert(name.to_string(), err.clone());
                }
                Err(err)
            }
        }
    }

    /// Look up a template that must exist
    ///
    /// Meant for startup and programmer errors only; never call this with
    /// names derived from a request.
    ///
    /// # Panics
    ///
    /// Panics if [`Loader::get`] fails.
    #[must_use]
    pub fn must_get(&self, name: &str) -> Arc<dyn Template> {
        match self.get(name) {
            Ok(template) => template,
            Err(err) => {
                let _entered = self.span.enter();
                tracing::error!(template = name, error = %err, "cannot get template");
                panic!("cannot get template: {err}");
            }
        }
    }

    /// True if a config is registered under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// Registered template names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    /// Base directory that relative template paths are resolved against
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// True if templates are recompiled on every lookup
    #[must_use]
    pub const fn is_reload(&self) -> bool {
        self.reload
    }

    /// Functions exposed to every template
    #[must_use]
    pub const fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Failure caching policy
    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Number of compiled templates currently cached
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

impl TemplateLoader for Loader {
    fn get(&self, name: &str) -> Result<Arc<dyn Template>, LoadError> {
        Self::get(self, name)
    }

    fn must_get(&self, name: &str) -> Arc<dyn Template> {
        Self::must_get(self, name)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("base_dir", &self.base_dir)
            .field("reload", &self.reload)
            .field("functions", &self.functions)
            .field("failure_policy", &self.failure_policy)
            .field("configs", &self.configs)
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Loader`]
#[must_use]
pub struct LoaderBuilder {
    base_dir: PathBuf,
    reload: bool,
    source: Arc<dyn TemplateSource>,
    functions: FunctionTable,
    failure_policy: FailurePolicy,
    span: Option<Span>,
}

impl LoaderBuilder {
    fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            reload: false,
            source: Escaping::Html.source(),
            functions: FunctionTable::new(),
            failure_policy: FailurePolicy::default(),
            span: None,
        }
    }

    /// Recompile on every lookup instead of caching
    pub const fn reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    /// Use a custom template source
    pub fn source(mut self, source: impl TemplateSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Use one of the built-in sources
    pub fn escaping(mut self, escaping: Escaping) -> Self {
        self.source = escaping.source();
        self
    }

    /// Functions exposed to every template
    pub fn functions(mut self, functions: FunctionTable) -> Self {
        self.functions = functions;
        self
    }

    /// Decide whether failed compiles are cached
    pub const fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Span that the loader's log records are emitted under
    ///
    /// Without one, records join whatever span is current at the call site.
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Finish building the loader
    #[must_use]
    pub fn build(self) -> Loader {
        Loader {
            base_dir: self.base_dir,
            reload: self.reload,
            source: self.source,
            functions: self.functions,
            failure_policy: self.failure_policy,
            configs: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            span: self.span.unwrap_or_else(Span::none),
        }
    }
}
