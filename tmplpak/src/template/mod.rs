//! Named template loading and rendering
//!
//! This module provides:
//! - the [`Template`] trait implemented by every compiled template
//! - pluggable [`TemplateSource`] compilers (HTML-escaping and plain text)
//! - the [`Loader`], which maps logical names to file lists and caches the
//!   compiled result
//! - template helper functions ([`FunctionTable`], [`ResourceUrl`])
//!
//! # Examples
//!
//! ```rust,no_run
//! use tmplpak::template::{FunctionTable, Loader, TemplateConfig};
//!
//! let mut loader = Loader::new(FunctionTable::new(), "./templates");
//! loader.register(TemplateConfig::new("home", ["layout.html", "home.html"]));
//!
//! let home = loader.must_get("home");
//! let html = home.render(&minijinja::context! { title => "Welcome" }).unwrap();
//! ```

use crate::error::RenderError;
use minijinja::Value;
use std::io::Write;

pub mod functions;
pub mod helpers;
pub mod loader;
pub mod source;

pub use functions::FunctionTable;
pub use helpers::ResourceUrl;
pub use loader::{FailurePolicy, Loader, LoaderBuilder, TemplateConfig, TemplateLoader};
pub use source::{CompiledTemplate, Escaping, HtmlSource, TemplateSource, TextSource};

/// A compiled, reusable rendering unit
///
/// Implementations are shared between threads and must not mutate
/// themselves while rendering. If rendering fails part-way, partial output may
/// already have been written to `out`.
pub trait Template: Send + Sync {
    /// Name of the root template that [`Template::render_to`] executes
    fn name(&self) -> &str;

    /// Render the whole template into `out`
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails or `out` rejects a write.
    fn render_to(&self, out: &mut dyn Write, data: &Value) -> Result<(), RenderError>;

    /// Render the sub-template called `name` into `out`
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingSubTemplate`] if no such sub-template
    /// exists, or any evaluation or write error.
    fn render_named_to(
        &self,
        out: &mut dyn Write,
        name: &str,
        data: &Value,
    ) -> Result<(), RenderError>;

    /// Render the whole template into a string
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails or the output is not UTF-8.
    fn render(&self, data: &Value) -> Result<String, RenderError> {
        let mut buf = Vec::new();
        self.render_to(&mut buf, data)?;
        String::from_utf8(buf)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err).into())
    }
}
