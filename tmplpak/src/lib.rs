//! tmplpak: named template loading, caching and response rendering
//!
//! The crate is built around a [`Loader`](template::Loader) that maps logical
//! template names to lists of files, compiles them on demand with
//! `minijinja`, and caches the compiled result for concurrent use. A
//! [`RenderHelper`](render::RenderHelper) writes templates, JSON and
//! standardized error pages to HTTP responses.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tmplpak::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! tmplpak::observability::init()?;
//!
//! let mut loader = Loader::builder("./templates")
//!     .reload(cfg!(debug_assertions))
//!     .build();
//! loader.register(TemplateConfig::new("home", ["layout.html", "home.html"]));
//! loader.register(TemplateConfig::new("error", ["layout.html", "error.html"]));
//!
//! // Fail fast at startup if a template is broken
//! let _ = loader.must_get("error");
//!
//! let helper = RenderHelper::new(Arc::new(loader)).with_error_template("error");
//! # let _ = helper;
//! # Ok(())
//! # }
//! ```
//!
//! # Design Principles
//!
//! 1. **Register, then share**: registration takes `&mut self`, lookups take
//!    `&self` and are safe from any thread
//! 2. **Never leak internals**: clients see generic messages and an error id,
//!    logs carry the detail
//! 3. **Log, don't fail**: once a response has started, failures are logged

// Lint configuration is handled at the workspace level in Cargo.toml

pub mod config;
pub mod error;
pub mod observability;
pub mod render;
pub mod template;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use tmplpak::prelude::*;
    //! ```

    // Templates
    pub use crate::template::{
        Escaping, FailurePolicy, FunctionTable, HtmlSource, Loader, ResourceUrl, Template,
        TemplateConfig, TemplateLoader, TemplateSource, TextSource,
    };

    // Rendering
    pub use crate::render::{
        BufferedResponse, ErrorEntry, ErrorId, JsonEncoder, RenderHelper, RequestContext,
        ResponseSink,
    };

    // Configuration
    pub use crate::config::TemplateSettings;

    // Error types
    pub use crate::error::{LoadError, LoadErrorKind, RenderError};

    // Re-export key dependencies
    pub use minijinja;
}
