//! Template helper functions
//!
//! Provides utilities that are commonly exposed to templates through a
//! [`FunctionTable`](super::FunctionTable).
//!
//! # Resource URLs
//!
//! ```rust
//! use tmplpak::template::helpers::ResourceUrl;
//!
//! let assets = ResourceUrl::parse("https://cdn.example.com/static").unwrap();
//! assert_eq!(
//!     assets.resolve("css", "site.css"),
//!     "https://cdn.example.com/static/css/site.css"
//! );
//! ```

use minijinja::Value;
use url::Url;

/// Builds URLs for static resources below a fixed base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUrl {
    base: Url,
}

impl ResourceUrl {
    /// Parse the base URL
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an absolute URL.
    pub fn parse(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
        })
    }

    /// Base URL every resource is resolved against
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Join the base path with `resource` and `path`
    ///
    /// The joined path is normalized: empty and `.` segments are dropped and
    /// `..` removes the previous segment, never climbing above the root.
    #[must_use]
    pub fn resolve(&self, resource: &str, path: &str) -> String {
        let mut url = self.base.clone();
        let joined = join_path(&[self.base.path(), resource, path]);
        url.set_path(&joined);
        url.to_string()
    }

    /// Expose [`ResourceUrl::resolve`] as a two-argument template function
    ///
    /// Usage in templates: `{{ static_url("css", "site.css") }}`
    #[must_use]
    pub fn into_function(self) -> Value {
        Value::from_function(move |resource: String, path: String| self.resolve(&resource, &path))
    }
}

/// Join and normalize slash-separated path fragments into an absolute path
#[must_use]
pub fn join_path(parts: &[&str]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in parts.iter().flat_map(|part| part.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FunctionTable;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_joins_segments() {
        let assets = ResourceUrl::parse("https://example.com/static/").unwrap();
        assert_eq!(
            assets.resolve("img", "logo.png"),
            "https://example.com/static/img/logo.png"
        );
    }

    #[test]
    fn test_resolve_root_base() {
        let assets = ResourceUrl::parse("http://localhost:3000").unwrap();
        assert_eq!(assets.resolve("js", "app.js"), "http://localhost:3000/js/app.js");
    }

    #[test]
    fn test_resolve_normalizes_dots() {
        let assets = ResourceUrl::parse("https://example.com/a/b").unwrap();
        assert_eq!(
            assets.resolve("../c", "./d.css"),
            "https://example.com/a/c/d.css"
        );
        assert_eq!(
            assets.resolve("../../../..", "x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(ResourceUrl::parse("/static").is_err());
    }

    #[test]
    fn test_as_template_function() {
        let assets = ResourceUrl::parse("https://cdn.example.com").unwrap();
        let functions = FunctionTable::new().with("static_url", assets.into_function());

        let mut env = minijinja::Environment::new();
        functions.install(&mut env);
        env.add_template("t", r#"{{ static_url("css", "site.css") }}"#)
            .unwrap();

        let out = env.get_template("t").unwrap().render(()).unwrap();
        assert_eq!(out, "https://cdn.example.com/css/site.css");
    }

    proptest! {
        #[test]
        fn prop_join_path_is_absolute_and_clean(parts in prop::collection::vec("[a-z./]{0,8}", 0..5)) {
            let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            let joined = join_path(&refs);
            prop_assert!(joined.starts_with('/'));
            prop_assert!(!joined.contains("//"));
            prop_assert!(!joined.split('/').any(|s| s == "." || s == ".."));
        }
    }
}
