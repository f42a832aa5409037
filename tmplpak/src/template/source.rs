//! Template sources: turning a list of files into a compiled [`Template`]
//!
//! Two strategies ship with the crate:
//!
//! - [`HtmlSource`] escapes every interpolated value for HTML. Use it for any
//!   template whose data may contain user-influenced content.
//! - [`TextSource`] performs no escaping. Use it only for non-HTML output or
//!   fully trusted data.
//!
//! Both compile all listed files into one `minijinja` environment. Every file
//! is registered under its base name, so files can `{% include %}`,
//! `{% extends %}` or `{% import %}` one another within the compiled unit.

use super::{FunctionTable, Template};
use crate::error::{LoadError, RenderError};
use minijinja::{AutoEscape, Environment, ErrorKind, Value};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Strategy that compiles template files
///
/// Any closure with the matching signature is a source, which makes it easy to
/// plug in a different engine or a counting stub in tests.
pub trait TemplateSource: Send + Sync {
    /// Compile `files` into one template known as `name`
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or does not compile.
    fn compile(
        &self,
        name: &str,
        functions: &FunctionTable,
        files: &[PathBuf],
    ) -> Result<Arc<dyn Template>, LoadError>;
}

impl<F> TemplateSource for F
where
    F: Fn(&str, &FunctionTable, &[PathBuf]) -> Result<Arc<dyn Template>, LoadError>
        + Send
        + Sync,
{
    fn compile(
        &self,
        name: &str,
        functions: &FunctionTable,
        files: &[PathBuf],
    ) -> Result<Arc<dyn Template>, LoadError> {
        self(name, functions, files)
    }
}

/// Output escaping mode, selecting one of the built-in sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escaping {
    /// HTML auto-escaping ([`HtmlSource`])
    #[default]
    Html,
    /// No escaping ([`TextSource`])
    Text,
}

impl Escaping {
    /// The built-in source for this mode
    #[must_use]
    pub fn source(self) -> Arc<dyn TemplateSource> {
        match self {
            Self::Html => Arc::new(HtmlSource),
            Self::Text => Arc::new(TextSource),
        }
    }

    const fn auto_escape(self) -> AutoEscape {
        match self {
            Self::Html => AutoEscape::Html,
            Self::Text => AutoEscape::None,
        }
    }
}

/// Escaping-aware source
///
/// The root template is named after the base name of the first file.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSource;

impl TemplateSource for HtmlSource {
    fn compile(
        &self,
        name: &str,
        functions: &FunctionTable,
        files: &[PathBuf],
    ) -> Result<Arc<dyn Template>, LoadError> {
        let first = files.first().ok_or_else(|| LoadError::NoFiles(name.to_string()))?;
        let root = base_name(first);
        let compiled = CompiledTemplate::compile(name, &root, Escaping::Html, functions, files)?;
        Ok(Arc::new(compiled))
    }
}

/// Plain-text source
///
/// The root template is named after the logical template name.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSource;

impl TemplateSource for TextSource {
    fn compile(
        &self,
        name: &str,
        functions: &FunctionTable,
        files: &[PathBuf],
    ) -> Result<Arc<dyn Template>, LoadError> {
        let compiled = CompiledTemplate::compile(name, name, Escaping::Text, functions, files)?;
        Ok(Arc::new(compiled))
    }
}

/// A set of template files compiled into one `minijinja` environment
#[derive(Debug)]
pub struct CompiledTemplate {
    env: Environment<'static>,
    root: String,
    escaping: Escaping,
}

impl CompiledTemplate {
    /// Read and compile `files`, exposing the first one as `root`
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoFiles`] for an empty list, [`LoadError::Read`]
    /// for unreadable files and [`LoadError::Compile`] for syntax errors.
    pub fn compile(
        name: &str,
        root: &str,
        escaping: Escaping,
        functions: &FunctionTable,
        files: &[PathBuf],
    ) -> Result<Self, LoadError> {
        if files.is_empty() {
            return Err(LoadError::NoFiles(name.to_string()));
        }

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        let auto_escape = escaping.auto_escape();
        env.set_auto_escape_callback(move |_| auto_escape);
        functions.install(&mut env);

        for (idx, path) in files.iter().enumerate() {
            let content = std::fs::read_to_string(path)
                .map_err(|err| LoadError::read(path.clone(), err))?;
            let file_name = base_name(path);
            if idx == 0 && file_name != root {
                env.add_template_owned(root.to_string(), content.clone())
                    .map_err(|err| LoadError::compile(name, err))?;
            }
            env.add_template_owned(file_name, content)
                .map_err(|err| LoadError::compile(name, err))?;
        }

        Ok(Self {
            env,
            root: root.to_string(),
            escaping,
        })
    }

    /// Escaping mode the template was compiled with
    #[must_use]
    pub const fn escaping(&self) -> Escaping {
        self.escaping
    }
}

impl Template for CompiledTemplate {
    fn name(&self) -> &str {
        &self.root
    }

    fn render_to(&self, out: &mut dyn Write, data: &Value) -> Result<(), RenderError> {
        self.env.get_template(&self.root)?.render_to_write(data, out)?;
        Ok(())
    }

    fn render_named_to(
        &self,
        out: &mut dyn Write,
        name: &str,
        data: &Value,
    ) -> Result<(), RenderError> {
        if let Ok(template) = self.env.get_template(name) {
            template.render_to_write(data, out)?;
            return Ok(());
        }

        let root = self.env.get_template(&self.root)?;
        let mut state = root.eval_to_state(data)?;
        let rendered = state.render_block(name).map_err(|err| match err.kind() {
            ErrorKind::UnknownBlock => RenderError::MissingSubTemplate(name.to_string()),
            _ => RenderError::Template(err),
        })?;
        out.write_all(rendered.as_bytes())?;
        Ok(())
    }
}

/// Final path component, used as the template's name inside the environment
fn base_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_html_source_escapes_output() {
        let dir = TempDir::new().unwrap();
        let page = write(&dir, "page.html", "<p>{{ body }}</p>");

        let template = HtmlSource
            .compile("page", &FunctionTable::new(), &[page])
            .unwrap();
        let out = template
            .render(&context! { body => "<script>alert(1)" })
            .unwrap();

        assert_eq!(out, "<p>&lt;script&gt;alert(1)</p>");
        assert_eq!(template.name(), "page.html");
    }

    #[test]
    fn test_text_source_does_not_escape() {
        let dir = TempDir::new().unwrap();
        let mail = write(&dir, "mail.txt", "Hi {{ name }}");

        let template = TextSource
            .compile("welcome-mail", &FunctionTable::new(), &[mail])
            .unwrap();
        let out = template.render(&context! { name => "<Ann & Bob>" }).unwrap();

        assert_eq!(out, "Hi <Ann & Bob>");
        assert_eq!(template.name(), "welcome-mail");
    }

    #[test]
    fn test_files_compose_by_base_name() {
        let dir = TempDir::new().unwrap();
        let layout = write(
            &dir,
            "layout.html",
            "<main>{% block content %}{% endblock %}</main>",
        );
        let page = write(
            &dir,
            "page.html",
            "{% extends \"layout.html\" %}{% block content %}{% include \"nav.html\" %}{{ title }}{% endblock %}",
        );
        let nav = write(&dir, "nav.html", "<nav></nav>");

        let template = HtmlSource
            .compile("page", &FunctionTable::new(), &[page, layout, nav])
            .unwrap();
        let out = template.render(&context! { title => "Home" }).unwrap();

        assert_eq!(out, "<main><nav></nav>Home</main>");
    }

    #[test]
    fn test_render_named_file_and_block() {
        let dir = TempDir::new().unwrap();
        let page = write(
            &dir,
            "page.html",
            "{% block header %}H:{{ title }}{% endblock %}|body",
        );
        let footer = write(&dir, "footer.html", "F:{{ title }}");

        let template = HtmlSource
            .compile("page", &FunctionTable::new(), &[page, footer])
            .unwrap();
        let data = context! { title => "x" };

        let mut out = Vec::new();
        template.render_named_to(&mut out, "footer.html", &data).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "F:x");

        let mut out = Vec::new();
        template.render_named_to(&mut out, "header", &data).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "H:x");

        let mut out = Vec::new();
        let err = template
            .render_named_to(&mut out, "sidebar", &data)
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingSubTemplate(ref n) if n == "sidebar"));
    }

    #[test]
    fn test_functions_available_in_templates() {
        let dir = TempDir::new().unwrap();
        let page = write(&dir, "page.html", "{{ shout(word) }}");
        let functions =
            FunctionTable::new().with("shout", Value::from_function(|s: String| s.to_uppercase()));

        let template = HtmlSource.compile("page", &functions, &[page]).unwrap();
        assert_eq!(template.render(&context! { word => "hey" }).unwrap(), "HEY");
    }

    #[test]
    fn test_compile_errors() {
        let dir = TempDir::new().unwrap();
        let broken = write(&dir, "broken.html", "{% if %}");
        let missing = dir.path().join("missing.html");

        let err = HtmlSource
            .compile("broken", &FunctionTable::new(), &[broken])
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Compile { ref name, .. } if name == "broken"));

        let err = TextSource
            .compile("missing", &FunctionTable::new(), &[missing.clone()])
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Read { ref path, .. } if *path == missing));

        let err = HtmlSource
            .compile("empty", &FunctionTable::new(), &[])
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::NoFiles(ref n) if n == "empty"));
    }

    #[test]
    fn test_closure_is_a_source() {
        let dir = TempDir::new().unwrap();
        let page = write(&dir, "page.html", "static");
        let source = |name: &str, functions: &FunctionTable, files: &[PathBuf]| {
            TextSource.compile(name, functions, files)
        };

        let template = source
            .compile("page", &FunctionTable::new(), &[page])
            .unwrap();
        assert_eq!(template.render(&Value::UNDEFINED).unwrap(), "static");
    }

    #[test]
    fn test_escaping_selects_source() {
        let dir = TempDir::new().unwrap();
        let page = write(&dir, "page.html", "{{ v }}");
        let data = context! { v => "<b>" };

        let html = Escaping::Html
            .source()
            .compile("page", &FunctionTable::new(), &[page.clone()])
            .unwrap();
        let text = Escaping::Text
            .source()
            .compile("page", &FunctionTable::new(), &[page])
            .unwrap();

        assert_eq!(html.render(&data).unwrap(), "&lt;b&gt;");
        assert_eq!(text.render(&data).unwrap(), "<b>");
    }
}
