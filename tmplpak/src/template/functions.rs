//! Function-extension table shared by every compiled template
//!
//! Each entry maps a name to a callable [`Value`]. Argument conversion and
//! arity checks are left to the template engine, so typed Rust closures can
//! be registered directly:
//!
//! ```rust
//! use minijinja::Value;
//! use tmplpak::template::FunctionTable;
//!
//! let functions = FunctionTable::new()
//!     .with("shout", Value::from_function(|s: String| s.to_uppercase()))
//!     .with_fn("count", |args| Ok(Value::from(args.len())));
//! assert_eq!(functions.len(), 2);
//! ```

use minijinja::value::Rest;
use minijinja::{Environment, Value};
use std::collections::BTreeMap;

/// Named callables made available inside template bodies
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: BTreeMap<String, Value>,
}

impl FunctionTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a callable value, replacing any previous entry with that name
    ///
    /// `function` should be created with [`Value::from_function`] or be some
    /// other callable object; plain values are exposed as globals unchanged.
    pub fn insert(&mut self, name: impl Into<String>, function: Value) -> &mut Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Insert an untyped function receiving all arguments as a slice
    pub fn insert_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static,
    {
        let function = Value::from_function(move |args: Rest<Value>| f(&args.0));
        self.insert(name, function)
    }

    /// Builder form of [`FunctionTable::insert`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, function: Value) -> Self {
        self.insert(name, function);
        self
    }

    /// Builder form of [`FunctionTable::insert_fn`]
    #[must_use]
    pub fn with_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static,
    {
        self.insert_fn(name, f);
        self
    }

    /// Look up a function by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.functions.get(name)
    }

    /// Registered function names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Number of registered functions
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True if no functions are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Expose every function as a global of `env`
    pub(crate) fn install(&self, env: &mut Environment<'_>) {
        for (name, function) in &self.functions {
            env.add_global(name.clone(), function.clone());
        }
    }
}
