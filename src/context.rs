use std::fs;

use log::debug;

use crate::{
    Environment, Error, Object,
    builtin::{
        host::{HostFunctions, HostValue},
        special_forms::{SpecialFormFn, SpecialForms},
    },
    eval::{self, Evaluator},
    parse::Parser,
    value::Value,
};

/// Whether an [`Output`] record holds a value or an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Value,
    Error,
}

/// One result of [`Context::repl_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// The printed value, or the error message.
    pub text: String,
    pub kind: OutputKind,
}

impl Output {
    pub fn is_error(&self) -> bool {
        self.kind == OutputKind::Error
    }
}

/// Represents an instance of the interpreter.
///
/// Owns the global environment, the special form table and the host function
/// namespace.  Independent `Context`s share nothing.
pub struct Context {
    globals: Environment,
    forms: SpecialForms,
    host: HostFunctions,
    filenames: Vec<String>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context with the standard special forms and host functions.
    pub fn new() -> Self {
        Self::with_parts(
            SpecialForms::standard(),
            Environment::new(),
            HostFunctions::standard(),
        )
    }

    /// Creates a context from the given parts.  A marker for each special
    /// form and host function is bound in `globals`.
    pub fn with_parts(forms: SpecialForms, globals: Environment, host: HostFunctions) -> Self {
        for name in forms.names() {
            globals.bind(name.clone(), Value::SpecialForm { name }.into_ref());
        }
        for name in host.names() {
            globals.bind(name.clone(), Value::Foreign { name }.into_ref());
        }
        Context {
            globals,
            forms,
            host,
            filenames: vec!["<eval>".to_owned()],
        }
    }

    /// The global environment.
    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// Adds a function to the host namespace and binds its name globally.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemer::{Context, HostValue};
    ///
    /// let mut ctx = Context::new();
    /// ctx.define_host_function("twice", |args| match args {
    ///     [HostValue::Int(n)] => Ok(HostValue::Int(n * 2)),
    ///     _ => Err("expected one integer".to_owned()),
    /// });
    /// assert_eq!(ctx.eval_string("(twice 21)").unwrap().as_int().unwrap(), 42);
    /// ```
    pub fn define_host_function(
        &mut self,
        name: &str,
        func: impl Fn(&[HostValue]) -> Result<HostValue, String> + 'static,
    ) {
        self.host.insert(name, func);
        self.globals.bind(
            name,
            Value::Foreign {
                name: name.to_owned(),
            }
            .into_ref(),
        );
    }

    /// Evaluates `expr` in the global environment.
    pub fn eval(&mut self, expr: &Object) -> Result<Object, Error> {
        let globals = self.globals.clone();
        eval::eval(self, expr, &globals)
    }

    /// Reads all forms in `text`, then evaluates them in order.  Returns the
    /// value of the last form, or `()` if there are none.
    pub fn eval_string(&mut self, text: &str) -> Result<Object, Error> {
        self.eval_source(0, text)
    }

    /// Like [`eval_string`](Context::eval_string), with the contents of a
    /// file.  Errors carry the file name in their spans.
    pub fn eval_file(&mut self, filename: &str) -> Result<Object, Error> {
        let contents = fs::read_to_string(filename)
            .map_err(|e| Error::os_error(format!("Unable to read file: {filename}. Error: {e}")))?;
        self.filenames.push(filename.to_owned());
        debug!("loading {}", filename);
        self.eval_source(self.filenames.len() - 1, &contents)
    }

    /// The batch entry point: evaluates every form in `text` for its side
    /// effects.  Stops at the first error.
    pub fn load(&mut self, text: &str) -> Result<(), Error> {
        self.eval_source(0, text).map(|_| ())
    }

    fn eval_source(&mut self, file_id: usize, text: &str) -> Result<Object, Error> {
        let forms = Parser::new(file_id, text).collect::<Result<Vec<_>, _>>()?;
        let mut ret = Object::nil();
        for form in forms {
            ret = self.eval(&form)?;
        }
        Ok(ret)
    }

    /// The interactive entry point: evaluates each form on `line` and returns
    /// one record per form.  An error in one form does not keep the
    /// following forms from being evaluated.  A syntax error ends the line.
    pub fn repl_line(&mut self, line: &str) -> Vec<Output> {
        let mut outputs = vec![];
        for form in Parser::new(0, line) {
            let output = match form.and_then(|form| self.eval(&form)) {
                Ok(value) => Output {
                    text: value.to_string(),
                    kind: OutputKind::Value,
                },
                Err(err) => Output {
                    text: err.to_string(),
                    kind: OutputKind::Error,
                },
            };
            outputs.push(output);
        }
        outputs
    }

    pub(crate) fn special_form(&self, name: &str) -> Option<SpecialFormFn> {
        self.forms.get(name)
    }

    pub(crate) fn get_filename(&self, file_id: usize) -> String {
        self.filenames
            .get(file_id)
            .cloned()
            .unwrap_or_else(|| "<unknown>".to_owned())
    }
}

impl Evaluator for Context {
    fn evaluate(&mut self, expr: &Object, env: &Environment) -> Result<Object, Error> {
        eval::eval(self, expr, env)
    }

    fn apply(
        &mut self,
        callable: &Object,
        args: &Object,
        env: &Environment,
    ) -> Result<Object, Error> {
        eval::apply(self, callable, args, env)
    }

    fn call_host(&mut self, name: &str, args: &Object) -> Result<Object, Error> {
        self.host.call(name, args)
    }
}
