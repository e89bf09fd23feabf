use crate::{Context, Object};

/// A macro for defining the `ErrorKind` enum, the `Display` implementation for
/// it, and the constructors for the `Error` struct.
macro_rules! ErrorKind {
    ($(
        ($kind:ident $(, $vis:vis $ctor:ident)?)
    ),* $(,)?) => {
        /// The kind of error that occurred.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum ErrorKind {
            $(
                $kind,
            )*
        }

        impl std::fmt::Display for ErrorKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$kind => f.write_str(stringify!($kind)),
                    )*
                }
            }
        }

        /// Constructors for [`Error`].
        impl Error {
            $(
                $(
                #[doc = concat!(
                    "Creates a new [`Error`] with the `",
                    stringify!($kind),
                    "` kind and the given description."
                )]
                $vis fn $ctor(desc: impl Into<String>) -> crate::error::Error {
                    Self {
                        kind: ErrorKind::$kind,
                        desc: desc.into(),
                        backtrace: vec![],
                    }
                }
                )?
            )*
        }
    };
}

ErrorKind!(
    (SyntaxError,     pub syntax_error),
    (UnboundVariable, pub unbound_variable),
    (ArityError,      pub arity_error),
    (NotApplicable,   pub not_applicable),
    (MacroMatch,      pub macro_match),
    (ForeignCall,     pub foreign_call),
    (TypeMismatch,    pub type_mismatch),
    (InvalidForm,     pub invalid_form),
    (OSError,         pub os_error),
);

/// Represents an error raised while reading or evaluating Scheme code.
///
/// Use [format](crate::Error::format) to produce a formatted representation of
/// the error including backtraces and source code spans.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    desc: String,
    backtrace: Vec<Object>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.desc.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.desc)
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    fn format_span(&self, ctx: &Context, object: &Object) -> String {
        if let Some(span) = object.span() {
            let filename = ctx.get_filename(span.file_id);
            format!(
                "{}:{}.{}-{}.{}:",
                filename, span.start.0, span.start.1, span.end.0, span.end.1
            )
        } else {
            String::new()
        }
    }

    /// Formats the error into a human-readable string, including backtrace
    /// information.
    pub fn format(&self, ctx: &Context) -> String {
        let mut span_str = format!("ERR {}", self);
        for span in &self.backtrace {
            let prefix = self.format_span(ctx, span);
            if prefix.is_empty() {
                continue;
            }
            if !span.consp() {
                continue;
            }
            let string = span.to_string().replace('\n', "\\n");
            if string.len() > 80 {
                span_str.push_str(&format!("\n{}  at {:.80}...", prefix, string));
            } else {
                span_str.push_str(&format!("\n{}  at {}", prefix, string));
            }
        }
        span_str + "\n"
    }

    /// Adds a form to the error's backtrace.
    pub fn with_trace(mut self, span: Object) -> Self {
        if self.backtrace.last().is_some_and(|last| last.eq(&span)) {
            return self;
        }
        self.backtrace.push(span);
        self
    }

    /// Returns the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind.clone()
    }

    /// Returns the description of the error.
    pub fn desc(&self) -> String {
        self.desc.to_owned()
    }
}
