/*!
Schemer is a small Scheme interpreter that can be embedded into Rust programs.

It reads S-expressions, evaluates them with lexical scoping and closures over
shared, mutable environments, and supports `define-syntax` with
`syntax-rules` macros.  Macros are not hygienic: symbols in a template that
are not pattern variables resolve wherever the expansion ends up.

## Getting started

```rust
use schemer::{Context, Error};

fn main() -> Result<(), Error> {
    let mut ctx = Context::new();

    let program = r#"
        (define (make-counter)
          (define n 0)
          (lambda () (set! n (+ n 1)) n))
        (define next (make-counter))
        (next)
        (next)
    "#;

    let count: i64 = ctx.eval_string(program)?.try_into()?;
    assert_eq!(count, 2);
    Ok(())
}
```

## Next steps

1. Values are represented in Rust as [`Object`]s, shared references to a
   [`Value`].

1. [`Context`] tracks the state of the interpreter and provides the batch
   ([`load`](Context::load)) and interactive ([`repl_line`](Context::repl_line))
   entry points.

1. Rust functions can be made callable from Scheme with
   [`Context::define_host_function`].  See the [`builtin`] module for the forms
   and functions available by default.
*/

mod eval;
pub use eval::Evaluator;

mod macros;

pub mod parse;
pub use parse::{next_token, read, read_forms};

pub mod builtin;
pub use builtin::{
    host::{HostFn, HostFunctions, HostValue},
    special_forms::{SpecialFormFn, SpecialForms},
};

mod cons;
pub use cons::{BaseIter, Cons};

mod context;
pub use context::{Context, Output, OutputKind};

mod env;
pub use env::Environment;

mod error;
pub use error::{Error, ErrorKind};

mod procedure;
pub use procedure::Procedure;

mod syntax_rules;
pub use syntax_rules::Macro;

mod value;
pub use value::Value;

mod object;
pub use object::{Object, Span};
