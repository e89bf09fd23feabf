use std::{cell::RefCell, rc::Rc};

use schemer::{
    Context, Environment, Error, ErrorKind, Evaluator, HostFunctions, HostValue, Object,
    OutputKind, SpecialForms, read,
};

macro_rules! scheme_assert {
    (@impl $ctx: expr, program:$input:expr, result:$result:expr $(,)?) => {
        let output = $ctx.eval_string($input).map_err(|err| {
            println!("{}:{}: execution failed: {}", file!(), line!(),err.to_string());
            err
        })?;
        let expected = $ctx.eval_string($result)?;
        assert!(
            output.equal(&expected),
            "\n{}:{}: program: {}\n  output: {},\n  expected: {}\n",
            file!(),
            line!(),
            $input,
            output,
            expected
        );
    };
    (@impl $ctx: expr, program:$input:expr, error:$desc:expr $(,)?) => {
        let output = $ctx.eval_string($input);
        assert!(output.is_err(), "{}:{}: expected an error from {}", file!(), line!(), $input);
        assert_eq!(output.unwrap_err().to_string(), $desc);
    };
    (@impl $ctx: expr, program:$input:expr, kind:$kind:expr $(,)?) => {
        let output = $ctx.eval_string($input);
        assert!(output.is_err(), "{}:{}: expected an error from {}", file!(), line!(), $input);
        assert_eq!(output.unwrap_err().kind(), $kind);
    };
    (ctx: $ctx: expr, program: $($tail:tt)+) => {
        scheme_assert!(@impl $ctx, program: $($tail)+)
    };
    (program: $($tail:tt)+) => {
        let mut ctx = Context::new();
        scheme_assert!(ctx: ctx, program: $($tail)+)
    };
}

#[test]
fn test_self_evaluating() -> Result<(), Error> {
    scheme_assert! { program: "42", result: "42" }
    scheme_assert! { program: "-1.5", result: "-1.5" }
    scheme_assert! { program: "\"hello\"", result: "\"hello\"" }
    scheme_assert! { program: "`raw`", result: "\"raw\"" }
    scheme_assert! { program: "#t", result: "#t" }
    scheme_assert! { program: "#f", result: "#f" }
    scheme_assert! { program: "()", result: "'()" }
    scheme_assert! { program: "'(a b . c)", result: "(quote (a b . c))" }
    scheme_assert! { program: "(quote (1 2))", result: "'(1 2)" }
    Ok(())
}

#[test]
fn test_conditionals() -> Result<(), Error> {
    scheme_assert! { program: "(if #t 10 20)", result: "10" }
    scheme_assert! { program: "(if #f 10 20)", result: "20" }
    scheme_assert! { program: "(if 0 'yes 'no)", result: "'yes" }
    scheme_assert! { program: "(if '() 'yes 'no)", result: "'yes" }
    scheme_assert! { program: "(if #f 10)", result: "'()" }
    scheme_assert! { program: "(if (< 1 2) 'lt 'ge)", result: "'lt" }
    scheme_assert! { program: "(if)", error: "InvalidForm: missing argument: condition" }
    scheme_assert! { program: "(if #t 1 2 3)", kind: ErrorKind::InvalidForm }
    Ok(())
}

#[test]
fn test_define_and_set() -> Result<(), Error> {
    scheme_assert! { program: "(define y 5)", result: "5" }
    scheme_assert! { program: "(define y 5) (set! y (+ y 1)) y", result: "6" }
    scheme_assert! {
        program: "(define x 1) (define (f) (set! x 2)) (f) x",
        result: "2"
    }
    // a parameter shadows the global; set! changes only the parameter.
    scheme_assert! {
        program: "(define x 1) (define (f x) (set! x 5) x) (cons (f 0) x)",
        result: "'(5 . 1)"
    }
    scheme_assert! { program: "(define 1 2)", kind: ErrorKind::InvalidForm }
    scheme_assert! { program: "(set! \"x\" 2)", kind: ErrorKind::InvalidForm }
    Ok(())
}

#[test]
fn test_set_of_unbound_name_creates_global() -> Result<(), Error> {
    scheme_assert! { program: "(set! fresh 3) fresh", result: "3" }
    scheme_assert! {
        program: "(define (f) (set! made-inside 7)) (f) made-inside",
        result: "7"
    }
    let mut ctx = Context::new();
    ctx.eval_string("((lambda (a) (set! fresh-global a)) 9)")?;
    assert!(ctx.globals().is_bound_here("fresh-global"));
    Ok(())
}

#[test]
fn test_lexical_scope() -> Result<(), Error> {
    scheme_assert! {
        program: r##"
          (define x 10)
          (define (f) x)
          (define (g x) (f))
          (g 20)
        "##,
        result: "10"
    }
    scheme_assert! {
        program: r##"
          (define (adder n) (lambda (m) (+ n m)))
          (define add5 (adder 5))
          (add5 10)
        "##,
        result: "15"
    }
    Ok(())
}

#[test]
fn test_closures_share_frames() -> Result<(), Error> {
    let mut ctx = Context::new();
    ctx.load(
        r##"
        (define (make)
          (define n 10)
          (cons (lambda () (set! n (+ n 1)) n)
                (lambda () n)))
        (define p (make))
        "##,
    )?;
    assert_eq!(ctx.eval_string("((car p))")?.as_int()?, 11);
    assert_eq!(ctx.eval_string("((car p))")?.as_int()?, 12);
    assert_eq!(ctx.eval_string("((cdr p))")?.as_int()?, 12);

    // each call of `make` gets a separate frame.
    ctx.eval_string("(define q (make))")?;
    assert_eq!(ctx.eval_string("((car q))")?.as_int()?, 11);
    assert_eq!(ctx.eval_string("((cdr p))")?.as_int()?, 12);
    Ok(())
}

#[test]
fn test_procedures() -> Result<(), Error> {
    scheme_assert! { program: "((lambda (a b) (- a b)) 10 3)", result: "7" }
    scheme_assert! { program: "((lambda args args) 1 2 3)", result: "'(1 2 3)" }
    scheme_assert! { program: "((lambda args args))", result: "'()" }
    scheme_assert! { program: "(define (f a . rest) rest) (f 1 2 3)", result: "'(2 3)" }
    scheme_assert! { program: "(define (f a . rest) rest) (f 1)", result: "'()" }
    scheme_assert! { program: "(define (f a . rest) a) (f 1 2)", result: "1" }
    let mut ctx = Context::new();
    let all = ctx.eval_string("((lambda args args) 1 2 3)")?;
    assert_eq!(all.list_length(), Some(3));
    scheme_assert! {
        program: "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1))))) (fact 10)",
        result: "3628800"
    }
    scheme_assert! {
        program: "(define (f) (define a 1) (define b 2) (+ a b)) (f)",
        result: "3"
    }
    Ok(())
}

#[test]
fn test_arity() -> Result<(), Error> {
    scheme_assert! {
        program: "(define (f a b) a) (f 1)",
        error: "ArityError: procedure (a b) expects 2 arguments, got 1"
    }
    scheme_assert! {
        program: "(define (f a b) a) (f 1 2 3)",
        error: "ArityError: procedure (a b) expects 2 arguments, got 3"
    }
    scheme_assert! {
        program: "(define (f a . r) a) (f)",
        error: "ArityError: procedure (a . r) expects at least 1 arguments, got 0"
    }
    scheme_assert! { program: "((lambda () 1) 2)", kind: ErrorKind::ArityError }
    scheme_assert! { program: "((lambda (x)) 1)", kind: ErrorKind::InvalidForm }
    scheme_assert! { program: "(lambda (1) 1)", kind: ErrorKind::InvalidForm }
    Ok(())
}

#[test]
fn test_evaluation_errors() -> Result<(), Error> {
    scheme_assert! { program: "(foo)", error: "UnboundVariable: unbound variable: foo" }
    scheme_assert! { program: "bar", error: "UnboundVariable: unbound variable: bar" }
    scheme_assert! { program: "(1 2)", error: "NotApplicable: not applicable: 1" }
    scheme_assert! { program: "(car 1)", error: "TypeMismatch: car: not a pair: 1" }
    scheme_assert! { program: "(+ 1", kind: ErrorKind::SyntaxError }
    scheme_assert! { program: "\"unterminated", kind: ErrorKind::SyntaxError }
    scheme_assert! { program: "(f . )", kind: ErrorKind::SyntaxError }
    Ok(())
}

#[test]
fn test_list_forms() -> Result<(), Error> {
    scheme_assert! { program: "(cons 1 2)", result: "'(1 . 2)" }
    scheme_assert! { program: "(cons 1 '(2 3))", result: "'(1 2 3)" }
    scheme_assert! { program: "(car '(1 2))", result: "1" }
    scheme_assert! { program: "(cdr '(1 2))", result: "'(2)" }
    scheme_assert! { program: "(null? '())", result: "#t" }
    scheme_assert! { program: "(null? (cdr '(1)))", result: "#t" }
    scheme_assert! { program: "(null? 1)", result: "#f" }
    scheme_assert! { program: "(str-quote (cons 1 2))", result: "\"(1 . 2)\"" }
    scheme_assert! { program: "(str-quote \"a\")", result: r#""\"a\"""# }
    Ok(())
}

#[test]
fn test_apply() -> Result<(), Error> {
    scheme_assert! { program: "(apply + '(1 2 3))", result: "6" }
    scheme_assert! { program: "(apply (lambda (a b) (- a b)) '(10 3))", result: "7" }
    scheme_assert! { program: "(apply car '((1 2)))", result: "1" }
    scheme_assert! { program: "(apply + 1)", kind: ErrorKind::TypeMismatch }
    Ok(())
}

#[test]
fn test_special_form_markers() -> Result<(), Error> {
    scheme_assert! { program: "(define my-if if) (my-if #f 1 2)", result: "2" }
    scheme_assert! { program: "(define q quote) (q (a b))", result: "'(a b)" }
    let mut ctx = Context::new();
    assert_eq!(ctx.eval_string("if")?.to_string(), "#<special-form if>");
    assert_eq!(ctx.eval_string("+")?.to_string(), "#<host-function +>");
    Ok(())
}

#[test]
fn test_host_functions() -> Result<(), Error> {
    scheme_assert! { program: "(+ 1 2.5)", result: "3.5" }
    scheme_assert! { program: "(/ 7 2)", result: "3.5" }
    scheme_assert! { program: "(/ 8 2)", result: "4" }
    scheme_assert! { program: "(% 7 3)", result: "1" }
    scheme_assert! { program: "(= 1 1.0)", result: "#t" }
    scheme_assert! { program: "(< 1 2 3)", result: "#t" }
    scheme_assert! { program: "(>= 1 2)", result: "#f" }
    scheme_assert! { program: "(host-func \"+\" 1 2)", result: "3" }
    scheme_assert! { program: "(host-func '* 2 3)", result: "6" }
    scheme_assert! { program: "((host-ref \"-\") 10 4)", result: "6" }
    scheme_assert! { program: "(host-func (host-ref \"-\") 10 4)", result: "6" }
    scheme_assert! { program: "(display \"\")", result: "'()" }
    scheme_assert! {
        program: "(host-func \"nope\")",
        error: "ForeignCall: nope: no such host function"
    }
    scheme_assert! { program: "(/ 1 0)", error: "ForeignCall: /: division by zero" }
    scheme_assert! { program: "(+ 1 'a)", kind: ErrorKind::ForeignCall }
    Ok(())
}

#[test]
fn test_define_host_function() -> Result<(), Error> {
    let mut ctx = Context::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let seen_in_fn = seen.clone();
    ctx.define_host_function("record", move |args| {
        seen_in_fn.borrow_mut().extend(args.iter().cloned());
        Ok(HostValue::Undefined)
    });
    ctx.define_host_function("pair", |_| Ok(HostValue::Datum("(1 . 2)".to_owned())));
    ctx.define_host_function("yes", |_| Ok(HostValue::Bool(true)));

    scheme_assert! { ctx: ctx, program: "(record 1 \"s\" '(a b) '() #f)", result: "'()" }
    assert_eq!(
        *seen.borrow(),
        vec![
            HostValue::Int(1),
            HostValue::Str("s".to_owned()),
            HostValue::Datum("(a b)".to_owned()),
            HostValue::Undefined,
            HostValue::Bool(false),
        ]
    );
    scheme_assert! { ctx: ctx, program: "(pair)", result: "'(1 . 2)" }
    scheme_assert! { ctx: ctx, program: "(if (yes) 'a 'b)", result: "'a" }
    Ok(())
}

#[test]
fn test_macros() -> Result<(), Error> {
    let mut ctx = Context::new();
    ctx.load(
        r##"
        (define-syntax my-list
          (syntax-rules ()
            ((_ a b ...) (cons a (quote (b ...))))))
        "##,
    )?;
    scheme_assert! { ctx: ctx, program: "(my-list 1 2 3 4)", result: "'(1 2 3 4)" }
    scheme_assert! { ctx: ctx, program: "(my-list 1)", result: "'(1)" }
    scheme_assert! { ctx: ctx, program: "(my-list)", error: "MacroMatch: no rule matched ()" }

    scheme_assert! {
        program: r##"
          (define-syntax my-or
            (syntax-rules ()
              ((_) #f)
              ((_ e) e)
              ((_ e r ...) ((lambda (t) (if t t (my-or r ...))) e))))
          (cons (my-or #f #f 3) (my-or))
        "##,
        result: "'(3 . #f)"
    }
    scheme_assert! {
        program: r##"
          (define-syntax arrow
            (syntax-rules (=>)
              ((_ a => f) (f a))
              ((_ a b c) 'other)))
          (cons (arrow 1 => (lambda (x) (+ x 1))) (arrow 1 -> 2))
        "##,
        result: "'(2 . other)"
    }
    scheme_assert! {
        program: r##"
          (define-syntax my-let
            (syntax-rules ()
              ((_ ((name val) ...) body ...) ((lambda (name ...) body ...) val ...))))
          (my-let ((a 1) (b 2)) (define c 3) (+ a b c))
        "##,
        result: "6"
    }
    scheme_assert! {
        program: "(define-syntax m (syntax-rules () ((_ a) a))) (m 1 2)",
        error: "MacroMatch: no rule matched (1 2)"
    }
    scheme_assert! { program: "(define-syntax m (lambda (x) x))", kind: ErrorKind::InvalidForm }
    Ok(())
}

#[test]
fn test_macros_see_locals_of_the_defining_scope() -> Result<(), Error> {
    scheme_assert! {
        program: r##"
          (define (make)
            (define secret 5)
            (define-syntax get (syntax-rules () ((_) secret)))
            get)
          (define g (make))
          (g)
        "##,
        result: "5"
    }
    scheme_assert! {
        program: r##"
          (define (make)
            (define tag 'local)
            (define-syntax tagged (syntax-rules () ((_ x) (cons tag x))))
            (tagged 1))
          (make)
        "##,
        result: "'(local . 1)"
    }
    Ok(())
}

#[test]
fn test_macros_are_not_hygienic() -> Result<(), Error> {
    let mut ctx = Context::new();
    ctx.load(
        r##"
        (define-syntax swap!
          (syntax-rules ()
            ((_ a b) ((lambda (tmp) (set! a b) (set! b tmp)) a))))
        (define x 1)
        (define y 2)
        (swap! x y)
        "##,
    )?;
    scheme_assert! { ctx: ctx, program: "(cons x y)", result: "'(2 . 1)" }

    // `tmp` in the template captures the caller's `tmp`.
    ctx.load("(define tmp 5) (define other 6) (swap! tmp other)")?;
    scheme_assert! { ctx: ctx, program: "(cons tmp other)", result: "'(5 . 6)" }
    Ok(())
}

#[test]
fn test_repl_line_isolates_forms() {
    let mut ctx = Context::new();
    let outputs = ctx.repl_line("(define a 1) (undefined-thing) (+ a 1)");
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[0].text, "1");
    assert_eq!(outputs[0].kind, OutputKind::Value);
    assert!(outputs[1].is_error());
    assert!(outputs[1].text.contains("undefined-thing"));
    assert_eq!(outputs[2].text, "2");

    let outputs = ctx.repl_line("(foo)");
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].kind, OutputKind::Error);
    assert!(outputs[0].text.contains("foo"));

    let outputs = ctx.repl_line("(define b 2) (+ b");
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].text, "2");
    assert!(outputs[1].text.starts_with("SyntaxError"));

    assert!(ctx.repl_line("   ; nothing here").is_empty());
}

#[test]
fn test_load_aborts_on_first_error() {
    let mut ctx = Context::new();
    let err = ctx
        .load("(define a 1) (undefined) (define b 2)")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnboundVariable);
    assert!(ctx.globals().is_bound_here("a"));
    assert!(!ctx.globals().is_bound_here("b"));

    // a syntax error anywhere stops the whole batch before evaluation.
    assert!(ctx.load("(define c 1) (").is_err());
    assert!(!ctx.globals().is_bound_here("c"));
}

#[test]
fn test_print_round_trip() -> Result<(), Error> {
    for text in ["(1 . 2)", "(1 2 . 3)", "(a (b \"c\") () #t 1.5)", "'(x y)"] {
        let forms = read(text)?;
        assert_eq!(forms.len(), 1);
        let printed = forms[0].to_string();
        assert_eq!(printed, text);
        assert_eq!(read(&printed)?[0], forms[0]);
    }
    let mut ctx = Context::new();
    assert_eq!(ctx.eval_string("'(1 . 2)")?.to_string(), "(1 . 2)");
    assert_eq!(ctx.eval_string("(cons 1 (cons 2 '()))")?.to_string(), "(1 2)");
    assert!(
        ctx.eval_string("(lambda (a . b) a)")?
            .to_string()
            .starts_with("#<procedure (a . b)")
    );
    Ok(())
}

#[test]
fn test_quote_reads_as_a_list() -> Result<(), Error> {
    scheme_assert! { program: "(car ''a)", result: "'quote" }
    scheme_assert! { program: "(cdr ''a)", result: "'(a)" }
    scheme_assert! { program: "(car '(quote a))", result: "'quote" }
    let mut ctx = Context::new();
    assert_eq!(ctx.eval_string("'(quote a)")?.to_string(), "'a");
    assert_eq!(ctx.eval_string("''a")?.to_string(), "'a");
    assert_eq!(ctx.eval_string("'(quote a b)")?.to_string(), "(quote a b)");

    scheme_assert! {
        program: r##"
          (define-syntax quoted-name
            (syntax-rules (quote)
              ((_ (quote x)) (str-quote 'x))
              ((_ x) "other")))
          (cons (quoted-name 'y) (quoted-name y))
        "##,
        result: r#"'("y" . "other")"#
    }
    Ok(())
}

#[test]
fn test_long_lists() -> Result<(), Error> {
    let items = "1 ".repeat(100_000);
    let mut ctx = Context::new();
    let list = ctx.eval_string(&format!("'({})", items))?;
    assert_eq!(list.list_length(), Some(100_000));
    drop(list);
    ctx.load(&format!("(define big '({}))", items))?;
    ctx.load("(set! big '())")?;
    Ok(())
}

#[test]
fn test_independent_contexts() -> Result<(), Error> {
    let mut first = Context::new();
    let mut second = Context::new();
    first.eval_string("(define only-here 1)")?;
    assert!(second.eval_string("only-here").is_err());
    Ok(())
}

fn when(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    if ctx.evaluate(&args.car()?, env)?.is_false() {
        return Ok(Object::nil());
    }
    ctx.evaluate_sequence(&args.cdr()?, env)
}

#[test]
fn test_injected_parts() -> Result<(), Error> {
    let mut forms = SpecialForms::standard();
    forms.insert("when", when);
    let globals = Environment::new();
    globals.bind("answer", 42.into());
    let mut host = HostFunctions::new();
    host.insert("ping", |_| Ok(HostValue::Str("pong".to_owned())));

    let mut ctx = Context::with_parts(forms, globals, host);
    scheme_assert! { ctx: ctx, program: "(when #t 1 2 answer)", result: "42" }
    scheme_assert! { ctx: ctx, program: "(when #f 1)", result: "'()" }
    scheme_assert! { ctx: ctx, program: "(ping)", result: "\"pong\"" }
    // no standard host functions were given.
    scheme_assert! { ctx: ctx, program: "(+ 1 2)", kind: ErrorKind::UnboundVariable }
    Ok(())
}

#[test]
fn test_eval_file() -> Result<(), Error> {
    let path = std::env::temp_dir().join("schemer-test-eval-file.scm");
    std::fs::write(&path, "(define (sq x) (* x x))\n(sq 12)\n").unwrap();
    let mut ctx = Context::new();
    let result = ctx.eval_file(path.to_str().unwrap())?;
    assert_eq!(result.as_int()?, 144);
    let _ = std::fs::remove_file(&path);

    let err = ctx.eval_file("/definitely/not/here.scm").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OSError);
    Ok(())
}

#[test]
fn test_error_backtrace_format() {
    let mut ctx = Context::new();
    let err = ctx
        .eval_string("(define (f x) (car x))\n(f 5)")
        .unwrap_err();
    let formatted = err.format(&ctx);
    assert!(formatted.starts_with("ERR TypeMismatch: car: not a pair: 5"));
    assert!(formatted.contains("<eval>:1."));
    assert!(formatted.contains("<eval>:2.1-2.6:  at (f 5)"));
}
