/*!
`syntax-rules` macros.

A macro is compiled from the body of a `(syntax-rules (literal ...) (pattern
template) ...)` form.  Using a macro matches the unevaluated argument list
against each rule's pattern in order; the first match binds the pattern
variables in a fresh frame over the macro's defining environment and
substitutes them into the template.  Expansion is not hygienic: symbols in the
template that are not pattern variables are left as they are and resolve
wherever the expansion is evaluated.
*/

use std::collections::HashMap;

use log::{debug, trace};

use crate::{
    Environment, Error, Object,
    cons::ListBuilder,
    value::Value,
};

pub const ELLIPSIS: &str = "...";
const WILDCARD: &str = "_";

#[derive(Debug, Clone)]
enum Pattern {
    /// Matches anything and binds it.
    Variable(String),
    /// `_`: matches anything, binds nothing.
    Wildcard,
    /// A symbol from the literal set: matches only itself.
    Literal(String),
    /// A number, string or boolean: matches an equal datum.
    Constant(Object),
    List {
        fixed: Vec<Pattern>,
        /// The sub-pattern followed by an ellipsis, and the patterns after it.
        vararg: Option<(Box<Pattern>, Vec<Pattern>)>,
        tail: Option<Box<Pattern>>,
    },
}

/// What a pattern variable captured.
#[derive(Debug, Clone)]
enum Capture {
    One(Object),
    Many(Vec<Capture>),
}

impl Capture {
    fn into_object(self) -> Object {
        match self {
            Capture::One(obj) => obj,
            Capture::Many(items) => items.into_iter().map(Capture::into_object).collect(),
        }
    }
}

fn is_ellipsis(obj: &Object) -> bool {
    matches!(&*obj.inner_ref(), Value::Symbol { value } if value == ELLIPSIS)
}

impl Pattern {
    fn compile(pattern: &Object, literals: &[String]) -> Result<Pattern, Error> {
        let inner = pattern.inner_ref();
        match &*inner {
            Value::Symbol { value } if value == ELLIPSIS => Err(Error::invalid_form(
                "syntax-rules: ellipsis must follow a pattern",
            )),
            Value::Symbol { value } if value == WILDCARD => Ok(Pattern::Wildcard),
            Value::Symbol { value } if literals.contains(value) => {
                Ok(Pattern::Literal(value.to_owned()))
            }
            Value::Symbol { value } => Ok(Pattern::Variable(value.to_owned())),
            Value::Nil | Value::Pair { .. } => {
                drop(inner);
                Self::compile_list(pattern, literals)
            }
            _ => Ok(Pattern::Constant(pattern.clone())),
        }
    }

    fn compile_list(pattern: &Object, literals: &[String]) -> Result<Pattern, Error> {
        let mut fixed = vec![];
        let mut vararg: Option<(Box<Pattern>, Vec<Pattern>)> = None;
        let mut next = pattern.clone();
        let tail = loop {
            let (car, cdr) = match &*next.inner_ref() {
                Value::Nil => break None,
                Value::Pair { cons } => (cons.car(), cons.cdr()),
                _ => break Some(Box::new(Self::compile(&next, literals)?)),
            };
            let followed_by_ellipsis = cdr.consp() && is_ellipsis(&cdr.car()?);
            let compiled = Self::compile(&car, literals)?;
            if followed_by_ellipsis {
                if vararg.is_some() {
                    return Err(Error::invalid_form(format!(
                        "syntax-rules: more than one ellipsis in {}",
                        pattern
                    )));
                }
                vararg = Some((Box::new(compiled), vec![]));
                next = cdr.cdr()?;
                continue;
            }
            match vararg.as_mut() {
                Some((_, after)) => after.push(compiled),
                None => fixed.push(compiled),
            }
            next = cdr;
        };
        Ok(Pattern::List {
            fixed,
            vararg,
            tail,
        })
    }

    /// Collects the pattern variables and the number of ellipses each one is
    /// nested under.
    fn variables(&self, depth: usize, out: &mut HashMap<String, usize>) {
        match self {
            Pattern::Variable(name) => {
                out.insert(name.to_owned(), depth);
            }
            Pattern::Wildcard | Pattern::Literal(_) | Pattern::Constant(_) => {}
            Pattern::List {
                fixed,
                vararg,
                tail,
            } => {
                for item in fixed {
                    item.variables(depth, out);
                }
                if let Some((repeated, after)) = vararg {
                    repeated.variables(depth + 1, out);
                    for item in after {
                        item.variables(depth, out);
                    }
                }
                if let Some(tail) = tail {
                    tail.variables(depth, out);
                }
            }
        }
    }

    /// Returns false on any shape mismatch.  Captures made before a mismatch
    /// are left in `out`; callers discard `out` when this returns false.
    fn matches(&self, form: &Object, out: &mut HashMap<String, Capture>) -> bool {
        match self {
            Pattern::Variable(name) => {
                out.insert(name.to_owned(), Capture::One(form.clone()));
                true
            }
            Pattern::Wildcard => true,
            Pattern::Literal(name) => {
                matches!(&*form.inner_ref(), Value::Symbol { value } if value == name)
            }
            Pattern::Constant(constant) => form.equal(constant),
            Pattern::List {
                fixed,
                vararg,
                tail,
            } => Self::matches_list(fixed, vararg.as_ref(), tail.as_deref(), form, out),
        }
    }

    fn matches_list(
        fixed: &[Pattern],
        vararg: Option<&(Box<Pattern>, Vec<Pattern>)>,
        tail: Option<&Pattern>,
        form: &Object,
        out: &mut HashMap<String, Capture>,
    ) -> bool {
        // split the form into its elements and whatever ends the chain.
        let mut items = vec![];
        let mut next = form.clone();
        loop {
            let rest = match &*next.inner_ref() {
                Value::Pair { cons } => {
                    items.push(cons.car());
                    cons.cdr()
                }
                _ => break,
            };
            next = rest;
        }
        let form_tail = next;

        let Some((repeated, after)) = vararg else {
            if items.len() < fixed.len() {
                return false;
            }
            for (pattern, item) in fixed.iter().zip(&items) {
                if !pattern.matches(item, out) {
                    return false;
                }
            }
            let remaining = Object::list_with_tail(
                items[fixed.len()..].iter().cloned(),
                form_tail,
            );
            return match tail {
                Some(tail) => tail.matches(&remaining, out),
                None => remaining.null(),
            };
        };

        if items.len() < fixed.len() + after.len() {
            return false;
        }
        match tail {
            Some(tail) => {
                if !tail.matches(&form_tail, out) {
                    return false;
                }
            }
            None => {
                if !form_tail.null() {
                    return false;
                }
            }
        }
        let repeat_end = items.len() - after.len();
        for (pattern, item) in fixed.iter().zip(&items) {
            if !pattern.matches(item, out) {
                return false;
            }
        }
        for (pattern, item) in after.iter().zip(&items[repeat_end..]) {
            if !pattern.matches(item, out) {
                return false;
            }
        }

        let mut names = HashMap::new();
        repeated.variables(0, &mut names);
        let mut captured: HashMap<String, Vec<Capture>> =
            names.keys().map(|name| (name.to_owned(), vec![])).collect();
        for item in &items[fixed.len()..repeat_end] {
            let mut one = HashMap::new();
            if !repeated.matches(item, &mut one) {
                return false;
            }
            for (name, capture) in one {
                if let Some(list) = captured.get_mut(&name) {
                    list.push(capture);
                }
            }
        }
        for (name, list) in captured {
            out.insert(name, Capture::Many(list));
        }
        true
    }
}

#[derive(Debug)]
struct SyntaxRule {
    pattern: Pattern,
    template: Object,
    depths: HashMap<String, usize>,
}

/// A macro defined with `syntax-rules`.
#[derive(Debug)]
pub struct Macro {
    literals: Vec<String>,
    rules: Vec<SyntaxRule>,
    env: Environment,
}

impl Macro {
    /// Compiles a macro from `((literal ...) (pattern template) ...)`, the
    /// arguments of a `syntax-rules` form.
    pub fn new(spec: &Object, env: &Environment) -> Result<Macro, Error> {
        let literals_list = spec.car().map_err(|_| {
            Error::invalid_form("syntax-rules: expected a literal list and rules")
        })?;
        if literals_list.list_length().is_none() {
            return Err(Error::invalid_form(format!(
                "syntax-rules: literals must be a list: {}",
                literals_list
            )));
        }
        let mut literals = vec![];
        for literal in literals_list.base_iter() {
            literals.push(literal.as_symbol().map_err(|_| {
                Error::invalid_form(format!("syntax-rules: literal is not a symbol: {}", literal))
            })?);
        }

        let mut rules = vec![];
        for rule in spec.cdr()?.base_iter() {
            if rule.list_length() != Some(2) {
                return Err(Error::invalid_form(format!(
                    "syntax-rules: a rule must be (pattern template): {}",
                    rule
                )));
            }
            let pattern = rule.car()?;
            let template = rule.cdr()?.car()?;
            // the keyword position of the pattern is never matched.
            let Ok(pattern_args) = pattern.cdr() else {
                return Err(Error::invalid_form(format!(
                    "syntax-rules: a pattern must be a list: {}",
                    pattern
                )));
            };
            debug!("creating rule: {} -> {}", pattern, template);
            let pattern = Pattern::compile_list(&pattern_args, &literals)?;
            let mut depths = HashMap::new();
            pattern.variables(0, &mut depths);
            rules.push(SyntaxRule {
                pattern,
                template,
                depths,
            });
        }
        Ok(Macro {
            literals,
            rules,
            env: env.clone(),
        })
    }

    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// Expands a use of this macro.  `args` is the unevaluated use form
    /// without its keyword.  The result is not evaluated.
    pub fn expand(&self, args: &Object) -> Result<Object, Error> {
        for rule in &self.rules {
            let mut captures = HashMap::new();
            if !rule.pattern.matches(args, &mut captures) {
                continue;
            }
            let frame = self.env.new_child();
            for (name, capture) in captures {
                frame.bind(name, capture.into_object());
            }
            let expanded = substitute(&rule.template, &frame, &rule.depths)?;
            debug!("expanded {} into {}", args, expanded);
            return Ok(expanded);
        }
        Err(Error::macro_match(format!(
            "no rule matched {}",
            args
        )))
    }
}

/// Replaces pattern variables in `template` with their bindings in `frame`,
/// and other symbols with their values when a local frame of the macro's
/// defining environment binds them.  Global and unbound symbols are left for
/// the use site to resolve.
///
/// `depths` holds the variables still bound to ellipsis captures, with how
/// many ellipses remain.
fn substitute(
    template: &Object,
    frame: &Environment,
    depths: &HashMap<String, usize>,
) -> Result<Object, Error> {
    let inner = template.inner_ref();
    match &*inner {
        Value::Symbol { value } if depths.contains_key(value) => frame.lookup(value),
        Value::Symbol { value } => match frame.try_lookup_local(value) {
            Some(bound) => {
                trace!("template symbol {} resolved to {}", value, bound);
                Ok(literal(bound))
            }
            None => Ok(template.clone()),
        },
        Value::Pair { cons } => {
            let (car, cdr) = (cons.car(), cons.cdr());
            drop(inner);
            // `(... ...)` produces a literal ellipsis.
            if is_ellipsis(&car) && cdr.consp() {
                return cdr.car();
            }
            substitute_list(template, frame, depths)
        }
        _ => Ok(template.clone()),
    }
}

fn substitute_list(
    template: &Object,
    frame: &Environment,
    depths: &HashMap<String, usize>,
) -> Result<Object, Error> {
    let mut builder = ListBuilder::new();
    let mut next = template.clone();
    let tail = loop {
        let (car, cdr) = match &*next.inner_ref() {
            Value::Nil => break Object::nil(),
            Value::Pair { cons } => (cons.car(), cons.cdr()),
            _ => break substitute(&next, frame, depths)?,
        };
        if cdr.consp() && is_ellipsis(&cdr.car()?) {
            for item in substitute_repeated(&car, frame, depths)? {
                builder.push(item);
            }
            next = cdr.cdr()?;
        } else {
            builder.push(substitute(&car, frame, depths)?);
            next = cdr;
        }
    };
    let span = template.span();
    Ok(builder.finish_with_tail(tail).with_span(span))
}

/// Expands `sub ...`: one copy of `sub` per captured element of the ellipsis
/// variables it mentions.
fn substitute_repeated(
    sub: &Object,
    frame: &Environment,
    depths: &HashMap<String, usize>,
) -> Result<Vec<Object>, Error> {
    let mut mentioned = vec![];
    collect_symbols(sub, &mut mentioned);
    let repeated: Vec<String> = mentioned
        .into_iter()
        .filter(|name| depths.get(name).is_some_and(|depth| *depth > 0))
        .collect();
    if repeated.is_empty() {
        return Err(Error::invalid_form(format!(
            "syntax-rules: no ellipsis variable in template {} ...",
            sub
        )));
    }

    let mut columns = vec![];
    let mut count = None;
    for name in &repeated {
        let items: Vec<Object> = frame.lookup(name)?.base_iter().collect();
        match count {
            None => count = Some(items.len()),
            Some(count) if count != items.len() => {
                return Err(Error::macro_match(format!(
                    "syntax-rules: ellipsis variables in {} captured different lengths",
                    sub
                )));
            }
            Some(_) => {}
        }
        columns.push(items);
    }

    let mut inner_depths = depths.clone();
    for name in &repeated {
        if let Some(depth) = inner_depths.get_mut(name) {
            *depth -= 1;
        }
    }

    let count = count.unwrap_or_default();
    trace!("repeating {} {} times", sub, count);
    let mut ret = Vec::with_capacity(count);
    for idx in 0..count {
        let iteration = frame.new_child();
        for (name, items) in repeated.iter().zip(&columns) {
            iteration.bind(name.as_str(), items[idx].clone());
        }
        ret.push(substitute(sub, &iteration, &inner_depths)?);
    }
    Ok(ret)
}

/// Wraps a value from the defining environment so that evaluating it at the
/// use site produces the value itself.
fn literal(value: Object) -> Object {
    if value.symbolp() || value.consp() {
        Object::quote(value)
    } else {
        value
    }
}

fn collect_symbols(template: &Object, out: &mut Vec<String>) {
    match &*template.inner_ref() {
        Value::Symbol { value } => {
            if !out.contains(value) {
                out.push(value.to_owned());
            }
        }
        Value::Pair { cons } => {
            collect_symbols(&cons.car(), out);
            collect_symbols(&cons.cdr(), out);
        }
        _ => {}
    }
}
