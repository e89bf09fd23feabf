use std::{iter::Peekable, str::CharIndices};

use crate::{
    Error, Object,
    cons::ListBuilder,
    object::Span,
    value::{FALSE_TOKEN, TRUE_TOKEN, Value},
};

struct Tokenizer<'a> {
    file_id: usize,
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    pos: usize,
}

#[derive(Debug)]
struct ParserError {
    desc: String,
    span: Span,
}

impl ParserError {
    fn syntax_error(desc: impl Into<String>, span: Span) -> Self {
        ParserError {
            desc: desc.into(),
            span,
        }
    }

    fn into_error(self) -> Error {
        Error::syntax_error(format!(
            "{} at {}.{}",
            self.desc, self.span.start.0, self.span.start.1
        ))
    }
}

#[derive(Debug)]
enum Token {
    OpenParen { span: Span },
    CloseParen { span: Span },
    Quote { span: Span },
    Dot { span: Span },
    String { span: Span, value: String, raw: bool },
    Atom { span: Span, text: String },

    ParserError(ParserError),
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | ';')
}

impl<'a> Tokenizer<'a> {
    fn new(file_id: usize, text: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            file_id,
            text,
            chars: text.char_indices().peekable(),
            line: 1,
            pos: 1,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next().map(|(_, ch)| {
            if ch == '\n' {
                self.line += 1;
                self.pos = 1;
            } else {
                self.pos += 1;
            }
            ch
        })
    }

    /// Byte offset of the next unread character.
    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.text.len())
    }

    fn span_from(&self, start: (usize, usize)) -> Span {
        Span::new(self.file_id, start, (self.line, self.pos))
    }

    /// Skips whitespace and comments.  Returns the offset of the next token,
    /// if there is one.
    fn skip_blank(&mut self) -> Option<usize> {
        loop {
            match self.peek_char()? {
                ';' => while self.next_char()? != '\n' {},
                ch if ch.is_whitespace() => {
                    self.next_char();
                }
                _ => return Some(self.offset()),
            }
        }
    }

    fn read_string(&mut self, delimiter: char) -> Token {
        let start_pos = (self.line, self.pos);
        self.next_char();
        let raw = delimiter == '`';
        let mut output = String::new();
        while let Some(ch) = self.next_char() {
            match ch {
                '\\' if !raw => {
                    let Some(escaped) = self.next_char() else {
                        break;
                    };
                    let out_ch = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    };
                    output.push(out_ch);
                }
                ch if ch == delimiter => {
                    return Token::String {
                        span: self.span_from(start_pos),
                        value: output,
                        raw,
                    };
                }
                ch => output.push(ch),
            }
        }
        Token::ParserError(ParserError::syntax_error(
            "unterminated string",
            self.span_from(start_pos),
        ))
    }

    fn read_atom(&mut self) -> Token {
        let start_pos = (self.line, self.pos);
        let mut output = String::new();
        while let Some(ch) = self.peek_char() {
            if is_delimiter(ch) {
                break;
            }
            output.push(ch);
            self.next_char();
        }
        let span = self.span_from(start_pos);
        if output == "." {
            Token::Dot { span }
        } else {
            Token::Atom { span, text: output }
        }
    }

    fn single_char(&mut self, make: fn(Span) -> Token) -> Token {
        let start_pos = (self.line, self.pos);
        self.next_char();
        make(self.span_from(start_pos))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_blank()?;
        let token = match self.peek_char()? {
            '(' => self.single_char(|span| Token::OpenParen { span }),
            ')' => self.single_char(|span| Token::CloseParen { span }),
            '\'' => self.single_char(|span| Token::Quote { span }),
            '"' => self.read_string('"'),
            '`' => self.read_string('`'),
            _ => self.read_atom(),
        };
        Some(token)
    }
}

/// Returns true if `text` is a signed integer or decimal number.
fn is_number(text: &str) -> bool {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => ("", unsigned),
    };
    !fraction.is_empty()
        && whole.chars().all(|ch| ch.is_ascii_digit())
        && fraction.chars().all(|ch| ch.is_ascii_digit())
}

fn atom_value(text: String) -> Value {
    match text.as_str() {
        TRUE_TOKEN => return Value::Bool { value: true },
        FALSE_TOKEN => return Value::Bool { value: false },
        _ => {}
    }
    if is_number(&text) {
        if !text.contains('.') {
            if let Ok(value) = text.parse::<i64>() {
                return Value::Int { value };
            }
        }
        if let Ok(value) = text.parse::<f64>() {
            return Value::Float { value };
        }
    }
    Value::Symbol { value: text }
}

/// The syntactic category of an expression string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprClass {
    List,
    Quoted,
    SelfEvaluating,
    Variable,
}

/// Classifies an expression string without reading it.
pub fn classify(text: &str) -> ExprClass {
    let text = text.trim();
    if text.starts_with('(') && text.ends_with(')') {
        return ExprClass::List;
    }
    if text.starts_with('\'') {
        return ExprClass::Quoted;
    }
    let delimited = |delim: char| text.len() >= 2 && text.starts_with(delim) && text.ends_with(delim);
    if is_number(text)
        || delimited('"')
        || delimited('`')
        || text == TRUE_TOKEN
        || text == FALSE_TOKEN
    {
        ExprClass::SelfEvaluating
    } else {
        ExprClass::Variable
    }
}

pub(crate) struct Parser<'a> {
    file_id: usize,
    tokenizer: Tokenizer<'a>,
    peeked: Option<Token>,
    failed: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(file_id: usize, text: &'a str) -> Parser<'a> {
        Parser {
            file_id,
            tokenizer: Tokenizer::new(file_id, text),
            peeked: None,
            failed: false,
        }
    }

    fn peek_token(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = self.tokenizer.next();
        }
        self.peeked.as_ref()
    }

    fn next_token(&mut self) -> Option<Token> {
        self.peeked.take().or_else(|| self.tokenizer.next())
    }

    fn parse_list(&mut self, start_span: Span) -> Result<Object, Error> {
        let unclosed = || {
            ParserError::syntax_error("unbalanced parentheses: unclosed list", start_span)
                .into_error()
        };
        let mut builder = ListBuilder::new();
        let mut tail = Object::nil();
        let end_span = loop {
            match self.peek_token() {
                None => return Err(unclosed()),
                Some(Token::CloseParen { span }) => {
                    let span = *span;
                    self.next_token();
                    break span;
                }
                Some(Token::Dot { span }) => {
                    let span = *span;
                    if builder.is_empty() {
                        return Err(
                            ParserError::syntax_error("unexpected `.`", span).into_error()
                        );
                    }
                    self.next_token();
                    tail = self.parse_value()?.ok_or_else(unclosed)?;
                    match self.next_token() {
                        Some(Token::CloseParen { span }) => break span,
                        None => return Err(unclosed()),
                        Some(_) => {
                            return Err(ParserError::syntax_error(
                                "expected exactly one datum after `.`",
                                span,
                            )
                            .into_error());
                        }
                    }
                }
                Some(_) => {
                    let next = self.parse_value()?.ok_or_else(unclosed)?;
                    builder.push(next);
                }
            }
        };
        let list = builder.finish_with_tail(tail);
        Ok(list.with_span(Some(Span::new(
            self.file_id,
            start_span.start,
            end_span.end,
        ))))
    }

    fn parse_value(&mut self) -> Result<Option<Object>, Error> {
        let Some(token) = self.next_token() else {
            return Ok(None);
        };
        let value = match token {
            Token::OpenParen { span } => self.parse_list(span)?,
            Token::CloseParen { span } => {
                return Err(ParserError::syntax_error(
                    "unbalanced parentheses: unexpected `)`",
                    span,
                )
                .into_error());
            }
            Token::Dot { span } => {
                return Err(ParserError::syntax_error("unexpected `.`", span).into_error());
            }
            Token::Quote { span } => {
                let Some(next) = self.parse_value()? else {
                    return Err(
                        ParserError::syntax_error("nothing to quote after `'`", span).into_error(),
                    );
                };
                Object::quote(next).with_span(Some(span))
            }
            Token::String { span, value, raw } => {
                Value::String { value, raw }.into_ref().with_span(Some(span))
            }
            Token::Atom { span, text } => atom_value(text).into_ref().with_span(Some(span)),
            Token::ParserError(err) => return Err(err.into_error()),
        };
        Ok(Some(value))
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Object, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.parse_value().transpose();
        if matches!(next, Some(Err(_))) {
            self.failed = true;
        }
        next
    }
}

/// Reads all top-level forms in `text`, failing on the first syntax error.
pub fn read(text: &str) -> Result<Vec<Object>, Error> {
    read_forms(text).collect()
}

/// Reads top-level forms lazily.  A syntax error is produced in place of the
/// form it occurs in, and ends the sequence.
pub fn read_forms(text: &str) -> impl Iterator<Item = Result<Object, Error>> + '_ {
    Parser::new(0, text)
}

/// Returns the source text of the first datum in `text`, or an empty string if
/// there is none.  A quoted datum includes its `'`, a list runs to its
/// matching `)`.
pub fn next_token(text: &str) -> Result<String, Error> {
    let mut parser = Parser::new(0, text);
    let Some(start) = parser.tokenizer.skip_blank() else {
        return Ok(String::new());
    };
    parser.parse_value()?;
    let end = parser.tokenizer.offset();
    Ok(text[start..end].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn read_str(text: &str) -> String {
        read(text)
            .unwrap()
            .iter()
            .map(|form| form.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn atoms() {
        assert_eq!(read_str("42 -7 +3 1.5 -.5 .25"), "42 -7 3 1.5 -0.5 0.25");
        assert_eq!(read_str("#t #f foo 1. - +"), "#t #f foo 1. - +");
        let forms = read("12 1.0 x \"s\"").unwrap();
        assert_eq!(forms[0], Value::Int { value: 12 });
        assert!(matches!(&*forms[1].inner_ref(), Value::Float { .. }));
        assert!(forms[2].symbolp());
        assert!(forms[3].stringp());
    }

    #[test]
    fn strings_and_escapes() {
        let forms = read(r#""a\"b\nc" `raw\n` "x\qy""#).unwrap();
        assert_eq!(forms[0].as_string().unwrap(), "a\"b\nc");
        assert_eq!(forms[1].as_string().unwrap(), "raw\\n");
        assert_eq!(forms[2].as_string().unwrap(), "xqy");
        assert_eq!(forms[1].to_string(), "`raw\\n`");
    }

    #[test]
    fn lists_and_dotted_pairs() {
        assert_eq!(read_str("(1 (2 3) ())"), "(1 (2 3) ())");
        assert_eq!(read_str("(1 . 2)"), "(1 . 2)");
        assert_eq!(read_str("(1 2 . 3)"), "(1 2 . 3)");
        assert_eq!(read_str("(1 . (2 3))"), "(1 2 3)");
        assert_eq!(read_str("'(a b)"), "'(a b)");
    }

    #[test]
    fn quote_reads_as_a_list() {
        let forms = read("'a '(1 2)").unwrap();
        assert_eq!(forms[0].car().unwrap().as_symbol().unwrap(), "quote");
        assert_eq!(forms[0].list_length(), Some(2));
        assert_eq!(forms[1].cdr().unwrap().car().unwrap().to_string(), "(1 2)");
        assert_eq!(read_str("''a (quote b)"), "''a 'b");
    }

    #[test]
    fn long_lists_drop_without_overflowing() {
        let forms = read(&format!("({})", "1 ".repeat(100_000))).unwrap();
        assert_eq!(forms[0].list_length(), Some(100_000));
        drop(forms);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(read_str("; leading\n(a ; inner\n b) ; trailing"), "(a b)");
        assert!(read("; only a comment").unwrap().is_empty());
    }

    #[test]
    fn syntax_errors() {
        for text in ["(1 2", "\"open", "`open", ")", "(. 1)", "(1 . 2 3)", "'"] {
            let err = read(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SyntaxError, "{}", text);
        }
        assert!(read("(1 2").unwrap_err().desc().contains("unbalanced"));
    }

    #[test]
    fn forms_before_an_error_are_read() {
        let mut forms = read_forms("(a) (b) (c");
        assert_eq!(forms.next().unwrap().unwrap().to_string(), "(a)");
        assert_eq!(forms.next().unwrap().unwrap().to_string(), "(b)");
        assert!(forms.next().unwrap().is_err());
        assert!(forms.next().is_none());
    }

    #[test]
    fn next_token_returns_the_first_datum() {
        assert_eq!(next_token("  (a (b c)) d").unwrap(), "(a (b c))");
        assert_eq!(next_token("'(x y) z").unwrap(), "'(x y)");
        assert_eq!(next_token("; c\nfoo bar").unwrap(), "foo");
        assert_eq!(next_token("\"a b\" c").unwrap(), "\"a b\"");
        assert_eq!(next_token("   ").unwrap(), "");
        assert!(next_token("(a").is_err());
    }

    #[test]
    fn classification() {
        assert_eq!(classify(" (a b) "), ExprClass::List);
        assert_eq!(classify("'a"), ExprClass::Quoted);
        assert_eq!(classify("-1.5"), ExprClass::SelfEvaluating);
        assert_eq!(classify("\"hi\""), ExprClass::SelfEvaluating);
        assert_eq!(classify("#f"), ExprClass::SelfEvaluating);
        assert_eq!(classify("x1"), ExprClass::Variable);
    }

    #[test]
    fn spans_cover_lists() {
        let forms = read("\n  (a\n b)").unwrap();
        let span = forms[0].span().unwrap();
        assert_eq!(span.start, (2, 3));
        assert_eq!(span.end, (3, 4));
    }
}
