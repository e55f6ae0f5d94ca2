//! The type expression language attached to command parameters.
//!
//! An annotation is a union of parts, written either `Option | OneOrMore[int]` or
//! `Union[Option, OneOrMore[int]]`. Each part is a marker (`Flag`, `Option`, the arity
//! markers, `Choices[...]`, the action markers) or, failing that, the name of a value
//! type registered in the [`Scope`]. Markers are order independent.

use std::mem;

use tracing::trace;

use crate::{
    argument::{Action, Argument, Nargs},
    value::{Scope, Value},
    Error, Result,
};

/// Folds the annotation `text` into `arg`.
pub fn interpret(text: &str, arg: &mut Argument, scope: &Scope) -> Result<()> {
    for part in parse_union(text)? {
        trace!(arg = arg.name(), ?part, "annotation part");
        apply_part(&part, arg, scope)?;
    }
    Ok(())
}

/// Evaluates a choice expression: `'a', 'b'`, `range(1, 5)`, `Literal["a", "b"]`, or a
/// choice set registered in the scope.
pub(crate) fn eval_choices(text: &str, scope: &Scope) -> Result<Vec<Value>> {
    let p = &mut Parser::new(text)?;
    let items = expr_list(p, None)?;
    if !p.end() {
        bail!(Eval, "unexpected `{}` in `{text}`", p.peek_text())
    }
    choices_from(&items, scope, true)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    /// `(a, b)`, `[a, b]` and `{a, b}` alike.
    Tuple(Vec<Expr>),
    Subscript(String, Vec<Expr>),
    Call(String, Vec<Expr>),
}

fn parse_union(text: &str) -> Result<Vec<Expr>> {
    let p = &mut Parser::new(text)?;
    if p.end() {
        return Ok(Vec::new());
    }
    let mut parts = vec![expr(p)?];
    while p.eat_punct('|') {
        parts.push(expr(p)?);
    }
    if !p.end() {
        bail!(Eval, "unexpected `{}` in annotation `{text}`", p.peek_text())
    }
    if let [Expr::Subscript(name, members)] = parts.as_mut_slice() {
        if last_segment(name) == "Union" {
            return Ok(mem::take(members));
        }
    }
    Ok(parts)
}

fn expr(p: &mut Parser) -> Result<Expr> {
    let res = match p.next() {
        Some(Token::Name(name)) => {
            if p.eat_punct('[') {
                Expr::Subscript(name, expr_list(p, Some(']'))?)
            } else if p.eat_punct('(') {
                Expr::Call(name, expr_list(p, Some(')'))?)
            } else {
                Expr::Name(name)
            }
        }
        Some(Token::Str(it)) => Expr::Str(it),
        Some(Token::Int(it)) => Expr::Int(it),
        Some(Token::Float(it)) => Expr::Float(it),
        Some(Token::Punct('(')) => {
            let (mut items, trailing_comma) = expr_list_impl(p, Some(')'))?;
            if items.len() == 1 && !trailing_comma {
                items.swap_remove(0)
            } else {
                Expr::Tuple(items)
            }
        }
        Some(Token::Punct('[')) => Expr::Tuple(expr_list(p, Some(']'))?),
        Some(Token::Punct('{')) => Expr::Tuple(expr_list(p, Some('}'))?),
        Some(Token::Punct(c)) => bail!(Eval, "unexpected `{c}`"),
        None => bail!(Eval, "unexpected end of expression"),
    };
    Ok(res)
}

fn expr_list(p: &mut Parser, close: Option<char>) -> Result<Vec<Expr>> {
    expr_list_impl(p, close).map(|(items, _)| items)
}

/// Comma separated expressions up to `close` (or the end of input).
fn expr_list_impl(p: &mut Parser, close: Option<char>) -> Result<(Vec<Expr>, bool)> {
    let mut items = Vec::new();
    let mut trailing_comma = false;
    loop {
        match close {
            Some(c) if p.eat_punct(c) => break,
            None if p.end() => break,
            _ => (),
        }
        items.push(expr(p)?);
        trailing_comma = p.eat_punct(',');
        if !trailing_comma {
            match close {
                Some(c) => p.expect_punct(c)?,
                None => (),
            }
            break;
        }
    }
    Ok((items, trailing_comma))
}

fn apply_part(part: &Expr, arg: &mut Argument, scope: &Scope) -> Result<()> {
    let (name, params) = match part {
        Expr::Name(name) => (name.as_str(), &[][..]),
        Expr::Subscript(name, params) => (name.as_str(), params.as_slice()),
        _ => bail!(Eval, "`{}` is neither a marker nor a type", render(part)),
    };
    match last_segment(name) {
        "Flag" => {
            explicit_type(params, arg, scope)?;
            arg.mark_flag()?;
        }
        "Option" => {
            explicit_type(params, arg, scope)?;
            arg.mark_option()?;
        }
        "OneOrMore" => arity(Nargs::OneOrMore, params, arg, scope)?,
        "ZeroOrMore" => arity(Nargs::ZeroOrMore, params, arg, scope)?,
        "ZeroOrOne" => arity(Nargs::ZeroOrOne, params, arg, scope)?,
        "Choices" => {
            let choices = choices_from(params, scope, true)?;
            arg.set_choices(choices)?;
        }
        "StoreAction" => arg.set_action(Action::Store)?,
        "StoreConstAction" => arg.set_action(Action::StoreConst)?,
        "StoreTrueAction" => arg.set_action(Action::StoreTrue)?,
        "StoreFalseAction" => arg.set_action(Action::StoreFalse)?,
        "AppendAction" => {
            explicit_type(params, arg, scope)?;
            arg.set_action(Action::Append)?;
        }
        "ExtendAction" => {
            explicit_type(params, arg, scope)?;
            arg.set_action(Action::Extend)?;
        }
        "CountAction" => {
            let converter = arg.converter().map(|it| it.name().to_string());
            match converter.as_deref() {
                Some("int") => arg.clear_converter(),
                Some(other) => {
                    bail!(Type, "`CountAction` implies type int and does not accept `{other}`")
                }
                None => (),
            }
            arg.set_action(Action::Count)?;
        }
        "CustomAction" => {
            let action = match params {
                [Expr::Name(name)] => scope
                    .action(name)
                    .ok_or_else(|| format_err!(Eval, "unknown action `{name}`"))?,
                [] => bail!(Value, "`CustomAction` requires a parameter, `CustomAction[...]`"),
                _ => bail!(Value, "`CustomAction` requires the name of a registered action"),
            };
            arg.set_action(Action::Custom(action.clone()))?;
        }
        marker => {
            if let Some(n) = marker.strip_prefix("Exactly").and_then(|it| it.parse::<usize>().ok())
            {
                if (1..=9).contains(&n) {
                    return arity(Nargs::Exactly(n), params, arg, scope);
                }
            }
            if !params.is_empty() {
                bail!(Eval, "unknown marker `{}`", render(part))
            }
            value_type(name, arg, scope)?;
        }
    }
    Ok(())
}

fn arity(nargs: Nargs, params: &[Expr], arg: &mut Argument, scope: &Scope) -> Result<()> {
    explicit_type(params, arg, scope)?;
    arg.set_nargs(nargs)
}

/// The optional `[type]` of a generic marker.
fn explicit_type(params: &[Expr], arg: &mut Argument, scope: &Scope) -> Result<()> {
    match params {
        [] => Ok(()),
        [Expr::Name(name)] => value_type(name, arg, scope),
        _ => bail!(Eval, "expected a single type name, got `{}`", render_list(params)),
    }
}

fn value_type(name: &str, arg: &mut Argument, scope: &Scope) -> Result<()> {
    if last_segment(name) == "Any" {
        return Ok(());
    }
    let converter =
        scope.converter(name).ok_or_else(|| format_err!(Eval, "unknown type `{name}`"))?;
    if arg.action() == Some(&Action::Count) {
        if converter.name() == "int" {
            return Ok(());
        }
        bail!(Type, "`CountAction` implies type int and does not accept `{}`", converter.name())
    }
    arg.set_converter(converter.clone())
}

/// A lone string is itself a choice expression, tried once; if that fails it is a
/// single choice.
fn choices_from(params: &[Expr], scope: &Scope, reparse: bool) -> Result<Vec<Value>> {
    let value = match params {
        [] => bail!(Value, "`Choices` must have some actual choices"),
        [it] => eval(it, scope)?,
        many => Value::List(many.iter().map(|it| eval(it, scope)).collect::<Result<_>>()?),
    };
    match value {
        Value::List(items) => Ok(items),
        Value::Str(text) if reparse => {
            let p = Parser::new(&text).and_then(|mut p| {
                let items = expr_list(&mut p, None)?;
                if p.end() {
                    Ok(items)
                } else {
                    bail!(Eval, "trailing input")
                }
            });
            match p.and_then(|items| choices_from(&items, scope, false)) {
                Ok(items) => Ok(items),
                Err(_) => Ok(vec![Value::Str(text)]),
            }
        }
        Value::Str(text) => Ok(vec![Value::Str(text)]),
        other => bail!(Value, "{other} is not a sequence"),
    }
}

fn eval(expr: &Expr, scope: &Scope) -> Result<Value> {
    let res = match expr {
        Expr::Str(it) => Value::Str(it.clone()),
        Expr::Int(it) => Value::Int(*it),
        Expr::Float(it) => Value::Float(*it),
        Expr::Tuple(items) => {
            Value::List(items.iter().map(|it| eval(it, scope)).collect::<Result<_>>()?)
        }
        Expr::Name(name) => match name.as_str() {
            "True" => Value::Bool(true),
            "False" => Value::Bool(false),
            "None" => Value::None,
            _ => match scope.choices(name) {
                Some(values) => Value::List(values.to_vec()),
                None => bail!(Eval, "unknown name `{name}`"),
            },
        },
        // `Literal[a, b]` reads as the tuple `(a, b)`, `Literal[a]` as `(a)`.
        Expr::Subscript(name, items) if last_segment(name) == "Literal" => match items.as_slice()
        {
            [it] => eval(it, scope)?,
            _ => Value::List(items.iter().map(|it| eval(it, scope)).collect::<Result<_>>()?),
        },
        Expr::Call(name, params) if name == "range" => range(params, scope)?,
        Expr::Subscript(..) | Expr::Call(..) => bail!(Eval, "can't evaluate `{}`", render(expr)),
    };
    Ok(res)
}

fn range(params: &[Expr], scope: &Scope) -> Result<Value> {
    let ints = params
        .iter()
        .map(|it| match eval(it, scope)? {
            Value::Int(it) => Ok(it),
            other => bail!(Value, "range() expects integers, got {other}"),
        })
        .collect::<Result<Vec<i64>>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => bail!(Value, "range() expects 1 to 3 arguments, got {}", ints.len()),
    };
    if step == 0 {
        bail!(Value, "range() step must not be zero")
    }
    let mut res = Vec::new();
    let mut next = Some(start);
    while let Some(i) = next.filter(|&i| (step > 0 && i < stop) || (step < 0 && i > stop)) {
        res.push(Value::Int(i));
        next = i.checked_add(step);
    }
    Ok(Value::List(res))
}

fn last_segment(path: &str) -> &str {
    path.rsplit(['.', ':']).next().unwrap_or(path)
}

fn render(expr: &Expr) -> String {
    match expr {
        Expr::Name(it) => it.clone(),
        Expr::Str(it) => format!("{it:?}"),
        Expr::Int(it) => it.to_string(),
        Expr::Float(it) => format!("{it:?}"),
        Expr::Tuple(items) => format!("({})", render_list(items)),
        Expr::Subscript(name, items) => format!("{name}[{}]", render_list(items)),
        Expr::Call(name, items) => format!("{name}({})", render_list(items)),
    }
}

fn render_list(items: &[Expr]) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// A possibly qualified name: `int`, `typing.Literal`, `argdeco::Flag`.
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    Punct(char),
}

struct Parser {
    tokens: Vec<Token>,
}

impl Parser {
    fn new(text: &str) -> Result<Parser> {
        let mut tokens = tokenize(text)?;
        tokens.reverse();
        Ok(Parser { tokens })
    }

    fn end(&self) -> bool {
        self.tokens.is_empty()
    }

    fn next(&mut self) -> Option<Token> {
        self.tokens.pop()
    }

    fn peek_text(&self) -> String {
        match self.tokens.last() {
            Some(Token::Name(it)) => it.clone(),
            Some(Token::Str(it)) => format!("{it:?}"),
            Some(Token::Int(it)) => it.to_string(),
            Some(Token::Float(it)) => it.to_string(),
            Some(Token::Punct(it)) => it.to_string(),
            None => String::new(),
        }
    }

    fn eat_punct(&mut self, punct: char) -> bool {
        if self.tokens.last() == Some(&Token::Punct(punct)) {
            self.tokens.pop();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: char) -> Result<()> {
        if !self.eat_punct(punct) {
            bail!(Eval, "expected `{punct}`, got `{}`", self.peek_text())
        }
        Ok(())
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut res = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '[' | ']' | '(' | ')' | '{' | '}' | ',' | '|' => {
                chars.next();
                res.push(Token::Punct(c));
            }
            '\'' | '"' => {
                chars.next();
                let mut buf = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => buf.push(escaped),
                            None => bail!(Eval, "unterminated string in `{text}`"),
                        },
                        Some(q) if q == c => break,
                        Some(other) => buf.push(other),
                        None => bail!(Eval, "unterminated string in `{text}`"),
                    }
                }
                res.push(Token::Str(buf));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut buf = String::new();
                buf.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' || d == '_' {
                        buf.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                res.push(number(&buf)?);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut buf = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == '.' || d == ':' {
                        buf.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                res.push(Token::Name(buf));
            }
            _ => bail!(Eval, "unexpected `{c}` in `{text}`"),
        }
    }
    Ok(res)
}

fn number(text: &str) -> Result<Token> {
    let clean = text.replace('_', "");
    if let Ok(it) = clean.parse::<i64>() {
        return Ok(Token::Int(it));
    }
    match clean.parse::<f64>() {
        Ok(it) => Ok(Token::Float(it)),
        Err(_) => Err(Error::Eval(format!("invalid number `{text}`"))),
    }
}
