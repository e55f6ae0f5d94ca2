//! The default grammar engine: an argparse flavored matcher over a reversed token cursor.

use std::{fmt::Write, iter};

use tracing::trace;

use crate::{
    argument::{Action, Nargs},
    grammar::{Engine, Grammar, GrammarArg, Namespace, Parsed},
    value::Value,
    ParseError,
};

macro_rules! format_err {
    ($($tt:tt)*) => {
        ParseError::new(format!($($tt)*))
    };
}

macro_rules! bail {
    ($($tt:tt)*) => {
        return Err(format_err!($($tt)*))
    };
}

macro_rules! w {
    ($($tt:tt)*) => {
        drop(write!($($tt)*))
    };
}

type Result<T, E = ParseError> = std::result::Result<T, E>;

pub struct Parser {
    after_double_dash: bool,
    rargs: Vec<String>,
}

impl Parser {
    pub fn new(mut args: Vec<String>) -> Parser {
        args.reverse();
        Parser { after_double_dash: false, rargs: args }
    }

    pub fn is_empty(&self) -> bool {
        self.rargs.is_empty()
    }

    /// `Ok` for flags, `Err` for everything else.
    pub fn pop_flag(&mut self) -> Option<Result<String, String>> {
        if self.after_double_dash {
            return self.next().map(Err);
        }
        let arg = self.next()?;
        if arg == "--" {
            self.after_double_dash = true;
            return self.next().map(Err);
        }
        if is_flag(&arg) {
            Some(Ok(arg))
        } else {
            Some(Err(arg))
        }
    }

    pub fn push_back(&mut self, arg: Result<String, String>) {
        let arg = match arg {
            Ok(it) => it,
            Err(it) => it,
        };
        self.rargs.push(arg)
    }

    fn next(&mut self) -> Option<String> {
        self.rargs.pop()
    }

    /// The next token, unless it is a flag.
    pub fn next_if_value(&mut self) -> Option<String> {
        match self.rargs.last() {
            Some(it) if self.after_double_dash || !is_flag(it) => self.next(),
            _ => None,
        }
    }

    pub fn next_value(&mut self, flag: &str) -> Result<String> {
        self.next_if_value().ok_or_else(|| format_err!("Expected a value for `{flag}`"))
    }
}

/// `-5` and `-.5` are values, `-` alone is a value too.
fn is_flag(arg: &str) -> bool {
    let mut chars = arg.chars();
    if chars.next() != Some('-') {
        return false;
    }
    match chars.next() {
        None => false,
        Some(c) if c.is_ascii_digit() || c == '.' => arg[1..].parse::<f64>().is_err(),
        Some(_) => true,
    }
}

/// Flags, options, positionals and sub-commands the way Python's `argparse` treats them,
/// minus everything that would terminate the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArgParser;

enum Step<'g> {
    Done,
    Descend(&'g Grammar),
    Help,
}

impl Engine for ArgParser {
    fn parse(&self, grammar: &Grammar, tokens: Vec<String>) -> Result<Parsed> {
        let p = &mut Parser::new(tokens);
        let mut fields = Namespace::default();
        let mut g = grammar;
        loop {
            match parse_level(g, p, &mut fields)? {
                Step::Done => return Ok(Parsed::Matched { node: g.node, fields }),
                Step::Descend(sub) => g = sub,
                Step::Help => return Ok(Parsed::Help(self.render_help(g))),
            }
        }
    }

    fn render_help(&self, g: &Grammar) -> String {
        let mut buf = String::new();
        w!(buf, "Usage: {}\n", usage(g));
        if !g.description.is_empty() {
            write_lines_indented(&mut buf, &g.description, 2);
        }

        let args = g.positionals().filter(|it| !it.is_suppressed()).collect::<Vec<_>>();
        if !args.is_empty() {
            blank_line(&mut buf);
            w!(buf, "ARGS:\n");
            let mut blank = "";
            for arg in args {
                w!(buf, "{blank}");
                blank = "\n";
                w!(buf, "    {}\n", value_usage(arg, &arg.dest()));
                if let Some(doc) = arg.help_text() {
                    write_lines_indented(&mut buf, doc, 6);
                }
            }
        }

        let flags = g.flags().filter(|it| !it.is_suppressed()).collect::<Vec<_>>();
        if !flags.is_empty() || g.add_help {
            blank_line(&mut buf);
            w!(buf, "OPTIONS:\n");
            let mut blank = "";
            for flag in flags {
                w!(buf, "{blank}");
                blank = "\n";
                let mut names = flag.names.clone();
                names.sort_by_key(|it| it.starts_with("--"));
                w!(buf, "    {}", names.join(", "));
                if !flag.action().is_nullary() {
                    w!(buf, " {}", value_usage(flag, &flag.dest()));
                }
                w!(buf, "\n");
                if let Some(doc) = flag.help_text() {
                    write_lines_indented(&mut buf, doc, 6);
                }
            }
            if g.add_help {
                w!(buf, "{blank}    -h, --help\n      Prints help information.\n");
            }
        }

        if !g.subcommands.is_empty() {
            blank_line(&mut buf);
            w!(buf, "SUBCOMMANDS:\n");
            let mut blank = "";
            for sub in &g.subcommands {
                w!(buf, "{blank}");
                blank = "\n";
                w!(buf, "    {}", sub.name.as_deref().unwrap_or_default());
                if !sub.aliases.is_empty() {
                    w!(buf, " ({})", sub.aliases.join(", "));
                }
                w!(buf, "\n");
                if let Some(doc) = sub.help.as_deref().filter(|it| !it.is_empty()) {
                    write_lines_indented(&mut buf, doc, 6);
                }
            }
        }
        buf
    }
}

fn parse_level<'g>(g: &'g Grammar, p: &mut Parser, fields: &mut Namespace) -> Result<Step<'g>> {
    for arg in &g.args {
        fields.set(&arg.dest(), initial_value(arg));
    }

    let mut pending = Vec::new();
    let mut seen = Vec::new();
    let mut step = Step::Done;
    while let Some(arg) = p.pop_flag() {
        trace!(?arg, node = ?g.node, "token");
        match arg {
            Ok(flag) => {
                if g.add_help && (flag == "-h" || flag == "--help") {
                    return Ok(Step::Help);
                }
                seen.push(parse_flag(g, flag, p, fields)?);
            }
            Err(value) => {
                if !g.subcommands.is_empty() {
                    if let Some(sub) = g.subcommand(&value) {
                        step = Step::Descend(sub);
                        break;
                    }
                    if g.positionals().next().is_none() {
                        bail!("Unknown command: `{value}`")
                    }
                }
                pending.push(value);
            }
        }
    }

    assign_positionals(g, pending, fields)?;
    if let Some(missing) = g.flags().find(|it| it.props.required && !seen.contains(&it.dest())) {
        bail!("Flag is required: `{}`", missing.names[0])
    }
    Ok(step)
}

/// Returns the destination of the matched flag.
fn parse_flag(g: &Grammar, flag: String, p: &mut Parser, fields: &mut Namespace) -> Result<String> {
    if let Some(arg) = find_flag(g, &flag) {
        apply(arg, &flag, None, p, fields)?;
        return Ok(arg.dest());
    }
    if flag.starts_with("--") {
        if let Some((name, value)) = flag.split_once('=') {
            if let Some(arg) = find_flag(g, name) {
                apply(arg, name, Some(value.to_string()), p, fields)?;
                return Ok(arg.dest());
            }
        }
    } else if let Some((idx, _)) = flag.char_indices().nth(2) {
        // `-vvv`, `-n92`
        let (short, rest) = flag.split_at(idx);
        if let Some(arg) = find_flag(g, short) {
            if arg.action().is_nullary() {
                p.push_back(Ok(format!("-{rest}")));
                apply(arg, short, None, p, fields)?;
            } else {
                apply(arg, short, Some(rest.to_string()), p, fields)?;
            }
            return Ok(arg.dest());
        }
    }
    bail!("Unknown flag: `{flag}`")
}

fn find_flag<'g>(g: &'g Grammar, flag: &str) -> Option<&'g GrammarArg> {
    g.flags().find(|it| it.names.iter().any(|name| name == flag))
}

fn apply(
    arg: &GrammarArg,
    flag: &str,
    attached: Option<String>,
    p: &mut Parser,
    fields: &mut Namespace,
) -> Result<()> {
    let dest = arg.dest();
    let action = arg.action();
    if action.is_nullary() {
        if attached.is_some() {
            bail!("Flag `{flag}` doesn't take a value")
        }
        let value = match action {
            Action::StoreTrue => Value::Bool(true),
            Action::StoreFalse => Value::Bool(false),
            Action::StoreConst => arg.props.const_value.clone().unwrap_or_default(),
            _ => Value::Int(fields.get(&dest).and_then(Value::as_int).unwrap_or(0) + 1),
        };
        fields.set(&dest, value);
        return Ok(());
    }

    let raw = match attached {
        Some(value) => {
            if let Some(Nargs::Exactly(n @ 2..)) = arg.props.nargs {
                bail!("Expected {n} values for `{flag}`, got 1")
            }
            vec![value]
        }
        None => take_values(p, flag, arg.props.nargs)?,
    };
    let value = shape(arg, convert_all(arg, flag, &raw)?);
    store(arg, flag, value, fields)
}

fn take_values(p: &mut Parser, flag: &str, nargs: Option<Nargs>) -> Result<Vec<String>> {
    let res = match nargs {
        None => vec![p.next_value(flag)?],
        Some(Nargs::Exactly(n)) => (0..n).map(|_| p.next_value(flag)).collect::<Result<_>>()?,
        Some(Nargs::ZeroOrOne) => p.next_if_value().into_iter().collect(),
        Some(Nargs::ZeroOrMore) => iter::from_fn(|| p.next_if_value()).collect(),
        Some(Nargs::OneOrMore) => {
            let mut res = vec![p.next_value(flag)?];
            res.extend(iter::from_fn(|| p.next_if_value()));
            res
        }
    };
    Ok(res)
}

/// Greedy left to right, but every positional keeps enough tokens for the ones after it.
fn assign_positionals(g: &Grammar, tokens: Vec<String>, fields: &mut Namespace) -> Result<()> {
    let positionals = g.positionals().collect::<Vec<_>>();
    let mins = positionals.iter().map(|it| it.props.nargs.map_or(1, Nargs::min)).collect::<Vec<_>>();

    let mut needed = 0;
    for (arg, min) in positionals.iter().zip(&mins) {
        needed += min;
        if needed > tokens.len() {
            bail!("Argument is required: `{}`", arg.names[0])
        }
    }

    let mut pos = 0;
    for (i, arg) in positionals.iter().enumerate() {
        let reserved: usize = mins[i + 1..].iter().sum();
        let available = (tokens.len() - pos).saturating_sub(reserved);
        let n = match arg.props.nargs {
            None => 1,
            Some(Nargs::Exactly(n)) => n,
            Some(Nargs::ZeroOrOne) => available.min(1),
            Some(Nargs::ZeroOrMore | Nargs::OneOrMore) => available,
        };
        let name = &arg.names[0];
        if n == 0 {
            continue;
        }
        let raw = &tokens[pos..pos + n];
        pos += n;
        let value = shape(arg, convert_all(arg, name, raw)?);
        store(arg, name, value, fields)?;
    }
    if let Some(extra) = tokens.get(pos) {
        bail!("Unexpected argument: `{extra}`")
    }
    Ok(())
}

fn initial_value(arg: &GrammarArg) -> Value {
    if let Some(default) = &arg.props.default {
        return default.clone();
    }
    match arg.action() {
        Action::StoreTrue => Value::Bool(false),
        Action::StoreFalse => Value::Bool(true),
        _ if arg.is_positional() && arg.props.nargs == Some(Nargs::ZeroOrMore) => {
            Value::List(Vec::new())
        }
        _ => Value::None,
    }
}

fn convert_all(arg: &GrammarArg, name: &str, raw: &[String]) -> Result<Vec<Value>> {
    raw.iter().map(|it| convert(arg, name, it)).collect()
}

fn convert(arg: &GrammarArg, name: &str, raw: &str) -> Result<Value> {
    let value = match &arg.props.converter {
        Some(converter) => {
            converter.convert(raw).map_err(|err| format_err!("Can't parse `{name}`, {err}"))?
        }
        None => Value::Str(raw.to_string()),
    };
    if let Some(choices) = &arg.props.choices {
        if !choices.iter().any(|it| it.matches(&value)) {
            let choices = choices.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
            bail!("Invalid choice for `{name}`: `{raw}` (choose from {choices})")
        }
    }
    Ok(value)
}

/// A single value unless the arity asks for a list.
fn shape(arg: &GrammarArg, values: Vec<Value>) -> Value {
    match arg.props.nargs {
        None => values.into_iter().next().unwrap_or_default(),
        Some(Nargs::ZeroOrOne) => values
            .into_iter()
            .next()
            .or_else(|| arg.props.const_value.clone())
            .unwrap_or_default(),
        Some(_) => Value::List(values),
    }
}

fn store(arg: &GrammarArg, name: &str, value: Value, fields: &mut Namespace) -> Result<()> {
    let dest = arg.dest();
    let value = match arg.action() {
        Action::Append => {
            let mut items = fields.take(&dest).unwrap_or_default().into_list();
            items.push(value);
            Value::List(items)
        }
        Action::Extend => {
            let mut items = fields.take(&dest).unwrap_or_default().into_list();
            items.extend(value.into_list());
            Value::List(items)
        }
        Action::Custom(custom) => {
            let current = fields.take(&dest).unwrap_or_default();
            custom.apply(&current, value).map_err(|err| format_err!("Invalid value for `{name}`: {err}"))?
        }
        _ => value,
    };
    fields.set(&dest, value);
    Ok(())
}

fn usage(g: &Grammar) -> String {
    let mut parts = vec![g.prog.clone()];
    if g.add_help {
        parts.push("[-h]".to_string());
    }
    for flag in g.flags().filter(|it| !it.is_suppressed()) {
        let mut it = flag.names[0].clone();
        if !flag.action().is_nullary() {
            it = format!("{it} {}", value_usage(flag, &flag.dest()));
        }
        if !flag.props.required {
            it = format!("[{it}]");
        }
        parts.push(it);
    }
    for arg in g.positionals().filter(|it| !it.is_suppressed()) {
        parts.push(value_usage(arg, &arg.dest()));
    }
    if !g.subcommands.is_empty() {
        parts.push("<command> ...".to_string());
    }
    parts.retain(|it| !it.is_empty());
    parts.join(" ")
}

/// `<name>`, `<a> <b>`, `[<name>]`, `[<name>]...`, `<name>...`, or `{a,b}` for choices.
fn value_usage(arg: &GrammarArg, dest: &str) -> String {
    let meta = |i: usize| -> String {
        if let Some(it) = arg.props.metavar.get(i).or_else(|| arg.props.metavar.first()) {
            return format!("<{it}>");
        }
        if let Some(choices) = &arg.props.choices {
            let choices = choices.iter().map(plain).collect::<Vec<_>>().join(",");
            return format!("{{{choices}}}");
        }
        format!("<{dest}>")
    };
    match arg.props.nargs {
        None => meta(0),
        Some(Nargs::Exactly(n)) => (0..n).map(meta).collect::<Vec<_>>().join(" "),
        Some(Nargs::ZeroOrOne) => format!("[{}]", meta(0)),
        Some(Nargs::ZeroOrMore) => format!("[{}]...", meta(0)),
        Some(Nargs::OneOrMore) => format!("{}...", meta(0)),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::Str(it) => it.clone(),
        it => it.to_string(),
    }
}

fn write_lines_indented(buf: &mut String, multiline_str: &str, indent: usize) {
    for line in multiline_str.split('\n').map(str::trim_end) {
        if line.is_empty() {
            w!(buf, "\n")
        } else {
            w!(buf, "{blank:indent$}{line}\n", blank = "");
        }
    }
}

fn blank_line(buf: &mut String) {
    w!(buf, "\n");
}
