//! Doc blocks of commands: a free text description followed by directives.
//!
//! ```text
//! List information about files.
//! :param files: List of files, may be empty.
//! :alias all: -a
//! :choices sort: 'fwd', 'rev'
//! :metavar ignore: PATTERN
//! ```

use crate::{
    annotation::eval_choices,
    argument::{position, Argument, Help},
    value::Scope,
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Docstring {
    /// Lines before the first directive, joined with single spaces.
    pub description: String,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Param { name: String, help: Help },
    Alias { name: String, aliases: Vec<String> },
    Choices { name: String, expr: String },
    Metavar { name: String, names: Vec<String> },
}

impl Docstring {
    pub fn parse(text: &str) -> Result<Docstring> {
        let mut description = Vec::new();
        let mut directives = Vec::new();
        let mut in_description = true;

        for line in text.lines().map(str::trim) {
            let directive = if let Some(rest) = keyword(line, ":param") {
                let (name, help) = split_payload(rest);
                let help = match help {
                    Some(it) if it.starts_with("SUPPRESS") => Help::Suppressed,
                    Some(it) => Help::Text(it.to_string()),
                    None => Help::Text(String::new()),
                };
                Directive::Param { name, help }
            } else if let Some(rest) = keyword(line, ":alias") {
                let (name, payload) = split_payload(rest);
                let payload = payload.filter(|it| !it.is_empty()).ok_or_else(|| {
                    format_err!(Value, ":alias {name}: directive requires at least one alias")
                })?;
                let aliases = payload.split(',').map(|it| it.trim().to_string()).collect();
                Directive::Alias { name, aliases }
            } else if let Some(rest) = keyword(line, ":choices") {
                let (name, payload) = split_payload(rest);
                let expr = payload.filter(|it| !it.is_empty()).ok_or_else(|| {
                    format_err!(Value, ":choices {name}: must have some actual choices")
                })?;
                Directive::Choices { name, expr: expr.to_string() }
            } else if let Some(rest) = keyword(line, ":metavar") {
                let (name, payload) = split_payload(rest);
                let payload = payload.filter(|it| !it.is_empty()).ok_or_else(|| {
                    format_err!(Value, ":metavar {name}: requires at least one metavar name")
                })?;
                let names = payload
                    .split(',')
                    .map(|it| it.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                    .collect();
                Directive::Metavar { name, names }
            } else {
                if in_description && !line.is_empty() {
                    description.push(line);
                }
                continue;
            };
            in_description = false;
            directives.push(directive);
        }

        Ok(Docstring { description: description.join(" "), directives })
    }
}

/// Applies the directives of `text` to `args`, returns the description.
pub fn interpret(text: &str, args: &mut [Argument], scope: &Scope) -> Result<String> {
    let doc = Docstring::parse(text)?;
    for directive in doc.directives {
        match directive {
            Directive::Param { name, help } => {
                let arg = lookup(args, &name).ok_or_else(|| {
                    format_err!(Name, ":param {name}: no parameter with the name `{name}`")
                })?;
                arg.set_help(help);
            }
            Directive::Alias { name, aliases } => {
                let arg = lookup(args, &name).filter(|it| !it.is_positional()).ok_or_else(|| {
                    format_err!(Name, ":alias {name}: can't find a flag or option named `{name}`")
                })?;
                for alias in aliases {
                    arg.add_alias(&alias)?;
                }
            }
            Directive::Choices { name, expr } => {
                let arg = lookup(args, &name).ok_or_else(|| {
                    format_err!(Name, ":choices {name}: can't find an argument named `{name}`")
                })?;
                arg.set_choices(eval_choices(&expr, scope)?)?;
            }
            Directive::Metavar { name, names } => {
                let arg = lookup(args, &name).ok_or_else(|| {
                    format_err!(Name, ":metavar {name}: can't find an argument named `{name}`")
                })?;
                arg.set_metavar(names)?;
            }
        }
    }
    Ok(doc.description)
}

fn lookup<'a>(args: &'a mut [Argument], name: &str) -> Option<&'a mut Argument> {
    let idx = position(args, name)?;
    args.get_mut(idx)
}

fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(kw)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// `name: payload`.
fn split_payload(rest: &str) -> (String, Option<&str>) {
    match rest.split_once(':') {
        Some((name, payload)) => (name.trim().to_string(), Some(payload.trim())),
        None => (rest.trim().to_string(), None),
    }
}
