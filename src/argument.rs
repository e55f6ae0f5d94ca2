use std::fmt;

use crate::{
    grammar::{GrammarArg, GrammarProps},
    value::{Converter, CustomAction, Value},
    Error, Result,
};

/// What the grammar engine does with the values of an argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Store,
    StoreConst,
    StoreTrue,
    StoreFalse,
    Append,
    Extend,
    Count,
    Custom(CustomAction),
}

impl Action {
    /// Actions which never consume a value from the command line.
    pub fn is_nullary(&self) -> bool {
        matches!(self, Action::StoreConst | Action::StoreTrue | Action::StoreFalse | Action::Count)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Store => "store",
            Action::StoreConst => "store_const",
            Action::StoreTrue => "store_true",
            Action::StoreFalse => "store_false",
            Action::Append => "append",
            Action::Extend => "extend",
            Action::Count => "count",
            Action::Custom(it) => return f.write_str(it.name()),
        };
        f.write_str(s)
    }
}

/// Number of command line values an argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nargs {
    Exactly(usize),
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Nargs {
    pub(crate) fn min(self) -> usize {
        match self {
            Nargs::Exactly(n) => n,
            Nargs::ZeroOrOne | Nargs::ZeroOrMore => 0,
            Nargs::OneOrMore => 1,
        }
    }
}

impl fmt::Display for Nargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nargs::Exactly(n) => write!(f, "{n}"),
            Nargs::ZeroOrOne => f.write_str("?"),
            Nargs::ZeroOrMore => f.write_str("*"),
            Nargs::OneOrMore => f.write_str("+"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Help {
    Text(String),
    /// Listed nowhere in the help output.
    Suppressed,
}

/// Surface grammar of a single command argument.
///
/// Information arrives from independent sources (the parameter declaration, its type
/// expression, the doc block, explicit `add_argument` calls), so most properties can be
/// set only once: setting the same value again is fine, a different value is a
/// [`Error::Conflict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: String,
    aliases: Vec<String>,
    action: Option<Action>,
    nargs: Option<Nargs>,
    const_value: Option<Value>,
    default: Option<Value>,
    converter: Option<Converter>,
    choices: Option<Vec<Value>>,
    required: bool,
    help: Option<Help>,
    metavar: Vec<String>,
}

fn merge<T>(slot: &mut Option<T>, property: &'static str, new: T) -> Result<()>
where
    T: PartialEq + fmt::Debug,
{
    match slot {
        Some(old) if *old != new => Err(Error::conflict(property, fmt_debug(old), fmt_debug(&new))),
        Some(_) => Ok(()),
        None => {
            *slot = Some(new);
            Ok(())
        }
    }
}

fn fmt_debug(it: &impl fmt::Debug) -> String {
    format!("{it:?}")
}

impl Argument {
    pub fn new(name: &str) -> Result<Argument> {
        check_name(name)?;
        Ok(Argument::unchecked(name))
    }

    fn unchecked(name: &str) -> Argument {
        Argument {
            name: name.to_string(),
            aliases: Vec::new(),
            action: None,
            nargs: None,
            const_value: None,
            default: None,
            converter: None,
            choices: None,
            required: false,
            help: None,
            metavar: Vec::new(),
        }
    }

    /// A positional collecting all remaining words, for built-in commands.
    pub(crate) fn rest(name: &'static str, help: &str) -> Argument {
        let mut res = Argument::unchecked(name);
        res.nargs = Some(Nargs::ZeroOrMore);
        res.help = Some(Help::Text(help.to_string()));
        res
    }

    /// Builds an argument from grammar style names: `["--foo", "-f"]`.
    ///
    /// The first `--` name is canonical (or the first `-` name if there is none), the
    /// rest become aliases, `--` ones first.
    pub fn from_names(names: &[&str]) -> Result<Argument> {
        match names {
            [] => bail!(Value, "name of the argument is missing"),
            [name] => Argument::new(name),
            _ => {
                if let Some(bad) = names.iter().find(|it| !it.starts_with('-')) {
                    bail!(Value, "flag or option must start with a `-`: `{bad}`")
                }
                let (mut options, mut flags): (Vec<&str>, Vec<&str>) =
                    names.iter().partition(|it| it.starts_with("--"));
                let name = if options.is_empty() { flags.remove(0) } else { options.remove(0) };
                let mut res = Argument::new(name)?;
                for alias in options.into_iter().chain(flags) {
                    res.add_alias(alias)?;
                }
                Ok(res)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name without leading hyphens, which is also the key of the parsed value.
    pub fn key(&self) -> &str {
        self.name.trim_start_matches('-')
    }

    pub fn is_positional(&self) -> bool {
        !self.name.starts_with('-')
    }

    pub fn is_flag(&self) -> bool {
        self.name.starts_with('-') && !self.name.starts_with("--")
    }

    pub fn is_option(&self) -> bool {
        self.name.starts_with("--")
    }

    /// Turns a positional argument into a `-name` flag.
    pub fn mark_flag(&mut self) -> Result<()> {
        self.mark_kind("-")
    }

    /// Turns a positional argument into a `--name` option.
    pub fn mark_option(&mut self) -> Result<()> {
        self.mark_kind("--")
    }

    fn mark_kind(&mut self, prefix: &str) -> Result<()> {
        let new = format!("{prefix}{}", self.key());
        if self.is_positional() {
            self.name = new;
            return Ok(());
        }
        if self.name != new {
            return Err(Error::conflict("name", &self.name, new));
        }
        Ok(())
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn add_alias(&mut self, alias: &str) -> Result<()> {
        if self.is_positional() {
            bail!(Value, "aliases can only be added to flags or options, `{}` is positional", self.name)
        }
        if !alias.starts_with('-') {
            bail!(Value, "an alias must start with a `-`: `{alias}`")
        }
        self.aliases.push(alias.to_string());
        Ok(())
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn set_action(&mut self, action: Action) -> Result<()> {
        merge(&mut self.action, "action", action)
    }

    pub fn nargs(&self) -> Option<Nargs> {
        self.nargs
    }

    pub fn set_nargs(&mut self, nargs: Nargs) -> Result<()> {
        if nargs == Nargs::Exactly(0) {
            bail!(Value, "number of arguments must be 1 or greater, was 0")
        }
        merge(&mut self.nargs, "nargs", nargs)
    }

    pub fn const_value(&self) -> Option<&Value> {
        self.const_value.as_ref()
    }

    pub fn set_const(&mut self, value: Value) -> Result<()> {
        merge(&mut self.const_value, "const", value)
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn set_default(&mut self, value: Value) -> Result<()> {
        merge(&mut self.default, "default", value)
    }

    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    pub fn set_converter(&mut self, converter: Converter) -> Result<()> {
        merge(&mut self.converter, "type", converter)
    }

    /// Drops the type, needed by actions which imply their own (`store_true`, `count`).
    pub fn clear_converter(&mut self) {
        self.converter = None;
    }

    pub fn choices(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    /// Unlike the other properties choices can't be set twice, not even to equal values.
    pub fn set_choices(&mut self, choices: Vec<Value>) -> Result<()> {
        if let Some(old) = &self.choices {
            return Err(Error::conflict(
                "choices",
                Value::List(old.clone()),
                Value::List(choices),
            ));
        }
        self.choices = Some(choices);
        Ok(())
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    pub fn help(&self) -> Option<&Help> {
        self.help.as_ref()
    }

    pub fn set_help(&mut self, help: Help) {
        self.help = Some(help);
    }

    pub fn metavar(&self) -> &[String] {
        &self.metavar
    }

    /// With more than one name the count must match an exact `nargs`.
    pub fn set_metavar(&mut self, names: Vec<String>) -> Result<()> {
        if names.len() > 1 && self.nargs != Some(Nargs::Exactly(names.len())) {
            let nargs = self.nargs.map(|it| it.to_string()).unwrap_or_else(|| "None".to_string());
            bail!(
                Value,
                "list of metavar entries ({}) must match the number of arguments in nargs ({nargs})",
                names.len()
            )
        }
        self.metavar = names;
        Ok(())
    }

    /// The destination key is pinned to the canonical name once aliases exist, otherwise
    /// the longest alias could win.
    pub fn dest(&self) -> Option<String> {
        if self.aliases.is_empty() {
            None
        } else {
            Some(self.key().to_string())
        }
    }

    /// Fails if a default is set which is not one of the choices.
    pub fn check_default_in_choices(&self) -> Result<()> {
        if let (Some(default), Some(choices)) = (&self.default, &self.choices) {
            if !default.is_none() && !choices.iter().any(|it| it.matches(default)) {
                bail!(Value, "default value {default} must be in the list of choices")
            }
        }
        Ok(())
    }

    pub fn grammar_args(&self) -> GrammarArg {
        let mut names = vec![self.name.clone()];
        names.extend(self.aliases.iter().cloned());
        let props = GrammarProps {
            action: self.action.clone(),
            nargs: self.nargs,
            const_value: self.const_value.clone(),
            default: self.default.clone().filter(|it| !it.is_none()),
            converter: self.converter.clone(),
            choices: self.choices.clone(),
            required: self.required,
            help: self.help.clone(),
            metavar: self.metavar.clone(),
            dest: self.dest(),
        };
        GrammarArg { names, props }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.grammar_args();
        f.write_str(&args.names.join(","))?;
        for (key, value) in args.props.entries() {
            write!(f, ", {key}={value}")?;
        }
        Ok(())
    }
}

/// Index of the argument called `name`, `-name` or `--name`.
pub(crate) fn position(args: &[Argument], name: &str) -> Option<usize> {
    [name.to_string(), format!("-{name}"), format!("--{name}")]
        .iter()
        .find_map(|candidate| args.iter().position(|it| it.name() == candidate))
}

fn check_name(name: &str) -> Result<()> {
    let ident = name.trim_start_matches('-');
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(c) => {
            (c.is_alphabetic() || c == '_') && chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        bail!(Value, "name `{name}` is not a valid name for an argument")
    }
    Ok(())
}
