//! The materialized form of a command tree, and the engine interface that runs it.

use std::{collections::BTreeMap, fmt};

use crate::{
    argument::{Action, Help, Nargs},
    node::NodeId,
    value::{Converter, Value},
    ParseError,
};

/// Matches token streams against a [`Grammar`].
pub trait Engine: fmt::Debug {
    fn parse(&self, grammar: &Grammar, tokens: Vec<String>) -> Result<Parsed, ParseError>;

    /// Usage and help text for one grammar node.
    fn render_help(&self, grammar: &Grammar) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Matched { node: NodeId, fields: Namespace },
    /// `-h`/`--help` was given.
    Help(String),
}

/// Parsed values keyed by destination name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Namespace(BTreeMap<String, Value>);

impl Namespace {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One node of a materialized command tree.
#[derive(Debug, Clone)]
pub struct Grammar {
    /// `None` for the root.
    pub name: Option<String>,
    /// Names leading to this node, used in usage lines.
    pub prog: String,
    pub aliases: Vec<String>,
    /// One-line summary shown in the parent's listing.
    pub help: Option<String>,
    pub description: String,
    pub add_help: bool,
    pub args: Vec<GrammarArg>,
    pub node: NodeId,
    pub subcommands: Vec<Grammar>,
}

impl Grammar {
    pub fn find(&self, node: NodeId) -> Option<&Grammar> {
        if self.node == node {
            return Some(self);
        }
        self.subcommands.iter().find_map(|it| it.find(node))
    }

    pub fn subcommand(&self, name: &str) -> Option<&Grammar> {
        self.subcommands
            .iter()
            .find(|it| it.name.as_deref() == Some(name) || it.aliases.iter().any(|a| a == name))
    }

    pub fn positionals(&self) -> impl Iterator<Item = &GrammarArg> {
        self.args.iter().filter(|it| it.is_positional())
    }

    pub fn flags(&self) -> impl Iterator<Item = &GrammarArg> {
        self.args.iter().filter(|it| !it.is_positional())
    }
}

/// Names plus properties of one argument, ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarArg {
    pub names: Vec<String>,
    pub props: GrammarProps,
}

impl GrammarArg {
    pub fn is_positional(&self) -> bool {
        !self.names[0].starts_with('-')
    }

    pub fn dest(&self) -> String {
        match &self.props.dest {
            Some(it) => it.clone(),
            None => self.names[0].trim_start_matches('-').to_string(),
        }
    }

    pub fn action(&self) -> Action {
        self.props.action.clone().unwrap_or(Action::Store)
    }

    pub fn is_required(&self) -> bool {
        if self.is_positional() {
            !matches!(self.props.nargs, Some(Nargs::ZeroOrOne | Nargs::ZeroOrMore))
        } else {
            self.props.required
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.props.help == Some(Help::Suppressed)
    }

    pub fn help_text(&self) -> Option<&str> {
        match &self.props.help {
            Some(Help::Text(it)) if !it.is_empty() => Some(it),
            _ => None,
        }
    }
}

/// Only the fields that differ from the engine's defaults are set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrammarProps {
    pub action: Option<Action>,
    pub nargs: Option<Nargs>,
    pub const_value: Option<Value>,
    pub default: Option<Value>,
    pub converter: Option<Converter>,
    pub choices: Option<Vec<Value>>,
    pub required: bool,
    pub help: Option<Help>,
    pub metavar: Vec<String>,
    pub dest: Option<String>,
}

impl GrammarProps {
    /// Set fields in a fixed order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut res = Vec::new();
        if let Some(it) = &self.action {
            res.push(("action", it.to_string()));
        }
        if let Some(it) = &self.nargs {
            res.push(("nargs", it.to_string()));
        }
        if let Some(it) = &self.const_value {
            res.push(("const", it.to_string()));
        }
        if let Some(it) = &self.default {
            res.push(("default", it.to_string()));
        }
        if let Some(it) = &self.converter {
            res.push(("type", it.to_string()));
        }
        if let Some(it) = &self.choices {
            res.push(("choices", Value::List(it.clone()).to_string()));
        }
        if self.required {
            res.push(("required", "True".to_string()));
        }
        match &self.help {
            Some(Help::Text(it)) => res.push(("help", format!("{it:?}"))),
            Some(Help::Suppressed) => res.push(("help", "SUPPRESS".to_string())),
            None => (),
        }
        match self.metavar.as_slice() {
            [] => (),
            [it] => res.push(("metavar", format!("{it:?}"))),
            many => res.push(("metavar", format!("{many:?}"))),
        }
        if let Some(it) = &self.dest {
            res.push(("dest", format!("{it:?}")));
        }
        res
    }
}
