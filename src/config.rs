use std::str::FromStr;

use crate::{grammar::Engine, rt::ArgParser, Error};

/// How users get to see help texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelpMode {
    /// A `help [command...]` command.
    #[default]
    Command,
    /// `-h`/`--help` on every command.
    DashH,
    None,
}

impl FromStr for HelpMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<HelpMode, Error> {
        match s {
            "help" => Ok(HelpMode::Command),
            "-h" => Ok(HelpMode::DashH),
            "none" => Ok(HelpMode::None),
            _ => Err(format_err!(Value, "help mode may only be `help`, `-h` or `none`, was `{s}`")),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub help_mode: HelpMode,
    /// Replaced by a hyphen in command names before they are split on underscores, so
    /// `foo__bar` registers the command `foo-bar`.
    pub separator: String,
    pub engine: Box<dyn Engine>,
    /// Shown in usage lines, empty by default as commands usually come from a prompt.
    pub prog: String,
    pub description: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            help_mode: HelpMode::default(),
            separator: "__".to_string(),
            engine: Box::new(ArgParser),
            prog: String::new(),
            description: String::new(),
        }
    }
}

impl Config {
    /// Command path segments for a declared command name.
    pub fn command_path(&self, name: &str) -> Vec<String> {
        let name = if self.separator.is_empty() {
            name.to_string()
        } else {
            name.replace(&self.separator, "-")
        };
        name.split('_').filter(|it| !it.is_empty()).map(str::to_string).collect()
    }
}
