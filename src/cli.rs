//! Registration and execution of commands.

use std::{collections::BTreeMap, fmt, future::Future, ops::Index, rc::Rc};

use futures::{future::LocalBoxFuture, FutureExt};
use tracing::debug;

use crate::{
    argument::Argument,
    config::{Config, HelpMode},
    grammar::{Grammar, Namespace, Parsed},
    io::{self, Input, Output, Streams},
    node::{Node, NodeId, Target, Tree},
    shlex::CommandLine,
    value::{Scope, Value},
    Error, ParseError, Result,
};

/// One declared parameter of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub(crate) name: String,
    pub(crate) annotation: Option<String>,
    pub(crate) default: Option<Value>,
}

impl Param {
    pub fn new(name: &str) -> Param {
        Param { name: name.to_string(), annotation: None, default: None }
    }

    /// A type expression, `"Option | OneOrMore[int]"`.
    pub fn annotation(mut self, text: &str) -> Param {
        self.annotation = Some(text.to_string());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Param {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registration options of a (sub-)command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOptions {
    /// One-line summary in the parent's command list, the description if unset.
    pub help: Option<String>,
    /// Overrides the description from the doc block.
    pub description: Option<String>,
    pub aliases: Vec<String>,
}

/// A command declaration: name, parameters, doc block and the code to run.
pub struct Command<R = ()> {
    name: String,
    params: Vec<Param>,
    doc: Option<String>,
    options: Option<CommandOptions>,
    arguments: Vec<Argument>,
    target: Target<R>,
}

impl<R> Command<R> {
    fn new(name: &str, target: Target<R>) -> Command<R> {
        Command {
            name: name.to_string(),
            params: Vec::new(),
            doc: None,
            options: None,
            arguments: Vec::new(),
            target,
        }
    }

    pub fn function<F, T>(name: &str, f: F) -> Command<R>
    where
        F: Fn(Args) -> anyhow::Result<T> + 'static,
        T: Into<Value>,
    {
        let f = move |args: Args| -> anyhow::Result<Value> { f(args).map(Into::into) };
        Command::new(name, Target::Function(Box::new(f)))
    }

    /// The command runs with the receiver given to `execute`.
    pub fn method<F, T>(name: &str, f: F) -> Command<R>
    where
        F: Fn(&mut R, Args) -> anyhow::Result<T> + 'static,
        T: Into<Value>,
    {
        let f = move |receiver: &mut R, args: Args| -> anyhow::Result<Value> {
            f(receiver, args).map(Into::into)
        };
        Command::new(name, Target::Method(Box::new(f)))
    }

    /// An async command, run by `execute_async` only.
    pub fn suspending<F, Fut, T>(name: &str, f: F) -> Command<R>
    where
        F: Fn(Args) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
        T: Into<Value>,
    {
        let f = move |args: Args| -> LocalBoxFuture<'static, anyhow::Result<Value>> {
            f(args).map(|res| res.map(Into::into)).boxed_local()
        };
        Command::new(name, Target::Suspending(Box::new(f)))
    }

    pub fn param(mut self, param: Param) -> Command<R> {
        self.params.push(param);
        self
    }

    pub fn doc(mut self, text: &str) -> Command<R> {
        self.doc = Some(text.to_string());
        self
    }

    pub fn options(mut self, options: CommandOptions) -> Command<R> {
        self.options = Some(options);
        self
    }

    /// An argument declared up front; a parameter of the same name adds to it.
    pub fn argument(mut self, arg: Argument) -> Command<R> {
        self.arguments.push(arg);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Values a command is called with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    /// Positional arguments, in declaration order.
    pub positional: Vec<Value>,
    /// Flags and options, by name without hyphens.
    pub keyword: BTreeMap<String, Value>,
}

impl Args {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keyword.get(key)
    }

    fn from_fields<R>(node: &Node<R>, mut fields: Namespace) -> Args {
        let positional = node.positional_order().iter().filter_map(|key| fields.take(key)).collect();
        let keyword = node
            .optional_order()
            .iter()
            .filter_map(|key| fields.take(key).map(|value| (key.clone(), value)))
            .collect();
        Args { positional, keyword }
    }
}

static NONE: Value = Value::None;

/// Missing positions read as `Value::None`.
impl Index<usize> for Args {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        self.positional.get(idx).unwrap_or(&NONE)
    }
}

/// Missing keys read as `Value::None`.
impl Index<&str> for Args {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.keyword.get(key).unwrap_or(&NONE)
    }
}

/// What happens to command lines that don't parse.
#[derive(Default)]
pub enum ErrorHandler<'a> {
    /// Writes the message to the active stderr.
    #[default]
    Print,
    Custom(Box<dyn FnMut(&ParseError) + 'a>),
    /// Returns [`Error::Parse`] from `execute`.
    Propagate,
}

impl<'a> ErrorHandler<'a> {
    pub fn custom(f: impl FnMut(&ParseError) + 'a) -> ErrorHandler<'a> {
        ErrorHandler::Custom(Box::new(f))
    }

    fn handle(&mut self, err: ParseError) -> Result<Value> {
        debug!(%err, "command line rejected");
        match self {
            ErrorHandler::Print => io::eprint(&format!("{err}\n"))?,
            ErrorHandler::Custom(f) => f(&err),
            ErrorHandler::Propagate => return Err(Error::Parse(err)),
        }
        Ok(Value::None)
    }
}

impl fmt::Debug for ErrorHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHandler::Print => f.write_str("Print"),
            ErrorHandler::Custom(_) => f.write_str("Custom"),
            ErrorHandler::Propagate => f.write_str("Propagate"),
        }
    }
}

/// Per call settings of `execute_with`.
pub struct Exec<'a, R = ()> {
    receiver: Option<&'a mut R>,
    error_handler: ErrorHandler<'a>,
    streams: Streams,
}

impl<R> Default for Exec<'_, R> {
    fn default() -> Self {
        Exec { receiver: None, error_handler: ErrorHandler::default(), streams: Streams::default() }
    }
}

impl<'a, R> Exec<'a, R> {
    pub fn new() -> Exec<'a, R> {
        Exec::default()
    }

    pub fn receiver(mut self, receiver: &'a mut R) -> Exec<'a, R> {
        self.receiver = Some(receiver);
        self
    }

    pub fn error_handler(mut self, handler: ErrorHandler<'a>) -> Exec<'a, R> {
        self.error_handler = handler;
        self
    }

    pub fn stdin(mut self, input: impl Into<Input>) -> Exec<'a, R> {
        self.streams.stdin = Some(input.into());
        self
    }

    pub fn stdout(mut self, output: Output) -> Exec<'a, R> {
        self.streams.stdout = Some(output);
        self
    }

    pub fn stderr(mut self, output: Output) -> Exec<'a, R> {
        self.streams.stderr = Some(output);
        self
    }
}

/// A set of commands, compiled into one command line grammar.
///
/// `R` is the receiver type of method commands.
pub struct Cli<R = ()> {
    tree: Tree<R>,
    scope: Scope,
    config: Config,
}

impl<R> Default for Cli<R> {
    fn default() -> Self {
        Cli::with_config(Config::default())
    }
}

impl<R> fmt::Debug for Cli<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli").field("config", &self.config).field("nodes", &self.tree.len()).finish()
    }
}

enum Resolved {
    Call(NodeId, Args),
    /// Error handled or help printed.
    Done(Value),
}

impl<R> Cli<R> {
    pub fn new() -> Cli<R> {
        Cli::default()
    }

    pub fn with_config(config: Config) -> Cli<R> {
        let mut tree = Tree::new(&config.prog, config.help_mode == HelpMode::DashH);
        if !config.description.is_empty() {
            tree.set_description(NodeId::ROOT, &config.description);
        }
        if config.help_mode == HelpMode::Command {
            tree.install_help_command();
        }
        Cli { tree, scope: Scope::default(), config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Converters, choice sets and actions that annotations and `:choices:` refer to.
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn tree(&self) -> &Tree<R> {
        &self.tree
    }

    pub fn grammar(&self) -> Rc<Grammar> {
        self.tree.grammar()
    }

    /// Registers `command`; `switch_on` becomes the sub-command `on` of `switch`.
    pub fn command(&mut self, command: Command<R>) -> Result<&mut Cli<R>> {
        let Command { name, params, doc, options, arguments, target } = command;
        let path = self.config.command_path(&name);
        let id = self.tree.get_or_create(NodeId::ROOT, &path);
        for arg in arguments {
            self.tree.add_argument(id, arg)?;
        }
        if let Some(options) = options {
            self.tree.set_options(id, options);
        }
        self.tree.set_target(id, target, &params, doc.as_deref(), &self.scope)?;
        debug!(name = %name, path = %path.join(" "), "registered command");
        Ok(self)
    }

    /// Declares an argument of the command called `command` (the declared name, not the
    /// path), before or after the command itself is registered.
    pub fn add_argument(&mut self, command: &str, arg: Argument) -> Result<&mut Cli<R>> {
        let path = self.config.command_path(command);
        let id = self.tree.get_or_create(NodeId::ROOT, &path);
        self.tree.add_argument(id, arg)?;
        Ok(self)
    }

    /// Turns `-h`/`--help` on or off for a command and everything below it. An empty
    /// path is the whole program.
    pub fn set_help_enabled(&mut self, command: &[&str], enabled: bool) -> Result<()> {
        let id = self
            .tree
            .find(NodeId::ROOT, command)
            .ok_or_else(|| format_err!(Name, "no command `{}`", command.join(" ")))?;
        self.tree.set_help_enabled(id, enabled);
        Ok(())
    }

    /// Help text of the command at `path`, or of the whole program if there is none.
    pub fn help<S: AsRef<str>>(&self, path: &[S]) -> String {
        let id = if self.tree.has_node(path) {
            self.tree.find(NodeId::ROOT, path).unwrap_or(NodeId::ROOT)
        } else {
            NodeId::ROOT
        };
        let grammar = self.tree.grammar();
        let g = grammar.find(id).unwrap_or(&grammar);
        self.config.engine.render_help(g)
    }

    pub fn execute(&self, line: impl Into<CommandLine>) -> Result<Value> {
        self.execute_with(line, Exec::default())
    }

    /// Parses `line` and runs the matching command.
    ///
    /// The streams in `exec` are active until this returns, however it returns.
    pub fn execute_with(&self, line: impl Into<CommandLine>, exec: Exec<'_, R>) -> Result<Value> {
        let Exec { receiver, mut error_handler, streams } = exec;
        let _redirect = io::redirect(streams);
        let (id, args) = match self.resolve(line.into(), &mut error_handler)? {
            Resolved::Call(id, args) => (id, args),
            Resolved::Done(value) => return Ok(value),
        };
        match self.tree.node(id).target() {
            Target::Suspending(_) => Err(Error::Suspending(self.display_path(id))),
            _ => self.dispatch(id, args, receiver),
        }
    }

    /// Like [`Cli::execute_with`], but async commands are awaited.
    pub async fn execute_async(
        &self,
        line: impl Into<CommandLine>,
        exec: Exec<'_, R>,
    ) -> Result<Value> {
        let Exec { receiver, mut error_handler, streams } = exec;
        let _redirect = io::redirect(streams);
        let (id, args) = match self.resolve(line.into(), &mut error_handler)? {
            Resolved::Call(id, args) => (id, args),
            Resolved::Done(value) => return Ok(value),
        };
        match self.tree.node(id).target() {
            Target::Suspending(f) => {
                debug!(command = %self.display_path(id), "dispatch async");
                f(args).await.map_err(Error::Command)
            }
            _ => self.dispatch(id, args, receiver),
        }
    }

    fn resolve(&self, line: CommandLine, error_handler: &mut ErrorHandler<'_>) -> Result<Resolved> {
        let parsed = line.into_tokens().and_then(|tokens| {
            let grammar = self.tree.grammar();
            self.config.engine.parse(&grammar, tokens)
        });
        match parsed {
            Ok(Parsed::Matched { node, fields }) => {
                Ok(Resolved::Call(node, Args::from_fields(self.tree.node(node), fields)))
            }
            Ok(Parsed::Help(text)) => {
                io::print(&text)?;
                Ok(Resolved::Done(Value::None))
            }
            Err(err) => error_handler.handle(err).map(Resolved::Done),
        }
    }

    fn dispatch(&self, id: NodeId, args: Args, receiver: Option<&mut R>) -> Result<Value> {
        let node = self.tree.node(id);
        debug!(command = %self.display_path(id), target = ?node.target(), "dispatch");
        match node.target() {
            Target::Noop => Ok(Value::None),
            Target::Help => {
                let path = args[0]
                    .as_list()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>();
                io::print(&self.help(&path))?;
                Ok(Value::None)
            }
            Target::Function(f) => f(args).map_err(Error::Command),
            Target::Method(f) => {
                let receiver =
                    receiver.ok_or_else(|| Error::MissingReceiver(self.display_path(id)))?;
                f(receiver, args).map_err(Error::Command)
            }
            Target::Suspending(_) => Err(Error::Suspending(self.display_path(id))),
        }
    }

    fn display_path(&self, id: NodeId) -> String {
        self.tree.path(id).join(" ")
    }
}
