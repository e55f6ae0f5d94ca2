//! The command tree.
//!
//! Nodes live in an arena owned by [`Tree`]; a node refers to its parent and children by
//! [`NodeId`]. The tree compiles into a [`Grammar`] on first use and caches it until the
//! next mutation.

use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use futures::future::LocalBoxFuture;
use tracing::debug;

use crate::{
    annotation,
    argument::{position, Action, Argument},
    cli::{Args, CommandOptions, Param},
    docstring,
    grammar::Grammar,
    value::{Scope, Value},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

pub type FunctionFn = dyn Fn(Args) -> anyhow::Result<Value>;
pub type MethodFn<R> = dyn Fn(&mut R, Args) -> anyhow::Result<Value>;
pub type SuspendingFn = dyn Fn(Args) -> LocalBoxFuture<'static, anyhow::Result<Value>>;

/// What runs when a command line resolves to a node.
pub enum Target<R> {
    /// Nothing registered, a bare intermediate command.
    Noop,
    /// The built-in `help` command.
    Help,
    Function(Box<FunctionFn>),
    /// Needs the receiver passed to `execute`.
    Method(Box<MethodFn<R>>),
    /// Must be awaited, only `execute_async` runs it.
    Suspending(Box<SuspendingFn>),
}

impl<R> Target<R> {
    pub fn requires_receiver(&self) -> bool {
        matches!(self, Target::Method(_))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Target::Suspending(_))
    }
}

impl<R> fmt::Debug for Target<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Target::Noop => "Noop",
            Target::Help => "Help",
            Target::Function(_) => "Function",
            Target::Method(_) => "Method",
            Target::Suspending(_) => "Suspending",
        };
        f.write_str(s)
    }
}

pub struct Node<R> {
    name: Option<String>,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    arguments: Vec<Argument>,
    positional_order: Vec<String>,
    optional_order: Vec<String>,
    target: Target<R>,
    description: String,
    help_enabled: bool,
    options: CommandOptions,
}

impl<R> Node<R> {
    fn new(name: Option<String>, parent: Option<NodeId>, help_enabled: bool) -> Node<R> {
        Node {
            name,
            parent,
            children: BTreeMap::new(),
            arguments: Vec::new(),
            positional_order: Vec::new(),
            optional_order: Vec::new(),
            target: Target::Noop,
            description: String::new(),
            help_enabled,
            options: CommandOptions::default(),
        }
    }

    /// `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// In the order they were added.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Looks up `name`, `-name` and `--name`.
    pub fn get_argument(&self, name: &str) -> Option<&Argument> {
        position(&self.arguments, name).map(|idx| &self.arguments[idx])
    }

    /// Keys of positional arguments, in call order.
    pub fn positional_order(&self) -> &[String] {
        &self.positional_order
    }

    /// Keys of flags and options, in declaration order.
    pub fn optional_order(&self) -> &[String] {
        &self.optional_order
    }

    pub fn target(&self) -> &Target<R> {
        &self.target
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn help_enabled(&self) -> bool {
        self.help_enabled
    }

    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    fn reindex(&mut self) {
        let (positional, optional): (Vec<&Argument>, Vec<&Argument>) =
            self.arguments.iter().partition(|it| it.is_positional());
        self.positional_order = positional.iter().map(|it| it.key().to_string()).collect();
        self.optional_order = optional.iter().map(|it| it.key().to_string()).collect();
    }
}

/// Arena of command nodes plus the cached grammar.
pub struct Tree<R> {
    nodes: Vec<Node<R>>,
    prog: String,
    grammar: RefCell<Option<Rc<Grammar>>>,
}

impl<R> Tree<R> {
    pub fn new(prog: &str, help_enabled: bool) -> Tree<R> {
        Tree {
            nodes: vec![Node::new(None, None, help_enabled)],
            prog: prog.to_string(),
            grammar: RefCell::new(None),
        }
    }

    pub fn root(&self) -> &Node<R> {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> &Node<R> {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Names from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<&str> {
        let mut res = Vec::new();
        let mut curr = Some(id);
        while let Some(id) = curr {
            let node = self.node(id);
            res.extend(node.name());
            curr = node.parent;
        }
        res.reverse();
        res
    }

    fn display_path(&self, id: NodeId) -> String {
        match self.path(id).join(" ") {
            it if it.is_empty() => "<root>".to_string(),
            it => it,
        }
    }

    /// Walks `path` down from `at`, creating missing nodes. New nodes copy the
    /// `help_enabled` setting of their parent.
    pub fn get_or_create<S: AsRef<str>>(&mut self, at: NodeId, path: &[S]) -> NodeId {
        let mut curr = at;
        for name in path {
            let name = name.as_ref();
            curr = match self.node(curr).child(name) {
                Some(child) => child,
                None => {
                    let id = NodeId(self.nodes.len());
                    let help_enabled = self.node(curr).help_enabled;
                    self.nodes.push(Node::new(Some(name.to_string()), Some(curr), help_enabled));
                    self.nodes[curr.0].children.insert(name.to_string(), id);
                    debug!(command = %self.display_path(id), "new command node");
                    self.invalidate();
                    id
                }
            };
        }
        curr
    }

    pub fn find<S: AsRef<str>>(&self, at: NodeId, path: &[S]) -> Option<NodeId> {
        path.iter().try_fold(at, |curr, name| self.node(curr).child(name.as_ref()))
    }

    /// Whether a command exists at `path`, counted from the root. The empty path names no
    /// command.
    pub fn has_node<S: AsRef<str>>(&self, path: &[S]) -> bool {
        !path.is_empty() && self.find(NodeId::ROOT, path).is_some()
    }

    pub fn add_argument(&mut self, id: NodeId, arg: Argument) -> Result<()> {
        if self.node(id).arguments.iter().any(|it| it.name() == arg.name()) {
            bail!(Value, "argument `{}` declared twice on `{}`", arg.name(), self.display_path(id))
        }
        debug!(command = %self.display_path(id), %arg, "add argument");
        let node = &mut self.nodes[id.0];
        node.arguments.push(arg);
        node.reindex();
        self.invalidate();
        Ok(())
    }

    /// Installs the target, deriving arguments from `params` and the doc block first.
    pub fn set_target(
        &mut self,
        id: NodeId,
        target: Target<R>,
        params: &[Param],
        doc: Option<&str>,
        scope: &Scope,
    ) -> Result<()> {
        self.analyse_signature(id, params, scope)?;
        if let Some(doc) = doc {
            self.analyse_docstring(id, doc, scope)?;
        }
        debug!(command = %self.display_path(id), ?target, "set target");
        self.nodes[id.0].target = target;
        self.invalidate();
        Ok(())
    }

    /// Merges every parameter into the argument of the same name, creating it if no
    /// argument was registered up front. Nothing changes if any parameter fails.
    pub fn analyse_signature(&mut self, id: NodeId, params: &[Param], scope: &Scope) -> Result<()> {
        let mut arguments = self.node(id).arguments.clone();
        for param in params {
            let existing = position(&arguments, &param.name);
            let mut arg = match existing {
                Some(idx) => arguments[idx].clone(),
                None => Argument::new(&param.name)?,
            };
            if let Some(annotation) = &param.annotation {
                annotation::interpret(annotation, &mut arg, scope)?;
            }
            if let Some(default) = param.default.clone().filter(|it| !it.is_none()) {
                apply_default(&mut arg, default)?;
            }
            arg.check_default_in_choices()?;
            match existing {
                Some(idx) => arguments[idx] = arg,
                None => arguments.push(arg),
            }
        }
        self.commit_arguments(id, arguments);
        Ok(())
    }

    pub fn analyse_docstring(&mut self, id: NodeId, doc: &str, scope: &Scope) -> Result<()> {
        let mut arguments = self.node(id).arguments.clone();
        let description = docstring::interpret(doc, &mut arguments, scope)?;
        self.nodes[id.0].description = description;
        self.commit_arguments(id, arguments);
        Ok(())
    }

    fn commit_arguments(&mut self, id: NodeId, arguments: Vec<Argument>) {
        let node = &mut self.nodes[id.0];
        node.arguments = arguments;
        node.reindex();
        self.invalidate();
    }

    /// `help [command...]`.
    pub(crate) fn install_help_command(&mut self) -> NodeId {
        let id = self.get_or_create(NodeId::ROOT, &["help"]);
        let node = &mut self.nodes[id.0];
        node.arguments.push(Argument::rest("command", "Name of the command to get help for."));
        node.reindex();
        node.description = "Prints help for the given command.".to_string();
        node.target = Target::Help;
        self.invalidate();
        id
    }

    /// Applies to `id` and everything below it, as it stands now.
    pub fn set_help_enabled(&mut self, id: NodeId, enabled: bool) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.help_enabled = enabled;
            stack.extend(node.children.values().copied());
        }
        self.invalidate();
    }

    pub fn set_options(&mut self, id: NodeId, options: CommandOptions) {
        self.nodes[id.0].options = options;
        self.invalidate();
    }

    pub fn set_description(&mut self, id: NodeId, description: &str) {
        self.nodes[id.0].description = description.to_string();
        self.invalidate();
    }

    pub fn is_built(&self) -> bool {
        self.grammar.borrow().is_some()
    }

    /// The grammar of the whole tree, rebuilt if anything changed since the last call.
    pub fn grammar(&self) -> Rc<Grammar> {
        if let Some(it) = &*self.grammar.borrow() {
            return Rc::clone(it);
        }
        debug!(nodes = self.nodes.len(), "materialize command tree");
        let res = Rc::new(self.materialize(NodeId::ROOT, &self.prog));
        *self.grammar.borrow_mut() = Some(Rc::clone(&res));
        res
    }

    fn invalidate(&mut self) {
        self.grammar.get_mut().take();
    }

    fn materialize(&self, id: NodeId, prog: &str) -> Grammar {
        let node = self.node(id);
        let prog = match &node.name {
            Some(name) if prog.is_empty() => name.clone(),
            Some(name) => format!("{prog} {name}"),
            None => prog.to_string(),
        };
        let description =
            node.options.description.clone().unwrap_or_else(|| node.description.clone());
        let help =
            node.options.help.clone().or_else(|| Some(description.clone())).filter(|it| !it.is_empty());
        Grammar {
            name: node.name.clone(),
            aliases: node.options.aliases.clone(),
            help,
            description,
            add_help: node.help_enabled,
            args: node.arguments.iter().map(Argument::grammar_args).collect(),
            node: id,
            subcommands: node.children.values().map(|&child| self.materialize(child, &prog)).collect(),
            prog,
        }
    }

    /// Nested command names, for prompt completers.
    pub fn command_map(&self) -> CommandMap {
        self.command_map_of(NodeId::ROOT)
    }

    fn command_map_of(&self, id: NodeId) -> CommandMap {
        let children = self
            .node(id)
            .children
            .iter()
            .map(|(name, &child)| (name.clone(), self.command_map_of(child)))
            .collect();
        CommandMap { children }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, level: usize) -> fmt::Result {
        let node = self.node(id);
        let args = node.arguments.iter().map(Argument::name).collect::<Vec<_>>().join(",");
        let name = node.name().unwrap_or("<root>");
        write!(f, "{:indent$}{name}({args})", "", indent = level * 2)?;
        if !node.description.is_empty() {
            write!(f, " : {}", node.description)?;
        }
        writeln!(f)?;
        for &child in node.children.values() {
            self.fmt_node(f, child, level + 1)?;
        }
        Ok(())
    }
}

impl<R> fmt::Display for Tree<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, NodeId::ROOT, 0)
    }
}

/// `false` and `true` defaults turn flags into switches; for `store_const` the default is
/// the constant.
fn apply_default(arg: &mut Argument, default: Value) -> Result<()> {
    if !arg.is_positional() {
        match default {
            Value::Bool(false) => {
                arg.set_action(Action::StoreTrue)?;
                arg.clear_converter();
            }
            Value::Bool(true) => {
                arg.set_action(Action::StoreFalse)?;
                arg.clear_converter();
            }
            _ => (),
        }
    }
    if arg.action() == Some(&Action::StoreConst) {
        arg.set_const(default)
    } else {
        arg.set_default(default)
    }
}

/// Command names by nesting; leaves have no children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandMap {
    pub children: BTreeMap<String, CommandMap>,
}

impl CommandMap {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CommandMap> {
        self.children.get(name)
    }
}
