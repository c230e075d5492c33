//! Argument storage and the command registry.

use std::{
    any::Any,
    ffi::{OsStr, OsString},
    fmt,
    marker::PhantomData,
    str::FromStr,
    sync::atomic::{AtomicU32, Ordering},
};

use crate::{ErrorKind, Result};

/// How many tokens a node wants from the input.
#[derive(Clone, Copy)]
pub(crate) enum Arity {
    Zero,
    One,
    All,
}

/// Type-erased storage for one declared argument. The write function is
/// monomorphized at registration, so the raw token only meets its concrete
/// type in one place.
pub(crate) struct Slot {
    cell: Box<dyn Any>,
    write: fn(&mut dyn Any, &str) -> Result<(), String>,
    ty: &'static str,
}

impl Slot {
    fn value<T>() -> Slot
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        fn write<T>(cell: &mut dyn Any, raw: &str) -> Result<(), String>
        where
            T: FromStr + 'static,
            T::Err: fmt::Display,
        {
            let cell = cell.downcast_mut::<Option<T>>().expect("cell type fixed at registration");
            *cell = Some(raw.parse::<T>().map_err(|err| err.to_string())?);
            Ok(())
        }
        Slot { cell: Box::new(None::<T>), write: write::<T>, ty: short_ty_name::<T>() }
    }

    fn list<T>() -> Slot
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        fn write<T>(cell: &mut dyn Any, raw: &str) -> Result<(), String>
        where
            T: FromStr + 'static,
            T::Err: fmt::Display,
        {
            let cell = cell.downcast_mut::<Vec<T>>().expect("cell type fixed at registration");
            cell.push(raw.parse::<T>().map_err(|err| err.to_string())?);
            Ok(())
        }
        Slot { cell: Box::new(Vec::<T>::new()), write: write::<T>, ty: short_ty_name::<T>() }
    }

    fn store(&mut self, what: &str, raw: &OsStr) -> Result<(), ErrorKind> {
        let ty = self.ty;
        let Some(text) = raw.to_str() else {
            return Err(ErrorKind::Conversion {
                what: what.to_string(),
                value: raw.to_string_lossy().into_owned(),
                ty,
                msg: "invalid utf8".to_string(),
            });
        };
        match (self.write)(self.cell.as_mut(), text) {
            Ok(()) => Ok(()),
            Err(msg) => Err(ErrorKind::Conversion {
                what: what.to_string(),
                value: text.to_string(),
                ty,
                msg,
            }),
        }
    }
}

/// One declared argument. A `Flag` counts occurrences, a `Value` keeps the
/// latest conversion, a `List` appends every token of its window.
pub(crate) enum Node {
    Flag { count: u32 },
    Value(Slot),
    List(Slot),
}

impl Node {
    pub(crate) fn takes(&self) -> Arity {
        match self {
            Node::Flag { .. } => Arity::Zero,
            Node::Value(_) => Arity::One,
            Node::List(_) => Arity::All,
        }
    }

    /// Consumes tokens out of `window` and reports how many were used.
    /// `what` is the user-facing spelling for error messages, `--port` or a
    /// positional's name.
    pub(crate) fn parse(&mut self, what: &str, window: &[OsString]) -> Result<usize, ErrorKind> {
        match self {
            Node::Flag { count } => {
                *count += 1;
                Ok(0)
            }
            Node::Value(slot) => {
                let Some(raw) = window.first() else {
                    return Err(ErrorKind::MissingValue(what.to_string()));
                };
                slot.store(what, raw)?;
                Ok(1)
            }
            Node::List(slot) => {
                if window.is_empty() {
                    return Err(ErrorKind::MissingValue(what.to_string()));
                }
                for raw in window {
                    slot.store(what, raw)?;
                }
                Ok(window.len())
            }
        }
    }
}

pub(crate) struct OptEntry {
    pub(crate) short: char,
    pub(crate) long: String,
    pub(crate) doc: String,
    pub(crate) node: usize,
}

impl OptEntry {
    fn dash_names(&self) -> String {
        format!("-{}, --{}", self.short, self.long)
    }
}

pub(crate) struct PosEntry {
    pub(crate) name: String,
    pub(crate) doc: String,
    pub(crate) node: usize,
}

/// Handle to a declared flag, redeemed with [`Cmd::count`] or [`Cmd::is_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagId {
    stamp: u32,
    node: usize,
}

/// Handle to a declared single-value argument, redeemed with [`Cmd::get`].
pub struct ValueId<T> {
    stamp: u32,
    node: usize,
    ty: PhantomData<fn() -> T>,
}

/// Handle to a declared list argument, redeemed with [`Cmd::get_all`].
pub struct ListId<T> {
    stamp: u32,
    node: usize,
    ty: PhantomData<fn() -> T>,
}

impl<T> Clone for ValueId<T> {
    fn clone(&self) -> ValueId<T> {
        *self
    }
}
impl<T> Copy for ValueId<T> {}
impl<T> PartialEq for ValueId<T> {
    fn eq(&self, other: &ValueId<T>) -> bool {
        (self.stamp, self.node) == (other.stamp, other.node)
    }
}
impl<T> Eq for ValueId<T> {}
impl<T> fmt::Debug for ValueId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueId").field("node", &self.node).finish()
    }
}

impl<T> Clone for ListId<T> {
    fn clone(&self) -> ListId<T> {
        *self
    }
}
impl<T> Copy for ListId<T> {}
impl<T> PartialEq for ListId<T> {
    fn eq(&self, other: &ListId<T>) -> bool {
        (self.stamp, self.node) == (other.stamp, other.node)
    }
}
impl<T> Eq for ListId<T> {}
impl<T> fmt::Debug for ListId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListId").field("node", &self.node).finish()
    }
}

// Every Cmd gets a distinct stamp so a handle redeemed on the wrong command
// is caught instead of reading a stranger's node.
static STAMP: AtomicU32 = AtomicU32::new(0);

fn next_stamp() -> u32 {
    STAMP.fetch_add(1, Ordering::Relaxed)
}

/// A named command: its optionals, its required positionals, and its child
/// commands. The root one is owned by [`crate::Parser`].
pub struct Cmd {
    pub(crate) name: String,
    pub(crate) doc: String,
    stamp: u32,
    pub(crate) nodes: Vec<Node>,
    pub(crate) opts: Vec<OptEntry>,
    pub(crate) args: Vec<PosEntry>,
    pub(crate) subs: Vec<Cmd>,
    pub(crate) selected: Option<usize>,
}

impl Cmd {
    pub(crate) fn new(name: impl Into<String>, doc: impl Into<String>) -> Cmd {
        Cmd {
            name: name.into(),
            doc: doc.into(),
            stamp: next_stamp(),
            nodes: Vec::new(),
            opts: Vec::new(),
            args: Vec::new(),
            subs: Vec::new(),
            selected: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Declares a countable flag, `-v` / `--verbose`.
    ///
    /// Panics if `short` or `long` is already taken on this command.
    pub fn flag(&mut self, short: char, long: impl Into<String>, doc: impl Into<String>) -> FlagId {
        let node = self.add_opt(short, long.into(), doc.into(), Node::Flag { count: 0 });
        FlagId { stamp: self.stamp, node }
    }

    /// Declares an optional single-value argument, `--port 8080`. A repeat
    /// overwrites the previous value.
    ///
    /// Panics if `short` or `long` is already taken on this command.
    pub fn value<T>(
        &mut self,
        short: char,
        long: impl Into<String>,
        doc: impl Into<String>,
    ) -> ValueId<T>
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        let node = self.add_opt(short, long.into(), doc.into(), Node::Value(Slot::value::<T>()));
        ValueId { stamp: self.stamp, node, ty: PhantomData }
    }

    /// Declares an optional list argument, `--tag a b c`. It claims tokens up
    /// to the next option or subcommand name; a repeat appends.
    ///
    /// Panics if `short` or `long` is already taken on this command.
    pub fn list<T>(
        &mut self,
        short: char,
        long: impl Into<String>,
        doc: impl Into<String>,
    ) -> ListId<T>
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        let node = self.add_opt(short, long.into(), doc.into(), Node::List(Slot::list::<T>()));
        ListId { stamp: self.stamp, node, ty: PhantomData }
    }

    /// Declares a required positional argument.
    ///
    /// Panics if `name` is already taken on this command.
    pub fn arg<T>(&mut self, name: impl Into<String>, doc: impl Into<String>) -> ValueId<T>
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        let node = self.add_pos(name.into(), doc.into(), Node::Value(Slot::value::<T>()));
        ValueId { stamp: self.stamp, node, ty: PhantomData }
    }

    /// Declares a required positional list. It claims at least the token at
    /// its position, then extends like [`Cmd::list`].
    ///
    /// Panics if `name` is already taken on this command.
    pub fn arg_list<T>(&mut self, name: impl Into<String>, doc: impl Into<String>) -> ListId<T>
    where
        T: FromStr + 'static,
        T::Err: fmt::Display,
    {
        let node = self.add_pos(name.into(), doc.into(), Node::List(Slot::list::<T>()));
        ListId { stamp: self.stamp, node, ty: PhantomData }
    }

    /// Declares a child command and returns it for further declaration.
    ///
    /// Panics if `name` is already taken by another child.
    pub fn subcommand(&mut self, name: impl Into<String>, doc: impl Into<String>) -> &mut Cmd {
        let name = name.into();
        if self.subs.iter().any(|sub| sub.name == name) {
            panic!("duplicate subcommand `{name}` on `{}`", self.name);
        }
        let ix = self.subs.len();
        self.subs.push(Cmd::new(name, doc));
        &mut self.subs[ix]
    }

    fn add_opt(&mut self, short: char, long: String, doc: String, node: Node) -> usize {
        if let Some(prev) = self.opts.iter().find(|o| o.short == short || o.long == long) {
            panic!(
                "duplicate optional `-{short}, --{long}` conflicts with `{}` on `{}`",
                prev.dash_names(),
                self.name
            );
        }
        let ix = self.push_node(node);
        self.opts.push(OptEntry { short, long, doc, node: ix });
        ix
    }

    fn add_pos(&mut self, name: String, doc: String, node: Node) -> usize {
        if self.args.iter().any(|arg| arg.name == name) {
            panic!("duplicate positional `{name}` on `{}`", self.name);
        }
        let ix = self.push_node(node);
        self.args.push(PosEntry { name, doc, node: ix });
        ix
    }

    fn push_node(&mut self, node: Node) -> usize {
        let ix = self.nodes.len();
        self.nodes.push(node);
        ix
    }

    fn node(&self, stamp: u32, ix: usize) -> &Node {
        assert_eq!(stamp, self.stamp, "handle does not belong to command `{}`", self.name);
        &self.nodes[ix]
    }

    /// How many times the flag appeared.
    pub fn count(&self, id: FlagId) -> u32 {
        let Node::Flag { count } = self.node(id.stamp, id.node) else {
            panic!("flag handle on a non-flag node");
        };
        *count
    }

    /// Whether the flag appeared at least once.
    pub fn is_set(&self, id: FlagId) -> bool {
        self.count(id) > 0
    }

    /// The parsed value, if the argument was supplied.
    pub fn get<T: 'static>(&self, id: ValueId<T>) -> Option<&T> {
        let Node::Value(slot) = self.node(id.stamp, id.node) else {
            panic!("value handle on a non-value node");
        };
        let cell = slot.cell.downcast_ref::<Option<T>>().expect("cell type fixed at registration");
        cell.as_ref()
    }

    /// Every parsed element, in input order. Empty if never supplied.
    pub fn get_all<T: 'static>(&self, id: ListId<T>) -> &[T] {
        let Node::List(slot) = self.node(id.stamp, id.node) else {
            panic!("list handle on a non-list node");
        };
        slot.cell.downcast_ref::<Vec<T>>().expect("cell type fixed at registration")
    }

    /// Recovers the handle of a flag by its long name.
    pub fn find_flag(&self, long: &str) -> Option<FlagId> {
        let entry = self.opts.iter().find(|o| o.long == long)?;
        match &self.nodes[entry.node] {
            Node::Flag { .. } => Some(FlagId { stamp: self.stamp, node: entry.node }),
            _ => None,
        }
    }

    /// Recovers the handle of an optional value by its long name. `None` if
    /// the name is unknown, not a value, or stores a different type.
    pub fn find_value<T: 'static>(&self, long: &str) -> Option<ValueId<T>> {
        let entry = self.opts.iter().find(|o| o.long == long)?;
        match &self.nodes[entry.node] {
            Node::Value(slot) if slot.cell.is::<Option<T>>() => {
                Some(ValueId { stamp: self.stamp, node: entry.node, ty: PhantomData })
            }
            _ => None,
        }
    }

    /// Recovers the handle of an optional list by its long name.
    pub fn find_list<T: 'static>(&self, long: &str) -> Option<ListId<T>> {
        let entry = self.opts.iter().find(|o| o.long == long)?;
        match &self.nodes[entry.node] {
            Node::List(slot) if slot.cell.is::<Vec<T>>() => {
                Some(ListId { stamp: self.stamp, node: entry.node, ty: PhantomData })
            }
            _ => None,
        }
    }

    /// Recovers the handle of a required positional by name.
    pub fn find_arg<T: 'static>(&self, name: &str) -> Option<ValueId<T>> {
        let entry = self.args.iter().find(|arg| arg.name == name)?;
        match &self.nodes[entry.node] {
            Node::Value(slot) if slot.cell.is::<Option<T>>() => {
                Some(ValueId { stamp: self.stamp, node: entry.node, ty: PhantomData })
            }
            _ => None,
        }
    }

    /// Recovers the handle of a required positional list by name.
    pub fn find_arg_list<T: 'static>(&self, name: &str) -> Option<ListId<T>> {
        let entry = self.args.iter().find(|arg| arg.name == name)?;
        match &self.nodes[entry.node] {
            Node::List(slot) if slot.cell.is::<Vec<T>>() => {
                Some(ListId { stamp: self.stamp, node: entry.node, ty: PhantomData })
            }
            _ => None,
        }
    }

    /// The child command with this name, if declared.
    pub fn find_subcommand(&self, name: &str) -> Option<&Cmd> {
        self.subs.iter().find(|sub| sub.name == name)
    }

    pub fn find_subcommand_mut(&mut self, name: &str) -> Option<&mut Cmd> {
        self.subs.iter_mut().find(|sub| sub.name == name)
    }

    /// The child the last parse dispatched into, if any.
    pub fn selected(&self) -> Option<&Cmd> {
        self.selected.map(|ix| &self.subs[ix])
    }
}

fn short_ty_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
