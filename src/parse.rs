//! The token-consumption loop.

use std::{
    env,
    ffi::{OsStr, OsString},
    ops::{Deref, DerefMut},
};

use log::{debug, trace};

use crate::{
    cmd::{Arity, Cmd, Node, OptEntry},
    Error, ErrorKind, Result,
};

/// Syntactic class of one raw token. Anything that is not option syntax,
/// including a lone `-` and non-utf8 input, is `Bare`.
enum Token<'a> {
    Long(&'a str),
    Short(char),
    Cluster(&'a str),
    Bare,
}

fn classify(raw: &OsStr) -> Token<'_> {
    let Some(text) = raw.to_str() else {
        return Token::Bare;
    };
    if let Some(name) = text.strip_prefix("--") {
        return Token::Long(name);
    }
    if let Some(body) = text.strip_prefix('-') {
        let mut chars = body.chars();
        return match (chars.next(), chars.next()) {
            (Some(short), None) => Token::Short(short),
            (Some(_), Some(_)) => Token::Cluster(body),
            (None, _) => Token::Bare,
        };
    }
    Token::Bare
}

fn is_option(raw: &OsStr) -> bool {
    !matches!(classify(raw), Token::Bare)
}

impl Cmd {
    /// Consumes `tokens` against this command's registry. On success every
    /// token was used, either here or by a child this command dispatched
    /// into. `path` is the ancestry line for messages, `"app serve"`.
    pub(crate) fn consume(&mut self, path: &str, tokens: &[OsString]) -> Result<usize> {
        let mut i = 0;
        let mut filled = 0;
        while i < tokens.len() {
            let raw = &tokens[i];
            let rest = &tokens[i + 1..];
            trace!("{path}: token {raw:?}");
            match classify(raw) {
                Token::Long(name) => {
                    let spelling = format!("--{name}");
                    i += 1 + self.take_opt(path, &spelling, |o| o.long == name, rest)?;
                }
                Token::Short(short) => {
                    let spelling = format!("-{short}");
                    i += 1 + self.take_opt(path, &spelling, |o| o.short == short, rest)?;
                }
                Token::Cluster(body) => {
                    self.bump_cluster(path, body)?;
                    i += 1;
                }
                Token::Bare => {
                    if filled < self.args.len() {
                        i += self.take_pos(path, filled, &tokens[i..])?;
                        filled += 1;
                    } else if let Some(sub) = raw
                        .to_str()
                        .and_then(|text| self.subs.iter().position(|sub| sub.name == text))
                    {
                        let sub_path = format!("{path} {}", self.subs[sub].name);
                        debug!("{path}: dispatching into `{sub_path}`");
                        self.selected = Some(sub);
                        let used = self.subs[sub].consume(&sub_path, rest)?;
                        return Ok(i + 1 + used);
                    } else {
                        let arg = raw.to_string_lossy().into_owned();
                        return Err(self.fail(path, ErrorKind::UnmatchedArgument(arg)));
                    }
                }
            }
        }
        self.check_required(path, filled)?;
        Ok(i)
    }

    fn take_opt(
        &mut self,
        path: &str,
        spelling: &str,
        pred: impl Fn(&OptEntry) -> bool,
        rest: &[OsString],
    ) -> Result<usize> {
        let Some(entry) = self.opts.iter().find(|o| pred(o)) else {
            return Err(self.fail(path, ErrorKind::UnknownOption(spelling.to_string())));
        };
        let node = entry.node;
        // A value takes the next token no matter how it is spelled; only
        // lists stop early.
        let window = match self.nodes[node].takes() {
            Arity::Zero => &rest[..0],
            Arity::One => rest,
            Arity::All => &rest[..self.window_len(rest)],
        };
        match self.nodes[node].parse(spelling, window) {
            Ok(used) => {
                trace!("{path}: {spelling} took {used} token(s)");
                Ok(used)
            }
            Err(kind) => Err(self.fail(path, kind)),
        }
    }

    fn take_pos(&mut self, path: &str, slot: usize, window: &[OsString]) -> Result<usize> {
        let node = self.args[slot].node;
        // The token at the cursor is claimed unconditionally; a positional
        // list then extends over what follows.
        let take = match self.nodes[node].takes() {
            Arity::All => &window[..1 + self.window_len(&window[1..])],
            _ => &window[..1],
        };
        match self.nodes[node].parse(&self.args[slot].name, take) {
            Ok(used) => {
                trace!("{path}: <{}> took {used} token(s)", self.args[slot].name);
                Ok(used)
            }
            Err(kind) => Err(self.fail(path, kind)),
        }
    }

    fn bump_cluster(&mut self, path: &str, body: &str) -> Result<()> {
        for short in body.chars() {
            let hit = self.opts.iter().find(|o| o.short == short).map(|o| o.node);
            match hit {
                Some(node) => match &mut self.nodes[node] {
                    Node::Flag { count } => *count += 1,
                    // A short that wants a value cannot live in a cluster.
                    _ => return Err(self.fail(path, ErrorKind::UnknownOption(format!("-{short}")))),
                },
                None => {
                    return Err(self.fail(path, ErrorKind::UnknownOption(format!("-{short}"))));
                }
            }
        }
        Ok(())
    }

    /// How far a list's window reaches into `rest`: up to the next token
    /// with option syntax or the name of a child command.
    fn window_len(&self, rest: &[OsString]) -> usize {
        rest.iter()
            .position(|raw| is_option(raw) || self.is_subcommand_name(raw))
            .unwrap_or(rest.len())
    }

    fn is_subcommand_name(&self, raw: &OsStr) -> bool {
        match raw.to_str() {
            Some(text) => self.subs.iter().any(|sub| sub.name == text),
            None => false,
        }
    }

    // Positionals fill strictly in declaration order, so everything from
    // `filled` on is still empty.
    fn check_required(&self, path: &str, filled: usize) -> Result<()> {
        if filled < self.args.len() {
            let missing = self.args[filled..].iter().map(|arg| arg.name.clone()).collect();
            return Err(self.fail(path, ErrorKind::MissingRequired(missing)));
        }
        Ok(())
    }

    fn fail(&self, path: &str, kind: ErrorKind) -> Error {
        debug!("{path}: {kind}");
        Error::new(kind, self.render_help(path))
    }
}

/// Owns the root [`Cmd`] and feeds it real input. Derefs to the root, so
/// declaration and lookup read the same on the parser as on any subcommand.
pub struct Parser {
    root: Cmd,
}

impl Parser {
    pub fn new(name: impl Into<String>, doc: impl Into<String>) -> Parser {
        Parser { root: Cmd::new(name, doc) }
    }

    /// Parses the process arguments, skipping the binary name.
    pub fn try_parse_env(&mut self) -> Result<()> {
        let args: Vec<OsString> = env::args_os().skip(1).collect();
        self.try_parse(args)
    }

    /// Parses the given tokens.
    pub fn try_parse_from<I, T>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        self.try_parse(args)
    }

    /// Like [`Parser::try_parse_env`], but prints the error and the failing
    /// command's help to stderr and folds the outcome into a bool.
    pub fn parse_env(&mut self) -> bool {
        let res = self.try_parse_env();
        self.report(res)
    }

    /// Like [`Parser::try_parse_from`], reporting to stderr.
    pub fn parse_from<I, T>(&mut self, args: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let res = self.try_parse_from(args);
        self.report(res)
    }

    fn try_parse(&mut self, tokens: Vec<OsString>) -> Result<()> {
        let path = self.root.name.clone();
        debug!("parsing {} token(s) for `{path}`", tokens.len());
        let used = self.root.consume(&path, &tokens)?;
        debug_assert_eq!(used, tokens.len());
        Ok(())
    }

    fn report(&self, res: Result<()>) -> bool {
        match res {
            Ok(()) => true,
            Err(err) => {
                eprintln!("error: {err}");
                eprintln!("{}", err.help());
                false
            }
        }
    }
}

impl Deref for Parser {
    type Target = Cmd;
    fn deref(&self) -> &Cmd {
        &self.root
    }
}

impl DerefMut for Parser {
    fn deref_mut(&mut self) -> &mut Cmd {
        &mut self.root
    }
}
