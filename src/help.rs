//! Help text rendering.

use std::fmt::Write;

use crate::cmd::{Cmd, Node};

macro_rules! w {
    ($($tt:tt)*) => {
        drop(write!($($tt)*))
    };
}

impl Cmd {
    /// Renders the help text for this command and everything below it.
    pub fn help(&self) -> String {
        self.render_help(&self.name)
    }

    /// `heading` is the whole first line. For errors it carries the failing
    /// command's ancestry, `"app serve"`.
    pub(crate) fn render_help(&self, heading: &str) -> String {
        let mut buf = String::new();
        help_rec(&mut buf, heading, true, self);
        buf
    }
}

fn help_rec(buf: &mut String, heading: &str, root: bool, cmd: &Cmd) {
    w!(buf, "{heading}\n");
    if !cmd.doc.is_empty() {
        write_lines_indented(buf, &cmd.doc, 2);
    }
    let indent = if root { "" } else { "  " };

    if !cmd.args.is_empty() {
        blank_line(buf);
        w!(buf, "{indent}ARGS:\n");

        let mut blank = "";
        for arg in &cmd.args {
            w!(buf, "{blank}");
            blank = "\n";

            let dots = match &cmd.nodes[arg.node] {
                Node::List(_) => "...",
                _ => "",
            };
            w!(buf, "    <{}>{dots}\n", arg.name);
            if !arg.doc.is_empty() {
                write_lines_indented(buf, &arg.doc, 6);
            }
        }
    }

    if !cmd.opts.is_empty() {
        blank_line(buf);
        w!(buf, "{indent}OPTIONS:\n");

        let mut blank = "";
        for opt in &cmd.opts {
            w!(buf, "{blank}");
            blank = "\n";

            let value = match &cmd.nodes[opt.node] {
                Node::Flag { .. } => String::new(),
                Node::Value(_) => format!(" <{}>", opt.long),
                Node::List(_) => format!(" <{}>...", opt.long),
            };
            w!(buf, "    -{}, --{}{value}\n", opt.short, opt.long);
            if !opt.doc.is_empty() {
                write_lines_indented(buf, &opt.doc, 6);
            }
        }
    }

    if !cmd.subs.is_empty() {
        if root {
            blank_line(buf);
            w!(buf, "SUBCOMMANDS:");
        }

        for sub in &cmd.subs {
            blank_line(buf);
            blank_line(buf);
            help_rec(buf, &format!("{heading} {}", sub.name), false, sub);
        }
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
