/// Rendering heap terms as Prolog text.
use super::atom::Atom;
use super::core::{Cell, Heap, TermRef, TermView};

/// Options for [`format_cell`].
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Quote atoms and strings so the output reads back.
    pub quoted: bool,
    /// Elide list elements and nested compounds beyond this depth (0: unlimited).
    pub max_depth: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            quoted: true,
            max_depth: 0,
        }
    }
}

impl WriteOptions {
    /// Depth-limited options used for error culprits, which may be cyclic.
    pub fn culprit() -> Self {
        WriteOptions {
            quoted: true,
            max_depth: 10,
        }
    }
}

/// Infix operators the reader and writer share: (priority, left max, right max).
pub(crate) fn infix_op(name: &str) -> Option<(u16, u16, u16)> {
    match name {
        ":" => Some((200, 199, 200)),
        "*" | "/" => Some((400, 400, 399)),
        "+" | "-" => Some((500, 500, 499)),
        "=" => Some((700, 699, 699)),
        _ => None,
    }
}

const SYMBOL_CHARS: &[u8] = b"+-*/\\^<>=~:.?@#&$";

#[inline]
pub(crate) fn is_symbol_char(b: u8) -> bool {
    SYMBOL_CHARS.contains(&b)
}

fn atom_needs_quotes(s: &str) -> bool {
    let bytes = s.as_bytes();
    match s {
        "" => return true,
        "[]" | "{}" | "!" | ";" => return false,
        _ => {}
    }
    if bytes[0].is_ascii_lowercase() {
        return !bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_');
    }
    !bytes.iter().all(|&b| is_symbol_char(b))
}

fn push_escaped(out: &mut String, s: &str, quote: char) {
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

struct Writer<'v, 'o> {
    view: TermView<'v>,
    opts: &'o WriteOptions,
    out: String,
}

impl Writer<'_, '_> {
    fn atom(&mut self, atom: Atom) {
        let name = self.view.atom_name(atom);
        if self.opts.quoted && atom_needs_quotes(name) {
            push_escaped(&mut self.out, name, '\'');
        } else {
            self.out.push_str(name);
        }
    }

    fn elided(&self, depth: usize) -> bool {
        self.opts.max_depth != 0 && depth > self.opts.max_depth
    }

    fn term(&mut self, cell: Cell, max_prec: u16, depth: usize) {
        let cell = self.view.deref(cell);
        if self.elided(depth) {
            self.out.push_str("...");
            return;
        }
        match cell {
            Cell::Ref(a) => {
                self.out.push_str("_G");
                let mut buf = itoa::Buffer::new();
                self.out.push_str(buf.format(self.view.offset(a)));
            }
            Cell::Atom(atom) => {
                let name = self.view.atom_name(atom);
                if max_prec < 1200 && infix_op(name).is_some() {
                    self.out.push('(');
                    self.atom(atom);
                    self.out.push(')');
                } else {
                    self.atom(atom);
                }
            }
            Cell::Int(i) => {
                let mut buf = itoa::Buffer::new();
                self.out.push_str(buf.format(i));
            }
            Cell::Float(f) => self.out.push_str(&format!("{:?}", f)),
            Cell::Str(id) => {
                let text = self.view.string(id);
                if self.opts.quoted {
                    push_escaped(&mut self.out, text, '"');
                } else {
                    self.out.push_str(text);
                }
            }
            Cell::Struct(_) if self.view.list_cell(cell).is_some() => self.list(cell, depth),
            Cell::Struct(p) => self.compound(p, max_prec, depth),
            Cell::Dict(p) => self.dict(p, depth),
            Cell::Functor(_) | Cell::DictHeader(_) => self.out.push_str("<header>"),
        }
    }

    fn list(&mut self, mut cell: Cell, depth: usize) {
        self.out.push('[');
        let mut count = 0usize;
        while let Some(p) = self.view.list_cell(cell) {
            if count > 0 {
                self.out.push(',');
            }
            if self.opts.max_depth != 0 && count >= self.opts.max_depth {
                self.out.push_str("...]");
                return;
            }
            self.term(self.view.cell(p + 1), 999, depth + 1);
            count += 1;
            cell = self.view.deref(self.view.cell(p + 2));
        }
        if cell != Cell::NIL {
            self.out.push('|');
            self.term(cell, 999, depth + 1);
        }
        self.out.push(']');
    }

    fn compound(&mut self, p: usize, max_prec: u16, depth: usize) {
        let Cell::Functor(f) = self.view.cell(p) else {
            return;
        };
        let name = self.view.atom_name(f.name);

        if f.arity == 2 {
            if let Some((prec, left, right)) = infix_op(name) {
                let open = prec > max_prec;
                if open {
                    self.out.push('(');
                }
                self.term(self.view.cell(p + 1), left, depth + 1);
                self.out.push_str(name);
                let at = self.out.len();
                self.term(self.view.cell(p + 2), right, depth + 1);
                // `a- -1` must not run together into the atom `--`.
                if self.out.as_bytes().get(at).is_some_and(|&b| is_symbol_char(b)) {
                    self.out.insert(at, ' ');
                }
                if open {
                    self.out.push(')');
                }
                return;
            }
        }
        if f.arity == 1 && f.name == Atom::CURLY {
            self.out.push('{');
            self.term(self.view.cell(p + 1), 1200, depth + 1);
            self.out.push('}');
            return;
        }
        if f.arity == 1 && name == "-" {
            let arg = self.view.deref(self.view.cell(p + 1));
            if !matches!(arg, Cell::Int(_) | Cell::Float(_)) {
                let open = 200 > max_prec;
                if open {
                    self.out.push('(');
                }
                self.out.push('-');
                self.term(arg, 200, depth + 1);
                if open {
                    self.out.push(')');
                }
                return;
            }
        }

        self.atom(f.name);
        self.out.push('(');
        for i in 0..f.arity as usize {
            if i > 0 {
                self.out.push(',');
            }
            self.term(self.view.cell(p + 1 + i), 999, depth + 1);
        }
        self.out.push(')');
    }

    fn dict(&mut self, p: usize, depth: usize) {
        let Cell::DictHeader(n) = self.view.cell(p) else {
            return;
        };
        let tag = self.view.cell(p + 1);
        if self.view.is_var(tag) {
            self.out.push('_');
        } else {
            self.term(tag, 0, depth + 1);
        }
        self.out.push('{');
        for i in 0..n as usize {
            if i > 0 {
                self.out.push(',');
            }
            self.term(self.view.cell(p + 2 + 2 * i), 0, depth + 1);
            self.out.push(':');
            self.term(self.view.cell(p + 3 + 2 * i), 199, depth + 1);
        }
        self.out.push('}');
    }
}

/// Render a value cell.
pub fn format_cell(view: TermView<'_>, cell: Cell, opts: &WriteOptions) -> String {
    let mut w = Writer {
        view,
        opts,
        out: String::new(),
    };
    w.term(cell, 1200, 0);
    w.out
}

impl Heap {
    /// Render the term held by `t` with default (quoted, unlimited) options.
    pub fn write_term(&self, t: TermRef) -> String {
        format_cell(self.view(), self.get(t), &WriteOptions::default())
    }

    /// Render a cell for use as an error culprit.
    pub fn culprit(&self, cell: Cell) -> String {
        format_cell(self.view(), cell, &WriteOptions::culprit())
    }
}
