use std::collections::HashMap;

/// Interned atom handle. Atoms compare by text, never by handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Atom(u32);

impl Atom {
    pub const NIL: Atom = Atom(0);
    pub const DOT: Atom = Atom(1);
    pub const MINUS: Atom = Atom(2);
    pub const DICT: Atom = Atom(3);
    pub const CURLY: Atom = Atom(4);
    pub const COLON: Atom = Atom(5);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Atoms every heap knows about, in the order of the constants above.
const PREDEFINED: [&str; 6] = ["[]", "[|]", "-", "dict", "{}", ":"];

/// Header of a compound term: name and arity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Functor {
    pub name: Atom,
    pub arity: u32,
}

impl Functor {
    pub const LIST: Functor = Functor {
        name: Atom::DOT,
        arity: 2,
    };
    pub const PAIR: Functor = Functor {
        name: Atom::MINUS,
        arity: 2,
    };

    pub fn new(name: Atom, arity: u32) -> Self {
        Functor { name, arity }
    }
}

#[derive(Debug)]
pub struct AtomTable {
    names: Vec<Box<str>>,
    index: HashMap<Box<str>, Atom>,
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomTable {
    pub fn new() -> Self {
        let mut table = AtomTable {
            names: Vec::with_capacity(64),
            index: HashMap::with_capacity(64),
        };
        for name in PREDEFINED {
            table.intern(name);
        }
        table
    }

    pub fn intern(&mut self, name: &str) -> Atom {
        if let Some(&atom) = self.index.get(name) {
            return atom;
        }
        let atom = Atom(self.names.len() as u32);
        self.names.push(name.into());
        self.index.insert(name.into(), atom);
        atom
    }

    pub fn lookup(&self, name: &str) -> Option<Atom> {
        self.index.get(name).copied()
    }

    #[inline]
    pub fn name(&self, atom: Atom) -> &str {
        &self.names[atom.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
