pub mod atom;
pub mod core;
pub mod order;
pub mod read;
pub mod write;

#[cfg(test)]
mod tests;

pub use self::atom::{Atom, AtomTable, Functor};
pub use self::core::{
    Addr, Cell, Heap, HeapConfig, HeapMark, StrId, TermRef, TermView, check_interrupt,
};
pub use self::order::compare_numbers;
pub use self::read::TermReader;
pub use self::write::{WriteOptions, format_cell};
