/// Key comparison for the sort engine.
/// Keys are heap addresses; comparison is the standard order of terms.
use std::cmp::Ordering;

use crate::heap::{Addr, Heap, TermRef, TermView};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    #[inline]
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

/// Compares key addresses within one heap view.
#[derive(Clone, Copy)]
pub struct KeyComparator<'a> {
    view: TermView<'a>,
    direction: Direction,
}

impl<'a> KeyComparator<'a> {
    pub fn new(view: TermView<'a>, direction: Direction) -> Self {
        KeyComparator { view, direction }
    }

    #[inline]
    pub fn view(&self) -> TermView<'a> {
        self.view
    }

    #[inline]
    pub fn compare(&self, a: Addr, b: Addr) -> Ordering {
        self.direction.apply(self.view.compare_standard(a, b))
    }
}

/// Compare two terms in the standard order.
pub fn compare_terms(heap: &Heap, a: TermRef, b: TermRef) -> Ordering {
    heap.view().compare_cells(heap.get(a), heap.get(b))
}
