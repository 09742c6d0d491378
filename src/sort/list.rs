/// Moving lists between their heap form and the sort engine's working nodes.
///
/// A working node and a list cell are both three cells wide, so the sorted
/// chain is rewritten in place into the output list:
///
/// ```text
///   working node           list cell
///   [0] Ref(next) | []     Functor('[|]'/2)
///   [1] Ref(element)       element (or Ref to it when unbound)
///   [2] Ref(key)           Struct(next) | []
/// ```
use std::sync::atomic::AtomicBool;

use log::trace;

use super::compare::{Direction, KeyComparator};
use super::key::{KeySpec, extract_key};
use super::merge::SortChain;
use crate::common::{PlError, TypeKind};
use crate::heap::{
    Addr, Cell, Functor, Heap, HeapMark, TermRef, TermView, WriteOptions, check_interrupt,
    format_cell,
};
use crate::lists::{ListShape, ListTail, skip_list};

/// Cells per working node.
pub const NODE_CELLS: usize = 3;

/// Index of a node within its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIx(usize);

/// A materialized block of working nodes.
#[derive(Debug, Clone, Copy)]
pub struct NodeBlock {
    /// Heap level before the block was allocated.
    pub mark: HeapMark,
    /// Address of the first node.
    pub base: Addr,
    pub count: usize,
}

pub struct HeapListBuilder<'s> {
    spec: &'s KeySpec,
    dedup: bool,
}

impl<'s> HeapListBuilder<'s> {
    pub fn new(spec: &'s KeySpec, dedup: bool) -> Self {
        HeapListBuilder { spec, dedup }
    }

    /// Check that `list` is a list this sort accepts and measure it.
    ///
    /// Cyclic lists are accepted only when duplicates are removed.
    pub fn validate(&self, heap: &Heap, list: TermRef) -> Result<ListShape, PlError> {
        let cell = heap.get(list);
        let shape = skip_list(heap, cell)?;
        match shape.tail {
            ListTail::Nil => Ok(shape),
            ListTail::Cyclic if self.dedup => Ok(shape),
            ListTail::Var => Err(PlError::Instantiation),
            ListTail::Cyclic | ListTail::Other(_) => {
                Err(PlError::type_error(TypeKind::List, heap.culprit(cell)))
            }
        }
    }

    /// Make room for `count` nodes. May relocate the heap.
    pub fn reserve(&self, heap: &mut Heap, count: usize) -> Result<(), PlError> {
        let cells = count
            .checked_mul(NODE_CELLS)
            .ok_or(PlError::ResourceExhausted {
                requested: usize::MAX,
            })?;
        heap.reserve(cells)
    }

    /// Write one node per list cell, in list order, with keys extracted.
    ///
    /// On failure the block is released and the heap is back at its mark.
    pub fn materialize(
        &self,
        heap: &mut Heap,
        list: TermRef,
        count: usize,
    ) -> Result<NodeBlock, PlError> {
        let mark = heap.mark();
        let interrupt = heap.interrupt_flag();
        let batch = heap.config().signal_batch.max(1);
        let cells = count
            .checked_mul(NODE_CELLS)
            .ok_or(PlError::ResourceExhausted {
                requested: usize::MAX,
            })?;
        // The allocation may relocate; resolve the list only afterwards.
        let base = heap.alloc(cells)?;
        let cell = heap.resolve(list);

        let result = {
            let (view, nodes) = heap.split_at_mut(base);
            self.fill(view, nodes, cell, base, count, &interrupt, batch)
        };
        match result {
            Ok(()) => Ok(NodeBlock { mark, base, count }),
            Err(e) => {
                heap.reset_to(mark);
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fill(
        &self,
        view: TermView<'_>,
        nodes: &mut [Cell],
        mut list: Cell,
        base: Addr,
        count: usize,
        interrupt: &AtomicBool,
        batch: usize,
    ) -> Result<(), PlError> {
        for i in 0..count {
            if i > 0 && i % batch == 0 {
                check_interrupt(interrupt)?;
            }
            let Some(p) = view.list_cell(list) else {
                return Err(PlError::type_error(TypeKind::List, view_culprit(view, list)));
            };
            let element = view.deref_addr(p + 1);
            let key = extract_key(view, element, self.spec)?;
            let slot = i * NODE_CELLS;
            nodes[slot] = if i + 1 < count {
                Cell::Ref(base + slot + NODE_CELLS)
            } else {
                Cell::NIL
            };
            nodes[slot + 1] = Cell::Ref(element);
            nodes[slot + 2] = Cell::Ref(key);
            list = view.deref(view.cell(p + 2));
        }
        Ok(())
    }

    /// Rewrite the sorted chain starting at `head` into list cells and
    /// return a handle to the list.
    pub fn reconstruct(&self, heap: &mut Heap, block: &NodeBlock, head: Option<NodeIx>) -> TermRef {
        let Some(head) = head else {
            return heap.new_term_ref(Cell::NIL);
        };
        let (view, nodes) = heap.split_at_mut(block.base);
        let cmp = KeyComparator::new(view, Direction::Ascending);
        let mut chain = HeapChain::new(cmp, nodes, block.base);
        let first = chain.into_list(head);
        heap.new_term_ref(Cell::Struct(first))
    }
}

fn view_culprit(view: TermView<'_>, cell: Cell) -> String {
    format_cell(view, cell, &WriteOptions::culprit())
}

/// Working-node view of a node block.
pub struct HeapChain<'h> {
    cmp: KeyComparator<'h>,
    nodes: &'h mut [Cell],
    base: Addr,
}

impl<'h> HeapChain<'h> {
    pub fn new(cmp: KeyComparator<'h>, nodes: &'h mut [Cell], base: Addr) -> Self {
        HeapChain { cmp, nodes, base }
    }

    /// The first node of a freshly materialized block.
    pub fn first(&self) -> Option<NodeIx> {
        if self.nodes.len() >= NODE_CELLS {
            Some(NodeIx(0))
        } else {
            None
        }
    }

    #[inline]
    fn addr(&self, node: NodeIx) -> Addr {
        self.base + node.0 * NODE_CELLS
    }

    #[inline]
    fn slot_addr(&self, node: NodeIx, slot: usize) -> Addr {
        match self.nodes[node.0 * NODE_CELLS + slot] {
            Cell::Ref(a) => a,
            _ => self.addr(node) + slot,
        }
    }

    /// Rewrite every node from `head` on into a list cell; returns the
    /// address of the first one.
    fn into_list(&mut self, head: NodeIx) -> Addr {
        let view = self.cmp.view();
        let mut node = Some(head);
        let mut cells = 0usize;
        while let Some(n) = node {
            let next = self.next(n);
            let element = self.slot_addr(n, 1);
            let value = match view.cell(element) {
                Cell::Ref(_) => Cell::Ref(element),
                value => value,
            };
            let tail = next.map_or(Cell::NIL, |m| Cell::Struct(self.addr(m)));
            let slot = n.0 * NODE_CELLS;
            self.nodes[slot] = Cell::Functor(Functor::LIST);
            self.nodes[slot + 1] = value;
            self.nodes[slot + 2] = tail;
            node = next;
            cells += 1;
        }
        trace!("reconstructed {} list cells", cells);
        self.addr(head)
    }
}

impl SortChain for HeapChain<'_> {
    type Node = NodeIx;

    #[inline]
    fn next(&self, node: NodeIx) -> Option<NodeIx> {
        match self.nodes[node.0 * NODE_CELLS] {
            Cell::Ref(a) => Some(NodeIx((a - self.base) / NODE_CELLS)),
            _ => None,
        }
    }

    #[inline]
    fn set_next(&mut self, node: NodeIx, next: Option<NodeIx>) {
        let cell = next.map_or(Cell::NIL, |n| Cell::Ref(self.addr(n)));
        self.nodes[node.0 * NODE_CELLS] = cell;
    }

    #[inline]
    fn compare(&self, a: NodeIx, b: NodeIx) -> std::cmp::Ordering {
        self.cmp.compare(self.slot_addr(a, 2), self.slot_addr(b, 2))
    }

    fn release(&mut self, node: NodeIx) {
        let at = self.addr(node);
        let slot = node.0 * NODE_CELLS;
        for i in 0..NODE_CELLS {
            self.nodes[slot + i] = Cell::Ref(at + i);
        }
    }
}
