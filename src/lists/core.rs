/// List walking and the small list predicates built on it.
use log::trace;

use crate::common::{PlError, TypeKind};
use crate::heap::{Addr, Atom, Cell, Functor, Heap, TermRef, TermView};

/// What ends a list walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListTail {
    /// `[]`: a proper list.
    Nil,
    /// An unbound variable: a partial list.
    Var,
    /// The list cells loop back on themselves.
    Cyclic,
    /// Any other term.
    Other(Cell),
}

/// Result of [`skip_list`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListShape {
    /// Number of distinct list cells. For a cyclic list this is the length
    /// of the prefix plus the length of the cycle.
    pub len: usize,
    pub tail: ListTail,
}

impl ListShape {
    #[inline]
    pub fn is_proper(&self) -> bool {
        self.tail == ListTail::Nil
    }
}

#[inline]
fn next_cell(view: &TermView<'_>, p: Addr) -> Option<Addr> {
    view.list_cell(view.deref(view.cell(p + 2)))
}

fn classify(cell: Cell) -> ListTail {
    match cell {
        Cell::Atom(Atom::NIL) => ListTail::Nil,
        Cell::Ref(_) => ListTail::Var,
        other => ListTail::Other(other),
    }
}

/// Walk a list with Brent's cycle detection. When `poll` is set the
/// interrupt flag is checked every `signal_batch` cells.
fn walk(heap: &Heap, cell: Cell, poll: bool) -> Result<ListShape, PlError> {
    let view = heap.view();
    let batch = heap.config().signal_batch.max(1);
    let start = view.deref(cell);
    let Some(first) = view.list_cell(start) else {
        return Ok(ListShape {
            len: 0,
            tail: classify(start),
        });
    };

    let mut tortoise = first;
    let mut power = 1usize;
    let mut lambda = 1usize;
    let mut len = 1usize;
    let mut cell = view.deref(view.cell(first + 2));
    loop {
        let Some(hare) = view.list_cell(cell) else {
            return Ok(ListShape {
                len,
                tail: classify(cell),
            });
        };
        if hare == tortoise {
            break;
        }
        if power == lambda {
            tortoise = hare;
            power *= 2;
            lambda = 0;
        }
        lambda += 1;
        len += 1;
        if poll && len % batch == 0 {
            heap.handle_signals()?;
        }
        cell = view.deref(view.cell(hare + 2));
    }

    // Cycle of length `lambda`; find where it starts.
    let mut ahead = first;
    for _ in 0..lambda {
        ahead = next_cell(&view, ahead).unwrap_or(ahead);
    }
    let mut behind = first;
    let mut mu = 0usize;
    while behind != ahead {
        behind = next_cell(&view, behind).unwrap_or(behind);
        ahead = next_cell(&view, ahead).unwrap_or(ahead);
        mu += 1;
        if poll && mu % batch == 0 {
            heap.handle_signals()?;
        }
    }
    trace!("cyclic list: prefix {}, cycle {}", mu, lambda);
    Ok(ListShape {
        len: mu + lambda,
        tail: ListTail::Cyclic,
    })
}

/// Measure the list in `cell` and classify how it ends.
///
/// Terminates on cyclic lists. Fails only with `Interrupted`.
pub fn skip_list(heap: &Heap, cell: Cell) -> Result<ListShape, PlError> {
    walk(heap, cell, true)
}

/// True iff `t` is a proper, finite list.
pub fn is_list(heap: &Heap, t: TermRef) -> bool {
    walk(heap, heap.get(t), false).is_ok_and(|shape| shape.is_proper())
}

/// Build a list of `len` fresh variables.
///
/// `Ok(None)` for a negative length. The list is allocated in one
/// reservation of three cells per element.
pub fn length_list(heap: &mut Heap, len: TermRef) -> Result<Option<TermRef>, PlError> {
    let n = match heap.resolve(len) {
        Cell::Int(n) if n > 0 => n,
        Cell::Int(0) => return Ok(Some(heap.new_term_ref(Cell::NIL))),
        Cell::Int(_) => return Ok(None),
        other => {
            return Err(PlError::type_error(
                TypeKind::Integer,
                heap.culprit(other),
            ));
        }
    };
    let cells = usize::try_from(n)
        .ok()
        .and_then(|n| n.checked_mul(3))
        .ok_or(PlError::ResourceExhausted {
            requested: usize::MAX,
        })?;
    let count = cells / 3;

    let p = heap.alloc(cells)?;
    for i in 0..count {
        let q = p + 3 * i;
        heap.set_cell(q, Cell::Functor(Functor::LIST));
        // q + 1 is already a fresh variable.
        let next = if i + 1 < count {
            Cell::Struct(q + 3)
        } else {
            Cell::NIL
        };
        heap.set_cell(q + 2, next);
    }
    Ok(Some(heap.new_term_ref(Cell::Struct(p))))
}
