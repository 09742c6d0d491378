/// The sort predicates: `sort/2`, `msort/2`, `keysort/2` and `sort/4`.
///
/// Every predicate runs the same pipeline on the heap:
/// - validate and measure the input list (cyclic lists only when deduplicating)
/// - reserve the node block, which is the only point the heap may move
/// - materialize one working node per element, extracting all keys up front
/// - natural merge sort by relinking nodes
/// - rewrite the sorted nodes in place into the output list
///
/// All errors are raised before any node is reordered, and leave the heap
/// where it was.
use log::{debug, trace};

use super::compare::{Direction, KeyComparator};
use super::key::KeySpec;
use super::list::{HeapChain, HeapListBuilder};
use super::merge::nat_sort;
use crate::common::{DomainKind, PlError, TypeKind};
use crate::heap::{Cell, Heap, TermRef};
use crate::lists::ListTail;

/// How one sort call orders its input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortPlan {
    pub key: KeySpec,
    pub direction: Direction,
    pub dedup: bool,
}

impl SortPlan {
    pub fn new(key: KeySpec, direction: Direction, dedup: bool) -> Self {
        SortPlan {
            key,
            direction,
            dedup,
        }
    }
}

/// Order atoms accepted by `sort/4`.
pub struct OrderDef {
    pub name: &'static str,
    pub direction: Direction,
    pub dedup: bool,
}

pub const ORDER_DEFS: [OrderDef; 8] = [
    OrderDef {
        name: "<",
        direction: Direction::Ascending,
        dedup: true,
    },
    OrderDef {
        name: "@<",
        direction: Direction::Ascending,
        dedup: true,
    },
    OrderDef {
        name: "=<",
        direction: Direction::Ascending,
        dedup: false,
    },
    OrderDef {
        name: "@=<",
        direction: Direction::Ascending,
        dedup: false,
    },
    OrderDef {
        name: ">",
        direction: Direction::Descending,
        dedup: true,
    },
    OrderDef {
        name: "@>",
        direction: Direction::Descending,
        dedup: true,
    },
    OrderDef {
        name: ">=",
        direction: Direction::Descending,
        dedup: false,
    },
    OrderDef {
        name: "@>=",
        direction: Direction::Descending,
        dedup: false,
    },
];

/// Parse a `sort/4` order atom into (direction, dedup).
pub fn parse_order(heap: &Heap, order: TermRef) -> Result<(Direction, bool), PlError> {
    let cell = heap.resolve(order);
    let atom = match cell {
        Cell::Ref(_) => return Err(PlError::Instantiation),
        Cell::Atom(atom) => atom,
        other => return Err(PlError::type_error(TypeKind::Atom, heap.culprit(other))),
    };
    let name = heap.atom_name(atom);
    ORDER_DEFS
        .iter()
        .find(|def| def.name == name)
        .map(|def| (def.direction, def.dedup))
        .ok_or_else(|| PlError::domain_error(DomainKind::Order, heap.culprit(cell)))
}

/// Sort the list held by `list` according to `plan`; returns the sorted list.
pub fn nat_sort_term(heap: &mut Heap, list: TermRef, plan: &SortPlan) -> Result<TermRef, PlError> {
    let builder = HeapListBuilder::new(&plan.key, plan.dedup);
    let shape = builder.validate(heap, list)?;
    let cyclic = shape.tail == ListTail::Cyclic;

    if shape.len == 0 {
        return Ok(heap.new_term_ref(Cell::NIL));
    }
    if shape.len == 1 && plan.key.is_whole() && !cyclic {
        return Ok(list);
    }
    debug!(
        "sort plan: {} elements, key {:?}, {:?}, dedup {}{}",
        shape.len,
        plan.key,
        plan.direction,
        plan.dedup,
        if cyclic { ", cyclic input" } else { "" }
    );

    builder.reserve(heap, shape.len)?;
    let block = builder.materialize(heap, list, shape.len)?;

    let outcome = {
        let (view, nodes) = heap.split_at_mut(block.base);
        let mut chain = HeapChain::new(KeyComparator::new(view, plan.direction), nodes, block.base);
        let first = chain.first();
        nat_sort(&mut chain, first, plan.dedup)
    };
    trace!(
        "sorted {} elements: {} runs, {} duplicates dropped",
        block.count, outcome.runs, outcome.dropped
    );

    Ok(builder.reconstruct(heap, &block, outcome.head))
}

/// `sort/2`: ascending standard order, duplicates removed.
pub fn sort(heap: &mut Heap, list: TermRef) -> Result<TermRef, PlError> {
    nat_sort_term(heap, list, &SortPlan::new(KeySpec::Whole, Direction::Ascending, true))
}

/// `msort/2`: ascending standard order, duplicates kept, stable.
pub fn msort(heap: &mut Heap, list: TermRef) -> Result<TermRef, PlError> {
    nat_sort_term(heap, list, &SortPlan::new(KeySpec::Whole, Direction::Ascending, false))
}

/// `keysort/2`: stable sort of `Key-Value` pairs on `Key`.
pub fn keysort(heap: &mut Heap, list: TermRef) -> Result<TermRef, PlError> {
    nat_sort_term(heap, list, &SortPlan::new(KeySpec::Pair, Direction::Ascending, false))
}

/// `sort/4`: sort on `key` with the ordering named by `order`.
pub fn sort4(
    heap: &mut Heap,
    key: TermRef,
    order: TermRef,
    list: TermRef,
) -> Result<TermRef, PlError> {
    let key = KeySpec::parse(heap, key)?;
    let (direction, dedup) = parse_order(heap, order)?;
    nat_sort_term(heap, list, &SortPlan::new(key, direction, dedup))
}
