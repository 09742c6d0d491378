use super::*;
use crate::common::{PlError, TypeKind};
use crate::heap::{Cell, Heap, HeapConfig};

fn shape(text: &str) -> ListShape {
    let mut heap = Heap::default();
    let t = heap.read_term(text).unwrap();
    skip_list(&heap, heap.get(t)).unwrap()
}

/// Build `[1, 2, ..., n]` and point the last tail back at element `loop_to` (0-based).
fn cyclic_ints(heap: &mut Heap, n: i64, loop_to: usize) -> crate::heap::TermRef {
    let items: Vec<Cell> = (1..=n).map(Cell::Int).collect();
    let t = heap.atomic_list(&items).unwrap();
    let Cell::Struct(p) = heap.get(t) else {
        panic!("not a list");
    };
    let last = p + 3 * (n as usize - 1);
    heap.set_cell(last + 2, Cell::Struct(p + 3 * loop_to));
    t
}

#[test]
fn test_skip_list_proper() {
    assert_eq!(
        shape("[a, b, c]"),
        ListShape {
            len: 3,
            tail: ListTail::Nil
        }
    );
    assert_eq!(
        shape("[]"),
        ListShape {
            len: 0,
            tail: ListTail::Nil
        }
    );
}

#[test]
fn test_skip_list_partial_and_improper() {
    assert_eq!(shape("[a, b | T]").tail, ListTail::Var);
    assert_eq!(shape("[a, b | T]").len, 2);
    assert!(matches!(shape("[a | b]").tail, ListTail::Other(Cell::Atom(_))));
    assert!(matches!(shape("foo(x)").tail, ListTail::Other(Cell::Struct(_))));
    assert_eq!(shape("X").tail, ListTail::Var);
}

#[test]
fn test_skip_list_cyclic_counts_distinct_cells() {
    for (n, loop_to) in [(1, 0), (2, 0), (5, 0), (5, 3), (7, 6), (100, 37)] {
        let mut heap = Heap::default();
        let t = cyclic_ints(&mut heap, n, loop_to);
        let shape = skip_list(&heap, heap.get(t)).unwrap();
        assert_eq!(shape.tail, ListTail::Cyclic, "n={} loop_to={}", n, loop_to);
        assert_eq!(shape.len, n as usize, "n={} loop_to={}", n, loop_to);
    }
}

#[test]
fn test_skip_list_interrupted() {
    let mut heap = Heap::new(HeapConfig {
        signal_batch: 4,
        ..HeapConfig::default()
    });
    let items: Vec<Cell> = (0..20).map(Cell::Int).collect();
    let t = heap.atomic_list(&items).unwrap();
    heap.interrupt_flag()
        .store(true, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(skip_list(&heap, heap.get(t)), Err(PlError::Interrupted));
}

#[test]
fn test_is_list() {
    let mut heap = Heap::default();
    for (text, expected) in [
        ("[]", true),
        ("[a]", true),
        ("[a, [b] | []]", true),
        ("[a | T]", false),
        ("[a | b]", false),
        ("foo", false),
        ("_", false),
    ] {
        let t = heap.read_term(text).unwrap();
        assert_eq!(is_list(&heap, t), expected, "{}", text);
    }
    let cyclic = cyclic_ints(&mut heap, 3, 1);
    assert!(!is_list(&heap, cyclic));
}

#[test]
fn test_length_list() {
    let mut heap = Heap::default();
    let three = heap.int_term(3);
    let used = heap.used();
    let t = length_list(&mut heap, three).unwrap().unwrap();
    assert_eq!(heap.used(), used + 9);
    assert!(is_list(&heap, t));
    assert_eq!(skip_list(&heap, heap.get(t)).unwrap().len, 3);

    // Every element is a distinct unbound variable.
    let view = heap.view();
    let mut cell = heap.get(t);
    let mut seen = Vec::new();
    while let Some(p) = view.list_cell(cell) {
        let head = view.deref(view.cell(p + 1));
        assert!(matches!(head, Cell::Ref(_)));
        assert!(!seen.contains(&head));
        seen.push(head);
        cell = view.deref(view.cell(p + 2));
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn test_length_list_edge_cases() {
    let mut heap = Heap::default();
    let zero = heap.int_term(0);
    let t = length_list(&mut heap, zero).unwrap().unwrap();
    assert_eq!(heap.get(t), Cell::NIL);

    let negative = heap.int_term(-1);
    assert_eq!(length_list(&mut heap, negative), Ok(None));

    let atom = heap.atom_term("three");
    assert_eq!(
        length_list(&mut heap, atom),
        Err(PlError::type_error(TypeKind::Integer, "three"))
    );
}

#[test]
fn test_length_list_exhausted() {
    let mut heap = Heap::new(HeapConfig {
        initial_cells: 16,
        max_cells: 64,
        signal_batch: 10_000,
    });
    let big = heap.int_term(1000);
    let used = heap.used();
    assert!(matches!(
        length_list(&mut heap, big),
        Err(PlError::ResourceExhausted { .. })
    ));
    assert_eq!(heap.used(), used);

    let huge = heap.int_term(i64::MAX);
    assert!(matches!(
        length_list(&mut heap, huge),
        Err(PlError::ResourceExhausted { .. })
    ));
}
