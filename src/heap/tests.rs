use super::*;
use crate::common::PlError;
use std::cmp::Ordering;

fn read(heap: &mut Heap, text: &str) -> TermRef {
    heap.read_term(text).unwrap()
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    let mut heap = Heap::default();
    let ta = read(&mut heap, a);
    let tb = read(&mut heap, b);
    heap.view().compare_cells(heap.get(ta), heap.get(tb))
}

#[test]
fn test_read_write_roundtrip() {
    let mut heap = Heap::default();
    for text in [
        "[a,b,c]",
        "f(x,g(1,2.5),\"str\")",
        "[b-2,a-1]",
        "'hello world'",
        "[a|b]",
        "point{x:1,y:2}",
        "{a}",
        "a:b:c",
        "- a",
        "1-(2-3)",
        "[]",
        "a- -1",
    ] {
        let t = read(&mut heap, text);
        let expected = match text {
            "- a" => "-a",
            other => other,
        };
        assert_eq!(heap.write_term(t), expected, "input {:?}", text);
    }
}

#[test]
fn test_read_shares_named_variables() {
    let mut heap = Heap::default();
    let t = read(&mut heap, "f(X, Y, X, _, _)");
    let view = heap.view();
    let (_, arity, args) = view.compound(heap.resolve(t)).unwrap();
    assert_eq!(arity, 5);
    let arg = |i: usize| view.deref(view.cell(args + i));
    assert_eq!(arg(0), arg(2));
    assert_ne!(arg(0), arg(1));
    assert_ne!(arg(3), arg(4));
}

#[test]
fn test_read_negative_numbers_and_comments() {
    let mut heap = Heap::default();
    let t = read(&mut heap, "% leading comment\n[-1, -2.5, /* inline */ 3]");
    assert_eq!(heap.write_term(t), "[-1,-2.5,3]");
}

#[test]
fn test_read_syntax_errors() {
    let mut heap = Heap::default();
    assert!(matches!(heap.read_term("f(a"), Err(PlError::Syntax { .. })));
    assert!(matches!(heap.read_term("[a b]"), Err(PlError::Syntax { .. })));
    assert!(matches!(heap.read_term("_{a:1, a:2}"), Err(PlError::Syntax { .. })));
    assert!(matches!(heap.read_term("'open"), Err(PlError::Syntax { .. })));
}

#[test]
fn test_reader_sequence_and_recovery() {
    let mut heap = Heap::default();
    let mut reader = TermReader::new("[b, a].\n[c | ].\n[d].\n");
    let first = reader.next_term(&mut heap).unwrap().unwrap();
    assert_eq!(heap.write_term(first), "[b,a]");
    assert!(reader.next_term(&mut heap).is_err());
    reader.skip_to_end();
    let third = reader.next_term(&mut heap).unwrap().unwrap();
    assert_eq!(heap.write_term(third), "[d]");
    assert!(reader.next_term(&mut heap).unwrap().is_none());
}

#[test]
fn test_standard_order_classes() {
    assert_eq!(cmp_text("_", "1"), Ordering::Less);
    assert_eq!(cmp_text("1", "a"), Ordering::Less);
    assert_eq!(cmp_text("a", "\"a\""), Ordering::Less);
    assert_eq!(cmp_text("\"zzz\"", "f(a)"), Ordering::Less);
    assert_eq!(cmp_text("z", "a(b)"), Ordering::Less);
}

#[test]
fn test_standard_order_numbers() {
    assert_eq!(cmp_text("1", "2"), Ordering::Less);
    assert_eq!(cmp_text("1.5", "1"), Ordering::Greater);
    assert_eq!(cmp_text("1.0", "1"), Ordering::Less);
    assert_eq!(cmp_text("1", "1.0"), Ordering::Greater);
    assert_eq!(cmp_text("-3", "2.0"), Ordering::Less);
    assert_eq!(cmp_text("7", "7"), Ordering::Equal);
    // Beyond 2^53 the int is compared exactly, not through an f64 cast.
    assert_eq!(cmp_text("9007199254740995", "9007199254740996.0"), Ordering::Less);
    assert_eq!(cmp_text("9007199254740997", "9007199254740996.0"), Ordering::Greater);
    assert_eq!(cmp_text("9007199254740996", "9007199254740996.0"), Ordering::Greater);
    assert_eq!(cmp_text("9007199254740996.0", "9007199254740995"), Ordering::Greater);
    assert_eq!(cmp_text("-9007199254740995", "-9007199254740996.0"), Ordering::Greater);
    assert_eq!(cmp_text("9223372036854775807", "9.3e18"), Ordering::Less);
    assert_eq!(
        compare_numbers(Cell::Int(i64::MIN), Cell::Float(-9.3e18)),
        Ordering::Greater
    );
    assert_eq!(
        compare_numbers(Cell::Float(-9_223_372_036_854_775_808.0), Cell::Int(i64::MIN)),
        Ordering::Less
    );
    assert_eq!(compare_numbers(Cell::Int(i64::MAX), Cell::Float(f64::INFINITY)), Ordering::Less);
    assert_eq!(cmp_text("2", "2.5"), Ordering::Less);
    assert_eq!(cmp_text("-2", "-2.5"), Ordering::Greater);
}

#[test]
fn test_standard_order_long_lists() {
    let mut heap = Heap::default();
    let mut values: Vec<Cell> = (0..50_000).map(Cell::Int).collect();
    let a = heap.atomic_list(&values).unwrap();
    let b = heap.atomic_list(&values).unwrap();
    values[49_999] = Cell::Int(-1);
    let c = heap.atomic_list(&values).unwrap();
    let view = heap.view();
    assert_eq!(view.compare_cells(heap.get(a), heap.get(b)), Ordering::Equal);
    assert_eq!(view.compare_cells(heap.get(a), heap.get(c)), Ordering::Greater);
}

#[test]
fn test_standard_order_compounds() {
    // Arity first, then name, then arguments.
    assert_eq!(cmp_text("z(a)", "a(a, a)"), Ordering::Less);
    assert_eq!(cmp_text("a(z)", "b(a)"), Ordering::Less);
    assert_eq!(cmp_text("f(a, g(2))", "f(a, g(1))"), Ordering::Greater);
    assert_eq!(cmp_text("f(a, g(1))", "f(a, g(1))"), Ordering::Equal);
    assert_eq!(cmp_text("[a, b]", "[a, c]"), Ordering::Less);
}

#[test]
fn test_standard_order_variables_by_age() {
    let mut heap = Heap::default();
    let t = read(&mut heap, "f(X, Y)");
    let view = heap.view();
    let (_, _, args) = view.compound(heap.resolve(t)).unwrap();
    assert_eq!(view.compare_standard(args, args + 1), Ordering::Less);
    assert_eq!(view.compare_standard(args, args), Ordering::Equal);
}

#[test]
fn test_dict_lookup() {
    let mut heap = Heap::default();
    let t = read(&mut heap, "_{name: bob, age: 42, 7: seven}");
    let Cell::Dict(p) = heap.resolve(t) else {
        panic!("not a dict");
    };
    let age = heap.intern("age");
    let missing = heap.intern("missing");
    let view = heap.view();
    let v = view.dict_lookup(p, Cell::Atom(age)).unwrap();
    assert_eq!(view.cell(v), Cell::Int(42));
    let v = view.dict_lookup(p, Cell::Int(7)).unwrap();
    assert!(matches!(view.cell(v), Cell::Atom(_)));
    assert!(view.dict_lookup(p, Cell::Atom(missing)).is_none());
}

#[test]
fn test_reserve_relocates_and_rebases_roots() {
    let mut heap = Heap::new(HeapConfig {
        initial_cells: 16,
        max_cells: 1 << 20,
        signal_batch: 10_000,
    });
    let t = read(&mut heap, "[f(a), g(b)]");
    let Cell::Struct(before) = heap.get(t) else {
        panic!("not a list");
    };
    let relocations = heap.relocations();

    heap.reserve(1000).unwrap();

    assert_eq!(heap.relocations(), relocations + 1);
    assert!(heap.try_cell(before).is_none(), "old address must be stale");
    assert_eq!(heap.write_term(t), "[f(a),g(b)]");
}

#[test]
fn test_reserve_beyond_limit() {
    let mut heap = Heap::new(HeapConfig {
        initial_cells: 8,
        max_cells: 32,
        signal_batch: 10_000,
    });
    let used = heap.used();
    assert_eq!(
        heap.reserve(100),
        Err(PlError::ResourceExhausted { requested: 100 })
    );
    assert_eq!(heap.used(), used);
    assert!(heap.reserve(32).is_ok());
}

#[test]
fn test_mark_survives_relocation() {
    let mut heap = Heap::new(HeapConfig {
        initial_cells: 4,
        max_cells: 1 << 16,
        signal_batch: 10_000,
    });
    let keep = read(&mut heap, "keep(me)");
    let mark = heap.mark();
    let frame = heap.frame();
    read(&mut heap, "[a, b, c, d, e, f, g]");
    heap.discard_frame(frame);
    heap.reset_to(mark);
    assert_eq!(heap.mark(), mark);
    assert_eq!(heap.write_term(keep), "keep(me)");
}

#[test]
fn test_interrupt_flag() {
    let heap = Heap::default();
    assert!(heap.handle_signals().is_ok());
    heap.interrupt_flag()
        .store(true, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(heap.handle_signals(), Err(PlError::Interrupted));
    // The flag is consumed.
    assert!(heap.handle_signals().is_ok());
}

#[test]
fn test_culprit_is_depth_limited() {
    let mut heap = Heap::default();
    let items: Vec<Cell> = (0..50).map(Cell::Int).collect();
    let t = heap.atomic_list(&items).unwrap();
    let text = heap.culprit(heap.get(t));
    assert!(text.ends_with("...]"), "got {}", text);
    assert!(text.len() < 60);
}
