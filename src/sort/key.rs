/// Sort keys: which part of an element is compared.
///
/// KEYSPEC for `sort/4`: `0` (the whole element), an argument index, a dict
/// key name, or a list of those forming a path. Indices are 1-based.
use smallvec::SmallVec;

use crate::common::{DomainKind, ExistenceKind, PlError, TypeKind};
use crate::heap::{Addr, Atom, Cell, Functor, Heap, TermRef, TermView, WriteOptions, format_cell};
use crate::lists::skip_list;

/// Path steps stored inline before spilling to the allocator.
pub const FAST_STEPS: usize = 10;

/// One step of a key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 1-based argument index, or an integer dict key.
    Arg(usize),
    /// Dict key name.
    Field(Atom),
}

pub type KeyPath = SmallVec<[Step; FAST_STEPS]>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeySpec {
    /// Compare elements as a whole.
    #[default]
    Whole,
    /// Compare the `Key` of `Key-Value` pairs.
    Pair,
    /// Follow argument indices and dict keys, in order.
    Path(KeyPath),
}

fn culprit(view: TermView<'_>, cell: Cell) -> String {
    format_cell(view, cell, &WriteOptions::culprit())
}

impl KeySpec {
    /// Parse a `sort/4` key specification.
    ///
    /// `0` and `[]` both select the whole element: `[]` is read as the empty
    /// path, not as a field named `[]`.
    pub fn parse(heap: &Heap, spec: TermRef) -> Result<KeySpec, PlError> {
        let view = heap.view();
        let cell = heap.resolve(spec);
        match cell {
            Cell::Ref(_) => Err(PlError::Instantiation),
            Cell::Int(0) | Cell::Atom(Atom::NIL) => Ok(KeySpec::Whole),
            Cell::Int(_) | Cell::Atom(_) => Ok(KeySpec::Path(
                std::iter::once(Self::step(view, cell, cell)?).collect(),
            )),
            Cell::Struct(_) if view.list_cell(cell).is_some() => {
                if !skip_list(heap, cell)?.is_proper() {
                    return Err(PlError::type_error(TypeKind::SortKey, culprit(view, cell)));
                }
                let mut path = KeyPath::new();
                let mut list = cell;
                while let Some(p) = view.list_cell(list) {
                    path.push(Self::step(view, view.deref(view.cell(p + 1)), cell)?);
                    list = view.deref(view.cell(p + 2));
                }
                Ok(KeySpec::Path(path))
            }
            _ => Err(PlError::type_error(TypeKind::SortKey, culprit(view, cell))),
        }
    }

    /// One path step. `whole` is the complete specification, named when the
    /// step has the wrong type.
    fn step(view: TermView<'_>, cell: Cell, whole: Cell) -> Result<Step, PlError> {
        match cell {
            Cell::Int(n) if n > 0 => Ok(Step::Arg(n as usize)),
            Cell::Int(_) => Err(PlError::domain_error(
                DomainKind::NotLessThanOne,
                culprit(view, cell),
            )),
            Cell::Atom(a) => Ok(Step::Field(a)),
            _ => Err(PlError::type_error(TypeKind::SortKey, culprit(view, whole))),
        }
    }

    /// True when keys are the elements themselves.
    pub fn is_whole(&self) -> bool {
        match self {
            KeySpec::Whole => true,
            KeySpec::Path(path) => path.is_empty(),
            KeySpec::Pair => false,
        }
    }
}

fn step_text(view: TermView<'_>, step: Step) -> String {
    match step {
        Step::Arg(n) => {
            let mut buf = itoa::Buffer::new();
            buf.format(n).to_string()
        }
        Step::Field(a) => culprit(view, Cell::Atom(a)),
    }
}

/// Address of the key of the element stored at `element`.
///
/// `element` must be dereferenced. The result is dereferenced too.
pub fn extract_key(view: TermView<'_>, element: Addr, spec: &KeySpec) -> Result<Addr, PlError> {
    match spec {
        KeySpec::Whole => Ok(element),
        KeySpec::Pair => match view.cell(element) {
            Cell::Struct(p) if view.cell(p) == Cell::Functor(Functor::PAIR) => {
                Ok(view.deref_addr(p + 1))
            }
            other => Err(PlError::type_error(TypeKind::Pair, culprit(view, other))),
        },
        KeySpec::Path(path) => {
            let mut at = element;
            for &step in path {
                at = follow(view, at, step)?;
            }
            Ok(at)
        }
    }
}

fn follow(view: TermView<'_>, at: Addr, step: Step) -> Result<Addr, PlError> {
    let value = view.cell(at);
    match value {
        Cell::Dict(p) => {
            let key = match step {
                Step::Arg(n) => Cell::Int(n as i64),
                Step::Field(a) => Cell::Atom(a),
            };
            match view.dict_lookup(p, key) {
                Some(v) => Ok(view.deref_addr(v)),
                None => Err(PlError::existence_error(
                    ExistenceKind::Key,
                    step_text(view, step),
                    culprit(view, value),
                )),
            }
        }
        Cell::Struct(_) => {
            let Some((_, arity, first)) = view.compound(value) else {
                return Err(PlError::type_error(TypeKind::Compound, culprit(view, value)));
            };
            match step {
                Step::Arg(n) if n <= arity => Ok(view.deref_addr(first + n - 1)),
                Step::Arg(_) => Err(PlError::existence_error(
                    ExistenceKind::Argument,
                    step_text(view, step),
                    culprit(view, value),
                )),
                Step::Field(_) => Err(PlError::type_error(TypeKind::Dict, culprit(view, value))),
            }
        }
        _ => Err(PlError::type_error(TypeKind::Compound, culprit(view, value))),
    }
}
