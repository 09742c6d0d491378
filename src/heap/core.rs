/// Relocatable term heap.
///
/// Terms live in one contiguous store of fixed-size cells addressed by
/// absolute addresses (`base + index`). When a reservation does not fit in
/// the current capacity the store is moved to a fresh address range and every
/// pointer cell and every root is rebased. Raw `Addr` values held outside the
/// heap are stale after such a move; `TermRef` handles are not.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use log::debug;

use super::atom::{Atom, AtomTable, Functor};
use crate::common::PlError;

/// Absolute cell address.
pub type Addr = usize;

/// First address handed out by a fresh heap. Address 0 is never valid.
const INITIAL_BASE: Addr = 0x1000;

/// Handle into the string table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrId(u32);

/// One heap cell.
///
/// Value cells (`Ref` .. `Dict`) may appear anywhere a term is stored.
/// `Functor` and `DictHeader` only appear at the address a `Struct` or
/// `Dict` pointer refers to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cell {
    /// Reference. A cell referencing its own address is an unbound variable.
    Ref(Addr),
    Atom(Atom),
    Int(i64),
    Float(f64),
    Str(StrId),
    /// Pointer to a `Functor` header followed by the arguments.
    Struct(Addr),
    /// Pointer to a `DictHeader`, followed by the tag and the key/value pairs.
    Dict(Addr),
    Functor(Functor),
    DictHeader(u32),
}

impl Cell {
    pub const NIL: Cell = Cell::Atom(Atom::NIL);

    #[inline]
    fn is_pointer(&self) -> bool {
        matches!(self, Cell::Ref(_) | Cell::Struct(_) | Cell::Dict(_))
    }

    /// True for cells that carry no address and so survive relocation.
    #[inline]
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Cell::Atom(_) | Cell::Int(_) | Cell::Float(_) | Cell::Str(_)
        )
    }

    #[inline]
    fn rebased(self, delta: usize) -> Cell {
        match self {
            Cell::Ref(a) => Cell::Ref(a + delta),
            Cell::Struct(a) => Cell::Struct(a + delta),
            Cell::Dict(a) => Cell::Dict(a + delta),
            other => other,
        }
    }
}

/// Consume a raised interrupt flag. Usable while the heap itself is
/// mutably borrowed.
#[inline]
pub fn check_interrupt(flag: &AtomicBool) -> Result<(), PlError> {
    if flag.swap(false, AtomicOrdering::AcqRel) {
        return Err(PlError::Interrupted);
    }
    Ok(())
}

/// Handle to a root slot. Roots are rebased on relocation, so a `TermRef`
/// stays valid across any allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermRef(usize);

/// Allocation level returned by [`Heap::mark`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeapMark(usize);

/// Heap sizing.
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Capacity of a fresh heap, in cells.
    pub initial_cells: usize,
    /// Hard limit; reservations beyond it raise `ResourceExhausted`.
    pub max_cells: usize,
    /// Number of list cells walked between interrupt checks.
    pub signal_batch: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            initial_cells: 64 * 1024,
            max_cells: 64 * 1024 * 1024,
            signal_batch: 10_000,
        }
    }
}

pub struct Heap {
    config: HeapConfig,
    base: Addr,
    capacity: usize,
    cells: Vec<Cell>,
    roots: Vec<Cell>,
    atoms: AtomTable,
    strings: Vec<Box<str>>,
    interrupt: Arc<AtomicBool>,
    relocations: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new(HeapConfig::default())
    }
}

impl Heap {
    pub fn new(config: HeapConfig) -> Self {
        let capacity = config.initial_cells.min(config.max_cells);
        Heap {
            base: INITIAL_BASE,
            capacity,
            cells: Vec::with_capacity(capacity),
            roots: Vec::new(),
            atoms: AtomTable::new(),
            strings: Vec::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
            relocations: 0,
            config,
        }
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Address one past the last allocated cell.
    #[inline]
    pub fn top(&self) -> Addr {
        self.base + self.cells.len()
    }

    /// Number of cells in use.
    #[inline]
    pub fn used(&self) -> usize {
        self.cells.len()
    }

    /// How many times the store has moved.
    pub fn relocations(&self) -> usize {
        self.relocations
    }

    #[inline]
    pub fn cell(&self, addr: Addr) -> Cell {
        self.cells[addr - self.base]
    }

    /// Like [`Heap::cell`], but `None` for addresses outside the live store
    /// (for example addresses captured before a relocation).
    pub fn try_cell(&self, addr: Addr) -> Option<Cell> {
        addr.checked_sub(self.base)
            .and_then(|ix| self.cells.get(ix))
            .copied()
    }

    #[inline]
    pub fn set_cell(&mut self, addr: Addr, cell: Cell) {
        let ix = addr - self.base;
        self.cells[ix] = cell;
    }

    // ── Space management ──────────────────────────────────────────────

    #[inline]
    pub fn has_space(&self, n: usize) -> bool {
        self.cells.len() + n <= self.capacity
    }

    /// Guarantee room for `n` more cells, moving the store if needed.
    ///
    /// After a successful call the next `alloc` of up to `n` cells cannot
    /// relocate. Any `Addr` obtained before the call must be re-derived.
    pub fn reserve(&mut self, n: usize) -> Result<(), PlError> {
        if self.has_space(n) {
            return Ok(());
        }
        let needed = match self.cells.len().checked_add(n) {
            Some(needed) if needed <= self.config.max_cells => needed,
            _ => return Err(PlError::ResourceExhausted { requested: n }),
        };
        let new_capacity = (self.capacity.max(1) * 2)
            .max(needed)
            .min(self.config.max_cells);
        self.relocate(new_capacity);
        Ok(())
    }

    fn relocate(&mut self, new_capacity: usize) {
        let new_base = self.base + self.capacity.max(1);
        let delta = new_base - self.base;

        let mut cells = Vec::with_capacity(new_capacity);
        cells.extend(self.cells.iter().map(|c| c.rebased(delta)));
        for root in &mut self.roots {
            if root.is_pointer() {
                *root = root.rebased(delta);
            }
        }

        debug!(
            "heap relocated: {} -> {} cells, base {:#x} -> {:#x}",
            self.capacity, new_capacity, self.base, new_base
        );
        self.cells = cells;
        self.base = new_base;
        self.capacity = new_capacity;
        self.relocations += 1;
    }

    /// Allocate `n` cells initialised as fresh variables.
    pub fn alloc(&mut self, n: usize) -> Result<Addr, PlError> {
        self.reserve(n)?;
        let start = self.top();
        self.cells.extend((start..start + n).map(Cell::Ref));
        Ok(start)
    }

    /// Current allocation level. Unlike an `Addr`, a mark survives relocation.
    #[inline]
    pub fn mark(&self) -> HeapMark {
        HeapMark(self.cells.len())
    }

    /// Drop every cell allocated after `mark`. Nothing may still refer to them.
    pub fn reset_to(&mut self, mark: HeapMark) {
        self.cells.truncate(mark.0);
    }

    // ── Roots ─────────────────────────────────────────────────────────

    pub fn new_term_ref(&mut self, cell: Cell) -> TermRef {
        self.roots.push(cell);
        TermRef(self.roots.len() - 1)
    }

    /// Root cell as stored (not dereferenced).
    #[inline]
    pub fn get(&self, t: TermRef) -> Cell {
        self.roots[t.0]
    }

    pub fn set(&mut self, t: TermRef, cell: Cell) {
        self.roots[t.0] = cell;
    }

    /// Root cell, dereferenced.
    #[inline]
    pub fn resolve(&self, t: TermRef) -> Cell {
        self.deref(self.get(t))
    }

    /// Mark for [`Heap::discard_frame`].
    pub fn frame(&self) -> usize {
        self.roots.len()
    }

    /// Drop every root created after `mark`.
    pub fn discard_frame(&mut self, mark: usize) {
        self.roots.truncate(mark);
    }

    // ── Dereferencing ─────────────────────────────────────────────────

    /// Follow references from a value cell. The result is either a
    /// non-reference cell or `Ref(a)` for the unbound variable at `a`.
    #[inline]
    pub fn deref(&self, cell: Cell) -> Cell {
        self.view().deref(cell)
    }

    /// Follow references starting at a slot; returns the address of the
    /// final cell (the slot itself when it holds a value).
    #[inline]
    pub fn deref_addr(&self, addr: Addr) -> Addr {
        self.view().deref_addr(addr)
    }

    /// Address of the list cell `cell` points to, if it is one.
    #[inline]
    pub fn list_cell(&self, cell: Cell) -> Option<Addr> {
        self.view().list_cell(cell)
    }

    /// Dereferenced tail of the list cell at `p`.
    #[inline]
    pub fn tail_of(&self, p: Addr) -> Cell {
        self.deref(self.cell(p + 2))
    }

    // ── Atoms and strings ─────────────────────────────────────────────

    pub fn intern(&mut self, name: &str) -> Atom {
        self.atoms.intern(name)
    }

    pub fn atom_name(&self, atom: Atom) -> &str {
        self.atoms.name(atom)
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn new_string(&mut self, text: &str) -> StrId {
        self.strings.push(text.into());
        StrId((self.strings.len() - 1) as u32)
    }

    pub fn string(&self, id: StrId) -> &str {
        &self.strings[id.0 as usize]
    }

    // ── Interrupts ────────────────────────────────────────────────────

    /// Flag an embedder raises to abort long list operations.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Use an externally owned interrupt flag (e.g. one set from a signal handler).
    pub fn set_interrupt_flag(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = flag;
    }

    /// Service a pending interrupt, if any.
    pub fn handle_signals(&self) -> Result<(), PlError> {
        check_interrupt(&self.interrupt)
    }

    // ── Views ─────────────────────────────────────────────────────────

    #[inline]
    pub fn view(&self) -> TermView<'_> {
        TermView {
            cells: &self.cells,
            base: self.base,
            atoms: &self.atoms,
            strings: &self.strings,
        }
    }

    /// Split the store at `mark`: a read-only view of everything below it and
    /// the mutable cells from `mark` to the top.
    pub fn split_at_mut(&mut self, mark: Addr) -> (TermView<'_>, &mut [Cell]) {
        let (below, above) = self.cells.split_at_mut(mark - self.base);
        (
            TermView {
                cells: below,
                base: self.base,
                atoms: &self.atoms,
                strings: &self.strings,
            },
            above,
        )
    }

    // ── Construction ──────────────────────────────────────────────────
    //
    // Constructors take their inputs as roots so that a relocation triggered
    // by the allocation cannot invalidate them.

    /// Cell to store when copying the value held by root `t` into the heap.
    fn root_value(&self, t: TermRef) -> Cell {
        self.get(t)
    }

    pub fn new_var(&mut self) -> Result<TermRef, PlError> {
        let a = self.alloc(1)?;
        Ok(self.new_term_ref(Cell::Ref(a)))
    }

    pub fn atom_term(&mut self, name: &str) -> TermRef {
        let atom = self.intern(name);
        self.new_term_ref(Cell::Atom(atom))
    }

    pub fn int_term(&mut self, value: i64) -> TermRef {
        self.new_term_ref(Cell::Int(value))
    }

    pub fn float_term(&mut self, value: f64) -> TermRef {
        self.new_term_ref(Cell::Float(value))
    }

    pub fn string_term(&mut self, text: &str) -> TermRef {
        let id = self.new_string(text);
        self.new_term_ref(Cell::Str(id))
    }

    pub fn compound(&mut self, name: Atom, args: &[TermRef]) -> Result<TermRef, PlError> {
        let p = self.alloc(1 + args.len())?;
        self.set_cell(p, Cell::Functor(Functor::new(name, args.len() as u32)));
        for (i, &arg) in args.iter().enumerate() {
            let value = self.root_value(arg);
            self.set_cell(p + 1 + i, value);
        }
        Ok(self.new_term_ref(Cell::Struct(p)))
    }

    /// Build `[I1, I2, ... | Tail]`; `None` tail means `[]`.
    pub fn list(&mut self, items: &[TermRef], tail: Option<TermRef>) -> Result<TermRef, PlError> {
        if items.is_empty() {
            let tail = tail.map_or(Cell::NIL, |t| self.root_value(t));
            return Ok(self.new_term_ref(tail));
        }
        let p = self.alloc(3 * items.len())?;
        for (i, &item) in items.iter().enumerate() {
            let q = p + 3 * i;
            self.set_cell(q, Cell::Functor(Functor::LIST));
            let value = self.root_value(item);
            self.set_cell(q + 1, value);
            let next = if i + 1 < items.len() {
                Cell::Struct(q + 3)
            } else {
                tail.map_or(Cell::NIL, |t| self.root_value(t))
            };
            self.set_cell(q + 2, next);
        }
        Ok(self.new_term_ref(Cell::Struct(p)))
    }

    /// Proper list of atomic cells. Atomic cells hold no address, so the
    /// slice stays valid if the allocation relocates the store.
    pub fn atomic_list(&mut self, items: &[Cell]) -> Result<TermRef, PlError> {
        debug_assert!(items.iter().all(Cell::is_atomic));
        if items.is_empty() {
            return Ok(self.new_term_ref(Cell::NIL));
        }
        let p = self.alloc(3 * items.len())?;
        for (i, &item) in items.iter().enumerate() {
            let q = p + 3 * i;
            self.set_cell(q, Cell::Functor(Functor::LIST));
            self.set_cell(q + 1, item);
            let next = if i + 1 < items.len() {
                Cell::Struct(q + 3)
            } else {
                Cell::NIL
            };
            self.set_cell(q + 2, next);
        }
        Ok(self.new_term_ref(Cell::Struct(p)))
    }

    /// Build a dict. Keys must be atoms or integers and distinct; they are
    /// stored in standard order so lookups can binary-search.
    pub fn dict(&mut self, tag: TermRef, pairs: &[(Cell, TermRef)]) -> Result<TermRef, PlError> {
        let mut order: Vec<usize> = (0..pairs.len()).collect();
        {
            let view = self.view();
            order.sort_by(|&a, &b| view.compare_dict_keys(pairs[a].0, pairs[b].0));
        }
        let p = self.alloc(2 + 2 * pairs.len())?;
        self.set_cell(p, Cell::DictHeader(pairs.len() as u32));
        let tag = self.root_value(tag);
        self.set_cell(p + 1, tag);
        for (slot, &ix) in order.iter().enumerate() {
            let (key, value) = pairs[ix];
            let value = self.root_value(value);
            self.set_cell(p + 2 + 2 * slot, key);
            self.set_cell(p + 3 + 2 * slot, value);
        }
        Ok(self.new_term_ref(Cell::Dict(p)))
    }
}

/// Read-only view of (a prefix of) the heap.
#[derive(Clone, Copy)]
pub struct TermView<'a> {
    cells: &'a [Cell],
    base: Addr,
    atoms: &'a AtomTable,
    strings: &'a [Box<str>],
}

impl<'a> TermView<'a> {
    #[inline]
    pub fn cell(&self, addr: Addr) -> Cell {
        self.cells[addr - self.base]
    }

    #[inline]
    pub fn atom_name(&self, atom: Atom) -> &'a str {
        self.atoms.name(atom)
    }

    #[inline]
    pub fn string(&self, id: StrId) -> &'a str {
        &self.strings[id.0 as usize]
    }

    /// Offset of `addr` from the current base; stable for display.
    #[inline]
    pub fn offset(&self, addr: Addr) -> usize {
        addr - self.base
    }

    #[inline]
    pub fn deref(&self, mut cell: Cell) -> Cell {
        while let Cell::Ref(a) = cell {
            let next = self.cell(a);
            if next == Cell::Ref(a) {
                break;
            }
            cell = next;
        }
        cell
    }

    #[inline]
    pub fn deref_addr(&self, mut addr: Addr) -> Addr {
        loop {
            match self.cell(addr) {
                Cell::Ref(a) if a != addr => addr = a,
                _ => return addr,
            }
        }
    }

    #[inline]
    pub fn is_var(&self, cell: Cell) -> bool {
        matches!(self.deref(cell), Cell::Ref(_))
    }

    #[inline]
    pub fn list_cell(&self, cell: Cell) -> Option<Addr> {
        match cell {
            Cell::Struct(p) if self.cell(p) == Cell::Functor(Functor::LIST) => Some(p),
            _ => None,
        }
    }

    /// Name, arity and address of the first argument of a compound or dict.
    /// A dict reads as `dict(Tag, K1, V1, ...)`.
    #[inline]
    pub fn compound(&self, cell: Cell) -> Option<(Atom, usize, Addr)> {
        match cell {
            Cell::Struct(p) => match self.cell(p) {
                Cell::Functor(f) => Some((f.name, f.arity as usize, p + 1)),
                _ => None,
            },
            Cell::Dict(p) => match self.cell(p) {
                Cell::DictHeader(n) => Some((Atom::DICT, 2 * n as usize + 1, p + 1)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Address of the value stored under `key` in the dict at `p`.
    pub fn dict_lookup(&self, p: Addr, key: Cell) -> Option<Addr> {
        let Cell::DictHeader(n) = self.cell(p) else {
            return None;
        };
        let (mut lo, mut hi) = (0usize, n as usize);
        while lo < hi {
            let mid = (lo + hi) / 2;
            let k = self.cell(p + 2 + 2 * mid);
            match self.compare_dict_keys(k, key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(p + 3 + 2 * mid),
            }
        }
        None
    }

    /// Order of dict keys: integers before atoms, atoms by text.
    pub(crate) fn compare_dict_keys(&self, a: Cell, b: Cell) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (a, b) {
            (Cell::Int(x), Cell::Int(y)) => x.cmp(&y),
            (Cell::Int(_), _) => Ordering::Less,
            (_, Cell::Int(_)) => Ordering::Greater,
            (Cell::Atom(x), Cell::Atom(y)) => self.atom_name(x).cmp(self.atom_name(y)),
            _ => Ordering::Equal,
        }
    }
}
