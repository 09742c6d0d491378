/// Standard order of terms.
///
/// Var < Number < Atom < String < Compound. Numbers compare by value, and a
/// float sorts before an integer of equal value. Atoms and strings compare by
/// text. Compounds compare by arity, then name, then arguments left to right.
use std::cmp::Ordering;

use smallvec::SmallVec;

use super::core::{Addr, Cell, TermView};

/// Arguments still to be compared, pairwise, for one compound level.
#[derive(Clone, Copy)]
struct ArgRun {
    left: Addr,
    right: Addr,
    remaining: usize,
}

enum Shallow {
    Decided(Ordering),
    Args(ArgRun),
}

#[inline]
fn rank(cell: Cell) -> u8 {
    match cell {
        Cell::Ref(_) => 0,
        Cell::Int(_) | Cell::Float(_) => 1,
        Cell::Atom(_) => 2,
        Cell::Str(_) => 3,
        Cell::Struct(_) | Cell::Dict(_) => 4,
        Cell::Functor(_) | Cell::DictHeader(_) => 5,
    }
}

/// Compare an integer with a float by exact value.
///
/// Casting `x` to f64 rounds integers beyond 2^53, so the float is split
/// into its integral part and fraction instead. NaN sorts below every int.
fn compare_int_float(x: i64, y: f64) -> Ordering {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if y.is_nan() || y < -LIMIT {
        return Ordering::Greater;
    }
    if y >= LIMIT {
        return Ordering::Less;
    }
    let whole = y.trunc();
    match x.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(y - whole)).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

/// Compare two numbers; on equal value a float sorts first.
#[inline]
pub fn compare_numbers(a: Cell, b: Cell) -> Ordering {
    match (a, b) {
        (Cell::Int(x), Cell::Int(y)) => x.cmp(&y),
        (Cell::Float(x), Cell::Float(y)) => x.total_cmp(&y),
        (Cell::Int(x), Cell::Float(y)) => compare_int_float(x, y).then(Ordering::Greater),
        (Cell::Float(x), Cell::Int(y)) => compare_int_float(y, x).reverse().then(Ordering::Less),
        _ => Ordering::Equal,
    }
}

impl<'a> TermView<'a> {
    /// Compare the terms stored at two addresses.
    #[inline]
    pub fn compare_standard(&self, a: Addr, b: Addr) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.compare_cells(self.cell(a), self.cell(b))
    }

    /// Compare two value cells in the standard order of terms.
    pub fn compare_cells(&self, a: Cell, b: Cell) -> Ordering {
        let mut pending: SmallVec<[ArgRun; 8]> = SmallVec::new();
        let (mut x, mut y) = (a, b);
        loop {
            match self.compare_shallow(self.deref(x), self.deref(y)) {
                Shallow::Decided(Ordering::Equal) => {}
                Shallow::Decided(ord) => return ord,
                Shallow::Args(run) => {
                    if run.remaining > 0 {
                        pending.push(run);
                    }
                }
            }

            // Next argument pair, innermost compound first. A run is popped
            // as its last pair is taken, so list spines do not pile up.
            let Some(run) = pending.last_mut() else {
                return Ordering::Equal;
            };
            x = self.cell(run.left);
            y = self.cell(run.right);
            run.left += 1;
            run.right += 1;
            run.remaining -= 1;
            if run.remaining == 0 {
                pending.pop();
            }
        }
    }

    fn compare_shallow(&self, a: Cell, b: Cell) -> Shallow {
        let (ra, rb) = (rank(a), rank(b));
        if ra != rb {
            return Shallow::Decided(ra.cmp(&rb));
        }
        let ord = match (a, b) {
            (Cell::Ref(x), Cell::Ref(y)) => x.cmp(&y),
            (Cell::Atom(x), Cell::Atom(y)) => {
                if x == y {
                    Ordering::Equal
                } else {
                    self.atom_name(x).cmp(self.atom_name(y))
                }
            }
            (Cell::Str(x), Cell::Str(y)) => self.string(x).cmp(self.string(y)),
            (Cell::Struct(p), Cell::Struct(q)) | (Cell::Dict(p), Cell::Dict(q)) if p == q => {
                Ordering::Equal
            }
            (Cell::Struct(_) | Cell::Dict(_), Cell::Struct(_) | Cell::Dict(_)) => {
                return self.compare_compound_heads(a, b);
            }
            _ if ra == 1 => compare_numbers(a, b),
            _ => Ordering::Equal,
        };
        Shallow::Decided(ord)
    }

    fn compare_compound_heads(&self, a: Cell, b: Cell) -> Shallow {
        let (Some((fa, na, pa)), Some((fb, nb, pb))) = (self.compound(a), self.compound(b)) else {
            return Shallow::Decided(Ordering::Equal);
        };
        match na.cmp(&nb) {
            Ordering::Equal => {}
            ord => return Shallow::Decided(ord),
        }
        if fa != fb {
            match self.atom_name(fa).cmp(self.atom_name(fb)) {
                Ordering::Equal => {}
                ord => return Shallow::Decided(ord),
            }
        }
        Shallow::Args(ArgRun {
            left: pa,
            right: pb,
            remaining: na,
        })
    }
}
