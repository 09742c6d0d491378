/// Bottom-up natural merge sort over singly linked node chains.
///
/// The engine only relinks nodes; it never allocates. Runs are collected on a
/// fixed stack and merged by the binary-counter rule, so after `r` runs the
/// stack holds one run per set bit of `r`.
use std::cmp::Ordering;

/// Run stack depth: enough for `usize::MAX` runs.
pub const RUN_STACK: usize = usize::BITS as usize;

/// A singly linked chain of sortable nodes.
pub trait SortChain {
    type Node: Copy + Eq;

    fn next(&self, node: Self::Node) -> Option<Self::Node>;

    fn set_next(&mut self, node: Self::Node, next: Option<Self::Node>);

    /// Compare the keys of two nodes, direction already applied.
    fn compare(&self, a: Self::Node, b: Self::Node) -> Ordering;

    /// Called once for every node dropped as a duplicate.
    fn release(&mut self, node: Self::Node);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome<N> {
    pub head: Option<N>,
    /// Number of maximal runs found in the input.
    pub runs: usize,
    /// Number of nodes released as duplicates.
    pub dropped: usize,
}

struct Engine<'c, C: SortChain> {
    chain: &'c mut C,
    dedup: bool,
    dropped: usize,
}

impl<C: SortChain> Engine<'_, C> {
    fn drop_node(&mut self, node: C::Node) -> Option<C::Node> {
        let after = self.chain.next(node);
        self.chain.release(node);
        self.dropped += 1;
        after
    }

    /// Detach one maximal run from the front of `first`'s chain.
    /// Returns the run head and the remaining data.
    fn take_run(&mut self, first: C::Node) -> (C::Node, Option<C::Node>) {
        let Some(second) = self.chain.next(first) else {
            return (first, None);
        };
        let mut rest = self.chain.next(second);
        let mut tail = match self.chain.compare(first, second) {
            Ordering::Greater => return self.descending_run(first, second, rest),
            Ordering::Equal if self.dedup => {
                self.drop_node(second);
                first
            }
            _ => second,
        };

        while let Some(r) = rest {
            match self.chain.compare(tail, r) {
                Ordering::Greater => break,
                Ordering::Equal if self.dedup => rest = self.drop_node(r),
                _ => {
                    self.chain.set_next(tail, Some(r));
                    tail = r;
                    rest = self.chain.next(r);
                }
            }
        }
        self.chain.set_next(tail, None);
        (first, rest)
    }

    /// Grow a strictly descending run by prepending, so it reads ascending.
    fn descending_run(
        &mut self,
        first: C::Node,
        second: C::Node,
        mut rest: Option<C::Node>,
    ) -> (C::Node, Option<C::Node>) {
        self.chain.set_next(first, None);
        self.chain.set_next(second, Some(first));
        let mut head = second;
        while let Some(r) = rest {
            match self.chain.compare(r, head) {
                Ordering::Less => {
                    rest = self.chain.next(r);
                    self.chain.set_next(r, Some(head));
                    head = r;
                }
                // The run head came earlier in the input and survives.
                Ordering::Equal if self.dedup => rest = self.drop_node(r),
                _ => break,
            }
        }
        (head, rest)
    }

    /// Merge two runs; `earlier` wins ties.
    fn merge(&mut self, earlier: C::Node, later: C::Node) -> C::Node {
        let mut head: Option<C::Node> = None;
        let mut tail: Option<C::Node> = None;
        let (mut a, mut b) = (Some(earlier), Some(later));

        while let (Some(x), Some(y)) = (a, b) {
            let ord = self.chain.compare(x, y);
            let taken = if ord == Ordering::Greater {
                b = self.chain.next(y);
                y
            } else {
                a = self.chain.next(x);
                if ord == Ordering::Equal && self.dedup {
                    b = self.drop_node(y);
                }
                x
            };
            match tail {
                Some(t) => self.chain.set_next(t, Some(taken)),
                None => head = Some(taken),
            }
            tail = Some(taken);
        }

        let remainder = a.or(b);
        match tail {
            Some(t) => {
                self.chain.set_next(t, remainder);
                head.unwrap_or(earlier)
            }
            None => remainder.unwrap_or(earlier),
        }
    }
}

/// Sort the chain starting at `head`.
///
/// Stable unless `dedup`; with `dedup` the first node of every group of
/// equal keys survives and the others are passed to [`SortChain::release`].
/// Takes `n - 1` comparisons on input that is already ascending or strictly
/// descending.
pub fn nat_sort<C: SortChain>(
    chain: &mut C,
    head: Option<C::Node>,
    dedup: bool,
) -> MergeOutcome<C::Node> {
    let mut engine = Engine {
        chain,
        dedup,
        dropped: 0,
    };
    let mut stack: [Option<C::Node>; RUN_STACK] = [None; RUN_STACK];
    let mut sp = 0usize;
    let mut runs = 0usize;
    let mut data = head;

    while let Some(first) = data {
        let (mut run, rest) = engine.take_run(first);
        data = rest;
        runs += 1;

        let mut k = runs;
        while k & 1 == 0 {
            sp -= 1;
            if let Some(earlier) = stack[sp].take() {
                run = engine.merge(earlier, run);
            }
            k >>= 1;
        }
        stack[sp] = Some(run);
        sp += 1;
    }

    let mut sorted: Option<C::Node> = None;
    while sp > 0 {
        sp -= 1;
        sorted = match (stack[sp].take(), sorted) {
            (Some(earlier), Some(later)) => Some(engine.merge(earlier, later)),
            (earlier, later) => earlier.or(later),
        };
    }

    MergeOutcome {
        head: sorted,
        runs,
        dropped: engine.dropped,
    }
}
