//! Fixed-width bit-sets over the terminal index space.
//!
//! Grounded on `bit-vec`, the crate a sibling context-free-grammar
//! tool in the wider ecosystem reaches for instead of hand-rolling
//! word-packed sets.

use bit_vec::BitVec;
use std::fmt;

use crate::ids::SymbolId;

/// A set of terminal symbol indices, sized once the terminal count is
/// known (after the symbol table is sorted and finalized).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    bits: BitVec,
}

impl TokenSet {
    pub fn new(terminal_count: usize) -> Self {
        Self {
            bits: BitVec::from_elem(terminal_count, false),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.iter().filter(|b| *b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.any()
    }

    pub fn contains(&self, symbol: SymbolId) -> bool {
        self.bits.get(symbol.index()).unwrap_or(false)
    }

    pub fn insert(&mut self, symbol: SymbolId) -> bool {
        let was_set = self.bits.get(symbol.index()).unwrap_or(false);
        self.bits.set(symbol.index(), true);
        !was_set
    }

    /// Union `other` into `self`, returning whether anything changed.
    /// Drives the fixed-point loops in the nullable/FIRST/follow-set
    /// analyzers.
    pub fn union_with(&mut self, other: &TokenSet) -> bool {
        let mut changed = false;
        for i in 0..self.bits.len() {
            if other.bits.get(i).unwrap_or(false) && !self.bits.get(i).unwrap_or(false) {
                self.bits.set(i, true);
                changed = true;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter().enumerate().filter_map(|(i, b)| if b { Some(i) } else { None })
    }
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for i in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", i)?;
            first = false;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(i: usize) -> SymbolId {
        SymbolId::new(i as u32)
    }

    #[test]
    fn insert_reports_change() {
        let mut set = TokenSet::new(4);
        assert!(set.insert(sid(1)));
        assert!(!set.insert(sid(1)));
        assert!(set.contains(sid(1)));
        assert!(!set.contains(sid(2)));
    }

    #[test]
    fn union_with_reports_change_only_when_growing() {
        let mut a = TokenSet::new(4);
        let mut b = TokenSet::new(4);
        a.insert(sid(0));
        b.insert(sid(0));
        b.insert(sid(2));
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.len(), 2);
    }
}
