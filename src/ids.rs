//! Typed arena indices.
//!
//! Symbols, rules, configurations and states are represented in typed
//! arenas keyed by integer indices rather than raw or
//! reference-counted pointers, so cross-references stay plain `Copy`
//! values instead of `Rc`/lifetime-bound borrows.

use std::fmt;

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(SymbolId);
arena_id!(RuleId);
arena_id!(ConfigId);
arena_id!(StateId);

/// Reserved index of the sentinel end-of-input terminal.
pub const END_OF_INPUT: SymbolId = SymbolId(0);
