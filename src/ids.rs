//! Strongly-typed indices into the word and claim arenas.
//!
//! Proofs form a cycle between `Word`, `Claim` and `Proof` in the naive
//! object-graph reading of the data model. We cut the cycle by storing
//! words and claims in flat arenas and referring to them by these newtypes
//! instead of by reference, so identity comparisons are integer equality.

use std::fmt;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub(crate) fn new(idx: usize) -> Self {
                debug_assert!(idx <= u32::MAX as usize, "arena index overflowed u32");
                Self(idx as u32)
            }

            /// The arena position this id refers to.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

index_type!(
    /// Position of a [`crate::words::WordData`] within a [`crate::words::Words`]
    /// or [`crate::words::WordsBuilder`].
    WordId
);

index_type!(
    /// Position of a [`crate::claim::Claim`] within a claim arena.
    ClaimId
);
