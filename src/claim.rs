//! The public snapshot types returned from, and consumed by, the engine.

use crate::ids::{ClaimId, WordId};

/// A hypothesis that one specific [`crate::pretenders::Expression`] is
/// present in the utterance. Identity is `entity#seq`; two claims compare
/// equal iff every field matches (see [`Claim::id`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub entity: String,
    pub value: String,
    /// Mean match quality of the proofs a pretender attached to this claim, in [0, 1].
    pub score: f64,
    /// Number of words in the underlying expression. Every proof attached
    /// to this claim has `order` in `0..length`.
    pub length: usize,
    /// Sequence number unique per claim instance produced during one
    /// `get_entities` call.
    pub seq: u32,
}

impl Claim {
    /// `entity#seq`, this claim's identity within a single engine call.
    pub fn id(&self) -> String {
        format!("{}#{}", self.entity, self.seq)
    }
}

/// Binds one [`crate::words::WordData`] to one position within one
/// [`Claim`]. Proofs are owned by the word they're attached to; this
/// struct only names the claim and order, it doesn't borrow anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Proof {
    /// Position within the claim's underlying expression, `0..claim.length`.
    pub order: usize,
    pub claim: ClaimId,
    pub word: WordId,
    /// Per-word match quality, in [0, 1].
    pub score: f64,
}
