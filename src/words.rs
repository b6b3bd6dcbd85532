//! Tokenisation and the word/claim arena that pretenders, constraints, and
//! the solver all share.
//!
//! The arena goes through two phases, enforced by two separate types:
//! [`WordsBuilder`] is mutable (pretenders attach proofs, constraints prune
//! them), and [`WordsBuilder::freeze`] hands off to [`Words`], which is
//! read-only and is all the solver and the scoring pass ever see.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::claim::{Claim, Proof};
use crate::ids::{ClaimId, WordId};
use crate::trigram::{normalize, TrigramMultiset};

static WORD_SEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static word-separator regex is valid"));

/// Splits `text` on runs of non-word characters (Unicode letters and
/// digits are word characters; everything else, including `_`, is a
/// separator). Mirrors `str::split`/`re.split` semantics: a leading or
/// trailing separator run still produces an empty token, so positions
/// line up with what callers expect from a plain split rather than a
/// find-words scan.
pub fn tokenize(text: &str) -> Vec<WordData> {
    WORD_SEP
        .split(text)
        .enumerate()
        .map(|(position, piece)| WordData::new(piece, position))
        .collect()
}

/// An immutable token produced by [`tokenize`]. Two words are equal iff
/// their original text is equal.
#[derive(Debug, Clone)]
pub struct WordData {
    pub text: String,
    pub position: usize,
    normalized: String,
    trigrams: TrigramMultiset,
}

impl WordData {
    pub fn new(text: &str, position: usize) -> Self {
        let normalized = normalize(text);
        let trigrams = TrigramMultiset::from_padded(&normalized);
        WordData {
            text: text.to_string(),
            position,
            normalized,
            trigrams,
        }
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn trigrams(&self) -> &TrigramMultiset {
        &self.trigrams
    }
}

impl PartialEq for WordData {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}
impl Eq for WordData {}

struct WordSlot {
    data: WordData,
    proofs: Vec<Proof>,
}

struct ClaimRecord {
    claim: Claim,
    /// Back-references to every proof attached to this claim, kept in
    /// sync by [`WordsBuilder::retain_proofs`].
    proof_refs: Vec<(WordId, usize)>,
}

/// The mutable phase of the arena: pretenders attach proofs, constraints'
/// `cleanup` passes prune them.
pub struct WordsBuilder {
    words: Vec<WordSlot>,
    claims: Vec<ClaimRecord>,
}

impl WordsBuilder {
    pub fn new(text: &str) -> Self {
        let words = tokenize(text)
            .into_iter()
            .map(|data| WordSlot {
                data,
                proofs: Vec::new(),
            })
            .collect();
        WordsBuilder {
            words,
            claims: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word_data(&self, word: WordId) -> &WordData {
        &self.words[word.index()].data
    }

    pub fn iter_word_ids(&self) -> impl Iterator<Item = WordId> {
        (0..self.words.len()).map(WordId::new)
    }

    pub fn proofs_of(&self, word: WordId) -> &[Proof] {
        &self.words[word.index()].proofs
    }

    /// Looks up the proof attached to `word` for `claim` at exactly
    /// `order`, if one exists. Used by `FullMatches`' cleanup to walk a
    /// candidate expression forward one word at a time.
    pub fn find_proof(&self, word: WordId, claim: ClaimId, order: usize) -> Option<usize> {
        self.words[word.index()]
            .proofs
            .iter()
            .position(|p| p.claim == claim && p.order == order)
    }

    /// Finds the claim for `(entity, value)` at `seq`, or creates it with
    /// a placeholder score of 0 (the pretender is expected to fill in the
    /// real score once every proof is attached).
    pub fn get_or_create_claim(
        &mut self,
        entity: &str,
        value: &str,
        length: usize,
        seq: u32,
    ) -> ClaimId {
        if let Some(pos) = self
            .claims
            .iter()
            .position(|c| c.claim.entity == entity && c.claim.value == value && c.claim.seq == seq)
        {
            return ClaimId::new(pos);
        }
        let id = ClaimId::new(self.claims.len());
        self.claims.push(ClaimRecord {
            claim: Claim {
                entity: entity.to_string(),
                value: value.to_string(),
                score: 0.0,
                length,
                seq,
            },
            proof_refs: Vec::new(),
        });
        id
    }

    pub fn attach_proof(&mut self, word: WordId, order: usize, claim: ClaimId, score: f64) {
        let local_idx = self.words[word.index()].proofs.len();
        self.words[word.index()].proofs.push(Proof {
            order,
            claim,
            word,
            score,
        });
        self.claims[claim.index()].proof_refs.push((word, local_idx));
    }

    pub fn set_claim_score(&mut self, claim: ClaimId, score: f64) {
        self.claims[claim.index()].claim.score = score;
    }

    pub fn claim(&self, id: ClaimId) -> &Claim {
        &self.claims[id.index()].claim
    }

    pub fn claim_ids(&self) -> impl Iterator<Item = ClaimId> {
        (0..self.claims.len()).map(ClaimId::new)
    }

    /// Every `(word, local proof index)` pair currently attached to
    /// `claim`, kept in sync by [`WordsBuilder::retain_proofs`]. Used by
    /// pretenders to average a claim's proofs' scores once every word has
    /// been scanned.
    pub fn claim_proof_refs(&self, id: ClaimId) -> &[(WordId, usize)] {
        &self.claims[id.index()].proof_refs
    }

    /// Drops every proof for which `keep` returns `false`, then rebuilds
    /// every claim's back-reference list so it stays in sync. Constraints
    /// must only remove proofs this way; words and claims themselves are
    /// never pruned.
    pub fn retain_proofs(&mut self, mut keep: impl FnMut(WordId, usize, &Proof) -> bool) {
        for (widx, slot) in self.words.iter_mut().enumerate() {
            let word_id = WordId::new(widx);
            let mut i = 0usize;
            slot.proofs.retain(|p| {
                let keep_it = keep(word_id, i, p);
                i += 1;
                keep_it
            });
        }
        self.rebuild_claim_backrefs();
    }

    fn rebuild_claim_backrefs(&mut self) {
        for record in &mut self.claims {
            record.proof_refs.clear();
        }
        for (widx, slot) in self.words.iter().enumerate() {
            let word_id = WordId::new(widx);
            for (pidx, proof) in slot.proofs.iter().enumerate() {
                self.claims[proof.claim.index()]
                    .proof_refs
                    .push((word_id, pidx));
            }
        }
    }

    /// Freezes the arena for the solving phase: no more proofs can be
    /// attached or pruned after this point.
    pub fn freeze(self) -> Words {
        Words {
            words: self.words,
            claims: self.claims,
        }
    }
}

/// The read-only phase of the arena, used by constraints and the solver.
pub struct Words {
    words: Vec<WordSlot>,
    claims: Vec<ClaimRecord>,
}

impl Words {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, id: WordId) -> &WordData {
        &self.words[id.index()].data
    }

    pub fn proofs(&self, id: WordId) -> &[Proof] {
        &self.words[id.index()].proofs
    }

    pub fn iter_word_ids(&self) -> impl Iterator<Item = WordId> {
        (0..self.words.len()).map(WordId::new)
    }

    pub fn claim(&self, id: ClaimId) -> &Claim {
        &self.claims[id.index()].claim
    }

    pub fn claim_ids(&self) -> impl Iterator<Item = ClaimId> {
        (0..self.claims.len()).map(ClaimId::new)
    }

    pub fn claim_proof_refs(&self, id: ClaimId) -> &[(WordId, usize)] {
        &self.claims[id.index()].proof_refs
    }
}
