//! The pluggable energy-landscape framework: one `Constraint` trait plus
//! the concrete constraints the engine ships with.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::assignment::Assignment;
use crate::ids::ClaimId;
use crate::words::{Words, WordsBuilder};

/// `FullMatches`' penalty per inconsistent claim referenced by an assignment.
pub const WRONG_CLAIM_WEIGHT: f64 = 10.0;
/// `LargestClaim`'s penalty per slot that isn't using the longest available claim.
pub const LARGEST_CLAIM_WEIGHT: f64 = 5.0;
/// `ClaimScores`' per-slot weight.
pub const CLAIM_SCORE_WEIGHT: f64 = 50.0;
/// `AllowedSets`' penalty per entity present but not allowed.
pub const ALLOWED_SET_VIOLATION_WEIGHT: f64 = 100.0;
/// `NoTwice`'s penalty per entity "reappearance" after its run has ended.
pub const NO_TWICE_WEIGHT: f64 = 10.0;

/// Raised only to format a `debug_assert!` message when a constraint's
/// `energy` falls outside the bounds it declared, or disagrees with its
/// own `score`. Never part of a public `Result` (the core has no
/// recoverable errors, see crate-level docs).
#[derive(Debug, Error)]
pub enum ConstraintViolation {
    #[error("{constraint} energy {energy} outside declared bounds [{lo}, {hi}]")]
    OutOfBounds {
        constraint: &'static str,
        energy: f64,
        lo: f64,
        hi: f64,
    },
    #[error("{constraint} energy {energy} inconsistent with score {score}")]
    ScoreMismatch {
        constraint: &'static str,
        energy: f64,
        score: f64,
    },
}

/// A component of the energy landscape the solver minimises.
///
/// Implementers must keep `energy` and `score` consistent (energy 0 should
/// imply score 1 for binary constraints) and must ensure `energy_bounds`
/// truly bounds every value `energy` can return; both are only checked by
/// `debug_assert!` at call sites, not enforced here.
pub trait Constraint {
    /// Short name used only in diagnostics (bound-violation warnings).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Prunes proofs that can never participate in a feasible assignment.
    /// Most constraints have nothing to prune.
    fn cleanup(&self, _words: &mut WordsBuilder) {}

    /// `(lo, hi)`, precomputed bounds used to calibrate the annealer.
    fn energy_bounds(&self, words: &Words) -> (f64, f64);

    /// Non-negative; 0 means perfect satisfaction for soft constraints.
    fn energy(&self, words: &Words, assignment: &Assignment) -> f64;

    /// 1.0 when fully satisfied, 0.0 when violated.
    fn score(&self, words: &Words, assignment: &Assignment) -> f64;
}

fn distinct_entities_present(words: &Words, assignment: &Assignment) -> FxHashSet<String> {
    assignment
        .chosen_proofs(words)
        .into_iter()
        .map(|(_, proof)| words.claim(proof.claim).entity.clone())
        .collect()
}

/// Hard constraint: a Claim is only usable if *every* one of its proofs,
/// in order 0..length, is chosen at strictly contiguous word positions.
pub struct FullMatches;

impl FullMatches {
    fn inconsistent_claim_count(words: &Words, assignment: &Assignment) -> usize {
        let mut by_claim: FxHashMap<ClaimId, Vec<(usize, usize)>> = FxHashMap::default();
        for (word, proof) in assignment.chosen_proofs(words) {
            by_claim
                .entry(proof.claim)
                .or_default()
                .push((word.index(), proof.order));
        }

        let mut inconsistent = 0;
        for (claim_id, mut positions) in by_claim {
            let claim = words.claim(claim_id);
            positions.sort_by_key(|&(_, order)| order);
            let consistent = positions.len() == claim.length
                && positions
                    .iter()
                    .enumerate()
                    .all(|(i, &(pos, order))| order == i && pos == positions[0].0 + i);
            if !consistent {
                inconsistent += 1;
            }
        }
        inconsistent
    }
}

impl Constraint for FullMatches {
    fn cleanup(&self, words: &mut WordsBuilder) {
        let word_ids: Vec<_> = words.iter_word_ids().collect();
        let mut keepers: FxHashSet<(crate::ids::WordId, usize)> = FxHashSet::default();

        for (start_pos, &start_word) in word_ids.iter().enumerate() {
            let start_proofs = words.proofs_of(start_word).to_vec();
            for (local_idx, proof) in start_proofs.iter().enumerate() {
                if proof.order != 0 {
                    continue;
                }
                let claim = words.claim(proof.claim).clone();
                let mut chain = vec![(start_word, local_idx)];
                let mut last_order = 0usize;
                let mut pos = start_pos;
                while last_order + 1 < claim.length {
                    pos += 1;
                    if pos >= word_ids.len() {
                        break;
                    }
                    let next_word = word_ids[pos];
                    match words.find_proof(next_word, proof.claim, last_order + 1) {
                        Some(pidx) => {
                            chain.push((next_word, pidx));
                            last_order += 1;
                        }
                        None => break,
                    }
                }
                if chain.len() == claim.length {
                    keepers.extend(chain);
                }
            }
        }

        words.retain_proofs(|word, idx, _proof| keepers.contains(&(word, idx)));
    }

    fn energy_bounds(&self, words: &Words) -> (f64, f64) {
        (0.0, words.len() as f64 * WRONG_CLAIM_WEIGHT)
    }

    fn energy(&self, words: &Words, assignment: &Assignment) -> f64 {
        Self::inconsistent_claim_count(words, assignment) as f64 * WRONG_CLAIM_WEIGHT
    }

    fn score(&self, words: &Words, assignment: &Assignment) -> f64 {
        if self.energy(words, assignment) == 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// One allowed combination of entities: `penalty` is the cost of choosing
/// this set, `needs_one_of` is what makes it eligible, `also_allowed` names
/// entities it tolerates alongside those.
pub struct EntitySet {
    pub penalty: f64,
    pub needs_one_of: FxHashSet<String>,
    pub also_allowed: FxHashSet<String>,
}

impl EntitySet {
    pub fn new(
        penalty: f64,
        needs_one_of: impl IntoIterator<Item = String>,
        also_allowed: impl IntoIterator<Item = String>,
    ) -> Self {
        EntitySet {
            penalty,
            needs_one_of: needs_one_of.into_iter().collect(),
            also_allowed: also_allowed.into_iter().collect(),
        }
    }

    fn allowed(&self) -> FxHashSet<String> {
        self.needs_one_of
            .union(&self.also_allowed)
            .cloned()
            .collect()
    }
}

/// Soft, priority-layered constraint: penalises entities present in the
/// utterance that aren't covered by whichever configured `EntitySet` best
/// fits, scaled against the cost of using that set at all.
pub struct AllowedSets {
    sets: Vec<EntitySet>,
}

impl AllowedSets {
    pub fn new(sets: Vec<EntitySet>) -> Self {
        AllowedSets { sets }
    }

    fn min_penalty(&self) -> f64 {
        self.sets
            .iter()
            .map(|s| s.penalty)
            .fold(f64::INFINITY, f64::min)
    }

    fn choose(&self, present: &FxHashSet<String>) -> Option<&EntitySet> {
        self.sets
            .iter()
            .filter(|s| s.needs_one_of.iter().any(|e| present.contains(e)))
            .min_by(|a, b| a.penalty.partial_cmp(&b.penalty).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl Constraint for AllowedSets {
    fn energy_bounds(&self, words: &Words) -> (f64, f64) {
        let lo = if self.sets.is_empty() {
            0.0
        } else {
            self.min_penalty()
        };
        (lo, lo + words.len() as f64 * ALLOWED_SET_VIOLATION_WEIGHT)
    }

    fn energy(&self, words: &Words, assignment: &Assignment) -> f64 {
        let present = distinct_entities_present(words, assignment);
        let chosen = self.choose(&present);
        let (allowed, penalty) = match chosen {
            Some(set) => (set.allowed(), set.penalty),
            None => (FxHashSet::default(), 0.0),
        };
        let violations = present.iter().filter(|e| !allowed.contains(*e)).count();
        violations as f64 * ALLOWED_SET_VIOLATION_WEIGHT + penalty
    }

    fn score(&self, words: &Words, assignment: &Assignment) -> f64 {
        let present = distinct_entities_present(words, assignment);
        let allowed = match self.choose(&present) {
            Some(set) => set.allowed(),
            None => FxHashSet::default(),
        };
        if present.iter().all(|e| allowed.contains(e)) {
            1.0
        } else {
            0.0
        }
    }
}

/// Soft preference: rewards choosing the longest available claim at every
/// slot. Score is always 1 (this constraint only ever shapes the energy
/// landscape; it never marks an assignment as outright invalid).
pub struct LargestClaim;

impl Constraint for LargestClaim {
    fn energy_bounds(&self, words: &Words) -> (f64, f64) {
        let n = words.len() as f64 * LARGEST_CLAIM_WEIGHT;
        (n, n)
    }

    fn energy(&self, words: &Words, assignment: &Assignment) -> f64 {
        words
            .iter_word_ids()
            .map(|word| match assignment.get(word) {
                None => LARGEST_CLAIM_WEIGHT,
                Some(idx) => {
                    let proofs = words.proofs(word);
                    let chosen_len = words.claim(proofs[idx].claim).length;
                    let beaten = proofs
                        .iter()
                        .any(|p| words.claim(p.claim).length > chosen_len);
                    if beaten {
                        LARGEST_CLAIM_WEIGHT
                    } else {
                        0.0
                    }
                }
            })
            .sum()
    }

    fn score(&self, _words: &Words, _assignment: &Assignment) -> f64 {
        1.0
    }
}

/// Soft, quality constraint: rewards assignments whose chosen claims carry
/// high match scores, and penalises leaving a word unassigned exactly as
/// much as assigning it to the worst possible claim.
pub struct ClaimScores;

impl Constraint for ClaimScores {
    fn energy_bounds(&self, words: &Words) -> (f64, f64) {
        let n = words.len() as f64 * CLAIM_SCORE_WEIGHT;
        (n, n)
    }

    fn energy(&self, words: &Words, assignment: &Assignment) -> f64 {
        words
            .iter_word_ids()
            .map(|word| match assignment.get(word) {
                None => CLAIM_SCORE_WEIGHT,
                Some(idx) => {
                    let proof = &words.proofs(word)[idx];
                    (1.0 - words.claim(proof.claim).score) * CLAIM_SCORE_WEIGHT
                }
            })
            .sum()
    }

    fn score(&self, words: &Words, assignment: &Assignment) -> f64 {
        let mut seen = FxHashSet::default();
        let mut scores = Vec::new();
        for (_, proof) in assignment.chosen_proofs(words) {
            if seen.insert(proof.claim) {
                scores.push(words.claim(proof.claim).score);
            }
        }
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

/// Once the assignment's walk has moved on from a run of some entity,
/// that entity must not reappear in a later run.
pub struct NoTwice;

impl NoTwice {
    /// The sequence of entity names referenced by the assignment, in word
    /// order, with consecutive repeats of the *same* entity collapsed into
    /// a single run.
    fn runs(words: &Words, assignment: &Assignment) -> Vec<String> {
        let mut runs = Vec::new();
        for (_, proof) in assignment.chosen_proofs(words) {
            let entity = &words.claim(proof.claim).entity;
            if runs.last().map(|r: &String| r != entity).unwrap_or(true) {
                runs.push(entity.clone());
            }
        }
        runs
    }

    fn reappearances(words: &Words, assignment: &Assignment) -> usize {
        let runs = Self::runs(words, assignment);
        let distinct: FxHashSet<&String> = runs.iter().collect();
        runs.len() - distinct.len()
    }
}

impl Constraint for NoTwice {
    fn energy_bounds(&self, words: &Words) -> (f64, f64) {
        (0.0, words.len() as f64 * NO_TWICE_WEIGHT)
    }

    fn energy(&self, words: &Words, assignment: &Assignment) -> f64 {
        Self::reappearances(words, assignment) as f64 * NO_TWICE_WEIGHT
    }

    fn score(&self, words: &Words, assignment: &Assignment) -> f64 {
        if Self::reappearances(words, assignment) == 0 {
            1.0
        } else {
            0.0
        }
    }
}
