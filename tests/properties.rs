//! Property-based tests covering: trigram symmetry/identity, constraint
//! bounds, proof bidirectionality, claim score ranges, and cleanup
//! idempotency. Generators draw from ASCII plus a handful of accented/CJK/
//! emoji code points so the invariants are exercised across the input
//! space rather than a fixed table of examples.

use proptest::prelude::*;

use iron_throne::constraints::{
    AllowedSets, ClaimScores, Constraint, EntitySet, FullMatches, LargestClaim,
};
use iron_throne::pretenders::{Expression, ExpressionPretender, Pretender};
use iron_throne::trigram::{normalize, similarity, TrigramMultiset};
use iron_throne::words::{Words, WordsBuilder};
use iron_throne::assignment::Assignment;

/// A handful of words, including non-ASCII scripts and an emoji, that
/// combine into utterances.
fn word_vocab() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("salad".to_string()),
        Just("potato".to_string()),
        Just("turtle".to_string()),
        Just("cafe".to_string()),
        Just("caf\u{e9}".to_string()),
        Just("\u{6771}\u{4eac}".to_string()),
        Just("\u{1f355}".to_string()),
        Just("elephant".to_string()),
        Just("xyz".to_string()),
    ]
}

fn utterance_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(word_vocab(), 0..6).prop_map(|words| words.join(" "))
}

fn catalog() -> Vec<Expression> {
    vec![
        Expression::new("food", "salad", "salad"),
        Expression::new("food", "potato-salad", "potato salad"),
        Expression::new("animal", "turtle", "turtle"),
        Expression::new("animal", "elephant", "elephant"),
    ]
}

fn all_constraints() -> Vec<Box<dyn Constraint>> {
    vec![
        Box::new(FullMatches),
        Box::new(LargestClaim),
        Box::new(ClaimScores),
        Box::new(AllowedSets::new(vec![EntitySet::new(
            0.0,
            ["food".to_string()],
            ["animal".to_string()],
        )])),
    ]
}

/// Maps raw, unconstrained integers into a well-formed assignment: each
/// word gets `None` or a valid index into its own proof list.
fn assignment_from_raw(words: &Words, raw: &[i32]) -> Assignment {
    let mut assignment = Assignment::empty(words.len());
    for (word, &value) in words.iter_word_ids().zip(raw.iter()) {
        let proof_count = words.proofs(word).len();
        if value < 0 || proof_count == 0 {
            continue;
        }
        let idx = (value as usize) % proof_count;
        assignment.set(word, Some(idx));
    }
    assignment
}

fn built(text: &str) -> Words {
    let mut builder = WordsBuilder::new(text);
    ExpressionPretender::new(catalog()).claim(&mut builder, 0);
    for constraint in all_constraints() {
        constraint.cleanup(&mut builder);
    }
    builder.freeze()
}

proptest! {
    #[test]
    fn trigram_similarity_is_symmetric(a in utterance_strategy(), b in utterance_strategy()) {
        let ta = TrigramMultiset::from_padded(&normalize(&a));
        let tb = TrigramMultiset::from_padded(&normalize(&b));
        prop_assert_eq!(similarity(&ta, &tb), similarity(&tb, &ta));
    }

    #[test]
    fn trigram_similarity_identity_holds(word in word_vocab()) {
        let t = TrigramMultiset::from_padded(&normalize(&word));
        prop_assert_eq!(similarity(&t, &t), 1.0);
    }

    #[test]
    fn constraint_energy_respects_its_own_bounds(
        text in utterance_strategy(),
        raw in prop::collection::vec(any::<i32>(), 0..6),
    ) {
        let words = built(&text);
        let assignment = assignment_from_raw(&words, &raw);

        for constraint in all_constraints() {
            let (lo, hi) = constraint.energy_bounds(&words);
            let energy = constraint.energy(&words, &assignment);
            prop_assert!(
                energy >= lo - 1e-9 && energy <= hi + 1e-9,
                "{} energy {} outside [{}, {}]",
                constraint.name(),
                energy,
                lo,
                hi
            );
        }
    }

    #[test]
    fn full_matches_empty_assignment_is_always_feasible(text in utterance_strategy()) {
        let words = built(&text);
        let empty = Assignment::empty(words.len());
        prop_assert_eq!(FullMatches.energy(&words, &empty), 0.0);
    }

    #[test]
    fn every_proof_is_referenced_by_exactly_one_word_and_claim(text in utterance_strategy()) {
        let words = built(&text);
        for word in words.iter_word_ids() {
            for (idx, proof) in words.proofs(word).iter().enumerate() {
                let refs = words.claim_proof_refs(proof.claim);
                let count = refs.iter().filter(|&&(w, i)| w == word && i == idx).count();
                prop_assert_eq!(count, 1);
            }
        }
        for claim in words.claim_ids() {
            for &(word, idx) in words.claim_proof_refs(claim) {
                prop_assert_eq!(words.proofs(word)[idx].claim, claim);
            }
        }
    }

    #[test]
    fn claim_scores_land_in_unit_interval(text in utterance_strategy()) {
        let mut builder = WordsBuilder::new(&text);
        ExpressionPretender::new(catalog()).claim(&mut builder, 0);
        for claim in builder.claim_ids() {
            let score = builder.claim(claim).score;
            prop_assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn full_matches_cleanup_is_idempotent(text in utterance_strategy()) {
        let mut builder = WordsBuilder::new(&text);
        ExpressionPretender::new(catalog()).claim(&mut builder, 0);

        FullMatches.cleanup(&mut builder);
        let after_first: Vec<usize> = builder
            .iter_word_ids()
            .map(|w| builder.proofs_of(w).len())
            .collect();

        FullMatches.cleanup(&mut builder);
        let after_second: Vec<usize> = builder
            .iter_word_ids()
            .map(|w| builder.proofs_of(w).len())
            .collect();

        prop_assert_eq!(after_first, after_second);
    }
}
