//! Pretenders: the things that look at the word sequence and *pretend*
//! that some of it is an instance of an entity. [`ExpressionPretender`] is
//! the only pretender the engine ships with, matching a catalog of known
//! expressions against the utterance by fuzzy trigram similarity.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ids::WordId;
use crate::trigram::{normalize, similarity, Trigram, TrigramMultiset};
use crate::words::WordsBuilder;

/// Anything that can inspect the word arena and attach proofs/claims to
/// it. Pretenders never remove anything; only constraints' `cleanup`
/// passes do that.
pub trait Pretender {
    /// Attaches every claim/proof this pretender can find. `base_seq` is
    /// the first sequence number this pretender may hand out; it must
    /// return the next free sequence number so callers can chain several
    /// pretenders over one arena without seq collisions.
    fn claim(&self, words: &mut WordsBuilder, base_seq: u32) -> u32;
}

/// One entry in an [`ExpressionPretender`]'s catalog: a value of `entity`
/// spelled out as a sequence of tokens to fuzzy-match against the
/// utterance, in order.
#[derive(Debug, Clone)]
pub struct Expression {
    pub entity: String,
    pub value: String,
    tokens: Vec<String>,
    trigrams: Vec<TrigramMultiset>,
}

impl Expression {
    pub fn new(entity: impl Into<String>, value: impl Into<String>, text: &str) -> Self {
        let tokens: Vec<String> = text.split_whitespace().map(|t| t.to_string()).collect();
        let trigrams = tokens
            .iter()
            .map(|t| TrigramMultiset::from_padded(&normalize(t)))
            .collect();
        Expression {
            entity: entity.into(),
            value: value.into(),
            tokens,
            trigrams,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.value == other.value
    }
}
impl Eq for Expression {}

/// One occurrence of a trigram in a catalog word: which expression it
/// belongs to (by position in the catalog) and which word of that
/// expression (its `order`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct IndexEntry {
    expr_idx: usize,
    order: usize,
}

/// Minimum per-token trigram similarity for a word to count as a match
/// against an expression's token. Strict: a similarity of exactly this
/// value does not qualify.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

/// Matches a catalog of [`Expression`]s against the word sequence by
/// fuzzy trigram similarity. Builds an inverted index, once, from every
/// trigram appearing anywhere in the catalog to the (expression, position)
/// pairs it occurs in, so matching one input word only has to visit the
/// catalog words that actually share a trigram with it, not the whole
/// catalog.
pub struct ExpressionPretender {
    expressions: Vec<Expression>,
    threshold: f64,
    index: FxHashMap<Trigram, Vec<IndexEntry>>,
}

impl ExpressionPretender {
    pub fn new(expressions: Vec<Expression>) -> Self {
        ExpressionPretender::with_threshold(expressions, SIMILARITY_THRESHOLD)
    }

    pub fn with_threshold(expressions: Vec<Expression>, threshold: f64) -> Self {
        let index = build_index(&expressions);
        ExpressionPretender {
            expressions,
            threshold,
            index,
        }
    }

    /// Candidate `(expression index, order within expression, similarity)`
    /// triples for one input word's trigram multiset: every catalog word
    /// sharing at least one trigram with `word_trigrams`, scored and
    /// filtered to `s > threshold`. A catalog word is only ever scored
    /// once per input word even if several of its trigrams co-occur.
    fn candidates_for(&self, word_trigrams: &TrigramMultiset) -> Vec<(usize, usize, f64)> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for (trigram, _count) in word_trigrams.distinct() {
            let Some(entries) = self.index.get(trigram) else {
                continue;
            };
            for entry in entries {
                if !seen.insert((entry.expr_idx, entry.order)) {
                    continue;
                }
                let catalog_trigrams = &self.expressions[entry.expr_idx].trigrams[entry.order];
                let s = similarity(catalog_trigrams, word_trigrams);
                if s > self.threshold {
                    out.push((entry.expr_idx, entry.order, s));
                }
            }
        }
        out
    }
}

fn build_index(expressions: &[Expression]) -> FxHashMap<Trigram, Vec<IndexEntry>> {
    let mut index: FxHashMap<Trigram, Vec<IndexEntry>> = FxHashMap::default();
    for (expr_idx, expr) in expressions.iter().enumerate() {
        for (order, trigrams) in expr.trigrams.iter().enumerate() {
            for (trigram, _count) in trigrams.distinct() {
                index
                    .entry(*trigram)
                    .or_default()
                    .push(IndexEntry { expr_idx, order });
            }
        }
    }
    index
}

impl Pretender for ExpressionPretender {
    fn claim(&self, words: &mut WordsBuilder, base_seq: u32) -> u32 {
        let word_ids: Vec<WordId> = words.iter_word_ids().collect();
        let mut touched_claims = Vec::new();

        for word_id in word_ids {
            let word_trigrams = words.word_data(word_id).trigrams().clone();
            for (expr_idx, order, score) in self.candidates_for(&word_trigrams) {
                let expr = &self.expressions[expr_idx];
                let seq = base_seq + expr_idx as u32;
                let claim_id = words.get_or_create_claim(&expr.entity, &expr.value, expr.len(), seq);
                words.attach_proof(word_id, order, claim_id, score);
                if !touched_claims.contains(&claim_id) {
                    touched_claims.push(claim_id);
                }
            }
        }

        for claim_id in touched_claims {
            let scores: Vec<f64> = words
                .claim_proof_refs(claim_id)
                .iter()
                .map(|&(word, idx)| words.proofs_of(word)[idx].score)
                .collect();
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            words.set_claim_score(claim_id, mean);
        }

        base_seq + self.expressions.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ClaimId;

    fn expr(entity: &str, value: &str, text: &str) -> Expression {
        Expression::new(entity, value, text)
    }

    fn catalog() -> Vec<Expression> {
        vec![
            expr("food", "salad", "salad"),
            expr("food", "potato-salad", "potato salad"),
            expr("food", "cheese", "cheese"),
            expr("food", "ham", "ham"),
            expr("animal", "turtle", "turtle"),
            expr("animal", "fox", "fox"),
            expr("animal", "elephant", "elephant"),
        ]
    }

    #[test]
    fn exact_word_produces_full_score_claim() {
        let pretender =
            ExpressionPretender::new(vec![expr("food", "potato salad", "potato salad")]);
        let mut words = WordsBuilder::new("I like potato salad");
        let next_seq = pretender.claim(&mut words, 0);
        assert!(next_seq >= 1);

        let claim_id = ClaimId::new(0);
        let claim = words.claim(claim_id);
        assert_eq!(claim.entity, "food");
        assert_eq!(claim.value, "potato salad");
        assert_eq!(claim.score, 1.0);
        assert_eq!(claim.length, 2);
    }

    #[test]
    fn unrelated_text_produces_no_claims() {
        let pretender =
            ExpressionPretender::new(vec![expr("food", "potato salad", "potato salad")]);
        let mut words = WordsBuilder::new("completely different sentence here");
        pretender.claim(&mut words, 0);
        assert_eq!(words.claim_ids().count(), 0);
    }

    #[test]
    fn fuzzy_typo_still_matches_above_threshold() {
        let pretender =
            ExpressionPretender::new(vec![expr("food", "potato salad", "potato salad")]);
        let mut words = WordsBuilder::new("I like potatoe salad");
        pretender.claim(&mut words, 0);
        assert_eq!(words.claim_ids().count(), 1);
    }

    /// A claim's seq is the expression's position in the catalog, not the
    /// order in which occurrences are discovered in the utterance.
    #[test]
    fn claim_seq_matches_catalog_position() {
        let pretender = ExpressionPretender::new(catalog());
        let mut words = WordsBuilder::new("elephant eats potato salad");
        pretender.claim(&mut words, 0);

        let elephant_claim = words
            .claim_ids()
            .map(|id| words.claim(id))
            .find(|c| c.value == "elephant")
            .unwrap();
        assert_eq!(elephant_claim.seq, 6);

        let salad_claim = words
            .claim_ids()
            .map(|id| words.claim(id))
            .find(|c| c.value == "salad")
            .unwrap();
        assert_eq!(salad_claim.seq, 0);

        let potato_salad_claim = words
            .claim_ids()
            .map(|id| words.claim(id))
            .find(|c| c.value == "potato-salad")
            .unwrap();
        assert_eq!(potato_salad_claim.seq, 1);
    }

    /// A single word can carry proofs for more than one claim, and even
    /// more than one position of the same claim if the expression repeats
    /// a word. The pretender attaches every candidate it finds; it is
    /// `FullMatches`' cleanup pass, not the pretender, that later prunes
    /// the ones that can't complete a full expression.
    #[test]
    fn one_word_accumulates_proofs_for_multiple_claims() {
        let pretender = ExpressionPretender::new(catalog());
        let mut words = WordsBuilder::new("elephant eats potato salad");
        pretender.claim(&mut words, 0);

        let salad_word = crate::ids::WordId::new(3);
        let proofs = words.proofs_of(salad_word);
        assert_eq!(proofs.len(), 2, "expected both 'salad' and 'potato salad' proofs");
    }

    #[test]
    fn base_seq_offsets_every_expression_in_the_catalog() {
        let pretender = ExpressionPretender::new(catalog());
        let mut words = WordsBuilder::new("elephant");
        let next_seq = pretender.claim(&mut words, 100);
        assert_eq!(next_seq, 107);

        let claim = words.claim(words.claim_ids().next().unwrap());
        assert_eq!(claim.seq, 106);
    }

    /// Building the index twice over the same catalog yields the same
    /// (trigram -> candidates) contents, independent of hash-map iteration
    /// order.
    #[test]
    fn index_is_deterministic_modulo_iteration_order() {
        let a = build_index(&catalog());
        let b = build_index(&catalog());
        assert_eq!(a.len(), b.len());
        for (trigram, entries_a) in &a {
            let mut ea = entries_a.clone();
            let mut eb = b.get(trigram).expect("trigram missing in second build").clone();
            ea.sort_by_key(|e| (e.expr_idx, e.order));
            eb.sort_by_key(|e| (e.expr_idx, e.order));
            assert_eq!(ea, eb);
        }
    }
}
