//! Trigram multisets and the fuzzy similarity ratio built on top of them.

use rustc_hash::FxHashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// A single padded 3-character window. Stored as `char`s (not bytes), so
/// that multi-byte scripts participate in trigram matching on the same
/// footing as ASCII: no lossy byte-folding, no collisions.
pub type Trigram = [char; 3];

/// Lower-cases `text` and strips diacritics via canonical decomposition:
/// NFD splits a precomposed character like `é` into `e` + a combining
/// acute accent, and the combining marks are then dropped. Lower-casing
/// happens last, after marks are gone, so that expansions produced by
/// `char::to_lowercase` (e.g. the dot above reintroduced when lower-casing
/// `İ`) don't sneak back in.
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// The trigram decomposition of one (already normalized) word, keeping
/// multiplicities: a trigram that occurs twice in the padded form is
/// retained twice, not deduplicated.
#[derive(Debug, Clone, Default)]
pub struct TrigramMultiset {
    counts: FxHashMap<Trigram, u32>,
    total: u32,
}

impl TrigramMultiset {
    /// Builds the multiset for `normalized`: pads with a single leading and
    /// trailing space, then takes every 3-character window.
    pub fn from_padded(normalized: &str) -> Self {
        let mut padded: Vec<char> = Vec::with_capacity(normalized.chars().count() + 2);
        padded.push(' ');
        padded.extend(normalized.chars());
        padded.push(' ');

        let mut counts: FxHashMap<Trigram, u32> = FxHashMap::default();
        let mut total = 0u32;
        if padded.len() >= 3 {
            for window in padded.windows(3) {
                let key: Trigram = [window[0], window[1], window[2]];
                *counts.entry(key).or_insert(0) += 1;
                total += 1;
            }
        }

        TrigramMultiset { counts, total }
    }

    /// Total trigram count, with multiplicity (`|T(w)|` in the spec).
    pub fn len(&self) -> usize {
        self.total as usize
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Multiset intersection size: `Σ min(count_a(t), count_b(t))` over
    /// every trigram either side has. This (rather than a co-occurrence
    /// dot product) is what makes `similarity(w, w) == 1.0` hold even when
    /// `w`'s padded form repeats a trigram.
    pub fn intersection_count(&self, other: &TrigramMultiset) -> u32 {
        let (small, big) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .counts
            .iter()
            .map(|(t, &c)| c.min(*big.counts.get(t).unwrap_or(&0)))
            .sum()
    }

    /// Distinct trigrams with their multiplicity, for index building.
    pub fn distinct(&self) -> impl Iterator<Item = (&Trigram, u32)> {
        self.counts.iter().map(|(t, &c)| (t, c))
    }
}

/// `s(a, b) = |T(a) ∩ T(b)| / (|T(a)| + |T(b)| - |T(a) ∩ T(b)|)`, the
/// Jaccard-like ratio over padded trigram multisets.
pub fn similarity(a: &TrigramMultiset, b: &TrigramMultiset) -> f64 {
    let inter = a.intersection_count(b) as f64;
    let denom = a.len() as f64 + b.len() as f64 - inter;
    if denom <= 0.0 {
        0.0
    } else {
        inter / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(text: &str) -> TrigramMultiset {
        TrigramMultiset::from_padded(&normalize(text))
    }

    #[test]
    fn empty_word_has_no_trigrams() {
        let t = ms("");
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn single_letter_has_one_trigram() {
        let t = ms("a");
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn identity_similarity_is_one() {
        for w in ["hello", "a", "potato", "aaaa", "東京", "café"] {
            let t = ms(w);
            assert_eq!(similarity(&t, &t), 1.0, "word {w:?} was not self-similar");
        }
    }

    #[test]
    fn symmetry_holds() {
        let pairs = [("hello", "hallo"), ("potato", "tomato"), ("salad", "salmon")];
        for (a, b) in pairs {
            let (ta, tb) = (ms(a), ms(b));
            assert_eq!(similarity(&ta, &tb), similarity(&tb, &ta));
        }
    }

    #[test]
    fn diacritics_are_folded_away() {
        assert_eq!(normalize("café"), normalize("cafe"));
        assert_eq!(normalize("İstanbul"), normalize("istanbul"));
        assert_eq!(normalize("RESUME"), normalize("resume"));
    }

    #[test]
    fn unrelated_words_share_no_trigrams() {
        let t1 = ms("elephant");
        let t2 = ms("xyz");
        assert_eq!(t1.intersection_count(&t2), 0);
        assert_eq!(similarity(&t1, &t2), 0.0);
    }
}
