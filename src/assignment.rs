//! The mutable state the solver anneals over: one slot per word, each
//! naming which of that word's candidate proofs (if any) is currently
//! selected.

use crate::claim::Proof;
use crate::ids::WordId;
use crate::words::Words;

/// `assignment[word] == Some(i)` means "word's `i`-th proof is chosen";
/// `None` means the word currently proves nothing.
#[derive(Debug, Clone)]
pub struct Assignment {
    choices: Vec<Option<usize>>,
}

impl Assignment {
    /// Every word starts unassigned.
    pub fn empty(len: usize) -> Self {
        Assignment {
            choices: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn get(&self, word: WordId) -> Option<usize> {
        self.choices[word.index()]
    }

    /// Sets `word`'s choice, returning the previous one so the caller can
    /// restore it on a rejected move.
    pub fn set(&mut self, word: WordId, choice: Option<usize>) -> Option<usize> {
        std::mem::replace(&mut self.choices[word.index()], choice)
    }

    /// The proof selected for each word that currently has one, in word
    /// order. This is what constraints and the final result assembler
    /// read to see "what does this assignment actually claim".
    pub fn chosen_proofs<'w>(&self, words: &'w Words) -> Vec<(WordId, &'w Proof)> {
        words
            .iter_word_ids()
            .filter_map(|word| {
                let idx = self.get(word)?;
                words.proofs(word).get(idx).map(|proof| (word, proof))
            })
            .collect()
    }
}
