//! Iron Throne: a claim-based natural-language understanding engine.
//!
//! Given an utterance and a catalog of known expressions, [`IronThrone`]
//! returns the subset of entities that best explain it, together with a
//! confidence score in `[0, 1]`. Fuzzy trigram matching tolerates
//! misspellings; a simulated-annealing solver arbitrates between
//! overlapping candidates by minimising a pluggable constraint energy
//! landscape.
//!
//! The pipeline, leaves first: [`words::tokenize`] splits the utterance
//! into [`words::WordData`]; [`pretenders::Pretender`] impls (the only one
//! shipped is [`pretenders::ExpressionPretender`]) attach
//! [`claim::Claim`]/[`claim::Proof`] hypotheses; [`constraints::Constraint`]
//! impls define the energy landscape and prune obviously-dead proofs;
//! [`solver::Solver`] anneals an [`assignment::Assignment`] against that
//! landscape; [`IronThrone::get_entities`] assembles the result.
//!
//! Catalog loading, alias expansion, tokenisation conventions beyond
//! whitespace/non-word splitting, and a subscriber for the `tracing` events
//! this crate emits are all the caller's responsibility.

pub mod assignment;
pub mod claim;
pub mod constraints;
pub mod ids;
pub mod pretenders;
pub mod solver;
pub mod trigram;
pub mod utils;
pub mod words;

use rand::Rng;
use tracing::{debug, trace};

use crate::claim::Claim;
use crate::constraints::Constraint;
use crate::pretenders::Pretender;
use crate::solver::{new_csprng, Solver, DEFAULT_STEPS};
use crate::words::WordsBuilder;

/// The engine: a fixed set of pretenders and constraints, reusable across
/// any number of [`IronThrone::get_entities`] calls. Pretenders and
/// constraints that hold no per-call mutable state (the shipped
/// [`pretenders::ExpressionPretender`] does not) are safe to share across
/// threads; each call builds its own [`words::WordsBuilder`], so no
/// structure is written to concurrently.
pub struct IronThrone {
    pretenders: Vec<Box<dyn Pretender>>,
    constraints: Vec<Box<dyn Constraint>>,
}

impl IronThrone {
    pub fn new(pretenders: Vec<Box<dyn Pretender>>, constraints: Vec<Box<dyn Constraint>>) -> Self {
        IronThrone {
            pretenders,
            constraints,
        }
    }

    /// Runs the full pipeline with the default step count and the OS
    /// CSPRNG, as the reference implementation requires for production use.
    pub fn get_entities(&self, text: &str) -> (Vec<Claim>, f64) {
        let mut rng = new_csprng();
        self.get_entities_with(text, DEFAULT_STEPS, &mut rng)
    }

    /// Like [`Self::get_entities`], but with an explicit step count and
    /// RNG. Tests should inject a seeded `rand::rngs::StdRng` to get
    /// reproducible trajectories; production callers should stick to
    /// [`solver::new_csprng`].
    pub fn get_entities_with<R: Rng>(&self, text: &str, steps: u32, rng: &mut R) -> (Vec<Claim>, f64) {
        let mut builder = WordsBuilder::new(text);
        debug!(words = builder.len(), "tokenised utterance");

        let mut seq = 0u32;
        for pretender in &self.pretenders {
            seq = pretender.claim(&mut builder, seq);
        }
        trace!(claims = builder.claim_ids().count(), "pretenders finished");

        for constraint in &self.constraints {
            constraint.cleanup(&mut builder);
        }
        trace!(claims = builder.claim_ids().count(), "cleanup finished");

        if builder.claim_ids().next().is_none() {
            return (Vec::new(), 0.0);
        }

        let words = builder.freeze();
        let (assignment, best_energy) = Solver::with_steps(&words, &self.constraints, steps).anneal(rng);
        debug!(best_energy, steps, "annealing finished");

        let mut seen = rustc_hash::FxHashSet::default();
        let mut claims = Vec::new();
        for (_, proof) in assignment.chosen_proofs(&words) {
            if seen.insert(proof.claim) {
                claims.push(words.claim(proof.claim).clone());
            }
        }

        let score = self
            .constraints
            .iter()
            .map(|c| c.score(&words, &assignment))
            .fold(None, |acc: Option<f64>, s| {
                Some(acc.map_or(s, |acc| acc.min(s)))
            })
            .unwrap_or(0.0);

        (claims, score)
    }
}
