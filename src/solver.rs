//! Simulated annealing over [`Assignment`]s, driven by the sum of the
//! constraint set's energies.

use rand::Rng;
use tracing::{trace, warn};

use crate::assignment::Assignment;
use crate::constraints::{Constraint, ConstraintViolation};
use crate::ids::WordId;
use crate::words::Words;

/// Default annealing step count, per the reference calibration.
pub const DEFAULT_STEPS: u32 = 10_000;

/// The OS CSPRNG, for production callers. The reference implementation
/// requires a cryptographically strong source so move selection and
/// Metropolis acceptance don't fall into deterministic stuck trajectories
/// across runs; tests should inject a seeded `rand::rngs::StdRng` instead.
pub fn new_csprng() -> rand::rngs::OsRng {
    rand::rngs::OsRng
}

/// Runs simulated annealing over one frozen [`Words`] arena against one
/// constraint set. Generic over the constraint storage so callers can pass
/// `&[Box<dyn Constraint>]` or any other slice of trait objects.
pub struct Solver<'a> {
    words: &'a Words,
    constraints: &'a [Box<dyn Constraint>],
    steps: u32,
}

impl<'a> Solver<'a> {
    pub fn new(words: &'a Words, constraints: &'a [Box<dyn Constraint>]) -> Self {
        Solver::with_steps(words, constraints, DEFAULT_STEPS)
    }

    pub fn with_steps(
        words: &'a Words,
        constraints: &'a [Box<dyn Constraint>],
        steps: u32,
    ) -> Self {
        Solver {
            words,
            constraints,
            steps,
        }
    }

    /// `(Tmin, Tmax)`: Tmin is the sum of every constraint's lower energy
    /// bound, Tmax is 0.9 times the sum of their upper bounds.
    fn calibrate(&self) -> (f64, f64) {
        let (lo_sum, hi_sum) = self
            .constraints
            .iter()
            .map(|c| c.energy_bounds(self.words))
            .fold((0.0, 0.0), |(lo_acc, hi_acc), (lo, hi)| {
                (lo_acc + lo, hi_acc + hi)
            });
        (lo_sum, hi_sum * 0.9)
    }

    /// Words with at least one proof attached; the solver never assigns
    /// anything else, so move selection is restricted to these.
    fn candidate_words(&self) -> Vec<WordId> {
        self.words
            .iter_word_ids()
            .filter(|&w| !self.words.proofs(w).is_empty())
            .collect()
    }

    /// Sum of every constraint's energy for `assignment`, plus `tmin` for
    /// every constraint whose energy is at or above its own lower bound.
    /// This penalty is deliberately preserved from the reference
    /// implementation even though its direction is backwards for
    /// constraints whose bounds are already tight (see crate-level design
    /// notes). It is not a bug in this port, it is a faithful port of one.
    fn total_energy(&self, assignment: &Assignment, tmin: f64) -> f64 {
        let mut total = 0.0;
        for constraint in self.constraints {
            let energy = constraint.energy(self.words, assignment);
            let (lo, hi) = constraint.energy_bounds(self.words);
            if energy < lo - 1e-9 || energy > hi + 1e-9 {
                let violation = ConstraintViolation::OutOfBounds {
                    constraint: constraint.name(),
                    energy,
                    lo,
                    hi,
                };
                warn!(%violation, "constraint energy outside its declared bounds");
                debug_assert!(false, "{violation}");
            }
            total += energy;
            if energy >= lo {
                total += tmin;
            }
        }
        total
    }

    fn propose_move<R: Rng>(
        &self,
        assignment: &Assignment,
        candidates: &[WordId],
        rng: &mut R,
    ) -> Option<(WordId, Option<usize>, Option<usize>)> {
        if candidates.is_empty() {
            return None;
        }
        let word = candidates[rng.gen_range(0..candidates.len())];
        let current = assignment.get(word);
        let proof_count = self.words.proofs(word).len();
        let options: Vec<Option<usize>> = (0..proof_count)
            .map(Some)
            .chain(std::iter::once(None))
            .filter(|choice| *choice != current)
            .collect();
        if options.is_empty() {
            return None;
        }
        let next = options[rng.gen_range(0..options.len())];
        Some((word, current, next))
    }

    /// Runs the full annealing schedule and returns the best (assignment,
    /// total energy) pair seen across all `steps` moves.
    pub fn anneal<R: Rng>(&self, rng: &mut R) -> (Assignment, f64) {
        let (tmin, tmax) = self.calibrate();
        let candidates = self.candidate_words();

        let mut current = Assignment::empty(self.words.len());
        let mut current_energy = self.total_energy(&current, tmin);
        let mut best = current.clone();
        let mut best_energy = current_energy;

        for step in 0..self.steps {
            let temperature = cooling_temperature(step, self.steps, tmax, tmin);
            let Some((word, previous, choice)) =
                self.propose_move(&current, &candidates, rng)
            else {
                continue;
            };

            current.set(word, choice);
            let candidate_energy = self.total_energy(&current, tmin);
            let delta = candidate_energy - current_energy;

            let accept = delta < 0.0
                || rng.gen::<f64>() < (-delta / temperature.max(f64::EPSILON)).exp();

            if accept {
                current_energy = candidate_energy;
                if current_energy < best_energy {
                    best = current.clone();
                    best_energy = current_energy;
                }
            } else {
                current.set(word, previous);
            }
        }

        trace!(best_energy, steps = self.steps, "annealing finished");
        (best, best_energy)
    }
}

/// Geometric cooling from `tmax` down to `tmin` over `steps` iterations.
fn cooling_temperature(step: u32, steps: u32, tmax: f64, tmin: f64) -> f64 {
    if steps == 0 || tmax <= 0.0 || tmin <= 0.0 {
        return tmax.max(tmin).max(f64::EPSILON);
    }
    let ratio = tmin / tmax;
    tmax * ratio.powf(step as f64 / steps as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooling_starts_at_tmax_and_ends_near_tmin() {
        assert_eq!(cooling_temperature(0, 100, 10.0, 1.0), 10.0);
        let last = cooling_temperature(99, 100, 10.0, 1.0);
        assert!(last > 1.0 && last < 2.0, "expected near tmin, got {last}");
    }

    #[test]
    fn cooling_degenerate_bounds_does_not_panic() {
        let t = cooling_temperature(5, 100, 0.0, 0.0);
        assert!(t > 0.0);
    }
}
