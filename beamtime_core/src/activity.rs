//! Per-source emission laws.
//!
//! A closed set of laws, chosen once when the source is built:
//! - **FixedCount**: exactly `n` primaries, all at the earliest live instant
//! - **ConstantActivity**: Poisson process with rate `A` (Bq)
//! - **DecayingActivity**: Poisson process whose rate halves every half-life
//!
//! Laws are stateless. The per-source counters and the cached candidate
//! live in [`crate::Source`].

use rand::Rng;
use rand_distr::{Distribution, Exp1};
use serde::{Deserialize, Serialize};

/// Below this many expected remaining emissions a decaying source is
/// considered exhausted.
pub const NEGLIGIBLE_YIELD: f64 = 1e-3;

/// Candidate answer of a source to "when is your next emission?".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventInfo {
    /// Time of the next emission, `f64::INFINITY` if there is none
    pub time: f64,
    
    /// Sequence id the emission will carry
    pub event_id: u64,
}

impl EventInfo {
    /// Candidate meaning "nothing to emit".
    pub fn none(event_id: u64) -> Self {
        Self {
            time: f64::INFINITY,
            event_id,
        }
    }
    
    /// True when the candidate names a real emission.
    pub fn is_some(&self) -> bool {
        self.time.is_finite()
    }
}

/// Temporal emission law of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceActivityModel {
    /// Exactly `total` emissions
    FixedCount { total: u64 },
    
    /// Constant rate, emissions per second
    ConstantActivity { activity: f64 },
    
    /// `activity` at the source start time, decaying with `decay_constant` = ln 2 / half-life
    DecayingActivity { activity: f64, decay_constant: f64 },
}

impl SourceActivityModel {
    /// Builds a decaying law from its half-life.
    pub fn decaying(activity: f64, half_life: f64) -> Self {
        Self::DecayingActivity {
            activity,
            decay_constant: std::f64::consts::LN_2 / half_life,
        }
    }
    
    /// Emission rate at time `t` for a source starting at `start_time`.
    ///
    /// Fixed-count sources have no rate and report zero.
    pub fn rate_at(&self, t: f64, start_time: f64) -> f64 {
        match *self {
            Self::FixedCount { .. } => 0.0,
            Self::ConstantActivity { activity } => activity,
            Self::DecayingActivity { activity, decay_constant } => {
                activity * (-decay_constant * (t - start_time)).exp()
            }
        }
    }
    
    /// Expected number of emissions in `[t0, t1)`.
    ///
    /// `emitted` only matters for fixed-count laws, which report what is
    /// left of their budget regardless of the window.
    pub fn expected_events(&self, t0: f64, t1: f64, start_time: f64, emitted: u64) -> f64 {
        if t1 <= t0 {
            return 0.0;
        }
        match *self {
            Self::FixedCount { total } => total.saturating_sub(emitted) as f64,
            Self::ConstantActivity { activity } => activity * (t1 - t0),
            Self::DecayingActivity { decay_constant, .. } => {
                let rate = self.rate_at(t0, start_time);
                rate * -(-decay_constant * (t1 - t0)).exp_m1() / decay_constant
            }
        }
    }
    
    /// Draws the next emission time strictly after (or, for fixed counts, at) `t0`.
    ///
    /// Returns `f64::INFINITY` when the law will never fire again.
    pub fn draw_next<R: Rng + ?Sized>(&self, t0: f64, start_time: f64, rng: &mut R) -> f64 {
        match *self {
            Self::FixedCount { .. } => t0,
            Self::ConstantActivity { activity } => {
                let u: f64 = Exp1.sample(rng);
                t0 + u / activity
            }
            Self::DecayingActivity { decay_constant, .. } => {
                // Invert the integrated rate: A(t0)/λ · (1 - e^{-λΔ}) = u
                let rate = self.rate_at(t0, start_time);
                if rate <= 0.0 {
                    return f64::INFINITY;
                }
                let u: f64 = Exp1.sample(rng);
                let x = u * decay_constant / rate;
                if x >= 1.0 {
                    f64::INFINITY
                } else {
                    t0 - (-x).ln_1p() / decay_constant
                }
            }
        }
    }
    
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FixedCount { .. } => "fixed_count",
            Self::ConstantActivity { .. } => "constant",
            Self::DecayingActivity { .. } => "decaying",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    
    #[test]
    fn test_decay_constant_from_half_life() {
        let model = SourceActivityModel::decaying(100.0, 2.0);
        
        assert_relative_eq!(model.rate_at(0.0, 0.0), 100.0);
        assert_relative_eq!(model.rate_at(2.0, 0.0), 50.0, epsilon = 1e-9);
        assert_relative_eq!(model.rate_at(6.0, 2.0), 25.0, epsilon = 1e-9);
    }
    
    #[test]
    fn test_expected_events_per_law() {
        let constant = SourceActivityModel::ConstantActivity { activity: 3.0 };
        assert_relative_eq!(constant.expected_events(1.0, 5.0, 0.0, 0), 12.0);
        
        // Full decay integral: A0 / λ = A0 · H / ln 2
        let decaying = SourceActivityModel::decaying(10.0, 1.0);
        assert_relative_eq!(
            decaying.expected_events(0.0, 1e6, 0.0, 0),
            10.0 / std::f64::consts::LN_2,
            epsilon = 1e-9
        );
        // One half-life yields half of the total
        assert_relative_eq!(
            decaying.expected_events(0.0, 1.0, 0.0, 0),
            5.0 / std::f64::consts::LN_2,
            epsilon = 1e-9
        );
        
        let fixed = SourceActivityModel::FixedCount { total: 7 };
        assert_eq!(fixed.expected_events(0.0, 1.0, 0.0, 3), 4.0);
        assert_eq!(fixed.expected_events(0.0, 1.0, 0.0, 9), 0.0);
        assert_eq!(fixed.expected_events(1.0, 1.0, 0.0, 0), 0.0);
    }
    
    #[test]
    fn test_fixed_count_fires_immediately() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let fixed = SourceActivityModel::FixedCount { total: 2 };
        assert_eq!(fixed.draw_next(4.5, 0.0, &mut rng), 4.5);
    }
    
    #[test]
    fn test_constant_draws_average_to_rate() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let model = SourceActivityModel::ConstantActivity { activity: 4.0 };
        
        let draws = 20_000;
        let mean: f64 = (0..draws)
            .map(|_| model.draw_next(0.0, 0.0, &mut rng))
            .sum::<f64>()
            / draws as f64;
        
        assert_relative_eq!(mean, 0.25, epsilon = 0.01);
    }
    
    #[test]
    fn test_decaying_draws_are_after_t0() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let model = SourceActivityModel::decaying(50.0, 1.0);
        
        for _ in 0..1000 {
            let t = model.draw_next(3.0, 0.0, &mut rng);
            assert!(t > 3.0);
        }
    }
    
    #[test]
    fn test_decaying_law_runs_dry() {
        // A(t0)/λ is tiny: almost every draw exceeds the remaining integral
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let model = SourceActivityModel::decaying(1.0, 0.001);
        
        let never = (0..100)
            .filter(|_| model.draw_next(1.0, 0.0, &mut rng).is_infinite())
            .count();
        assert_eq!(never, 100);
    }
    
    #[test]
    fn test_event_info_none() {
        let info = EventInfo::none(4);
        assert!(!info.is_some());
        assert_eq!(info.event_id, 4);
    }
}
