//! Sources: user configuration and the per-worker runtime value.

use crate::activity::{EventInfo, SourceActivityModel, NEGLIGIBLE_YIELD};
use crate::error::ConfigError;
use crate::intervals::RunIntervalTable;
use beamtime_env::RunInterval;
use rand::Rng;
use serde::{Deserialize, Serialize};

fn default_particle() -> String {
    "gamma".to_string()
}

/// User-facing source description, as read from the configuration file.
///
/// Exactly one emission law must come out of `n`, `activity` and
/// `half_life`:
/// - `n` alone: fixed count
/// - `activity` alone: constant activity
/// - `activity` + `half_life`: decaying activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    
    /// Particle kind, opaque to the scheduler
    #[serde(default = "default_particle")]
    pub particle: String,
    
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,
    
    /// Emissions per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<f64>,
    
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_life: Option<f64>,
    
    /// Defaults to the first interval's begin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    
    /// Defaults to the last interval's end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

impl SourceConfig {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            particle: default_particle(),
            n: None,
            activity: None,
            half_life: None,
            start_time: None,
            end_time: None,
        }
    }
    
    /// A source emitting exactly `n` primaries.
    pub fn fixed_count(name: &str, n: u64) -> Self {
        Self { n: Some(n), ..Self::named(name) }
    }
    
    /// A source with constant activity (Bq).
    pub fn constant(name: &str, activity: f64) -> Self {
        Self { activity: Some(activity), ..Self::named(name) }
    }
    
    /// A radioactive source with initial activity (Bq) and half-life (s).
    pub fn decaying(name: &str, activity: f64, half_life: f64) -> Self {
        Self {
            activity: Some(activity),
            half_life: Some(half_life),
            ..Self::named(name)
        }
    }
    
    pub fn with_particle(mut self, particle: &str) -> Self {
        self.particle = particle.to_string();
        self
    }
    
    pub fn with_start_time(mut self, t: f64) -> Self {
        self.start_time = Some(t);
        self
    }
    
    pub fn with_end_time(mut self, t: f64) -> Self {
        self.end_time = Some(t);
        self
    }
    
    /// Resolves the emission law, failing fast on inconsistent fields.
    pub fn activity_model(&self) -> Result<SourceActivityModel, ConfigError> {
        let name = || self.name.clone();
        let n = self.n.unwrap_or(0);
        
        if let Some(activity) = self.activity {
            if !activity.is_finite() || activity < 0.0 {
                return Err(ConfigError::InvalidActivity { source_name: name(), value: activity });
            }
        }
        let activity = self.activity.unwrap_or(0.0);
        
        if n > 0 && activity > 0.0 {
            return Err(ConfigError::ConflictingLaws {
                source_name: name(),
                reason: "n and activity are both set".to_string(),
            });
        }
        
        if let Some(half_life) = self.half_life {
            if !half_life.is_finite() || half_life <= 0.0 {
                return Err(ConfigError::InvalidHalfLife { source_name: name(), value: half_life });
            }
            if n > 0 {
                return Err(ConfigError::ConflictingLaws {
                    source_name: name(),
                    reason: "half_life requires an activity, not n".to_string(),
                });
            }
        }
        
        match (n, activity > 0.0, self.half_life) {
            (0, false, _) => Err(ConfigError::NoEmissionLaw { source_name: name() }),
            (total, false, _) => Ok(SourceActivityModel::FixedCount { total }),
            (_, true, None) => Ok(SourceActivityModel::ConstantActivity { activity }),
            (_, true, Some(half_life)) => Ok(SourceActivityModel::decaying(activity, half_life)),
        }
    }
    
    /// Resolves `start_time`/`end_time` against the interval table.
    pub fn time_window(&self, table: &RunIntervalTable) -> (f64, f64) {
        (
            self.start_time.unwrap_or_else(|| table.first_begin()),
            self.end_time.unwrap_or_else(|| table.last_end()),
        )
    }
}

impl SourceActivityModel {
    /// This worker's share of the law when `workers` replicas run in parallel.
    ///
    /// Activities are divided evenly. Fixed counts are split so that the
    /// shares sum to the configured total, the remainder going to the
    /// lowest worker indices.
    pub fn for_worker(&self, worker: usize, workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 || worker >= workers {
            return Err(ConfigError::InvalidWorker { worker, workers });
        }
        let k = workers as u64;
        Ok(match *self {
            Self::FixedCount { total } => {
                let extra = u64::from((worker as u64) < total % k);
                Self::FixedCount { total: total / k + extra }
            }
            Self::ConstantActivity { activity } => Self::ConstantActivity {
                activity: activity / workers as f64,
            },
            Self::DecayingActivity { activity, decay_constant } => Self::DecayingActivity {
                activity: activity / workers as f64,
                decay_constant,
            },
        })
    }
}

/// A source as owned by one worker's scheduler.
///
/// Configuration is immutable; the only moving parts are the sequence
/// counter and the cached candidate, both advanced by
/// [`Source::consume_next_event`] and [`Source::begin_interval`].
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    particle: String,
    model: SourceActivityModel,
    start_time: f64,
    end_time: f64,
    
    /// Id of the next emission, equal to the number already emitted
    event_sequence_id: u64,
    
    /// Pre-drawn time of the next emission
    pending_time: f64,
    
    /// This worker's share of `NEGLIGIBLE_YIELD`
    negligible_yield: f64,
}

impl Source {
    /// Builds a source from an already resolved law and time window.
    pub fn new(
        name: &str,
        particle: &str,
        model: SourceActivityModel,
        start_time: f64,
        end_time: f64,
    ) -> Result<Self, ConfigError> {
        if !start_time.is_finite() || !end_time.is_finite() || start_time >= end_time {
            return Err(ConfigError::EmptyTimeWindow {
                source_name: name.to_string(),
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            name: name.to_string(),
            particle: particle.to_string(),
            model,
            start_time,
            end_time,
            event_sequence_id: 0,
            pending_time: f64::INFINITY,
            negligible_yield: NEGLIGIBLE_YIELD,
        })
    }
    
    /// Validates `config` and builds the source for a single-worker run.
    pub fn from_config(config: &SourceConfig, table: &RunIntervalTable) -> Result<Self, ConfigError> {
        Self::for_worker(config, table, 0, 1)
    }
    
    /// Validates `config` and builds this worker's share of the source.
    pub fn for_worker(
        config: &SourceConfig,
        table: &RunIntervalTable,
        worker: usize,
        workers: usize,
    ) -> Result<Self, ConfigError> {
        let model = config.activity_model()?.for_worker(worker, workers)?;
        let (start, end) = config.time_window(table);
        let mut source = Self::new(&config.name, &config.particle, model, start, end)?;
        // The yield is split across workers, so the cut-off is too
        source.negligible_yield = NEGLIGIBLE_YIELD / workers as f64;
        Ok(source)
    }
    
    pub fn name(&self) -> &str {
        &self.name
    }
    
    pub fn particle(&self) -> &str {
        &self.particle
    }
    
    pub fn model(&self) -> &SourceActivityModel {
        &self.model
    }
    
    pub fn start_time(&self) -> f64 {
        self.start_time
    }
    
    pub fn end_time(&self) -> f64 {
        self.end_time
    }
    
    /// Number of events emitted so far.
    pub fn emitted(&self) -> u64 {
        self.event_sequence_id
    }
    
    /// Expected emissions left between `t` and the source's end time.
    pub fn expected_remaining(&self, t: f64) -> f64 {
        let from = t.max(self.start_time);
        self.model
            .expected_events(from, self.end_time, self.start_time, self.event_sequence_id)
    }
    
    /// Time and id of the next emission. Does not change the source.
    pub fn next_event_info(&self, current_time: f64) -> EventInfo {
        if self.is_terminated(current_time) || self.pending_time >= self.end_time {
            return EventInfo::none(self.event_sequence_id);
        }
        EventInfo {
            time: self.pending_time,
            event_id: self.event_sequence_id,
        }
    }
    
    /// True once the source can never emit again.
    ///
    /// Monotonic in `current_time`: the clock never runs backwards, counts
    /// only grow and a decaying yield only shrinks.
    pub fn is_terminated(&self, current_time: f64) -> bool {
        if current_time >= self.end_time {
            return true;
        }
        match self.model {
            SourceActivityModel::FixedCount { total } => self.event_sequence_id >= total,
            SourceActivityModel::ConstantActivity { .. } => false,
            SourceActivityModel::DecayingActivity { .. } => {
                self.expected_remaining(current_time) < self.negligible_yield
            }
        }
    }
    
    /// Commits the pending emission and draws the one after it.
    ///
    /// Only the scheduler calls this, once per emitted event, after it has
    /// chosen this source.
    pub fn consume_next_event<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let emitted_at = self.pending_time;
        self.event_sequence_id += 1;
        self.pending_time = self.draw_from(emitted_at, rng);
    }
    
    /// Re-arms the source for a newly opened interval.
    ///
    /// Candidates drawn in the previous interval may fall in the gap or past
    /// the new begin; activity laws are memoryless so the candidate is simply
    /// drawn again from the earliest live instant.
    pub fn begin_interval<R: Rng + ?Sized>(&mut self, interval: RunInterval, current_time: f64, rng: &mut R) {
        let t0 = self.start_time.max(interval.begin).max(current_time);
        self.pending_time = self.draw_from(t0, rng);
    }
    
    fn draw_from<R: Rng + ?Sized>(&self, t0: f64, rng: &mut R) -> f64 {
        if t0 >= self.end_time {
            return f64::INFINITY;
        }
        self.model.draw_next(t0, self.start_time, rng)
    }
}
