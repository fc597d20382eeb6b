//! Decompression scheduling.
//!
//! The scheduler walks a [`DepthProfile`] forward from its last sample,
//! appending ascent and stop samples so the diver never rises above the
//! ceiling of a [`CompartmentSet`], until the profile reaches the surface.
//!
//! With [`ReplayPolicy::Full`] every appended sample rebuilds the set from
//! scratch and replays the whole profile, so an `n`-sample schedule costs
//! O(n²) compartment updates. [`ReplayPolicy::Incremental`] feeds only the new
//! sample into the live set.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::buhlmann::CompartmentSet;
use crate::coefficients::CoefficientTable;
use crate::compartment::CompartmentModel;
use crate::error::DecoError;
use crate::profile::{DepthProfile, Sample};

// ============================================================================
// Configuration
// ============================================================================

/// Default ascent rate (m/min).
pub const DEFAULT_ASCENT_RATE: f64 = 9.0;

/// Default depth step per ascent sample (m).
pub const DEFAULT_INCREMENT: f64 = 3.0;

/// Default time between samples during a stop (min).
pub const DEFAULT_STOP_RESOLUTION: f64 = 1.0;

/// Default spacing of the stop-depth grid (m).
pub const DEFAULT_STOP_GRANULARITY: f64 = 3.0;

/// Default upper bound on a single stop (min).
pub const DEFAULT_MAX_STOP_MINUTES: f64 = 720.0;

/// Depths closer than this to a grid line count as on it.
const GRID_EPSILON: f64 = 1e-9;

/// How the compartment set is brought up to date after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Rebuild the set and replay the entire profile.
    #[default]
    Full,
    /// Feed only the appended sample into the existing set.
    Incremental,
}

/// Tunable scheduling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoConfig {
    /// Ascent speed between stops, metres per minute.
    pub ascent_rate: f64,
    /// Depth change per ascent sample, metres.
    pub increment: f64,
    /// Interval between samples while holding a stop, minutes.
    pub stop_resolution: f64,
    /// Stops are snapped to multiples of this depth, metres.
    pub stop_granularity: f64,
    /// A stop longer than this fails with [`DecoError::ScheduleDivergence`].
    pub max_stop_minutes: f64,
    pub replay: ReplayPolicy,
}

impl Default for DecoConfig {
    fn default() -> Self {
        Self {
            ascent_rate: DEFAULT_ASCENT_RATE,
            increment: DEFAULT_INCREMENT,
            stop_resolution: DEFAULT_STOP_RESOLUTION,
            stop_granularity: DEFAULT_STOP_GRANULARITY,
            max_stop_minutes: DEFAULT_MAX_STOP_MINUTES,
            replay: ReplayPolicy::default(),
        }
    }
}

impl DecoConfig {
    /// Reject non-positive or non-finite parameters.
    pub fn validate(&self) -> Result<(), DecoError> {
        let fields = [
            ("ascent_rate", self.ascent_rate),
            ("increment", self.increment),
            ("stop_resolution", self.stop_resolution),
            ("stop_granularity", self.stop_granularity),
            ("max_stop_minutes", self.max_stop_minutes),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(DecoError::InvalidConfig {
                    field: field.to_string(),
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Schedule output
// ============================================================================

/// A hold at constant depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoStop {
    /// Metres.
    pub depth: f64,
    /// Minutes.
    pub duration: f64,
}

/// Stops produced by one scheduler run.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoSchedule {
    pub label: String,
    pub model: CompartmentModel,
    pub stops: Vec<DecoStop>,
    /// Wall-clock time spent scheduling; diagnostic only.
    pub computation: Duration,
}

impl DecoSchedule {
    pub fn total_stop_minutes(&self) -> f64 {
        self.stops.iter().map(|s| s.duration).sum()
    }

    pub fn requires_stops(&self) -> bool {
        !self.stops.is_empty()
    }
}

impl fmt::Display for DecoSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "------")?;
        writeln!(
            f,
            "{} modeled in {:.2} milliseconds",
            self.label,
            self.computation.as_secs_f64() * 1000.0
        )?;
        writeln!(f)?;
        writeln!(f, "DECO STOPS:")?;
        for stop in &self.stops {
            let minutes = stop.duration.trunc();
            writeln!(f, "\t {minutes:.0} minutes at {:.1} meters", stop.depth)?;
        }
        writeln!(f, "------")?;
        writeln!(f)
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Phase of a scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Ascending,
    Stopping,
    Surfaced,
}

/// Extends a profile with the ascent and stops its tissue loading requires.
#[derive(Debug)]
pub struct DecoScheduler<'a> {
    profile: &'a mut DepthProfile,
    table: &'a CoefficientTable,
    config: DecoConfig,
    compartments: CompartmentSet,
    stops: Vec<DecoStop>,
    state: SchedulerState,
}

impl<'a> DecoScheduler<'a> {
    /// Replay `profile` and check that its last sample is not already above
    /// the ceiling.
    pub fn new(
        profile: &'a mut DepthProfile,
        model: CompartmentModel,
        table: &'a CoefficientTable,
        config: DecoConfig,
    ) -> Result<Self, DecoError> {
        config.validate()?;
        let compartments = CompartmentSet::replay(model, table, profile)?;
        let state = if profile.last().depth > 0.0 {
            SchedulerState::Ascending
        } else {
            SchedulerState::Surfaced
        };
        let mut scheduler = Self {
            profile,
            table,
            config,
            compartments,
            stops: Vec::new(),
            state,
        };
        scheduler.check_violation()?;
        Ok(scheduler)
    }

    pub fn model(&self) -> CompartmentModel {
        self.compartments.model()
    }

    pub fn profile(&self) -> &DepthProfile {
        &*self.profile
    }

    pub fn config(&self) -> &DecoConfig {
        &self.config
    }

    pub fn stops(&self) -> &[DecoStop] {
        &self.stops
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Current governing ceiling in metres.
    pub fn ceiling(&mut self) -> f64 {
        self.compartments.ceiling()
    }

    /// Append samples until the profile reaches the surface.
    pub fn run_schedule(&mut self) -> Result<DecoSchedule, DecoError> {
        let started = Instant::now();

        self.ascend_to_grid()?;
        while self.current().depth > 0.0 {
            self.state = SchedulerState::Ascending;
            self.ascend()?;
            self.state = SchedulerState::Stopping;
            self.hold_stop()?;
        }
        self.state = SchedulerState::Surfaced;

        let schedule = DecoSchedule {
            label: self.profile.label().to_string(),
            model: self.model(),
            stops: self.stops.clone(),
            computation: started.elapsed(),
        };
        info!(
            "'{}' surfaced after {} stops totalling {} minutes",
            schedule.label,
            schedule.stops.len(),
            schedule.total_stop_minutes()
        );
        Ok(schedule)
    }

    fn current(&self) -> Sample {
        self.profile.last()
    }

    /// Append a sample and bring the compartments up to date with it.
    fn append(&mut self, time: f64, depth: f64) -> Result<(), DecoError> {
        self.profile.add_sample(time, depth)?;
        self.refresh()
    }

    fn refresh(&mut self) -> Result<(), DecoError> {
        match self.config.replay {
            ReplayPolicy::Full => {
                self.compartments =
                    CompartmentSet::replay(self.compartments.model(), self.table, &*self.profile)?;
            }
            ReplayPolicy::Incremental => {
                let sample = self.current();
                if !sample.is_origin() {
                    self.compartments.feed(sample)?;
                }
            }
        }
        self.check_violation()
    }

    fn check_violation(&mut self) -> Result<(), DecoError> {
        let depth = self.current().depth;
        let ceiling = self.ceiling();
        if ceiling.is_nan() || depth < ceiling {
            warn!(
                "'{}' is at {depth:.1}m, above the {ceiling:.1}m ceiling",
                self.profile.label()
            );
            return Err(DecoError::CeilingViolation { depth, ceiling });
        }
        Ok(())
    }

    fn ascent_time(&self, from: f64, to: f64) -> f64 {
        60.0 * (from - to) / self.config.ascent_rate
    }

    /// Rise to the next shallower grid depth if that does not cross the ceiling.
    fn ascend_to_grid(&mut self) -> Result<(), DecoError> {
        let current = self.current();
        let granularity = self.config.stop_granularity;
        let remainder = current.depth % granularity;
        if remainder < GRID_EPSILON || granularity - remainder < GRID_EPSILON {
            return Ok(());
        }
        let next_depth = current.depth - remainder;
        if next_depth < self.ceiling() {
            return Ok(());
        }
        let next_time = current.time + self.ascent_time(current.depth, next_depth);
        debug!("snapping from {:.1}m to {next_depth:.1}m", current.depth);
        self.append(next_time, next_depth)
    }

    /// Step upwards while the ceiling stays at least one increment shallower.
    fn ascend(&mut self) -> Result<(), DecoError> {
        let mut current = self.current();
        while current.depth > 0.0 && self.ceiling() < current.depth - self.config.increment {
            let next_depth = (current.depth - self.config.increment).max(0.0);
            let next_time = current.time + self.ascent_time(current.depth, next_depth);
            self.append(next_time, next_depth)?;
            current = Sample::new(next_time, next_depth);
        }
        Ok(())
    }

    /// Hold the current depth until ascending one more increment is safe.
    fn hold_stop(&mut self) -> Result<(), DecoError> {
        let start = self.current();
        if start.depth <= 0.0 {
            return Ok(());
        }

        let mut time = start.time;
        while self.ceiling() >= start.depth - self.config.increment {
            let minutes = (time - start.time) / 60.0;
            if minutes >= self.config.max_stop_minutes {
                warn!(
                    "stop at {:.1}m on '{}' has not cleared after {minutes:.0} minutes",
                    start.depth,
                    self.profile.label()
                );
                return Err(DecoError::ScheduleDivergence {
                    depth: start.depth,
                    minutes,
                });
            }
            time += self.config.stop_resolution * 60.0;
            self.append(time, start.depth)?;
        }

        let duration = (time - start.time) / 60.0;
        if duration > 0.0 {
            debug!("stop of {duration} minutes at {:.1}m", start.depth);
            self.stops.push(DecoStop {
                depth: start.depth,
                duration,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Multi-model runs
// ============================================================================

/// Schedule an independent copy of `profile` for each model, one thread each.
///
/// Each copy is labelled `"<label> (<model name>)"`. Results come back in the
/// order of `models`.
pub fn plan_models(
    profile: &DepthProfile,
    models: &[CompartmentModel],
    table: &CoefficientTable,
    config: &DecoConfig,
) -> Vec<(DepthProfile, Result<DecoSchedule, DecoError>)> {
    thread::scope(|scope| {
        let handles: Vec<_> = models
            .iter()
            .map(|&model| {
                let mut run = profile.duplicate_as(model.display_name());
                let config = config.clone();
                scope.spawn(move || {
                    let result = DecoScheduler::new(&mut run, model, table, config)
                        .and_then(|mut scheduler| scheduler.run_schedule());
                    (run, result)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}
