//! Single-compartment inert gas models.
//!
//! Every variant ingests the same time/depth samples and reports a ceiling via
//! [`Coefficients::ceiling_for`]. They differ only in how saturation is
//! advanced across the interval between two samples:
//!
//! | Variant | Integration |
//! |---|---|
//! | [`SchreinerCompartment`] | closed-form solution for a linear depth ramp |
//! | [`DiffEqCompartment`] | fixed-step Runge–Kutta on `dp/dt = k (p_alv(t) - p)` |
//! | [`ConvolutionCompartment`] | batched first-order LTI response |
//! | [`InstantaneousCompartment`] | fixed 10 s exponential ticks |
//! | [`FixedPointCompartment`] | the same ticks in scaled integers |

pub mod convolution;
pub mod diffeq;
pub mod fixed_point;
pub mod instantaneous;
pub mod schreiner;

pub use convolution::ConvolutionCompartment;
pub use diffeq::DiffEqCompartment;
pub use fixed_point::FixedPointCompartment;
pub use instantaneous::InstantaneousCompartment;
pub use schreiner::SchreinerCompartment;

use crate::coefficients::Coefficients;
use crate::error::DecoError;
use crate::profile::Sample;

/// Capability shared by every compartment variant.
pub trait TissueCompartment {
    /// Advance the model to `sample`. Time must not go backwards.
    fn add_sample(&mut self, sample: Sample) -> Result<(), DecoError>;

    /// Shallowest safe depth in metres; negative means no ceiling.
    fn ceiling(&mut self) -> f64;

    /// Time of the last ingested sample, in seconds.
    fn time_elapsed(&self) -> f64;
}

/// Selects which integration strategy a compartment set is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum CompartmentModel {
    Schreiner,
    DiffEq,
    Convolution,
    Instantaneous,
    FixedPoint,
}

impl CompartmentModel {
    pub const ALL: [CompartmentModel; 5] = [
        CompartmentModel::Schreiner,
        CompartmentModel::DiffEq,
        CompartmentModel::Convolution,
        CompartmentModel::Instantaneous,
        CompartmentModel::FixedPoint,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CompartmentModel::Schreiner => "Schreiner equation",
            CompartmentModel::DiffEq => "Differential equation",
            CompartmentModel::Convolution => "LTI system model",
            CompartmentModel::Instantaneous => "Instantaneous model",
            CompartmentModel::FixedPoint => "Integer instantaneous model",
        }
    }
}

/// A compartment of any variant.
#[derive(Debug, Clone)]
pub enum Compartment {
    Schreiner(SchreinerCompartment),
    DiffEq(DiffEqCompartment),
    Convolution(ConvolutionCompartment),
    Instantaneous(InstantaneousCompartment),
    FixedPoint(FixedPointCompartment),
}

impl Compartment {
    pub fn new(model: CompartmentModel, coefficients: Coefficients) -> Self {
        match model {
            CompartmentModel::Schreiner => {
                Compartment::Schreiner(SchreinerCompartment::new(coefficients))
            }
            CompartmentModel::DiffEq => Compartment::DiffEq(DiffEqCompartment::new(coefficients)),
            CompartmentModel::Convolution => {
                Compartment::Convolution(ConvolutionCompartment::new(coefficients))
            }
            CompartmentModel::Instantaneous => {
                Compartment::Instantaneous(InstantaneousCompartment::new(coefficients))
            }
            CompartmentModel::FixedPoint => {
                Compartment::FixedPoint(FixedPointCompartment::new(coefficients))
            }
        }
    }

    pub fn model(&self) -> CompartmentModel {
        match self {
            Compartment::Schreiner(_) => CompartmentModel::Schreiner,
            Compartment::DiffEq(_) => CompartmentModel::DiffEq,
            Compartment::Convolution(_) => CompartmentModel::Convolution,
            Compartment::Instantaneous(_) => CompartmentModel::Instantaneous,
            Compartment::FixedPoint(_) => CompartmentModel::FixedPoint,
        }
    }

    fn inner(&self) -> &dyn TissueCompartment {
        match self {
            Compartment::Schreiner(c) => c,
            Compartment::DiffEq(c) => c,
            Compartment::Convolution(c) => c,
            Compartment::Instantaneous(c) => c,
            Compartment::FixedPoint(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn TissueCompartment {
        match self {
            Compartment::Schreiner(c) => c,
            Compartment::DiffEq(c) => c,
            Compartment::Convolution(c) => c,
            Compartment::Instantaneous(c) => c,
            Compartment::FixedPoint(c) => c,
        }
    }
}

impl TissueCompartment for Compartment {
    fn add_sample(&mut self, sample: Sample) -> Result<(), DecoError> {
        self.inner_mut().add_sample(sample)
    }

    fn ceiling(&mut self) -> f64 {
        self.inner_mut().ceiling()
    }

    fn time_elapsed(&self) -> f64 {
        self.inner().time_elapsed()
    }
}

// ============================================================================
// Sample bookkeeping shared by the variants
// ============================================================================

/// Depth and time of the last ingested sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Cursor {
    pub current_depth: f64,
    pub time_elapsed: f64,
}

impl Cursor {
    /// Move to `sample`, returning the interval just covered.
    pub fn advance(&mut self, sample: Sample) -> Result<Interval, DecoError> {
        sample.check_finite()?;
        if sample.time < self.time_elapsed {
            return Err(DecoError::InvalidSampleOrder {
                previous: self.time_elapsed,
                time: sample.time,
            });
        }
        let interval = Interval {
            start_depth: self.current_depth,
            end_depth: sample.depth,
            duration: sample.time - self.time_elapsed,
        };
        self.current_depth = sample.depth;
        self.time_elapsed = sample.time;
        Ok(interval)
    }
}

/// A linear depth ramp between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Interval {
    pub start_depth: f64,
    pub end_depth: f64,
    /// Seconds; zero for an instantaneous depth change.
    pub duration: f64,
}

impl Interval {
    /// Linearly interpolated depth `t` seconds into the interval.
    pub fn depth_at(&self, t: f64) -> f64 {
        if self.duration <= 0.0 {
            return self.end_depth;
        }
        self.start_depth + (self.end_depth - self.start_depth) * t / self.duration
    }

    /// Tick start times `0, tick, 2*tick, ...` strictly inside the interval.
    pub fn ticks(&self, tick: f64) -> impl Iterator<Item = f64> {
        let duration = self.duration;
        (0..)
            .map(move |i| i as f64 * tick)
            .take_while(move |t| *t < duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::{surface_saturation, ZHL16C};
    use approx::assert_abs_diff_eq;

    fn each_model(coefficients: Coefficients) -> Vec<Compartment> {
        CompartmentModel::ALL
            .iter()
            .map(|&model| Compartment::new(model, coefficients))
            .collect()
    }

    #[test]
    fn test_cursor_rejects_time_going_backwards() {
        let mut cursor = Cursor::default();
        let interval = cursor.advance(Sample::new(60.0, 10.0)).unwrap();
        assert_eq!(interval.start_depth, 0.0);
        assert_eq!(interval.end_depth, 10.0);
        assert_eq!(interval.duration, 60.0);

        let err = cursor.advance(Sample::new(30.0, 10.0)).unwrap_err();
        assert_eq!(
            err,
            DecoError::InvalidSampleOrder {
                previous: 60.0,
                time: 30.0
            }
        );
        assert_eq!(cursor.time_elapsed, 60.0);
    }

    #[test]
    fn test_cursor_rejects_non_finite_samples() {
        let mut cursor = Cursor::default();
        for sample in [
            Sample::new(f64::NAN, 10.0),
            Sample::new(f64::INFINITY, 10.0),
            Sample::new(60.0, f64::NAN),
        ] {
            assert!(matches!(
                cursor.advance(sample),
                Err(DecoError::NonFiniteSample { .. })
            ));
        }
        assert_eq!(cursor, Cursor::default());
    }

    #[test]
    fn test_interval_interpolation() {
        let ramp = Interval {
            start_depth: 30.0,
            end_depth: 27.0,
            duration: 20.0,
        };
        assert_abs_diff_eq!(ramp.depth_at(0.0), 30.0);
        assert_abs_diff_eq!(ramp.depth_at(10.0), 28.5);
        assert_abs_diff_eq!(ramp.depth_at(20.0), 27.0);

        let jump = Interval {
            start_depth: 0.0,
            end_depth: 30.0,
            duration: 0.0,
        };
        assert_abs_diff_eq!(jump.depth_at(0.0), 30.0);
        assert_eq!(jump.ticks(10.0).count(), 0);
    }

    #[test]
    fn test_interval_ticks() {
        let interval = Interval {
            start_depth: 0.0,
            end_depth: 0.0,
            duration: 45.0,
        };
        let ticks: Vec<f64> = interval.ticks(10.0).collect();
        assert_eq!(ticks, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_fresh_compartments_report_surface_ceiling() {
        let coefficients = ZHL16C.compartments[15];
        let expected = coefficients.ceiling_for(surface_saturation());
        for mut compartment in each_model(coefficients) {
            assert_abs_diff_eq!(compartment.ceiling(), expected, epsilon = 1e-3);
            assert_eq!(compartment.time_elapsed(), 0.0);
        }
    }

    #[test]
    fn test_every_variant_rejects_out_of_order_samples() {
        for mut compartment in each_model(ZHL16C.compartments[0]) {
            compartment.add_sample(Sample::new(600.0, 20.0)).unwrap();
            let err = compartment.add_sample(Sample::new(300.0, 20.0)).unwrap_err();
            assert!(
                matches!(err, DecoError::InvalidSampleOrder { .. }),
                "{:?} accepted a sample from the past",
                compartment.model()
            );
        }
    }

    #[test]
    fn test_variants_agree_on_a_square_profile() {
        let coefficients = ZHL16C.compartments[1];
        let mut reference = Compartment::new(CompartmentModel::Schreiner, coefficients);
        let samples = [
            Sample::new(0.0, 30.0),
            Sample::new(1200.0, 30.0),
            Sample::new(1400.0, 0.0),
        ];
        for sample in samples {
            reference.add_sample(sample).unwrap();
        }
        let expected = reference.ceiling();

        for mut compartment in each_model(coefficients) {
            for sample in samples {
                compartment.add_sample(sample).unwrap();
            }
            // The stepped variants sample at the start of each tick.
            assert_abs_diff_eq!(compartment.ceiling(), expected, epsilon = 0.5);
        }
    }
}
