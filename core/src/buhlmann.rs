//! Bühlmann 16-compartment tissue set.
//!
//! A [`CompartmentSet`] holds one compartment per coefficient tuple, all of the
//! same [`CompartmentModel`] variant, and feeds each of them every sample. The
//! governing ceiling is the deepest (most conservative) member ceiling.

use log::debug;

use crate::coefficients::CoefficientTable;
use crate::compartment::{Compartment, CompartmentModel, TissueCompartment};
use crate::error::DecoError;
use crate::profile::{DepthProfile, Sample};

// ============================================================================
// Tissue Set
// ============================================================================

/// State of all tissue compartments for one model variant.
#[derive(Debug, Clone)]
pub struct CompartmentSet {
    model: CompartmentModel,
    compartments: Vec<Compartment>,
}

impl CompartmentSet {
    /// Fresh compartments at surface equilibrium.
    ///
    /// For [`CompartmentModel::FixedPoint`], entries whose half-time matches a
    /// ZHL-16C compartment use the ZHL-16C integer `a` and `b`; see
    /// [`FixedPointCompartment::new`](crate::compartment::FixedPointCompartment::new).
    pub fn new(model: CompartmentModel, table: &CoefficientTable) -> Self {
        let compartments = table
            .iter()
            .map(|&coefficients| Compartment::new(model, coefficients))
            .collect();
        Self {
            model,
            compartments,
        }
    }

    /// Fresh set with every non-origin sample of `profile` replayed into it.
    pub fn replay(
        model: CompartmentModel,
        table: &CoefficientTable,
        profile: &DepthProfile,
    ) -> Result<Self, DecoError> {
        let mut set = Self::new(model, table);
        for sample in profile.iter().filter(|s| !s.is_origin()) {
            set.feed(*sample)?;
        }
        debug!(
            "replayed {} samples of '{}' into {:?} compartments",
            profile.len(),
            profile.label(),
            model
        );
        Ok(set)
    }

    pub fn model(&self) -> CompartmentModel {
        self.model
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    /// Forward a sample to every compartment.
    pub fn feed(&mut self, sample: Sample) -> Result<(), DecoError> {
        for compartment in &mut self.compartments {
            compartment.add_sample(sample)?;
        }
        Ok(())
    }

    /// Deepest ceiling across all compartments.
    pub fn ceiling(&mut self) -> f64 {
        self.ceiling_and_leading().0
    }

    /// Deepest ceiling and the index of the compartment that sets it.
    ///
    /// A NaN member ceiling is returned as is rather than skipped.
    pub fn ceiling_and_leading(&mut self) -> (f64, usize) {
        let mut max_ceiling = f64::NEG_INFINITY;
        let mut leading = 0;
        for (i, compartment) in self.compartments.iter_mut().enumerate() {
            let ceiling = compartment.ceiling();
            if ceiling.is_nan() {
                return (ceiling, i);
            }
            if ceiling > max_ceiling {
                max_ceiling = ceiling;
                leading = i;
            }
        }
        (max_ceiling, leading)
    }

    /// Time of the last sample fed to the set, in seconds.
    pub fn time_elapsed(&self) -> f64 {
        self.compartments
            .first()
            .map(|c| c.time_elapsed())
            .unwrap_or(0.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::{surface_saturation, ZHL16C};
    use approx::assert_abs_diff_eq;

    fn square_profile(depth: f64, minutes: f64) -> DepthProfile {
        DepthProfile::from_samples("square", [(0.0, depth), (minutes * 60.0, depth)]).unwrap()
    }

    #[test]
    fn test_surface_ceiling_is_set_by_slowest_compartment() {
        for model in CompartmentModel::ALL {
            let mut set = CompartmentSet::new(model, &ZHL16C);
            assert_eq!(set.len(), 16);
            let expected = ZHL16C
                .iter()
                .map(|c| c.ceiling_for(surface_saturation()))
                .fold(f64::NEG_INFINITY, f64::max);
            let (ceiling, leading) = set.ceiling_and_leading();
            assert_abs_diff_eq!(ceiling, expected, epsilon = 1e-3);
            assert_eq!(leading, 15, "{model:?}");
        }
    }

    #[test]
    fn test_replay_skips_origin() {
        let profile =
            DepthProfile::from_samples("origin", [(0.0, 0.0), (0.0, 30.0), (600.0, 30.0)]).unwrap();
        let mut with_origin =
            CompartmentSet::replay(CompartmentModel::Schreiner, &ZHL16C, &profile).unwrap();
        let mut without = CompartmentSet::replay(
            CompartmentModel::Schreiner,
            &ZHL16C,
            &square_profile(30.0, 10.0),
        )
        .unwrap();
        assert_eq!(with_origin.ceiling(), without.ceiling());
        assert_eq!(with_origin.time_elapsed(), 600.0);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let profile = square_profile(30.0, 20.0);
        for model in CompartmentModel::ALL {
            let mut first = CompartmentSet::replay(model, &ZHL16C, &profile).unwrap();
            let mut second = CompartmentSet::replay(model, &ZHL16C, &profile).unwrap();
            assert_eq!(first.ceiling(), second.ceiling(), "{model:?}");
        }
    }

    #[test]
    fn test_ceiling_rises_during_descent_and_bottom_time() {
        for model in CompartmentModel::ALL {
            let mut set = CompartmentSet::new(model, &ZHL16C);
            let mut previous = set.ceiling();
            for minute in 1..=30 {
                let depth = (minute as f64 * 10.0).min(40.0);
                set.feed(Sample::new(minute as f64 * 60.0, depth)).unwrap();
                let ceiling = set.ceiling();
                assert!(
                    ceiling >= previous - 1e-9,
                    "{model:?}: ceiling fell from {previous} to {ceiling} at minute {minute}"
                );
                previous = ceiling;
            }
            assert!(previous > 0.0, "{model:?}: 40m for 26 minutes should need a stop");
        }
    }

    #[test]
    fn test_nan_member_ceiling_is_not_skipped() {
        use crate::compartment::SchreinerCompartment;

        let mut set = CompartmentSet::new(CompartmentModel::Schreiner, &ZHL16C);
        set.compartments[4] = Compartment::Schreiner(SchreinerCompartment::with_loading(
            ZHL16C.compartments[4],
            f64::NAN,
        ));
        let (ceiling, leading) = set.ceiling_and_leading();
        assert!(ceiling.is_nan());
        assert_eq!(leading, 4);
    }

    #[test]
    fn test_feed_rejects_non_finite_samples() {
        let mut set = CompartmentSet::new(CompartmentModel::Schreiner, &ZHL16C);
        assert!(matches!(
            set.feed(Sample::new(f64::NAN, 30.0)),
            Err(DecoError::NonFiniteSample { .. })
        ));
        assert!(set.ceiling() < 0.0);
    }

    #[test]
    fn test_feed_propagates_order_errors() {
        let mut set = CompartmentSet::new(CompartmentModel::Instantaneous, &ZHL16C);
        set.feed(Sample::new(120.0, 18.0)).unwrap();
        assert!(matches!(
            set.feed(Sample::new(60.0, 18.0)),
            Err(DecoError::InvalidSampleOrder { .. })
        ));
    }
}
