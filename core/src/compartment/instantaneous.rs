//! Compartment advanced in fixed exponential ticks.

use crate::coefficients::{alveolar_pressure, surface_saturation, Coefficients};
use crate::error::DecoError;
use crate::profile::Sample;

use super::{Cursor, TissueCompartment};

/// Default tick length (seconds).
pub const DEFAULT_TICK: f64 = 10.0;

/// Applies `p += factor * (p_alv - p)` once per tick, reading the depth at the
/// start of each tick.
#[derive(Debug, Clone)]
pub struct InstantaneousCompartment {
    coefficients: Coefficients,
    cursor: Cursor,
    p_sat: f64,
    tick: f64,
    factor: f64,
}

impl InstantaneousCompartment {
    pub fn new(coefficients: Coefficients) -> Self {
        Self::with_tick(coefficients, DEFAULT_TICK)
    }

    pub fn with_tick(coefficients: Coefficients, tick: f64) -> Self {
        Self {
            coefficients,
            cursor: Cursor::default(),
            p_sat: surface_saturation(),
            tick,
            factor: 1.0 - (-tick * coefficients.k_per_second()).exp(),
        }
    }

    pub fn saturation(&self) -> f64 {
        self.p_sat
    }
}

impl TissueCompartment for InstantaneousCompartment {
    fn add_sample(&mut self, sample: Sample) -> Result<(), DecoError> {
        let interval = self.cursor.advance(sample)?;
        for t in interval.ticks(self.tick) {
            let p_alv = alveolar_pressure(interval.depth_at(t));
            self.p_sat += self.factor * (p_alv - self.p_sat);
        }
        Ok(())
    }

    fn ceiling(&mut self) -> f64 {
        self.coefficients.ceiling_for(self.p_sat)
    }

    fn time_elapsed(&self) -> f64 {
        self.cursor.time_elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::ZHL16C;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_depth_is_exact_on_tick_boundaries() {
        let coefficients = ZHL16C.compartments[0];
        let mut compartment = InstantaneousCompartment::new(coefficients);
        compartment.add_sample(Sample::new(0.0, 30.0)).unwrap();
        compartment.add_sample(Sample::new(300.0, 30.0)).unwrap();

        let p0 = surface_saturation();
        let target = alveolar_pressure(30.0);
        assert_relative_eq!(
            compartment.saturation(),
            p0 + (target - p0) / 2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_partial_tick_counts_as_whole() {
        let coefficients = ZHL16C.compartments[0];
        let mut short = InstantaneousCompartment::new(coefficients);
        short.add_sample(Sample::new(0.0, 30.0)).unwrap();
        short.add_sample(Sample::new(15.0, 30.0)).unwrap();

        let mut full = InstantaneousCompartment::new(coefficients);
        full.add_sample(Sample::new(0.0, 30.0)).unwrap();
        full.add_sample(Sample::new(20.0, 30.0)).unwrap();

        assert_relative_eq!(short.saturation(), full.saturation());
    }

    #[test]
    fn test_finer_tick_converges_to_closed_form() {
        use crate::compartment::SchreinerCompartment;

        let coefficients = ZHL16C.compartments[2];
        let mut fine = InstantaneousCompartment::with_tick(coefficients, 0.1);
        let mut exact = SchreinerCompartment::new(coefficients);
        for sample in [Sample::new(180.0, 45.0), Sample::new(900.0, 45.0)] {
            fine.add_sample(sample).unwrap();
            exact.add_sample(sample).unwrap();
        }
        assert_relative_eq!(fine.saturation(), exact.saturation(), epsilon = 1e-3);
    }
}
