//! Compartment integrated numerically with a fixed-step Runge–Kutta solver.

use ode_solvers::{Rk4, SVector, System};

use crate::coefficients::{alveolar_pressure, surface_saturation, Coefficients};
use crate::error::DecoError;
use crate::profile::Sample;

use super::{Cursor, Interval, TissueCompartment};

type State = SVector<f64, 1>;

/// Longest integration step (seconds).
const MAX_STEP: f64 = 10.0;

/// Integrates `dp/dt = k (p_alv(t) - p)` across each interval, with `p_alv`
/// following the linearly interpolated depth.
#[derive(Debug, Clone)]
pub struct DiffEqCompartment {
    coefficients: Coefficients,
    cursor: Cursor,
    p_sat: f64,
    /// Rate constant per second.
    k: f64,
}

impl DiffEqCompartment {
    pub fn new(coefficients: Coefficients) -> Self {
        Self {
            coefficients,
            cursor: Cursor::default(),
            p_sat: surface_saturation(),
            k: coefficients.k_per_second(),
        }
    }

    pub fn saturation(&self) -> f64 {
        self.p_sat
    }
}

/// Right-hand side of the uptake ODE over one interval.
///
/// The independent variable counts steps of `step` seconds, so an interval of
/// `n` steps ends exactly at `x = n`.
struct Uptake {
    k: f64,
    step: f64,
    interval: Interval,
}

impl System<f64, State> for Uptake {
    fn system(&self, x: f64, y: &State, dy: &mut State) {
        let t = x * self.step;
        dy[0] = self.step * self.k * (alveolar_pressure(self.interval.depth_at(t)) - y[0]);
    }
}

impl TissueCompartment for DiffEqCompartment {
    fn add_sample(&mut self, sample: Sample) -> Result<(), DecoError> {
        let interval = self.cursor.advance(sample)?;
        if interval.duration <= 0.0 {
            return Ok(());
        }

        let steps = (interval.duration / MAX_STEP).ceil().max(1.0);
        let system = Uptake {
            k: self.k,
            step: interval.duration / steps,
            interval,
        };
        let y0 = State::from_element(self.p_sat);
        let mut stepper = Rk4::new(system, 0.0, y0, steps, 1.0);
        stepper
            .integrate()
            .map_err(|e| DecoError::Integration(format!("{e:?}")))?;

        if let Some(y) = stepper.y_out().last() {
            self.p_sat = y[0];
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
    use crate::compartment::SchreinerCompartment;
    use approx::assert_relative_eq;

    #[test]
    fn test_matches_closed_form() {
        let coefficients = ZHL16C.compartments[4];
        let mut numeric = DiffEqCompartment::new(coefficients);
        let mut exact = SchreinerCompartment::new(coefficients);

        let samples = [
            Sample::new(120.0, 30.0),
            Sample::new(1320.0, 30.0),
            Sample::new(1500.0, 6.0),
            Sample::new(1680.0, 6.0),
        ];
        for sample in samples {
            numeric.add_sample(sample).unwrap();
            exact.add_sample(sample).unwrap();
            assert_relative_eq!(numeric.saturation(), exact.saturation(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_zero_interval_is_a_noop() {
        let mut compartment = DiffEqCompartment::new(ZHL16C.compartments[0]);
        compartment.add_sample(Sample::new(0.0, 30.0)).unwrap();
        assert_relative_eq!(compartment.saturation(), surface_saturation());
        assert_eq!(compartment.time_elapsed(), 0.0);
    }
}
