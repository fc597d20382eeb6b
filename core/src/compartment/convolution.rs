//! Compartment treated as a first-order linear time-invariant system.
//!
//! The compartment is the system `x' = -k x + k u`, `y = x`, with the alveolar
//! pressure as input `u`. Samples are queued and the response to the whole
//! queue is simulated in one batch the next time the ceiling is read.

use crate::coefficients::{alveolar_pressure, surface_saturation, Coefficients};
use crate::error::DecoError;
use crate::profile::Sample;

use super::{Cursor, TissueCompartment};

/// A single-pole system `x' = -pole x + gain u`, `y = x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstOrderSystem {
    pub pole: f64,
    pub gain: f64,
}

/// Result of [`FirstOrderSystem::simulate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Output at each input time.
    pub outputs: Vec<f64>,
    /// State after the last input time.
    pub state: f64,
}

impl FirstOrderSystem {
    /// Response to a piecewise linear input starting from state `x0`.
    ///
    /// `times` and `inputs` are parallel; the input is interpolated linearly
    /// between consecutive points (first-order hold).
    pub fn simulate(&self, x0: f64, times: &[f64], inputs: &[f64]) -> Response {
        let mut state = x0;
        let mut outputs = Vec::with_capacity(times.len());
        outputs.push(state);

        for (t, u) in times.windows(2).zip(inputs.windows(2)) {
            let h = t[1] - t[0];
            if h > 0.0 {
                state = self.step(state, u[0], u[1], h);
            }
            outputs.push(state);
        }

        Response { outputs, state }
    }

    /// Exact state transition over `h` for an input ramp from `u0` to `u1`.
    fn step(&self, x: f64, u0: f64, u1: f64, h: f64) -> f64 {
        let decay = (-self.pole * h).exp();
        let dc_gain = self.gain / self.pole;
        let slope = (u1 - u0) / h;
        // Forced response to the ramp lags it by 1/pole.
        let forced_end = dc_gain * (u1 - slope / self.pole);
        let forced_start = dc_gain * (u0 - slope / self.pole);
        forced_end + (x - forced_start) * decay
    }
}

/// Convolution-style compartment with batched, lazily evaluated updates.
#[derive(Debug, Clone)]
pub struct ConvolutionCompartment {
    coefficients: Coefficients,
    system: FirstOrderSystem,
    cursor: Cursor,
    /// Cursor of the last simulated sample; lags `cursor` while samples are queued.
    simulated: Cursor,
    queue: Vec<Sample>,
    state: f64,
    p_sat: f64,
}

impl ConvolutionCompartment {
    pub fn new(coefficients: Coefficients) -> Self {
        let k = coefficients.k_per_second();
        Self {
            coefficients,
            system: FirstOrderSystem { pole: k, gain: k },
            cursor: Cursor::default(),
            simulated: Cursor::default(),
            queue: Vec::new(),
            state: surface_saturation(),
            p_sat: surface_saturation(),
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Simulate every queued sample in one batch.
    fn flush(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let start = self.simulated;
        let mut times = Vec::with_capacity(self.queue.len() + 1);
        let mut inputs = Vec::with_capacity(self.queue.len() + 1);
        times.push(0.0);
        inputs.push(alveolar_pressure(start.current_depth));
        for sample in self.queue.drain(..) {
            times.push(sample.time - start.time_elapsed);
            inputs.push(alveolar_pressure(sample.depth));
        }

        let response = self.system.simulate(self.state, &times, &inputs);
        if let Some(&output) = response.outputs.last() {
            self.p_sat = output;
        }
        self.state = response.state;
        self.simulated = self.cursor;
    }
}

impl TissueCompartment for ConvolutionCompartment {
    fn add_sample(&mut self, sample: Sample) -> Result<(), DecoError> {
        self.cursor.advance(sample)?;
        self.queue.push(sample);
        Ok(())
    }

    fn ceiling(&mut self) -> f64 {
        self.flush();
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
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_step_response() {
        let system = FirstOrderSystem {
            pole: 0.5,
            gain: 0.5,
        };
        let response = system.simulate(0.0, &[0.0, 2.0], &[1.0, 1.0]);
        assert_eq!(response.outputs.len(), 2);
        assert_relative_eq!(response.state, 1.0 - (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_ramp_response_tracks_with_lag() {
        let system = FirstOrderSystem {
            pole: 1.0,
            gain: 1.0,
        };
        // After a long ramp of slope 1 the output settles 1/pole behind the input.
        let response = system.simulate(0.0, &[0.0, 50.0], &[0.0, 50.0]);
        assert_abs_diff_eq!(response.state, 49.0, epsilon = 1e-9);
    }

    #[test]
    fn test_samples_are_queued_until_ceiling() {
        let mut compartment = ConvolutionCompartment::new(ZHL16C.compartments[0]);
        compartment.add_sample(Sample::new(0.0, 30.0)).unwrap();
        compartment.add_sample(Sample::new(600.0, 30.0)).unwrap();
        assert_eq!(compartment.queued(), 2);
        assert_eq!(compartment.time_elapsed(), 600.0);

        compartment.ceiling();
        assert_eq!(compartment.queued(), 0);
    }

    #[test]
    fn test_batched_matches_per_sample() {
        let coefficients = ZHL16C.compartments[5];
        let samples = [
            Sample::new(120.0, 36.0),
            Sample::new(1500.0, 36.0),
            Sample::new(1740.0, 12.0),
            Sample::new(1860.0, 12.0),
            Sample::new(1900.0, 0.0),
        ];

        let mut batched = ConvolutionCompartment::new(coefficients);
        let mut stepwise = ConvolutionCompartment::new(coefficients);
        let mut exact = SchreinerCompartment::new(coefficients);
        for sample in samples {
            batched.add_sample(sample).unwrap();
            stepwise.add_sample(sample).unwrap();
            stepwise.ceiling();
            exact.add_sample(sample).unwrap();
        }

        let batched_ceiling = batched.ceiling();
        assert_relative_eq!(batched_ceiling, stepwise.ceiling(), epsilon = 1e-9);
        assert_relative_eq!(batched_ceiling, exact.ceiling(), epsilon = 1e-9);
    }
}
