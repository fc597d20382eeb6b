//! Closed-form compartment using the Schreiner equation.

use crate::coefficients::{alveolar_pressure, surface_saturation, Coefficients, BAR_PER_METER, R_N2};
use crate::error::DecoError;
use crate::profile::Sample;

use super::{Cursor, TissueCompartment};

/// Exact solution of the single-compartment ODE for a linear depth ramp,
/// evaluated once per sample.
#[derive(Debug, Clone)]
pub struct SchreinerCompartment {
    coefficients: Coefficients,
    cursor: Cursor,
    p_sat: f64,
    /// Rate constant per minute.
    k: f64,
}

impl SchreinerCompartment {
    pub fn new(coefficients: Coefficients) -> Self {
        Self::with_loading(coefficients, surface_saturation())
    }

    /// Start from an explicit saturation instead of surface equilibrium.
    pub fn with_loading(coefficients: Coefficients, p_sat: f64) -> Self {
        Self {
            coefficients,
            cursor: Cursor::default(),
            p_sat,
            k: std::f64::consts::LN_2 / coefficients.halftime,
        }
    }

    pub fn saturation(&self) -> f64 {
        self.p_sat
    }
}

impl TissueCompartment for SchreinerCompartment {
    fn add_sample(&mut self, sample: Sample) -> Result<(), DecoError> {
        let interval = self.cursor.advance(sample)?;
        let t = interval.duration / 60.0;
        if t <= 0.0 {
            return Ok(());
        }

        let p_alv = alveolar_pressure(interval.start_depth);
        // Rate of change of inspired pressure, bar/min.
        let rate = R_N2 * (interval.end_depth - interval.start_depth) * BAR_PER_METER / t;
        let k = self.k;

        self.p_sat =
            p_alv + rate * (t - 1.0 / k) - (p_alv - self.p_sat - rate / k) * (-k * t).exp();
        Ok(())
    }

    fn ceiling(&mut self) -> f64 {
        self.coefficients.ceiling_for(self.p_sat)
    }

    fn time_elapsed(&self) -> f64 {
        self.cursor.time_elapsed
    }
}
