//! Integer-only variant of the tick stepper.
//!
//! Pressures are integers in units of 1/[`PRESSURE_FACTOR`] bar and
//! multipliers are integers over [`FACTOR_ONE`]. Floats appear only when a
//! sampled depth is converted to pressure and when the ceiling is converted
//! back to metres.

use crate::coefficients::{
    scale_pressure, Coefficients, FixedPointCoefficients, BAR_PER_METER, FACTOR_ONE,
    FIXED_POINT_TICK, IF_N2, IP_AMB, IP_WATER, I_INIT_LOADING, PRESSURE_FACTOR, P_AMB,
    ZHL16C, ZHL16C_FIXED_POINT,
};
use crate::error::DecoError;
use crate::profile::Sample;

use super::{Cursor, TissueCompartment};

#[derive(Debug, Clone)]
pub struct FixedPointCompartment {
    fixed: FixedPointCoefficients,
    cursor: Cursor,
    p_sat: i64,
}

/// `value * factor / FACTOR_ONE`, truncated towards zero.
fn apply_factor(factor: i64, value: i64) -> i64 {
    value * factor / FACTOR_ONE
}

/// Integer lookup for a compartment, keyed by half-time.
///
/// Half-times from the ZHL-16C table use the precomputed entries; others are
/// derived on the spot.
pub fn lookup(coefficients: &Coefficients) -> FixedPointCoefficients {
    ZHL16C
        .iter()
        .position(|c| c.halftime == coefficients.halftime)
        .map(|i| ZHL16C_FIXED_POINT[i])
        .unwrap_or_else(|| FixedPointCoefficients::from_float(coefficients, FIXED_POINT_TICK))
}

impl FixedPointCompartment {
    /// Only the half-time selects the integer constants; `a` and `b` come from
    /// the lookup table. A coefficient set that reuses a ZHL-16C half-time with
    /// different `a`/`b` therefore still gets the ZHL-16C integer values.
    pub fn new(coefficients: Coefficients) -> Self {
        Self {
            fixed: lookup(&coefficients),
            cursor: Cursor::default(),
            p_sat: *I_INIT_LOADING,
        }
    }

    pub fn saturation(&self) -> i64 {
        self.p_sat
    }

    /// Move saturation one tick towards the alveolar pressure for `pressure`.
    fn process_tick(&mut self, pressure: i64) -> Result<(), DecoError> {
        let ip_alv = apply_factor(*IF_N2, pressure - IP_WATER);
        let gap = ip_alv - self.p_sat;
        let step = apply_factor(self.fixed.factor, gap.abs());
        if step > gap.abs() {
            return Err(DecoError::FixedPointOvershoot {
                step,
                gap: gap.abs(),
            });
        }
        self.p_sat += step * gap.signum();
        Ok(())
    }
}

impl TissueCompartment for FixedPointCompartment {
    fn add_sample(&mut self, sample: Sample) -> Result<(), DecoError> {
        let interval = self.cursor.advance(sample)?;
        for t in interval.ticks(FIXED_POINT_TICK) {
            let pressure = scale_pressure(interval.depth_at(t) * BAR_PER_METER + P_AMB);
            self.process_tick(pressure)?;
        }
        Ok(())
    }

    /// Signed below `a`, so fast compartments near the surface report a deep
    /// negative ceiling instead of a fixed sentinel.
    fn ceiling(&mut self) -> f64 {
        let tolerated = apply_factor(self.fixed.b, self.p_sat - self.fixed.a);
        (tolerated - IP_AMB) as f64 / PRESSURE_FACTOR as f64 / BAR_PER_METER
    }

    fn time_elapsed(&self) -> f64 {
        self.cursor.time_elapsed
    }
}
