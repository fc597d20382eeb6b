//! Physical constants and Bühlmann ZHL-16C compartment coefficients.
//!
//! The float table is a compile-time constant. The fixed-point lookup used by
//! the integer stepper is derived from it once per process and never mutated.

use std::sync::LazyLock;

// ============================================================================
// Physical Constants
// ============================================================================

/// Standard atmospheric pressure at the surface (bar).
pub const P_AMB: f64 = 1.01325;

/// Pressure increase per metre of seawater (bar/m).
/// 1 atm / 10 msw = 1.01325 / 10.0
pub const BAR_PER_METER: f64 = 0.101325;

/// Water vapour pressure in the lungs (bar), at 37°C.
pub const P_WATER: f64 = 0.0627;

/// Fraction of N2 in air.
pub const R_N2: f64 = 0.7902;

/// Number of tissue compartments in a standard table.
pub const NUM_COMPARTMENTS: usize = 16;

/// Inspired N2 partial pressure at the given depth (bar).
pub fn alveolar_pressure(depth_m: f64) -> f64 {
    R_N2 * (depth_m * BAR_PER_METER + P_AMB - P_WATER)
}

/// N2 saturation of a compartment at equilibrium with surface air (bar).
pub fn surface_saturation() -> f64 {
    alveolar_pressure(0.0)
}

// ============================================================================
// Float coefficients
// ============================================================================

/// One compartment's half-time (minutes) and M-value coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub halftime: f64,
    pub a: f64,
    pub b: f64,
}

impl Coefficients {
    pub const fn new(halftime: f64, a: f64, b: f64) -> Self {
        Self { halftime, a, b }
    }

    /// Depth ceiling for a given saturation, shared by every model variant.
    ///
    /// Negative values mean the diver may surface.
    pub fn ceiling_for(&self, p_sat: f64) -> f64 {
        ((p_sat - self.a) * self.b - P_AMB) / BAR_PER_METER
    }

    /// Uptake rate constant per second.
    pub fn k_per_second(&self) -> f64 {
        std::f64::consts::LN_2 / (self.halftime * 60.0)
    }
}

/// An ordered, named table of compartment coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    pub name: &'static str,
    pub compartments: [Coefficients; NUM_COMPARTMENTS],
}

impl CoefficientTable {
    pub fn iter(&self) -> impl Iterator<Item = &Coefficients> {
        self.compartments.iter()
    }
}

/// Bühlmann ZHL-16C nitrogen coefficients.
pub static ZHL16C: CoefficientTable = CoefficientTable {
    name: "ZHL-16C",
    compartments: [
        Coefficients::new(5.0, 1.1696, 0.5578),
        Coefficients::new(8.0, 1.0000, 0.6514),
        Coefficients::new(12.5, 0.8618, 0.7222),
        Coefficients::new(18.5, 0.7562, 0.7825),
        Coefficients::new(27.0, 0.6200, 0.8126),
        Coefficients::new(38.3, 0.5043, 0.8434),
        Coefficients::new(54.3, 0.4410, 0.8693),
        Coefficients::new(77.0, 0.4000, 0.8910),
        Coefficients::new(109.0, 0.3750, 0.9092),
        Coefficients::new(146.0, 0.3500, 0.9222),
        Coefficients::new(187.0, 0.3295, 0.9319),
        Coefficients::new(239.0, 0.3065, 0.9403),
        Coefficients::new(305.0, 0.2835, 0.9477),
        Coefficients::new(390.0, 0.2610, 0.9544),
        Coefficients::new(498.0, 0.2480, 0.9602),
        Coefficients::new(635.0, 0.2327, 0.9653),
    ],
};

// ============================================================================
// Fixed-point coefficients
// ============================================================================

/// Integer pressure units per bar (1 unit = 10 µbar).
pub const PRESSURE_FACTOR: i64 = 100_000;

/// Integer representation of a multiplier of exactly 1.0.
pub const FACTOR_ONE: i64 = 1 << 20;

/// Sampling tick of the integer stepper (seconds).
pub const FIXED_POINT_TICK: f64 = 10.0;

/// Surface ambient pressure in integer units.
pub const IP_AMB: i64 = 101_325;

/// Water vapour pressure in integer units.
pub const IP_WATER: i64 = 6_270;

/// N2 fraction of air as an integer multiplier.
pub static IF_N2: LazyLock<i64> = LazyLock::new(|| scale_factor(R_N2));

/// Initial integer saturation, equilibrium with surface air.
pub static I_INIT_LOADING: LazyLock<i64> =
    LazyLock::new(|| scale_pressure(surface_saturation()));

/// Per-compartment integer constants for the fixed-point stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPointCoefficients {
    /// Fraction of the gradient taken up per tick, scaled by [`FACTOR_ONE`].
    pub factor: i64,
    /// `a` in integer pressure units.
    pub a: i64,
    /// `b` scaled by [`FACTOR_ONE`].
    pub b: i64,
}

impl FixedPointCoefficients {
    pub fn from_float(coefficients: &Coefficients, tick_sec: f64) -> Self {
        let factor = 1.0 - (-tick_sec * coefficients.k_per_second()).exp();
        Self {
            factor: scale_factor(factor),
            a: scale_pressure(coefficients.a),
            b: scale_factor(coefficients.b),
        }
    }
}

/// Fixed-point lookup derived from [`ZHL16C`] at [`FIXED_POINT_TICK`].
pub static ZHL16C_FIXED_POINT: LazyLock<[FixedPointCoefficients; NUM_COMPARTMENTS]> =
    LazyLock::new(|| fixed_point_table(&ZHL16C, FIXED_POINT_TICK));

/// Build the integer lookup for a float table.
pub fn fixed_point_table(
    table: &CoefficientTable,
    tick_sec: f64,
) -> [FixedPointCoefficients; NUM_COMPARTMENTS] {
    table
        .compartments
        .map(|c| FixedPointCoefficients::from_float(&c, tick_sec))
}

/// Convert a pressure in bar to integer units.
pub fn scale_pressure(bar: f64) -> i64 {
    (bar * PRESSURE_FACTOR as f64).round() as i64
}

fn scale_factor(value: f64) -> i64 {
    (value * FACTOR_ONE as f64).round() as i64
}
