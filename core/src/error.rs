use thiserror::Error;

/// Error type for tissue simulation and decompression scheduling.
#[derive(Error, Debug, Clone, PartialEq, uniffi::Error)]
#[uniffi(flat_error)]
pub enum DecoError {
    #[error("sample at {time}s precedes the previous sample at {previous}s")]
    InvalidSampleOrder { previous: f64, time: f64 },

    #[error("sample at {time}s and {depth}m is not a finite number")]
    NonFiniteSample { time: f64, depth: f64 },

    #[error("depth {depth:.1}m is shallower than the ceiling at {ceiling:.1}m")]
    CeilingViolation { depth: f64, ceiling: f64 },

    #[error("stop at {depth:.1}m did not clear within {minutes:.0} minutes")]
    ScheduleDivergence { depth: f64, minutes: f64 },

    #[error("fixed-point step of {step} overshoots the remaining gap of {gap}")]
    FixedPointOvershoot { step: i64, gap: i64 },

    #[error("integration failed: {0}")]
    Integration(String),

    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}
