//! Foreign-language surface for host applications.
//!
//! Hosts pass plain records in and get plain records back; profiles and
//! schedulers never cross the boundary.

use crate::buhlmann::CompartmentSet;
use crate::coefficients::ZHL16C;
use crate::compartment::CompartmentModel;
use crate::error::DecoError;
use crate::profile::{DepthProfile, Sample};
use crate::schedule::{DecoConfig, DecoScheduler, DecoStop};

/// A single profile point as exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, uniffi::Record)]
pub struct ProfilePoint {
    /// Seconds since the start of the dive.
    pub time_sec: f64,
    /// Metres below the surface.
    pub depth_m: f64,
}

impl From<Sample> for ProfilePoint {
    fn from(sample: Sample) -> Self {
        Self {
            time_sec: sample.time,
            depth_m: sample.depth,
        }
    }
}

impl From<ProfilePoint> for Sample {
    fn from(point: ProfilePoint) -> Self {
        Sample::new(point.time_sec, point.depth_m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, uniffi::Record)]
pub struct StopPlan {
    pub depth_m: f64,
    pub duration_min: f64,
}

impl From<DecoStop> for StopPlan {
    fn from(stop: DecoStop) -> Self {
        Self {
            depth_m: stop.depth,
            duration_min: stop.duration,
        }
    }
}

/// Scheduling parameters; see [`DecoConfig`]. Full replay is always used.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct DecoSettings {
    pub ascent_rate_m_min: f64,
    pub increment_m: f64,
    pub stop_resolution_min: f64,
    pub max_stop_minutes: f64,
}

impl From<DecoSettings> for DecoConfig {
    fn from(settings: DecoSettings) -> Self {
        Self {
            ascent_rate: settings.ascent_rate_m_min,
            increment: settings.increment_m,
            stop_resolution: settings.stop_resolution_min,
            max_stop_minutes: settings.max_stop_minutes,
            ..DecoConfig::default()
        }
    }
}

/// Result of [`plan_decompression`].
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct DecoPlan {
    /// `"<label> (<model name>)"`.
    pub label: String,
    pub model: CompartmentModel,
    pub stops: Vec<StopPlan>,
    /// The input profile followed by the synthesised ascent and stops.
    pub samples: Vec<ProfilePoint>,
    pub computation_ms: f64,
    /// Human-readable summary of the stops.
    pub report: String,
}

/// Schedule the ascent for a recorded dive.
#[uniffi::export]
pub fn plan_decompression(
    label: String,
    samples: Vec<ProfilePoint>,
    model: CompartmentModel,
    settings: Option<DecoSettings>,
) -> Result<DecoPlan, DecoError> {
    let config = settings.map(DecoConfig::from).unwrap_or_default();
    let mut profile =
        DepthProfile::from_samples(label, samples)?.duplicate_as(model.display_name());

    let schedule = DecoScheduler::new(&mut profile, model, &ZHL16C, config)?.run_schedule()?;

    Ok(DecoPlan {
        label: schedule.label.clone(),
        model,
        stops: schedule.stops.iter().copied().map(StopPlan::from).collect(),
        samples: profile.iter().copied().map(ProfilePoint::from).collect(),
        computation_ms: schedule.computation.as_secs_f64() * 1000.0,
        report: schedule.to_string(),
    })
}

/// Current ceiling in metres after replaying `samples`.
#[uniffi::export]
pub fn profile_ceiling(
    samples: Vec<ProfilePoint>,
    model: CompartmentModel,
) -> Result<f64, DecoError> {
    let profile = DepthProfile::from_samples("", samples)?;
    let mut set = CompartmentSet::replay(model, &ZHL16C, &profile)?;
    Ok(set.ceiling())
}

#[uniffi::export]
pub fn available_models() -> Vec<CompartmentModel> {
    CompartmentModel::ALL.to_vec()
}

#[uniffi::export]
pub fn model_display_name(model: CompartmentModel) -> String {
    model.display_name().to_string()
}
