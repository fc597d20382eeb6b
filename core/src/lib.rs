pub mod buhlmann;
pub mod coefficients;
pub mod compartment;
pub mod error;
pub mod ffi;
pub mod profile;
pub mod schedule;

uniffi::setup_scaffolding!();

pub use buhlmann::CompartmentSet;
pub use coefficients::{CoefficientTable, Coefficients, ZHL16C};
pub use compartment::{Compartment, CompartmentModel, TissueCompartment};
pub use error::DecoError;
pub use profile::{DepthProfile, Sample};
pub use schedule::{
    plan_models, DecoConfig, DecoSchedule, DecoScheduler, DecoStop, ReplayPolicy, SchedulerState,
};
