//! Domain model (descriptors, stages, outcomes, ids).

pub mod descriptor;
pub mod ids;
pub mod outcome;
pub mod stage;

pub use descriptor::{ApplicationDescriptor, Descriptor, MicroserviceDescriptor};
pub use ids::RunId;
pub use outcome::{FailureKind, StageFailure, StageOutcome};
pub use stage::Stage;
