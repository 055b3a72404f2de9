mod coordinator;
mod verify;

pub use coordinator::{Compensations, RollbackCoordinator};
pub use verify::{Artifact, ArtifactKind, StateProbe};
