// Rendering: turns a LaTeX document into a binary artifact by trying an ordered
// list of compiler backends until one succeeds.

pub mod artifact;
pub mod backend;
pub mod catalog;
pub mod local;
pub mod normalize;
pub mod orchestrator;

pub use artifact::{Artifact, ArtifactFormat};
pub use catalog::build_backends;
pub use orchestrator::{RenderError, RenderOrchestrator};
