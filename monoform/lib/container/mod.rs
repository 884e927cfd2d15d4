//! Reading files out of container images.
//!
//! The container runtime itself is abstracted behind [`ContainerRuntime`]. Files are read by
//! creating a container that is never started, copying the file out as a tar archive and removing
//! the container again.

mod reader;
mod runtime;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use reader::*;
pub use runtime::*;
