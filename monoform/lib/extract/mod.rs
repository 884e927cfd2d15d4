//! Strategies for extracting a procfile from an image and the chain that composes them.

mod cmd;
mod file;
mod multi;
mod pipeline;
mod traits;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use cmd::*;
pub use file::*;
pub use multi::*;
pub use pipeline::*;
pub use traits::*;
