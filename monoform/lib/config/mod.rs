//! Configuration types and defaults.

mod defaults;
mod extractor;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;
pub use extractor::*;
