//! The normalized process model and its construction from procfiles.

mod command;
mod formation;
mod process;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use command::*;
pub use formation::*;
pub use process::*;
