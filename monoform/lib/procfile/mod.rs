//! Parsing of the two procfile surface formats.
//!
//! A procfile is either *standard*, mapping each process name to a command line:
//!
//! ```yaml
//! web: rackup
//! worker: rake jobs:work
//! ```
//!
//! or *extended*, mapping each process name to a structured entry:
//!
//! ```yaml
//! web:
//!   command: ./app
//!   expose:
//!     external: true
//!     protocol: https
//! worker:
//!   command: [python, worker.py]
//! ```

mod procfile;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use procfile::*;
