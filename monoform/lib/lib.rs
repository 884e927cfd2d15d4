//! `monoform` derives the process formation of an application packaged as a container image.
//!
//! # Overview
//!
//! Given an image, monoform works out which commands the application runs (e.g. `web`, `worker`)
//! and how each of them is exposed on the network. It does so without requiring the image to
//! follow any particular platform convention:
//!
//! - If the image ships a procfile in its working directory, that file is used.
//! - Otherwise the image's default command becomes a single `web` process.
//!
//! # Architecture
//!
//! - [`extract`] - Extraction strategies and the fallback chain composing them
//! - [`container`] - Reading files out of images through ephemeral containers
//! - [`procfile`] - The standard and extended procfile surface formats
//! - [`formation`] - The normalized process model
//! - [`oci`] - Image references
//! - [`config`] - Extraction chain configuration
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use monoform::{
//!     container::ContainerRuntime,
//!     extract::{self, default_extractor},
//!     App, ExposurePolicy,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! async fn formation(runtime: Arc<dyn ContainerRuntime>) -> anyhow::Result<()> {
//!     let extractor = default_extractor(runtime);
//!     let app = App::builder().exposure(ExposurePolicy::Public).build();
//!     let image = "acme/api:1.0".parse()?;
//!
//!     let formation =
//!         extract::extract_formation(&extractor, &image, &app, &CancellationToken::new()).await?;
//!     for (name, process) in &formation {
//!         println!("{name}: {}", process.get_command());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Every error carries an [`ErrorKind`]. Extraction strategies that find nothing relevant fail
//! with [`ErrorKind::NotApplicable`], which is the only kind a fallback chain recovers from.

#![warn(missing_docs)]
#![allow(clippy::module_inception)]

mod app;
mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod container;
pub mod extract;
pub mod formation;
pub mod oci;
pub mod procfile;
pub mod utils;

pub use app::*;
pub use error::*;
