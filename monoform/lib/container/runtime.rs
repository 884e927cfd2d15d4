use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;
use getset::Getters;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use crate::{oci::Reference, MonoformError, MonoformResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The parts of an image's configuration used to locate or synthesize a procfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ImageConfig {
    /// The default command (`CMD`) of the image. Empty if the image declares none.
    #[builder(default, setter(into))]
    #[serde(default)]
    cmd: Vec<String>,

    /// The working directory (`WORKDIR`) of the image. Empty if the image declares none.
    #[builder(default, setter(into))]
    #[serde(default)]
    working_dir: String,
}

/// A stream of chunks of a tar archive.
pub type ArchiveStream = BoxStream<'static, MonoformResult<Bytes>>;

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// The container runtime operations needed to read files out of an image.
///
/// Implementations must report a path that does not exist in a container with
/// [`ProcfileError::NotFound`](crate::ProcfileError::NotFound), and any other failure with
/// [`MonoformError::runtime`].
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns the configuration of an image without instantiating it.
    async fn inspect_image(&self, image: &Reference) -> MonoformResult<ImageConfig>;

    /// Creates (but does not start) a container from an image and returns its id.
    async fn create_container(&self, image: &Reference) -> MonoformResult<String>;

    /// Removes a container.
    async fn remove_container(&self, container_id: &str) -> MonoformResult<()>;

    /// Copies a path out of a container as a tar archive whose first entry is the path itself.
    async fn copy_from_container(
        &self,
        container_id: &str,
        path: &str,
    ) -> MonoformResult<ArchiveStream>;
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Runs a runtime call unless the token is cancelled first.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = MonoformResult<T>>,
) -> MonoformResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MonoformError::Cancelled),
        result = call => result,
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
