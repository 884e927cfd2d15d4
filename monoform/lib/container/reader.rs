use std::{io::Read, sync::Arc};

use bytes::Bytes;
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use typed_path::UnixPath;

use crate::{
    config::{DEFAULT_MAX_ARCHIVE_SIZE, DEFAULT_WORKING_DIR},
    container::{cancellable, ArchiveStream, ContainerRuntime},
    oci::Reference,
    MonoformError, MonoformResult, ProcfileError,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const TAR_BLOCK_SIZE: usize = 512;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Reads single files out of images through ephemeral, never started containers.
#[derive(Clone)]
pub struct ContainerFileReader {
    runtime: Arc<dyn ContainerRuntime>,
    max_archive_size: usize,
}

/// Ownership of an ephemeral container.
///
/// The container is removed by [`ContainerLease::release`]. A lease dropped without being
/// released, e.g. because the owning future was dropped or panicked, schedules the removal on the
/// current tokio runtime.
pub struct ContainerLease {
    runtime: Arc<dyn ContainerRuntime>,
    id: String,
    released: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContainerFileReader {
    /// Creates a new reader backed by the given runtime.
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE,
        }
    }

    /// Sets the most bytes of a copied archive that are buffered while looking for the file.
    pub fn with_max_archive_size(mut self, max_archive_size: usize) -> Self {
        self.max_archive_size = max_archive_size;
        self
    }

    /// Reads the file `name`, relative to the image's working directory, out of `image`.
    ///
    /// A missing file and an archive that cannot be decoded are both reported as
    /// [`ProcfileError`]s. Runtime failures are returned unchanged. The ephemeral container is
    /// removed on every exit path after it was created.
    pub async fn read_file(
        &self,
        image: &Reference,
        name: &str,
        cancel: &CancellationToken,
    ) -> MonoformResult<Bytes> {
        let config = cancellable(cancel, self.runtime.inspect_image(image)).await?;
        let path = resolve_path(config.get_working_dir(), name);

        let lease = ContainerLease::acquire(self.runtime.clone(), image, cancel).await?;
        tracing::debug!(image = %image, container_id = %lease.id(), path = %path, "reading file from container");

        let result = self.copy_file(lease.id(), &path, cancel).await;
        lease.release().await;

        result
    }

    async fn copy_file(
        &self,
        container_id: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> MonoformResult<Bytes> {
        let stream =
            cancellable(cancel, self.runtime.copy_from_container(container_id, path)).await?;
        let archive = collect_first_entry(stream, self.max_archive_size, cancel).await?;

        first_file(&archive)
    }
}

impl ContainerLease {
    /// Creates a container from `image` and takes ownership of it.
    ///
    /// Creation itself is not interrupted by `cancel`. A cancellation seen once the container
    /// exists removes it again and returns [`MonoformError::Cancelled`].
    pub async fn acquire(
        runtime: Arc<dyn ContainerRuntime>,
        image: &Reference,
        cancel: &CancellationToken,
    ) -> MonoformResult<Self> {
        if cancel.is_cancelled() {
            return Err(MonoformError::Cancelled);
        }

        let id = runtime.create_container(image).await?;
        let lease = Self {
            runtime,
            id,
            released: false,
        };

        if cancel.is_cancelled() {
            lease.release().await;
            return Err(MonoformError::Cancelled);
        }

        Ok(lease)
    }

    /// The id of the leased container.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Removes the container.
    ///
    /// Removal is not cancellable and a failure is only logged, so it never replaces the outcome
    /// of the work done with the container.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = self.runtime.remove_container(&self.id).await {
            tracing::warn!(container_id = %self.id, error = %e, "failed to remove container");
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Joins a file name onto a working directory, treating an empty directory as the root.
pub fn resolve_path(working_dir: &str, name: &str) -> String {
    let working_dir = if working_dir.is_empty() {
        DEFAULT_WORKING_DIR
    } else {
        working_dir
    };

    UnixPath::new(working_dir)
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// Buffers an archive stream until its first entry is complete.
///
/// The rest of the stream is not read. An archive whose first entry does not end within
/// `max_size` bytes is rejected as invalid.
pub async fn collect_first_entry(
    mut stream: ArchiveStream,
    max_size: usize,
    cancel: &CancellationToken,
) -> MonoformResult<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = cancellable(cancel, stream.try_next()).await? {
        buf.extend_from_slice(&chunk);
        if first_entry_end(&buf).is_some_and(|end| buf.len() >= end) {
            break;
        }

        if buf.len() > max_size {
            return Err(ProcfileError::InvalidArchive(format!(
                "first entry does not end within {max_size} bytes"
            ))
            .into());
        }
    }

    Ok(buf)
}

/// The offset at which the data of the first tar entry ends, once its header is buffered.
///
/// Returns `None` while the header is incomplete, and for extension headers (long names, pax
/// records, sparse files) whose real entry follows later.
fn first_entry_end(archive: &[u8]) -> Option<usize> {
    let header = tar::Header::from_byte_slice(archive.get(..TAR_BLOCK_SIZE)?);
    let kind = header.entry_type();
    if kind.is_gnu_longname()
        || kind.is_gnu_longlink()
        || kind.is_pax_local_extensions()
        || kind.is_pax_global_extensions()
        || kind.is_gnu_sparse()
    {
        return None;
    }

    let size = usize::try_from(header.entry_size().ok()?).ok()?;
    size.checked_next_multiple_of(TAR_BLOCK_SIZE)?
        .checked_add(TAR_BLOCK_SIZE)
}

/// Returns the contents of the first entry of a tar archive.
pub fn first_file(archive: &[u8]) -> MonoformResult<Bytes> {
    let invalid = |e: std::io::Error| ProcfileError::InvalidArchive(e.to_string());
    let archive_len = archive.len() as u64;

    let mut archive = tar::Archive::new(archive);
    let mut entries = archive.entries().map_err(invalid)?;
    let mut entry = match entries.next() {
        Some(entry) => entry.map_err(invalid)?,
        None => return Err(ProcfileError::EmptyArchive.into()),
    };

    // The declared size is untrusted and can exceed the archive itself.
    let size = entry.size();
    let mut buf = Vec::with_capacity(size.min(archive_len) as usize);
    entry.read_to_end(&mut buf).map_err(invalid)?;
    if (buf.len() as u64) < size {
        return Err(ProcfileError::InvalidArchive(format!(
            "entry truncated after {} of {size} bytes",
            buf.len()
        ))
        .into());
    }

    Ok(Bytes::from(buf))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Drop for ContainerLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let runtime = self.runtime.clone();
        let id = std::mem::take(&mut self.id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(container_id = %id, "container lease dropped, removing in background");
                handle.spawn(async move {
                    if let Err(e) = runtime.remove_container(&id).await {
                        tracing::warn!(container_id = %id, error = %e, "failed to remove container");
                    }
                });
            }
            Err(_) => {
                tracing::error!(container_id = %id, "container lease dropped outside a tokio runtime, container leaked");
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
