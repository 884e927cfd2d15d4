use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    container::{ContainerFileReader, ContainerRuntime},
    extract::ProcfileExtractor,
    oci::Reference,
    utils::get_procfile_name,
    MonoformResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Extracts the procfile stored in the image's working directory.
///
/// The bytes are returned exactly as found in the image; the surface format is only discriminated
/// when the procfile is parsed.
#[derive(Clone)]
pub struct FileExtractor {
    reader: ContainerFileReader,
    procfile_name: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl FileExtractor {
    /// Creates an extractor looking for the default procfile name.
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::with_procfile_name(runtime, get_procfile_name())
    }

    /// Creates an extractor looking for a procfile with the given name.
    pub fn with_procfile_name(
        runtime: Arc<dyn ContainerRuntime>,
        procfile_name: impl Into<String>,
    ) -> Self {
        Self {
            reader: ContainerFileReader::new(runtime),
            procfile_name: procfile_name.into(),
        }
    }

    /// The name of the procfile looked up in the image.
    pub fn procfile_name(&self) -> &str {
        &self.procfile_name
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl ProcfileExtractor for FileExtractor {
    async fn extract(
        &self,
        image: &Reference,
        cancel: &CancellationToken,
    ) -> MonoformResult<Bytes> {
        self.reader
            .read_file(image, &self.procfile_name, cancel)
            .await
    }
}
