use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    container::{cancellable, ContainerRuntime},
    extract::ProcfileExtractor,
    formation::WEB_PROCESS_TYPE,
    oci::Reference,
    procfile::{ExtendedProcess, ExtendedProcfile, Procfile},
    MonoformResult, ProcfileError,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Synthesizes a procfile from the image's default command (`CMD`).
///
/// The command becomes the single `web` process of an extended procfile without an `expose` block,
/// so no exposure is derived for it. Only image metadata is read; no container is created.
#[derive(Clone)]
pub struct CmdExtractor {
    runtime: Arc<dyn ContainerRuntime>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl CmdExtractor {
    /// Creates a new extractor backed by the given runtime.
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl ProcfileExtractor for CmdExtractor {
    async fn extract(
        &self,
        image: &Reference,
        cancel: &CancellationToken,
    ) -> MonoformResult<Bytes> {
        let config = cancellable(cancel, self.runtime.inspect_image(image)).await?;
        if config.get_cmd().is_empty() {
            return Err(ProcfileError::NoDefaultCommand.into());
        }

        let mut entries = ExtendedProcfile::new();
        entries.insert(
            WEB_PROCESS_TYPE.to_string(),
            ExtendedProcess::with_args(config.get_cmd().clone()),
        );

        let yaml = Procfile::Extended(entries).to_yaml()?;
        Ok(Bytes::from(yaml))
    }
}
