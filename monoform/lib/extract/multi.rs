use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    extract::ProcfileExtractor, oci::Reference, ErrorKind, MonoformError, MonoformResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Tries a list of extractors in order until one succeeds.
///
/// - The first success is returned and later extractors are not run.
/// - A [`NotApplicable`](ErrorKind::NotApplicable) failure moves on to the next extractor.
/// - Any other failure is returned immediately.
///
/// If every extractor is not applicable, [`MonoformError::NoExtractorApplicable`] is returned,
/// which is itself not applicable, so multi extractors nest.
pub struct MultiExtractor {
    pub(super) extractors: Vec<Box<dyn ProcfileExtractor>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MultiExtractor {
    /// Creates a chain from a non-empty list of extractors.
    pub fn new(extractors: Vec<Box<dyn ProcfileExtractor>>) -> MonoformResult<Self> {
        if extractors.is_empty() {
            return Err(MonoformError::EmptyExtractorChain);
        }

        Ok(Self { extractors })
    }

    /// The number of extractors in the chain.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Always `false`; a chain cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl ProcfileExtractor for MultiExtractor {
    async fn extract(
        &self,
        image: &Reference,
        cancel: &CancellationToken,
    ) -> MonoformResult<Bytes> {
        for (index, extractor) in self.extractors.iter().enumerate() {
            match extractor.extract(image, cancel).await {
                Ok(procfile) => {
                    tracing::info!(image = %image, extractor = index, "extracted procfile");
                    return Ok(procfile);
                }
                Err(e) if e.kind() == ErrorKind::NotApplicable => {
                    tracing::debug!(image = %image, extractor = index, reason = %e, "extractor not applicable, trying next");
                }
                Err(e) => return Err(e),
            }
        }

        Err(MonoformError::NoExtractorApplicable)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
