use std::future::Future;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{oci::Reference, MonoformResult};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A strategy for obtaining the raw procfile of an image.
///
/// An extractor that finds nothing relevant in the image must fail with an error whose
/// [`kind`](crate::MonoformError::kind) is [`NotApplicable`](crate::ErrorKind::NotApplicable), so
/// that a [`MultiExtractor`](crate::extract::MultiExtractor) can move on to the next strategy. Any
/// other error stops the chain.
#[async_trait::async_trait]
pub trait ProcfileExtractor: Send + Sync {
    /// Extracts the raw procfile bytes of `image`.
    async fn extract(&self, image: &Reference, cancel: &CancellationToken)
        -> MonoformResult<Bytes>;
}

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Adapts a closure into a [`ProcfileExtractor`].
pub struct ExtractorFn<F>(F);

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Wraps a closure so it can be used wherever a [`ProcfileExtractor`] is expected.
///
/// ## Examples
///
/// ```
/// use bytes::Bytes;
/// use monoform::extract::extractor_fn;
///
/// let static_procfile = extractor_fn(|_image, _cancel| async {
///     Ok(Bytes::from_static(b"web: ./server\n"))
/// });
/// ```
pub fn extractor_fn<F, Fut>(f: F) -> ExtractorFn<F>
where
    F: Fn(Reference, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MonoformResult<Bytes>> + Send + 'static,
{
    ExtractorFn(f)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait::async_trait]
impl<F, Fut> ProcfileExtractor for ExtractorFn<F>
where
    F: Fn(Reference, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MonoformResult<Bytes>> + Send + 'static,
{
    async fn extract(
        &self,
        image: &Reference,
        cancel: &CancellationToken,
    ) -> MonoformResult<Bytes> {
        (self.0)(image.clone(), cancel.clone()).await
    }
}

#[async_trait::async_trait]
impl<T: ProcfileExtractor + ?Sized> ProcfileExtractor for Box<T> {
    async fn extract(
        &self,
        image: &Reference,
        cancel: &CancellationToken,
    ) -> MonoformResult<Bytes> {
        (**self).extract(image, cancel).await
    }
}
