use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    container::ContainerRuntime,
    extract::{CmdExtractor, FileExtractor, MultiExtractor, ProcfileExtractor},
    formation::Formation,
    oci::Reference,
    procfile::Procfile,
    App, MonoformResult,
};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// The standard chain: the procfile in the image's working directory, then the image's default
/// command.
pub fn default_extractor(runtime: Arc<dyn ContainerRuntime>) -> MultiExtractor {
    let file: Box<dyn ProcfileExtractor> = Box::new(FileExtractor::new(runtime.clone()));
    let cmd: Box<dyn ProcfileExtractor> = Box::new(CmdExtractor::new(runtime));

    MultiExtractor {
        extractors: vec![file, cmd],
    }
}

/// Extracts the procfile of `image` and normalizes it into a formation.
///
/// A procfile in an unknown format is reported as a not-applicable
/// [`ProcfileError`](crate::ProcfileError) so callers composing extractions can fall back.
pub async fn extract_formation(
    extractor: &dyn ProcfileExtractor,
    image: &Reference,
    app: &App,
    cancel: &CancellationToken,
) -> MonoformResult<Formation> {
    let bytes = extractor.extract(image, cancel).await?;
    let procfile = Procfile::parse(&bytes)?;
    let formation = Formation::from_procfile(app, procfile)?;

    tracing::info!(image = %image, processes = formation.len(), "derived formation");
    Ok(formation)
}
