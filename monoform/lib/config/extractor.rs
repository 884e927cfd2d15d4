use std::sync::Arc;

use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    container::ContainerRuntime,
    extract::{CmdExtractor, FileExtractor, MultiExtractor, ProcfileExtractor},
    utils::get_procfile_name,
    MonoformError, MonoformResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Configuration of the procfile extraction chain.
///
/// ## Examples
///
/// ```
/// use monoform::config::{ExtractorConfig, ExtractorKind};
///
/// let config = ExtractorConfig::from_toml_str(r#"
///     procfile_name = "Procfile.production"
///     extractors = ["file"]
/// "#).unwrap();
///
/// assert_eq!(config.get_procfile_name(), "Procfile.production");
/// assert_eq!(config.get_extractors(), &[ExtractorKind::File]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ExtractorConfig {
    /// The name of the procfile looked up in the image's working directory.
    #[builder(default = get_procfile_name(), setter(into))]
    #[serde(default = "get_procfile_name")]
    procfile_name: String,

    /// The strategies to try, in order.
    #[builder(default = default_extractors())]
    #[serde(default = "default_extractors")]
    extractors: Vec<ExtractorKind>,
}

/// An extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Read the procfile from the image's filesystem.
    File,

    /// Synthesize a procfile from the image's default command.
    Cmd,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ExtractorConfig {
    /// Parses and validates a configuration from toml.
    pub fn from_toml_str(s: &str) -> MonoformResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| MonoformError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can be turned into an extraction chain.
    pub fn validate(&self) -> MonoformResult<()> {
        if self.procfile_name.trim().is_empty() {
            return Err(MonoformError::Config("procfile_name is empty".into()));
        }

        if self.extractors.is_empty() {
            return Err(MonoformError::EmptyExtractorChain);
        }

        Ok(())
    }

    /// Builds the configured extraction chain.
    pub fn build_extractor(
        &self,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> MonoformResult<MultiExtractor> {
        self.validate()?;

        let extractors = self
            .extractors
            .iter()
            .map(|kind| -> Box<dyn ProcfileExtractor> {
                match kind {
                    ExtractorKind::File => Box::new(FileExtractor::with_procfile_name(
                        runtime.clone(),
                        &self.procfile_name,
                    )),
                    ExtractorKind::Cmd => Box::new(CmdExtractor::new(runtime.clone())),
                }
            })
            .collect();

        MultiExtractor::new(extractors)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn default_extractors() -> Vec<ExtractorKind> {
    vec![ExtractorKind::File, ExtractorKind::Cmd]
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
