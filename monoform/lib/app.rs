use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The read-only application defaults consulted when a formation is derived.
///
/// ## Examples
///
/// ```
/// use monoform::{App, ExposurePolicy};
///
/// let app = App::builder()
///     .exposure(ExposurePolicy::Public)
///     .cert("cert-1")
///     .build();
///
/// assert!(app.is_public());
/// assert_eq!(app.cert(), Some("cert-1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
pub struct App {
    /// The default exposure of the application's web process.
    #[builder(default)]
    #[serde(default)]
    #[getset(get = "pub with_prefix")]
    exposure: ExposurePolicy,

    /// The certificate attached to the application's exposed processes.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    cert: Option<String>,
}

/// Whether an application is reachable from the public internet by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposurePolicy {
    /// Reachable from the public internet.
    Public,

    /// Reachable only from the private network.
    #[default]
    Private,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl App {
    /// The certificate identifier, if one is set and non-empty.
    pub fn cert(&self) -> Option<&str> {
        self.cert.as_deref().filter(|cert| !cert.is_empty())
    }

    /// Returns `true` if the application is public by default.
    pub fn is_public(&self) -> bool {
        self.exposure == ExposurePolicy::Public
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
