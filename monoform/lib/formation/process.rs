use std::{fmt, str::FromStr};

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::{formation::Command, App, MonoformError};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A named, runnable unit of a formation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Process {
    /// The command the process runs.
    command: Command,

    /// How the process is reachable from the network, if at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expose: Option<Exposure>,
}

/// Network reachability of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct Exposure {
    /// Whether the process is reachable from outside the private network.
    #[getset(get_copy = "pub with_prefix")]
    external: bool,

    /// The protocol the process is exposed with.
    #[getset(get_copy = "pub with_prefix")]
    protocol: Protocol,

    /// The certificate terminating TLS for the process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[getset(get = "pub with_prefix")]
    cert: Option<String>,
}

/// The protocol a process is exposed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Protocol {
    /// Plain HTTP.
    #[default]
    Http,

    /// HTTP over TLS.
    Https,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Process {
    /// Creates a new process.
    pub fn new(command: Command, expose: Option<Exposure>) -> Self {
        Self { command, expose }
    }
}

impl Exposure {
    /// Creates a new exposure.
    pub fn new(external: bool, protocol: Protocol, cert: Option<String>) -> Self {
        Self {
            external,
            protocol,
            cert,
        }
    }

    /// The exposure implied for the `web` process of a standard procfile.
    ///
    /// The process is external iff the application is public, and served over https iff the
    /// application has a certificate.
    pub fn default_web(app: &App) -> Self {
        let cert = app.cert().map(str::to_string);
        let protocol = if cert.is_some() {
            Protocol::Https
        } else {
            Protocol::Http
        };

        Self {
            external: app.is_public(),
            protocol,
            cert,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for Protocol {
    type Err = MonoformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(MonoformError::MalformedProcfile(format!(
                "unsupported protocol `{s}`"
            ))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = MonoformError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        protocol.to_string()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
