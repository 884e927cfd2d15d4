use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{formation::Protocol, MonoformError, MonoformResult, ProcfileError};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A process definition document in one of its two surface formats.
///
/// The format is never declared by the document; it is discriminated from the shape of the
/// top-level mapping values when parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Procfile {
    /// `name: command line` entries.
    Standard(StandardProcfile),

    /// `name: { command, expose }` entries.
    Extended(ExtendedProcfile),
}

/// Maps a process name to its command line.
pub type StandardProcfile = BTreeMap<String, String>;

/// Maps a process name to its structured entry.
pub type ExtendedProcfile = BTreeMap<String, ExtendedProcess>;

/// A structured procfile entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtendedProcess {
    /// The command, either as a single line or as pre-split arguments.
    pub command: CommandSpec,

    /// The exposure declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose: Option<ExposeSpec>,
}

/// The two accepted shapes of the `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// A command line that still has to be word split.
    Line(String),

    /// An argument list used as is.
    Args(Vec<String>),
}

/// The `expose` block of an extended entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposeSpec {
    /// Whether the process is reachable from outside the private network.
    #[serde(default)]
    pub external: bool,

    /// The protocol the process is exposed with.
    #[serde(default)]
    pub protocol: Protocol,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Procfile {
    /// Parses raw procfile bytes and discriminates the surface format.
    ///
    /// A document whose top-level mapping holds only strings is [`Procfile::Standard`]; one that
    /// holds only mappings is [`Procfile::Extended`]. Anything else, including invalid yaml and
    /// empty documents, is [`ProcfileError::UnknownFormat`].
    pub fn parse(bytes: &[u8]) -> MonoformResult<Self> {
        let document: Value = match serde_yaml::from_slice(bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(error = %e, "procfile is not valid yaml");
                return Err(ProcfileError::UnknownFormat.into());
            }
        };

        let Value::Mapping(entries) = document else {
            return Err(ProcfileError::UnknownFormat.into());
        };

        if entries.is_empty() {
            return Err(ProcfileError::UnknownFormat.into());
        }

        if entries.values().all(Value::is_string) {
            return Ok(Self::Standard(parse_standard(entries)?));
        }

        if entries.values().all(Value::is_mapping) {
            return Ok(Self::Extended(parse_extended(entries)?));
        }

        Err(ProcfileError::UnknownFormat.into())
    }

    /// Serializes the procfile back into its yaml surface.
    pub fn to_yaml(&self) -> MonoformResult<String> {
        let yaml = match self {
            Self::Standard(entries) => serde_yaml::to_string(entries)?,
            Self::Extended(entries) => serde_yaml::to_string(entries)?,
        };

        Ok(yaml)
    }
}

impl ExtendedProcess {
    /// Creates an entry from pre-split arguments with no exposure.
    pub fn with_args(args: Vec<String>) -> Self {
        Self {
            command: CommandSpec::Args(args),
            expose: None,
        }
    }

    fn from_value(value: Value) -> MonoformResult<Self> {
        let Value::Mapping(mut fields) = value else {
            return Err(MonoformError::MalformedProcfile(
                "process entry must be a mapping".into(),
            ));
        };

        let command = match fields.remove("command") {
            Some(Value::String(line)) => CommandSpec::Line(line),
            Some(Value::Sequence(items)) => CommandSpec::Args(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::String(arg) => Ok(arg),
                        _ => Err(MonoformError::MalformedProcfile(format!(
                            "command element {i} is not a string"
                        ))),
                    })
                    .collect::<MonoformResult<_>>()?,
            ),
            Some(_) => {
                return Err(MonoformError::MalformedProcfile(
                    "command must be a string or a list of strings".into(),
                ))
            }
            None => {
                return Err(MonoformError::MalformedProcfile(
                    "missing `command` field".into(),
                ))
            }
        };

        let expose = match fields.remove("expose") {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_yaml::from_value::<ExposeSpec>(value).map_err(|e| {
                MonoformError::MalformedProcfile(format!("invalid `expose` block: {e}"))
            })?),
        };

        Ok(Self { command, expose })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn process_name(key: Value) -> MonoformResult<String> {
    match key {
        Value::String(name) => Ok(name),
        other => Err(MonoformError::MalformedProcfile(format!(
            "process name must be a string, got {other:?}"
        ))),
    }
}

fn parse_standard(entries: Mapping) -> MonoformResult<StandardProcfile> {
    entries
        .into_iter()
        .map(|(key, value)| {
            let name = process_name(key)?;
            match value {
                Value::String(line) => Ok((name, line)),
                _ => Err(MonoformError::invalid_process(
                    name,
                    MonoformError::MalformedProcfile("command must be a string".into()),
                )),
            }
        })
        .collect()
}

fn parse_extended(entries: Mapping) -> MonoformResult<ExtendedProcfile> {
    entries
        .into_iter()
        .map(|(key, value)| {
            let name = process_name(key)?;
            match ExtendedProcess::from_value(value) {
                Ok(process) => Ok((name, process)),
                Err(e) => Err(MonoformError::invalid_process(name, e)),
            }
        })
        .collect()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
