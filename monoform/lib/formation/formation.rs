use std::collections::{btree_map, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::{
    formation::{parse_command, Command, Exposure, Process},
    procfile::{CommandSpec, ExtendedProcfile, Procfile, StandardProcfile},
    App, MonoformError, MonoformResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The name of the process that receives implicit exposure in standard procfiles.
pub const WEB_PROCESS_TYPE: &str = "web";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The complete set of named processes an application runs.
///
/// A formation is built in one go. If any entry fails to normalize, no formation is produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Formation {
    processes: BTreeMap<String, Process>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Formation {
    /// Normalizes a parsed procfile into a formation.
    ///
    /// Standard entries get their command word split and only the `web` process is exposed,
    /// following the application defaults. Extended entries are exposed only when they declare
    /// an `expose` block, and always take their certificate from the application.
    pub fn from_procfile(app: &App, procfile: Procfile) -> MonoformResult<Self> {
        match procfile {
            Procfile::Standard(entries) => Self::from_standard(app, entries),
            Procfile::Extended(entries) => Self::from_extended(app, entries),
        }
    }

    /// Parses and normalizes raw procfile bytes.
    ///
    /// Unlike inside an extraction chain, a document in an unknown format is reported as
    /// malformed here since there is no other strategy to fall back to.
    pub fn from_procfile_bytes(app: &App, bytes: &[u8]) -> MonoformResult<Self> {
        let procfile = Procfile::parse(bytes).map_err(|e| match e {
            MonoformError::Procfile(reason) => MonoformError::MalformedProcfile(reason.to_string()),
            e => e,
        })?;

        Self::from_procfile(app, procfile)
    }

    /// Returns the process with the given name.
    pub fn get(&self, name: &str) -> Option<&Process> {
        self.processes.get(name)
    }

    /// Iterates over the processes ordered by name.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Process> {
        self.processes.iter()
    }

    /// The number of processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Returns `true` if the formation has no processes.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Consumes the formation, returning the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Process> {
        self.processes
    }

    fn from_standard(app: &App, entries: StandardProcfile) -> MonoformResult<Self> {
        let mut processes = BTreeMap::new();
        for (name, line) in entries {
            let command =
                parse_command(&line).map_err(|e| MonoformError::invalid_process(&name, e))?;

            let expose = (name == WEB_PROCESS_TYPE).then(|| Exposure::default_web(app));
            processes.insert(name, Process::new(command, expose));
        }

        Ok(Self { processes })
    }

    fn from_extended(app: &App, entries: ExtendedProcfile) -> MonoformResult<Self> {
        let mut processes = BTreeMap::new();
        for (name, entry) in entries {
            let command = match entry.command {
                CommandSpec::Line(line) => parse_command(&line),
                CommandSpec::Args(args) => Command::from_args(args),
            }
            .map_err(|e| MonoformError::invalid_process(&name, e))?;

            let expose = entry.expose.map(|e| {
                Exposure::new(e.external, e.protocol, app.cert().map(str::to_string))
            });

            processes.insert(name, Process::new(command, expose));
        }

        Ok(Self { processes })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<'a> IntoIterator for &'a Formation {
    type Item = (&'a String, &'a Process);
    type IntoIter = btree_map::Iter<'a, String, Process>;

    fn into_iter(self) -> Self::IntoIter {
        self.processes.iter()
    }
}

impl IntoIterator for Formation {
    type Item = (String, Process);
    type IntoIter = btree_map::IntoIter<String, Process>;

    fn into_iter(self) -> Self::IntoIter {
        self.processes.into_iter()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
