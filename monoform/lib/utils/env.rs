use std::env;

use crate::config::{DEFAULT_OCI_REGISTRY, DEFAULT_PROCFILE_NAME};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Environment variable overriding the registry used for references without one.
pub const OCI_REGISTRY_ENV_VAR: &str = "MONOFORM_OCI_REGISTRY";

/// Environment variable overriding the name of the procfile looked up in images.
pub const PROCFILE_NAME_ENV_VAR: &str = "MONOFORM_PROCFILE_NAME";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the registry used for image references that do not name one.
pub fn get_oci_registry() -> String {
    non_empty_var(OCI_REGISTRY_ENV_VAR).unwrap_or_else(|| DEFAULT_OCI_REGISTRY.to_string())
}

/// Returns the default name of the procfile looked up in images.
pub fn get_procfile_name() -> String {
    non_empty_var(PROCFILE_NAME_ENV_VAR).unwrap_or_else(|| DEFAULT_PROCFILE_NAME.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
