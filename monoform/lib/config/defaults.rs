//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The registry used for image references that do not name one.
pub const DEFAULT_OCI_REGISTRY: &str = "docker.io";

/// The namespace single-segment repositories are placed under.
pub const DEFAULT_OCI_REFERENCE_REPO_NAMESPACE: &str = "library";

/// The tag used for image references that do not name one.
pub const DEFAULT_OCI_REFERENCE_TAG: &str = "latest";

/// The name of the procfile looked up in an image's working directory.
pub const DEFAULT_PROCFILE_NAME: &str = "Procfile";

/// The directory the procfile is looked up in when the image has no working directory.
pub const DEFAULT_WORKING_DIR: &str = "/";

/// The most bytes of a copied archive that are buffered before it is rejected.
pub const DEFAULT_MAX_ARCHIVE_SIZE: usize = 16 * 1024 * 1024;
