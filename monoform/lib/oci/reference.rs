use std::{fmt, str::FromStr, sync::LazyLock};

use getset::Getters;
use oci_spec::image::Digest;
use regex::Regex;

use crate::{
    config::{DEFAULT_OCI_REFERENCE_REPO_NAMESPACE, DEFAULT_OCI_REFERENCE_TAG},
    utils::get_oci_registry,
    MonoformError, MonoformResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

static REGISTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+(:[0-9]+)?$").unwrap());

static REPOSITORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]+(?:[._-][a-z0-9]+)*)(/[a-z0-9]+(?:[._-][a-z0-9]+)*)*$").unwrap()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w[\w.-]{0,127}$").unwrap());

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A reference to a container image, e.g. `docker.io/library/nginx:1.27`.
///
/// Missing parts are filled in when parsing: the registry defaults to [`get_oci_registry`], a
/// single-segment repository is placed under the `library` namespace and the tag defaults to
/// `latest`. A reference is never mutated once parsed.
///
/// ## Examples
///
/// ```
/// use monoform::oci::Reference;
///
/// let reference: Reference = "registry.example.com:5000/acme/api:v2".parse().unwrap();
/// assert_eq!(reference.get_registry(), "registry.example.com:5000");
/// assert_eq!(reference.get_repository(), "acme/api");
/// assert_eq!(reference.get_tag(), "v2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Reference {
    /// The registry hosting the image.
    registry: String,

    /// The repository within the registry.
    repository: String,

    /// The image tag.
    tag: String,

    /// The content digest pinning the image, if any.
    digest: Option<Digest>,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for Reference {
    type Err = MonoformError;

    /// Parses `[registry/]repository[:tag][@digest]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MonoformError::ImageReference("input string is empty".into()));
        }

        let (name, digest) = match s.split_once('@') {
            Some((name, digest)) => {
                let digest = digest.parse::<Digest>().map_err(|e| {
                    MonoformError::ImageReference(format!("invalid digest `{digest}`: {e}"))
                })?;
                (name, Some(digest))
            }
            None => (s, None),
        };

        let default_registry = get_oci_registry();
        let (registry, path) = split_registry(name, &default_registry);
        let (repository, tag) = split_repository_and_tag(path)?;

        validate(&REGISTRY_RE, "registry", &registry)?;
        validate(&REPOSITORY_RE, "repository", &repository)?;
        validate(&TAG_RE, "tag", &tag)?;

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)?;
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn validate(re: &Regex, part: &str, value: &str) -> MonoformResult<()> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(MonoformError::ImageReference(format!(
            "invalid {part}: {value}"
        )))
    }
}

/// The first path segment is a registry only if it looks like a host.
fn split_registry<'a>(name: &'a str, default_registry: &str) -> (String, &'a str) {
    match name.split_once('/') {
        Some((host, rest))
            if host.contains('.') || host.contains(':') || host == "localhost" =>
        {
            (host.to_string(), rest)
        }
        _ => (default_registry.to_string(), name),
    }
}

fn split_repository_and_tag(path: &str) -> MonoformResult<(String, String)> {
    let (repository, tag) = match path.rsplit_once(':') {
        Some((repository, tag)) => (repository, tag),
        None => (path, DEFAULT_OCI_REFERENCE_TAG),
    };

    if repository.is_empty() {
        return Err(MonoformError::ImageReference("repository is empty".into()));
    }

    let repository = if repository.contains('/') {
        repository.to_string()
    } else {
        format!("{}/{}", DEFAULT_OCI_REFERENCE_REPO_NAMESPACE, repository)
    };

    Ok((repository, tag.to_string()))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
