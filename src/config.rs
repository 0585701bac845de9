//! Container options.
//!
//! Options can be set in code, read from `FERROUS_INJECT_*` environment
//! variables, or (with the `config` feature) deserialized from JSON.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default recursion limit for one resolution graph.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Environment prefix read by [`ContainerOptions::from_env`].
pub const ENV_PREFIX: &str = "FERROUS_INJECT";

/// Behaviour switches for containers built by a `ContainerBuilder`.
///
/// # Examples
///
/// ```
/// use ferrous_inject::ContainerOptions;
///
/// let options = ContainerOptions::default();
/// assert!(!options.create_if_not_found);
/// assert!(options.eager_singletons);
/// assert_eq!(options.max_depth, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Build unregistered concrete types that were scanned with a
    /// construction path, as implicit transients
    pub create_if_not_found: bool,
    /// Construct non-lazy singletons during `build()`
    pub eager_singletons: bool,
    /// Deepest nesting allowed inside one resolution. Each level costs a few
    /// KiB of stack in debug builds, so large values need a larger stack.
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            create_if_not_found: false,
            eager_singletons: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ContainerOptions {
    /// Defaults overridden by `FERROUS_INJECT_CREATE_IF_NOT_FOUND`,
    /// `FERROUS_INJECT_EAGER_SINGLETONS` and `FERROUS_INJECT_MAX_DEPTH`.
    pub fn from_env() -> DiResult<Self> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable prefix.
    pub fn from_env_with_prefix(prefix: &str) -> DiResult<Self> {
        let mut options = Self::default();
        if let Some(value) = read_var(prefix, "CREATE_IF_NOT_FOUND")? {
            options.create_if_not_found = value;
        }
        if let Some(value) = read_var(prefix, "EAGER_SINGLETONS")? {
            options.eager_singletons = value;
        }
        if let Some(value) = read_var(prefix, "MAX_DEPTH")? {
            options.max_depth = value;
        }
        options.validate()?;
        Ok(options)
    }

    /// Parses options from a JSON document; missing fields keep their defaults.
    ///
    /// ```
    /// use ferrous_inject::ContainerOptions;
    ///
    /// let options = ContainerOptions::from_json(r#"{ "create_if_not_found": true }"#).unwrap();
    /// assert!(options.create_if_not_found);
    /// assert_eq!(options.max_depth, 128);
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| DiError::InvalidArgument(format!("invalid container options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Reads a JSON options file.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> DiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DiError::InvalidArgument(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub(crate) fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::InvalidArgument("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

fn read_var<T>(prefix: &str, name: &str) -> DiResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{}_{}", prefix.to_uppercase(), name);
    match env::var(&key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DiError::InvalidArgument(format!("{}={:?}: {}", key, raw, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(DiError::InvalidArgument(format!("{}: {}", key, e))),
    }
}
