//! Runtime-tunable knobs for the envelope codec, with environment-variable
//! overrides in the manner of the teacher's `system_env`-style configuration
//! readers: defaults baked in, an explicit opt-in overlay, fail fast on a
//! malformed override rather than silently falling back.

use std::env;

use thiserror::Error;

use crate::compression::CompressionRegistry;

const MIN_COMPRESS_SIZE_VAR: &str = "DISTWIRE_MIN_COMPRESS_SIZE";
const COMPRESSION_RATIO_THRESHOLD_VAR: &str = "DISTWIRE_COMPRESSION_RATIO_THRESHOLD";
const SPLIT_THRESHOLD_VAR: &str = "DISTWIRE_SPLIT_THRESHOLD";
const DEFAULT_COMPRESSION_VAR: &str = "DISTWIRE_DEFAULT_COMPRESSION";

/// An environment variable named a value that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("environment variable {var} has an invalid value: {value:?}")]
pub struct ConfigError {
    /// The variable that was read.
    pub var: &'static str,
    /// The value it held.
    pub value: String,
}

/// Tunables for the compression and splitting policies (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Frames smaller than this are never compressed.
    pub min_compress_size: usize,
    /// A compressed frame must shrink by at least this fraction to be kept.
    pub compression_ratio_threshold: f64,
    /// Frames larger than this are split before compression.
    pub split_threshold: usize,
    /// The codec tried first when a frame is large enough to compress.
    pub default_compression: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_compress_size: 10_240,
            compression_ratio_threshold: 0.1,
            split_threshold: 64 * 1024 * 1024,
            default_compression: CompressionRegistry::with_builtins().preferred_default(),
        }
    }
}

impl Config {
    /// Overlay `DISTWIRE_*` environment variables onto [`Config::default`].
    ///
    /// A variable that is set but unparsable is a `ConfigError`; an unset
    /// variable leaves the default untouched.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = read_var(MIN_COMPRESS_SIZE_VAR)? {
            config.min_compress_size =
                value.parse().map_err(|_| invalid(MIN_COMPRESS_SIZE_VAR, &value))?;
        }
        if let Some(value) = read_var(COMPRESSION_RATIO_THRESHOLD_VAR)? {
            config.compression_ratio_threshold =
                value.parse().map_err(|_| invalid(COMPRESSION_RATIO_THRESHOLD_VAR, &value))?;
        }
        if let Some(value) = read_var(SPLIT_THRESHOLD_VAR)? {
            config.split_threshold =
                value.parse().map_err(|_| invalid(SPLIT_THRESHOLD_VAR, &value))?;
        }
        if let Some(value) = read_var(DEFAULT_COMPRESSION_VAR)? {
            config.default_compression = if value.is_empty() { None } else { Some(value) };
        }

        Ok(config)
    }
}

fn read_var(name: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(invalid(name, "<non-unicode>")),
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError { var, value: value.to_owned() }
}
