//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const ENDPOINT_ENV_KEY: &str = "GEOGLOWS_ENDPOINT";
pub const API_KEY_ENV_KEY: &str = "GEOGLOWS_API_KEY";
pub const TIMEOUT_ENV_KEY: &str = "GEOGLOWS_TIMEOUT_SECS";
pub const METADATA_TABLE_ENV_KEY: &str = "GEOGLOWS_METADATA_TABLE_PATH";
pub const METADATA_TABLE_URL_ENV_KEY: &str = "GEOGLOWS_METADATA_TABLE_URL";

pub const DEFAULT_METADATA_TABLE_URL: &str =
    "https://geoglows-v2.s3-us-west-2.amazonaws.com/tables/metadata-table.csv";

const METADATA_TABLE_FILE: &str = "metadata-table.csv";

/// Where the river metadata table is cached and where it is downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    pub path: PathBuf,
    pub url: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: default_metadata_table_path(),
            url: DEFAULT_METADATA_TABLE_URL.to_string(),
        }
    }
}

impl MetadataConfig {
    /// Read `GEOGLOWS_METADATA_TABLE_PATH` and `GEOGLOWS_METADATA_TABLE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(path) = lookup(METADATA_TABLE_ENV_KEY).filter(|p| !p.trim().is_empty()) {
            cfg.path = PathBuf::from(path);
        }
        if let Some(url) = lookup(METADATA_TABLE_URL_ENV_KEY).filter(|u| !u.trim().is_empty()) {
            cfg.url = url;
        }
        cfg
    }
}

/// `<user cache dir>/geoglows/metadata-table.csv`, or the working directory when the
/// platform has no cache dir.
pub fn default_metadata_table_path() -> PathBuf {
    match dirs::cache_dir() {
        Some(dir) => dir.join("geoglows").join(METADATA_TABLE_FILE),
        None => PathBuf::from(METADATA_TABLE_FILE),
    }
}

pub(crate) fn parse_timeout(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            (METADATA_TABLE_ENV_KEY, "/tmp/tables/meta.csv"),
            (METADATA_TABLE_URL_ENV_KEY, "http://127.0.0.1:1/meta.csv"),
        ]
        .into_iter()
        .collect();
        let cfg = MetadataConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.path, PathBuf::from("/tmp/tables/meta.csv"));
        assert_eq!(cfg.url, "http://127.0.0.1:1/meta.csv");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let cfg = MetadataConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(cfg, MetadataConfig::default());
        assert!(cfg.path.ends_with(METADATA_TABLE_FILE));
    }

    #[test]
    fn timeouts() {
        assert_eq!(parse_timeout("2.5"), Some(Duration::from_millis(2500)));
        assert_eq!(parse_timeout("0"), None);
        assert_eq!(parse_timeout("soon"), None);
    }
}
