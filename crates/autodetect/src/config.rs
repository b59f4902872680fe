//! Configuration for capability detection.

use std::path::Path;
use std::time::Duration;

use opkit_core::GroupVersionKind;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default time between detection ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(120);

const ENV_INTERVAL_SECS: &str = "OPKIT_AUTODETECT_INTERVAL_SECS";
const ENV_EXIT_ON_CHANGE: &str = "OPKIT_AUTODETECT_EXIT_ON_CHANGE";

/// What to detect and how often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Kinds whose availability is tracked.
    #[serde(with = "kinds", default)]
    pub group_version_kinds: Vec<GroupVersionKind>,

    /// Time between ticks, in seconds.
    #[serde(with = "duration_secs", default = "default_interval")]
    pub interval: Duration,

    /// Terminate the process when a tracked kind appears or disappears.
    #[serde(default)]
    pub exit_on_change: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            group_version_kinds: Vec::new(),
            interval: DEFAULT_INTERVAL,
            exit_on_change: false,
        }
    }
}

impl DetectConfig {
    /// Track `kinds` with default settings.
    pub fn new(kinds: impl IntoIterator<Item = GroupVersionKind>) -> Self {
        Self {
            group_version_kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Track one more kind.
    #[must_use]
    pub fn with_kind(mut self, gvk: GroupVersionKind) -> Self {
        self.group_version_kinds.push(gvk);
        self
    }

    /// Set the tick interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set whether a transition terminates the process.
    #[must_use]
    pub const fn with_exit_on_change(mut self, exit_on_change: bool) -> Self {
        self.exit_on_change = exit_on_change;
        self
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the document is not valid TOML or does
    /// not match the config shape.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Ok(Self::from_toml_str(&content)?.with_env_overrides())
    }

    /// Apply `OPKIT_AUTODETECT_*` environment overrides.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secs) = lookup(ENV_INTERVAL_SECS).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.interval = Duration::from_secs(secs);
        }

        if let Some(value) = lookup(ENV_EXIT_ON_CHANGE) {
            match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.exit_on_change = true,
                "0" | "false" | "no" => self.exit_on_change = false,
                _ => {}
            }
        }

        self
    }
}

const fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

/// Serialization helper for kind lists as `{group, version, kind}` tables.
///
/// `group` may be omitted for the core group.
mod kinds {
    use opkit_core::GroupVersionKind;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Entry {
        #[serde(default)]
        group: String,
        version: String,
        kind: String,
    }

    pub fn serialize<S: Serializer>(kinds: &[GroupVersionKind], serializer: S) -> Result<S::Ok, S::Error> {
        kinds
            .iter()
            .map(|gvk| Entry {
                group: gvk.group.clone(),
                version: gvk.version.clone(),
                kind: gvk.kind.clone(),
            })
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<GroupVersionKind>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| GroupVersionKind::gvk(&e.group, &e.version, &e.kind))
            .collect())
    }
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DetectConfig::default();
        assert_eq!(config.interval, Duration::from_secs(120));
        assert!(!config.exit_on_change);
        assert!(config.group_version_kinds.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = DetectConfig::new([GroupVersionKind::gvk("maistra.io", "v2", "ServiceMeshControlPlane")])
            .with_kind(GroupVersionKind::gvk("route.openshift.io", "v1", "Route"))
            .with_interval(Duration::from_secs(30))
            .with_exit_on_change(true);

        assert_eq!(config.group_version_kinds.len(), 2);
        assert_eq!(config.interval, Duration::from_secs(30));
        assert!(config.exit_on_change);
    }

    #[test]
    fn test_from_toml_str() {
        let config = DetectConfig::from_toml_str(
            r#"
            interval = 45
            exit_on_change = true

            [[group_version_kinds]]
            group = "maistra.io"
            version = "v2"
            kind = "ServiceMeshControlPlane"

            [[group_version_kinds]]
            version = "v1"
            kind = "ConfigMap"
            "#,
        )
        .unwrap();

        assert_eq!(config.interval, Duration::from_secs(45));
        assert!(config.exit_on_change);
        assert_eq!(
            config.group_version_kinds,
            vec![
                GroupVersionKind::gvk("maistra.io", "v2", "ServiceMeshControlPlane"),
                GroupVersionKind::gvk("", "v1", "ConfigMap"),
            ]
        );
    }

    #[test]
    fn test_from_toml_str_defaults() {
        let config = DetectConfig::from_toml_str("").unwrap();
        assert_eq!(config, DetectConfig::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = DetectConfig::from_toml_str("interval = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval = 10").unwrap();

        let config = DetectConfig::from_file(file.path()).unwrap();
        // Environment overrides may apply on top; the file value is the floor.
        assert!(config.interval > Duration::ZERO);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DetectConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_INTERVAL_SECS, "5"),
            (ENV_EXIT_ON_CHANGE, "true"),
        ]);
        let config = DetectConfig::default().with_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.interval, Duration::from_secs(5));
        assert!(config.exit_on_change);
    }

    #[test]
    fn test_unparseable_overrides_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_INTERVAL_SECS, "two minutes"),
            (ENV_EXIT_ON_CHANGE, "maybe"),
        ]);
        let config = DetectConfig::default()
            .with_exit_on_change(true)
            .with_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert!(config.exit_on_change);
    }
}
