//! Collector configuration and the disk mount filter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only recognised configuration key.
pub const MOUNT_POINTS_KEY: &str = "mount_points";

/// Filter applied when no `mount_points` value is configured.
pub const DEFAULT_MOUNT_POINTS: &str = "physical";

/// Configuration attached to a request or to the collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// `*`/`all`, `physical`, or a `|`-separated list of mount points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_points: Option<String>,
}

impl CollectorConfig {
    pub fn with_mount_points(mount_points: impl Into<String>) -> Self {
        Self {
            mount_points: Some(mount_points.into()),
        }
    }

    /// Parses the configured disk filter, defaulting to physical partitions.
    pub fn disk_filter(&self) -> Result<DiskFilter, ConfigError> {
        match &self.mount_points {
            Some(value) => value.parse(),
            None => Ok(DiskFilter::Physical),
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.key, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Which mounted filesystems the disk domain reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiskFilter {
    /// Only filesystems backed by a block device.
    #[default]
    Physical,
    /// Every mounted filesystem, pseudo filesystems included.
    All,
    /// Mounts whose mount point equals one of the paths exactly.
    AllowList(Vec<String>),
}

impl DiskFilter {
    /// Returns true if the allow list, if any, admits `mountpoint`.
    pub fn admits(&self, mountpoint: &str) -> bool {
        match self {
            DiskFilter::Physical | DiskFilter::All => true,
            DiskFilter::AllowList(paths) => paths.iter().any(|p| p == mountpoint),
        }
    }
}

impl FromStr for DiskFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "*" | "all" => Ok(DiskFilter::All),
            "physical" => Ok(DiskFilter::Physical),
            _ => {
                // Mount points may contain spaces, so pieces are kept verbatim
                let paths: Vec<String> = s
                    .split('|')
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect();
                if paths.is_empty() {
                    return Err(ConfigError {
                        key: MOUNT_POINTS_KEY,
                        message: format!("'{}' names no mount point", s),
                    });
                }
                Ok(DiskFilter::AllowList(paths))
            }
        }
    }
}

impl fmt::Display for DiskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskFilter::Physical => f.write_str("physical"),
            DiskFilter::All => f.write_str("all"),
            DiskFilter::AllowList(paths) => f.write_str(&paths.join("|")),
        }
    }
}

/// One accepted configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRule {
    pub key: &'static str,
    pub required: bool,
    pub default: &'static str,
    pub description: &'static str,
}

/// Configuration keys the collector accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigPolicy {
    pub rules: Vec<ConfigRule>,
}

impl ConfigPolicy {
    pub fn new() -> Self {
        Self {
            rules: vec![ConfigRule {
                key: MOUNT_POINTS_KEY,
                required: false,
                default: DEFAULT_MOUNT_POINTS,
                description: "mount points reported by the disk metrics: '*' or 'all' for \
                              every filesystem, 'physical' for block devices only, or a \
                              '|'-separated list of mount points",
            }],
        }
    }
}

impl Default for ConfigPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_filter_keywords() {
        assert_eq!("*".parse::<DiskFilter>().unwrap(), DiskFilter::All);
        assert_eq!("all".parse::<DiskFilter>().unwrap(), DiskFilter::All);
        assert_eq!(
            "physical".parse::<DiskFilter>().unwrap(),
            DiskFilter::Physical
        );
        assert_eq!(" all ".parse::<DiskFilter>().unwrap(), DiskFilter::All);
    }

    #[test]
    fn test_disk_filter_allow_list() {
        let filter: DiskFilter = "/|/var|/home||".parse().unwrap();
        assert_eq!(
            filter,
            DiskFilter::AllowList(vec!["/".into(), "/var".into(), "/home".into()])
        );
        assert!(filter.admits("/var"));
        assert!(!filter.admits("/var/log"));
    }

    #[test]
    fn test_disk_filter_allow_list_matches_verbatim() {
        let filter: DiskFilter = "/| /home|/mnt/backup ".parse().unwrap();
        assert_eq!(
            filter,
            DiskFilter::AllowList(vec!["/".into(), " /home".into(), "/mnt/backup ".into()])
        );
        assert!(!filter.admits("/home"));
        assert!(filter.admits(" /home"));
        assert!(!filter.admits("/mnt/backup"));
        assert!(filter.admits("/mnt/backup "));
    }

    #[test]
    fn test_disk_filter_single_path() {
        // A path that merely contains a keyword is still a path
        let filter: DiskFilter = "/mnt/all".parse().unwrap();
        assert_eq!(filter, DiskFilter::AllowList(vec!["/mnt/all".into()]));
    }

    #[test]
    fn test_disk_filter_rejects_empty_list() {
        let err = "||".parse::<DiskFilter>().unwrap_err();
        assert_eq!(err.key, MOUNT_POINTS_KEY);
        assert!("".parse::<DiskFilter>().is_err());
    }

    #[test]
    fn test_config_default_is_physical() {
        let config = CollectorConfig::default();
        assert_eq!(config.disk_filter().unwrap(), DiskFilter::Physical);
    }

    #[test]
    fn test_config_deserialize() {
        let config: CollectorConfig =
            serde_json::from_str(r#"{"mount_points": "/|/boot"}"#).unwrap();
        assert_eq!(
            config.disk_filter().unwrap(),
            DiskFilter::AllowList(vec!["/".into(), "/boot".into()])
        );

        let empty: CollectorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, CollectorConfig::default());
    }

    #[test]
    fn test_config_policy() {
        let policy = ConfigPolicy::new();
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].key, "mount_points");
        assert!(!policy.rules[0].required);
        assert_eq!(policy.rules[0].default, "physical");
    }
}
