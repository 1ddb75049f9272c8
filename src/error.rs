//! Errors returned by collection calls.

use crate::catalog::Domain;
use crate::collector::CollectError;
use crate::config::ConfigError;
use crate::namespace::NamespaceParseError;
use std::fmt;

/// Error returned by the plugin facade. Every variant fails the whole call.
#[derive(Debug)]
pub enum PluginError {
    /// Namespace lacks the `intel/psutil` prefix or names no known domain.
    UnknownDomain { namespace: String },
    /// No template of the domain matches the request.
    UnknownStatistic { domain: Domain, namespace: String },
    /// A concrete resource id matched no enumerated resource.
    ResourceNotFound { domain: Domain, resource: String },
    /// The statistics source failed.
    Query(CollectError),
    /// Input is not a namespace at all.
    InvalidNamespace(NamespaceParseError),
    /// Configuration value is malformed.
    InvalidConfig(String),
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::UnknownDomain { namespace } => {
                write!(f, "unknown domain in namespace {}", namespace)
            }
            PluginError::UnknownStatistic { domain, namespace } => {
                write!(
                    f,
                    "requested statistic not available: {} ({})",
                    namespace, domain
                )
            }
            PluginError::ResourceNotFound { domain, resource } => {
                write!(f, "{} resource not found: {}", domain, resource)
            }
            PluginError::Query(e) => write!(f, "query failed: {}", e),
            PluginError::InvalidNamespace(e) => write!(f, "invalid namespace: {}", e),
            PluginError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for PluginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PluginError::Query(e) => Some(e),
            PluginError::InvalidNamespace(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CollectError> for PluginError {
    fn from(e: CollectError) -> Self {
        PluginError::Query(e)
    }
}

impl From<NamespaceParseError> for PluginError {
    fn from(e: NamespaceParseError) -> Self {
        PluginError::InvalidNamespace(e)
    }
}

impl From<ConfigError> for PluginError {
    fn from(e: ConfigError) -> Self {
        PluginError::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_unknown_statistic_message() {
        let err = PluginError::UnknownStatistic {
            domain: Domain::Vm,
            namespace: "/intel/psutil/vm/wired".into(),
        };
        assert_eq!(
            err.to_string(),
            "requested statistic not available: /intel/psutil/vm/wired (vm)"
        );
    }

    #[test]
    fn test_query_keeps_source() {
        let err: PluginError = CollectError::Io {
            path: "/proc/stat".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        }
        .into();
        assert!(err.to_string().contains("/proc/stat"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_config_error() {
        let err: PluginError = "|".parse::<crate::config::DiskFilter>().unwrap_err().into();
        assert!(matches!(err, PluginError::InvalidConfig(msg) if msg.contains("mount_points")));
    }
}
