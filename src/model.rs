use serde::{Deserialize, Serialize};
use std::fmt;

/// A `name@version` pair pinned in the lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String, // may be scoped, e.g. "@babel/core"
    pub version: String,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Publication time of one package version, or the reason it is missing.
///
/// Serialized as a single string: the raw ISO-8601 text for
/// [`ReleaseTimestamp::Published`], `"Unknown"` or `"Error"` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReleaseTimestamp {
    /// Raw timestamp text as published by the registry.
    Published(String),
    /// The registry answered but has no time entry for this version.
    Unknown,
    /// The lookup failed (network, status, body).
    Error,
}

impl ReleaseTimestamp {
    pub const UNKNOWN: &'static str = "Unknown";
    pub const ERROR: &'static str = "Error";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Published(raw) => raw,
            Self::Unknown => Self::UNKNOWN,
            Self::Error => Self::ERROR,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Published(_))
    }
}

impl From<String> for ReleaseTimestamp {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Unknown" => Self::Unknown,
            "Error" => Self::Error,
            _ => Self::Published(raw),
        }
    }
}

impl From<ReleaseTimestamp> for String {
    fn from(ts: ReleaseTimestamp) -> Self {
        match ts {
            ReleaseTimestamp::Published(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReleaseTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    #[serde(rename = "package")]
    pub name: String,
    pub version: String,
    pub release_date: ReleaseTimestamp,
}

impl PackageRecord {
    pub fn new(package: &PackageRef, release_date: ReleaseTimestamp) -> Self {
        Self {
            name: package.name.clone(),
            version: package.version.clone(),
            release_date,
        }
    }

    /// Record standing in for a lookup that never produced a result.
    pub fn error(package: &PackageRef) -> Self {
        Self::new(package, ReleaseTimestamp::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub cutoff_date: String,
    pub total_packages: usize,
    pub packages_after_date: usize,
    pub packages: Vec<PackageRecord>,
}

impl Report {
    /// Assembles the report, newest first.
    ///
    /// Ordering compares the raw timestamp strings, which is only a true
    /// chronological order when every timestamp shares the registry's format.
    pub fn build(
        cutoff_date: &str,
        total_packages: usize,
        mut packages: Vec<PackageRecord>,
    ) -> Self {
        packages.sort_by(|a, b| b.release_date.as_str().cmp(a.release_date.as_str()));

        Self {
            cutoff_date: cutoff_date.to_string(),
            total_packages,
            packages_after_date: packages.len(),
            packages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, ts: &str) -> PackageRecord {
        PackageRecord::new(&PackageRef::new(name, "1.0.0"), ts.to_string().into())
    }

    #[test]
    fn test_sentinels_parse_from_strings() {
        assert_eq!(
            ReleaseTimestamp::from("Unknown".to_string()),
            ReleaseTimestamp::Unknown
        );
        assert_eq!(
            ReleaseTimestamp::from("Error".to_string()),
            ReleaseTimestamp::Error
        );
        assert!(!ReleaseTimestamp::from("2024-01-01T00:00:00.000Z".to_string()).is_sentinel());
    }

    #[test]
    fn test_record_serializes_with_report_field_names() {
        let rec = record("react", "2024-06-15T10:30:00.000Z");
        let json = serde_json::to_value(&rec).unwrap();

        assert_eq!(json["package"], "react");
        assert_eq!(json["version"], "1.0.0");
        assert_eq!(json["release_date"], "2024-06-15T10:30:00.000Z");
    }

    #[test]
    fn test_record_without_release_date_is_rejected() {
        let result: Result<PackageRecord, _> =
            serde_json::from_str(r#"{"package": "react", "version": "18.2.0"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_report_sorts_descending_by_raw_string() {
        let report = Report::build(
            "2024-01-01",
            5,
            vec![
                record("react", "2024-06-15T10:30:00.000Z"),
                record("axios", "2024-08-01T12:00:00.000Z"),
                record("vite", "2024-07-01T00:00:00.000Z"),
            ],
        );

        let names: Vec<_> = report.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["axios", "vite", "react"]);
        assert_eq!(report.total_packages, 5);
        assert_eq!(report.packages_after_date, 3);
    }

    #[test]
    fn test_package_ref_display() {
        assert_eq!(
            PackageRef::new("@babel/core", "7.27.4").to_string(),
            "@babel/core@7.27.4"
        );
    }
}
