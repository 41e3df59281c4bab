//! Descriptor schema versions
//!
//! Every schema revision has a namespace URN and the location of its XSD.
//! The registry is built once on first access and read-only afterwards.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use once_cell::sync::Lazy;

/// Version written when no other schema is requested.
pub const SCHEMA_LATEST: &str = "3.12";

const NAMESPACE_PREFIX: &str = "urn:proactive:jobdescriptor:";
const LOCATION_PREFIX: &str = "http://www.activeeon.com/public_content/schemas/proactive/jobdescriptor/";
const SCHEMA_FILE: &str = "schedulerjob.xsd";

const VERSIONS: [&str; 14] = [
    "3.0", "3.1", "3.2", "3.3", "3.4", "3.5", "3.6", "3.7", "3.8", "3.9", "3.10", "3.11", "3.12",
    "dev",
];

/// One revision of the job descriptor schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    version: &'static str,
    namespace: String,
    location: String,
}

impl Schema {
    fn new(version: &'static str) -> Self {
        Self {
            version,
            namespace: format!("{}{}", NAMESPACE_PREFIX, version),
            location: format!("{}{}/{}", LOCATION_PREFIX, version, SCHEMA_FILE),
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Namespace URN, e.g. `urn:proactive:jobdescriptor:3.12`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// URL of the XSD file.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Value of the `xsi:schemaLocation` attribute.
    pub fn schema_location(&self) -> String {
        format!("{} {}", self.namespace, self.location)
    }

    pub fn is_dev(&self) -> bool {
        self.version == "dev"
    }

    /// Schema written by default.
    pub fn latest() -> &'static Schema {
        // SCHEMA_LATEST is one of VERSIONS
        &SCHEMAS[VERSIONS
            .iter()
            .position(|v| *v == SCHEMA_LATEST)
            .unwrap_or(VERSIONS.len() - 2)]
    }

    pub fn from_version(version: &str) -> Option<&'static Schema> {
        BY_VERSION.get(version.trim()).map(|&i| &SCHEMAS[i])
    }

    pub fn from_namespace(namespace: &str) -> Option<&'static Schema> {
        BY_NAMESPACE.get(namespace.trim()).map(|&i| &SCHEMAS[i])
    }

    /// Every known schema, oldest first, `dev` last.
    pub fn all() -> &'static [Schema] {
        &SCHEMAS
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace)
    }
}

static SCHEMAS: Lazy<Vec<Schema>> = Lazy::new(|| {
    debug!("Initializing descriptor schema registry ({} versions)", VERSIONS.len());
    VERSIONS.iter().map(|v| Schema::new(v)).collect()
});

static BY_VERSION: Lazy<HashMap<&'static str, usize>> =
    Lazy::new(|| SCHEMAS.iter().enumerate().map(|(i, s)| (s.version, i)).collect());

static BY_NAMESPACE: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    SCHEMAS
        .iter()
        .enumerate()
        .map(|(i, s)| (s.namespace.clone(), i))
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_schema() {
        let schema = Schema::latest();
        assert_eq!(schema.version(), SCHEMA_LATEST);
        assert_eq!(schema.namespace(), "urn:proactive:jobdescriptor:3.12");
        assert!(schema.location().ends_with("/3.12/schedulerjob.xsd"));
    }

    #[test]
    fn test_lookup_by_namespace_and_version() {
        let by_ns = Schema::from_namespace("urn:proactive:jobdescriptor:3.4").unwrap();
        let by_version = Schema::from_version("3.4").unwrap();
        assert_eq!(by_ns, by_version);

        assert!(Schema::from_version("2.9").is_none());
        assert!(Schema::from_namespace("urn:other").is_none());
    }

    #[test]
    fn test_dev_schema() {
        let dev = Schema::from_version("dev").unwrap();
        assert!(dev.is_dev());
        assert_eq!(dev.to_string(), "urn:proactive:jobdescriptor:dev");
    }

    #[test]
    fn test_schema_location_attribute() {
        let location = Schema::latest().schema_location();
        let parts: Vec<&str> = location.split(' ').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], Schema::latest().namespace());
    }

    #[test]
    fn test_registry_is_ordered() {
        let all = Schema::all();
        assert_eq!(all.first().unwrap().version(), "3.0");
        assert_eq!(all.last().unwrap().version(), "dev");
    }
}
