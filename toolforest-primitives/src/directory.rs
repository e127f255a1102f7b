//! Directory records describing deployed toolsets.

use serde::{Deserialize, Serialize};

use crate::Result;

/// One deployed toolset, as written to the service directory at deploy time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Stable toolset identifier.
    pub toolset_id: String,
    /// Toolset name; becomes the proxy namespace prefix.
    pub name: String,
    /// Base endpoint reference of the deployed function.
    pub lambda_function_arn: String,
    /// Alias (usually the environment name).
    #[serde(default)]
    pub alias: String,
    /// Alias-qualified endpoint reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_arn: Option<String>,
    /// Deployed version.
    #[serde(default)]
    pub version: String,
    /// Manifest version recorded at deploy time, possibly empty.
    #[serde(default)]
    pub manifest_version: String,
}

impl DirectoryEntry {
    /// Decodes an entry from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidDirectoryEntry`] when the value is not a
    /// JSON object with the required keys.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Returns the endpoint to call, preferring the alias-qualified reference.
    #[must_use]
    pub fn endpoint_ref(&self) -> &str {
        self.alias_arn
            .as_deref()
            .filter(|arn| !arn.trim().is_empty())
            .unwrap_or(&self.lambda_function_arn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_alias_reference() {
        let entry = DirectoryEntry::from_json(
            r#"{"toolset_id":"math","name":"math","lambda_function_arn":"fn:math",
                "alias":"dev","alias_arn":"fn:math:dev","version":"3","manifest_version":""}"#,
        )
        .unwrap();
        assert_eq!(entry.endpoint_ref(), "fn:math:dev");
        assert_eq!(entry.alias, "dev");
    }

    #[test]
    fn falls_back_to_base_reference() {
        let entry = DirectoryEntry::from_json(
            r#"{"toolset_id":"math","name":"math","lambda_function_arn":"fn:math","alias_arn":""}"#,
        )
        .unwrap();
        assert_eq!(entry.endpoint_ref(), "fn:math");
        assert!(entry.version.is_empty());
    }

    #[test]
    fn rejects_records_without_endpoint() {
        let err = DirectoryEntry::from_json(r#"{"toolset_id":"math","name":"math"}"#)
            .expect_err("missing endpoint");
        assert!(matches!(err, crate::Error::InvalidDirectoryEntry { .. }));
        assert!(DirectoryEntry::from_json("not json").is_err());
    }
}
