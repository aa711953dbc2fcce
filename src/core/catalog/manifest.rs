// ─── Client Manifest ───
// Maps archive keys (`<year>-<part>.zip`) to destination folders relative to
// the client install folder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{InstallerError, InstallerResult};

/// Every manifest key names a zip archive.
pub const ARCHIVE_SUFFIX: &str = ".zip";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, String>);

impl Manifest {
    /// Validate a raw command response as a manifest.
    ///
    /// The value must be an object whose keys end with [`ARCHIVE_SUFFIX`]
    /// and whose values are strings that stay inside the client folder.
    pub fn from_value(command: &str, value: Value) -> InstallerResult<Self> {
        let Value::Object(object) = value else {
            return Err(InstallerError::validation(
                command,
                format!("expected an object, got {}", json_kind(&value)),
            ));
        };

        let mut entries = BTreeMap::new();
        for (key, destination) in object {
            if !key.ends_with(ARCHIVE_SUFFIX) {
                return Err(InstallerError::validation(
                    command,
                    format!("manifest key {key:?} does not end with {ARCHIVE_SUFFIX}"),
                ));
            }
            let Value::String(destination) = destination else {
                return Err(InstallerError::validation(
                    command,
                    format!("destination of {key:?} is not a string"),
                ));
            };
            if escapes_folder(&destination) {
                return Err(InstallerError::validation(
                    command,
                    format!("destination of {key:?} leaves the client folder: {destination:?}"),
                ));
            }
            entries.insert(key, destination);
        }

        Ok(Self(entries))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn destination(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `..` segments and drive prefixes would let an archive land outside the
/// client folder. Leading separators are fine, they are trimmed on join.
fn escapes_folder(destination: &str) -> bool {
    destination
        .split(['/', '\\'])
        .any(|segment| segment == ".." || segment.contains(':'))
}

/// Name under which an archive is stored once downloaded: `<version>-<key>`.
pub fn archive_name(version: &str, key: &str) -> String {
    format!("{version}-{key}")
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
