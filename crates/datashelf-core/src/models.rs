//! Dataset record type.
//!
//! A dataset is a free-form JSON object. Only `uuid` is required; `files`,
//! `name` and `version` are read when present, and every other field is
//! carried through untouched in its original key order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_UUID: &str = "uuid";
pub const FIELD_NAME: &str = "name";
pub const FIELD_VERSION: &str = "version";
pub const FIELD_FILES: &str = "files";
pub const FIELD_PATH: &str = "path";
pub const FIELD_CLOUD_NAME: &str = "cloud_name";
pub const FIELD_CREATOR_UUID: &str = "creator_uuid";
pub const FIELD_CREATOR_NAME: &str = "creator_name";
pub const FIELD_URN: &str = "urn";
pub const FIELD_PUBLISHED_AT: &str = "published_at";

/// One dataset record as stored in the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset(Map<String, Value>);

impl Dataset {
    /// Wrap a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn uuid(&self) -> Option<&str> {
        self.0.get(FIELD_UUID).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert or overwrite a top-level field.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Paths listed under `files[].path`, in manifest order.
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.0
            .get(FIELD_FILES)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|file| file.get(FIELD_PATH).and_then(Value::as_str))
    }

    /// Whether `path` appears verbatim in `files[].path`.
    pub fn lists_file(&self, path: &str) -> bool {
        self.file_paths().any(|listed| listed == path)
    }

    /// Exact-match filter on top-level string fields.
    ///
    /// A filter naming a field that is absent or not a string never matches.
    pub fn matches<'a, I>(&self, filters: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        filters
            .into_iter()
            .all(|(key, wanted)| self.0.get(key).and_then(Value::as_str) == Some(wanted))
    }

    /// Render a field for use inside a URN.
    ///
    /// Strings are inserted raw, other values use their JSON text, missing
    /// fields render empty.
    pub fn urn_component(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
