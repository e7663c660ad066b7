//! Typed accessors over a modifier's configuration map.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Free-form `key: scalar` configuration attached to a modifier binding.
///
/// Each modifier reads the keys it understands during construction and
/// ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ModifierProperties(BTreeMap<String, serde_yaml::Value>);

impl ModifierProperties {
    /// Build properties from an explicit map (tests and programmatic setup).
    pub fn from_map(map: BTreeMap<String, serde_yaml::Value>) -> Self {
        Self(map)
    }

    pub fn get_integer(&self, key: &str) -> Option<i32> {
        self.0.get(key)?.as_i64()?.try_into().ok()
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.0.get(key)?.as_i64()
    }

    pub fn get_unsigned(&self, key: &str) -> Option<u32> {
        self.0.get(key)?.as_u64()?.try_into().ok()
    }

    pub fn get_unsigned_long(&self, key: &str) -> Option<u64> {
        self.0.get(key)?.as_u64()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    /// A list of strings, e.g. the value pool of an octet-string modifier.
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        let seq = self.0.get(key)?.as_sequence()?;
        seq.iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// A list of unsigned integers, e.g. VLAN identifiers.
    pub fn get_unsigned_list(&self, key: &str) -> Option<Vec<u64>> {
        let seq = self.0.get(key)?.as_sequence()?;
        seq.iter().map(|v| v.as_u64()).collect()
    }
}
