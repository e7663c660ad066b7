//! Octet-string value modifier.

use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use rand::Rng;

use super::VariableModifier;
use super::properties::ModifierProperties;

/// How the next value is chosen from the configured pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Uniform random pick on every read.
    Random,
    /// Cycle through the pool in configuration order.
    Rotate,
}

/// Modifier replacing an octet string with one drawn from a configured pool.
///
/// Properties: `values` (list of strings, required to have any effect) and
/// `mode` (`random` or `rotate`, default `random`).
#[derive(Debug)]
pub struct OctetStringModifier {
    values: Vec<Bytes>,
    mode: SelectionMode,
    cursor: AtomicUsize,
}

impl VariableModifier<Bytes> for OctetStringModifier {
    fn init(properties: &ModifierProperties) -> Self {
        let values = properties
            .get_string_list("values")
            .unwrap_or_default()
            .into_iter()
            .map(|s| Bytes::from(s.into_bytes()))
            .collect();
        let mode = match properties.get_string("mode") {
            Some("rotate") => SelectionMode::Rotate,
            _ => SelectionMode::Random,
        };
        Self {
            values,
            mode,
            cursor: AtomicUsize::new(0),
        }
    }

    fn modify(&self, value: &Bytes) -> Bytes {
        if self.values.is_empty() {
            return value.clone();
        }
        let index = match self.mode {
            SelectionMode::Random => rand::thread_rng().gen_range(0..self.values.len()),
            SelectionMode::Rotate => self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len(),
        };
        self.values[index].clone()
    }
}
