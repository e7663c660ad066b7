//! Device descriptors and their factory cache.
//!
//! A device descriptor names the modifier bindings and VLAN views that turn
//! a static walk into a living device. Descriptors are YAML files shared by
//! many agents, so the factory parses each path once and hands out the
//! cached result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use tracing::{error, warn};

use crate::modifier::{Modifier, ModifierBinding, ModifierProperties};
use crate::oid::Oid;

/// Wire form of one modifier entry in a device file.
#[derive(Debug, Deserialize)]
struct RawModifier {
    oid: Oid,
    class: String,
    #[serde(default)]
    properties: ModifierProperties,
}

/// Wire form of a device file.
#[derive(Debug, Deserialize)]
struct RawDevice {
    name: String,
    #[serde(default)]
    modifiers: Vec<RawModifier>,
    #[serde(default)]
    vlans: Vec<u64>,
}

/// A parsed device: named modifier bindings plus VLAN views.
#[derive(Debug)]
pub struct Device {
    name: String,
    modifiers: Vec<Arc<ModifierBinding>>,
    vlans: Vec<u64>,
}

impl Device {
    /// The no-op device used when an agent names no descriptor: no
    /// modifiers, no VLANs.
    pub fn fallback() -> Self {
        Self {
            name: "default".to_string(),
            modifiers: Vec::new(),
            vlans: Vec::new(),
        }
    }

    /// Parse a device descriptor from YAML text.
    ///
    /// Unknown modifier classes are logged and omitted; the rest of the
    /// device stays usable.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawDevice = serde_yaml::from_str(text)?;
        let mut modifiers = Vec::with_capacity(raw.modifiers.len());
        for entry in raw.modifiers {
            match Modifier::from_tag(&entry.class, &entry.properties) {
                Some(modifier) => {
                    modifiers.push(Arc::new(ModifierBinding::new(entry.oid, modifier)));
                }
                None => warn!(
                    device = %raw.name,
                    class = %entry.class,
                    "unknown modifier class, omitting"
                ),
            }
        }
        Ok(Self {
            name: raw.name,
            modifiers,
            vlans: raw.vlans,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vlans(&self) -> &[u64] {
        &self.vlans
    }

    pub fn modifiers(&self) -> &[Arc<ModifierBinding>] {
        &self.modifiers
    }

    /// The modifier bindings applicable to one OID, in configuration order.
    pub fn modifiers_for(&self, oid: &Oid) -> Vec<Arc<ModifierBinding>> {
        self.modifiers
            .iter()
            .filter(|binding| binding.is_applicable(oid))
            .cloned()
            .collect()
    }
}

/// Parses device descriptors, caching by path.
///
/// Construct one per process and pass it to agent assembly; reads after the
/// initial populate are lock-cheap and concurrent.
#[derive(Debug, Default)]
pub struct DeviceFactory {
    devices: RwLock<HashMap<PathBuf, Arc<Device>>>,
}

impl DeviceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The device for a descriptor path, or the fallback device for `None`
    /// and for descriptors that fail to load.
    pub fn device(&self, path: Option<&Path>) -> Arc<Device> {
        let Some(path) = path else {
            return Arc::new(Device::fallback());
        };

        if let Some(cached) = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return cached.clone();
        }

        let device = match self.load(path) {
            Ok(device) => Arc::new(device),
            Err(err) => {
                error!(path = %path.display(), %err, "could not load device, using fallback");
                Arc::new(Device::fallback())
            }
        };
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), device.clone());
        device
    }

    fn load(&self, path: &Path) -> Result<Device, String> {
        let text = std::fs::read_to_string(path).map_err(|e| e.to_string());
        Device::from_yaml(&text?).map_err(|e| e.to_string())
    }
}
