//! Value modifier library.
//!
//! Modifiers make a simulated device look alive: counters climb, uptime
//! advances, descriptions rotate. A device descriptor binds modifier kinds
//! to OID prefixes; during agent assembly every walk binding under a prefix
//! is wrapped in a [`ModifiedVariable`] that applies its chain on each read.
//!
//! The library is a registry keyed by kind tag ([`Modifier::from_tag`]).
//! Unknown tags are reported to the caller as `None` so a device descriptor
//! with a typo degrades to a partially static device instead of failing.

mod community;
mod dynamic;
mod numeric;
pub mod properties;
mod text;

pub use community::CommunityContextModifier;
pub use dynamic::ModifiedVariable;
pub use numeric::{Counter64Modifier, Integer32Modifier, Unsigned32Modifier};
pub use properties::ModifierProperties;
pub use text::{OctetStringModifier, SelectionMode};

use crate::oid::Oid;
use crate::value::Value;

/// A typed value mutator configured from [`ModifierProperties`].
///
/// `T` is the raw payload the modifier understands; [`Modifier`] adapts
/// between [`Value`] variants and these typed implementations.
pub trait VariableModifier<T>: Sized {
    /// Build the modifier from its configuration.
    fn init(properties: &ModifierProperties) -> Self;

    /// Produce the next value from the current one.
    fn modify(&self, value: &T) -> T;
}

/// A configured modifier of any kind.
#[derive(Debug)]
pub enum Modifier {
    Integer32(Integer32Modifier),
    Gauge32(Unsigned32Modifier),
    Counter32(Unsigned32Modifier),
    TimeTicks(Unsigned32Modifier),
    SysUpTime(Unsigned32Modifier),
    Counter64(Counter64Modifier),
    OctetString(OctetStringModifier),
    CommunityContext(CommunityContextModifier),
}

impl Modifier {
    /// Look up a modifier kind by its configuration tag.
    ///
    /// Returns `None` for unknown tags; the caller logs and omits the
    /// binding.
    pub fn from_tag(tag: &str, properties: &ModifierProperties) -> Option<Self> {
        let modifier = match tag {
            "Integer32" => Self::Integer32(Integer32Modifier::init(properties)),
            "Gauge32" | "UInt32" | "Unsigned32" => {
                Self::Gauge32(Unsigned32Modifier::init(properties))
            }
            "Counter32" => Self::Counter32(Unsigned32Modifier::init(properties)),
            "TimeTicks" => Self::TimeTicks(Unsigned32Modifier::init(properties)),
            "SysUpTime" => Self::SysUpTime(Unsigned32Modifier::sys_uptime(properties)),
            "Counter64" => Self::Counter64(Counter64Modifier::init(properties)),
            "OctetString" => Self::OctetString(OctetStringModifier::init(properties)),
            "CommunityContext" => {
                Self::CommunityContext(CommunityContextModifier::init(properties))
            }
            _ => return None,
        };
        Some(modifier)
    }

    /// The tag this modifier was registered under, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Integer32(_) => "Integer32",
            Self::Gauge32(_) => "Gauge32",
            Self::Counter32(_) => "Counter32",
            Self::TimeTicks(_) => "TimeTicks",
            Self::SysUpTime(_) => "SysUpTime",
            Self::Counter64(_) => "Counter64",
            Self::OctetString(_) => "OctetString",
            Self::CommunityContext(_) => "CommunityContext",
        }
    }

    /// Apply this modifier to a value of the matching syntax.
    ///
    /// `None` means the modifier does not apply: wrong value syntax, or a
    /// context-expanding kind that never rewrites single values.
    pub fn modify(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Integer32(m), Value::Integer(v)) => Some(Value::Integer(m.modify(v))),
            (Self::Gauge32(m), Value::Gauge32(v)) => Some(Value::Gauge32(m.modify(v))),
            (Self::Counter32(m), Value::Counter32(v)) => Some(Value::Counter32(m.modify(v))),
            (Self::TimeTicks(m) | Self::SysUpTime(m), Value::TimeTicks(v)) => {
                Some(Value::TimeTicks(m.modify(v)))
            }
            (Self::Counter64(m), Value::Counter64(v)) => Some(Value::Counter64(m.modify(v))),
            (Self::OctetString(m), Value::OctetString(v)) => {
                Some(Value::OctetString(m.modify(v)))
            }
            _ => None,
        }
    }

    /// Downcast to the context-expanding kind, if that is what this is.
    pub fn as_community_context(&self) -> Option<&CommunityContextModifier> {
        match self {
            Self::CommunityContext(m) => Some(m),
            _ => None,
        }
    }
}

/// A modifier bound to the OID prefix it applies to.
#[derive(Debug)]
pub struct ModifierBinding {
    prefix: Oid,
    modifier: Modifier,
}

impl ModifierBinding {
    pub fn new(prefix: Oid, modifier: Modifier) -> Self {
        Self { prefix, modifier }
    }

    /// Whether this binding applies to the given OID.
    pub fn is_applicable(&self, oid: &Oid) -> bool {
        oid.starts_with(&self.prefix)
    }

    pub fn prefix(&self) -> &Oid {
        &self.prefix
    }

    pub fn modifier(&self) -> &Modifier {
        &self.modifier
    }
}
