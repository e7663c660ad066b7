//! Lazy wrapper evolving a stored value on each read.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use super::ModifierBinding;
use crate::value::{Syntax, Value};

/// A variable whose value advances through its modifier chain every time it
/// is read.
///
/// The wrapper keeps the latest produced value; each [`read`](Self::read)
/// applies the modifiers in order to it and returns the result. The syntax
/// tag never changes from the base value's: a modifier producing a different
/// tag is skipped and logged.
#[derive(Debug)]
pub struct ModifiedVariable {
    syntax: Syntax,
    current: Mutex<Value>,
    modifiers: Vec<Arc<ModifierBinding>>,
}

impl ModifiedVariable {
    /// Wrap a base value with the modifiers applicable to its OID.
    pub fn new(base: Value, modifiers: Vec<Arc<ModifierBinding>>) -> Self {
        Self {
            syntax: base.syntax(),
            current: Mutex::new(base),
            modifiers,
        }
    }

    /// The syntax tag, always equal to the base value's.
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Advance the value through the modifier chain and return it.
    pub fn read(&self) -> Value {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for binding in &self.modifiers {
            match binding.modifier().modify(&current) {
                Some(next) if next.syntax() == self.syntax => *current = next,
                Some(next) => warn!(
                    kind = binding.modifier().kind_name(),
                    expected = %self.syntax,
                    produced = %next.syntax(),
                    "modifier produced unexpected syntax, skipping"
                ),
                None => warn!(
                    kind = binding.modifier().kind_name(),
                    syntax = %self.syntax,
                    "modifier not applicable to value, skipping"
                ),
            }
        }
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Modifier;
    use crate::modifier::properties::ModifierProperties;
    use crate::oid;

    fn binding(tag: &str, yaml: &str) -> Arc<ModifierBinding> {
        let props: ModifierProperties = serde_yaml::from_str(yaml).unwrap();
        let modifier = Modifier::from_tag(tag, &props).unwrap();
        Arc::new(ModifierBinding::new(oid!(1, 3, 6), modifier))
    }

    #[test]
    fn test_read_advances_value() {
        let counter = binding(
            "Counter32",
            "{minimum: 0, maximum: 100, minimumStep: 1, maximumStep: 1}",
        );
        let variable = ModifiedVariable::new(Value::Counter32(99), vec![counter]);
        assert_eq!(variable.read(), Value::Counter32(100));
        assert_eq!(variable.read(), Value::Counter32(0));
        assert_eq!(variable.read(), Value::Counter32(1));
    }

    #[test]
    fn test_syntax_matches_base() {
        let variable = ModifiedVariable::new(Value::TimeTicks(0), Vec::new());
        assert_eq!(variable.syntax(), Syntax::TimeTicks);
        assert_eq!(variable.read().syntax(), Syntax::TimeTicks);
    }

    #[test]
    fn test_inapplicable_modifier_is_skipped() {
        // A Counter32 modifier cannot advance an octet string.
        let counter = binding("Counter32", "{}");
        let variable = ModifiedVariable::new(Value::text("static"), vec![counter]);
        assert_eq!(variable.read(), Value::text("static"));
        assert_eq!(variable.read().syntax(), Syntax::OctetString);
    }

    #[test]
    fn test_modifier_chain_applies_in_order() {
        let step_one = binding(
            "Gauge32",
            "{minimum: 0, maximum: 1000, minimumStep: 1, maximumStep: 1}",
        );
        let step_two = binding(
            "Gauge32",
            "{minimum: 0, maximum: 1000, minimumStep: 10, maximumStep: 10}",
        );
        let variable = ModifiedVariable::new(Value::Gauge32(0), vec![step_one, step_two]);
        assert_eq!(variable.read(), Value::Gauge32(11));
        assert_eq!(variable.read(), Value::Gauge32(22));
    }
}
