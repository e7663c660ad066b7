//! Numeric value modifiers.
//!
//! All integer-valued modifiers share one stepping algorithm: pick a uniform
//! random step in `[minimum_step, maximum_step]`, add it to the current
//! value, and wrap around past the configured maximum the way a real device
//! counter would. A current value outside `[minimum, maximum]` (a walk
//! captured mid-wrap, or a reconfigured range) resets to the minimum before
//! stepping.

use rand::Rng;

use super::VariableModifier;
use super::properties::ModifierProperties;

/// Advance `current` within `[minimum, maximum]` by a random step.
///
/// On overflow past the maximum the value wraps to
/// `minimum + (step - distance_to_max - 1)`; on underflow it clamps to the
/// minimum. Performed in i64 so every 32-bit range, signed or unsigned,
/// fits without overflow.
fn step_in_range(current: i64, minimum: i64, maximum: i64, min_step: i64, max_step: i64) -> i64 {
    let current = if current < minimum || current > maximum {
        minimum
    } else {
        current
    };

    let step = random_step(min_step, max_step);

    let to_maximum = maximum - current;
    let next = if step.abs() > to_maximum.abs() {
        minimum + (step - to_maximum - 1)
    } else {
        current + step
    };

    next.clamp(minimum, maximum)
}

fn random_step(min_step: i64, max_step: i64) -> i64 {
    if min_step >= max_step {
        min_step
    } else {
        rand::thread_rng().gen_range(min_step..=max_step)
    }
}

/// Modifier for Integer32 values.
#[derive(Debug, Clone)]
pub struct Integer32Modifier {
    minimum: i32,
    maximum: i32,
    minimum_step: i32,
    maximum_step: i32,
}

impl VariableModifier<i32> for Integer32Modifier {
    fn init(properties: &ModifierProperties) -> Self {
        Self {
            minimum: properties.get_integer("minimum").unwrap_or(i32::MIN),
            maximum: properties.get_integer("maximum").unwrap_or(i32::MAX),
            minimum_step: properties.get_integer("minimumStep").unwrap_or(-1),
            maximum_step: properties.get_integer("maximumStep").unwrap_or(1),
        }
    }

    fn modify(&self, value: &i32) -> i32 {
        step_in_range(
            i64::from(*value),
            i64::from(self.minimum),
            i64::from(self.maximum),
            i64::from(self.minimum_step),
            i64::from(self.maximum_step),
        ) as i32
    }
}

/// Modifier for unsigned 32-bit values: Gauge32, Counter32, and TimeTicks.
#[derive(Debug, Clone)]
pub struct Unsigned32Modifier {
    minimum: u32,
    maximum: u32,
    minimum_step: i64,
    maximum_step: i64,
}

impl Unsigned32Modifier {
    /// TimeTicks stepping tuned for sysUpTime: one second (100 ticks) per
    /// read unless configured otherwise.
    pub fn sys_uptime(properties: &ModifierProperties) -> Self {
        Self {
            minimum: properties.get_unsigned("minimum").unwrap_or(0),
            maximum: properties.get_unsigned("maximum").unwrap_or(u32::MAX),
            minimum_step: properties.get_long("minimumStep").unwrap_or(100),
            maximum_step: properties.get_long("maximumStep").unwrap_or(100),
        }
    }
}

impl VariableModifier<u32> for Unsigned32Modifier {
    fn init(properties: &ModifierProperties) -> Self {
        Self {
            minimum: properties.get_unsigned("minimum").unwrap_or(0),
            maximum: properties.get_unsigned("maximum").unwrap_or(u32::MAX),
            minimum_step: properties.get_long("minimumStep").unwrap_or(0),
            maximum_step: properties.get_long("maximumStep").unwrap_or(1),
        }
    }

    fn modify(&self, value: &u32) -> u32 {
        step_in_range(
            i64::from(*value),
            i64::from(self.minimum),
            i64::from(self.maximum),
            self.minimum_step,
            self.maximum_step,
        ) as u32
    }
}

/// Modifier for Counter64 values. Steps are unsigned: a 64-bit counter only
/// moves forward (and wraps).
#[derive(Debug, Clone)]
pub struct Counter64Modifier {
    minimum: u64,
    maximum: u64,
    minimum_step: u64,
    maximum_step: u64,
}

impl VariableModifier<u64> for Counter64Modifier {
    fn init(properties: &ModifierProperties) -> Self {
        Self {
            minimum: properties.get_unsigned_long("minimum").unwrap_or(0),
            maximum: properties.get_unsigned_long("maximum").unwrap_or(u64::MAX),
            minimum_step: properties.get_unsigned_long("minimumStep").unwrap_or(0),
            maximum_step: properties.get_unsigned_long("maximumStep").unwrap_or(1),
        }
    }

    fn modify(&self, value: &u64) -> u64 {
        let current = if *value < self.minimum || *value > self.maximum {
            self.minimum
        } else {
            *value
        };

        let step = if self.minimum_step >= self.maximum_step {
            self.minimum_step
        } else {
            rand::thread_rng().gen_range(self.minimum_step..=self.maximum_step)
        };

        let to_maximum = self.maximum - current;
        let next = if step > to_maximum {
            // Wrap in u128: minimum + overshoot cannot overflow there.
            let wrapped = u128::from(self.minimum) + u128::from(step - to_maximum - 1);
            wrapped.min(u128::from(self.maximum)) as u64
        } else {
            current + step
        };

        next.max(self.minimum)
    }
}
