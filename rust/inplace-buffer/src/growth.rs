//! Capacity growth policy.

use serde::{Deserialize, Serialize};

use crate::{Result, verify_arg};

/// Computes the capacity a buffer grows to.
///
/// A growing buffer asks for `max(current * factor, required, min_non_zero_capacity)`
/// elements, where `factor = factor_numerator / factor_denominator`. Shrinking
/// bypasses the policy altogether.
///
/// The policy can be read from configuration:
///
/// ```
/// use inplace_buffer::GrowthPolicy;
///
/// let policy: GrowthPolicy = serde_json::from_str(
///     r#"{ "factor_numerator": 3, "factor_denominator": 2, "min_non_zero_capacity": 8 }"#,
/// ).unwrap();
/// assert_eq!(policy.next_capacity(10, 11), 15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GrowthPolicyConfig")]
pub struct GrowthPolicy {
    factor_numerator: usize,
    factor_denominator: usize,
    min_non_zero_capacity: usize,
}

impl GrowthPolicy {
    /// Doubling growth with a minimum non-zero capacity of 4 elements.
    pub const DEFAULT: GrowthPolicy = GrowthPolicy {
        factor_numerator: 2,
        factor_denominator: 1,
        min_non_zero_capacity: 4,
    };

    /// Grows to exactly the required capacity.
    pub const EXACT: GrowthPolicy = GrowthPolicy {
        factor_numerator: 1,
        factor_denominator: 1,
        min_non_zero_capacity: 0,
    };

    /// Creates a policy growing by `factor_numerator / factor_denominator`.
    ///
    /// The factor must be at least 1.
    pub fn new(
        factor_numerator: usize,
        factor_denominator: usize,
        min_non_zero_capacity: usize,
    ) -> Result<GrowthPolicy> {
        verify_arg!(factor_denominator, factor_denominator != 0);
        verify_arg!(factor_numerator, factor_numerator >= factor_denominator);
        Ok(GrowthPolicy {
            factor_numerator,
            factor_denominator,
            min_non_zero_capacity,
        })
    }

    pub fn factor_numerator(&self) -> usize {
        self.factor_numerator
    }

    pub fn factor_denominator(&self) -> usize {
        self.factor_denominator
    }

    pub fn min_non_zero_capacity(&self) -> usize {
        self.min_non_zero_capacity
    }

    /// Returns the capacity to request when `required_minimum` elements must fit a
    /// buffer that currently holds `current`.
    ///
    /// The result is never below `required_minimum`. When no growth is needed
    /// (`required_minimum <= current`) it is exactly `required_minimum`.
    pub fn next_capacity(&self, current: usize, required_minimum: usize) -> usize {
        if required_minimum <= current {
            return required_minimum;
        }
        let scaled = (current as u128 * self.factor_numerator as u128)
            / self.factor_denominator as u128;
        let scaled = usize::try_from(scaled).unwrap_or(usize::MAX);
        scaled
            .max(required_minimum)
            .max(self.min_non_zero_capacity)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GrowthPolicyConfig {
    #[serde(default = "default_numerator")]
    factor_numerator: usize,
    #[serde(default = "default_denominator")]
    factor_denominator: usize,
    #[serde(default = "default_min_non_zero")]
    min_non_zero_capacity: usize,
}

fn default_numerator() -> usize {
    GrowthPolicy::DEFAULT.factor_numerator
}

fn default_denominator() -> usize {
    GrowthPolicy::DEFAULT.factor_denominator
}

fn default_min_non_zero() -> usize {
    GrowthPolicy::DEFAULT.min_non_zero_capacity
}

impl TryFrom<GrowthPolicyConfig> for GrowthPolicy {
    type Error = crate::Error;

    fn try_from(config: GrowthPolicyConfig) -> Result<GrowthPolicy> {
        GrowthPolicy::new(
            config.factor_numerator,
            config.factor_denominator,
            config.min_non_zero_capacity,
        )
    }
}
