//! Cost values and the parameters of the cost model.
//!
//! Costs are relative units used to rank plans, not time estimates.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use relmeta_error::{RelmetaError, Result};
use serde::{Deserialize, Serialize};

/// Add two non-negative quantities, saturating at the largest finite value.
///
/// Infinity stays infinite so that the `Cost::INFINITY` sentinel survives
/// addition.
pub fn saturating_add(a: f64, b: f64) -> f64 {
    if a.is_infinite() || b.is_infinite() {
        return f64::INFINITY;
    }
    (a + b).min(f64::MAX)
}

/// Multiply two non-negative quantities, saturating at the largest finite
/// value.
pub fn saturating_mul(a: f64, b: f64) -> f64 {
    let product = a * b;
    if product.is_nan() {
        // 0 * inf
        return 0.0;
    }
    product.min(f64::MAX)
}

/// Cost of a plan or part of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub rows: f64,
    pub cpu: f64,
    pub io: f64,
}

impl Cost {
    pub const ZERO: Cost = Cost {
        rows: 0.0,
        cpu: 0.0,
        io: 0.0,
    };

    /// Cost of something that cannot be executed.
    pub const INFINITY: Cost = Cost {
        rows: f64::INFINITY,
        cpu: f64::INFINITY,
        io: f64::INFINITY,
    };

    pub fn new(rows: f64, cpu: f64, io: f64) -> Self {
        debug_assert!(rows >= 0.0 && cpu >= 0.0 && io >= 0.0, "negative cost");
        Cost { rows, cpu, io }
    }

    /// Cost measured in rows only.
    pub fn from_rows(rows: f64) -> Self {
        Self::new(rows, 0.0, 0.0)
    }

    pub fn is_infinite(&self) -> bool {
        self.rows.is_infinite() || self.cpu.is_infinite() || self.io.is_infinite()
    }

    pub fn is_valid(&self) -> bool {
        [self.rows, self.cpu, self.io]
            .iter()
            .all(|v| !v.is_nan() && *v >= 0.0)
    }
}

impl Default for Cost {
    fn default() -> Self {
        Cost::ZERO
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Self) -> Self::Output {
        Cost {
            rows: saturating_add(self.rows, rhs.rows),
            cpu: saturating_add(self.cpu, rhs.cpu),
            io: saturating_add(self.io, rhs.io),
        }
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Cost::ZERO, |acc, c| acc + c)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "{{inf}}");
        }
        write!(
            f,
            "{{{} rows, {} cpu, {} io}}",
            self.rows, self.cpu, self.io
        )
    }
}

/// How two costs are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CostPolicy {
    /// Compare by rows, using cpu and then io only to break ties.
    RowsDominant,
    /// Compare the weighted sum of all components.
    Weighted { rows: f64, cpu: f64, io: f64 },
}

impl Default for CostPolicy {
    fn default() -> Self {
        CostPolicy::RowsDominant
    }
}

impl CostPolicy {
    pub fn compare(&self, a: &Cost, b: &Cost) -> Ordering {
        match self {
            Self::RowsDominant => a
                .rows
                .total_cmp(&b.rows)
                .then_with(|| a.cpu.total_cmp(&b.cpu))
                .then_with(|| a.io.total_cmp(&b.io)),
            Self::Weighted { rows, cpu, io } => {
                let weigh = |c: &Cost| {
                    saturating_add(
                        saturating_add(saturating_mul(c.rows, *rows), saturating_mul(c.cpu, *cpu)),
                        saturating_mul(c.io, *io),
                    )
                };
                weigh(a).total_cmp(&weigh(b))
            }
        }
    }

    pub fn is_lt(&self, a: &Cost, b: &Cost) -> bool {
        self.compare(a, b).is_lt()
    }
}

/// Tunable constants of the cost model.
///
/// The defaults reproduce the reference calibration where every cost is
/// expressed in rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Factor applied to `left * right` rows for joins without equality
    /// conditions (nested loops). Default 0.5.
    pub nested_loop_join_factor: f64,
    /// Factor applied to `max(left, right) * join selectivity` for equality
    /// joins (hash joins). Default 10.
    pub hash_join_factor: f64,
    /// Fixed cost of any aggregate. Default 3.
    pub aggregate_fixed_cost: f64,
    /// Per output row cost of an aggregate. Default 1.
    pub aggregate_output_factor: f64,
    /// Per input row cost of an aggregate. Default 0.
    pub aggregate_input_factor: f64,
    /// Per output row cost of a semijoin. Default 1.
    pub semijoin_overhead_factor: f64,
    /// How costs are ordered.
    pub policy: CostPolicy,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            nested_loop_join_factor: 0.5,
            hash_join_factor: 10.0,
            aggregate_fixed_cost: 3.0,
            aggregate_output_factor: 1.0,
            aggregate_input_factor: 0.0,
            semijoin_overhead_factor: 1.0,
            policy: CostPolicy::RowsDominant,
        }
    }
}

impl CostModel {
    /// Check that every factor is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let factors = [
            ("nested_loop_join_factor", self.nested_loop_join_factor),
            ("hash_join_factor", self.hash_join_factor),
            ("aggregate_fixed_cost", self.aggregate_fixed_cost),
            ("aggregate_output_factor", self.aggregate_output_factor),
            ("aggregate_input_factor", self.aggregate_input_factor),
            ("semijoin_overhead_factor", self.semijoin_overhead_factor),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(RelmetaError::new(format!(
                    "Cost model parameter '{name}' must be finite and non-negative, got {value}"
                )));
            }
        }
        if let CostPolicy::Weighted { rows, cpu, io } = self.policy {
            if [rows, cpu, io].iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(RelmetaError::new(
                    "Cost policy weights must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_saturates() {
        let big = Cost::from_rows(f64::MAX);
        assert_eq!(f64::MAX, (big + big).rows);
        assert!((Cost::INFINITY + Cost::from_rows(1.0)).is_infinite());

        let sum: Cost = [Cost::from_rows(1.0), Cost::new(2.0, 1.0, 0.5)]
            .into_iter()
            .sum();
        assert_eq!(Cost::new(3.0, 1.0, 0.5), sum);
    }

    #[test]
    fn saturating_mul_bounds() {
        assert_eq!(f64::MAX, saturating_mul(f64::MAX, 2.0));
        assert_eq!(0.0, saturating_mul(0.0, f64::INFINITY));
        assert_eq!(6.0, saturating_mul(2.0, 3.0));
    }

    #[test]
    fn rows_dominant_ordering() {
        let policy = CostPolicy::RowsDominant;
        let a = Cost::new(10.0, 100.0, 100.0);
        let b = Cost::new(11.0, 0.0, 0.0);
        assert!(policy.is_lt(&a, &b));
        assert_eq!(
            Ordering::Less,
            policy.compare(&Cost::new(10.0, 1.0, 0.0), &Cost::new(10.0, 2.0, 0.0))
        );
        assert!(policy.is_lt(&b, &Cost::INFINITY));
    }

    #[test]
    fn weighted_ordering() {
        let policy = CostPolicy::Weighted {
            rows: 1.0,
            cpu: 1.0,
            io: 0.0,
        };
        let a = Cost::new(10.0, 100.0, 0.0);
        let b = Cost::new(11.0, 0.0, 1000.0);
        assert!(policy.is_lt(&b, &a));
    }

    #[test]
    fn validate_model() {
        CostModel::default().validate().unwrap();

        let model = CostModel {
            hash_join_factor: -1.0,
            ..Default::default()
        };
        assert!(model.validate().is_err());

        let model = CostModel {
            policy: CostPolicy::Weighted {
                rows: f64::NAN,
                cpu: 0.0,
                io: 0.0,
            },
            ..Default::default()
        };
        assert!(model.validate().is_err());
    }
}
