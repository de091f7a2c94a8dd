//! Relational metadata: row counts, costs, selectivities, distinct counts,
//! unique keys and column lineage for nodes of a logical plan.
//!
//! All queries go through `MetadataQuery`, which resolves each (query,
//! operator kind) pair to a registered provider or to the built-in rules and
//! memoizes results for the lifetime of the query object. "Unknown" is
//! always `None`, never an error.

pub mod column_origin;
pub mod cost;
pub mod distinct;
pub mod percentage;
pub mod population;
pub mod provider;
pub mod row_count;
pub mod selectivity;
pub mod unique_keys;
pub mod util;

use std::collections::BTreeSet;
use std::sync::Arc;

use column_origin::ColumnOrigin;
use hashbrown::HashMap;
use parking_lot::Mutex;
use provider::ProviderRegistry;
use tracing::{debug, trace};
use unique_keys::UniqueKey;

use crate::config::MetadataConfig;
use crate::cost::{Cost, CostModel};
use crate::expr::Expression;
use crate::logical::operator::{LogicalOperator, PlanRef};
use crate::statistics::{assumptions, StatisticsSource, TableStatistics};

/// Identifies a metadata query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    RowCount,
    NonCumulativeCost,
    CumulativeCost,
    Selectivity,
    DistinctRowCount,
    PopulationSize,
    UniqueKeys,
    ColumnOrigins,
    PercentageOriginalRows,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: MetadataKind,
    /// Address of the node's allocation.
    node: usize,
    /// Debug formatted query arguments.
    args: String,
}

#[derive(Debug, Clone)]
enum CachedValue {
    Float(Option<f64>),
    Cost(Option<Cost>),
    Keys(Option<BTreeSet<UniqueKey>>),
    Origins(Option<BTreeSet<ColumnOrigin>>),
}

#[derive(Debug)]
struct CacheEntry {
    /// Keeps the node alive so its address can't be reused by another node
    /// while the entry exists.
    _node: PlanRef,
    value: CachedValue,
}

/// Entry point for all metadata queries during one planning pass.
///
/// Holds the statistics for the session, the provider registry and a memo
/// of previously computed answers. Plans must not be mutated while a
/// `MetadataQuery` holds cached answers for them; replace nodes instead, or
/// call `clear_cache`.
#[derive(Debug)]
pub struct MetadataQuery<'a> {
    stats: &'a dyn StatisticsSource,
    registry: Arc<ProviderRegistry>,
    config: MetadataConfig,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl<'a> MetadataQuery<'a> {
    pub fn new(stats: &'a dyn StatisticsSource) -> Self {
        MetadataQuery {
            stats,
            registry: Arc::new(ProviderRegistry::default()),
            config: MetadataConfig::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: MetadataConfig) -> Self {
        self.config = config;
        self.clear_cache();
        self
    }

    pub fn with_registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = registry;
        self.clear_cache();
        self
    }

    pub fn statistics_source(&self) -> &'a dyn StatisticsSource {
        self.stats
    }

    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.config.cost_model
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of memoized answers.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Statistics of the table read by a scan, None for every other node.
    pub fn table_statistics(&self, node: &PlanRef) -> Option<&'a TableStatistics> {
        match node.as_ref() {
            LogicalOperator::Scan(scan) => self.stats.table_statistics(&scan.node.table.name),
            _ => None,
        }
    }

    /// Estimated number of rows produced by the node.
    pub fn row_count(&self, node: &PlanRef) -> Option<f64> {
        let count = self.memoized(
            MetadataKind::RowCount,
            node,
            String::new(),
            CachedValue::Float,
            |v| match v {
                CachedValue::Float(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.row_count(self, node))
                    .or_else(|| row_count::row_count(self, node))
            },
        );
        if let Some(count) = count {
            debug_assert!(count >= 0.0, "negative row count {count} for {node}");
        }
        count
    }

    /// Cost of the node alone, excluding its inputs.
    pub fn non_cumulative_cost(&self, node: &PlanRef) -> Option<Cost> {
        let cost = self.memoized(
            MetadataKind::NonCumulativeCost,
            node,
            String::new(),
            CachedValue::Cost,
            |v| match v {
                CachedValue::Cost(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.non_cumulative_cost(self, node))
                    .or_else(|| cost::non_cumulative_cost(self, node))
            },
        );
        if let Some(cost) = &cost {
            debug_assert!(cost.is_valid(), "invalid cost {cost} for {node}");
        }
        cost
    }

    /// Cost of the node plus the cumulative cost of each of its inputs.
    ///
    /// Inputs shared by multiple parents are counted once per parent.
    pub fn cumulative_cost(&self, node: &PlanRef) -> Option<Cost> {
        let cost = self.memoized(
            MetadataKind::CumulativeCost,
            node,
            String::new(),
            CachedValue::Cost,
            |v| match v {
                CachedValue::Cost(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.cumulative_cost(self, node))
                    .or_else(|| cost::cumulative_cost(self, node))
            },
        );
        if let Some(cost) = &cost {
            debug_assert!(cost.is_valid(), "invalid cost {cost} for {node}");
        }
        cost
    }

    /// Fraction of the node's rows satisfying the predicate.
    ///
    /// Without a predicate, this is the selectivity of the conditions applied
    /// by the node itself. Projections, sorts and aggregates look through to
    /// their input, set operations report 1.0.
    pub fn selectivity(&self, node: &PlanRef, predicate: Option<&Expression>) -> Option<f64> {
        let selectivity = self.memoized(
            MetadataKind::Selectivity,
            node,
            format!("{predicate:?}"),
            CachedValue::Float,
            |v| match v {
                CachedValue::Float(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.selectivity(self, node, predicate))
                    .or_else(|| selectivity::selectivity(self, node, predicate))
            },
        );
        selectivity.map(|s| {
            debug_assert!(
                (-1e-9..=1.0 + 1e-9).contains(&s),
                "selectivity {s} out of range for {node}"
            );
            s.clamp(0.0, 1.0)
        })
    }

    /// Number of distinct values of the group key among the node's rows
    /// satisfying the predicate.
    ///
    /// An empty group key has exactly one distinct value.
    pub fn distinct_row_count(
        &self,
        node: &PlanRef,
        group_key: &[usize],
        predicate: Option<&Expression>,
    ) -> Option<f64> {
        let group_key = normalize_columns(group_key);
        if group_key.is_empty() {
            return Some(1.0);
        }

        let count = self.memoized(
            MetadataKind::DistinctRowCount,
            node,
            format!("{group_key:?} {predicate:?}"),
            CachedValue::Float,
            |v| match v {
                CachedValue::Float(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| {
                        p.distinct_row_count(self, node, &group_key, predicate)
                    })
                    .or_else(|| distinct::distinct_row_count(self, node, &group_key, predicate))
            },
        );
        if let Some(count) = count {
            debug_assert!(count >= 0.0, "negative distinct count {count} for {node}");
        }
        count
    }

    /// Number of distinct values of the group key in the node's output,
    /// ignoring filters.
    pub fn population_size(&self, node: &PlanRef, group_key: &[usize]) -> Option<f64> {
        let group_key = normalize_columns(group_key);
        if group_key.is_empty() {
            return Some(1.0);
        }

        let size = self.memoized(
            MetadataKind::PopulationSize,
            node,
            format!("{group_key:?}"),
            CachedValue::Float,
            |v| match v {
                CachedValue::Float(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.population_size(self, node, &group_key))
                    .or_else(|| population::population_size(self, node, &group_key))
            },
        );
        if let Some(size) = size {
            debug_assert!(size >= 0.0, "negative population size {size} for {node}");
        }
        size
    }

    /// Minimal sets of output columns that are unique across the node's
    /// rows.
    pub fn unique_keys(&self, node: &PlanRef) -> Option<BTreeSet<UniqueKey>> {
        let keys = self.memoized(
            MetadataKind::UniqueKeys,
            node,
            String::new(),
            CachedValue::Keys,
            |v| match v {
                CachedValue::Keys(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.unique_keys(self, node))
                    .or_else(|| unique_keys::unique_keys(self, node))
                    .map(unique_keys::minimize)
            },
        )?;

        if let Some(len) = node.output_len() {
            for key in &keys {
                assert!(
                    key.columns().iter().all(|&col| col < len),
                    "unique key {key} not within the {len} output columns of {node}"
                );
            }
        }
        Some(keys)
    }

    /// Check if the columns are unique across the node's rows.
    ///
    /// Returns None if nothing is known about the node's keys.
    pub fn are_columns_unique(&self, node: &PlanRef, columns: &[usize]) -> Option<bool> {
        let keys = self.unique_keys(node)?;
        Some(keys.iter().any(|key| key.is_covered_by(columns)))
    }

    /// Tables and columns the output column's values come from.
    pub fn column_origins(&self, node: &PlanRef, column: usize) -> Option<BTreeSet<ColumnOrigin>> {
        self.memoized(
            MetadataKind::ColumnOrigins,
            node,
            column.to_string(),
            CachedValue::Origins,
            |v| match v {
                CachedValue::Origins(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.column_origins(self, node, column))
                    .or_else(|| column_origin::column_origins(self, node, column))
            },
        )
    }

    /// Fraction of rows produced relative to the same plan with all single
    /// table filters removed.
    pub fn percentage_original_rows(&self, node: &PlanRef) -> Option<f64> {
        let percentage = self.memoized(
            MetadataKind::PercentageOriginalRows,
            node,
            String::new(),
            CachedValue::Float,
            |v| match v {
                CachedValue::Float(v) => Some(v),
                _ => None,
            },
            || {
                self.registry
                    .resolve(node.kind(), |p| p.percentage_original_rows(self, node))
                    .or_else(|| percentage::percentage_original_rows(self, node))
            },
        );
        percentage.map(|p| {
            debug_assert!(p >= -1e-9, "negative percentage {p} for {node}");
            p.clamp(0.0, 1.0)
        })
    }

    /// Fraction of rows a semijoin against `right` on `right_keys` keeps.
    ///
    /// Computed from the distinct keys remaining in `right` relative to their
    /// population, falling back to the fraction of original rows in `right`
    /// and finally to a fixed selectivity per key column.
    pub fn semijoin_selectivity(&self, right: &PlanRef, right_keys: &[usize]) -> f64 {
        let keys = normalize_columns(right_keys);
        let distinct = self.distinct_row_count(right, &keys, None);
        let population = self.population_size(right, &keys);

        let selectivity = match (distinct, population) {
            (Some(distinct), Some(population)) => Some(distinct / population.max(1.0)),
            _ => self.percentage_original_rows(right),
        };

        match selectivity {
            Some(s) => s.min(1.0),
            None => {
                let s = assumptions::SEMIJOIN_KEY_SELECTIVITY.powi(keys.len() as i32);
                debug!(keys = keys.len(), selectivity = s, "using default semijoin selectivity");
                s
            }
        }
    }

    fn memoized<T: Clone + std::fmt::Debug>(
        &self,
        query: MetadataKind,
        node: &PlanRef,
        args: String,
        wrap: fn(T) -> CachedValue,
        unwrap: fn(CachedValue) -> Option<T>,
        compute: impl FnOnce() -> T,
    ) -> T {
        if !self.config.enable_cache {
            return compute();
        }

        let key = CacheKey {
            query,
            node: Arc::as_ptr(node) as usize,
            args,
        };

        let cached = self.cache.lock().get(&key).map(|entry| entry.value.clone());
        if let Some(value) = cached.and_then(unwrap) {
            trace!(?query, node = %node.kind(), args = %key.args, ?value, "metadata cache hit");
            return value;
        }

        // The lock isn't held while computing, computing recurses into the
        // node's inputs.
        let value = compute();
        trace!(?query, node = %node.kind(), args = %key.args, ?value, "computed metadata");

        self.cache.lock().insert(
            key,
            CacheEntry {
                _node: node.clone(),
                value: wrap(value.clone()),
            },
        );
        value
    }
}

fn normalize_columns(columns: &[usize]) -> Vec<usize> {
    let mut columns = columns.to_vec();
    columns.sort_unstable();
    columns.dedup();
    columns
}
