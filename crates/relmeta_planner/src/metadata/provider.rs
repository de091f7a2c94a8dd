use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use hashbrown::HashMap;

use super::column_origin::ColumnOrigin;
use super::unique_keys::UniqueKey;
use super::MetadataQuery;
use crate::cost::Cost;
use crate::expr::Expression;
use crate::logical::operator::{OperatorKind, PlanRef};

/// Supplies metadata for some kinds of operators.
///
/// Every method returns None if the provider has nothing to say about the
/// node, in which case resolution continues with the next provider and
/// finally the built-in rules. Providers call back into `mq` for metadata
/// about the node's inputs.
#[allow(unused_variables)]
pub trait MetadataProvider: Debug + Sync + Send {
    fn row_count(&self, mq: &MetadataQuery, node: &PlanRef) -> Option<f64> {
        None
    }

    fn non_cumulative_cost(&self, mq: &MetadataQuery, node: &PlanRef) -> Option<Cost> {
        None
    }

    fn cumulative_cost(&self, mq: &MetadataQuery, node: &PlanRef) -> Option<Cost> {
        None
    }

    fn selectivity(
        &self,
        mq: &MetadataQuery,
        node: &PlanRef,
        predicate: Option<&Expression>,
    ) -> Option<f64> {
        None
    }

    fn distinct_row_count(
        &self,
        mq: &MetadataQuery,
        node: &PlanRef,
        group_key: &[usize],
        predicate: Option<&Expression>,
    ) -> Option<f64> {
        None
    }

    fn population_size(
        &self,
        mq: &MetadataQuery,
        node: &PlanRef,
        group_key: &[usize],
    ) -> Option<f64> {
        None
    }

    fn unique_keys(&self, mq: &MetadataQuery, node: &PlanRef) -> Option<BTreeSet<UniqueKey>> {
        None
    }

    fn column_origins(
        &self,
        mq: &MetadataQuery,
        node: &PlanRef,
        column: usize,
    ) -> Option<BTreeSet<ColumnOrigin>> {
        None
    }

    fn percentage_original_rows(&self, mq: &MetadataQuery, node: &PlanRef) -> Option<f64> {
        None
    }
}

/// Providers consulted before the built-in rules.
///
/// Providers registered for a specific operator kind are consulted first,
/// most recently registered first. Catch-all providers are consulted after
/// that, again most recently registered first. New operator kinds (see
/// `OperatorKind::Extension`) get metadata by registering a provider here.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    by_kind: HashMap<OperatorKind, Vec<Arc<dyn MetadataProvider>>>,
    catch_all: Vec<Arc<dyn MetadataProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for one operator kind.
    pub fn with_provider(
        mut self,
        kind: OperatorKind,
        provider: impl MetadataProvider + 'static,
    ) -> Self {
        self.register(kind, Arc::new(provider));
        self
    }

    /// Register a provider consulted for every operator kind.
    pub fn with_catch_all(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.catch_all.push(Arc::new(provider));
        self
    }

    pub fn register(&mut self, kind: OperatorKind, provider: Arc<dyn MetadataProvider>) {
        self.by_kind.entry(kind).or_default().push(provider);
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty() && self.catch_all.is_empty()
    }

    /// Iterate providers for an operator kind in resolution order.
    pub fn providers_for(&self, kind: OperatorKind) -> impl Iterator<Item = &dyn MetadataProvider> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flat_map(|providers| providers.iter().rev())
            .chain(self.catch_all.iter().rev())
            .map(|p| p.as_ref())
    }

    /// Ask each provider in resolution order, returning the first answer.
    pub(crate) fn resolve<T>(
        &self,
        kind: OperatorKind,
        mut func: impl FnMut(&dyn MetadataProvider) -> Option<T>,
    ) -> Option<T> {
        self.providers_for(kind).find_map(|p| func(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(f64);

    impl MetadataProvider for Fixed {
        fn row_count(&self, _mq: &MetadataQuery, _node: &PlanRef) -> Option<f64> {
            Some(self.0)
        }
    }

    #[derive(Debug)]
    struct Silent;

    impl MetadataProvider for Silent {}

    fn answers(registry: &ProviderRegistry, kind: OperatorKind) -> Vec<String> {
        registry
            .providers_for(kind)
            .map(|p| format!("{p:?}"))
            .collect()
    }

    #[test]
    fn resolution_order() {
        let registry = ProviderRegistry::new()
            .with_catch_all(Fixed(1.0))
            .with_provider(OperatorKind::Scan, Fixed(2.0))
            .with_provider(OperatorKind::Scan, Fixed(3.0))
            .with_catch_all(Silent);

        assert_eq!(
            vec!["Fixed(3.0)", "Fixed(2.0)", "Silent", "Fixed(1.0)"],
            answers(&registry, OperatorKind::Scan)
        );
        assert_eq!(
            vec!["Silent", "Fixed(1.0)"],
            answers(&registry, OperatorKind::Filter)
        );
    }

    #[test]
    fn empty_registry() {
        let registry = ProviderRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(0, registry.providers_for(OperatorKind::Join).count());
    }
}
