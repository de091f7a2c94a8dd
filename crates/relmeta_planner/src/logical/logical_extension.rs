use std::fmt::Debug;

use dyn_clone::DynClone;
use relmeta_error::Result;
use relmeta_types::field::Schema;

/// An operator kind defined outside this crate.
///
/// Metadata for extension operators is supplied by providers registered
/// against `OperatorKind::Extension(name)`. Without a registered provider,
/// every query on an extension node is unknown.
pub trait ExtensionOperator: Debug + DynClone + Sync + Send {
    /// Stable name of the operator kind.
    fn name(&self) -> &'static str;

    /// Compute the output schema from the schemas of the children.
    fn output_schema(&self, children: &[Schema]) -> Result<Schema>;
}

dyn_clone::clone_trait_object!(ExtensionOperator);

#[derive(Debug, Clone)]
pub struct LogicalExtension {
    pub op: Box<dyn ExtensionOperator>,
}
