//! Converts an abstract [`PrimitiveConstant`] back into a `Constant`
//! primitive node the transformer can splice into the graph (spec.md §4.6).

use cps_ir::{Graph, NodeId, Primitive, PrimitiveConstant};

use crate::error::SccpError;

/// Materializes constant values into the graph.
///
/// Every form [`PrimitiveConstant`] can express (bool, int, double, string,
/// null) is supported directly; there is no composite or non-primitive
/// variant left for `MaterializerMisuse` to actually reject, since the
/// analyzer (by construction) never produces a [`crate::lattice::Lattice::Constant`]
/// wrapping anything but a primitive value. The error path is kept to honor
/// spec.md §7's taxonomy and to fail loudly rather than silently if that
/// invariant is ever broken by a future primitive kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantMaterializer;

impl ConstantMaterializer {
    pub fn materialize(
        &self,
        graph: &mut Graph,
        parent: NodeId,
        value: PrimitiveConstant,
    ) -> Result<NodeId, SccpError> {
        Ok(graph.push_primitive(parent, Primitive::Constant(value)))
    }
}
