//! Sparse conditional constant propagation over a [`cps_ir::Graph`].
//!
//! Runs the [`Analyzer`] to a fixed point, then hands its reachability and
//! value maps to the [`Transformer`] to rewrite the graph in place. Both
//! halves are generic over a [`TypeSystem`] and (analyzer only) a
//! [`ConstantSystem`], so a front end can plug in its own type and constant
//! domains.

mod analyzer;
pub mod config;
pub mod constant_system;
mod error;
pub mod lattice;
mod materializer;
mod transformer;
pub mod type_system;

pub use self::{
    analyzer::Analyzer,
    config::SccpConfig,
    constant_system::{BasicConstantSystem, ConstantSystem},
    error::SccpError,
    lattice::Lattice,
    materializer::ConstantMaterializer,
    transformer::{TransformStats, Transformer},
    type_system::{TypeMaskSystem, TypeSystem, UnitTypeSystem},
};

use cps_ir::Graph;

/// Run the full pass over `graph`: analyze to a fixed point, then rewrite.
///
/// A no-op on an empty graph (spec.md §6). Returns statistics about the
/// rewrites performed; the analyzer's per-node values remain available by
/// constructing an [`Analyzer`] directly if a caller needs `getType`-style
/// introspection after the fact.
pub fn run_sccp<TS, CS>(
    graph: &mut Graph,
    type_system: TS,
    constant_system: CS,
    config: SccpConfig,
) -> Result<TransformStats, SccpError>
where
    TS: TypeSystem,
    CS: ConstantSystem,
{
    if graph.is_empty() {
        return Ok(TransformStats::default());
    }

    let mut analyzer = Analyzer::new(type_system, constant_system).with_max_iterations(if cfg!(debug_assertions) {
        config.max_iterations
    } else {
        None
    });
    analyzer.run(graph)?;

    let materializer = ConstantMaterializer;
    let mut transformer = Transformer::new(&analyzer, materializer);
    transformer.run(graph)
}
