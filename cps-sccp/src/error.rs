//! The closed, all-fatal error taxonomy this pass can raise (spec.md §7).
//!
//! Every variant here indicates a violated invariant in the input graph or
//! in the pass itself; none are recoverable, and none of them originate
//! from well-formed input under normal compilation.

use cps_ir::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SccpError {
    /// A `MutableVariable` or `Parameter` whose parent is none of the
    /// documented binders.
    #[error("node {node:?} has an unexpected parent: {message}")]
    UnexpectedParent { node: NodeId, message: String },

    /// A `NonTailThrow` survived past the pass that is supposed to
    /// eliminate it before this one runs.
    #[error("node {node:?} violates post-elimination invariant: {message}")]
    PostEliminationViolation { node: NodeId, message: String },

    /// The constant materializer was asked to realize a non-primitive
    /// constant form.
    #[error("materializer misuse at node {node:?}: {message}")]
    MaterializerMisuse { node: NodeId, message: String },
}
