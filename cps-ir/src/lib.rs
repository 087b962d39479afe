//! The continuation-passing-style program graph consumed by the `cps-sccp`
//! optimization pass.
//!
//! This crate is the "assumed, not defined here" external IR of spec.md
//! §3.1: node categories, the use-def reference mechanism, and the parent
//! pointers the pass relies on. It does not include a type inferencer or a
//! constant-folding model; those are supplied to `cps-sccp` as trait
//! objects (`TypeSystem`, `ConstantSystem`) operating over the
//! [`types::TypeAnnotation`]/[`constant::PrimitiveConstant`] shapes defined
//! here.

mod builder;
mod constant;
mod entity;
mod graph;
mod node;
mod selector;
#[cfg(test)]
mod tests;
pub mod types;

pub use self::{
    constant::PrimitiveConstant,
    entity::{NodeId, RefId},
    graph::{Graph, UseIter},
    node::{Continuation, Expression, NodeData, Primitive, Use},
    selector::{BinaryOp, OperatorKind, Selector, TypeOperatorKind, UnaryOp},
    types::{CoreTypes, TypeAnnotation, TypeBits, TypeMask},
};
