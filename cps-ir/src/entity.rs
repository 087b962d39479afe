use cranelift_entity::entity_impl;

/// Identifies a single node in a [`Graph`](crate::Graph).
///
/// A node is one of an expression, a primitive (value-producing definition),
/// or a continuation; see [`NodeData`](crate::NodeData). Entity references
/// are densely numbered `u32`s, following the same convention
/// `cranelift_codegen::ir::Value`/`ir::Inst` use: small, `Copy`, and cheap to
/// use as map keys.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);
entity_impl!(NodeId, "node");

/// Identifies a single [`Reference`](crate::Reference) (a use-site of a
/// definition) in a [`Graph`](crate::Graph).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(u32);
entity_impl!(RefId, "ref");
