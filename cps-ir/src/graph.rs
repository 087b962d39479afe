use cranelift_entity::{PrimaryMap, SecondaryMap};

use crate::{
    entity::{NodeId, RefId},
    node::{Continuation, Expression, NodeData, Primitive, Use},
};

/// One doubly-linked entry in a definition's use-list.
///
/// `prev`/`next` link sibling uses of the same `def`; `unlink` (§4.5) simply
/// splices this entry out of that chain, in O(1), without touching any
/// other entry's `def`.
struct RefData {
    def: NodeId,
    user: NodeId,
    prev: Option<RefId>,
    next: Option<RefId>,
}

/// The CPS program graph.
///
/// Nodes (expressions, primitives, continuations) live in a single
/// entity-indexed arena, following the same "arena + index" idiom
/// `cranelift_codegen` uses for its instruction graph (spec.md §9 names this
/// pattern explicitly for modeling the use-def relation). Structural parent
/// pointers and the reference use-lists are maintained as separate
/// secondary/arena structures alongside it, so that `parent` is always a
/// pure back-edge, never an owning link (spec.md §5).
pub struct Graph {
    nodes: PrimaryMap<NodeId, NodeData>,
    parent: SecondaryMap<NodeId, Option<NodeId>>,
    refs: PrimaryMap<RefId, RefData>,
    first_use: SecondaryMap<NodeId, Option<RefId>>,
    root: NodeId,
}

impl Graph {
    /// Construct a graph whose root continuation has no parameters and an
    /// empty body (`Rethrow`, used only as a placeholder terminator).
    ///
    /// Callers building a non-empty program should immediately follow up
    /// with [`Graph::set_root_body`] and, for a function, [`Graph::add_root_parameter`].
    pub fn new() -> Self {
        let mut nodes = PrimaryMap::new();
        let placeholder_body = nodes.push(NodeData::Expr(Expression::Rethrow));
        let root = nodes.push(NodeData::Cont(Continuation {
            params: Vec::new(),
            body: placeholder_body,
        }));
        let mut parent = SecondaryMap::new();
        parent[placeholder_body] = Some(root);
        Self {
            nodes,
            parent,
            refs: PrimaryMap::new(),
            first_use: SecondaryMap::new(),
            root,
        }
    }

    /// `true` exactly when the graph is still the empty placeholder created
    /// by [`Graph::new`] — spec.md §6's "may be empty" input case.
    pub fn is_empty(&self) -> bool {
        matches!(
            self.node(self.root_body()),
            NodeData::Expr(Expression::Rethrow)
        ) && self.root_params().is_empty()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_body(&self) -> NodeId {
        self.nodes[self.root].as_cont().unwrap().body
    }

    pub fn root_params(&self) -> &[NodeId] {
        &self.nodes[self.root].as_cont().unwrap().params
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id]
    }

    /// Allocate a placeholder node owned by `parent`, returning its id
    /// before its final contents are known.
    ///
    /// Used when constructing a node whose own fields need to reference its
    /// own id (e.g. a [`Use`]'s `user`); the caller builds those fields
    /// against the returned id and then overwrites `*graph.node_mut(id)`
    /// with the real contents.
    pub fn reserve(&mut self, parent: NodeId) -> NodeId {
        let id = self.nodes.push(NodeData::Expr(Expression::Rethrow));
        self.parent[id] = Some(parent);
        id
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parent[id]
    }

    // --- allocation -----------------------------------------------------

    /// Allocate a new primitive, owned structurally by `parent`.
    pub fn push_primitive(&mut self, parent: NodeId, prim: Primitive) -> NodeId {
        let id = self.nodes.push(NodeData::Prim(prim));
        self.parent[id] = Some(parent);
        id
    }

    /// Allocate a new expression, owned structurally by `parent`.
    pub fn push_expression(&mut self, parent: NodeId, expr: Expression) -> NodeId {
        let id = self.nodes.push(NodeData::Expr(expr));
        self.parent[id] = Some(parent);
        id
    }

    /// Allocate a new continuation, owned structurally by `parent`.
    pub fn push_continuation(&mut self, parent: NodeId, cont: Continuation) -> NodeId {
        let id = self.nodes.push(NodeData::Cont(cont));
        self.parent[id] = Some(parent);
        id
    }

    pub fn set_root_body(&mut self, body: NodeId) {
        self.node_mut(self.root).as_cont_mut().unwrap().body = body;
        self.parent[body] = Some(self.root);
    }

    pub fn add_root_parameter(&mut self, declared_ty: crate::types::TypeAnnotation) -> NodeId {
        let param = self.push_primitive(self.root, Primitive::Parameter { declared_ty });
        if let NodeData::Cont(c) = &mut self.nodes[self.root] {
            c.params.push(param);
        }
        param
    }

    /// Append a parameter to an already-allocated continuation.
    pub fn add_continuation_parameter(
        &mut self,
        cont: NodeId,
        declared_ty: crate::types::TypeAnnotation,
    ) -> NodeId {
        let param = self.push_primitive(cont, Primitive::Parameter { declared_ty });
        if let NodeData::Cont(c) = &mut self.nodes[cont] {
            c.params.push(param);
        }
        param
    }

    // --- references -------------------------------------------------------

    /// Create a new [`Use`] of `def` belonging to `user`, inserted at the
    /// front of `def`'s use-list.
    pub fn new_use(&mut self, def: NodeId, user: NodeId) -> Use {
        let old_head = self.first_use[def];
        let r = self.refs.push(RefData {
            def,
            user,
            prev: None,
            next: old_head,
        });
        if let Some(h) = old_head {
            self.refs[h].prev = Some(r);
        }
        self.first_use[def] = Some(r);
        Use(r)
    }

    pub fn use_target(&self, u: Use) -> NodeId {
        self.refs[u.0].def
    }

    pub fn use_user(&self, u: Use) -> NodeId {
        self.refs[u.0].user
    }

    /// Remove `u` from its definition's use-list in O(1).
    pub fn unlink(&mut self, u: Use) {
        let (def, prev, next) = {
            let r = &self.refs[u.0];
            (r.def, r.prev, r.next)
        };
        match prev {
            Some(p) => self.refs[p].next = next,
            None => self.first_use[def] = next,
        }
        if let Some(n) = next {
            self.refs[n].prev = prev;
        }
    }

    /// Iterate the uses of `def`, in unspecified order.
    pub fn uses_of(&self, def: NodeId) -> UseIter<'_> {
        UseIter {
            graph: self,
            current: self.first_use[def],
        }
    }

    pub fn has_uses(&self, def: NodeId) -> bool {
        self.first_use[def].is_some()
    }

    /// Redirect every use of `old` to `new`, in O(uses of `old`).
    ///
    /// This is the "substitute every use" operation the `Identical` rewrite
    /// (spec.md §4.5) and general value replacement rely on. It does not
    /// touch any user's node data — readers always resolve a [`Use`]
    /// through [`Graph::use_target`], so redirecting the reference's `def`
    /// field is sufficient.
    pub fn replace_all_uses_with(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        let mut cur = self.first_use[old].take();
        while let Some(r) = cur {
            let next = self.refs[r].next;
            self.refs[r].def = new;
            self.refs[r].prev = None;
            self.refs[r].next = self.first_use[new];
            if let Some(h) = self.first_use[new] {
                self.refs[h].prev = Some(r);
            }
            self.first_use[new] = Some(r);
            cur = next;
        }
    }

    // --- structural rewriting --------------------------------------------

    /// Replace the body-position child `old` of `parent` with `new`,
    /// updating `new`'s parent pointer.
    ///
    /// `parent` must be either an `Expression` with a `body` field or a
    /// `Continuation`; this is the only shape of structural slot the
    /// transformer ever rewrites in place (spec.md §4.5: "every splice sets
    /// `newNode.parent = oldParent` and `oldParent.body = newNode`
    /// atomically").
    pub fn replace_body_slot(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        match &mut self.nodes[parent] {
            NodeData::Expr(e) => {
                let slot = expression_body_mut(e)
                    .expect("parent of a body-position node must have a body slot");
                debug_assert_eq!(*slot, old, "replace_body_slot: old is not parent's body");
                *slot = new;
            }
            NodeData::Cont(c) => {
                debug_assert_eq!(c.body, old, "replace_body_slot: old is not parent's body");
                c.body = new;
            }
            NodeData::Prim(_) => {
                panic!("a primitive cannot be the structural parent of a body-position node")
            }
        }
        self.parent[new] = Some(parent);
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

fn expression_body_mut(e: &mut Expression) -> Option<&mut NodeId> {
    match e {
        Expression::LetPrim { body, .. }
        | Expression::LetCont { body, .. }
        | Expression::LetHandler { body, .. }
        | Expression::LetMutable { body, .. }
        | Expression::SetMutableVariable { body, .. }
        | Expression::SetField { body, .. }
        | Expression::SetStatic { body, .. }
        | Expression::DeclareFunction { body, .. } => Some(body),
        Expression::InvokeStatic { .. }
        | Expression::InvokeMethod { .. }
        | Expression::InvokeMethodDirectly { .. }
        | Expression::InvokeConstructor { .. }
        | Expression::InvokeContinuation { .. }
        | Expression::ConcatenateStrings { .. }
        | Expression::TypeOperator { .. }
        | Expression::Branch { .. }
        | Expression::Throw { .. }
        | Expression::Rethrow => None,
    }
}

pub struct UseIter<'a> {
    graph: &'a Graph,
    current: Option<RefId>,
}

impl Iterator for UseIter<'_> {
    type Item = Use;

    fn next(&mut self) -> Option<Self::Item> {
        let r = self.current?;
        self.current = self.graph.refs[r].next;
        Some(Use(r))
    }
}
