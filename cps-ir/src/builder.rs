//! Convenience constructors for building small graphs, used by this crate's
//! and `cps-sccp`'s tests (and, in a real pipeline, by the front end).
//!
//! CPS naturally nests inside out: a continuation's body must exist before
//! the continuation can be created, and an expression's body must exist
//! before the expression wrapping it can be created. Every helper here
//! reserves a node id first (via [`Graph::reserve`]) so that uses of the
//! node's own id (needed for `Use::user`) can be built, then overwrites the
//! placeholder with the final contents.

use crate::{
    constant::PrimitiveConstant,
    entity::NodeId,
    graph::Graph,
    node::{Continuation, Expression, NodeData, Primitive},
    selector::{Selector, TypeOperatorKind},
    types::TypeAnnotation,
};

impl Graph {
    /// Allocate a continuation with `arity` fresh `Dynamic`-typed
    /// parameters, whose body is produced by `build_body`.
    pub fn continuation(
        &mut self,
        parent: NodeId,
        arity: usize,
        build_body: impl FnOnce(&mut Graph, NodeId, &[NodeId]) -> NodeId,
    ) -> NodeId {
        let cont = self.reserve(parent);
        *self.node_mut(cont) = NodeData::Cont(Continuation {
            params: Vec::new(),
            body: cont,
        });
        let params: Vec<NodeId> = (0..arity)
            .map(|_| self.add_continuation_parameter(cont, TypeAnnotation::Dynamic))
            .collect();
        let body = build_body(self, cont, &params);
        self.node_mut(cont).as_cont_mut().unwrap().body = body;
        cont
    }

    /// `let prim = <value>; <build_body's expression>`
    ///
    /// `build_body` receives the `LetPrim` node's own id and the id of the
    /// freshly bound constant, so the body can reference it.
    pub fn let_constant(
        &mut self,
        parent: NodeId,
        value: PrimitiveConstant,
        build_body: impl FnOnce(&mut Graph, NodeId, NodeId) -> NodeId,
    ) -> NodeId {
        let let_node = self.reserve(parent);
        let prim = self.push_primitive(let_node, Primitive::Constant(value));
        let body = build_body(self, let_node, prim);
        *self.node_mut(let_node) = NodeData::Expr(Expression::LetPrim { prim, body });
        let_node
    }

    pub fn invoke_continuation(
        &mut self,
        parent: NodeId,
        cont: NodeId,
        args: &[NodeId],
    ) -> NodeId {
        let node = self.reserve(parent);
        let cont_use = self.new_use(cont, node);
        let arg_uses: Vec<_> = args.iter().map(|&a| self.new_use(a, node)).collect();
        *self.node_mut(node) = NodeData::Expr(Expression::InvokeContinuation {
            cont: cont_use,
            args: arg_uses,
        });
        node
    }

    pub fn branch(
        &mut self,
        parent: NodeId,
        condition: NodeId,
        true_cont: NodeId,
        false_cont: NodeId,
    ) -> NodeId {
        let node = self.reserve(parent);
        let condition = self.new_use(condition, node);
        let true_cont = self.new_use(true_cont, node);
        let false_cont = self.new_use(false_cont, node);
        *self.node_mut(node) = NodeData::Expr(Expression::Branch {
            condition,
            true_cont,
            false_cont,
        });
        node
    }

    pub fn invoke_method(
        &mut self,
        parent: NodeId,
        receiver: NodeId,
        selector: Selector,
        args: &[NodeId],
        cont: NodeId,
    ) -> NodeId {
        let node = self.reserve(parent);
        let receiver = self.new_use(receiver, node);
        let arg_uses: Vec<_> = args.iter().map(|&a| self.new_use(a, node)).collect();
        let cont = self.new_use(cont, node);
        *self.node_mut(node) = NodeData::Expr(Expression::InvokeMethod {
            receiver,
            selector,
            args: arg_uses,
            cont,
        });
        node
    }

    pub fn concatenate_strings(
        &mut self,
        parent: NodeId,
        args: &[NodeId],
        cont: NodeId,
    ) -> NodeId {
        let node = self.reserve(parent);
        let arg_uses: Vec<_> = args.iter().map(|&a| self.new_use(a, node)).collect();
        let cont = self.new_use(cont, node);
        *self.node_mut(node) = NodeData::Expr(Expression::ConcatenateStrings {
            args: arg_uses,
            cont,
        });
        node
    }

    pub fn type_operator(
        &mut self,
        parent: NodeId,
        value: NodeId,
        kind: TypeOperatorKind,
        target_ty: TypeAnnotation,
        cont: NodeId,
    ) -> NodeId {
        let node = self.reserve(parent);
        let value_use = self.new_use(value, node);
        let cont = self.new_use(cont, node);
        *self.node_mut(node) = NodeData::Expr(Expression::TypeOperator {
            value: value_use,
            kind,
            target_ty,
            cont,
        });
        node
    }

    /// `let mutable var = <value>; <build_body's expression>`
    pub fn let_mutable(
        &mut self,
        parent: NodeId,
        value: NodeId,
        build_body: impl FnOnce(&mut Graph, NodeId) -> NodeId,
    ) -> NodeId {
        let let_node = self.reserve(parent);
        let var = self.push_primitive(let_node, Primitive::MutableVariable);
        let value = self.new_use(value, let_node);
        let body = build_body(self, let_node);
        *self.node_mut(let_node) = NodeData::Expr(Expression::LetMutable { var, value, body });
        let_node
    }

    /// `let prim = Identical(left, right); <build_body's expression>`
    pub fn let_identical(
        &mut self,
        parent: NodeId,
        left: NodeId,
        right: NodeId,
        build_body: impl FnOnce(&mut Graph, NodeId, NodeId) -> NodeId,
    ) -> NodeId {
        let let_node = self.reserve(parent);
        let prim = self.reserve(let_node);
        let left = self.new_use(left, prim);
        let right = self.new_use(right, prim);
        *self.node_mut(prim) = NodeData::Prim(Primitive::Identical { left, right });
        let body = build_body(self, let_node, prim);
        *self.node_mut(let_node) = NodeData::Expr(Expression::LetPrim { prim, body });
        let_node
    }
}
