//! Recursive graph rewriter consuming the analyzer's reachability and value
//! maps (spec.md §4.5): constify-expression, the `Branch` rewrite, and the
//! `Identical` rewrite.

use log::{debug, trace};

use cps_ir::{Expression, Graph, NodeData, NodeId, Primitive, PrimitiveConstant, Use};

use crate::{analyzer::Analyzer, constant_system::ConstantSystem, error::SccpError, lattice::Lattice, materializer::ConstantMaterializer, type_system::TypeSystem};

/// Counts of rewrites performed, returned for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub constants_materialized: usize,
    pub branches_resolved: usize,
    pub identical_simplified: usize,
}

pub struct Transformer<'a, TS: TypeSystem, CS: ConstantSystem> {
    analyzer: &'a Analyzer<TS, CS>,
    materializer: ConstantMaterializer,
    stats: TransformStats,
}

impl<'a, TS: TypeSystem, CS: ConstantSystem> Transformer<'a, TS, CS> {
    pub fn new(analyzer: &'a Analyzer<TS, CS>, materializer: ConstantMaterializer) -> Self {
        Self {
            analyzer,
            materializer,
            stats: TransformStats::default(),
        }
    }

    /// Walk `graph` from the root, applying every local rewrite, and return
    /// the count of each kind performed.
    pub fn run(&mut self, graph: &mut Graph) -> Result<TransformStats, SccpError> {
        if graph.is_empty() {
            return Ok(self.stats);
        }
        let root = graph.root();
        self.walk_continuation(graph, root)?;
        Ok(self.stats)
    }

    fn walk_continuation(&mut self, graph: &mut Graph, cont: NodeId) -> Result<(), SccpError> {
        let body = match graph.node(cont).as_cont() {
            Some(c) => c.body,
            None => return Ok(()),
        };
        self.walk(graph, body)
    }

    /// Apply rewrites at `node`, then recurse into whatever remains of its
    /// body chain (and any nested continuations).
    fn walk(&mut self, graph: &mut Graph, node: NodeId) -> Result<(), SccpError> {
        trace!("walking node {node:?}");
        let node = self.maybe_rewrite(graph, node)?;

        enum Next {
            Body(NodeId),
            BodyAndNested(NodeId, NodeId),
            Stop,
        }

        let next = match graph.node(node).as_expr().expect("walk on non-expression") {
            Expression::LetPrim { body, .. }
            | Expression::LetMutable { body, .. }
            | Expression::SetMutableVariable { body, .. }
            | Expression::SetField { body, .. }
            | Expression::SetStatic { body, .. }
            | Expression::DeclareFunction { body, .. } => Next::Body(*body),
            Expression::LetCont { cont, body } => Next::BodyAndNested(*body, *cont),
            Expression::LetHandler { handler, body } => Next::BodyAndNested(*body, *handler),
            Expression::InvokeStatic { .. }
            | Expression::InvokeMethod { .. }
            | Expression::InvokeMethodDirectly { .. }
            | Expression::InvokeConstructor { .. }
            | Expression::InvokeContinuation { .. }
            | Expression::ConcatenateStrings { .. }
            | Expression::TypeOperator { .. }
            | Expression::Branch { .. }
            | Expression::Throw { .. }
            | Expression::Rethrow => Next::Stop,
        };

        match next {
            Next::Body(body) => self.walk(graph, body),
            Next::BodyAndNested(body, nested) => {
                self.walk_continuation(graph, nested)?;
                self.walk(graph, body)
            }
            Next::Stop => Ok(()),
        }
    }

    /// Apply whichever rewrite (if any) fires at `node`, returning the node
    /// the walk should continue from (itself, or its replacement).
    fn maybe_rewrite(&mut self, graph: &mut Graph, node: NodeId) -> Result<NodeId, SccpError> {
        match graph.node(node) {
            NodeData::Expr(Expression::LetPrim { prim, .. }) => {
                let prim = *prim;
                self.maybe_simplify_identical(graph, prim);
                Ok(node)
            }
            NodeData::Expr(Expression::InvokeMethod { receiver, args, cont, .. }) => {
                let (receiver, args, cont) = (*receiver, args.clone(), *cont);
                let mut unlink = vec![receiver, cont];
                unlink.extend_from_slice(&args);
                self.maybe_constify(graph, node, cont, &unlink)
            }
            NodeData::Expr(Expression::ConcatenateStrings { args, cont }) => {
                let (args, cont) = (args.clone(), *cont);
                let mut unlink = vec![cont];
                unlink.extend_from_slice(&args);
                self.maybe_constify(graph, node, cont, &unlink)
            }
            NodeData::Expr(Expression::TypeOperator { value, cont, .. }) => {
                let (value, cont) = (*value, *cont);
                self.maybe_constify(graph, node, cont, &[value, cont])
            }
            NodeData::Expr(Expression::Branch {
                condition,
                true_cont,
                false_cont,
            }) => {
                let (condition, true_cont, false_cont) = (*condition, *true_cont, *false_cont);
                Ok(self
                    .maybe_rewrite_branch(graph, node, condition, true_cont, false_cont)?
                    .unwrap_or(node))
            }
            _ => Ok(node),
        }
    }

    /// constify-expression (spec.md §4.5): when `node`'s computed value is
    /// constant, materialize it and splice in a `LetPrim` that invokes the
    /// original continuation with the new constant in its place.
    fn maybe_constify(
        &mut self,
        graph: &mut Graph,
        node: NodeId,
        cont: Use,
        uses_to_unlink: &[Use],
    ) -> Result<NodeId, SccpError> {
        let value = self.analyzer.value(node).clone();
        let Lattice::Constant(c, _) = value else {
            return Ok(node);
        };

        let parent = graph
            .parent_of(node)
            .expect("body-position node must have a structural parent");
        let cont_target = graph.use_target(cont);
        for &u in uses_to_unlink {
            graph.unlink(u);
        }

        let let_node = graph.reserve(parent);
        let prim = self.materializer.materialize(graph, let_node, c)?;
        let body = graph.invoke_continuation(let_node, cont_target, &[prim]);
        *graph.node_mut(let_node) = NodeData::Expr(Expression::LetPrim { prim, body });
        graph.replace_body_slot(parent, node, let_node);

        debug!("constified node {node:?} into {let_node:?}");
        self.stats.constants_materialized += 1;
        Ok(let_node)
    }

    /// Branch rewrite (spec.md §4.5): collapse a branch with exactly one
    /// reachable target into an unconditional `InvokeContinuation`.
    fn maybe_rewrite_branch(
        &mut self,
        graph: &mut Graph,
        node: NodeId,
        condition: Use,
        true_cont: Use,
        false_cont: Use,
    ) -> Result<Option<NodeId>, SccpError> {
        let true_target = graph.use_target(true_cont);
        let false_target = graph.use_target(false_cont);
        let true_reachable = self.analyzer.is_reachable(true_target);
        let false_reachable = self.analyzer.is_reachable(false_target);

        if true_reachable == false_reachable {
            return Ok(None);
        }

        let (kept_use, dead_use, chosen_target) = if true_reachable {
            (true_cont, false_cont, true_target)
        } else {
            (false_cont, true_cont, false_target)
        };

        let parent = graph
            .parent_of(node)
            .expect("body-position node must have a structural parent");
        graph.unlink(condition);
        graph.unlink(kept_use);
        graph.unlink(dead_use);

        let new_node = graph.invoke_continuation(parent, chosen_target, &[]);
        graph.replace_body_slot(parent, node, new_node);

        debug!("folded branch {node:?} to unconditional invoke of {chosen_target:?}");
        self.stats.branches_resolved += 1;
        Ok(Some(new_node))
    }

    /// Identical rewrite (spec.md §4.5): `x ≡ true` simplifies to `x` when
    /// `x` is definitely boolean.
    fn maybe_simplify_identical(&mut self, graph: &mut Graph, prim: NodeId) {
        let (left, right) = match graph.node(prim).as_prim() {
            Some(Primitive::Identical { left, right }) => (*left, *right),
            _ => return,
        };

        let left_target = graph.use_target(left);
        let right_target = graph.use_target(right);

        let left_is_bool = self
            .analyzer
            .value(left_target)
            .ty()
            .map(|ty| self.analyzer.type_system().is_definitely_bool(ty))
            .unwrap_or(false);
        let right_is_true = matches!(
            self.analyzer.value(right_target),
            Lattice::Constant(PrimitiveConstant::Bool(true), _)
        );

        if left_is_bool && right_is_true {
            graph.replace_all_uses_with(prim, left_target);
            debug!("simplified identical {prim:?} to {left_target:?}");
            self.stats.identical_simplified += 1;
        }
    }
}
