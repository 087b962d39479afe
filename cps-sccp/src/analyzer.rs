//! The two-worklist fixed-point solver (spec.md §4.4): simultaneous
//! reachability analysis and constant propagation over a [`Graph`].

use cranelift_entity::SecondaryMap;
use log::{debug, trace};

use cps_ir::{Expression, Graph, NodeData, NodeId, Primitive, Use};

use crate::{constant_system::ConstantSystem, error::SccpError, lattice::Lattice, type_system::TypeSystem};

/// Fixed-point reachability + lattice solver.
///
/// Holds only its own `reachable`/`values`/worklist state; `graph` is
/// threaded through every call rather than stored, so the analyzer never
/// holds a borrow of the graph beyond a single method call — this is what
/// lets the transformer take the graph back as `&mut` once analysis has
/// finished (spec.md §5: the graph is mutated only by the transformer,
/// after the analyzer has fully terminated).
pub struct Analyzer<TS: TypeSystem, CS: ConstantSystem> {
    type_system: TS,
    constant_system: CS,
    reachable: SecondaryMap<NodeId, bool>,
    values: SecondaryMap<NodeId, Lattice<TS::Ty>>,
    node_worklist: Vec<NodeId>,
    def_worklist: Vec<NodeId>,
    in_def_worklist: SecondaryMap<NodeId, bool>,
    max_iterations: Option<usize>,
}

impl<TS: TypeSystem, CS: ConstantSystem> Analyzer<TS, CS> {
    pub fn new(type_system: TS, constant_system: CS) -> Self {
        Self {
            type_system,
            constant_system,
            reachable: SecondaryMap::new(),
            values: SecondaryMap::new(),
            node_worklist: Vec::new(),
            def_worklist: Vec::new(),
            in_def_worklist: SecondaryMap::new(),
            max_iterations: None,
        }
    }

    pub fn with_max_iterations(mut self, max: Option<usize>) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn is_reachable(&self, n: NodeId) -> bool {
        self.reachable[n]
    }

    pub fn value(&self, n: NodeId) -> &Lattice<TS::Ty> {
        &self.values[n]
    }

    pub fn type_system(&self) -> &TS {
        &self.type_system
    }

    /// Run the solver to quiescence over `graph`. A no-op on an empty graph
    /// (spec.md §6).
    pub fn run(&mut self, graph: &Graph) -> Result<(), SccpError> {
        if graph.is_empty() {
            return Ok(());
        }

        let root = graph.root();
        self.set_reachable(root);
        for &param in graph.root_params() {
            if let Some(Primitive::Parameter { declared_ty }) = graph.node(param).as_prim() {
                let ty = self.type_system.lift(*declared_ty);
                self.set_value(graph, param, Lattice::NonConst(ty));
            }
        }

        let mut iterations: usize = 0;
        while !self.node_worklist.is_empty() || !self.def_worklist.is_empty() {
            if let Some(max) = self.max_iterations {
                iterations += 1;
                debug_assert!(
                    iterations <= max,
                    "sccp analyzer exceeded configured max_iterations ({max})"
                );
            }
            if let Some(n) = self.node_worklist.pop() {
                trace!("visiting reachable node {n:?}");
                self.visit_reachable(graph, n)?;
            } else if let Some(def) = self.pop_def_worklist() {
                trace!("revisiting uses of changed definition {def:?}");
                let users: Vec<NodeId> = graph.uses_of(def).map(|u| graph.use_user(u)).collect();
                for user in users {
                    self.visit_user(graph, user)?;
                }
            }
        }
        Ok(())
    }

    // --- worklist bookkeeping --------------------------------------------

    fn set_reachable(&mut self, n: NodeId) {
        if !self.reachable[n] {
            self.reachable[n] = true;
            self.node_worklist.push(n);
        }
    }

    fn push_def_worklist(&mut self, n: NodeId) {
        if !self.in_def_worklist[n] {
            self.in_def_worklist[n] = true;
            self.def_worklist.push(n);
        }
    }

    fn pop_def_worklist(&mut self) -> Option<NodeId> {
        let n = self.def_worklist.pop()?;
        self.in_def_worklist[n] = false;
        Some(n)
    }

    /// `values[n] = v ⊔ values[n]`; enforces monotonicity and schedules
    /// `n`'s uses for revisit when `n` is a definition and its value rose.
    fn set_value(&mut self, graph: &Graph, n: NodeId, v: Lattice<TS::Ty>) {
        let existing = self.values[n].clone();
        let joined = self.join_lattice(&v, &existing);
        if joined == existing {
            return;
        }
        debug_assert!(
            existing.rises_to(&joined),
            "lattice value fell for node {n:?}: {existing} -> {joined}"
        );
        debug!("node {n:?}: {existing} -> {joined}");
        self.values[n] = joined;
        if graph.node(n).is_definition() {
            self.push_def_worklist(n);
        }
    }

    fn join_lattice(&self, a: &Lattice<TS::Ty>, b: &Lattice<TS::Ty>) -> Lattice<TS::Ty> {
        let ty = match (a.ty(), b.ty()) {
            (Some(t1), Some(t2)) => self.type_system.join(t1, t2),
            (Some(t1), None) => t1.clone(),
            (None, Some(t2)) => t2.clone(),
            (None, None) => self.type_system.dynamic(),
        };
        a.join(b, ty)
    }

    fn value_of(&self, n: NodeId) -> Lattice<TS::Ty> {
        self.values[n].clone()
    }

    fn value_of_use(&self, graph: &Graph, u: Use) -> Lattice<TS::Ty> {
        self.value_of(graph.use_target(u))
    }

    // --- dispatch ----------------------------------------------------------

    fn visit_reachable(&mut self, graph: &Graph, n: NodeId) -> Result<(), SccpError> {
        match graph.node(n) {
            NodeData::Cont(cont) => {
                self.set_reachable(cont.body);
                Ok(())
            }
            NodeData::Expr(_) => self.visit_expression(graph, n),
            NodeData::Prim(_) => Ok(()),
        }
    }

    fn visit_user(&mut self, graph: &Graph, n: NodeId) -> Result<(), SccpError> {
        match graph.node(n) {
            NodeData::Expr(_) => self.visit_expression(graph, n),
            NodeData::Prim(_) => self.visit_primitive(graph, n),
            NodeData::Cont(_) => Ok(()),
        }
    }

    fn visit_expression(&mut self, graph: &Graph, n: NodeId) -> Result<(), SccpError> {
        match graph.node(n).as_expr().expect("visit_expression on non-expression") {
            Expression::LetPrim { prim, body } => {
                let (prim, body) = (*prim, *body);
                self.visit_primitive(graph, prim)?;
                self.set_reachable(body);
            }
            Expression::LetCont { body, .. } => {
                self.set_reachable(*body);
            }
            Expression::LetHandler { handler, body } => {
                let (handler, body) = (*handler, *body);
                self.set_reachable(handler);
                let dynamic = self.type_system.dynamic();
                let params = graph
                    .node(handler)
                    .as_cont()
                    .map(|c| c.params.clone())
                    .unwrap_or_default();
                for param in params {
                    self.set_value(graph, param, Lattice::NonConst(dynamic.clone()));
                }
                self.set_reachable(body);
            }
            Expression::LetMutable { var, value, body } => {
                let (var, value, body) = (*var, *value, *body);
                // §9 Open Question: conservatively NonConst rather than the
                // initializer's literal value, since a later `SetMutableVariable`
                // elsewhere in the function is not visible from this binder alone.
                let init_ty = self.value_of_use(graph, value).ty().cloned().unwrap_or_else(|| self.type_system.dynamic());
                self.set_value(graph, var, Lattice::NonConst(init_ty));
                self.set_reachable(body);
            }
            Expression::InvokeStatic { cont, return_ty, .. } => {
                let (cont, return_ty) = (*cont, *return_ty);
                let ty = self.type_system.lift(return_ty);
                self.propagate_call_result(graph, cont, ty);
            }
            Expression::InvokeConstructor { cont, .. } => {
                let cont = *cont;
                let dynamic = self.type_system.dynamic();
                self.propagate_call_result(graph, cont, dynamic);
            }
            Expression::InvokeMethodDirectly { cont, return_ty, .. } => {
                let (cont, return_ty) = (*cont, *return_ty);
                let ty = self.type_system.lift(return_ty);
                self.propagate_call_result(graph, cont, ty);
            }
            Expression::InvokeMethod {
                receiver,
                selector,
                args,
                cont,
            } => {
                let (receiver, selector, args, cont) =
                    (*receiver, selector.clone(), args.clone(), *cont);
                self.visit_invoke_method(graph, n, receiver, &selector, &args, cont);
            }
            Expression::InvokeContinuation { cont, args } => {
                let (cont, args) = (*cont, args.clone());
                self.visit_invoke_continuation(graph, cont, &args);
            }
            Expression::ConcatenateStrings { args, cont } => {
                let (args, cont) = (args.clone(), *cont);
                self.visit_concatenate_strings(graph, n, &args, cont);
            }
            Expression::TypeOperator {
                value,
                kind,
                target_ty,
                cont,
            } => {
                let (value, kind, target_ty, cont) = (*value, *kind, *target_ty, *cont);
                self.visit_type_operator(graph, n, value, kind, target_ty, cont);
            }
            Expression::Branch {
                condition,
                true_cont,
                false_cont,
            } => {
                let (condition, true_cont, false_cont) = (*condition, *true_cont, *false_cont);
                self.visit_branch(graph, condition, true_cont, false_cont);
            }
            Expression::Throw { .. } | Expression::Rethrow => {}
            Expression::SetMutableVariable { var, value, body } => {
                let (var, value, body) = (*var, *value, *body);
                let var_def = graph.use_target(var);
                let new_value = self.value_of_use(graph, value);
                self.set_value(graph, var_def, new_value);
                self.set_reachable(body);
            }
            Expression::SetField { body, .. } => {
                self.set_reachable(*body);
            }
            Expression::SetStatic { body, .. } => {
                self.set_reachable(*body);
            }
            Expression::DeclareFunction { var, function, body } => {
                let (var, function, body) = (*var, *function, *body);
                // §9 Open Question: conservatively NonConst, same reasoning as
                // `LetMutable` — `CreateFunction` always yields a `Constant`, but
                // treating the bound variable as one would be unsound the moment
                // any `SetMutableVariable` reassigns it.
                let fn_ty = self.value_of(function).ty().cloned().unwrap_or_else(|| self.type_system.dynamic());
                self.set_value(graph, var, Lattice::NonConst(fn_ty));
                self.set_reachable(body);
            }
        }
        Ok(())
    }

    /// Shared tail for `InvokeStatic`/`InvokeConstructor`/`InvokeMethodDirectly`:
    /// the continuation is reachable and its parameters receive the call's
    /// declared return type as `NonConst` (spec.md §4.4); these three call
    /// forms never fold to a constant.
    fn propagate_call_result(&mut self, graph: &Graph, cont: Use, return_ty: TS::Ty) {
        let cont_node = graph.use_target(cont);
        self.set_reachable(cont_node);
        let params = graph
            .node(cont_node)
            .as_cont()
            .map(|c| c.params.clone())
            .unwrap_or_default();
        for param in params {
            self.set_value(graph, param, Lattice::NonConst(return_ty.clone()));
        }
    }

    fn visit_invoke_continuation(&mut self, graph: &Graph, cont: Use, args: &[Use]) {
        let cont_node = graph.use_target(cont);
        self.set_reachable(cont_node);
        let params = graph
            .node(cont_node)
            .as_cont()
            .map(|c| c.params.clone())
            .unwrap_or_default();
        for (&param, &arg) in params.iter().zip(args) {
            let arg_value = self.value_of_use(graph, arg);
            self.set_value(graph, param, arg_value);
        }
    }

    fn visit_invoke_method(
        &mut self,
        graph: &Graph,
        call_node: NodeId,
        receiver: Use,
        selector: &cps_ir::Selector,
        args: &[Use],
        cont: Use,
    ) {
        let cont_node = graph.use_target(cont);
        self.set_reachable(cont_node);

        let lhs = self.value_of_use(graph, receiver);
        if matches!(lhs, Lattice::Nothing) {
            return;
        }

        let return_ty = self.type_system.selector_return_type(selector);
        let fallback = Lattice::NonConst(return_ty);

        let folded = match (&lhs, selector.operator) {
            (Lattice::Constant(c, _), Some(cps_ir::OperatorKind::Unary(op))) => {
                self.constant_system.fold_unary(op, c).map(|r| {
                    let ty = self.type_system.type_of(&r);
                    Lattice::Constant(r, ty)
                })
            }
            (Lattice::Constant(lc, _), Some(cps_ir::OperatorKind::Binary(op))) => {
                match args.first().map(|&a| self.value_of_use(graph, a)) {
                    Some(Lattice::Nothing) | None => return,
                    Some(Lattice::Constant(rc, _)) => self.constant_system.fold_binary(op, lc, &rc).map(|r| {
                        let ty = self.type_system.type_of(&r);
                        Lattice::Constant(r, ty)
                    }),
                    Some(Lattice::NonConst(_)) => None,
                }
            }
            _ => None,
        };

        let result = folded.unwrap_or(fallback);
        self.set_value(graph, call_node, result.clone());
        let params = graph
            .node(cont_node)
            .as_cont()
            .map(|c| c.params.clone())
            .unwrap_or_default();
        for param in params {
            self.set_value(graph, param, result.clone());
        }
    }

    fn visit_concatenate_strings(&mut self, graph: &Graph, call_node: NodeId, args: &[Use], cont: Use) {
        let cont_node = graph.use_target(cont);
        self.set_reachable(cont_node);

        let values: Vec<_> = args.iter().map(|&a| self.value_of_use(graph, a)).collect();
        if values.iter().any(|v| matches!(v, Lattice::Nothing)) {
            return;
        }

        let string_ty = self.type_system.string_ty();
        let result = if values
            .iter()
            .all(|v| matches!(v.as_constant(), Some(cps_ir::PrimitiveConstant::Str(_))))
        {
            let mut joined = String::new();
            for v in &values {
                if let Some(cps_ir::PrimitiveConstant::Str(s)) = v.as_constant() {
                    joined.push_str(s);
                }
            }
            Lattice::Constant(cps_ir::PrimitiveConstant::Str(joined), string_ty)
        } else {
            Lattice::NonConst(string_ty)
        };

        self.set_value(graph, call_node, result.clone());
        let params = graph
            .node(cont_node)
            .as_cont()
            .map(|c| c.params.clone())
            .unwrap_or_default();
        for param in params {
            self.set_value(graph, param, result.clone());
        }
    }

    fn visit_type_operator(
        &mut self,
        graph: &Graph,
        call_node: NodeId,
        value: Use,
        kind: cps_ir::TypeOperatorKind,
        target_ty: cps_ir::TypeAnnotation,
        cont: Use,
    ) {
        let cont_node = graph.use_target(cont);
        self.set_reachable(cont_node);

        let target = self.type_system.lift(target_ty);
        let operand = self.value_of_use(graph, value);
        if matches!(operand, Lattice::Nothing) {
            return;
        }

        let result = match kind {
            cps_ir::TypeOperatorKind::As => Lattice::NonConst(target),
            cps_ir::TypeOperatorKind::Is => match operand.as_constant() {
                Some(c) => {
                    let receiver_ty = if c.is_null() {
                        self.type_system.core_null()
                    } else {
                        self.type_system.type_of(c)
                    };
                    let is_subtype = self.type_system.is_subtype(&receiver_ty, &target);
                    Lattice::Constant(cps_ir::PrimitiveConstant::Bool(is_subtype), self.type_system.bool_ty())
                }
                None => Lattice::NonConst(self.type_system.bool_ty()),
            },
        };

        self.set_value(graph, call_node, result.clone());
        let params = graph
            .node(cont_node)
            .as_cont()
            .map(|c| c.params.clone())
            .unwrap_or_default();
        for param in params {
            self.set_value(graph, param, result.clone());
        }
    }

    fn visit_branch(&mut self, graph: &Graph, condition: Use, true_cont: Use, false_cont: Use) {
        let c = self.value_of_use(graph, condition);
        let true_node = graph.use_target(true_cont);
        let false_node = graph.use_target(false_cont);
        match c {
            Lattice::Nothing => {}
            Lattice::NonConst(_) => {
                self.set_reachable(true_node);
                self.set_reachable(false_node);
            }
            Lattice::Constant(cps_ir::PrimitiveConstant::Bool(true), _) => {
                self.set_reachable(true_node);
            }
            Lattice::Constant(cps_ir::PrimitiveConstant::Bool(false), _) => {
                self.set_reachable(false_node);
            }
            Lattice::Constant(_, _) => {
                self.set_reachable(true_node);
                self.set_reachable(false_node);
                let bool_ty = self.type_system.bool_ty();
                let cond_def = graph.use_target(condition);
                self.set_value(graph, cond_def, Lattice::NonConst(bool_ty));
            }
        }
    }

    /// A `Parameter`'s only documented binders are continuations (the root
    /// counts, since it is itself represented as a `Continuation` — spec.md
    /// §3.1/§4.4). Anything else is the "unexpected parent" internal error
    /// spec.md §7 names.
    fn check_parameter_parent(&self, graph: &Graph, n: NodeId) -> Result<(), SccpError> {
        match graph.parent_of(n).map(|p| graph.node(p)) {
            Some(NodeData::Cont(_)) => Ok(()),
            _ => Err(SccpError::UnexpectedParent {
                node: n,
                message: "Parameter must be owned by a Continuation (root or otherwise)".to_string(),
            }),
        }
    }

    /// A `MutableVariable`'s only documented binders are `LetMutable` and
    /// `DeclareFunction` (spec.md §4.4); any other parent is the
    /// "unexpected parent" internal error spec.md §7 names.
    fn check_mutable_variable_parent(&self, graph: &Graph, n: NodeId) -> Result<(), SccpError> {
        let bound_here = match graph.parent_of(n).map(|p| graph.node(p)) {
            Some(NodeData::Expr(Expression::LetMutable { var, .. })) => *var == n,
            Some(NodeData::Expr(Expression::DeclareFunction { var, .. })) => *var == n,
            _ => false,
        };
        if bound_here {
            Ok(())
        } else {
            Err(SccpError::UnexpectedParent {
                node: n,
                message: "MutableVariable must be bound by its owning LetMutable or DeclareFunction".to_string(),
            })
        }
    }

    fn visit_primitive(&mut self, graph: &Graph, n: NodeId) -> Result<(), SccpError> {
        let result = match graph.node(n).as_prim().expect("visit_primitive on non-primitive") {
            Primitive::Constant(c) => {
                let ty = self.type_system.type_of(c);
                Lattice::Constant(c.clone(), ty)
            }
            Primitive::Parameter { declared_ty } => {
                self.check_parameter_parent(graph, n)?;
                Lattice::NonConst(self.type_system.lift(*declared_ty))
            }
            Primitive::MutableVariable => {
                self.check_mutable_variable_parent(graph, n)?;
                return Ok(());
            }
            Primitive::LiteralList(_) => Lattice::NonConst(self.type_system.list_ty()),
            Primitive::LiteralMap(_) => Lattice::NonConst(self.type_system.map_ty()),
            Primitive::CreateFunction => Lattice::NonConst(self.type_system.function()),
            Primitive::CreateBox => Lattice::NonConst(self.type_system.dynamic()),
            Primitive::CreateInstance { .. } => Lattice::NonConst(self.type_system.core_object()),
            Primitive::GetField { .. } => Lattice::NonConst(self.type_system.dynamic()),
            Primitive::GetStatic => Lattice::NonConst(self.type_system.dynamic()),
            Primitive::GetMutableVariable { .. } => Lattice::NonConst(self.type_system.dynamic()),
            Primitive::ReifyTypeVar | Primitive::ReifyRuntimeType | Primitive::ReadTypeVariable | Primitive::TypeExpression => {
                Lattice::NonConst(self.type_system.type_type())
            }
            Primitive::Interceptor { .. } => Lattice::NonConst(self.type_system.dynamic()),
            Primitive::CreateInvocationMirror => Lattice::NonConst(self.type_system.dynamic()),
            Primitive::Identical { left, right } => {
                let (left, right) = (*left, *right);
                let l = self.value_of_use(graph, left);
                let r = self.value_of_use(graph, right);
                match (&l, &r) {
                    (Lattice::Nothing, _) | (_, Lattice::Nothing) => return Ok(()),
                    (Lattice::NonConst(_), _) | (_, Lattice::NonConst(_)) => Lattice::NonConst(self.type_system.bool_ty()),
                    (Lattice::Constant(a, _), Lattice::Constant(b, _)) => {
                        Lattice::Constant(cps_ir::PrimitiveConstant::Bool(a == b), self.type_system.bool_ty())
                    }
                }
            }
        };
        self.set_value(graph, n, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cps_ir::{Graph, NodeData, Primitive, PrimitiveConstant};

    use crate::{constant_system::BasicConstantSystem, error::SccpError, type_system::UnitTypeSystem, Lattice};

    use super::Analyzer;

    #[test]
    fn let_mutable_conservatively_widens_the_initializer_to_non_const() {
        let mut g = Graph::new();
        let root = g.root();
        let body = g.let_constant(root, PrimitiveConstant::Int(7), |g, outer_let, init| {
            g.let_mutable(outer_let, init, |g, let_node| g.push_expression(let_node, cps_ir::Expression::Rethrow))
        });
        g.set_root_body(body);

        let let_mutable_node = match g.node(body).as_expr().unwrap() {
            cps_ir::Expression::LetPrim { body, .. } => *body,
            other => panic!("expected LetPrim, got {other:?}"),
        };
        let var = match g.node(let_mutable_node).as_expr().unwrap() {
            cps_ir::Expression::LetMutable { var, .. } => *var,
            other => panic!("expected LetMutable, got {other:?}"),
        };

        let mut analyzer = Analyzer::new(UnitTypeSystem, BasicConstantSystem);
        analyzer.run(&g).unwrap();
        assert!(matches!(analyzer.value(var), Lattice::NonConst(())));
    }

    #[test]
    fn mutable_variable_outside_its_binder_is_an_internal_error() {
        let mut g = Graph::new();
        let root = g.root();
        let let_node = g.reserve(root);
        let var = g.push_primitive(let_node, Primitive::MutableVariable);
        let body = g.push_expression(let_node, cps_ir::Expression::Rethrow);
        *g.node_mut(let_node) = NodeData::Expr(cps_ir::Expression::LetPrim { prim: var, body });
        g.set_root_body(let_node);

        let mut analyzer = Analyzer::new(UnitTypeSystem, BasicConstantSystem);
        let err = analyzer.run(&g).unwrap_err();
        assert!(matches!(err, SccpError::UnexpectedParent { node, .. } if node == var));
    }
}
