//! End-to-end scenarios exercising the analyzer and transformer together
//! through the public `run_sccp` entry point.

use cps_ir::{Expression, Graph, NodeId, Primitive, PrimitiveConstant, Selector, TypeAnnotation, TypeBits, TypeMask, TypeOperatorKind};
use cps_sccp::{BasicConstantSystem, SccpConfig, TypeMaskSystem, UnitTypeSystem};

fn trivial_continuation(g: &mut Graph, parent: NodeId, arity: usize) -> NodeId {
    g.continuation(parent, arity, |g, c, _params| g.push_expression(c, Expression::Rethrow))
}

fn run(g: &mut Graph) -> cps_sccp::TransformStats {
    cps_sccp::run_sccp(g, UnitTypeSystem, BasicConstantSystem, SccpConfig::new()).unwrap()
}

fn constant_of(g: &Graph, node: NodeId) -> PrimitiveConstant {
    match g.node(node).as_prim().unwrap() {
        Primitive::Constant(c) => c.clone(),
        other => panic!("expected Constant primitive, got {other:?}"),
    }
}

#[test]
fn s1_constant_branch_elimination() {
    let mut g = Graph::new();
    let root = g.root();
    let k_true = trivial_continuation(&mut g, root, 0);
    let k_false = trivial_continuation(&mut g, root, 0);

    let body = g.let_constant(root, PrimitiveConstant::Bool(true), |g, let_node, c| {
        g.branch(let_node, c, k_true, k_false)
    });
    g.set_root_body(body);

    let stats = run(&mut g);
    assert_eq!(stats.branches_resolved, 1);

    // The outer `let c = true` survives (a later shrinking pass collects the
    // now-dead constant, per spec.md §4.1's "core produces a correct but
    // possibly bloated graph"); only its body is rewritten.
    let root_body = g.root_body();
    match g.node(root_body).as_expr().unwrap() {
        Expression::LetPrim { body, .. } => match g.node(*body).as_expr().unwrap() {
            Expression::InvokeContinuation { cont, args } => {
                assert_eq!(g.use_target(*cont), k_true);
                assert!(args.is_empty());
            }
            other => panic!("expected InvokeContinuation, got {other:?}"),
        },
        other => panic!("expected LetPrim, got {other:?}"),
    }
}

#[test]
fn s2_constant_arithmetic_folds() {
    let mut g = Graph::new();
    let root = g.root();
    let k = trivial_continuation(&mut g, root, 1);

    let body = g.let_constant(root, PrimitiveConstant::Int(2), |g, _outer_let, two| {
        g.let_constant(root, PrimitiveConstant::Int(3), |g, inner_let, three| {
            g.invoke_method(inner_let, two, Selector::binary_operator(cps_ir::BinaryOp::Add), &[three], k)
        })
    });
    g.set_root_body(body);

    let stats = run(&mut g);
    assert_eq!(stats.constants_materialized, 1);

    // Walk down through the surviving `let two`/`let three` bindings to the
    // rewritten `InvokeMethod`.
    let mut node = g.root_body();
    for _ in 0..2 {
        node = match g.node(node).as_expr().unwrap() {
            Expression::LetPrim { body, .. } => *body,
            other => panic!("expected LetPrim, got {other:?}"),
        };
    }
    match g.node(node).as_expr().unwrap() {
        Expression::LetPrim { prim, body } => {
            assert_eq!(constant_of(&g, *prim), PrimitiveConstant::Int(5));
            match g.node(*body).as_expr().unwrap() {
                Expression::InvokeContinuation { cont, args } => {
                    assert_eq!(g.use_target(*cont), k);
                    assert_eq!(args.len(), 1);
                    assert_eq!(g.use_target(args[0]), *prim);
                }
                other => panic!("expected InvokeContinuation, got {other:?}"),
            }
        }
        other => panic!("expected LetPrim, got {other:?}"),
    }
}

#[test]
fn s3_non_bool_constant_in_branch_is_not_rewritten() {
    let mut g = Graph::new();
    let root = g.root();
    let k_true = trivial_continuation(&mut g, root, 0);
    let k_false = trivial_continuation(&mut g, root, 0);

    let body = g.let_constant(root, PrimitiveConstant::Int(42), |g, let_node, c| {
        g.branch(let_node, c, k_true, k_false)
    });
    g.set_root_body(body);

    let stats = run(&mut g);
    assert_eq!(stats.branches_resolved, 0);

    let root_body = g.root_body();
    match g.node(root_body).as_expr().unwrap() {
        Expression::LetPrim { body, .. } => {
            assert!(matches!(g.node(*body).as_expr().unwrap(), Expression::Branch { .. }));
        }
        other => panic!("expected LetPrim, got {other:?}"),
    }
}

/// Two continuations, reached only through a branch on a non-constant
/// condition, each invoke `k` with a different constant. The solver must
/// join both arguments into `k`'s parameter via the `InvokeContinuation`
/// phi-join (spec.md §4.4), landing on `NonConst`, not either constant.
#[test]
fn s4_phi_join_via_continuation_is_non_const() {
    let mut g = Graph::new();
    let root = g.root();

    let k = trivial_continuation(&mut g, root, 1);
    let k_true = g.continuation(root, 0, |g, c, _| {
        g.let_constant(c, PrimitiveConstant::Int(1), |g, let_node, one| g.invoke_continuation(let_node, k, &[one]))
    });
    let k_false = g.continuation(root, 0, |g, c, _| {
        g.let_constant(c, PrimitiveConstant::Int(2), |g, let_node, two| g.invoke_continuation(let_node, k, &[two]))
    });

    let param = g.add_root_parameter(TypeAnnotation::Known(TypeMask::new(TypeBits::BOOL, false)));
    let body = g.branch(root, param, k_true, k_false);
    g.set_root_body(body);

    let mut analyzer = cps_sccp::Analyzer::new(UnitTypeSystem, BasicConstantSystem);
    analyzer.run(&g).unwrap();

    let k_param = g.node(k).as_cont().unwrap().params[0];
    assert!(matches!(analyzer.value(k_param), cps_sccp::Lattice::NonConst(())));
}

#[test]
fn s5_string_concatenation_folds() {
    let mut g = Graph::new();
    let root = g.root();
    let k = trivial_continuation(&mut g, root, 1);

    let body = g.let_constant(root, PrimitiveConstant::Str("Hello, ".into()), |g, _outer_let, hello| {
        g.let_constant(root, PrimitiveConstant::Str("world".into()), |g, inner_let, world| {
            g.concatenate_strings(inner_let, &[hello, world], k)
        })
    });
    g.set_root_body(body);

    let stats = run(&mut g);
    assert_eq!(stats.constants_materialized, 1);

    let mut node = g.root_body();
    for _ in 0..2 {
        node = match g.node(node).as_expr().unwrap() {
            Expression::LetPrim { body, .. } => *body,
            other => panic!("expected LetPrim, got {other:?}"),
        };
    }
    match g.node(node).as_expr().unwrap() {
        Expression::LetPrim { prim, .. } => {
            assert_eq!(constant_of(&g, *prim), PrimitiveConstant::Str("Hello, world".into()));
        }
        other => panic!("expected LetPrim, got {other:?}"),
    }
}

#[test]
fn s6_is_check_on_null() {
    for (target, expected) in [
        (TypeAnnotation::Known(TypeMask::new(TypeBits::NULL_TYPE, true)), true),
        (TypeAnnotation::Known(TypeMask::new(TypeBits::STRING, false)), false),
    ] {
        let mut g = Graph::new();
        let root = g.root();
        let k = trivial_continuation(&mut g, root, 1);
        let body = g.let_constant(root, PrimitiveConstant::Null, |g, let_node, null| {
            g.type_operator(let_node, null, TypeOperatorKind::Is, target, k)
        });
        g.set_root_body(body);

        let stats = cps_sccp::run_sccp(&mut g, TypeMaskSystem::new(), BasicConstantSystem, SccpConfig::new()).unwrap();
        assert_eq!(stats.constants_materialized, 1);

        let node = match g.node(g.root_body()).as_expr().unwrap() {
            Expression::LetPrim { body, .. } => *body,
            other => panic!("expected LetPrim, got {other:?}"),
        };
        match g.node(node).as_expr().unwrap() {
            Expression::LetPrim { prim, .. } => {
                assert_eq!(constant_of(&g, *prim), PrimitiveConstant::Bool(expected));
            }
            other => panic!("expected LetPrim, got {other:?}"),
        }
    }
}

#[test]
fn empty_root_is_a_no_op() {
    let mut g = Graph::new();
    assert!(g.is_empty());
    let stats = run(&mut g);
    assert_eq!(stats, cps_sccp::TransformStats::default());
    assert!(g.is_empty());
}

#[test]
fn identical_with_constant_true_simplifies_to_left_operand() {
    let mut g = Graph::new();
    let root = g.root();
    let param = g.add_root_parameter(TypeAnnotation::Known(TypeMask::new(TypeBits::BOOL, false)));
    let k = trivial_continuation(&mut g, root, 1);

    let body = g.let_constant(root, PrimitiveConstant::Bool(true), |g, outer_let, true_const| {
        g.let_identical(outer_let, param, true_const, |g, let_node, identical| {
            g.invoke_continuation(let_node, k, &[identical])
        })
    });
    g.set_root_body(body);

    cps_sccp::run_sccp(&mut g, TypeMaskSystem::new(), BasicConstantSystem, SccpConfig::new()).unwrap();

    let mut node = g.root_body();
    for _ in 0..2 {
        node = match g.node(node).as_expr().unwrap() {
            Expression::LetPrim { body, .. } => *body,
            other => panic!("expected LetPrim, got {other:?}"),
        };
    }
    match g.node(node).as_expr().unwrap() {
        Expression::InvokeContinuation { args, .. } => {
            assert_eq!(g.use_target(args[0]), param);
        }
        other => panic!("expected InvokeContinuation, got {other:?}"),
    }
}
