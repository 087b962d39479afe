use crate::{constant::PrimitiveConstant, graph::Graph, node::Primitive};

#[test]
fn new_graph_is_empty() {
    let g = Graph::new();
    assert!(g.is_empty());
}

#[test]
fn building_a_let_clears_empty() {
    let mut g = Graph::new();
    let root = g.root();
    let body = g.continuation(root, 1, |g, cont, params| {
        g.invoke_continuation(cont, cont, &[params[0]])
    });
    g.set_root_body(body);
    assert!(!g.is_empty());
}

#[test]
fn use_list_tracks_and_unlinks() {
    let mut g = Graph::new();
    let root = g.root();
    let def = g.push_primitive(root, Primitive::Constant(PrimitiveConstant::Int(1)));
    let user_a = g.reserve(root);
    let user_b = g.reserve(root);
    let use_a = g.new_use(def, user_a);
    let use_b = g.new_use(def, user_b);

    let mut users: Vec<_> = g.uses_of(def).map(|u| g.use_user(u)).collect();
    users.sort_by_key(|n| format!("{n:?}"));
    assert_eq!(users.len(), 2);

    g.unlink(use_a);
    let remaining: Vec<_> = g.uses_of(def).collect();
    assert_eq!(remaining, vec![use_b]);

    g.unlink(use_b);
    assert!(!g.has_uses(def));
}

#[test]
fn replace_all_uses_with_redirects_every_reference() {
    let mut g = Graph::new();
    let root = g.root();
    let old_def = g.push_primitive(root, Primitive::Constant(PrimitiveConstant::Bool(true)));
    let new_def = g.push_primitive(root, Primitive::Constant(PrimitiveConstant::Bool(false)));
    let user = g.reserve(root);
    let u = g.new_use(old_def, user);

    g.replace_all_uses_with(old_def, new_def);
    assert_eq!(g.use_target(u), new_def);
    assert!(!g.has_uses(old_def));
    assert!(g.has_uses(new_def));
}
