use crate::{
    constant::PrimitiveConstant,
    entity::{NodeId, RefId},
    selector::{Selector, TypeOperatorKind},
    types::TypeAnnotation,
};

/// A use-site of a definition.
///
/// This is the spec.md §3.1 "Reference": a single use, participating in the
/// definition's use-list, unlinkable in O(1). The wrapped [`RefId`] indexes
/// into [`Graph::refs`](crate::Graph); the defining [`NodeId`] it currently
/// points at is looked up through that indirection rather than stored
/// inline, so that rewriting a use (e.g. replacing all uses of one
/// definition with another) never has to walk back into the user's node
/// data to patch a raw id.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Use(pub(crate) RefId);

/// An expression: a node with a unique control-flow successor (or, for
/// `Branch`/`Throw`/`Rethrow`, a terminator with no fall-through successor).
#[derive(Debug)]
pub enum Expression {
    LetPrim {
        prim: NodeId,
        body: NodeId,
    },
    LetCont {
        cont: NodeId,
        body: NodeId,
    },
    LetHandler {
        handler: NodeId,
        body: NodeId,
    },
    LetMutable {
        var: NodeId,
        /// The initializer whose value is transferred into `var` when the
        /// analyzer visits this node.
        value: Use,
        body: NodeId,
    },
    InvokeStatic {
        args: Vec<Use>,
        cont: Use,
        return_ty: TypeAnnotation,
    },
    InvokeMethod {
        receiver: Use,
        selector: Selector,
        args: Vec<Use>,
        cont: Use,
    },
    InvokeMethodDirectly {
        receiver: Use,
        selector: Selector,
        args: Vec<Use>,
        cont: Use,
        return_ty: TypeAnnotation,
    },
    InvokeConstructor {
        args: Vec<Use>,
        cont: Use,
    },
    InvokeContinuation {
        cont: Use,
        args: Vec<Use>,
    },
    ConcatenateStrings {
        args: Vec<Use>,
        cont: Use,
    },
    TypeOperator {
        value: Use,
        kind: TypeOperatorKind,
        target_ty: TypeAnnotation,
        cont: Use,
    },
    Branch {
        condition: Use,
        true_cont: Use,
        false_cont: Use,
    },
    Throw {
        value: Use,
    },
    Rethrow,
    SetMutableVariable {
        var: Use,
        value: Use,
        body: NodeId,
    },
    SetField {
        object: Use,
        value: Use,
        body: NodeId,
    },
    SetStatic {
        value: Use,
        body: NodeId,
    },
    DeclareFunction {
        var: NodeId,
        function: NodeId,
        body: NodeId,
    },
}

/// A primitive (value-producing definition).
#[derive(Debug)]
pub enum Primitive {
    Constant(PrimitiveConstant),
    /// A formal parameter of a [`Continuation`] or of the root. Its parent
    /// pointer identifies the owner; the analyzer treats root parameters as
    /// immediately `NonConst` and continuation parameters as accruing their
    /// value only from `InvokeContinuation` joins (spec.md §4.4).
    Parameter { declared_ty: TypeAnnotation },
    MutableVariable,
    LiteralList(Vec<Use>),
    LiteralMap(Vec<(Use, Use)>),
    CreateFunction,
    CreateBox,
    CreateInstance { args: Vec<Use> },
    GetField { object: Use },
    GetStatic,
    GetMutableVariable { var: Use },
    ReifyTypeVar,
    ReifyRuntimeType,
    ReadTypeVariable,
    TypeExpression,
    Interceptor { value: Use },
    Identical { left: Use, right: Use },
    CreateInvocationMirror,
}

/// A named block with parameters, invoked to transfer control.
///
/// The root of the graph is itself represented as a `Continuation` (its
/// `params` are the function's formal parameters, if any; its `body` is the
/// program body) anchored at [`Graph::root`](crate::Graph::root), exactly
/// mirroring an ordinary continuation's shape.
#[derive(Debug)]
pub struct Continuation {
    pub params: Vec<NodeId>,
    pub body: NodeId,
}

#[derive(Debug)]
pub enum NodeData {
    Expr(Expression),
    Prim(Primitive),
    Cont(Continuation),
}

impl NodeData {
    pub fn as_expr(&self) -> Option<&Expression> {
        match self {
            Self::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_prim(&self) -> Option<&Primitive> {
        match self {
            Self::Prim(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_cont(&self) -> Option<&Continuation> {
        match self {
            Self::Cont(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_expr_mut(&mut self) -> Option<&mut Expression> {
        match self {
            Self::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_prim_mut(&mut self) -> Option<&mut Primitive> {
        match self {
            Self::Prim(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_cont_mut(&mut self) -> Option<&mut Continuation> {
        match self {
            Self::Cont(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_definition(&self) -> bool {
        !matches!(self, Self::Expr(_))
    }
}
