//! The typed AST: types, literals, expressions, and statement nodes.
//!
//! Types, expressions, and nodes form a DAG with sharing, so they are
//! allocated in three arenas indexed by 32-bit ids rather than owned
//! recursively through `Box`. This mirrors how [`slate_util::index_vec`]
//! is already used for other compiler-wide tables.

use std::collections::HashMap;

use slate_util::index_vec::{Idx, IndexVec};

use crate::Literal;

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize, "{} arena overflow", stringify!($name));
                $name(idx as u32)
            }
            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(TypeId);
arena_id!(ExprId);
arena_id!(NodeId);

/// `Type::Builtins` from the original data model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Int,
    Uint,
    Long,
    Ulong,
    Float,
    Double,
    Byte,
    Char,
    Boolean,
    Str,
    Void,
    Struct,
    Union,
    Interface,
    Alias,
    Pointer,
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Clone, Debug)]
pub struct Type {
    pub kind: TypeKind,
    pub mutable: bool,
    pub identifier: String,
    pub points_to: Option<TypeId>,
    pub fields: Vec<Variable>,
    pub params: Vec<TypeId>,
    pub return_type: Option<TypeId>,
}

impl Type {
    pub fn scalar(kind: TypeKind) -> Self {
        Type {
            kind,
            mutable: false,
            identifier: String::new(),
            points_to: None,
            fields: Vec::new(),
            params: Vec::new(),
            return_type: None,
        }
    }

    pub fn pointer(pointee: TypeId, mutable: bool) -> Self {
        Type {
            kind: TypeKind::Pointer,
            mutable,
            identifier: String::new(),
            points_to: Some(pointee),
            fields: Vec::new(),
            params: Vec::new(),
            return_type: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Literal,
    Variable,
    FuncCall,
    InterfaceRef,
    InterfaceCall,
    Reference,
    Dereference,
    Subscript,
    DotNotation,
    Cast,
    Custom,
}

#[derive(Clone, Debug)]
pub struct FuncCallExpr {
    pub callee: NodeId,
    pub args: Vec<ExprId>,
}

/// A call through an `interface`-typed variable: there is no declaration
/// node to point at, so the callee is the expression that produced the
/// interface value rather than a [`NodeId`].
#[derive(Clone, Debug)]
pub struct InterfaceCallExpr {
    pub callee: ExprId,
    pub args: Vec<ExprId>,
}

#[derive(Clone, Debug)]
pub struct SubscriptExpr {
    pub base: ExprId,
    pub index: ExprId,
}

#[derive(Clone, Debug)]
pub struct DotNotationExpr {
    pub base: ExprId,
    pub after: String,
}

#[derive(Clone, Debug)]
pub struct CastExpr {
    pub inner: ExprId,
    pub cast: Cast,
}

#[derive(Clone, Debug)]
pub struct CustomExpr {
    pub a: ExprId,
    pub b: Option<ExprId>,
    pub op: Operation,
}

/// Closed payload per [`ExprKind`] (REDESIGN FLAG "Shared AST graph" /
/// "Property bag on nodes" applied to expressions as well as statements).
#[derive(Clone, Debug)]
pub enum ExprPayload {
    Literal(Literal),
    Variable(Variable),
    FuncCall(FuncCallExpr),
    InterfaceRef(NodeId),
    InterfaceCall(InterfaceCallExpr),
    Reference(ExprId),
    Dereference(ExprId),
    Subscript(SubscriptExpr),
    DotNotation(DotNotationExpr),
    Cast(CastExpr),
    Custom(CustomExpr),
}

#[derive(Clone, Debug)]
pub struct Expression {
    pub kind: ExprKind,
    pub return_type: TypeId,
    pub payload: ExprPayload,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub unary: bool,
    pub symbols: String,
    pub a: TypeId,
    pub b: Option<TypeId>,
    pub r: TypeId,
    pub body: NodeId,
    pub precedence: i32,
    /// Names of the operand variable(s) as declared in the operator's own
    /// signature (`a_name`, and `b_name` for binary operators) — the
    /// codegen driver needs these to bind call-site argument values to the
    /// names the body's expressions were baked to reference at parse time.
    pub a_name: String,
    pub b_name: Option<String>,
}

impl Operation {
    /// Structural identity ignoring `body`/`precedence`, matching the
    /// original's `operator==` on `Operation`.
    pub fn same_signature(&self, other: &Operation) -> bool {
        self.unary == other.unary
            && self.symbols == other.symbols
            && self.a == other.a
            && self.b == other.b
            && self.r == other.r
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cast {
    pub from: TypeId,
    pub to: TypeId,
    pub body: NodeId,
    /// Name of the cast's own input-variable binding, as declared in
    /// `cast<name:from> to : { ... }` — the codegen driver binds the
    /// call-site argument to this name.
    pub param_name: String,
}

impl Cast {
    pub fn same_signature(&self, other: &Cast) -> bool {
        self.from == other.from && self.to == other.to
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Scope,
    FuncDecl,
    VarDecl,
    TypeDecl,
    PublicField,
    Import,
    Namesp,
    Defer,
    VarSet,
    ReturnStmt,
    AsmCode,
    OperationDecl,
    CastDecl,
    IfStmt,
    WhileStmt,
    DoWhileStmt,
    ForStmt,
    AliasDecl,
    AliasUse,
}

#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Variable>,
    pub return_type: TypeId,
    pub inline: bool,
    pub body: Option<Vec<NodeId>>,
}

#[derive(Clone, Debug)]
pub struct VarDecl {
    pub var: Variable,
    pub value: Option<ExprId>,
}

/// `ty` is `None` for a `struct;`/`union;` forward declaration awaiting its
/// completing body.
#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: String,
    pub ty: Option<TypeId>,
}

#[derive(Clone, Debug)]
pub struct PublicField {
    pub name: String,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ImportStmt {
    pub path: String,
    pub section: String,
}

#[derive(Clone, Debug)]
pub struct Namesp {
    pub name: String,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct DeferStmt {
    pub body: NodeId,
}

#[derive(Clone, Debug)]
pub struct VarSet {
    pub target: ExprId,
    pub value: ExprId,
}

#[derive(Clone, Debug)]
pub struct ReturnStmt {
    pub value: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub struct AsmCode {
    pub body: String,
}

#[derive(Clone, Debug)]
pub struct OperationDecl {
    pub op: Operation,
}

#[derive(Clone, Debug)]
pub struct CastDecl {
    pub cast: Cast,
    pub auto: bool,
}

#[derive(Clone, Debug)]
pub struct IfStmt {
    pub cond: ExprId,
    pub then_body: Vec<NodeId>,
    pub else_body: Option<Vec<NodeId>>,
}

#[derive(Clone, Debug)]
pub struct WhileStmt {
    pub cond: ExprId,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct DoWhileStmt {
    pub cond: ExprId,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ForStmt {
    pub init: Option<NodeId>,
    pub cond: Option<ExprId>,
    pub step: Option<NodeId>,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct AliasDecl {
    pub name: String,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct AliasUse {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct ScopeNode {
    pub body: Vec<NodeId>,
}

/// Closed per-[`NodeKind`] payload, replacing the original's run-once
/// property bag (REDESIGN FLAG "Property bag on nodes").
#[derive(Clone, Debug)]
pub enum NodePayload {
    Scope(ScopeNode),
    FuncDecl(FuncDecl),
    VarDecl(VarDecl),
    TypeDecl(TypeDecl),
    PublicField(PublicField),
    Import(ImportStmt),
    Namesp(Namesp),
    Defer(DeferStmt),
    VarSet(VarSet),
    ReturnStmt(ReturnStmt),
    AsmCode(AsmCode),
    OperationDecl(OperationDecl),
    CastDecl(CastDecl),
    IfStmt(IfStmt),
    WhileStmt(WhileStmt),
    DoWhileStmt(DoWhileStmt),
    ForStmt(ForStmt),
    AliasDecl(AliasDecl),
    AliasUse(AliasUse),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub add: bool,
    pub payload: NodePayload,
}

/// The three AST arenas, owned by the parser and handed read-only to the
/// code generator (§5 ownership rule).
#[derive(Default)]
pub struct Arena {
    pub types: IndexVec<TypeId, Type>,
    pub exprs: IndexVec<ExprId, Expression>,
    pub nodes: IndexVec<NodeId, Node>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { types: IndexVec::new(), exprs: IndexVec::new(), nodes: IndexVec::new() }
    }

    pub fn alloc_type(&mut self, ty: Type) -> TypeId {
        self.types.push(ty)
    }

    pub fn alloc_expr(&mut self, expr: Expression) -> ExprId {
        self.exprs.push(expr)
    }

    pub fn alloc_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node)
    }

    /// Structural equality over the type DAG: same kind, same `mut`, same
    /// identifier, pointee/fields/params/return types equal recursively.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        let (ta, tb) = (&self.types[a], &self.types[b]);
        if ta.kind != tb.kind || ta.mutable != tb.mutable || ta.identifier != tb.identifier {
            return false;
        }
        let pointee_eq = match (ta.points_to, tb.points_to) {
            (Some(x), Some(y)) => self.types_equal(x, y),
            (None, None) => true,
            _ => false,
        };
        if !pointee_eq || ta.fields.len() != tb.fields.len() || ta.params.len() != tb.params.len() {
            return false;
        }
        for (fa, fb) in ta.fields.iter().zip(&tb.fields) {
            if fa.name != fb.name || !self.types_equal(fa.ty, fb.ty) {
                return false;
            }
        }
        for (pa, pb) in ta.params.iter().zip(&tb.params) {
            if !self.types_equal(*pa, *pb) {
                return false;
            }
        }
        match (ta.return_type, tb.return_type) {
            (Some(x), Some(y)) => self.types_equal(x, y),
            (None, None) => true,
            _ => false,
        }
    }
}

/// A declared-type table entry: `None` marks a forward declaration
/// (`struct;`/`union;`) awaiting a completing body.
pub type DeclaredTypes = HashMap<String, Option<TypeId>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_scalars_are_equal() {
        let mut arena = Arena::new();
        let a = arena.alloc_type(Type::scalar(TypeKind::Int));
        let b = arena.alloc_type(Type::scalar(TypeKind::Int));
        assert!(arena.types_equal(a, b));
    }

    #[test]
    fn mut_flag_breaks_equality() {
        let mut arena = Arena::new();
        let a = arena.alloc_type(Type::scalar(TypeKind::Int));
        let mut mutable = Type::scalar(TypeKind::Int);
        mutable.mutable = true;
        let b = arena.alloc_type(mutable);
        assert!(!arena.types_equal(a, b));
    }

    #[test]
    fn struct_field_order_is_significant() {
        let mut arena = Arena::new();
        let int_ty = arena.alloc_type(Type::scalar(TypeKind::Int));
        let long_ty = arena.alloc_type(Type::scalar(TypeKind::Long));

        let mut forward = Type::scalar(TypeKind::Struct);
        forward.fields = vec![
            Variable { name: "a".into(), ty: int_ty },
            Variable { name: "b".into(), ty: long_ty },
        ];
        let mut reordered = Type::scalar(TypeKind::Struct);
        reordered.fields = vec![
            Variable { name: "b".into(), ty: long_ty },
            Variable { name: "a".into(), ty: int_ty },
        ];

        let a = arena.alloc_type(forward);
        let b = arena.alloc_type(reordered);
        assert!(!arena.types_equal(a, b));
    }
}
