use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identity of a name-resolving expression node. The resolver keys its
/// distance table on this, so two structurally equal nodes never alias.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ExprId(pub usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    /// Ids are unique for the life of the process, so ASTs parsed on
    /// different REPL lines can share one distance table.
    pub fn fresh() -> ExprId {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Ternary(Box<Expr>, SourceLocation, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, SourceLocation, Vec<Expr>),
    Get(Box<Expr>, Symbol),
    Set(Box<Expr>, Symbol, Box<Expr>),
    Grouping(Box<Expr>),
    Variable(ExprId, Symbol),
    Assign(ExprId, Symbol, Box<Expr>),
    Logical(Box<Expr>, LogicalOp, Box<Expr>),
    This(ExprId, SourceLocation),
    Super(ExprId, SourceLocation, Symbol),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SourceLocation {
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogicalOp {
    Or,
    And,
}

#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub struct Symbol {
    pub name: String,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Clone)]
pub struct FunDecl {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Symbol,
    /// Always an `Expr::Variable`, so it gets a resolved distance like any
    /// other read.
    pub superclass: Option<Expr>,
    pub methods: Vec<Rc<FunDecl>>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    FunDecl(Rc<FunDecl>),
    ClassDecl(ClassDecl),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Print(SourceLocation, Expr),
    VarDecl(Symbol, Option<Expr>),
    Block(Vec<Stmt>),
    Return(SourceLocation, Option<Expr>),
    Break(SourceLocation),
    While(Expr, Box<Stmt>),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UnaryOpTy {
    Minus,
    Bang,
}

#[derive(Debug, Copy, Clone)]
pub struct UnaryOp {
    pub ty: UnaryOpTy,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinaryOpTy {
    Comma,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
}

#[derive(Debug, Copy, Clone)]
pub struct BinaryOp {
    pub ty: BinaryOpTy,
    pub line: usize,
    pub col: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    True,
    False,
    Nil,
}
