use std::collections::HashMap;

use tracing::debug;

use crate::error::{Phase, StaticError};
use crate::expr;
use crate::value;

/// Resolved scope distance for every local variable reference, keyed by the
/// referencing node. Absent entries are globals.
pub type Locals = HashMap<expr::ExprId, usize>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum VarState {
    Declared,
    Defined,
}

struct Resolver {
    scopes: Vec<HashMap<String, VarState>>,
    locals: Locals,
    errors: Vec<StaticError>,
    current_function: FunctionKind,
    current_class: ClassKind,
    in_loop: bool,
}

/// Computes resolution distances for a parsed program and checks the rules
/// that can be enforced without running it. All diagnostics are collected;
/// the program must not run if any are returned.
pub fn resolve(stmts: &[expr::Stmt]) -> (Locals, Vec<StaticError>) {
    let mut resolver = Resolver {
        scopes: Vec::new(),
        locals: HashMap::new(),
        errors: Vec::new(),
        current_function: FunctionKind::None,
        current_class: ClassKind::None,
        in_loop: false,
    };

    resolver.resolve_stmts(stmts);

    debug!(
        locals = resolver.locals.len(),
        errors = resolver.errors.len(),
        "resolved program"
    );

    (resolver.locals, resolver.errors)
}

impl Resolver {
    fn resolve_stmts(&mut self, stmts: &[expr::Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &expr::Stmt) {
        match stmt {
            expr::Stmt::Expr(e) => self.resolve_expr(e),
            expr::Stmt::Print(_, e) => self.resolve_expr(e),
            expr::Stmt::VarDecl(sym, maybe_init) => {
                self.declare(sym);
                if let Some(init) = maybe_init {
                    self.resolve_expr(init);
                }
                self.define(sym);
            }
            expr::Stmt::Block(stmts) => {
                self.begin_scope();
                self.resolve_stmts(stmts);
                self.end_scope();
            }
            expr::Stmt::If(cond, then_branch, maybe_else) => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = maybe_else {
                    self.resolve_stmt(else_branch);
                }
            }
            expr::Stmt::While(cond, body) => {
                self.resolve_expr(cond);
                let enclosing_in_loop = self.in_loop;
                self.in_loop = true;
                self.resolve_stmt(body);
                self.in_loop = enclosing_in_loop;
            }
            expr::Stmt::Break(loc) => {
                if !self.in_loop {
                    self.error(loc.line, loc.col, "'break'", "Can't break if not inside a loop.");
                }
            }
            expr::Stmt::Return(loc, maybe_val) => {
                if self.current_function == FunctionKind::None {
                    self.error(loc.line, loc.col, "'return'", "Can't return from top-level code.");
                }
                if let Some(val) = maybe_val {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(
                            loc.line,
                            loc.col,
                            "'return'",
                            "Can't return a value from an initializer.",
                        );
                    }
                    self.resolve_expr(val);
                }
            }
            expr::Stmt::FunDecl(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            expr::Stmt::ClassDecl(decl) => self.resolve_class(decl),
        }
    }

    fn resolve_class(&mut self, decl: &expr::ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(&decl.name);
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            if let expr::Expr::Variable(_, superclass_sym) = superclass {
                if superclass_sym.name == decl.name.name {
                    self.error(
                        superclass_sym.line,
                        superclass_sym.col,
                        &format!("'{}'", superclass_sym.name),
                        "A class can't inherit from itself.",
                    );
                }
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.mark_defined(value::SUPER);
        }

        self.begin_scope();
        self.mark_defined(value::THIS);

        for method in &decl.methods {
            let kind = if method.name.name == value::INIT {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if decl.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &expr::FunDecl, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        let enclosing_in_loop = self.in_loop;
        self.current_function = kind;
        self.in_loop = false;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing_function;
        self.in_loop = enclosing_in_loop;
    }

    fn resolve_expr(&mut self, e: &expr::Expr) {
        match e {
            expr::Expr::Literal(_) => {}
            expr::Expr::Unary(_, operand) => self.resolve_expr(operand),
            expr::Expr::Binary(lhs, _, rhs) | expr::Expr::Logical(lhs, _, rhs) => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            expr::Expr::Ternary(cond, _, then_branch, else_branch) => {
                self.resolve_expr(cond);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            expr::Expr::Call(callee, _, args) => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            expr::Expr::Get(object, _) => self.resolve_expr(object),
            expr::Expr::Set(object, _, val) => {
                self.resolve_expr(val);
                self.resolve_expr(object);
            }
            expr::Expr::Grouping(inner) => self.resolve_expr(inner),
            expr::Expr::Variable(id, sym) => {
                let self_reference = matches!(
                    self.scopes.last().and_then(|scope| scope.get(&sym.name)),
                    Some(VarState::Declared)
                );
                if self_reference {
                    self.error(
                        sym.line,
                        sym.col,
                        &format!("'{}'", sym.name),
                        "Can't read local variable in its own initializer.",
                    );
                }
                self.resolve_local(*id, &sym.name);
            }
            expr::Expr::Assign(id, sym, val) => {
                self.resolve_expr(val);
                self.resolve_local(*id, &sym.name);
            }
            expr::Expr::This(id, loc) => {
                if self.current_class == ClassKind::None {
                    self.error(loc.line, loc.col, "'this'", "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, value::THIS);
            }
            expr::Expr::Super(id, loc, _) => {
                match self.current_class {
                    ClassKind::None => self.error(
                        loc.line,
                        loc.col,
                        "'super'",
                        "Can't use 'super' outside of a class.",
                    ),
                    ClassKind::Class => self.error(
                        loc.line,
                        loc.col,
                        "'super'",
                        "Can't use 'super' in a class with no superclass.",
                    ),
                    ClassKind::Subclass => self.resolve_local(*id, value::SUPER),
                }
            }
        }
    }

    fn resolve_local(&mut self, id: expr::ExprId, name: &str) {
        for (hops, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.locals.insert(id, hops);
                return;
            }
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, sym: &expr::Symbol) {
        let duplicate = match self.scopes.last() {
            Some(scope) => scope.contains_key(&sym.name),
            None => return,
        };

        if duplicate {
            self.error(
                sym.line,
                sym.col,
                &format!("'{}'", sym.name),
                "Already a variable with this name in this scope.",
            );
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(sym.name.clone(), VarState::Declared);
        }
    }

    fn define(&mut self, sym: &expr::Symbol) {
        self.mark_defined(&sym.name);
    }

    fn mark_defined(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), VarState::Defined);
        }
    }

    fn error(&mut self, line: usize, col: i64, lexeme: &str, message: &str) {
        self.errors.push(StaticError {
            phase: Phase::Resolve,
            line,
            col,
            location: format!(" at {}", lexeme),
            message: message.to_string(),
        });
    }
}
