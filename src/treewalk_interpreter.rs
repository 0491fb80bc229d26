use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use tracing::trace;

use crate::builtins;
use crate::environment::Environment;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::expr;
use crate::resolver::Locals;
use crate::value::{self, Callable, LoxClass, LoxFunction, LoxInstance, Value};

/// Non-local exit out of statement execution. `Return` is caught at the
/// nearest call boundary; `Error` travels all the way to `interpret`.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Unwind {
        Unwind::Error(err)
    }
}

pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,
    locals: Locals,
    // Set by `break`, observed by the nearest enclosing loop once its body
    // finishes. There is one flag, not one per loop.
    broken: bool,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::with_writer(Box::new(io::stdout()))
    }
}

impl Interpreter {
    /// An interpreter whose `print` output goes to `out`.
    pub fn with_writer(out: Box<dyn Write>) -> Interpreter {
        let mut globals = Environment::default();
        builtins::define_globals(&mut globals);
        let globals = globals.into_shared();

        Interpreter {
            globals: globals.clone(),
            env: globals,
            locals: HashMap::new(),
            broken: false,
            out,
        }
    }

    /// Adds resolution results to the distance table. Earlier entries are
    /// kept so closures created by previous runs keep working.
    pub fn resolve(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Runs a resolved program. The first runtime error aborts the rest of the
    /// program; global definitions made before it stay in place.
    pub fn interpret(&mut self, stmts: &[expr::Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(err)) => {
                    self.env = self.globals.clone();
                    self.broken = false;
                    return Err(err);
                }
                Err(Unwind::Return(_)) => {
                    panic!("Internal interpreter error: return escaped to top level.")
                }
            }
        }
        self.flush()
    }

    /// Runs `stmts` in `env`, restoring the current environment afterwards no
    /// matter how execution ends.
    pub fn execute_block(&mut self, stmts: &[expr::Stmt], env: Environment) -> Result<(), Unwind> {
        let previous = mem::replace(&mut self.env, env.into_shared());
        let result = stmts.iter().try_for_each(|stmt| self.execute(stmt));
        self.env = previous;
        result
    }

    fn execute(&mut self, stmt: &expr::Stmt) -> Result<(), Unwind> {
        match stmt {
            expr::Stmt::Expr(e) => {
                self.interpret_expr(e)?;
                Ok(())
            }
            expr::Stmt::Print(loc, e) => {
                let val = self.interpret_expr(e)?;
                writeln!(self.out, "{}", val).map_err(|err| Interpreter::output_error(loc, err))?;
                Ok(())
            }
            expr::Stmt::VarDecl(sym, maybe_init) => {
                match maybe_init {
                    Some(init) => {
                        let val = self.interpret_expr(init)?;
                        self.env.borrow_mut().define(sym, val);
                    }
                    None => self.env.borrow_mut().declare(sym),
                }
                Ok(())
            }
            expr::Stmt::Block(stmts) => {
                let env = Environment::with_enclosing(self.env.clone());
                self.execute_block(stmts, env)
            }
            expr::Stmt::If(cond, then_branch, maybe_else) => {
                if value::is_truthy(&self.interpret_expr(cond)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = maybe_else {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            expr::Stmt::While(cond, body) => {
                let result = self.execute_while(cond, body);
                self.broken = false;
                result
            }
            expr::Stmt::Break(_) => {
                self.broken = true;
                Ok(())
            }
            expr::Stmt::Return(_, maybe_val) => {
                let val = match maybe_val {
                    Some(e) => self.interpret_expr(e)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(val))
            }
            expr::Stmt::FunDecl(decl) => {
                let func = LoxFunction {
                    declaration: decl.clone(),
                    closure: self.env.clone(),
                    is_initializer: false,
                };
                self.env
                    .borrow_mut()
                    .define(&decl.name, Value::LoxFunction(Rc::new(func)));
                Ok(())
            }
            expr::Stmt::ClassDecl(decl) => {
                self.declare_class(decl)?;
                Ok(())
            }
        }
    }

    fn execute_while(&mut self, cond: &expr::Expr, body: &expr::Stmt) -> Result<(), Unwind> {
        while value::is_truthy(&self.interpret_expr(cond)?) {
            self.execute(body)?;
            if self.broken {
                break;
            }
        }
        Ok(())
    }

    fn declare_class(&mut self, decl: &expr::ClassDecl) -> Result<(), RuntimeError> {
        let superclass = match &decl.superclass {
            Some(superclass_expr) => match self.interpret_expr(superclass_expr)? {
                Value::LoxClass(cls) => Some(cls),
                _ => {
                    let (line, col) = match superclass_expr {
                        expr::Expr::Variable(_, sym) => (sym.line, sym.col),
                        _ => (decl.name.line, decl.name.col),
                    };
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::InvalidSuperclass,
                        line,
                        col,
                        "Superclass must be a class.",
                    ));
                }
            },
            None => None,
        };

        let method_closure = match &superclass {
            Some(superclass) => {
                let mut env = Environment::with_enclosing(self.env.clone());
                env.define_builtin(value::SUPER, Value::LoxClass(superclass.clone()));
                env.into_shared()
            }
            None => self.env.clone(),
        };

        let methods = decl
            .methods
            .iter()
            .map(|method| {
                let func = LoxFunction {
                    declaration: method.clone(),
                    closure: method_closure.clone(),
                    is_initializer: method.name.name == value::INIT,
                };
                (method.name.name.clone(), func)
            })
            .collect();

        let cls = LoxClass {
            name: decl.name.clone(),
            superclass,
            methods,
        };

        trace!(class = %decl.name.name, methods = decl.methods.len(), "declared class");

        self.env
            .borrow_mut()
            .define(&decl.name, Value::LoxClass(Rc::new(cls)));
        Ok(())
    }

    fn interpret_expr(&mut self, e: &expr::Expr) -> Result<Value, RuntimeError> {
        match e {
            expr::Expr::Literal(lit) => Ok(Interpreter::interpret_literal(lit)),
            expr::Expr::Unary(op, operand) => self.interpret_unary(*op, operand),
            expr::Expr::Binary(lhs, op, rhs) => self.interpret_binary(lhs, *op, rhs),
            expr::Expr::Logical(lhs, op, rhs) => {
                let left = self.interpret_expr(lhs)?;
                let short_circuits = match op {
                    expr::LogicalOp::Or => value::is_truthy(&left),
                    expr::LogicalOp::And => !value::is_truthy(&left),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.interpret_expr(rhs)
                }
            }
            expr::Expr::Ternary(cond, _, then_branch, else_branch) => {
                if value::is_truthy(&self.interpret_expr(cond)?) {
                    self.interpret_expr(then_branch)
                } else {
                    self.interpret_expr(else_branch)
                }
            }
            expr::Expr::Grouping(inner) => self.interpret_expr(inner),
            expr::Expr::Call(callee, loc, args) => self.call(callee, loc, args),
            expr::Expr::Get(object, attr) => match self.interpret_expr(object)? {
                Value::LoxInstance(instance) => LoxInstance::get(&instance, attr),
                _ => Err(RuntimeError::new(
                    RuntimeErrorKind::NotAnInstance,
                    attr.line,
                    attr.col,
                    "Only instances have properties.",
                )),
            },
            expr::Expr::Set(object, attr, val_expr) => match self.interpret_expr(object)? {
                Value::LoxInstance(instance) => {
                    let val = self.interpret_expr(val_expr)?;
                    instance.borrow_mut().set(attr, val.clone());
                    Ok(val)
                }
                _ => Err(RuntimeError::new(
                    RuntimeErrorKind::NotAnInstance,
                    attr.line,
                    attr.col,
                    "Only instances have fields.",
                )),
            },
            expr::Expr::Variable(id, sym) => self.lookup_variable(*id, sym),
            expr::Expr::Assign(id, sym, val_expr) => {
                let val = self.interpret_expr(val_expr)?;
                match self.locals.get(id) {
                    Some(distance) => Environment::assign_at(&self.env, *distance, sym, val.clone()),
                    None => self.globals.borrow_mut().assign(sym, val.clone())?,
                }
                Ok(val)
            }
            expr::Expr::This(id, loc) => self.lookup_variable(*id, &Interpreter::keyword_symbol(value::THIS, loc)),
            expr::Expr::Super(id, loc, method) => self.interpret_super(*id, loc, method),
        }
    }

    fn lookup_variable(&self, id: expr::ExprId, sym: &expr::Symbol) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(distance) => Environment::get_at(&self.env, *distance, sym),
            None => self.globals.borrow().get(sym),
        }
    }

    fn interpret_super(
        &mut self,
        id: expr::ExprId,
        loc: &expr::SourceLocation,
        method: &expr::Symbol,
    ) -> Result<Value, RuntimeError> {
        let distance = match self.locals.get(&id) {
            Some(distance) => *distance,
            None => panic!("Internal interpreter error: unresolved 'super' expression."),
        };

        let superclass = match Environment::get_at(
            &self.env,
            distance,
            &Interpreter::keyword_symbol(value::SUPER, loc),
        )? {
            Value::LoxClass(cls) => cls,
            _ => panic!("Internal interpreter error: 'super' is not bound to a class."),
        };

        // `this` lives in the scope just inside the one holding `super`
        let instance = match Environment::get_at(
            &self.env,
            distance - 1,
            &Interpreter::keyword_symbol(value::THIS, loc),
        )? {
            Value::LoxInstance(instance) => instance,
            _ => panic!("Internal interpreter error: 'this' is not bound to an instance."),
        };

        match superclass.find_method(&method.name) {
            Some(func) => Ok(Value::LoxFunction(Rc::new(func.bind(instance)))),
            None => Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedProperty,
                method.line,
                method.col,
                format!("Undefined property '{}'.", method.name),
            )),
        }
    }

    fn call(
        &mut self,
        callee_expr: &expr::Expr,
        loc: &expr::SourceLocation,
        arg_exprs: &[expr::Expr],
    ) -> Result<Value, RuntimeError> {
        let callee = self.interpret_expr(callee_expr)?;

        let args = arg_exprs
            .iter()
            .map(|arg| self.interpret_expr(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let callable = match value::as_callable(&callee) {
            Some(callable) => callable,
            None => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::NotCallable,
                    loc.line,
                    loc.col,
                    "Can only call functions and classes.",
                ))
            }
        };

        if args.len() != callable.arity() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::Arity,
                loc.line,
                loc.col,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    args.len()
                ),
            ));
        }

        callable.call(self, &args).map_err(|mut err| {
            if err.kind == RuntimeErrorKind::Native {
                err.line = loc.line;
                err.col = loc.col;
            }
            err
        })
    }

    fn interpret_binary(
        &mut self,
        lhs_expr: &expr::Expr,
        op: expr::BinaryOp,
        rhs_expr: &expr::Expr,
    ) -> Result<Value, RuntimeError> {
        let lhs = self.interpret_expr(lhs_expr)?;
        let rhs = self.interpret_expr(rhs_expr)?;

        match (&lhs, op.ty, &rhs) {
            (_, expr::BinaryOpTy::Comma, _) => Ok(rhs),
            (_, expr::BinaryOpTy::EqualEqual, _) => Ok(Value::Bool(value::equals(&lhs, &rhs))),
            (_, expr::BinaryOpTy::NotEqual, _) => Ok(Value::Bool(!value::equals(&lhs, &rhs))),
            (Value::Number(n1), expr::BinaryOpTy::Less, Value::Number(n2)) => {
                Ok(Value::Bool(n1 < n2))
            }
            (Value::Number(n1), expr::BinaryOpTy::LessEqual, Value::Number(n2)) => {
                Ok(Value::Bool(n1 <= n2))
            }
            (Value::Number(n1), expr::BinaryOpTy::Greater, Value::Number(n2)) => {
                Ok(Value::Bool(n1 > n2))
            }
            (Value::Number(n1), expr::BinaryOpTy::GreaterEqual, Value::Number(n2)) => {
                Ok(Value::Bool(n1 >= n2))
            }
            (Value::Number(n1), expr::BinaryOpTy::Minus, Value::Number(n2)) => {
                Ok(Value::Number(n1 - n2))
            }
            (Value::Number(n1), expr::BinaryOpTy::Star, Value::Number(n2)) => {
                Ok(Value::Number(n1 * n2))
            }
            (Value::Number(n1), expr::BinaryOpTy::Slash, Value::Number(n2)) => {
                if *n2 != 0.0 {
                    Ok(Value::Number(n1 / n2))
                } else {
                    Err(RuntimeError::new(
                        RuntimeErrorKind::DivisionByZero,
                        op.line,
                        op.col,
                        "Division by zero.",
                    ))
                }
            }
            (Value::Number(n1), expr::BinaryOpTy::Plus, Value::Number(n2)) => {
                Ok(Value::Number(n1 + n2))
            }
            (Value::String(s1), expr::BinaryOpTy::Plus, _) => Ok(Value::String(format!("{}{}", s1, rhs))),
            (_, expr::BinaryOpTy::Plus, Value::String(s2)) => Ok(Value::String(format!("{}{}", lhs, s2))),
            (_, expr::BinaryOpTy::Plus, _) => Err(RuntimeError::new(
                RuntimeErrorKind::OperandType,
                op.line,
                op.col,
                "Operands must be two numbers or two strings.",
            )),
            _ => Err(RuntimeError::new(
                RuntimeErrorKind::OperandType,
                op.line,
                op.col,
                "Operands must be numbers.",
            )),
        }
    }

    fn interpret_unary(&mut self, op: expr::UnaryOp, operand: &expr::Expr) -> Result<Value, RuntimeError> {
        let val = self.interpret_expr(operand)?;

        match (op.ty, &val) {
            (expr::UnaryOpTy::Bang, _) => Ok(Value::Bool(!value::is_truthy(&val))),
            (expr::UnaryOpTy::Minus, Value::Number(n)) => Ok(Value::Number(-n)),
            (expr::UnaryOpTy::Minus, _) => Err(RuntimeError::new(
                RuntimeErrorKind::OperandType,
                op.line,
                op.col,
                "Operand must be a number.",
            )),
        }
    }

    fn interpret_literal(lit: &expr::Literal) -> Value {
        match lit {
            expr::Literal::Number(n) => Value::Number(*n),
            expr::Literal::String(s) => Value::String(s.clone()),
            expr::Literal::True => Value::Bool(true),
            expr::Literal::False => Value::Bool(false),
            expr::Literal::Nil => Value::Nil,
        }
    }

    fn keyword_symbol(name: &str, loc: &expr::SourceLocation) -> expr::Symbol {
        expr::Symbol {
            name: name.to_string(),
            line: loc.line,
            col: loc.col,
        }
    }

    fn flush(&mut self) -> Result<(), RuntimeError> {
        self.out.flush().map_err(|err| {
            RuntimeError::new(
                RuntimeErrorKind::Output,
                0,
                0,
                format!("Could not write program output: {}.", err),
            )
        })
    }

    fn output_error(loc: &expr::SourceLocation, err: io::Error) -> RuntimeError {
        RuntimeError::new(
            RuntimeErrorKind::Output,
            loc.line,
            loc.col,
            format!("Could not write program output: {}.", err),
        )
    }
}
