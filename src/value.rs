use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::environment::Environment;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::expr;
use crate::treewalk_interpreter::{Interpreter, Unwind};

pub static INIT: &str = "init";
pub static THIS: &str = "this";
pub static SUPER: &str = "super";

pub trait Callable {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError>;
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub callable: fn(&mut Interpreter, &[Value]) -> Result<Value, String>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        // natives have no source location of their own; the caller
        // relocates the error onto the call site
        (self.callable)(interpreter, args)
            .map_err(|err| RuntimeError::new(RuntimeErrorKind::Native, 0, 0, err))
    }
}

/// A user-defined function together with the scope it closes over.
#[derive(Clone)]
pub struct LoxFunction {
    pub declaration: Rc<expr::FunDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LoxFunction({})", self.declaration.name.name)
    }
}

impl LoxFunction {
    pub fn name(&self) -> &str {
        &self.declaration.name.name
    }

    /// Produces a copy of this method whose closure has `this` bound to
    /// `instance`. The declaration is shared, not copied.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let mut env = Environment::with_enclosing(self.closure.clone());
        env.define_builtin(THIS, Value::LoxInstance(instance));
        LoxFunction {
            declaration: self.declaration.clone(),
            closure: env.into_shared(),
            is_initializer: self.is_initializer,
        }
    }

    fn bound_this(&self) -> Result<Value, RuntimeError> {
        Environment::get_at(
            &self.closure,
            0,
            &expr::Symbol {
                name: THIS.to_string(),
                line: self.declaration.name.line,
                col: self.declaration.name.col,
            },
        )
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        let mut env = Environment::with_enclosing(self.closure.clone());
        for (param, arg) in self.declaration.params.iter().zip(args.iter()) {
            env.define(param, arg.clone());
        }

        trace!(function = self.name(), args = args.len(), "call");

        let retval = match interpreter.execute_block(&self.declaration.body, env) {
            Ok(()) => Value::Nil,
            Err(Unwind::Return(val)) => val,
            Err(Unwind::Error(err)) => return Err(err),
        };

        if self.is_initializer {
            return self.bound_this();
        }

        Ok(retval)
    }
}

#[derive(Debug)]
pub struct LoxClass {
    pub name: expr::Symbol,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, LoxFunction>,
}

impl LoxClass {
    pub fn init(&self) -> Option<LoxFunction> {
        self.find_method(INIT)
    }

    /// Looks in this class first, then up the superclass chain.
    pub fn find_method(&self, method_name: &str) -> Option<LoxFunction> {
        if let Some(method) = self.methods.get(method_name) {
            return Some(method.clone());
        }
        match &self.superclass {
            Some(superclass) => superclass.find_method(method_name),
            None => None,
        }
    }
}

// Implemented on the `Rc` so the new instance can hold on to its class.
impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        match self.init() {
            Some(initializer) => initializer.arity(),
            None => 0,
        }
    }

    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        let instance = Rc::new(RefCell::new(LoxInstance {
            class: self.clone(),
            fields: HashMap::new(),
        }));

        if let Some(initializer) = self.init() {
            initializer.bind(instance.clone()).call(interpreter, args)?;
        }

        Ok(Value::LoxInstance(instance))
    }
}

#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    pub fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, attr: &expr::Symbol) -> Result<Value, RuntimeError> {
        if let Some(val) = instance.borrow().fields.get(&attr.name) {
            return Ok(val.clone());
        }

        let method = instance.borrow().class.find_method(&attr.name);
        match method {
            Some(method) => Ok(Value::LoxFunction(Rc::new(method.bind(instance.clone())))),
            None => Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedProperty,
                attr.line,
                attr.col,
                format!("Undefined property '{}'.", attr.name),
            )),
        }
    }

    pub fn set(&mut self, attr: &expr::Symbol, val: Value) {
        self.fields.insert(attr.name.clone(), val);
    }
}

#[derive(Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    NativeFunction(NativeFunction),
    LoxFunction(Rc<LoxFunction>),
    LoxClass(Rc<LoxClass>),
    LoxInstance(Rc<RefCell<LoxInstance>>),
}

pub fn as_callable(value: &Value) -> Option<&dyn Callable> {
    match value {
        Value::NativeFunction(f) => Some(f),
        Value::LoxFunction(f) => Some(f.as_ref()),
        Value::LoxClass(cls) => Some(cls),
        _ => None,
    }
}

/// nil and false are falsy, and so is numeric zero. Everything else,
/// including the empty string, is truthy.
pub fn is_truthy(val: &Value) -> bool {
    match val {
        Value::Nil => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        _ => true,
    }
}

/// Same-type value equality with no coercion. Functions, classes and
/// instances compare by identity.
pub fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(n1), Value::Number(n2)) => n1 == n2,
        (Value::String(s1), Value::String(s2)) => s1 == s2,
        (Value::Bool(b1), Value::Bool(b2)) => b1 == b2,
        (Value::Nil, Value::Nil) => true,
        (Value::NativeFunction(f1), Value::NativeFunction(f2)) => f1.name == f2.name,
        (Value::LoxFunction(f1), Value::LoxFunction(f2)) => Rc::ptr_eq(f1, f2),
        (Value::LoxClass(c1), Value::LoxClass(c2)) => Rc::ptr_eq(c1, c2),
        (Value::LoxInstance(i1), Value::LoxInstance(i2)) => Rc::ptr_eq(i1, i2),
        (_, _) => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
            Value::NativeFunction(func) => write!(f, "<native fn {}>", func.name),
            Value::LoxFunction(func) => write!(f, "<fn {}>", func.name()),
            Value::LoxClass(cls) => write!(f, "{}", cls.name.name),
            Value::LoxInstance(inst) => write!(f, "{} instance", inst.borrow().class.name.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            _ => write!(f, "{}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&Value::Nil));
        assert!(!is_truthy(&Value::Bool(false)));
        assert!(!is_truthy(&Value::Number(0.0)));
        assert!(is_truthy(&Value::Number(0.5)));
        assert!(is_truthy(&Value::String(String::new())));
        assert!(is_truthy(&Value::Bool(true)));
    }

    #[test]
    fn equality_has_no_coercion() {
        assert!(equals(&Value::Nil, &Value::Nil));
        assert!(!equals(&Value::Nil, &Value::Bool(false)));
        assert!(!equals(&Value::Number(1.0), &Value::String("1".to_string())));
        assert!(equals(
            &Value::String("a".to_string()),
            &Value::String("a".to_string())
        ));
        assert!(!equals(&Value::Number(0.0), &Value::Bool(false)));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Number(2.0).to_string(), "2");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::String("hi".to_string()).to_string(), "hi");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }
}
