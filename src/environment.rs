use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::expr;
use crate::value::Value;

/// One lexical scope. Closures hold their defining scope through an `Rc`, so
/// every closure over the same scope observes the same writes.
#[derive(Debug, Default)]
pub struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    // SourceLocation is the location of a declaration; `None` means declared
    // but not yet given a value.
    venv: HashMap<String, (Option<Value>, expr::SourceLocation)>,
}

pub enum LookupResult {
    Ok(Value),
    UndefButDeclared(expr::SourceLocation),
    UndefAndNotDeclared,
}

impl Environment {
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Environment {
        Environment {
            enclosing: Some(enclosing),
            venv: HashMap::new(),
        }
    }

    pub fn into_shared(self) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(self))
    }

    pub fn declare(&mut self, sym: &expr::Symbol) {
        self.insert(&sym.name, None, sym.line, sym.col);
    }

    pub fn define(&mut self, sym: &expr::Symbol, val: Value) {
        self.insert(&sym.name, Some(val), sym.line, sym.col);
    }

    /// Binds a name that has no declaration site in the source, such as a
    /// native function, `this` or `super`.
    pub fn define_builtin(&mut self, name: &str, val: Value) {
        self.insert(name, Some(val), 0, 0);
    }

    fn insert(&mut self, name: &str, maybe_val: Option<Value>, line: usize, col: i64) {
        self.venv
            .insert(name.to_string(), (maybe_val, expr::SourceLocation { line, col }));
    }

    pub fn lookup(&self, name: &str) -> LookupResult {
        match self.venv.get(name) {
            Some((maybe_val, defn_source_location)) => match maybe_val {
                Some(val) => LookupResult::Ok(val.clone()),
                None => LookupResult::UndefButDeclared(*defn_source_location),
            },
            None => LookupResult::UndefAndNotDeclared,
        }
    }

    pub fn get(&self, sym: &expr::Symbol) -> Result<Value, RuntimeError> {
        match self.lookup(&sym.name) {
            LookupResult::Ok(val) => Ok(val),
            LookupResult::UndefButDeclared(source_location) => {
                Err(Environment::uninitialized(sym, source_location))
            }
            LookupResult::UndefAndNotDeclared => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(sym),
                None => Err(Environment::undefined(sym)),
            },
        }
    }

    pub fn assign(&mut self, sym: &expr::Symbol, val: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.venv.get_mut(&sym.name) {
            slot.0 = Some(val);
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(sym, val),
            None => Err(Environment::undefined(sym)),
        }
    }

    /// Walks exactly `distance` enclosing links. The resolver guarantees the
    /// chain is long enough; if it isn't, the interpreter itself is broken.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current = env.clone();
        for _ in 0..distance {
            let next = match &current.borrow().enclosing {
                Some(enclosing) => enclosing.clone(),
                None => panic!(
                    "Internal interpreter error: scope chain shorter than resolved distance {}.",
                    distance
                ),
            };
            current = next;
        }
        current
    }

    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        sym: &expr::Symbol,
    ) -> Result<Value, RuntimeError> {
        let scope = Environment::ancestor(env, distance);
        let result = scope.borrow().lookup(&sym.name);
        match result {
            LookupResult::Ok(val) => Ok(val),
            LookupResult::UndefButDeclared(source_location) => {
                Err(Environment::uninitialized(sym, source_location))
            }
            LookupResult::UndefAndNotDeclared => panic!(
                "Internal interpreter error: '{}' not found at resolved distance {}.",
                sym.name, distance
            ),
        }
    }

    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, sym: &expr::Symbol, val: Value) {
        let scope = Environment::ancestor(env, distance);
        let mut scope = scope.borrow_mut();
        match scope.venv.get_mut(&sym.name) {
            Some(slot) => slot.0 = Some(val),
            None => panic!(
                "Internal interpreter error: '{}' not found at resolved distance {}.",
                sym.name, distance
            ),
        }
    }

    fn undefined(sym: &expr::Symbol) -> RuntimeError {
        RuntimeError::new(
            RuntimeErrorKind::UndefinedVariable,
            sym.line,
            sym.col,
            format!("Undefined variable '{}'.", sym.name),
        )
    }

    fn uninitialized(sym: &expr::Symbol, declared_at: expr::SourceLocation) -> RuntimeError {
        RuntimeError::new(
            RuntimeErrorKind::UninitializedVariable,
            sym.line,
            sym.col,
            format!(
                "Use of uninitialized variable '{}' (declared at line {}, column {}).",
                sym.name, declared_at.line, declared_at.col
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sym(name: &str) -> expr::Symbol {
        expr::Symbol {
            name: name.to_string(),
            line: 1,
            col: 1,
        }
    }

    fn number(val: Result<Value, RuntimeError>) -> f64 {
        match val {
            Ok(Value::Number(n)) => n,
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn get_walks_outward() {
        let globals = Environment::default().into_shared();
        globals.borrow_mut().define(&sym("a"), Value::Number(1.0));
        let inner = Environment::with_enclosing(globals.clone());
        assert_eq!(number(inner.get(&sym("a"))), 1.0);
    }

    #[test]
    fn undefined_variable() {
        let env = Environment::default();
        let err = env.get(&sym("nope")).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
        assert_eq!(err.message, "Undefined variable 'nope'.");

        let mut env = env;
        let err = env.assign(&sym("nope"), Value::Nil).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
    }

    #[test]
    fn uninitialized_is_distinct_from_undefined() {
        let mut env = Environment::default();
        env.declare(&sym("a"));
        let err = env.get(&sym("a")).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UninitializedVariable);

        env.assign(&sym("a"), Value::Number(3.0)).unwrap();
        assert_eq!(number(env.get(&sym("a"))), 3.0);
    }

    #[test]
    fn lookup_reports_declaration_site() {
        let mut env = Environment::default();
        env.declare(&expr::Symbol {
            name: "late".to_string(),
            line: 4,
            col: 9,
        });
        match env.lookup("late") {
            LookupResult::UndefButDeclared(loc) => {
                assert_eq!(loc, expr::SourceLocation { line: 4, col: 9 })
            }
            _ => panic!("expected a declared but unset slot"),
        }
    }

    #[test]
    fn assign_updates_defining_scope() {
        let outer = Environment::default().into_shared();
        outer.borrow_mut().define(&sym("a"), Value::Number(1.0));
        let inner = Environment::with_enclosing(outer.clone()).into_shared();
        inner
            .borrow_mut()
            .assign(&sym("a"), Value::Number(2.0))
            .unwrap();
        assert_eq!(number(outer.borrow().get(&sym("a"))), 2.0);
    }

    #[test]
    fn distance_indexed_access() {
        let outer = Environment::default().into_shared();
        outer.borrow_mut().define(&sym("a"), Value::Number(1.0));
        let middle = Environment::with_enclosing(outer.clone()).into_shared();
        middle.borrow_mut().define(&sym("a"), Value::Number(2.0));
        let inner = Environment::with_enclosing(middle.clone()).into_shared();

        assert_eq!(number(Environment::get_at(&inner, 1, &sym("a"))), 2.0);
        assert_eq!(number(Environment::get_at(&inner, 2, &sym("a"))), 1.0);

        Environment::assign_at(&inner, 2, &sym("a"), Value::Number(5.0));
        assert_eq!(number(outer.borrow().get(&sym("a"))), 5.0);
        assert_eq!(number(middle.borrow().get(&sym("a"))), 2.0);
    }

    #[test]
    #[should_panic(expected = "Internal interpreter error")]
    fn distance_mismatch_is_fatal() {
        let env = Environment::default().into_shared();
        let _ = Environment::get_at(&env, 3, &sym("a"));
    }

    #[test]
    fn shared_scope_is_aliased() {
        let scope = Environment::default().into_shared();
        scope.borrow_mut().define(&sym("n"), Value::Number(0.0));
        let alias = scope.clone();
        alias
            .borrow_mut()
            .assign(&sym("n"), Value::Number(9.0))
            .unwrap();
        assert_eq!(number(scope.borrow().get(&sym("n"))), 9.0);
    }
}
