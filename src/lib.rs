use std::io::Write;

use thiserror::Error;
use tracing::debug;

pub mod ast_printer;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod expr;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod treewalk_interpreter;
pub mod value;

use error::{RuntimeError, StaticError};
use treewalk_interpreter::Interpreter;

#[derive(Debug, Error)]
pub enum RunError {
    /// Every problem found by the scanner, parser and resolver. Nothing was
    /// evaluated.
    #[error("{} static error(s)", .0.len())]
    Static(Vec<StaticError>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A long-lived interpreter session. Globals defined by one `run` are visible
/// to the next, which is what the REPL relies on.
pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Lox {
        Lox {
            interpreter: Interpreter::default(),
        }
    }
}

impl Lox {
    pub fn with_writer(out: Box<dyn Write>) -> Lox {
        Lox {
            interpreter: Interpreter::with_writer(out),
        }
    }

    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        self.run_source(source, false)
    }

    /// Like `run`, but a line holding exactly one expression statement has
    /// its value printed.
    pub fn run_line(&mut self, source: &str) -> Result<(), RunError> {
        self.run_source(source, true)
    }

    fn run_source(&mut self, source: &str, echo: bool) -> Result<(), RunError> {
        let (tokens, mut errors) = scanner::scan_tokens(source);
        let echo_location = tokens.first().map(|tok| expr::SourceLocation {
            line: tok.line,
            col: tok.col,
        });

        let (mut stmts, parse_errors) = parser::parse(tokens);
        errors.extend(parse_errors);

        let (locals, resolve_errors) = resolver::resolve(&stmts);
        errors.extend(resolve_errors);

        if !errors.is_empty() {
            debug!(errors = errors.len(), "static errors; not evaluating");
            return Err(RunError::Static(errors));
        }

        if echo && matches!(stmts.as_slice(), [expr::Stmt::Expr(_)]) {
            if let (Some(loc), Some(expr::Stmt::Expr(e))) = (echo_location, stmts.pop()) {
                stmts.push(expr::Stmt::Print(loc, e));
            }
        }

        self.interpreter.resolve(locals);
        self.interpreter.interpret(&stmts)?;
        Ok(())
    }
}

/// Runs `source` once in a fresh session, printing to stdout.
pub fn run(source: &str) -> Result<(), RunError> {
    Lox::default().run(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Phase, RuntimeErrorKind};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).to_string()
        }
    }

    fn session() -> (Lox, SharedBuf) {
        let buf = SharedBuf::default();
        (Lox::with_writer(Box::new(buf.clone())), buf)
    }

    fn static_errors(res: Result<(), RunError>) -> Vec<StaticError> {
        match res {
            Err(RunError::Static(errors)) => errors,
            other => panic!("expected static errors, got {:?}", other),
        }
    }

    #[test]
    fn static_errors_prevent_evaluation() {
        let (mut lox, buf) = session();
        let errors = static_errors(lox.run(
            "print \"before\";\n\
             { var a = 1; var a = 2; }\n\
             return 3;",
        ));
        assert_eq!(
            errors.iter().map(|err| err.to_string()).collect::<Vec<_>>(),
            vec![
                "[line 2] Error at 'a': Already a variable with this name in this scope.",
                "[line 3] Error at 'return': Can't return from top-level code.",
            ]
        );
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn every_phase_reports_in_one_pass() {
        let (mut lox, _) = session();
        let errors = static_errors(lox.run("var s = \"open;\n"));
        assert_eq!(errors[0].phase, Phase::Lexical);
        assert_eq!(errors[0].message, "Unterminated string.");

        let errors = static_errors(lox.run("var = 1;\n{ var b = b; }\n@"));
        let phases: Vec<Phase> = errors.iter().map(|err| err.phase).collect();
        assert_eq!(phases, vec![Phase::Lexical, Phase::Parse, Phase::Resolve]);
    }

    #[test]
    fn runtime_error_is_reported_with_line() {
        let (mut lox, buf) = session();
        match lox.run("print 1;\nprint -\"x\";") {
            Err(RunError::Runtime(err)) => {
                assert_eq!(err.kind, RuntimeErrorKind::OperandType);
                assert_eq!(err.line, 2);
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }
        assert_eq!(buf.contents(), "1\n");
    }

    #[test]
    fn session_keeps_globals_between_runs() {
        let (mut lox, buf) = session();
        lox.run("var count = 0; fun bump() { count = count + 1; return count; }")
            .unwrap();
        lox.run("bump();").unwrap();
        lox.run("print bump();").unwrap();
        assert_eq!(buf.contents(), "2\n");
    }

    #[test]
    fn lines_echo_single_expressions() {
        let (mut lox, buf) = session();
        lox.run_line("var a = 40;").unwrap();
        lox.run_line("a + 2;").unwrap();
        lox.run_line("a = 1; a = 2;").unwrap();
        lox.run_line("\"hi\";").unwrap();
        assert_eq!(buf.contents(), "42\nhi\n");
    }

    #[test]
    fn nested_comments_produce_no_tokens() {
        let (mut lox, buf) = session();
        lox.run("/* a /* b */ c */ print \"ok\";").unwrap();
        assert_eq!(buf.contents(), "ok\n");

        let errors = static_errors(lox.run("print 1; /* a"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unclosed block comment.");
    }

    #[test]
    fn whole_numbers_print_without_fraction() {
        let (mut lox, buf) = session();
        lox.run("print 2.0; print 2.50; print 1.0 + 0.5; print -0.0 + 7;")
            .unwrap();
        assert_eq!(buf.contents(), "2\n2.5\n1.5\n7\n");
    }
}
