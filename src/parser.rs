use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{Phase, StaticError};
use crate::expr;
use crate::scanner;

const MAX_ARGS: usize = 255;

struct Parser {
    tokens: Vec<scanner::Token>,
    current: usize,
    errors: Vec<StaticError>,
}

/// Raised to unwind out of a malformed declaration. The diagnostic itself has
/// already been recorded by the time this is returned.
#[derive(Debug)]
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Copy, Clone)]
pub enum FunctionKind {
    Function,
    Method,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FunctionKind::Function => write!(f, "function"),
            FunctionKind::Method => write!(f, "method"),
        }
    }
}

/// Parses as many declarations as possible. A malformed declaration is
/// reported and skipped; everything that parsed is returned alongside the
/// diagnostics.
pub fn parse(tokens: Vec<scanner::Token>) -> (Vec<expr::Stmt>, Vec<StaticError>) {
    let tokens = if tokens.last().map(|tok| tok.ty) == Some(scanner::TokenType::Eof) {
        tokens
    } else {
        let (line, col) = tokens.last().map_or((1, 1), |tok| (tok.line, tok.col));
        let mut tokens = tokens;
        tokens.push(scanner::Token {
            ty: scanner::TokenType::Eof,
            lexeme: String::new(),
            literal: None,
            line,
            col,
        });
        tokens
    };

    let mut p = Parser {
        tokens,
        current: 0,
        errors: Vec::new(),
    };
    let stmts = p.parse();

    debug!(
        statements = stmts.len(),
        errors = p.errors.len(),
        "parsed token stream"
    );

    (stmts, p.errors)
}

/*
Recursive descent using the following grammar

program     → declaration* EOF ;

declaration → classDecl
            | funDecl
            | varDecl
            | statement ;

classDecl → "class" IDENTIFIER ( "<" IDENTIFIER )?
            "{" function* "}" ;

funDecl  → "fun" function ;
function → IDENTIFIER "(" parameters? ")" block ;
parameters  → IDENTIFIER ( "," IDENTIFIER )* ;

statement → exprStmt
          | breakStmt
          | forStmt
          | ifStmt
          | printStmt
          | returnStmt
          | whileStmt
          | block ;

breakStmt  → "break" ";" ;
returnStmt → "return" expression? ";" ;

forStmt   → "for" "(" ( varDecl | exprStmt | ";" )
                      expression? ";"
                      expression? ")" statement ;

whileStmt → "while" "(" expression ")" statement ;

ifStmt    → "if" "(" expression ")" statement ( "else" statement )? ;

block     → "{" declaration* "}" ;

varDecl → "var" IDENTIFIER ( "=" expression )? ";" ;

exprStmt  → expression ";" ;
printStmt → "print" expression ";" ;

expression → comma ;
comma      → assignment ( "," assignment )* ;
assignment → ( call "." )? IDENTIFIER "=" assignment
           | ternary ;
ternary    → logic_or ( "?" assignment ":" ternary )? ;
logic_or   → logic_and ( "or" logic_and )* ;
logic_and  → equality ( "and" equality )* ;

equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → addition ( ( ">" | ">=" | "<" | "<=" ) addition )* ;
addition       → multiplication ( ( "-" | "+" ) multiplication )* ;
multiplication → unary ( ( "/" | "*" ) unary )* ;
unary → ( "!" | "-" ) unary | call ;
call → primary ( "(" arguments? ")" | "." IDENTIFIER )* ;
arguments → assignment ( "," assignment )* ;

primary → "true" | "false" | "nil" | "this"
        | NUMBER | STRING | IDENTIFIER | "(" expression ")"
        | "super" "." IDENTIFIER ;

*/
impl Parser {
    fn parse(&mut self) -> Vec<expr::Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        statements
    }

    fn declaration(&mut self) -> Option<expr::Stmt> {
        let stmt_or_err = if self.matches(scanner::TokenType::Var) {
            self.var_decl()
        } else if self.matches(scanner::TokenType::Fun) {
            self.fun_decl(FunctionKind::Function)
                .map(|decl| expr::Stmt::FunDecl(Rc::new(decl)))
        } else if self.matches(scanner::TokenType::Class) {
            self.class_decl()
        } else {
            self.statement()
        };

        match stmt_or_err {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_decl(&mut self) -> ParseResult<expr::Stmt> {
        let name_tok = self
            .consume(scanner::TokenType::Identifier, "Expect class name.")?
            .clone();

        let class_symbol = Parser::symbol(&name_tok);

        let superclass_maybe = if self.matches(scanner::TokenType::Less) {
            let superclass_tok = self
                .consume(scanner::TokenType::Identifier, "Expect superclass name.")?
                .clone();
            Some(expr::Expr::Variable(
                expr::ExprId::fresh(),
                Parser::symbol(&superclass_tok),
            ))
        } else {
            None
        };

        self.consume(
            scanner::TokenType::LeftBrace,
            "Expect '{' before class body.",
        )?;

        let mut methods = Vec::new();
        while !self.check(scanner::TokenType::RightBrace) && !self.is_at_end() {
            methods.push(Rc::new(self.fun_decl(FunctionKind::Method)?));
        }
        let methods = methods;

        self.consume(
            scanner::TokenType::RightBrace,
            "Expect '}' after class body.",
        )?;

        Ok(expr::Stmt::ClassDecl(expr::ClassDecl {
            name: class_symbol,
            superclass: superclass_maybe,
            methods,
        }))
    }

    fn fun_decl(&mut self, kind: FunctionKind) -> ParseResult<expr::FunDecl> {
        let name_tok = self
            .consume(
                scanner::TokenType::Identifier,
                format!("Expect {} name.", kind).as_ref(),
            )?
            .clone();

        self.consume(
            scanner::TokenType::LeftParen,
            format!("Expect '(' after {} name.", kind).as_ref(),
        )?;

        let mut parameters = Vec::new();

        if !self.check(scanner::TokenType::RightParen) {
            loop {
                if parameters.len() >= MAX_ARGS {
                    let peek_tok = self.peek().clone();
                    self.report(&peek_tok, "Can't have more than 255 parameters.");
                }

                let tok = self
                    .consume(scanner::TokenType::Identifier, "Expect parameter name.")?
                    .clone();

                parameters.push(Parser::symbol(&tok));

                if !self.matches(scanner::TokenType::Comma) {
                    break;
                }
            }
        }
        let parameters = parameters;

        self.consume(
            scanner::TokenType::RightParen,
            "Expect ')' after parameters.",
        )?;
        self.consume(
            scanner::TokenType::LeftBrace,
            format!("Expect '{{' before {} body.", kind).as_ref(),
        )?;
        let body = self.block()?;

        Ok(expr::FunDecl {
            name: Parser::symbol(&name_tok),
            params: parameters,
            body,
        })
    }

    fn var_decl(&mut self) -> ParseResult<expr::Stmt> {
        let name_token = self
            .consume(scanner::TokenType::Identifier, "Expect variable name.")?
            .clone();

        let maybe_initializer = if self.matches(scanner::TokenType::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            scanner::TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;

        Ok(expr::Stmt::VarDecl(
            Parser::symbol(&name_token),
            maybe_initializer,
        ))
    }

    fn statement(&mut self) -> ParseResult<expr::Stmt> {
        if self.matches(scanner::TokenType::Print) {
            return self.print_statement();
        }

        if self.matches(scanner::TokenType::While) {
            return self.while_statement();
        }

        if self.matches(scanner::TokenType::LeftBrace) {
            return Ok(expr::Stmt::Block(self.block()?));
        }

        if self.matches(scanner::TokenType::For) {
            return self.for_statement();
        }

        if self.matches(scanner::TokenType::If) {
            return self.if_statement();
        }

        if self.matches(scanner::TokenType::Return) {
            return self.return_statement();
        }

        if self.matches(scanner::TokenType::Break) {
            return self.break_statement();
        }

        self.expression_statement()
    }

    fn break_statement(&mut self) -> ParseResult<expr::Stmt> {
        let keyword = self.previous().clone();
        self.consume(scanner::TokenType::Semicolon, "Expect ';' after 'break'.")?;
        Ok(expr::Stmt::Break(Parser::location(&keyword)))
    }

    fn return_statement(&mut self) -> ParseResult<expr::Stmt> {
        let prev_tok = self.previous().clone();

        let maybe_retval = if !self.check(scanner::TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            scanner::TokenType::Semicolon,
            "Expect ';' after return value.",
        )?;

        Ok(expr::Stmt::Return(Parser::location(&prev_tok), maybe_retval))
    }

    fn for_statement(&mut self) -> ParseResult<expr::Stmt> {
        let for_tok = self.previous().clone();
        self.consume(scanner::TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let mut maybe_initializer: Option<expr::Stmt> = None;
        if self.matches(scanner::TokenType::Semicolon) {
        } else if self.matches(scanner::TokenType::Var) {
            maybe_initializer = Some(self.var_decl()?)
        } else {
            maybe_initializer = Some(self.expression_statement()?)
        }
        let maybe_initializer = maybe_initializer;

        let mut maybe_condition: Option<expr::Expr> = None;
        if !self.check(scanner::TokenType::Semicolon) {
            maybe_condition = Some(self.expression()?)
        }
        let maybe_condition = maybe_condition;

        self.consume(
            scanner::TokenType::Semicolon,
            "Expect ';' after loop condition.",
        )?;

        let maybe_increment = if !self.check(scanner::TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            scanner::TokenType::RightParen,
            "Expect ')' after for clauses.",
        )?;

        let mut body = self.statement()?;

        if let Some(increment) = maybe_increment {
            body = expr::Stmt::Block(vec![body, expr::Stmt::Expr(increment)])
        }

        let condition = match maybe_condition {
            Some(cond) => cond,
            None => expr::Expr::Literal(expr::Literal::True),
        };
        body = expr::Stmt::While(condition, Box::new(body));

        if let Some(initializer) = maybe_initializer {
            body = expr::Stmt::Block(vec![initializer, body])
        }
        let body = body;

        debug!(line = for_tok.line, "desugared for loop");

        Ok(body)
    }

    fn while_statement(&mut self) -> ParseResult<expr::Stmt> {
        self.consume(scanner::TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let cond = self.expression()?;
        self.consume(scanner::TokenType::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(expr::Stmt::While(cond, body))
    }

    fn if_statement(&mut self) -> ParseResult<expr::Stmt> {
        self.consume(scanner::TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let cond = self.expression()?;
        self.consume(
            scanner::TokenType::RightParen,
            "Expect ')' after if condition.",
        )?;
        let then_branch = Box::new(self.statement()?);
        let maybe_else_branch = if self.matches(scanner::TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(expr::Stmt::If(cond, then_branch, maybe_else_branch))
    }

    fn block(&mut self) -> ParseResult<Vec<expr::Stmt>> {
        let mut stmts = Vec::new();

        while !self.check(scanner::TokenType::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt)
            }
        }

        self.consume(scanner::TokenType::RightBrace, "Expect '}' after block.")?;

        Ok(stmts)
    }

    fn print_statement(&mut self) -> ParseResult<expr::Stmt> {
        let print_tok = self.previous().clone();
        let expr = self.expression()?;
        self.consume(scanner::TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(expr::Stmt::Print(Parser::location(&print_tok), expr))
    }

    fn expression_statement(&mut self) -> ParseResult<expr::Stmt> {
        let expr = self.expression()?;
        self.consume(
            scanner::TokenType::Semicolon,
            "Expect ';' after expression.",
        )?;
        Ok(expr::Stmt::Expr(expr))
    }

    fn expression(&mut self) -> ParseResult<expr::Expr> {
        self.comma()
    }

    fn comma(&mut self) -> ParseResult<expr::Expr> {
        let mut expr = self.assignment()?;

        while self.matches(scanner::TokenType::Comma) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.assignment()?);
            let binop = self.op_token_to_binop(&operator_token)?;
            expr = expr::Expr::Binary(Box::new(expr), binop, right);
        }

        Ok(expr)
    }

    fn assignment(&mut self) -> ParseResult<expr::Expr> {
        let expr = self.ternary()?;

        if self.matches(scanner::TokenType::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                expr::Expr::Variable(_, sym) => Ok(expr::Expr::Assign(
                    expr::ExprId::fresh(),
                    sym,
                    Box::new(value),
                )),
                expr::Expr::Get(e, attr) => Ok(expr::Expr::Set(e, attr, Box::new(value))),
                _ => {
                    // reported, but the surrounding statement still parses
                    self.report(&equals, "Invalid assignment target.");
                    Ok(value)
                }
            };
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> ParseResult<expr::Expr> {
        let cond = self.or()?;

        if self.matches(scanner::TokenType::Question) {
            let question = self.previous().clone();
            let then_branch = self.assignment()?;
            self.consume(
                scanner::TokenType::Colon,
                "Expect ':' after then branch of conditional expression.",
            )?;
            let else_branch = self.ternary()?;
            return Ok(expr::Expr::Ternary(
                Box::new(cond),
                Parser::location(&question),
                Box::new(then_branch),
                Box::new(else_branch),
            ));
        }

        Ok(cond)
    }

    fn or(&mut self) -> ParseResult<expr::Expr> {
        let mut expr = self.and()?;

        while self.matches(scanner::TokenType::Or) {
            let right = self.and()?;
            expr = expr::Expr::Logical(Box::new(expr), expr::LogicalOp::Or, Box::new(right));
        }

        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<expr::Expr> {
        let mut expr = self.equality()?;

        while self.matches(scanner::TokenType::And) {
            let right = self.equality()?;
            expr = expr::Expr::Logical(Box::new(expr), expr::LogicalOp::And, Box::new(right));
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<expr::Expr> {
        self.left_assoc_binary(
            &[
                scanner::TokenType::BangEqual,
                scanner::TokenType::EqualEqual,
            ],
            Parser::comparison,
        )
    }

    fn comparison(&mut self) -> ParseResult<expr::Expr> {
        self.left_assoc_binary(
            &[
                scanner::TokenType::Greater,
                scanner::TokenType::GreaterEqual,
                scanner::TokenType::Less,
                scanner::TokenType::LessEqual,
            ],
            Parser::addition,
        )
    }

    fn addition(&mut self) -> ParseResult<expr::Expr> {
        self.left_assoc_binary(
            &[scanner::TokenType::Minus, scanner::TokenType::Plus],
            Parser::multiplication,
        )
    }

    fn multiplication(&mut self) -> ParseResult<expr::Expr> {
        self.left_assoc_binary(
            &[scanner::TokenType::Slash, scanner::TokenType::Star],
            Parser::unary,
        )
    }

    fn left_assoc_binary(
        &mut self,
        types: &[scanner::TokenType],
        operand: fn(&mut Parser) -> ParseResult<expr::Expr>,
    ) -> ParseResult<expr::Expr> {
        let mut expr = operand(self)?;

        while self.match_one_of(types) {
            let operator_token = self.previous().clone();
            let right = Box::new(operand(self)?);
            let binop = self.op_token_to_binop(&operator_token)?;
            expr = expr::Expr::Binary(Box::new(expr), binop, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<expr::Expr> {
        if self.match_one_of(&[scanner::TokenType::Bang, scanner::TokenType::Minus]) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.unary()?);
            let unary_op = self.op_token_to_unary_op(&operator_token)?;
            return Ok(expr::Expr::Unary(unary_op, right));
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<expr::Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(scanner::TokenType::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.matches(scanner::TokenType::Dot) {
                let name_tok = self
                    .consume(
                        scanner::TokenType::Identifier,
                        "Expect property name after '.'.",
                    )?
                    .clone();
                expr = expr::Expr::Get(Box::new(expr), Parser::symbol(&name_tok));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: expr::Expr) -> ParseResult<expr::Expr> {
        let mut arguments = Vec::new();

        if !self.check(scanner::TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    let peek_tok = self.peek().clone();
                    self.report(&peek_tok, "Can't have more than 255 arguments.");
                }
                // assignment, not expression: a comma here separates arguments
                arguments.push(self.assignment()?);
                if !self.matches(scanner::TokenType::Comma) {
                    break;
                }
            }
        }

        let token = self.consume(
            scanner::TokenType::RightParen,
            "Expect ')' after arguments.",
        )?;

        Ok(expr::Expr::Call(
            Box::new(callee),
            Parser::location(token),
            arguments,
        ))
    }

    fn primary(&mut self) -> ParseResult<expr::Expr> {
        if self.matches(scanner::TokenType::False) {
            return Ok(expr::Expr::Literal(expr::Literal::False));
        }
        if self.matches(scanner::TokenType::True) {
            return Ok(expr::Expr::Literal(expr::Literal::True));
        }
        if self.matches(scanner::TokenType::Nil) {
            return Ok(expr::Expr::Literal(expr::Literal::Nil));
        }
        if self.matches(scanner::TokenType::Super) {
            let super_tok = self.previous().clone();
            self.consume(scanner::TokenType::Dot, "Expect '.' after 'super'.")?;
            let method_tok = self
                .consume(
                    scanner::TokenType::Identifier,
                    "Expect superclass method name.",
                )?
                .clone();
            return Ok(expr::Expr::Super(
                expr::ExprId::fresh(),
                Parser::location(&super_tok),
                Parser::symbol(&method_tok),
            ));
        }
        if self.matches(scanner::TokenType::Number) {
            let tok = self.previous().clone();
            return match tok.literal {
                Some(scanner::Literal::Number(n)) => Ok(expr::Expr::Literal(expr::Literal::Number(n))),
                _ => Err(self.error(&tok, "Expect number literal.")),
            };
        }
        if self.matches(scanner::TokenType::String) {
            let tok = self.previous().clone();
            return match tok.literal {
                Some(scanner::Literal::Str(s)) => Ok(expr::Expr::Literal(expr::Literal::String(s))),
                _ => Err(self.error(&tok, "Expect string literal.")),
            };
        }
        if self.matches(scanner::TokenType::This) {
            let prev = self.previous();
            return Ok(expr::Expr::This(
                expr::ExprId::fresh(),
                Parser::location(prev),
            ));
        }
        if self.matches(scanner::TokenType::Identifier) {
            let sym = Parser::symbol(self.previous());
            return Ok(expr::Expr::Variable(expr::ExprId::fresh(), sym));
        }
        if self.matches(scanner::TokenType::LeftParen) {
            let expr = Box::new(self.expression()?);
            self.consume(
                scanner::TokenType::RightParen,
                "Expect ')' after expression.",
            )?;
            return Ok(expr::Expr::Grouping(expr));
        }

        let tok = self.peek().clone();
        Err(self.error(&tok, "Expect expression."))
    }

    fn consume(
        &mut self,
        tok: scanner::TokenType,
        on_err_str: &str,
    ) -> ParseResult<&scanner::Token> {
        if self.check(tok) {
            return Ok(self.advance());
        }
        let found = self.peek().clone();
        Err(self.error(&found, on_err_str))
    }

    /// Records a diagnostic without unwinding.
    fn report(&mut self, tok: &scanner::Token, message: &str) {
        self.errors
            .push(StaticError::at_token(Phase::Parse, tok, message));
    }

    /// Records a diagnostic and hands back the marker used to unwind to the
    /// enclosing declaration.
    fn error(&mut self, tok: &scanner::Token, message: &str) -> ParseError {
        self.report(tok, message);
        ParseError
    }

    /// Skips tokens until something that looks like the start of the next
    /// statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().ty == scanner::TokenType::Semicolon {
                return;
            }

            match self.peek().ty {
                scanner::TokenType::Class
                | scanner::TokenType::Fun
                | scanner::TokenType::Var
                | scanner::TokenType::For
                | scanner::TokenType::If
                | scanner::TokenType::While
                | scanner::TokenType::Print
                | scanner::TokenType::Return
                | scanner::TokenType::Break => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn symbol(tok: &scanner::Token) -> expr::Symbol {
        expr::Symbol {
            name: tok.lexeme.clone(),
            line: tok.line,
            col: tok.col,
        }
    }

    fn location(tok: &scanner::Token) -> expr::SourceLocation {
        expr::SourceLocation {
            line: tok.line,
            col: tok.col,
        }
    }

    fn op_token_to_unary_op(&mut self, tok: &scanner::Token) -> ParseResult<expr::UnaryOp> {
        let ty = match tok.ty {
            scanner::TokenType::Minus => expr::UnaryOpTy::Minus,
            scanner::TokenType::Bang => expr::UnaryOpTy::Bang,
            _ => return Err(self.error(tok, "Invalid token in unary operator.")),
        };
        Ok(expr::UnaryOp {
            ty,
            line: tok.line,
            col: tok.col,
        })
    }

    fn op_token_to_binop(&mut self, tok: &scanner::Token) -> ParseResult<expr::BinaryOp> {
        let ty = match tok.ty {
            scanner::TokenType::Comma => expr::BinaryOpTy::Comma,
            scanner::TokenType::EqualEqual => expr::BinaryOpTy::EqualEqual,
            scanner::TokenType::BangEqual => expr::BinaryOpTy::NotEqual,
            scanner::TokenType::Less => expr::BinaryOpTy::Less,
            scanner::TokenType::LessEqual => expr::BinaryOpTy::LessEqual,
            scanner::TokenType::Greater => expr::BinaryOpTy::Greater,
            scanner::TokenType::GreaterEqual => expr::BinaryOpTy::GreaterEqual,
            scanner::TokenType::Plus => expr::BinaryOpTy::Plus,
            scanner::TokenType::Minus => expr::BinaryOpTy::Minus,
            scanner::TokenType::Star => expr::BinaryOpTy::Star,
            scanner::TokenType::Slash => expr::BinaryOpTy::Slash,
            _ => return Err(self.error(tok, "Invalid token in binary operator.")),
        };
        Ok(expr::BinaryOp {
            ty,
            line: tok.line,
            col: tok.col,
        })
    }

    fn match_one_of(&mut self, types: &[scanner::TokenType]) -> bool {
        for ty in types.iter() {
            if self.matches(*ty) {
                return true;
            }
        }
        false
    }

    fn matches(&mut self, ty: scanner::TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            return true;
        }
        false
    }

    fn check(&self, ty: scanner::TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().ty == ty
    }

    fn advance(&mut self) -> &scanner::Token {
        if !self.is_at_end() {
            self.current += 1
        }

        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().ty == scanner::TokenType::Eof
    }

    fn peek(&self) -> &scanner::Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &scanner::Token {
        &self.tokens[self.current - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_printer;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (Vec<expr::Stmt>, Vec<StaticError>) {
        let (tokens, lex_errors) = scanner::scan_tokens(source);
        assert!(lex_errors.is_empty(), "{:?}", lex_errors);
        parse(tokens)
    }

    fn printed(source: &str) -> String {
        let (stmts, errors) = parse_source(source);
        assert!(errors.is_empty(), "{:?}", errors);
        ast_printer::print_program(&stmts)
    }

    fn messages(source: &str) -> Vec<String> {
        let (_, errors) = parse_source(source);
        errors.into_iter().map(|err| err.to_string()).collect()
    }

    #[test]
    fn precedence_ladder() {
        assert_eq!(printed("1 + 2 * 3 - 4;"), "(; (- (+ 1 (* 2 3)) 4))");
        assert_eq!(printed("!a == b < c;"), "(; (== (! a) (< b c)))");
        assert_eq!(printed("a or b and c;"), "(; (or a (and b c)))");
    }

    #[test]
    fn comma_is_lowest_and_left_associative() {
        assert_eq!(printed("a = 1, b = 2, c;"), "(; (, (, (= a 1) (= b 2)) c))");
    }

    #[test]
    fn call_arguments_are_not_comma_expressions() {
        assert_eq!(printed("f(1, 2)(3).x;"), "(; (. (call (call f 1 2) 3) x))");
    }

    #[test]
    fn ternary_is_right_associative() {
        assert_eq!(printed("a ? b : c ? d : e;"), "(; (?: a b (?: c d e)))");
        assert_eq!(printed("x = a or b ? 1 : 2;"), "(; (= x (?: (or a b) 1 2)))");
    }

    #[test]
    fn ternary_without_colon() {
        assert_eq!(
            messages("a ? b;"),
            vec!["[line 1] Error at ';': Expect ':' after then branch of conditional expression."]
        );
    }

    #[test]
    fn set_expression() {
        assert_eq!(printed("a.b.c = 3;"), "(; (set (. a b) c 3))");
    }

    #[test]
    fn invalid_assignment_target_does_not_stop_parsing() {
        let (stmts, errors) = parse_source("a + b = c; print 1;");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at '=': Invalid assignment target."
        );
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn for_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(block (var i 0) (while (< i 3) (block (print i) (; (= i (+ i 1))))))"
        );
        assert_eq!(printed("for (;;) break;"), "(while true (break))");
    }

    #[test]
    fn class_with_superclass() {
        assert_eq!(
            printed("class B < A { init(x) { this.x = x; } go() { return super.go(); } }"),
            "(class B < A (fun init (x) (; (set this x x))) (fun go () (return (super go))))"
        );
    }

    #[test]
    fn recovers_and_reports_every_error() {
        let (stmts, errors) = parse_source("var = 1;\nprint 2;\nfun (a) {}\nprint 3;");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[0].message, "Expect variable name.");
        assert_eq!(errors[1].line, 3);
        assert_eq!(errors[1].message, "Expect function name.");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn recovery_stops_at_break() {
        let (stmts, errors) = parse_source("var = 1 break;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expect variable name.");
        assert_eq!(ast_printer::print_program(&stmts), "(break)");
    }

    #[test]
    fn error_at_end() {
        assert_eq!(
            messages("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (stmts, errors) = parse_source(&source);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Can't have more than 255 arguments.");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));
        let (stmts, errors) = parse_source(&source);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Can't have more than 255 parameters.");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn super_requires_dot() {
        assert_eq!(
            messages("super + 1;"),
            vec!["[line 1] Error at '+': Expect '.' after 'super'."]
        );
    }

    #[test]
    fn expression_ids_are_distinct() {
        let (stmts, _) = parse_source("a; a;");
        let ids: Vec<expr::ExprId> = stmts
            .iter()
            .filter_map(|stmt| match stmt {
                expr::Stmt::Expr(expr::Expr::Variable(id, _)) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] != ids[1]);
    }
}
