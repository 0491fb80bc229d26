use crate::expr;

/// Renders a program as parenthesized prefix notation, one top-level
/// statement per line. Used by `--print-ast` and by the parser tests.
pub fn print_program(stmts: &[expr::Stmt]) -> String {
    stmts.iter().map(print_stmt).collect::<Vec<_>>().join("\n")
}

pub fn print_stmt(stmt: &expr::Stmt) -> String {
    match stmt {
        expr::Stmt::Expr(e) => format!("(; {})", print_expr(e)),
        expr::Stmt::Print(_, e) => format!("(print {})", print_expr(e)),
        expr::Stmt::VarDecl(sym, Some(init)) => format!("(var {} {})", sym.name, print_expr(init)),
        expr::Stmt::VarDecl(sym, None) => format!("(var {})", sym.name),
        expr::Stmt::Block(stmts) => parenthesize("block", stmts.iter().map(print_stmt)),
        expr::Stmt::If(cond, then_branch, Some(else_branch)) => format!(
            "(if {} {} {})",
            print_expr(cond),
            print_stmt(then_branch),
            print_stmt(else_branch)
        ),
        expr::Stmt::If(cond, then_branch, None) => {
            format!("(if {} {})", print_expr(cond), print_stmt(then_branch))
        }
        expr::Stmt::While(cond, body) => format!("(while {} {})", print_expr(cond), print_stmt(body)),
        expr::Stmt::Break(_) => "(break)".to_string(),
        expr::Stmt::Return(_, Some(val)) => format!("(return {})", print_expr(val)),
        expr::Stmt::Return(_, None) => "(return)".to_string(),
        expr::Stmt::FunDecl(decl) => print_function(decl),
        expr::Stmt::ClassDecl(decl) => {
            let mut head = format!("class {}", decl.name.name);
            if let Some(superclass) = &decl.superclass {
                head.push_str(" < ");
                head.push_str(&print_expr(superclass));
            }
            parenthesize(&head, decl.methods.iter().map(|method| print_function(method)))
        }
    }
}

fn print_function(decl: &expr::FunDecl) -> String {
    let params: Vec<&str> = decl.params.iter().map(|param| param.name.as_str()).collect();
    let head = format!("fun {} ({})", decl.name.name, params.join(" "));
    parenthesize(&head, decl.body.iter().map(print_stmt))
}

pub fn print_expr(e: &expr::Expr) -> String {
    match e {
        expr::Expr::Literal(lit) => match lit {
            expr::Literal::Number(n) => format!("{}", n),
            expr::Literal::String(s) => s.clone(),
            expr::Literal::True => "true".to_string(),
            expr::Literal::False => "false".to_string(),
            expr::Literal::Nil => "nil".to_string(),
        },
        expr::Expr::Unary(op, operand) => {
            let op = match op.ty {
                expr::UnaryOpTy::Minus => "-",
                expr::UnaryOpTy::Bang => "!",
            };
            format!("({} {})", op, print_expr(operand))
        }
        expr::Expr::Binary(lhs, op, rhs) => {
            format!("({} {} {})", binary_op(op.ty), print_expr(lhs), print_expr(rhs))
        }
        expr::Expr::Logical(lhs, op, rhs) => {
            let op = match op {
                expr::LogicalOp::Or => "or",
                expr::LogicalOp::And => "and",
            };
            format!("({} {} {})", op, print_expr(lhs), print_expr(rhs))
        }
        expr::Expr::Ternary(cond, _, then_branch, else_branch) => format!(
            "(?: {} {} {})",
            print_expr(cond),
            print_expr(then_branch),
            print_expr(else_branch)
        ),
        expr::Expr::Call(callee, _, args) => {
            let head = format!("call {}", print_expr(callee));
            parenthesize(&head, args.iter().map(print_expr))
        }
        expr::Expr::Get(object, attr) => format!("(. {} {})", print_expr(object), attr.name),
        expr::Expr::Set(object, attr, val) => {
            format!("(set {} {} {})", print_expr(object), attr.name, print_expr(val))
        }
        expr::Expr::Grouping(inner) => format!("(group {})", print_expr(inner)),
        expr::Expr::Variable(_, sym) => sym.name.clone(),
        expr::Expr::Assign(_, sym, val) => format!("(= {} {})", sym.name, print_expr(val)),
        expr::Expr::This(_, _) => "this".to_string(),
        expr::Expr::Super(_, _, method) => format!("(super {})", method.name),
    }
}

fn binary_op(ty: expr::BinaryOpTy) -> &'static str {
    match ty {
        expr::BinaryOpTy::Comma => ",",
        expr::BinaryOpTy::EqualEqual => "==",
        expr::BinaryOpTy::NotEqual => "!=",
        expr::BinaryOpTy::Less => "<",
        expr::BinaryOpTy::LessEqual => "<=",
        expr::BinaryOpTy::Greater => ">",
        expr::BinaryOpTy::GreaterEqual => ">=",
        expr::BinaryOpTy::Plus => "+",
        expr::BinaryOpTy::Minus => "-",
        expr::BinaryOpTy::Star => "*",
        expr::BinaryOpTy::Slash => "/",
    }
}

fn parenthesize(head: &str, parts: impl Iterator<Item = String>) -> String {
    let mut out = format!("({}", head);
    for part in parts {
        out.push(' ');
        out.push_str(&part);
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, scanner};
    use pretty_assertions::assert_eq;

    fn printed(source: &str) -> String {
        let (tokens, _) = scanner::scan_tokens(source);
        let (stmts, errors) = parser::parse(tokens);
        assert!(errors.is_empty(), "{:?}", errors);
        print_program(&stmts)
    }

    #[test]
    fn statements() {
        assert_eq!(printed("var a;"), "(var a)");
        assert_eq!(printed("if (a) print \"yes\"; else return;"), "(if a (print yes) (return))");
        assert_eq!(printed("fun f(a, b) { return a; }"), "(fun f (a b) (return a))");
        assert_eq!(printed("class C {}"), "(class C)");
    }

    #[test]
    fn one_line_per_statement() {
        assert_eq!(printed("1; -(2);"), "(; 1)\n(; (- (group 2)))");
    }
}
