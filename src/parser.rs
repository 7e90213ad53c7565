//! Parser for RASP
//!
//! Parses token streams into AST. Operator precedence, loosest first:
//! `|`, `&`, comparisons (non-associative), `+ -`, `* / %`, prefix `- ~`,
//! then method calls.

use chumsky::prelude::*;

use crate::ast::*;
use crate::lexer::{Span as TokenSpan, Token};
use crate::value::{BinaryOp, UnaryOp};

/// Create a parser for a complete RASP program
pub fn parser() -> impl Parser<Token, Program, Error = Simple<Token>> + Clone {
    statement()
        .map_with_span(|stmt, span| Spanned::new(stmt, to_span(span)))
        .repeated()
        .then_ignore(end())
        .map(|statements| Program { statements })
}

/// Create a parser for a single expression (no trailing semicolon)
pub fn expression_parser() -> impl Parser<Token, Spanned<Expr>, Error = Simple<Token>> + Clone {
    expr().then_ignore(end())
}

fn to_span(span: TokenSpan) -> Span {
    Span::new(span.start, span.end)
}

// ============================================================================
// Helpers
// ============================================================================

fn ident() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    select! {
        Token::Ident(s) => s,
    }
}

fn boxed(e: Spanned<Expr>) -> Box<Spanned<Expr>> {
    Box::new(e)
}

fn binary(op: BinaryOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    let span = lhs.span.join(rhs.span);
    Spanned::new(
        Expr::Binary {
            op,
            lhs: boxed(lhs),
            rhs: boxed(rhs),
        },
        span,
    )
}

// ============================================================================
// Statements
// ============================================================================

fn statement() -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    let let_stmt = just(Token::Let)
        .ignore_then(ident())
        .then_ignore(just(Token::Assign))
        .then(expr())
        .then_ignore(just(Token::Semicolon))
        .map(|(name, value)| Statement::Let { name, value });

    let expr_stmt = expr()
        .then_ignore(just(Token::Semicolon))
        .map(Statement::Expr);

    let_stmt.or(expr_stmt)
}

// ============================================================================
// Expressions
// ============================================================================

fn expr() -> impl Parser<Token, Spanned<Expr>, Error = Simple<Token>> + Clone {
    recursive(|expr| {
        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let literal = select! {
            Token::Int(n) => Expr::Int(n),
            Token::Char(c) => Expr::Char(c),
            Token::Str(s) => Expr::Str(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
        };

        // `f(args)` or a bare variable
        let call_or_var = ident()
            .then(args.clone().or_not())
            .map(|(name, args)| match args {
                Some(args) => Expr::Call { func: name, args },
                None => Expr::Var(name),
            });

        let atom = literal
            .or(call_or_var)
            .map_with_span(|e, span| Spanned::new(e, to_span(span)))
            .or(expr
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)));

        // receiver.method(args)...
        let postfix = atom
            .then(
                just(Token::Dot)
                    .ignore_then(ident())
                    .then(args)
                    .map_with_span(|call, span: TokenSpan| (call, to_span(span)))
                    .repeated(),
            )
            .foldl(|receiver, ((method, args), span)| {
                let span = receiver.span.join(span);
                Spanned::new(
                    Expr::Method {
                        receiver: boxed(receiver),
                        method,
                        args,
                    },
                    span,
                )
            });

        let prefix_op = just(Token::Minus)
            .to(UnaryOp::Neg)
            .or(just(Token::Tilde).to(UnaryOp::Not))
            .map_with_span(|op, span: TokenSpan| (op, to_span(span)));

        let unary = prefix_op
            .repeated()
            .then(postfix)
            .foldr(|(op, span), operand| {
                let span = span.join(operand.span);
                Spanned::new(
                    Expr::Unary {
                        op,
                        operand: boxed(operand),
                    },
                    span,
                )
            });

        let product_op = just(Token::Star)
            .to(BinaryOp::Mul)
            .or(just(Token::Slash).to(BinaryOp::Div))
            .or(just(Token::Percent).to(BinaryOp::Mod));
        let product = unary
            .clone()
            .then(product_op.then(unary).repeated())
            .foldl(|lhs, (op, rhs)| binary(op, lhs, rhs));

        let sum_op = just(Token::Plus)
            .to(BinaryOp::Add)
            .or(just(Token::Minus).to(BinaryOp::Sub));
        let sum = product
            .clone()
            .then(sum_op.then(product).repeated())
            .foldl(|lhs, (op, rhs)| binary(op, lhs, rhs));

        let compare_op = select! {
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
        };
        let comparison = sum
            .clone()
            .then(compare_op.then(sum).or_not())
            .map(|(lhs, rest)| match rest {
                Some((op, rhs)) => binary(op, lhs, rhs),
                None => lhs,
            });

        let conjunction = comparison
            .clone()
            .then(just(Token::Amp).to(BinaryOp::And).then(comparison).repeated())
            .foldl(|lhs, (op, rhs)| binary(op, lhs, rhs));

        conjunction
            .clone()
            .then(just(Token::Pipe).to(BinaryOp::Or).then(conjunction).repeated())
            .foldl(|lhs, (op, rhs)| binary(op, lhs, rhs))
    })
}
