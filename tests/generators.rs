//! Proptest generators for RASP programs and inputs
//!
//! Expression graphs hold `Rc` handles, so strategies generate plain `Plan`
//! trees and tests build fresh nodes from them with [`build`].

#![allow(dead_code)]

use proptest::collection::vec;
use proptest::prelude::*;
use rasp::ast::{Expr, Program, Span, Spanned, Statement};
use rasp::selector::{key, query, Selector};
use rasp::seq::{constant, indices, tokens, where_, SeqOp};
use rasp::value::{BinaryOp, CompareOp, UnaryOp};

// ============================================================================
// Inputs
// ============================================================================

/// Integer input sequences, including the empty one
pub fn arb_int_input() -> impl Strategy<Value = Vec<i64>> {
    vec(-20i64..20, 0..8)
}

/// Short texts over a small alphabet
pub fn arb_text_input() -> impl Strategy<Value = String> {
    "[a-c0-9_+<]{0,8}".prop_map(String::from)
}

// ============================================================================
// Expression plans
// ============================================================================

/// Shape of a sequence expression that is total over integer inputs
/// (no division, no maps, only numeric aggregation).
#[derive(Debug, Clone)]
pub enum Plan {
    Tokens,
    Indices,
    Const(i64),
    Unary(UnaryOp, Box<Plan>),
    Binary(BinaryOp, Box<Plan>, Box<Plan>),
    Where(Box<Plan>, Box<Plan>, Box<Plan>),
    Aggregate(SelPlan, Box<Plan>, i64),
}

#[derive(Debug, Clone)]
pub enum SelPlan {
    Compare(Box<Plan>, CompareOp, Box<Plan>),
    And(Box<SelPlan>, Box<SelPlan>),
    Or(Box<SelPlan>, Box<SelPlan>),
    Not(Box<SelPlan>),
}

pub fn arb_compare_op() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Eq),
        Just(CompareOp::Ne),
        Just(CompareOp::Lt),
        Just(CompareOp::Le),
        Just(CompareOp::Gt),
        Just(CompareOp::Ge),
    ]
}

fn arb_total_binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Eq),
        Just(BinaryOp::Lt),
        Just(BinaryOp::Ge),
        Just(BinaryOp::And),
        Just(BinaryOp::Or),
    ]
}

fn arb_sel_plan_from(inner: BoxedStrategy<Plan>) -> impl Strategy<Value = SelPlan> {
    let compare = (inner.clone(), arb_compare_op(), inner)
        .prop_map(|(k, op, q)| SelPlan::Compare(Box::new(k), op, Box::new(q)));
    compare.prop_recursive(2, 6, 2, |sel| {
        prop_oneof![
            (sel.clone(), sel.clone()).prop_map(|(a, b)| SelPlan::And(Box::new(a), Box::new(b))),
            (sel.clone(), sel.clone()).prop_map(|(a, b)| SelPlan::Or(Box::new(a), Box::new(b))),
            sel.prop_map(|s| SelPlan::Not(Box::new(s))),
        ]
    })
}

/// Sequence plans of bounded depth
pub fn arb_plan() -> impl Strategy<Value = Plan> {
    let leaf = prop_oneof![
        Just(Plan::Tokens),
        Just(Plan::Indices),
        (-5i64..5).prop_map(Plan::Const),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (prop_oneof![Just(UnaryOp::Neg), Just(UnaryOp::Not)], inner.clone())
                .prop_map(|(op, p)| Plan::Unary(op, Box::new(p))),
            (arb_total_binary_op(), inner.clone(), inner.clone())
                .prop_map(|(op, a, b)| Plan::Binary(op, Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(|(c, t, o)| Plan::Where(
                Box::new(c),
                Box::new(t),
                Box::new(o)
            )),
            (arb_sel_plan_from(inner.clone()), inner, -3i64..3)
                .prop_map(|(s, v, d)| Plan::Aggregate(s, Box::new(v), d)),
        ]
    })
}

/// Selector plans of bounded depth
pub fn arb_sel_plan() -> impl Strategy<Value = SelPlan> {
    arb_sel_plan_from(arb_plan().boxed())
}

/// Build fresh nodes for a plan. Every call yields distinct node ids.
pub fn build(plan: &Plan) -> SeqOp {
    match plan {
        Plan::Tokens => tokens(),
        Plan::Indices => indices(),
        Plan::Const(n) => constant(*n),
        Plan::Unary(op, p) => build(p).unary(*op),
        Plan::Binary(op, a, b) => build(a).binary(*op, build(b)),
        Plan::Where(c, t, o) => where_(build(c), build(t), build(o)),
        Plan::Aggregate(s, v, d) => build_selector(s).value_or(build(v), *d),
    }
}

pub fn build_selector(plan: &SelPlan) -> Selector {
    match plan {
        SelPlan::Compare(k, op, q) => key(build(k)).compare(*op, &query(build(q))),
        SelPlan::And(a, b) => build_selector(a) & build_selector(b),
        SelPlan::Or(a, b) => build_selector(a) | build_selector(b),
        SelPlan::Not(s) => !build_selector(s),
    }
}

// ============================================================================
// Surface syntax
// ============================================================================

fn spanned<T>(node: T) -> Spanned<T> {
    Spanned::new(node, Span::new(0, 0))
}

/// Identifiers that are never keywords
pub fn arb_identifier() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("tokens".to_string()),
        Just("indices".to_string()),
        "[a-z][a-z0-9_]{0,6}".prop_filter("not a keyword", |s| {
            !matches!(s.as_str(), "let" | "true" | "false")
        }),
    ]
}

fn arb_any_binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
        Just(BinaryOp::Mod),
        Just(BinaryOp::Eq),
        Just(BinaryOp::Ne),
        Just(BinaryOp::Lt),
        Just(BinaryOp::Le),
        Just(BinaryOp::Gt),
        Just(BinaryOp::Ge),
        Just(BinaryOp::And),
        Just(BinaryOp::Or),
    ]
}

/// Arbitrary AST expressions (spans are dummies)
pub fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0i64..1000).prop_map(Expr::Int),
        prop::sample::select(vec!['a', 'Z', '0', '_', '+', '\'', '\\', ' ', '"'])
            .prop_map(Expr::Char),
        "[a-z \"]{0,5}".prop_map(Expr::Str),
        any::<bool>().prop_map(Expr::Bool),
        arb_identifier().prop_map(Expr::Var),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        let args = vec(inner.clone().prop_map(spanned), 0..3);
        prop_oneof![
            (arb_identifier(), args.clone()).prop_map(|(func, args)| Expr::Call { func, args }),
            (inner.clone(), arb_identifier(), args).prop_map(|(receiver, method, args)| {
                Expr::Method {
                    receiver: Box::new(spanned(receiver)),
                    method,
                    args,
                }
            }),
            (prop_oneof![Just(UnaryOp::Neg), Just(UnaryOp::Not)], inner.clone()).prop_map(
                |(op, operand)| Expr::Unary {
                    op,
                    operand: Box::new(spanned(operand)),
                }
            ),
            (arb_any_binary_op(), inner.clone(), inner).prop_map(|(op, lhs, rhs)| Expr::Binary {
                op,
                lhs: Box::new(spanned(lhs)),
                rhs: Box::new(spanned(rhs)),
            }),
        ]
    })
}

/// Arbitrary programs mixing `let` and expression statements
pub fn arb_program() -> impl Strategy<Value = Program> {
    let stmt = prop_oneof![
        (arb_identifier(), arb_expr()).prop_map(|(name, value)| Statement::Let {
            name,
            value: spanned(value),
        }),
        arb_expr().prop_map(|e| Statement::Expr(spanned(e))),
    ];
    vec(stmt.prop_map(spanned), 0..4).prop_map(|statements| Program { statements })
}
