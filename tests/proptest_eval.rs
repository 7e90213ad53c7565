//! Property tests for evaluation

mod generators;

use generators::{arb_int_input, arb_plan, arb_sel_plan, arb_text_input, build, build_selector};
use proptest::prelude::*;
use rasp::{
    evaluate, evaluate_selector, indices, key, query, tokens, trace_evaluate, Evaluator, Value,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every sequence has exactly as many entries as the input
    #[test]
    fn evaluation_preserves_length(plan in arb_plan(), input in arb_int_input()) {
        let out = evaluate(&build(&plan), input.clone()).unwrap();
        prop_assert_eq!(out.len(), input.len());
    }

    /// Selector matrices are n x n and counts never exceed n
    #[test]
    fn selector_matrix_is_square(plan in arb_sel_plan(), input in arb_int_input()) {
        let n = input.len();
        let matrix = evaluate_selector(&build_selector(&plan), input).unwrap();
        prop_assert_eq!(matrix.len(), n);
        for q in 0..n {
            prop_assert_eq!(matrix.row(q).len(), n);
            prop_assert!(matrix.count(q) <= n);
        }
    }

    /// Rows that select nothing produce the default
    #[test]
    fn empty_rows_take_default(
        sel in arb_sel_plan(),
        value in arb_plan(),
        default in -3i64..3,
        input in arb_int_input(),
    ) {
        let selector = build_selector(&sel);
        let op = selector.value_or(build(&value), default);
        let matrix = evaluate_selector(&selector, input.clone()).unwrap();
        let out = evaluate(&op, input).unwrap();
        for (q, v) in out.iter().enumerate() {
            if matrix.count(q) == 0 {
                prop_assert_eq!(*v, Value::Int(default));
            }
        }
    }

    /// Nothing precedes position 0, so its sum falls back to the default
    #[test]
    fn first_position_of_strict_prefix_is_default(input in arb_text_input(), default in 1i64..9) {
        prop_assume!(!input.is_empty());
        let op = key(indices()).lt(&query(indices())).value_or(1, default);
        let out = evaluate(&op, input.as_str()).unwrap();
        prop_assert_eq!(out[0], Value::Int(default));
    }

    /// Shared and duplicated subexpressions evaluate the same
    #[test]
    fn sharing_does_not_change_results(plan in arb_plan(), input in arb_int_input()) {
        let shared = build(&plan);
        let with_sharing = &shared + &shared;
        let without_sharing = build(&plan) + build(&plan);
        prop_assert_eq!(
            evaluate(&with_sharing, input.clone()).unwrap(),
            evaluate(&without_sharing, input).unwrap()
        );
    }

    /// Labels never change values, and relabelling is stable
    #[test]
    fn naming_is_transparent(plan in arb_plan(), input in arb_int_input()) {
        let op = build(&plan);
        let named = op.name("a");
        let renamed = named.name("b").name("a");
        let expected = evaluate(&op, input.clone()).unwrap();
        prop_assert_eq!(&evaluate(&named, input.clone()).unwrap(), &expected);
        prop_assert_eq!(&evaluate(&renamed, input).unwrap(), &expected);
        prop_assert_eq!(named.id(), op.id());
        prop_assert_eq!(renamed.label(), Some("a"));
    }

    /// Evaluating on one input leaves no trace in a later evaluation
    #[test]
    fn inputs_are_isolated(plan in arb_plan(), a in arb_int_input(), b in arb_int_input()) {
        let op = build(&plan);
        let _ = evaluate(&op, a).unwrap();
        prop_assert_eq!(
            evaluate(&op, b.clone()).unwrap(),
            evaluate(&build(&plan), b).unwrap()
        );
    }

    /// One evaluator computes each node once, no matter how often it is asked
    #[test]
    fn evaluator_memoizes(plan in arb_plan(), input in arb_int_input()) {
        let op = build(&plan);
        let mut evaluator = Evaluator::new(input);
        let first = evaluator.sequence(&op).unwrap();
        let cached = evaluator.cached_nodes();
        let second = evaluator.sequence(&op).unwrap();
        prop_assert_eq!(&first[..], &second[..]);
        prop_assert_eq!(evaluator.cached_nodes(), cached);
    }

    /// Tracing observes the same values plain evaluation returns
    #[test]
    fn trace_agrees_with_evaluate(plan in arb_plan(), input in arb_int_input()) {
        let op = build(&plan);
        let (values, trace) = trace_evaluate(&op, input.clone()).unwrap();
        prop_assert_eq!(&values, &evaluate(&op, input).unwrap());
        let output = trace.output().unwrap();
        prop_assert_eq!(output.sequence(), Some(&values[..]));
        prop_assert!(trace.attention_layers() <= trace.attention_count());
    }

    /// tokens is the identity on its input
    #[test]
    fn tokens_echo_input(input in arb_text_input()) {
        let out = evaluate(&tokens(), input.as_str()).unwrap();
        let expected: Vec<Value> = input.chars().map(Value::Char).collect();
        prop_assert_eq!(out, expected);
    }
}
