//! Integration tests for the expression sandbox.
//!
//! These tests exercise the public path from raw text through validation to
//! evaluation, including inputs an untrusted configuration file could supply.

use approx::assert_relative_eq;
use calib_core::expr::{evaluate, evaluate_scalar, validate_expression, Expression, Symbol};
use calib_core::types::{validate_domain_range, CalibrationError, Interval};
use proptest::prelude::*;

fn energy_intervals() -> (Interval, Interval) {
    validate_domain_range(&[0.0, 8192.0], &[0.0, 3000.0]).unwrap()
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[test]
fn test_quadratic_energy_calibration() {
    let (domain, range) = energy_intervals();
    let params = [0.5, 0.35, 1.0e-6];
    let expr = validate_expression(
        "p[0] + p[1]*x + p[2]*x**2",
        Some(&params[..]),
        Symbol::X,
        domain,
        range,
    )
    .unwrap();

    let channels = [0.0, 1000.0, 4000.0];
    let energies = evaluate(&expr, &params, &channels, Symbol::X, domain, range).unwrap();
    assert_relative_eq!(energies[0], 0.5);
    assert_relative_eq!(energies[1], 0.5 + 350.0 + 1.0, epsilon = 1e-9);
    assert_relative_eq!(energies[2], 0.5 + 1400.0 + 16.0, epsilon = 1e-9);
}

#[test]
fn test_multiline_expression_with_locals() {
    let (domain, range) = energy_intervals();
    let params = [1.0, 0.001];
    let text = "
        # saturating response
        a = p[0] * x
        a / (1 + p[1] * a)
    ";
    let expr = validate_expression(text, Some(&params[..]), Symbol::X, domain, range).unwrap();
    assert_eq!(expr.as_str(), "a = p[0] * x\na / (1 + p[1] * a)");

    let y = evaluate_scalar(&expr, &params, 1000.0, Symbol::X, domain, range).unwrap();
    assert_relative_eq!(y, 500.0, epsilon = 1e-9);
}

#[test]
fn test_numpy_qualified_expression() {
    let (domain, range) = energy_intervals();
    let params = [2.0, 3.0];
    let expr = validate_expression(
        "np.sqrt(p[0] + p[1] * numpy.abs(x))",
        Some(&params[..]),
        Symbol::X,
        domain,
        range,
    )
    .unwrap();
    let y = evaluate_scalar(&expr, &params, 1.0, Symbol::X, domain, range).unwrap();
    assert_relative_eq!(y, 5.0_f64.sqrt());
}

// ============================================================================
// Sandbox Boundary Tests
// ============================================================================

#[test]
fn test_hostile_inputs_are_rejected() {
    let (domain, range) = energy_intervals();
    let hostile = [
        "__import__('os').system('ls')",
        "open('/etc/passwd')",
        "x.__class__.__bases__",
        "eval(x)",
        "[c for c in x]",
        "lambda x: x",
        "x if x else 0",
        "p[0] * x; import os",
        "np.loadtxt(x)",
        "numpy.linalg.inv(x)",
        "globals()",
        "x[0]",
    ];
    for text in hostile {
        let result = validate_expression(text, None, Symbol::X, domain, range);
        match result {
            Err(CalibrationError::Syntax { .. }) | Err(CalibrationError::InvalidExpression { .. }) => {}
            other => panic!("{:?} should be rejected, got {:?}", text, other),
        }
    }
}

/// Oversized inputs fail with an error instead of exhausting the stack or
/// overflowing index arithmetic.
#[test]
fn test_resource_exhaustion_inputs_are_rejected() {
    let (domain, range) = energy_intervals();
    let oversized = [
        format!("{}x{}", "(".repeat(5_000), ")".repeat(5_000)),
        format!("{}x{}", "(".repeat(200_000), ")".repeat(200_000)),
        format!("{}x", "-".repeat(100_000)),
        format!("{}x{}", "np.exp(".repeat(2_000), ")".repeat(2_000)),
        format!("x{}", " ** x".repeat(5_000)),
        vec!["p[0] * x"; 20_000].join(" + "),
    ];
    for text in &oversized {
        match Expression::parse(text) {
            Err(CalibrationError::Syntax { message, .. }) => {
                assert!(message.contains("nested too deeply"), "{}", message)
            }
            other => panic!("oversized input should be rejected, got {:?}", other.map(|e| e.param_count())),
        }
    }

    match validate_expression("p[0] + p[9223372036854775807] * x", None, Symbol::X, domain, range) {
        Err(CalibrationError::ParameterIndices { .. }) => {}
        other => panic!("Expected ParameterIndices, got {:?}", other),
    }
}

#[test]
fn test_domain_is_a_hard_contract() {
    let (domain, range) = energy_intervals();
    let expr = Expression::parse("p[0] * x").unwrap();

    assert!(evaluate_scalar(&expr, &[0.1], 0.0, Symbol::X, domain, range).is_ok());
    assert!(evaluate_scalar(&expr, &[0.1], 8192.0, Symbol::X, domain, range).is_ok());
    assert!(matches!(
        evaluate_scalar(&expr, &[0.1], -1.0, Symbol::X, domain, range),
        Err(CalibrationError::OutOfDomain { .. })
    ));
    assert!(matches!(
        evaluate_scalar(&expr, &[0.1], 8192.5, Symbol::X, domain, range),
        Err(CalibrationError::OutOfDomain { .. })
    ));
}

#[test]
fn test_range_is_a_soft_contract() {
    let (domain, range) = energy_intervals();
    let expr = Expression::parse("p[0] * x - 10").unwrap();

    let y = evaluate(&expr, &[1.0], &[0.0, 5000.0], Symbol::X, domain, range).unwrap();
    assert_eq!(y, vec![0.0, 3000.0]);
}

// ============================================================================
// Property Tests
// ============================================================================

fn operand() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("x".to_string()),
        (0usize..4).prop_map(|j| format!("p[{}]", j)),
        (1u32..100).prop_map(|n| n.to_string()),
    ]
}

fn expression_text() -> impl Strategy<Value = String> {
    let leaf = operand();
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone(), prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")])
                .prop_map(|(a, b, op)| format!("({}){}({})", a, op, b)),
            (inner.clone(), 1u32..4).prop_map(|(a, n)| format!("({}) ** {}", a, n)),
            inner.clone().prop_map(|a| format!("-({})", a)),
            inner.prop_map(|a| format!("sqrt(abs({}))", a)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_canonical_form_is_a_fixed_point(text in expression_text()) {
        let once = Expression::parse(&text).unwrap();
        let twice = Expression::parse(once.as_str()).unwrap();
        prop_assert_eq!(once.as_str(), twice.as_str());
    }

    #[test]
    fn prop_canonical_form_preserves_value(text in expression_text(), x in 0.0f64..100.0) {
        let domain = Interval::domain(0.0, 100.0).unwrap();
        let range = Interval::range(-1e300, 1e300).unwrap();
        let params = [1.5, -0.5, 2.0, 0.25];

        let original = Expression::parse(&text).unwrap();
        let reparsed = Expression::parse(original.as_str()).unwrap();

        let a = evaluate_scalar(&original, &params, x, Symbol::X, domain, range);
        let b = evaluate_scalar(&reparsed, &params, x, Symbol::X, domain, range);
        match (a, b) {
            (Ok(a), Ok(b)) => prop_assert!(a == b || (a - b).abs() <= 1e-12 * a.abs().max(1.0)),
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "divergent results {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn prop_contiguous_indices_validate(n in 1usize..6) {
        let (domain, range) = (Interval::default_domain(), Interval::default_range());
        let text: Vec<String> = (0..n).map(|j| format!("p[{}] * x", j)).collect();
        let text = text.join(" + ");
        let expr = validate_expression(&text, None, Symbol::X, domain, range).unwrap();
        prop_assert_eq!(expr.param_count(), n);
    }

    #[test]
    fn prop_gapped_indices_fail(n in 2usize..6, gap in 0usize..5) {
        let gap = gap % n;
        let (domain, range) = (Interval::default_domain(), Interval::default_range());
        let text: Vec<String> = (0..=n)
            .filter(|j| *j != gap)
            .map(|j| format!("p[{}] * x", j))
            .collect();
        let text = text.join(" + ");
        let is_param_error = matches!(
            validate_expression(&text, None, Symbol::X, domain, range),
            Err(CalibrationError::ParameterIndices { .. })
        );
        prop_assert!(is_param_error);
    }
}
