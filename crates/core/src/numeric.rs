use serde_json::Value;

/// Shared zero/no-op threshold for every numeric comparison in the core.
/// Artifacts are hashed for audit, so all call sites must agree on it.
pub const EPSILON: f64 = 1e-9;

pub fn approx_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Coerces a JSON scalar into `f64`: numbers directly, strings only when
/// the trimmed text parses as a number. Everything else is non-numeric.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Percent delta with the zero-baseline rule: a near-zero baseline maps
/// to 100 when the proposed value is positive, otherwise 0.
pub fn percent_delta(baseline: f64, proposed: f64) -> f64 {
    if approx_zero(baseline) {
        if proposed > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (proposed - baseline) / baseline * 100.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{approx_zero, coerce_numeric, percent_delta};

    #[test]
    fn coerce_numeric_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_numeric(&json!(140)), Some(140.0));
        assert_eq!(coerce_numeric(&json!(12.5)), Some(12.5));
        assert_eq!(coerce_numeric(&json!(" 99.5 ")), Some(99.5));
    }

    #[test]
    fn coerce_numeric_rejects_non_numeric_values() {
        assert_eq!(coerce_numeric(&json!("broad")), None);
        assert_eq!(coerce_numeric(&json!("")), None);
        assert_eq!(coerce_numeric(&json!(true)), None);
        assert_eq!(coerce_numeric(&json!(null)), None);
        assert_eq!(coerce_numeric(&json!(["10"])), None);
    }

    #[test]
    fn percent_delta_follows_the_ratio_law() {
        assert!((percent_delta(100.0, 140.0) - 40.0).abs() < 1e-9);
        assert!((percent_delta(200.0, 150.0) + 25.0).abs() < 1e-9);
    }

    #[test]
    fn percent_delta_zero_baseline_rule() {
        assert_eq!(percent_delta(0.0, 20.0), 100.0);
        assert_eq!(percent_delta(0.0, 0.0), 0.0);
        assert_eq!(percent_delta(0.0, -5.0), 0.0);
        assert_eq!(percent_delta(1e-12, 3.0), 100.0);
    }

    #[test]
    fn approx_zero_uses_shared_epsilon() {
        assert!(approx_zero(0.0));
        assert!(approx_zero(5e-10));
        assert!(!approx_zero(1e-8));
    }
}
