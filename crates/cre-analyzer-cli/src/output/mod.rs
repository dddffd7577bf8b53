pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Decimal places kept when rendering long decimals in human formats.
const DISPLAY_DP: u32 = 6;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a scalar for table, CSV and minimal output. Decimal strings are
/// rounded to a readable precision; JSON output is never rounded.
pub(crate) fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => match s.parse::<Decimal>() {
            Ok(d) if d.scale() > DISPLAY_DP => d.round_dp(DISPLAY_DP).normalize().to_string(),
            _ => s.clone(),
        },
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Render a grid cell according to its metric format.
pub(crate) fn format_metric(value: &Value, format: &str) -> String {
    let Some(d) = value.as_str().and_then(|s| s.parse::<Decimal>().ok()) else {
        return if value.is_null() {
            "n/a".to_string()
        } else {
            format_scalar(value)
        };
    };
    // `{:.N}` on a Decimal truncates, so round first.
    match format {
        "percent" => format!("{:.2}%", half_up(d * Decimal::ONE_HUNDRED, 2)),
        "currency" => format!("{:.0}", half_up(d, 0)),
        _ => format!("{:.2}", half_up(d, 2)),
    }
}

fn half_up(d: Decimal, dp: u32) -> Decimal {
    d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Flatten nested objects into dotted keys; arrays are left to the caller.
pub(crate) fn flatten_fields<'a>(
    prefix: &str,
    map: &'a serde_json::Map<String, Value>,
    out: &mut Vec<(String, &'a Value)>,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten_fields(&name, inner, out),
            _ => out.push((name, val)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_scalar_rounds_long_decimals() {
        assert_eq!(format_scalar(&json!("0.1234567891234")), "0.123457");
        assert_eq!(format_scalar(&json!("810000")), "810000");
        assert_eq!(format_scalar(&json!("Anchor")), "Anchor");
        assert_eq!(format_scalar(&Value::Null), "");
    }

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(&json!("0.1234"), "percent"), "12.34%");
        assert_eq!(format_metric(&json!("1.8567"), "decimal"), "1.86");
        assert_eq!(format_metric(&json!("152345.67"), "currency"), "152346");
        assert_eq!(format_metric(&Value::Null, "percent"), "n/a");
    }

    #[test]
    fn test_format_metric_rounds_rather_than_truncates() {
        assert_eq!(format_metric(&json!("0.123456"), "percent"), "12.35%");
        assert_eq!(format_metric(&json!("1.999"), "decimal"), "2.00");
        assert_eq!(format_metric(&json!("1.865"), "decimal"), "1.87");
        assert_eq!(format_metric(&json!("-0.0876"), "percent"), "-8.76%");
        assert_eq!(format_metric(&json!("-2499.5"), "currency"), "-2500");
        assert_eq!(format_metric(&json!("3"), "decimal"), "3.00");
    }

    #[test]
    fn test_flatten_fields() {
        let value = json!({"a": "1", "b": {"c": "2", "d": {"e": "3"}}, "rows": [1, 2]});
        let mut out = Vec::new();
        flatten_fields("", value.as_object().unwrap(), &mut out);
        let keys: Vec<&str> = out.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b.c", "b.d.e", "rows"]);
    }
}
