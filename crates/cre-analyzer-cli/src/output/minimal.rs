use serde_json::Value;

use super::format_scalar;

/// Key answer per command, as JSON pointers into the result, in priority order.
const PRIORITY_POINTERS: [&str; 6] = [
    "/returns/after_tax/irr",
    "/optimal/ltv",
    "/base_value",
    "/summary/total_after_tax_cash_flow",
    "/path",
    "/name",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    for pointer in PRIORITY_POINTERS {
        if let Some(val) = result.pointer(pointer).filter(|v| !v.is_null()) {
            println!("{}", format_scalar(val));
            return;
        }
    }

    match result {
        // Comparison rows: one "metric: delta" line each
        Value::Array(rows) if rows.iter().all(|r| r.get("delta").is_some()) => {
            for row in rows {
                let metric = row.get("metric").map(format_scalar).unwrap_or_default();
                let delta = row.get("delta").map(format_scalar).unwrap_or_default();
                println!("{}: {}", metric, delta);
            }
        }
        Value::Object(map) => {
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_scalar(val));
            }
        }
        other => println!("{}", format_scalar(other)),
    }
}
