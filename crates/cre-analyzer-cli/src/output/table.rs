use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten_fields, format_metric, format_scalar};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", format_scalar(value)),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) if res_map.contains_key("matrix") => print_grid(res_map),
        Value::Object(res_map) => print_object(res_map),
        Value::Array(arr) => print_array_table(arr),
        other => println!("{}", format_scalar(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars (including nested objects, flattened) in one Field/Value table,
/// then one table per array of records.
fn print_object(map: &Map<String, Value>) {
    let mut fields = Vec::new();
    flatten_fields("", map, &mut fields);

    let (arrays, scalars): (Vec<_>, Vec<_>) = fields
        .into_iter()
        .partition(|(_, v)| matches!(v, Value::Array(a) if a.iter().any(Value::is_object)));

    if !scalars.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &scalars {
            builder.push_record([key.clone(), format_cell(val)]);
        }
        println!("{}", Table::from(builder));
    }

    for (key, val) in arrays {
        if let Value::Array(arr) = val {
            println!("\n{}:", key);
            print_array_table(arr);
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_scalar(item));
        }
        return;
    };

    if first.contains_key("year") {
        print_by_year(arr, first);
        return;
    }

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

/// Annual rows are printed transposed: one line item per row, one year per column.
fn print_by_year(arr: &[Value], first: &Map<String, Value>) {
    let mut builder = Builder::default();
    let mut header = vec!["Line Item".to_string()];
    header.extend(
        arr.iter()
            .map(|row| format!("Year {}", row.get("year").map(format_scalar).unwrap_or_default())),
    );
    builder.push_record(header);

    for key in first.keys().filter(|k| k.as_str() != "year") {
        let mut line = vec![key.clone()];
        line.extend(
            arr.iter()
                .map(|row| row.get(key.as_str()).map(format_cell).unwrap_or_default()),
        );
        builder.push_record(line);
    }
    println!("{}", Table::from(builder));
}

/// Sensitivity grid: parameter A down the side, parameter B across the top.
fn print_grid(grid: &Map<String, Value>) {
    let format = grid.get("format").and_then(Value::as_str).unwrap_or("decimal");
    let label_a = grid.get("label_a").and_then(Value::as_str).unwrap_or("A");
    let label_b = grid.get("label_b").and_then(Value::as_str).unwrap_or("B");
    let empty = Vec::new();
    let values_a = grid.get("values_a").and_then(Value::as_array).unwrap_or(&empty);
    let values_b = grid.get("values_b").and_then(Value::as_array).unwrap_or(&empty);
    let matrix = grid.get("matrix").and_then(Value::as_array).unwrap_or(&empty);

    let mut builder = Builder::default();
    let mut header = vec![format!("{label_a} \\ {label_b}")];
    header.extend(values_b.iter().map(format_scalar));
    builder.push_record(header);

    for (a, row) in values_a.iter().zip(matrix) {
        let mut line = vec![format_scalar(a)];
        if let Value::Array(cells) = row {
            line.extend(cells.iter().map(|c| format_metric(c, format)));
        }
        builder.push_record(line);
    }
    println!("{}", Table::from(builder));

    if let Some(base) = grid.get("base_value").filter(|v| !v.is_null()) {
        println!("\nBase case: {}", format_metric(base, format));
    }
    if let Some(Value::Array(excluded)) = grid.get("excluded") {
        if !excluded.is_empty() {
            println!("\nExcluded cells:");
            print_array_table(excluded);
        }
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(format_scalar).collect::<Vec<_>>().join(", "),
        other => format_scalar(other),
    }
}
