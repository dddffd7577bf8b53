use serde_json::{Map, Value};
use std::io;

use super::{flatten_fields, format_scalar};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// Record arrays (pro forma rows, leverage rows, comparisons) become one CSV
/// row per record; a sensitivity grid becomes a matrix; anything else is
/// written as field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let body = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match body {
        Value::Object(map) if map.contains_key("matrix") => write_grid_csv(&mut wtr, map),
        Value::Object(map) => match primary_records(map) {
            Some(records) => write_array_csv(&mut wtr, records),
            None => write_fields_csv(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([format_scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

/// The record array a result is mostly about, if it has one.
fn primary_records(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    ["rows", "pro_forma"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
}

fn write_fields_csv(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let mut fields = Vec::new();
    flatten_fields("", map, &mut fields);
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in fields {
        let _ = wtr.write_record([key, format_scalar(val)]);
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([format_scalar(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_scalar).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

/// Header row is `parameter_a,<values_b...>`; each following row is one
/// value of parameter A. Failed cells are empty.
fn write_grid_csv(wtr: &mut StdoutWriter<'_>, grid: &Map<String, Value>) {
    let empty = Vec::new();
    let values_a = grid.get("values_a").and_then(Value::as_array).unwrap_or(&empty);
    let values_b = grid.get("values_b").and_then(Value::as_array).unwrap_or(&empty);
    let matrix = grid.get("matrix").and_then(Value::as_array).unwrap_or(&empty);
    let corner = grid
        .get("parameter_a")
        .and_then(Value::as_str)
        .unwrap_or("a")
        .to_string();

    let mut header = vec![corner];
    header.extend(values_b.iter().map(format_scalar));
    let _ = wtr.write_record(&header);

    for (a, row) in values_a.iter().zip(matrix) {
        let mut line = vec![format_scalar(a)];
        if let Value::Array(cells) = row {
            line.extend(cells.iter().map(format_scalar));
        }
        let _ = wtr.write_record(&line);
    }
}
