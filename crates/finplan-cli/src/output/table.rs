use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten, result_of, scalar};

/// Print the result as tables: one row table when the result is a list of
/// records (alerts), otherwise a two-column table of flattened fields.
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Array(records) => print_records(records),
        result @ Value::Object(_) => print_fields(result),
        other => println!("{}", scalar(other)),
    }

    if let Some(envelope) = value.as_object() {
        if let Some(Value::Array(warnings)) = envelope.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for w in warnings {
                    println!("  - {}", scalar(w));
                }
            }
        }
        if let Some(Value::String(methodology)) = envelope.get("methodology") {
            println!("\nMethodology: {methodology}");
        }
    }
}

fn print_fields(result: &Value) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (path, val) in flatten(result) {
        builder.push_record([path, val]);
    }
    println!("{}", Table::from(builder));
}

fn print_records(records: &[Value]) {
    let Some(Value::Object(first)) = records.first() else {
        println!("(none)");
        return;
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|h| record.get(h.as_str()).map(scalar).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}
