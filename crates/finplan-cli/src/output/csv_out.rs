use serde_json::Value;
use std::io;

use super::{flatten, result_of, scalar};

/// Write the result as CSV: one row per record for lists (alerts), otherwise
/// `field,value` rows of flattened paths.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match result_of(value) {
        Value::Array(records) => write_records(&mut wtr, records),
        result => write_fields(&mut wtr, result),
    };
    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        log::error!("CSV output failed: {e}");
    }
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Value) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (path, val) in flatten(result) {
        wtr.write_record([path, val])?;
    }
    Ok(())
}

fn write_records<W: io::Write>(wtr: &mut csv::Writer<W>, records: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = records.first() else {
        return Ok(());
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|h| record.get(*h).map(scalar).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}
