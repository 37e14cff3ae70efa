use serde_json::Value;

use super::{result_of, scalar};

/// Headline figure of each command's result, by dotted path.
const HEADLINE_PATHS: &[&str] = &[
    "ccc",
    "contribution_margin",
    "income_statement.net_income",
    "closing_state.cash",
];

/// Print just the headline answer: the first known headline field, the alert
/// ids for an alert list, or the first field of the result.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Array(alerts) = result {
        if alerts.is_empty() {
            println!("no alerts");
        }
        for alert in alerts {
            let severity = alert.get("severity").map(scalar).unwrap_or_default();
            let id = alert.get("id").map(scalar).unwrap_or_default();
            println!("{severity} {id}");
        }
        return;
    }

    for path in HEADLINE_PATHS {
        if let Some(val) = lookup(result, path) {
            if !val.is_null() {
                println!("{}", scalar(val));
                return;
            }
        }
    }

    match result {
        Value::Object(map) => {
            if let Some((key, val)) = map.iter().next() {
                println!("{key}: {}", scalar(val));
            }
        }
        other => println!("{}", scalar(other)),
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}
