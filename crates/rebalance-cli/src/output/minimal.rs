use serde_json::Value;

/// Print just the headline numbers: the new targets (or whichever vector
/// the command produced) as one comma-separated line.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(Value::Array(categories)) = result_obj.get("categories") {
        let targets: Vec<String> = categories
            .iter()
            .filter_map(|c| c.get("new_target"))
            .map(format_minimal)
            .collect();
        println!("{}", targets.join(","));
        return;
    }

    let priority_keys = ["new_targets", "reference", "final_shares"];
    for key in &priority_keys {
        if let Some(Value::Array(values)) = result_obj.get(*key) {
            let line: Vec<String> = values.iter().map(format_minimal).collect();
            println!("{}", line.join(","));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
