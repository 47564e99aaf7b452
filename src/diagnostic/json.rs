use super::{Diagnostic, Location};
use crate::ast::SourceMap;

/// One-line JSON object: `severity`, `message`, `notes`, plus `code`, `line`, `col`, `start`,
/// `end` and `suggestion` when known.
pub fn render(d: &Diagnostic) -> String {
    let mut obj = serde_json::json!({
        "severity": "error",
        "message": d.message,
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::from(code);
    }

    match d.location {
        Some(Location::Line(line)) => obj["line"] = serde_json::Value::from(line),
        Some(Location::Offset(span)) => {
            obj["start"] = serde_json::Value::from(span.start);
            obj["end"] = serde_json::Value::from(span.end);
            if let Some(source) = &d.source {
                let (line, col) = SourceMap::new(source).lookup(span.start);
                obj["line"] = serde_json::Value::from(line);
                obj["col"] = serde_json::Value::from(col);
            }
        }
        None => {}
    }

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| {
        r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string()
    })
}
