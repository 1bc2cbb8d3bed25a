use std::fmt::Write;

use crate::{NodeRecord, SceneDocument, Value};

/// Renders a document in the same text format [`crate::parse_scene_text`] reads.
pub fn write_scene_text(document: &SceneDocument) -> String {
    let mut out = String::new();

    for (name, value) in &document.vars {
        let _ = writeln!(out, "@{name} = {}", format_value(value));
    }
    if !document.vars.is_empty() {
        out.push('\n');
    }

    for (i, record) in document.records.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_record(&mut out, record);
    }

    out
}

fn write_record(out: &mut String, record: &NodeRecord) {
    let _ = writeln!(out, "[{}]", record.id);
    if let Some(name) = &record.name {
        let _ = writeln!(out, "name = {}", quote(name));
    }
    let _ = writeln!(out, "[{}]", record.node_type);
    for (role, targets) in &record.references {
        let value = match targets.as_slice() {
            [single] => single.to_string(),
            many => format!(
                "({})",
                many.iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let _ = writeln!(out, "    {role} = {value}");
    }
    for (key, value) in &record.attributes {
        let _ = writeln!(out, "    {key} = {}", format_value(value));
    }
    let _ = writeln!(out, "[/{}]", record.node_type);
    let _ = writeln!(out, "[/{}]", record.id);
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Str(s) => quote(s),
        Value::Ident(s) => s.clone(),
        Value::IdentList(list) => format!("({})", list.join(", ")),
        Value::Tuple(nums) => format!(
            "({})",
            nums.iter()
                .map(|n| format_number(*n))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
