use serde::Serialize;
use serde_json::Value;

use crate::job::JobResult;

/// Slack renders text between these markers as pre-formatted, fixed-width.
pub const CODE_FENCE: &str = "```";

/// Lines longer than this are broken up by [`pformat`].
const WIDTH: usize = 80;

/// Form body of a `chat.postMessage` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub channel: String,
    pub username: String,
    pub as_user: bool,
    pub text: String,
}

/// Render the five-line summary of a job return. Missing fields render empty.
pub fn format_message(ret: &JobResult) -> String {
    format!(
        "id: {}\r\nfunction: {}\r\nfunction args: {}\r\njid: {}\r\nreturn: {}\r\n",
        plain(ret.id.as_ref()),
        plain(ret.fun.as_ref()),
        ret.fun_args.as_ref().map(repr).unwrap_or_default(),
        plain(ret.jid.as_ref()),
        ret.return_value.as_ref().map(pformat).unwrap_or_default(),
    )
}

/// Wrap text in code fences so whitespace survives rendering.
pub fn fenced(text: &str) -> String {
    format!("{CODE_FENCE}{text}{CODE_FENCE}")
}

fn plain(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => repr(other),
    }
}

/// Single-line, Python-literal style rendering (`None`, `True`, `'text'`,
/// `[1, 2]`, `{'key': 'value'}`). Object keys are sorted.
pub fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let inner: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", quote(k), repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Pretty rendering: same as [`repr`] while it fits in 80 columns, otherwise
/// one element per line aligned under the opening bracket.
pub fn pformat(value: &Value) -> String {
    let mut out = String::new();
    write_pretty(&mut out, value, 0);
    out
}

fn write_pretty(out: &mut String, value: &Value, indent: usize) {
    let flat = repr(value);
    if indent + flat.chars().count() <= WIDTH {
        out.push_str(&flat);
        return;
    }

    match value {
        Value::Array(items) if !items.is_empty() => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    newline(out, indent + 1);
                }
                write_pretty(out, item, indent + 1);
            }
            out.push(']');
        }
        Value::Object(map) if !map.is_empty() => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    newline(out, indent + 1);
                }
                let key = quote(key);
                out.push_str(&key);
                out.push_str(": ");
                write_pretty(out, item, indent + 1 + key.chars().count() + 2);
            }
            out.push('}');
        }
        _ => out.push_str(&flat),
    }
}

fn newline(out: &mut String, indent: usize) {
    out.push_str(",\n");
    out.extend(std::iter::repeat(' ').take(indent));
}

fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}
