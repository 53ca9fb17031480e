//! Output rendering for command results.

use clap::ValueEnum;
use endb::Element;
use serde_json::{Value, json};

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable: strings unquoted, one item per line.
    #[default]
    Pretty,
    /// One compact JSON document per command.
    Json,
}

/// The result of one command, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Output {
    /// A single value, or nothing when the key or path is absent.
    Value(Option<Value>),
    /// A yes/no answer.
    Flag(bool),
    /// A list of keys.
    Keys(Vec<String>),
    /// A list of values.
    Values(Vec<Value>),
    /// Key-value pairs.
    Entries(Vec<(String, Value)>),
    /// Elements as returned by `all`.
    Elements(Vec<Element>),
    /// A write that completed.
    Done,
}

impl OutputFormat {
    /// Render `output`. Returns `None` when there is nothing to print.
    pub(crate) fn render(self, output: &Output) -> Option<String> {
        match self {
            Self::Json => Some(render_json(output)),
            Self::Pretty => render_pretty(output),
        }
    }
}

fn render_json(output: &Output) -> String {
    let value = match output {
        Output::Value(value) => value.clone().unwrap_or(Value::Null),
        Output::Flag(flag) => Value::Bool(*flag),
        Output::Done => Value::Bool(true),
        Output::Keys(keys) => Value::from(keys.clone()),
        Output::Values(values) => Value::Array(values.clone()),
        Output::Entries(entries) => Value::Array(
            entries
                .iter()
                .map(|(key, value)| Value::Array(vec![Value::from(key.as_str()), value.clone()]))
                .collect(),
        ),
        Output::Elements(elements) => Value::Array(
            elements
                .iter()
                .map(|element| json!({"key": element.key, "value": element.value}))
                .collect(),
        ),
    };
    value.to_string()
}

fn render_pretty(output: &Output) -> Option<String> {
    match output {
        Output::Value(None) => Some("(nil)".to_owned()),
        Output::Value(Some(value)) => Some(pretty_value(value)),
        Output::Flag(flag) => Some(flag.to_string()),
        Output::Keys(keys) => lines(keys.iter().cloned()),
        Output::Values(values) => lines(values.iter().map(inline_value)),
        Output::Entries(entries) => lines(
            entries
                .iter()
                .map(|(key, value)| format!("{key}\t{}", inline_value(value))),
        ),
        Output::Elements(elements) => lines(
            elements
                .iter()
                .map(|element| format!("{}\t{}", element.key, inline_value(&element.value))),
        ),
        Output::Done => None,
    }
}

fn lines(items: impl Iterator<Item = String>) -> Option<String> {
    let joined = items.collect::<Vec<_>>().join("\n");
    (!joined.is_empty()).then_some(joined)
}

/// Strings print bare; everything else as indented JSON.
fn pretty_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Strings print bare; everything else as compact JSON.
fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_value() {
        let format = OutputFormat::Json;
        assert_eq!(
            format.render(&Output::Value(Some(json!({"x": 1})))).unwrap(),
            r#"{"x":1}"#
        );
        assert_eq!(format.render(&Output::Value(None)).unwrap(), "null");
        assert_eq!(format.render(&Output::Flag(false)).unwrap(), "false");
        assert_eq!(format.render(&Output::Done).unwrap(), "true");
    }

    #[test]
    fn test_json_entries_are_pairs() {
        let output = Output::Entries(vec![("a".into(), json!(1))]);
        assert_eq!(OutputFormat::Json.render(&output).unwrap(), r#"[["a",1]]"#);
    }

    #[test]
    fn test_json_elements() {
        let output = Output::Elements(vec![Element {
            key: "a".into(),
            value: json!("v"),
        }]);
        assert_eq!(
            OutputFormat::Json.render(&output).unwrap(),
            r#"[{"key":"a","value":"v"}]"#
        );
    }

    #[test]
    fn test_pretty_strings_are_bare() {
        let format = OutputFormat::Pretty;
        assert_eq!(
            format.render(&Output::Value(Some(json!("hello")))).unwrap(),
            "hello"
        );
        assert_eq!(format.render(&Output::Value(None)).unwrap(), "(nil)");
        assert_eq!(format.render(&Output::Done), None);
    }

    #[test]
    fn test_pretty_lists() {
        let format = OutputFormat::Pretty;
        let keys = Output::Keys(vec!["a".into(), "b".into()]);
        assert_eq!(format.render(&keys).unwrap(), "a\nb");
        assert_eq!(format.render(&Output::Keys(Vec::new())), None);

        let entries = Output::Entries(vec![("a".into(), json!({"x": 1})), ("b".into(), json!("s"))]);
        assert_eq!(format.render(&entries).unwrap(), "a\t{\"x\":1}\nb\ts");
    }
}
