//! XML wire documents as nested `serde_json::Value` trees.
//!
//! Conversion rules:
//! - the root element becomes a one-key object `{RootName: ...}`
//! - attributes, comments, processing instructions and the declaration are
//!   ignored
//! - an element holding only text becomes a scalar, an empty one becomes `""`
//! - repeated sibling elements collect into an array in document order
//! - an element with both text and children keeps the text under `#text`
//!
//! Text that is exactly `true`/`false` becomes a boolean and canonical
//! decimal numbers become numbers. Anything that would not survive the
//! trip back to text unchanged (`007`, `+1`, `1e5`, `0x1F`) stays a string,
//! so identifiers are never silently altered. Numeric-looking identifiers do
//! arrive as numbers; decode them with `codec::ensure_string`.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Key under which mixed-content text is stored.
pub const TEXT_KEY: &str = "#text";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("document has no root element")]
    MissingRoot,
    #[error("unexpected content outside the root element")]
    TrailingContent,
}

struct Node {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    /// Text is trimmed once over everything the element collected, so
    /// whitespace-only runs between children vanish.
    fn into_value(self) -> Value {
        let text = self.text.trim();
        if self.children.is_empty() {
            return scalar(text);
        }
        let mut children = self.children;
        if !text.is_empty() {
            children.insert(TEXT_KEY.to_string(), scalar(text));
        }
        Value::Object(children)
    }
}

fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        None => {
            children.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Parse a document into a value tree.
pub fn parse(input: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(input);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::Malformed(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent);
                }
                stack.push(Node::new(element_name(start.name().as_ref())));
            }
            Event::Empty(start) => {
                let name = element_name(start.name().as_ref());
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, Value::String(String::new())),
                    None if root.is_none() => root = Some(single(name, Value::String(String::new()))),
                    None => return Err(XmlError::TrailingContent),
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| XmlError::Malformed("unexpected closing tag".to_string()))?;
                let name = node.name.clone();
                let value = node.into_value();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => root = Some(single(name, value)),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| XmlError::Malformed(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                append_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Malformed("unclosed element".to_string()));
    }
    root.ok_or(XmlError::MissingRoot)
}

fn append_text(stack: &mut [Node], text: &str) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(node) => {
            node.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlError::TrailingContent),
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn single(name: String, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(name, value);
    Value::Object(map)
}

fn scalar(text: &str) -> Value {
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ if is_canonical_number(text) => number(text).unwrap_or_else(|| Value::String(text.to_string())),
        _ => Value::String(text.to_string()),
    }
}

fn number(text: &str) -> Option<Value> {
    if text.contains('.') {
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    }
}

/// `-?(0|[1-9][0-9]*)(\.[0-9]*[1-9])?`
fn is_canonical_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let int_ok = !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && (int == "0" || !int.starts_with('0'));
    let frac_ok = match frac {
        None => true,
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) && !f.ends_with('0'),
    };
    int_ok && frac_ok
}
