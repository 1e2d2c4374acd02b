//! XML fragment decoding
//!
//! A fragment is one `<table>` (or `<type>`) declaration decoded into a
//! generic record: attributes become `@`-prefixed keys, child elements
//! become nested records (an array once a name repeats) and element text
//! is stored under `#`. Child element names are also listed under `$order`
//! in document order, so siblings of different names can be interleaved
//! back with [`Record::children_in_order`].

use crate::error::LoadError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One raw declaration record
pub type Fragment = Map<String, Value>;

/// Element names that declare an entity
const ENTITY_ELEMENTS: [&str; 2] = ["table", "type"];

/// Key holding element text
const TEXT_KEY: &str = "#";

/// Key listing child element names in document order
const ORDER_KEY: &str = "$order";

/// Prefix of custom property attributes
const PROPERTY_PREFIX: &str = "@p:";

/// Typed accessors over `@`-attribute records
pub trait Record {
    /// Raw attribute value (`name` without the `@`)
    fn attr(&self, name: &str) -> Option<&Value>;

    /// Attribute rendered as a string
    fn attr_str(&self, name: &str) -> Option<String>;

    /// Attribute only when it is an explicit boolean
    fn attr_bool(&self, name: &str) -> Option<bool>;

    /// Lenient flag: a boolean, or `true`/`1` as text
    fn attr_flag(&self, name: &str) -> bool;

    /// Sub-records under `key`; a lone record is promoted to a one-element list
    fn children(&self, key: &str) -> Vec<&Fragment>;

    /// Sub-records under any of `keys`, interleaved in document order.
    ///
    /// Records built without an element order (e.g. by hand) fall back to
    /// the children of each key in turn.
    fn children_in_order(&self, keys: &[&str]) -> Vec<&Fragment>;

    /// `@p:<key>` attributes with the prefix stripped
    fn custom_properties(&self) -> BTreeMap<String, String>;

    /// Comma-separated `@tags`, trimmed, empty entries dropped
    fn tag_list(&self) -> Vec<String>;

    /// Element text content
    fn text(&self) -> Option<String>;
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Record for Fragment {
    fn attr(&self, name: &str) -> Option<&Value> {
        self.get(&format!("@{}", name))
    }

    fn attr_str(&self, name: &str) -> Option<String> {
        self.attr(name).and_then(value_to_string)
    }

    fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attr(name).and_then(Value::as_bool)
    }

    fn attr_flag(&self, name: &str) -> bool {
        match self.attr(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    fn children(&self, key: &str) -> Vec<&Fragment> {
        match self.get(key) {
            Some(Value::Object(record)) => vec![record],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        }
    }

    fn children_in_order(&self, keys: &[&str]) -> Vec<&Fragment> {
        let Some(Value::Array(order)) = self.get(ORDER_KEY) else {
            return keys.iter().flat_map(|key| self.children(key)).collect();
        };

        let mut pending: Vec<(&str, std::vec::IntoIter<&Fragment>)> = keys
            .iter()
            .map(|key| (*key, self.children(key).into_iter()))
            .collect();

        let mut ordered = Vec::new();
        for name in order.iter().filter_map(Value::as_str) {
            if let Some((_, items)) = pending.iter_mut().find(|(key, _)| *key == name) {
                ordered.extend(items.next());
            }
        }
        ordered
    }

    fn custom_properties(&self) -> BTreeMap<String, String> {
        self.iter()
            .filter_map(|(key, value)| {
                let property = key.strip_prefix(PROPERTY_PREFIX)?;
                Some((property.to_string(), value_to_string(value)?))
            })
            .collect()
    }

    fn tag_list(&self) -> Vec<String> {
        self.attr_str("tags")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn text(&self) -> Option<String> {
        self.get(TEXT_KEY).and_then(value_to_string)
    }
}

/// Attribute literal -> JSON value; `true`/`false` become booleans
fn attribute_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

fn insert_child(parent: &mut Fragment, name: String, child: Fragment) {
    match parent.get_mut(ORDER_KEY) {
        Some(Value::Array(order)) => order.push(Value::String(name.clone())),
        _ => {
            parent.insert(ORDER_KEY.to_string(), Value::Array(vec![Value::String(name.clone())]));
        }
    }

    let child = Value::Object(child);
    match parent.get_mut(&name) {
        None => {
            parent.insert(name, child);
        }
        Some(Value::Array(items)) => items.push(child),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, child]);
        }
    }
}

fn append_text(record: &mut Fragment, text: &str) {
    if text.is_empty() {
        return;
    }
    match record.get_mut(TEXT_KEY) {
        Some(Value::String(existing)) => existing.push_str(text),
        _ => {
            record.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
    }
}

fn element_name(source: &str, name: &[u8]) -> Result<String, LoadError> {
    std::str::from_utf8(name)
        .map(str::to_string)
        .map_err(|e| LoadError::Xml {
            path: source.to_string(),
            message: e.to_string(),
        })
}

fn open_element(source: &str, start: &BytesStart<'_>) -> Result<(String, Fragment), LoadError> {
    let xml_error = |message: String| LoadError::Xml {
        path: source.to_string(),
        message,
    };

    let name = element_name(source, start.name().as_ref())?;
    let mut record = Fragment::new();

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| xml_error(e.to_string()))?;
        let key = element_name(source, attribute.key.as_ref())?;
        let value = attribute.unescape_value().map_err(|e| xml_error(e.to_string()))?;
        record.insert(format!("@{}", key), attribute_value(&value));
    }

    Ok((name, record))
}

/// Decode one XML document into its entity fragments, in document order.
///
/// The root may itself be a `<table>`/`<type>`, or a package element whose
/// direct `<table>`/`<type>` children are the fragments.
pub fn decode_fragments(source: &str, xml: &str) -> Result<Vec<Fragment>, LoadError> {
    let xml_error = |message: String| LoadError::Xml {
        path: source.to_string(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, Fragment)> = Vec::new();
    let mut root: Option<(String, Fragment)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(open_element(source, &start)?),
            Ok(Event::Empty(start)) => {
                let (name, record) = open_element(source, &start)?;
                match stack.last_mut() {
                    Some((_, parent)) => insert_child(parent, name, record),
                    None => root = Some((name, record)),
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, record)) = stack.pop() else {
                    return Err(xml_error("unbalanced closing tag".to_string()));
                };
                match stack.last_mut() {
                    Some((_, parent)) => insert_child(parent, name, record),
                    None => root = Some((name, record)),
                }
            }
            Ok(Event::Text(text)) => {
                let text = text.unescape().map_err(|e| xml_error(e.to_string()))?;
                if let Some((_, record)) = stack.last_mut() {
                    append_text(record, &text);
                }
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some((_, record)) = stack.last_mut() {
                    append_text(record, &text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(xml_error("unexpected end of document".to_string()));
    }

    let Some((root_name, root)) = root else {
        return Err(xml_error("document has no root element".to_string()));
    };

    if ENTITY_ELEMENTS.contains(&root_name.as_str()) {
        return Ok(vec![root]);
    }

    let fragments: Vec<Fragment> = root
        .children_in_order(&ENTITY_ELEMENTS)
        .into_iter()
        .cloned()
        .collect();

    if fragments.is_empty() && root.contains_key(ORDER_KEY) {
        return Err(LoadError::Format {
            path: source.to_string(),
            message: format!("<{}> contains no <table> or <type> declarations", root_name),
        });
    }

    Ok(fragments)
}
