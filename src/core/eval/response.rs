//! Decoding of the vendor's result payload.
//!
//! Two wire encodings exist across deployments: a legacy one that delivers
//! the result as a single XML text body, and the streamed one that delivers
//! base64 fragments which concatenate into a base64 document, decoded to
//! UTF-8 and then parsed. Both are resolved by one decode step at this
//! boundary; everything downstream only ever sees the canonical
//! [`RawEvaluationResult`] shape.
//!
//! XML documents are folded into a [`serde_json::Value`] tree (elements
//! become objects, attributes become string fields, repeated child elements
//! become arrays) so XML and JSON deployments normalize identically.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::eval::messages::Category;
use crate::errors::{EvalError, EvalResult};

/// Fully reassembled, decoded vendor response.
///
/// `tree` holds the vendor's nested result structure; the sub-tree relevant
/// to the evaluation is keyed by the category (see
/// [`RawEvaluationResult::category_subtree`]).
#[derive(Debug, Clone)]
pub struct RawEvaluationResult {
    pub category: Category,
    pub tree: Value,
}

impl RawEvaluationResult {
    /// Locate the category's result sub-tree.
    ///
    /// The vendor places it either at the top level or one level down inside
    /// a single document wrapper element.
    pub fn category_subtree(&self) -> Option<&Value> {
        let key = self.category.result_key();
        if let Some(subtree) = self.tree.get(key) {
            return Some(subtree);
        }
        self.tree
            .as_object()?
            .values()
            .find_map(|wrapper| wrapper.get(key))
    }
}

/// Wire encodings of the result payload, resolved by a single decode step.
#[derive(Debug, Clone)]
pub enum WirePayload {
    /// Legacy deployment: one XML (or JSON) text body.
    Text(String),
    /// Streamed deployment: base64 fragments concatenated in arrival order.
    Base64Stream(String),
}

impl WirePayload {
    /// Decode either encoding into the canonical in-memory result shape.
    pub fn decode(self, category: Category) -> EvalResult<RawEvaluationResult> {
        let text = match self {
            Self::Text(text) => text,
            Self::Base64Stream(encoded) => {
                let bytes = BASE64
                    .decode(encoded.trim())
                    .map_err(|e| EvalError::decode(format!("invalid base64: {e}"), &encoded))?;
                String::from_utf8(bytes)
                    .map_err(|e| EvalError::decode(format!("result is not UTF-8: {e}"), &encoded))?
            }
        };

        let tree = parse_result_text(&text)?;
        debug!(category = category.result_key(), "decoded vendor result");
        Ok(RawEvaluationResult { category, tree })
    }
}

/// Parse the decoded result body, which is XML in most deployments and JSON
/// in some.
fn parse_result_text(text: &str) -> EvalResult<Value> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(trimmed)
            .map_err(|e| EvalError::decode(format!("invalid JSON result: {e}"), text))
    } else {
        xml_to_value(trimmed)
    }
}

/// Fold an XML document into a JSON value.
fn xml_to_value(xml: &str) -> EvalResult<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Stack of open elements; the sentinel at the bottom collects the root.
    let mut stack: Vec<(String, Map<String, Value>)> = vec![(String::new(), Map::new())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                stack.push(element_node(&start, xml)?);
            }
            Ok(Event::Empty(start)) => {
                let (name, node) = element_node(&start, xml)?;
                attach_child(&mut stack, name, Value::Object(node), xml)?;
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(EvalError::decode("unbalanced XML close tag", xml));
                }
                let (name, node) = stack.pop().unwrap_or_default();
                attach_child(&mut stack, name, Value::Object(node), xml)?;
            }
            Ok(Event::Text(text)) => {
                let content = text
                    .unescape()
                    .map_err(|e| EvalError::decode(format!("invalid XML text: {e}"), xml))?;
                if !content.trim().is_empty() {
                    if let Some((_, node)) = stack.last_mut() {
                        node.insert("#text".to_string(), Value::String(content.into_owned()));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(EvalError::decode(format!("invalid XML result: {e}"), xml)),
        }
    }

    if stack.len() != 1 {
        return Err(EvalError::decode("unclosed XML element", xml));
    }
    let (_, root) = stack.pop().unwrap_or_default();
    Ok(Value::Object(root))
}

/// Build an object node from an element's name and attributes.
fn element_node(start: &BytesStart<'_>, xml: &str) -> EvalResult<(String, Map<String, Value>)> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = Map::new();
    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|e| EvalError::decode(format!("invalid XML attribute: {e}"), xml))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| EvalError::decode(format!("invalid XML attribute value: {e}"), xml))?;
        node.insert(key, Value::String(value.into_owned()));
    }
    Ok((name, node))
}

/// Insert a completed child under the element currently on top of the stack.
/// A repeated tag name turns the entry into an array.
fn attach_child(
    stack: &mut [(String, Map<String, Value>)],
    name: String,
    value: Value,
    xml: &str,
) -> EvalResult<()> {
    let Some((_, parent)) = stack.last_mut() else {
        return Err(EvalError::decode("unbalanced XML document", xml));
    };
    match parent.get_mut(&name) {
        None => {
            parent.insert(name, value);
        }
        Some(Value::Array(items)) => {
            items.push(value);
        }
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
    Ok(())
}
