//! XML to nested-mapping deserialization.
//!
//! The [`Deserializer`] trait is the seam between the inventory lister and
//! whatever turns appcmd's `/xml` output into data. The mapping it produces
//! is a [`serde_json::Value`] shaped the way appcmd tooling has always read
//! it:
//!
//! - the document root element is returned, not wrapped in its own name
//! - an element's attributes live under the `"@"` key
//! - an element's text lives under the `"#"` key
//! - a child element that occurs once is an object; one that occurs more
//!   than once is an array of objects
//!
//! The last rule is why the lister has to normalize single and multiple
//! records itself.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

/// Key under which element attributes are stored.
pub const ATTRIBUTES_KEY: &str = "@";

/// Key under which element text is stored.
pub const TEXT_KEY: &str = "#";

/// Parses XML text into a nested mapping.
pub trait Deserializer: Send + Sync {
    /// Parse a complete document and return its root element.
    fn parse(&self, text: &str) -> Result<Value>;
}

/// [`Deserializer`] backed by `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDeserializer;

struct Node {
    name: String,
    fields: Map<String, Value>,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.insert(key, Value::String(value));
        }

        let mut fields = Map::new();
        if !attributes.is_empty() {
            fields.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        }
        Ok(Self { name, fields })
    }

    fn push_text(&mut self, text: &str) {
        match self.fields.get_mut(TEXT_KEY) {
            Some(Value::String(existing)) => existing.push_str(text),
            _ => {
                self.fields
                    .insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
            }
        }
    }

    fn attach(&mut self, child: Node) {
        let value = Value::Object(child.fields);
        match self.fields.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(child.name, value);
            }
        }
    }
}

impl Deserializer for XmlDeserializer {
    fn parse(&self, text: &str) -> Result<Value> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    ensure_single_root(root.as_ref())?;
                    stack.push(Node::open(&start)?);
                }
                Event::Empty(start) => {
                    ensure_single_root(root.as_ref())?;
                    let node = Node::open(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.attach(node),
                        None => root = Some(node),
                    }
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::Other("unbalanced closing tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.attach(node),
                        None => root = Some(node),
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    match stack.last_mut() {
                        Some(node) => node.push_text(&text),
                        // appcmd prints plain-text errors instead of XML
                        None => {
                            return Err(Error::Other(format!(
                                "unexpected text outside the document element: {}",
                                text.trim()
                            )));
                        }
                    }
                }
                Event::CData(data) => {
                    if let Some(node) = stack.last_mut() {
                        node.push_text(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Other(format!("unclosed element <{}>", open.name)));
        }

        root.map(|node| Value::Object(node.fields))
            .ok_or_else(|| Error::Other("document has no root element".to_string()))
    }
}

fn ensure_single_root(root: Option<&Node>) -> Result<()> {
    match root {
        Some(node) => Err(Error::Other(format!(
            "content after the document element <{}>",
            node.name
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Value {
        XmlDeserializer.parse(text).unwrap()
    }

    #[test]
    fn test_single_child_is_object() {
        let doc = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<appcmd>
    <APPPOOL APPPOOL.NAME="DefaultAppPool" RuntimeVersion="v4.0" />
</appcmd>"#,
        );
        assert!(doc["APPPOOL"].is_object());
        assert_eq!(doc["APPPOOL"]["@"]["APPPOOL.NAME"], "DefaultAppPool");
    }

    #[test]
    fn test_repeated_children_are_array() {
        let doc = parse(
            r#"<appcmd>
    <SITE SITE.NAME="a" />
    <SITE SITE.NAME="b" />
    <SITE SITE.NAME="c" />
</appcmd>"#,
        );
        let sites = doc["SITE"].as_array().unwrap();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[2]["@"]["SITE.NAME"], "c");
    }

    #[test]
    fn test_empty_root() {
        let doc = parse("<?xml version=\"1.0\"?>\n<appcmd>\n</appcmd>");
        assert_eq!(doc, Value::Object(Map::new()));
    }

    #[test]
    fn test_attributes_are_unescaped() {
        let doc = parse(r#"<appcmd><SITE SITE.NAME="R&amp;D &quot;lab&quot;" /></appcmd>"#);
        assert_eq!(doc["SITE"]["@"]["SITE.NAME"], "R&D \"lab\"");
    }

    #[test]
    fn test_nested_elements_and_text() {
        let doc = parse(
            r#"<appcmd><SITE SITE.NAME="a"><site><bindings>text</bindings></site></SITE></appcmd>"#,
        );
        assert_eq!(doc["SITE"]["site"]["bindings"]["#"], "text");
    }

    #[test]
    fn test_plain_text_error_output() {
        let err = XmlDeserializer
            .parse("ERROR ( message:You cannot run this command as a non-administrator. )")
            .unwrap_err();
        assert!(err.to_string().contains("outside the document element"));
    }

    #[test]
    fn test_empty_output() {
        assert!(XmlDeserializer.parse("").is_err());
    }

    #[test]
    fn test_unclosed_element() {
        assert!(XmlDeserializer.parse("<appcmd><SITE SITE.NAME=\"a\" />").is_err());
    }

    #[test]
    fn test_mismatched_tags() {
        assert!(XmlDeserializer.parse("<appcmd><SITE></APP></appcmd>").is_err());
    }
}
