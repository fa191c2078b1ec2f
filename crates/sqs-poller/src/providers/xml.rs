//! Minimal XML element tree for SQS Query API responses.
//!
//! Responses are small, so they are read into a tree of elements and then
//! navigated by local name. Namespaces and XML attributes are ignored.

use crate::error::RemoteServiceError;
use quick_xml::events::Event;
use quick_xml::Reader;

#[cfg(test)]
#[path = "xml_tests.rs"]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlElement {
    name: String,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Parse a document and return its root element
    pub(crate) fn parse(xml: &str) -> Result<Self, RemoteServiceError> {
        let mut reader = Reader::from_str(xml);

        // Bottom of the stack collects the root element
        let mut stack = vec![XmlElement::new(String::new())];

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    stack.push(XmlElement::new(name));
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlElement::new(name));
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| malformed(format!("bad text: {}", e)))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    let data = e.into_inner();
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Ok(Event::End(_)) => {
                    if stack.len() < 2 {
                        return Err(malformed("unexpected closing tag".to_string()));
                    }
                    let finished = stack.pop().ok_or_else(|| malformed("empty stack".into()))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(finished);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(malformed(format!(
                        "XML parsing error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(malformed("unclosed element".to_string()));
        }

        stack
            .pop()
            .and_then(|document| document.children.into_iter().next())
            .ok_or_else(|| malformed("document has no root element".to_string()))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// First direct child with the given name
    pub(crate) fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name
    pub(crate) fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first direct child with the given name
    pub(crate) fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text())
    }

    /// First element with the given name anywhere below this one, depth first
    pub(crate) fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

fn malformed(message: String) -> RemoteServiceError {
    RemoteServiceError::MalformedResponse { message }
}
