//! Quick-XML based XMLTV parser
//!
//! Builds the owned [`Document`] tree from a decompressed feed. Only the
//! `channel` and `programme` children of the `<tv>` root become records;
//! everything inside a record is kept as read.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::errors::ParseError;
use crate::xmltv::encoding;
use crate::xmltv::model::{Channel, Document, Element, Node, Programme, Record};

const ROOT_ELEMENT: &str = "tv";

/// Parse an XMLTV document in whatever encoding its BOM or declaration names
pub fn parse(data: &[u8]) -> Result<Document, ParseError> {
    let content = encoding::decode(data)?;
    parse_str(&content)
}

/// Parse XMLTV content already held as a string
pub fn parse_str(content: &str) -> Result<Document, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = Reader::from_str(content);

    let mut builder = TreeBuilder::default();

    loop {
        let event = reader.read_event().map_err(|e| ParseError::Malformed {
            position: reader.error_position() as u64,
            message: e.to_string(),
        })?;

        let position = reader.buffer_position() as u64;
        match event {
            Event::Start(ref e) => builder.open(read_element(e, position)?, position)?,
            Event::Empty(ref e) => {
                let element = read_element(e, position)?;
                builder.open(element, position)?;
                builder.close();
            }
            Event::End(_) => builder.close(),
            Event::Text(e) => builder.text(utf8(&e, position)?),
            Event::GeneralRef(e) => {
                let name = utf8(&e, position)?;
                builder.text(&format!("&{name};"));
            }
            Event::CData(e) => builder.node(Node::CData(utf8(&e, position)?.to_string())),
            Event::Comment(e) => builder.node(Node::Comment(utf8(&e, position)?.to_string())),
            Event::PI(e) => builder.node(Node::ProcessingInstruction(utf8(&e, position)?.to_string())),
            Event::Eof => break,
            // Declaration and DOCTYPE carry nothing we re-emit
            _ => {}
        }
    }

    builder.finish(reader.buffer_position() as u64)
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::Malformed {
        position,
        message: format!("invalid UTF-8: {e}"),
    })
}

fn read_element(start: &BytesStart, position: u64) -> Result<Element, ParseError> {
    let qname = start.name();
    let name = utf8(qname.as_ref(), position)?;
    let mut element = Element::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| ParseError::Malformed {
            position,
            message: format!("bad attribute on <{name}>: {e}"),
        })?;
        let key = utf8(attribute.key.as_ref(), position)?;
        let value = utf8(&attribute.value, position)?;
        element.attributes.push((key.to_string(), value.to_string()));
    }

    Ok(element)
}

/// Stack based assembly of records below the root element
#[derive(Default)]
struct TreeBuilder {
    document: Document,
    stack: Vec<Element>,
    root_seen: bool,
    root_open: bool,
    skipped: usize,
}

impl TreeBuilder {
    fn open(&mut self, element: Element, position: u64) -> Result<(), ParseError> {
        if !self.root_seen {
            if element.name != ROOT_ELEMENT {
                return Err(ParseError::UnexpectedRoot {
                    found: format!("<{}>", element.name),
                });
            }
            self.root_seen = true;
            self.root_open = true;
            return Ok(());
        }

        if !self.root_open {
            return Err(ParseError::Malformed {
                position,
                message: format!("element <{}> after the root element", element.name),
            });
        }

        self.stack.push(element);
        Ok(())
    }

    fn close(&mut self) {
        let Some(mut element) = self.stack.pop() else {
            self.root_open = false;
            return;
        };

        // Whitespace between child elements is indentation, the writer
        // re-indents. A leaf keeps its text whatever it holds.
        if element.children.iter().any(|node| matches!(node, Node::Element(_))) {
            element
                .children
                .retain(|node| !matches!(node, Node::Text(text) if text.trim().is_empty()));
        }

        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None => self.record(element),
        }
    }

    fn record(&mut self, element: Element) {
        match element.name.as_str() {
            "channel" => self.document.push(Record::Channel(Channel::from_element(element))),
            "programme" => self
                .document
                .push(Record::Programme(Programme::from_element(element))),
            _ => self.skipped += 1,
        }
    }

    fn text(&mut self, raw: &str) {
        let Some(parent) = self.stack.last_mut() else {
            return;
        };
        match parent.children.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(raw),
            _ => parent.children.push(Node::Text(raw.to_string())),
        }
    }

    fn node(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        }
    }

    fn finish(self, position: u64) -> Result<Document, ParseError> {
        if !self.root_seen {
            return Err(ParseError::UnexpectedRoot {
                found: "no element".to_string(),
            });
        }
        if self.root_open || !self.stack.is_empty() {
            return Err(ParseError::Malformed {
                position,
                message: "unexpected end of document, unclosed elements remain".to_string(),
            });
        }

        if self.skipped > 0 {
            debug!("Skipped {} top-level element(s) that are neither channel nor programme", self.skipped);
        }
        debug!(
            "Parsed {} channels and {} programmes",
            self.document.channel_count(),
            self.document.programme_count()
        );
        Ok(self.document)
    }
}
