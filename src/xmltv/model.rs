//! Owned XMLTV tree
//!
//! Records keep their markup in the escaped form it was read in, so an
//! included channel or programme is written back out unchanged, including
//! children and attributes nothing here understands.

use std::borrow::Cow;

use quick_xml::escape::unescape;

/// A node inside a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, still escaped
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// A generic XML element with its attributes in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// `(name, escaped value)` pairs
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, escaped_value: V) -> Self {
        self.attributes.push((key.into(), escaped_value.into()));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Unescaped value of the first attribute called `key`
    pub fn attribute(&self, key: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| unescape_lossy(value))
    }

    /// Direct child elements called `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    /// Concatenated, unescaped text and CDATA content of direct children
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => text.push_str(&unescape_lossy(raw)),
                Node::CData(raw) => text.push_str(raw),
                _ => {}
            }
        }
        text
    }
}

/// Unescape entity references, keeping the raw text when it holds one we do
/// not know (custom DTD entities)
fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

/// A `<channel>` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    element: Element,
}

impl Channel {
    pub fn from_element(element: Element) -> Self {
        Self { element }
    }

    /// The `id` attribute; a channel without one can never be selected by id
    pub fn id(&self) -> Option<Cow<'_, str>> {
        self.element.attribute("id")
    }

    /// All `display-name` values in document order, untrimmed
    pub fn display_names(&self) -> Vec<String> {
        self.element
            .children_named("display-name")
            .map(Element::text)
            .collect()
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

/// A `<programme>` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programme {
    element: Element,
}

impl Programme {
    pub fn from_element(element: Element) -> Self {
        Self { element }
    }

    /// The `channel` attribute referencing a channel id
    pub fn channel(&self) -> Option<Cow<'_, str>> {
        self.element.attribute("channel")
    }

    pub fn title(&self) -> Option<String> {
        self.element.children_named("title").next().map(Element::text)
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

/// A direct child of the `<tv>` root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Channel(Channel),
    Programme(Programme),
}

impl Record {
    pub fn element(&self) -> &Element {
        match self {
            Record::Channel(channel) => channel.element(),
            Record::Programme(programme) => programme.element(),
        }
    }
}

/// An XMLTV document: channels and programmes in the order they appeared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub records: Vec<Record>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.records.iter().filter_map(|record| match record {
            Record::Channel(channel) => Some(channel),
            Record::Programme(_) => None,
        })
    }

    pub fn programmes(&self) -> impl Iterator<Item = &Programme> {
        self.records.iter().filter_map(|record| match record {
            Record::Programme(programme) => Some(programme),
            Record::Channel(_) => None,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels().count()
    }

    pub fn programme_count(&self) -> usize {
        self.programmes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
