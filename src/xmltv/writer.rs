//! XMLTV serializer
//!
//! Output is always UTF-8 with an XML declaration and a bare `<tv>` root.
//! Records are written from their stored escaped form, two-space indented.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use tracing::debug;

use crate::errors::WriteError;
use crate::xmltv::model::{Document, Element, Node};

/// Serialize a document into any writer
pub fn serialize<W: Write>(document: &Document, out: W) -> io::Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(&mut writer, Event::Start(BytesStart::new("tv")))?;
    for record in &document.records {
        write_element(&mut writer, record.element())?;
    }
    emit(&mut writer, Event::End(BytesEnd::new("tv")))?;

    let mut out = writer.into_inner();
    out.write_all(b"\n")?;
    out.flush()
}

/// Serialize a document into a byte buffer
pub fn to_bytes(document: &Document) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    serialize(document, &mut buffer)?;
    Ok(buffer)
}

/// Write a document to `path`, replacing any previous file atomically
///
/// The content goes to a temporary file next to the destination which is
/// renamed over it only once fully written, so a failure leaves an existing
/// output untouched.
pub fn write_document(document: &Document, path: &Path) -> Result<(), WriteError> {
    let wrap = |source: io::Error| WriteError {
        path: path.to_path_buf(),
        source,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = tempfile::NamedTempFile::new_in(directory).map_err(wrap)?;
    {
        let mut buffered = BufWriter::new(temp.as_file());
        serialize(document, &mut buffered).map_err(wrap)?;
    }
    temp.as_file().sync_all().map_err(wrap)?;
    set_readable(temp.as_file()).map_err(wrap)?;
    temp.persist(path).map_err(|e| wrap(e.error))?;

    debug!("Wrote {} records to {}", document.records.len(), path.display());
    Ok(())
}

#[cfg(unix)]
fn set_readable(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_readable(_file: &File) -> io::Result<()> {
    Ok(())
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> io::Result<()> {
    writer.write_event(event).map_err(io::Error::other)
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> io::Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        // Values are stored escaped, push them as raw bytes
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Borrowed(value.as_bytes()),
        });
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(raw) => emit(writer, Event::Text(BytesText::from_escaped(raw.as_str())))?,
            Node::CData(content) => emit(writer, Event::CData(BytesCData::new(content.as_str())))?,
            Node::Comment(content) => {
                emit(writer, Event::Comment(BytesText::from_escaped(content.as_str())))?
            }
            Node::ProcessingInstruction(content) => {
                emit(writer, Event::PI(BytesPI::new(content.as_str())))?
            }
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}
