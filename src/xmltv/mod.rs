//! XMLTV document model, parser and serializer

pub mod encoding;
pub mod model;
pub mod parser;
pub mod writer;

pub use model::{Channel, Document, Element, Node, Programme, Record};
pub use parser::{parse, parse_str};
pub use writer::{serialize, to_bytes, write_document};
