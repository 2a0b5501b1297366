//! Namespace-aware XML tree used as the parse and serialize boundary.
//!
//! Element types never touch document text directly: they read from and
//! write to [`XmlElement`]. [`parse_document`] and [`write_element`] convert
//! between that tree and text using quick-xml.

mod node;
mod reader;
mod writer;

pub use node::{QName, XmlAttribute, XmlElement, XmlNode, XML_NS};
pub use reader::parse_document;
pub use writer::write_element;
