//! Minimal WordprocessingML (`.docx`) reading and writing.
//!
//! Reading extracts the plain text of each paragraph in `word/document.xml`.
//! Writing produces the smallest package Word accepts: content types, the
//! package relationship and a main document part.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const DOCUMENT_PART: &str = "word/document.xml";

const WORDML_NAMESPACE: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("not a docx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("docx package has no word/document.xml")]
    MissingDocumentPart,

    #[error("malformed document xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One output paragraph holding a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub bold: bool,
}

/// Text of every non-empty paragraph, trimmed, in document order.
pub fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>, DocxError> {
    paragraphs_from_xml(&read_document_part(bytes)?)
}

fn read_document_part(bytes: &[u8]) -> Result<String, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Err(DocxError::MissingDocumentPart),
        Err(e) => return Err(e.into()),
    }
    Ok(xml)
}

fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    // Paragraphs nest inside text boxes; only the outermost one is emitted.
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    if depth == 0 {
                        current.clear();
                    }
                    depth += 1;
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let text = current.trim();
                        if !text.is_empty() {
                            paragraphs.push(text.to_string());
                        }
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text && depth > 0 => {
                current.push_str(&e.unescape()?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// Build a `.docx` package with one paragraph per entry.
pub fn write_document(paragraphs: &[Paragraph]) -> Result<Vec<u8>, DocxError> {
    let document_xml = document_xml(paragraphs)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", options)?;
    writer.write_all(CONTENT_TYPES_XML.as_bytes())?;
    writer.start_file("_rels/.rels", options)?;
    writer.write_all(PACKAGE_RELS_XML.as_bytes())?;
    writer.start_file(DOCUMENT_PART, options)?;
    writer.write_all(&document_xml)?;

    Ok(writer.finish()?.into_inner())
}

fn document_xml(paragraphs: &[Paragraph]) -> Result<Vec<u8>, DocxError> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    let mut document = BytesStart::new("w:document");
    document.push_attribute(("xmlns:w", WORDML_NAMESPACE));
    writer.write_event(Event::Start(document))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;

    for paragraph in paragraphs {
        writer.write_event(Event::Start(BytesStart::new("w:p")))?;
        writer.write_event(Event::Start(BytesStart::new("w:r")))?;
        if paragraph.bold {
            writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
            writer.write_event(Event::Empty(BytesStart::new("w:b")))?;
            writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
        }
        let mut t = BytesStart::new("w:t");
        t.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(t))?;
        writer.write_event(Event::Text(BytesText::new(&paragraph.text)))?;
        writer.write_event(Event::End(BytesEnd::new("w:t")))?;
        writer.write_event(Event::End(BytesEnd::new("w:r")))?;
        writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;

    Ok(writer.into_inner())
}

/// Whether each paragraph carries a bold run, in document order.
pub fn paragraph_bold_flags(bytes: &[u8]) -> Result<Vec<bool>, DocxError> {
    let xml = read_document_part(bytes)?;
    let mut reader = Reader::from_str(&xml);
    let mut buf = Vec::new();
    let mut flags = Vec::new();
    let mut bold = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"w:p" => bold = false,
            Event::Empty(e) if e.name().as_ref() == b"w:b" => bold = true,
            Event::End(e) if e.name().as_ref() == b"w:p" => flags.push(bold),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(flags)
}
