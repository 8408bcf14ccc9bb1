//! Views document codec
//!
//! Reads and writes the XML form of a [`Document`]:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <views>
//!   <mapping-views hash="..." conceptual-container="..." store-container="...">
//!     <view extent="Container.Set"><![CDATA[...]]></view>
//!   </mapping-views>
//! </views>
//! ```
//!
//! View text goes into CDATA so that newlines, indentation and markup
//! characters survive untouched. Text containing `]]>` is split across
//! adjacent CDATA sections.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use vista_core::{
    ArtifactMap, CacheEntry, CodecError, Document, EntryFragment, Fingerprint, IdentityPair,
    ViewFragment, ENTRY_ELEMENT, EXTENT_ATTR, FINGERPRINT_ATTR, PRIMARY_ATTR, ROOT_ELEMENT,
    SECONDARY_ATTR, VIEW_ELEMENT,
};

const CDATA_END: &str = "]]>";

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::Malformed {
        reason: reason.into(),
    }
}

// ============================================================================
// ENTRY CODEC
// ============================================================================

/// Decode a `mapping-views` fragment into a validated cache entry.
///
/// A missing or blank `hash` is a configuration fault, not a cache miss.
pub fn decode_entry(fragment: &EntryFragment) -> Result<CacheEntry, CodecError> {
    let fingerprint = fragment
        .fingerprint()
        .and_then(|hash| Fingerprint::new(hash).ok())
        .ok_or(CodecError::MissingFingerprint)?;

    let primary = required_attribute(fragment, PRIMARY_ATTR)?;
    let secondary = required_attribute(fragment, SECONDARY_ATTR)?;
    let identity =
        IdentityPair::new(primary, secondary).map_err(|e| malformed(e.to_string()))?;

    let mut artifacts = ArtifactMap::new();
    for view in &fragment.views {
        let extent = view
            .extent
            .as_deref()
            .filter(|extent| !extent.trim().is_empty())
            .ok_or_else(|| CodecError::MissingAttribute {
                element: VIEW_ELEMENT.to_string(),
                attribute: EXTENT_ATTR.to_string(),
            })?;
        if artifacts.contains(extent) {
            return Err(CodecError::DuplicateExtent {
                extent: extent.to_string(),
            });
        }
        artifacts
            .insert(extent, view.text.as_str())
            .map_err(|e| malformed(e.to_string()))?;
    }

    Ok(CacheEntry::new(identity, fingerprint, artifacts))
}

fn required_attribute<'a>(
    fragment: &'a EntryFragment,
    attribute: &str,
) -> Result<&'a str, CodecError> {
    fragment
        .attribute(attribute)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| CodecError::MissingAttribute {
            element: ENTRY_ELEMENT.to_string(),
            attribute: attribute.to_string(),
        })
}

/// Encode a cache entry as a `mapping-views` fragment.
pub fn encode_entry(entry: &CacheEntry) -> EntryFragment {
    let identity = entry.identity();
    EntryFragment {
        attributes: vec![
            (FINGERPRINT_ATTR.to_string(), entry.fingerprint().as_str().to_string()),
            (PRIMARY_ATTR.to_string(), identity.primary().to_string()),
            (SECONDARY_ATTR.to_string(), identity.secondary().to_string()),
        ],
        views: entry
            .artifacts()
            .iter()
            .map(|(extent, text)| ViewFragment::new(extent, text))
            .collect(),
    }
}

// ============================================================================
// DOCUMENT READER
// ============================================================================

/// Parse a views document.
///
/// Unknown attributes on `mapping-views` are kept. Unknown elements are
/// rejected, as are two entries with the same identity.
pub fn parse_document(source: &str) -> Result<Document, CodecError> {
    let mut reader = Reader::from_str(source);
    let mut buf = Vec::new();

    let mut seen_root = false;
    let mut root_closed = false;
    let mut entry: Option<EntryFragment> = None;
    let mut view: Option<ViewFragment> = None;
    let mut entries: Vec<EntryFragment> = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            malformed(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

                if view.is_some() {
                    return Err(malformed(format!("unexpected <{}> inside <{}>", name, VIEW_ELEMENT)));
                } else if let Some(current) = entry.as_mut() {
                    if name != VIEW_ELEMENT {
                        return Err(malformed(format!("unexpected <{}> inside <{}>", name, ENTRY_ELEMENT)));
                    }
                    let extent = read_attributes(e)?
                        .into_iter()
                        .find(|(key, _)| key == EXTENT_ATTR)
                        .map(|(_, value)| value);
                    let fragment = ViewFragment {
                        extent,
                        text: String::new(),
                    };
                    if is_empty {
                        current.views.push(fragment);
                    } else {
                        view = Some(fragment);
                    }
                } else if seen_root && !root_closed {
                    if name != ENTRY_ELEMENT {
                        return Err(malformed(format!("unexpected <{}> inside <{}>", name, ROOT_ELEMENT)));
                    }
                    let fragment = EntryFragment {
                        attributes: read_attributes(e)?,
                        views: Vec::new(),
                    };
                    if is_empty {
                        push_entry(&mut entries, fragment)?;
                    } else {
                        entry = Some(fragment);
                    }
                } else if !seen_root {
                    if name != ROOT_ELEMENT {
                        return Err(malformed(format!(
                            "expected root <{}>, found <{}>",
                            ROOT_ELEMENT, name
                        )));
                    }
                    seen_root = true;
                    root_closed = is_empty;
                } else {
                    return Err(malformed(format!("unexpected <{}> after root element", name)));
                }
            }
            Event::End(_) => {
                if let Some(finished) = view.take() {
                    match entry.as_mut() {
                        Some(current) => current.views.push(finished),
                        None => return Err(malformed("view closed outside of an entry")),
                    }
                } else if let Some(finished) = entry.take() {
                    push_entry(&mut entries, finished)?;
                } else if seen_root && !root_closed {
                    root_closed = true;
                } else {
                    return Err(malformed("unbalanced closing tag"));
                }
            }
            Event::Text(ref t) => {
                let text = t.unescape().map_err(|e| malformed(e.to_string()))?;
                if let Some(current) = view.as_mut() {
                    current.text.push_str(&text);
                } else if !text.trim().is_empty() {
                    return Err(malformed("text outside of a view element"));
                }
            }
            Event::CData(ref c) => match view.as_mut() {
                Some(current) => {
                    let text = std::str::from_utf8(c).map_err(|e| malformed(e.to_string()))?;
                    current.text.push_str(text);
                }
                None => return Err(malformed("CDATA outside of a view element")),
            },
            Event::Eof => break,
            // Declarations, comments, processing instructions
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(malformed(format!("missing root element <{}>", ROOT_ELEMENT)));
    }
    if !root_closed || entry.is_some() || view.is_some() {
        return Err(malformed("unexpected end of document"));
    }

    Ok(Document::from_entries(entries))
}

fn read_attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, CodecError> {
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| malformed(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn push_entry(entries: &mut Vec<EntryFragment>, fragment: EntryFragment) -> Result<(), CodecError> {
    if let (Some(primary), Some(secondary)) = (
        fragment.attribute(PRIMARY_ATTR),
        fragment.attribute(SECONDARY_ATTR),
    ) {
        let duplicate = entries.iter().any(|existing| {
            existing.attribute(PRIMARY_ATTR) == Some(primary)
                && existing.attribute(SECONDARY_ATTR) == Some(secondary)
        });
        if duplicate {
            return Err(CodecError::DuplicateEntry {
                primary: primary.to_string(),
                secondary: secondary.to_string(),
            });
        }
    }
    entries.push(fragment);
    Ok(())
}

// ============================================================================
// DOCUMENT WRITER
// ============================================================================

/// Serialize a document. Entries are written in document order.
pub fn write_document(document: &Document) -> Result<String, CodecError> {
    let mut writer = Writer::new(Vec::new());

    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
    )?;
    write_newline(&mut writer, 0)?;

    if document.is_empty() {
        write_event(&mut writer, Event::Empty(BytesStart::new(ROOT_ELEMENT)))?;
    } else {
        write_event(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
        for entry in document.entries() {
            write_newline(&mut writer, 1)?;
            write_entry(&mut writer, entry)?;
        }
        write_newline(&mut writer, 0)?;
        write_event(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| malformed(e.to_string()))
}

fn write_entry(writer: &mut Writer<Vec<u8>>, entry: &EntryFragment) -> Result<(), CodecError> {
    let mut start = BytesStart::new(ENTRY_ELEMENT);
    for (key, value) in &entry.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if entry.views.is_empty() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start))?;
    for view in &entry.views {
        write_newline(writer, 2)?;
        let mut view_start = BytesStart::new(VIEW_ELEMENT);
        if let Some(extent) = &view.extent {
            view_start.push_attribute((EXTENT_ATTR, extent.as_str()));
        }
        write_event(writer, Event::Start(view_start))?;
        for section in cdata_sections(&view.text) {
            write_event(writer, Event::CData(BytesCData::new(section)))?;
        }
        write_event(writer, Event::End(BytesEnd::new(VIEW_ELEMENT)))?;
    }
    write_newline(writer, 1)?;
    write_event(writer, Event::End(BytesEnd::new(ENTRY_ELEMENT)))
}

fn write_newline(writer: &mut Writer<Vec<u8>>, depth: usize) -> Result<(), CodecError> {
    let indent = format!("\n{}", "  ".repeat(depth));
    write_event(writer, Event::Text(BytesText::from_escaped(indent)))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), CodecError> {
    writer
        .write_event(event)
        .map_err(|e| malformed(e.to_string()))
}

/// Split `text` so that no section contains `]]>`.
///
/// The terminator is cut between `]]` and `>`; concatenating the sections
/// gives back `text`.
fn cdata_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut rest = text;
    while let Some(index) = rest.find(CDATA_END) {
        sections.push(&rest[..index + 2]);
        rest = &rest[index + 2..];
    }
    if !rest.is_empty() {
        sections.push(rest);
    }
    sections
}
