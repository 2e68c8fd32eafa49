//! Filter Document Model
//!
//! Wraps one filter file: the text around the `<rules>` container is kept
//! verbatim, and the container's `Rule` children become a sequence of
//! [`RuleFragment`]s in display order.
//!
//! Display order is the reverse of file order because the game evaluates
//! rules bottom-up:
//!
//! ```text
//! file:     <rules> A B C </rules>
//! display:  C B A
//! ```
//!
//! The sequence is the single source of truth. The container children are a
//! derived view rebuilt after every structural edit and serialized on save.

use crate::error::{Result, RuleOrderError};
use crate::fragment::{RuleFragment, RULE_TAG};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const RULES_TAG: &[u8] = b"rules";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UTF16LE_BOM: &[u8] = b"\xFF\xFE";
const UTF16BE_BOM: &[u8] = b"\xFE\xFF";

/// Everything in the file that is not a rule, kept so save can put it back
#[derive(Debug, Clone)]
struct Layout {
    /// Encoding of the file on disk; text is held decoded
    encoding: &'static Encoding,
    bom: bool,
    has_declaration: bool,
    newline: &'static str,
    /// Text before the `<rules` tag
    prefix: String,
    open_tag: String,
    close_tag: String,
    /// Text after the closing tag
    suffix: String,
    /// Original `<rules/>` tag, reused while the container stays empty
    self_closing: Option<String>,
    /// Whitespace written before each rule
    item_separator: String,
    /// Whitespace written before `</rules>` when rules follow the open tag
    closing_separator: String,
    /// Body written when there are no rules at all
    empty_body: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    layout: Layout,
    /// Display order
    rules: Vec<RuleFragment>,
    /// File order, derived from `rules`
    container: Vec<RuleFragment>,
    modified: bool,
}

impl Document {
    /// Open and parse a filter file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| RuleOrderError::io(path, e))?;
        let document = Self::parse_bytes(path, &bytes)?;
        info!(
            "Opened {} with {} rules",
            path.display(),
            document.rule_count()
        );
        Ok(document)
    }

    /// Parse raw file content.
    ///
    /// A byte order mark decides the encoding; otherwise the declaration's
    /// `encoding` does, defaulting to UTF-8. Save writes the same encoding back.
    pub fn parse_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Result<Self> {
        let path = path.as_ref();

        let (encoding, bom, body) = match Encoding::for_bom(bytes) {
            Some((encoding, bom_len)) => (encoding, true, &bytes[bom_len..]),
            None => {
                let encoding = match declared_encoding(bytes) {
                    Some(label) => resolve_encoding(path, &label)?,
                    None => UTF_8,
                };
                (encoding, false, bytes)
            }
        };
        let text = encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .ok_or_else(|| {
                RuleOrderError::parse(path, format!("file is not valid {}", encoding.name()))
            })?;

        let mut document = Self::parse_str(path, &text)?;
        // The mark outranks whatever the declaration claims
        document.layout.encoding = encoding;
        document.layout.bom = bom;
        Ok(document)
    }

    /// Parse filter text that is already decoded
    pub fn parse_str(path: impl AsRef<Path>, text: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut parsed = parse_layout(&path, text)?;
        if let Some(label) = parsed.declared_label.take() {
            parsed.layout.encoding = resolve_encoding(&path, &label)?;
        }

        // File order -> display order
        let rules: Vec<RuleFragment> = parsed.rules.into_iter().rev().collect();
        let mut document = Self {
            path,
            layout: parsed.layout,
            rules,
            container: Vec::new(),
            modified: false,
        };
        document.resync_container();
        Ok(document)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_at(&self, index: usize) -> Option<&RuleFragment> {
        self.rules.get(index)
    }

    /// Rules in display order
    pub fn rules(&self) -> &[RuleFragment] {
        &self.rules
    }

    /// Container children in the order they are written to disk
    pub fn on_disk_order(&self) -> &[RuleFragment] {
        &self.container
    }

    pub fn display_name(fragment: &RuleFragment) -> &str {
        fragment.display_name()
    }

    /// Encoding the file is read and written in
    pub fn encoding(&self) -> &'static Encoding {
        self.layout.encoding
    }

    /// True once any edit happened since open or the last save
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Insert at `index` clamped to `[0, rule_count()]`; returns the index used
    pub fn insert(&mut self, fragment: RuleFragment, index: usize) -> usize {
        let index = index.min(self.rules.len());
        debug!(
            "Inserting rule '{}' at row {} of {}",
            fragment.display_name(),
            index,
            self.path.display()
        );
        self.rules.insert(index, fragment);
        self.resync_container();
        self.modified = true;
        index
    }

    pub fn remove(&mut self, index: usize) -> Result<RuleFragment> {
        if index >= self.rules.len() {
            return Err(RuleOrderError::Index {
                index,
                len: self.rules.len(),
            });
        }
        let fragment = self.rules.remove(index);
        debug!(
            "Removed rule '{}' from row {} of {}",
            fragment.display_name(),
            index,
            self.path.display()
        );
        self.resync_container();
        self.modified = true;
        Ok(fragment)
    }

    /// Exchange two neighbouring rows
    pub fn swap(&mut self, first: usize, second: usize) -> Result<()> {
        let len = self.rules.len();
        for index in [first, second] {
            if index >= len {
                return Err(RuleOrderError::Index { index, len });
            }
        }
        if first.abs_diff(second) != 1 {
            return Err(RuleOrderError::NotAdjacent { first, second });
        }
        self.rules.swap(first, second);
        self.resync_container();
        self.modified = true;
        Ok(())
    }

    /// Serialized form of the whole document, exactly as `save` writes it
    pub fn to_xml_string(&self) -> String {
        let layout = &self.layout;
        let mut out = String::new();

        if !layout.has_declaration {
            out.push_str(&format!(
                r#"<?xml version="1.0" encoding="{}"?>"#,
                layout.encoding.name().to_ascii_lowercase()
            ));
            out.push_str(layout.newline);
        }
        out.push_str(&layout.prefix);

        match (&layout.self_closing, self.container.is_empty()) {
            (Some(tag), true) => out.push_str(tag),
            (_, true) => {
                out.push_str(&layout.open_tag);
                out.push_str(&layout.empty_body);
                out.push_str(&layout.close_tag);
            }
            (_, false) => {
                out.push_str(&layout.open_tag);
                for rule in &self.container {
                    out.push_str(&layout.item_separator);
                    out.push_str(rule.xml());
                }
                out.push_str(&layout.closing_separator);
                out.push_str(&layout.close_tag);
            }
        }

        out.push_str(&layout.suffix);
        out
    }

    /// The serialized document in the file's own encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let xml = self.to_xml_string();
        let encoding = self.layout.encoding;
        let mut bytes = Vec::with_capacity(xml.len() + UTF8_BOM.len());

        if self.layout.bom {
            bytes.extend_from_slice(bom_for(encoding));
        }
        // encoding_rs never encodes into UTF-16, so those are done by hand
        if encoding == UTF_16LE {
            bytes.extend(xml.encode_utf16().flat_map(u16::to_le_bytes));
        } else if encoding == UTF_16BE {
            bytes.extend(xml.encode_utf16().flat_map(u16::to_be_bytes));
        } else {
            let (encoded, _, unmappable) = encoding.encode(&xml);
            if unmappable {
                warn!(
                    "{}: characters outside {} were written as character references",
                    self.path.display(),
                    encoding.name()
                );
            }
            bytes.extend_from_slice(&encoded);
        }
        bytes
    }

    /// Write the document back to the path it was opened from
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.save_to(&path)?;
        self.modified = false;
        info!("Saved {} rules to {}", self.rule_count(), path.display());
        Ok(())
    }

    /// Write to `path` through a temporary sibling file that replaces the
    /// destination only once it is fully written
    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_atomically(path, &self.to_bytes())
    }

    fn resync_container(&mut self) {
        self.container = self.rules.iter().rev().cloned().collect();
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    // Replace the file a symlink points at, not the link itself
    let resolved = fs::canonicalize(path).ok();
    let target = resolved.as_deref().unwrap_or(path);

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| RuleOrderError::io(path, e))?;
    temp.write_all(bytes).map_err(|e| RuleOrderError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| RuleOrderError::io(path, e))?;

    if let Ok(metadata) = fs::metadata(target) {
        // Keep the destination's permissions; the temp file is created 0600
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| RuleOrderError::io(path, e))?;
    }

    temp.persist(target)
        .map_err(|e| RuleOrderError::io(path, e.error))?;
    Ok(())
}

struct ParsedLayout {
    layout: Layout,
    /// `encoding` label of the XML declaration, if any
    declared_label: Option<String>,
    /// File order
    rules: Vec<RuleFragment>,
}

/// Byte offsets of the `<rules>` container found while scanning
struct ContainerSpan {
    tag_start: usize,
    open_end: usize,
    open_tag: String,
    self_closing: bool,
}

fn parse_layout(path: &Path, text: &str) -> Result<ParsedLayout> {
    let mut reader = Reader::from_str(text);
    let xml_error = |reader: &Reader<&[u8]>, err: quick_xml::Error| {
        RuleOrderError::parse(
            path,
            format!("XML error at position {}: {err}", reader.buffer_position()),
        )
    };

    let mut depth = 0usize;
    let mut has_declaration = false;
    let mut declared_label = None;
    let mut root_seen = false;
    let mut in_container = false;
    let mut container: Option<ContainerSpan> = None;
    let mut close_span: Option<(usize, usize)> = None;
    let mut rule_spans: Vec<(usize, usize)> = Vec::new();
    let mut dropped = 0usize;

    loop {
        let start = markup_start(text, reader.buffer_position());
        let event = reader.read_event().map_err(|e| xml_error(&reader, e))?;
        let end = reader.buffer_position();

        match event {
            Event::Decl(decl) => {
                has_declaration = true;
                if let Some(Ok(label)) = decl.encoding() {
                    declared_label = Some(String::from_utf8_lossy(&label).into_owned());
                }
            }
            Event::Start(e) => {
                if in_container && depth == 2 {
                    reader
                        .read_to_end(e.name())
                        .map_err(|err| xml_error(&reader, err))?;
                    let stop = reader.buffer_position();
                    if e.name().as_ref() == RULE_TAG {
                        rule_spans.push((start, stop));
                    } else {
                        dropped += 1;
                    }
                    continue;
                }

                if depth == 0 {
                    if root_seen {
                        return Err(RuleOrderError::parse(path, "document has more than one root element"));
                    }
                    root_seen = true;
                } else if depth == 1 && container.is_none() && e.name().as_ref() == RULES_TAG {
                    container = Some(ContainerSpan {
                        tag_start: start,
                        open_end: end,
                        open_tag: text[start..end].to_string(),
                        self_closing: false,
                    });
                    in_container = true;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if in_container && depth == 2 {
                    if e.name().as_ref() == RULE_TAG {
                        rule_spans.push((start, end));
                    } else {
                        dropped += 1;
                    }
                } else if depth == 0 {
                    if root_seen {
                        return Err(RuleOrderError::parse(path, "document has more than one root element"));
                    }
                    root_seen = true;
                } else if depth == 1 && container.is_none() && e.name().as_ref() == RULES_TAG {
                    container = Some(ContainerSpan {
                        tag_start: start,
                        open_end: end,
                        open_tag: expand_empty_tag(&e),
                        self_closing: true,
                    });
                }
            }
            Event::End(_) => {
                if in_container && depth == 2 {
                    close_span = Some((start, end));
                    in_container = false;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if in_container && depth == 2 && !t.iter().all(u8::is_ascii_whitespace) {
                    dropped += 1;
                }
            }
            Event::Comment(_) | Event::PI(_) | Event::CData(_) => {
                if in_container && depth == 2 {
                    dropped += 1;
                }
            }
            Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !root_seen {
        return Err(RuleOrderError::parse(path, "document has no root element"));
    }
    if depth != 0 {
        return Err(RuleOrderError::parse(path, "unexpected end of file inside an element"));
    }
    let container = container.ok_or_else(|| RuleOrderError::MissingRules {
        path: path.to_path_buf(),
    })?;

    if dropped > 0 {
        warn!(
            "{}: {} non-rule node(s) inside <rules> will not be written back",
            path.display(),
            dropped
        );
    }

    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let indent = line_indent(text, container.tag_start);
    let default_item = format!("{newline}{indent}  ");
    let default_closing = format!("{newline}{indent}");

    let layout = if container.self_closing {
        Layout {
            encoding: UTF_8,
            bom: false,
            has_declaration,
            newline,
            prefix: text[..container.tag_start].to_string(),
            open_tag: container.open_tag,
            close_tag: format!("</{}>", String::from_utf8_lossy(RULES_TAG)),
            suffix: text[container.open_end..].to_string(),
            self_closing: Some(text[container.tag_start..container.open_end].to_string()),
            item_separator: default_item,
            closing_separator: default_closing.clone(),
            empty_body: default_closing,
        }
    } else {
        // depth checks above guarantee the container was closed
        let (close_start, close_end) = close_span
            .ok_or_else(|| RuleOrderError::parse(path, "<rules> container is never closed"))?;

        let (item_separator, closing_separator, empty_body) =
            match (rule_spans.first(), rule_spans.last()) {
                (Some(&(first_start, _)), Some(&(_, last_end))) => {
                    let closing = trailing_whitespace(&text[last_end..close_start]).to_string();
                    (
                        trailing_whitespace(&text[container.open_end..first_start]).to_string(),
                        closing.clone(),
                        closing,
                    )
                }
                _ => {
                    let body = &text[container.open_end..close_start];
                    let empty_body = if body.trim().is_empty() {
                        body.to_string()
                    } else {
                        default_closing.clone()
                    };
                    (default_item, default_closing, empty_body)
                }
            };

        Layout {
            encoding: UTF_8,
            bom: false,
            has_declaration,
            newline,
            prefix: text[..container.tag_start].to_string(),
            open_tag: container.open_tag,
            close_tag: text[close_start..close_end].to_string(),
            suffix: text[close_end..].to_string(),
            self_closing: None,
            item_separator,
            closing_separator,
            empty_body,
        }
    };

    let rules = rule_spans
        .into_iter()
        .map(|(start, end)| RuleFragment::from_source(&text[start..end]))
        .collect();

    Ok(ParsedLayout {
        layout,
        declared_label,
        rules,
    })
}

/// `encoding` label of the declaration at the start of undecoded bytes.
///
/// Only ASCII-compatible encodings can be read this way, which is every
/// encoding a declaration without a byte order mark can name.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(bytes);
    match reader.read_event() {
        Ok(Event::Decl(decl)) => match decl.encoding() {
            Some(Ok(label)) => Some(String::from_utf8_lossy(&label).into_owned()),
            _ => None,
        },
        _ => None,
    }
}

fn resolve_encoding(path: &Path, label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        RuleOrderError::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding: label.to_string(),
        }
    })
}

fn bom_for(encoding: &'static Encoding) -> &'static [u8] {
    if encoding == UTF_16LE {
        UTF16LE_BOM
    } else if encoding == UTF_16BE {
        UTF16BE_BOM
    } else if encoding == UTF_8 {
        UTF8_BOM
    } else {
        &[]
    }
}

/// Offset of the `<` opening the markup the reader is about to return.
///
/// The reader may already have consumed the `<` while scanning the text
/// in front of it.
fn markup_start(text: &str, position: usize) -> usize {
    match text.as_bytes().get(position) {
        Some(b'<') | None => position,
        Some(_) => text[..position].rfind('<').unwrap_or(position),
    }
}

/// `<rules a="1"/>` -> `<rules a="1">`
fn expand_empty_tag(tag: &BytesStart) -> String {
    let inner = String::from_utf8_lossy(tag);
    format!("<{}>", inner.trim_end())
}

fn trailing_whitespace(gap: &str) -> &str {
    &gap[gap.trim_end().len()..]
}

/// Whitespace between the start of the line and `offset`
fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..offset];
    &line[..line.len() - line.trim_start().len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ItemFilter xmlns:i="http://www.w3.org/2001/XMLSchema-instance">
  <name>Test</name>
  <rules>
    <Rule>
      <type>SHOW</type>
      <nameOverride>A</nameOverride>
    </Rule>
    <Rule>
      <type>HIDE</type>
      <nameOverride>B</nameOverride>
    </Rule>
    <Rule>
      <type>SHOW</type>
      <nameOverride>C</nameOverride>
    </Rule>
  </rules>
</ItemFilter>
"#;

    fn names(document: &Document) -> Vec<&str> {
        document.rules().iter().map(|r| r.display_name()).collect()
    }

    fn rule(name: &str) -> RuleFragment {
        RuleFragment::from_xml(&format!("<Rule><nameOverride>{name}</nameOverride></Rule>")).unwrap()
    }

    #[test]
    fn test_load_reverses_file_order() {
        let document = Document::parse_str("sample.xml", SAMPLE).unwrap();
        assert_eq!(names(&document), vec!["C", "B", "A"]);
        let disk: Vec<&str> = document.on_disk_order().iter().map(|r| r.display_name()).collect();
        assert_eq!(disk, vec!["A", "B", "C"]);
        assert_eq!(document.rule_count(), 3);
    }

    #[test]
    fn test_unedited_round_trip_is_byte_identical() {
        let document = Document::parse_str("sample.xml", SAMPLE).unwrap();
        assert_eq!(document.to_xml_string(), SAMPLE);
    }

    #[test]
    fn test_insert_positions_and_clamping() {
        let mut document = Document::parse_str("sample.xml", SAMPLE).unwrap();
        assert_eq!(document.insert(rule("X"), 1), 1);
        assert_eq!(names(&document), vec!["C", "X", "B", "A"]);

        assert_eq!(document.insert(rule("Y"), 99), 4);
        assert_eq!(names(&document), vec!["C", "X", "B", "A", "Y"]);
        assert_eq!(document.on_disk_order()[0].display_name(), "Y");
    }

    #[test]
    fn test_remove_out_of_range_leaves_document_untouched() {
        let mut document = Document::parse_str("sample.xml", SAMPLE).unwrap();
        let err = document.remove(3).unwrap_err();
        assert!(err.is_index_error());
        assert_eq!(names(&document), vec!["C", "B", "A"]);
        assert!(!document.is_modified());
    }

    #[test]
    fn test_swap_requires_adjacent_rows() {
        let mut document = Document::parse_str("sample.xml", SAMPLE).unwrap();
        assert!(matches!(
            document.swap(0, 2),
            Err(RuleOrderError::NotAdjacent { first: 0, second: 2 })
        ));
        assert!(document.swap(2, 3).unwrap_err().is_index_error());

        document.swap(1, 0).unwrap();
        assert_eq!(names(&document), vec!["B", "C", "A"]);
        assert!(document.is_modified());
    }

    #[test]
    fn test_missing_rules_container() {
        let err = Document::parse_str("f.xml", "<ItemFilter><name>x</name></ItemFilter>").unwrap_err();
        assert!(matches!(err, RuleOrderError::MissingRules { .. }));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_nested_rules_element_is_not_the_container() {
        let xml = "<ItemFilter><meta><rules><Rule/></rules></meta></ItemFilter>";
        assert!(matches!(
            Document::parse_str("f.xml", xml),
            Err(RuleOrderError::MissingRules { .. })
        ));
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        for xml in [
            "<ItemFilter><rules><Rule></rules></ItemFilter>",
            "<ItemFilter><rules></rules>",
            "",
            "<a/><b/>",
        ] {
            let err = Document::parse_str("f.xml", xml).unwrap_err();
            assert!(err.is_parse_error(), "{xml:?} gave {err:?}");
        }
    }

    #[test]
    fn test_latin1_file_keeps_its_encoding() {
        let text = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<F>\n  <rules>\n    <Rule><nameOverride>Épées</nameOverride></Rule>\n    <Rule><nameOverride>Bâtons</nameOverride></Rule>\n  </rules>\n</F>\n";
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(text);
        assert!(bytes.contains(&0xC9));

        let mut document = Document::parse_bytes("f.xml", &bytes).unwrap();
        assert_eq!(names(&document), vec!["Bâtons", "Épées"]);
        assert_eq!(document.to_bytes(), bytes.as_ref());

        document.swap(0, 1).unwrap();
        let xml = document.to_xml_string();
        let (reordered, _, _) = encoding_rs::WINDOWS_1252.encode(&xml);
        assert_eq!(document.to_bytes(), reordered.as_ref());
        assert!(std::str::from_utf8(&document.to_bytes()).is_err());
    }

    #[test]
    fn test_foreign_rule_in_latin1_file_becomes_character_reference() {
        let text = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><F><rules></rules></F>";
        let mut document = Document::parse_bytes("f.xml", text.as_bytes()).unwrap();
        document.insert(rule("Ψ"), 0);
        let saved = String::from_utf8(document.to_bytes()).unwrap();
        assert!(saved.contains("<nameOverride>&#936;</nameOverride>"));
    }

    #[test]
    fn test_utf16_with_bom_round_trips() {
        let text = "<?xml version=\"1.0\" encoding=\"utf-16\"?>\r\n<F><rules><Rule><nameOverride>A</nameOverride></Rule></rules></F>";
        let mut bytes = UTF16LE_BOM.to_vec();
        bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));

        let document = Document::parse_bytes("f.xml", &bytes).unwrap();
        assert_eq!(document.encoding(), UTF_16LE);
        assert_eq!(names(&document), vec!["A"]);
        assert_eq!(document.to_bytes(), bytes);
    }

    #[test]
    fn test_unknown_encoding_label_is_rejected() {
        let xml = r#"<?xml version="1.0" encoding="klingon"?><F><rules/></F>"#;
        let err = Document::parse_bytes("f.xml", xml.as_bytes()).unwrap_err();
        assert!(matches!(err, RuleOrderError::UnsupportedEncoding { .. }));
        assert!(Document::parse_str("f.xml", xml).is_err());
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let err = Document::parse_bytes("f.xml", b"<F><rules>\xC3</rules></F>").unwrap_err();
        assert!(matches!(err, RuleOrderError::Parse { .. }));
    }

    #[test]
    fn test_rule_at_and_display_name() {
        let xml = "<F><rules><Rule><nameOverride> B </nameOverride></Rule><Rule/></rules></F>";
        let document = Document::parse_str("f.xml", xml).unwrap();

        let first = document.rule_at(0).unwrap();
        assert!(first.same_as(&document.rules()[0]));
        assert_eq!(Document::display_name(first), "(no name)");
        assert_eq!(Document::display_name(document.rule_at(1).unwrap()), "B");
        assert!(document.rule_at(2).is_none());
    }

    #[test]
    fn test_missing_declaration_is_added() {
        let document = Document::parse_str("f.xml", "<F>\n  <rules>\n    <Rule/>\n  </rules>\n</F>").unwrap();
        let xml = document.to_xml_string();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.ends_with("<F>\n  <rules>\n    <Rule/>\n  </rules>\n</F>"));
    }

    #[test]
    fn test_bom_and_crlf_survive() {
        let text = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n<F>\r\n  <rules>\r\n    <Rule><nameOverride>A</nameOverride></Rule>\r\n    <Rule><nameOverride>B</nameOverride></Rule>\r\n  </rules>\r\n</F>\r\n";
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(text.as_bytes());

        let document = Document::parse_bytes("f.xml", &bytes).unwrap();
        assert_eq!(document.to_bytes(), bytes);
    }

    #[test]
    fn test_empty_container_gains_indented_rules() {
        let mut document = Document::parse_str("f.xml", "<F>\n  <rules />\n</F>").unwrap();
        assert_eq!(document.rule_count(), 0);
        assert!(document.to_xml_string().ends_with("<F>\n  <rules />\n</F>"));

        document.insert(rule("A"), 0);
        assert!(document.to_xml_string().ends_with(
            "<F>\n  <rules>\n    <Rule><nameOverride>A</nameOverride></Rule>\n  </rules>\n</F>"
        ));
    }

    #[test]
    fn test_removing_every_rule_keeps_container() {
        let mut document = Document::parse_str("sample.xml", SAMPLE).unwrap();
        while document.rule_count() > 0 {
            document.remove(0).unwrap();
        }
        let xml = document.to_xml_string();
        assert!(xml.contains("  <rules>\n  </rules>\n</ItemFilter>"));
        assert!(Document::parse_str("sample.xml", &xml).unwrap().rules().is_empty());
    }

    #[test]
    fn test_non_rule_children_are_dropped() {
        let xml = "<F><rules><!-- note --><Rule><nameOverride>A</nameOverride></Rule><Other/>text</rules></F>";
        let document = Document::parse_str("f.xml", xml).unwrap();
        assert_eq!(names(&document), vec!["A"]);
        assert!(!document.to_xml_string().contains("Other"));
        assert!(!document.to_xml_string().contains("note"));
    }

    #[test]
    fn test_rules_attributes_and_surroundings_are_preserved() {
        let xml = "<?xml version=\"1.0\"?>\n<F a=\"1\"><name>N</name><rules kind=\"loot\"><Rule>x</Rule><Rule>y</Rule></rules><tail/></F>";
        let document = Document::parse_str("f.xml", xml).unwrap();
        assert_eq!(document.to_xml_string(), xml);
    }
}
