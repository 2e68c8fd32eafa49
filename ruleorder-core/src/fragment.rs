//! Rule fragments
//!
//! A `RuleFragment` is one `<Rule>` element kept as the exact text it had in
//! the source file. The editor never looks inside it apart from the
//! `nameOverride` child used for the row label, so unmoved rules are written
//! back untouched.

use crate::error::{Result, RuleOrderError};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use std::sync::Arc;

pub const RULE_TAG: &[u8] = b"Rule";
pub const NAME_OVERRIDE_TAG: &[u8] = b"nameOverride";

/// Label shown for rules without a usable `nameOverride`
pub const NO_NAME_PLACEHOLDER: &str = "(no name)";

/// Immutable handle to one `<Rule>` element.
///
/// Clones share the underlying text, which gives fragments reference
/// identity within a session (`same_as`). Equality compares content.
#[derive(Clone)]
pub struct RuleFragment {
    xml: Arc<str>,
    name: Option<String>,
}

impl RuleFragment {
    /// Wrap a span the document parser already validated
    pub(crate) fn from_source(xml: &str) -> Self {
        Self {
            name: extract_name_override(xml),
            xml: Arc::from(xml),
        }
    }

    /// Rebuild a fragment from its serialized form (a drag payload).
    ///
    /// The text must be exactly one well-formed `Rule` element, optionally
    /// surrounded by whitespace.
    pub fn from_xml(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        validate_single_rule(trimmed)?;
        Ok(Self::from_source(trimmed))
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// The trimmed `nameOverride` text, if present and non-empty
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(NO_NAME_PLACEHOLDER)
    }

    /// Reference identity: true only for clones of the same fragment
    pub fn same_as(&self, other: &RuleFragment) -> bool {
        Arc::ptr_eq(&self.xml, &other.xml)
    }
}

impl PartialEq for RuleFragment {
    fn eq(&self, other: &Self) -> bool {
        self.xml == other.xml
    }
}

impl Eq for RuleFragment {}

impl fmt::Debug for RuleFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleFragment")
            .field("name", &self.display_name())
            .field("len", &self.xml.len())
            .finish()
    }
}

fn validate_single_rule(text: &str) -> Result<()> {
    const PAYLOAD: &str = "<rule payload>";

    let mut reader = Reader::from_str(text);
    let mut seen_rule = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if !seen_rule && e.name().as_ref() == RULE_TAG => {
                reader
                    .read_to_end(e.name())
                    .map_err(|err| RuleOrderError::parse(PAYLOAD, err))?;
                seen_rule = true;
            }
            Ok(Event::Empty(e)) if !seen_rule && e.name().as_ref() == RULE_TAG => {
                seen_rule = true;
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Err(RuleOrderError::parse(
                    PAYLOAD,
                    format!(
                        "expected a single <Rule> element, found <{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ),
                ));
            }
            Ok(Event::Text(t)) if t.iter().all(u8::is_ascii_whitespace) => {}
            Ok(Event::Eof) => break,
            Ok(other) => {
                return Err(RuleOrderError::parse(
                    PAYLOAD,
                    format!("unexpected content outside <Rule>: {other:?}"),
                ));
            }
            Err(err) => {
                return Err(RuleOrderError::parse(
                    PAYLOAD,
                    format!("XML error at position {}: {err}", reader.buffer_position()),
                ));
            }
        }
    }

    if seen_rule {
        Ok(())
    } else {
        Err(RuleOrderError::parse(PAYLOAD, "no <Rule> element found"))
    }
}

/// Read the direct `nameOverride` child of a `Rule` element
fn extract_name_override(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut collecting = false;
    let mut name = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                if depth == 2 && e.name().as_ref() == NAME_OVERRIDE_TAG {
                    collecting = true;
                }
            }
            Ok(Event::End(_)) => {
                if collecting && depth == 2 {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) if collecting => {
                let text = t.unescape().ok()?;
                name.push_str(&text);
            }
            Ok(Event::CData(c)) if collecting => {
                name.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }

    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
