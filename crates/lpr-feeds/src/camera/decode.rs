//! Plate feed document decoding.
//!
//! The camera answers with a document shaped like
//!
//! ```xml
//! <Plates xmlns="http://www.hikvision.com/ver20/XMLSchema">
//!   <Plate>
//!     <captureTime>20250415T093000-500</captureTime>
//!     <plateNumber>PBX-1234</plateNumber>
//!     <country>EC</country>
//!   </Plate>
//! </Plates>
//! ```
//!
//! The namespace differs between firmware versions and is sometimes absent,
//! so it is read from the root element and applied to every lookup.

use super::FeedError;
use chrono::{DateTime, FixedOffset};
use lpr_core::DetectionRecord;
use regex::Regex;
use roxmltree::{Document, Node};
use std::sync::OnceLock;

const PLATE_TAG: &str = "Plate";
const PLATE_NUMBER_TAG: &str = "plateNumber";
const CAPTURE_TIME_TAG: &str = "captureTime";
const COUNTRY_TAG: &str = "country";

/// Decode a feed document into records, newest first.
///
/// Entries without plate or time text, with an unparseable time, or with a
/// sentinel plate are skipped. Only a document that is not well-formed XML
/// is an error.
pub fn decode_plates(body: &str) -> Result<Vec<DetectionRecord>, FeedError> {
    let doc = Document::parse(body).map_err(|e| FeedError::Decode(e.to_string()))?;
    let root = doc.root_element();
    let ns = root.tag_name().namespace();

    let mut records: Vec<DetectionRecord> = root
        .descendants()
        .filter(|n| is_element(n, ns, PLATE_TAG))
        .filter_map(|entry| decode_entry(entry, ns))
        .collect();

    records.sort_by(|a, b| b.captured_at().cmp(&a.captured_at()));
    Ok(records)
}

fn decode_entry(entry: Node<'_, '_>, ns: Option<&str>) -> Option<DetectionRecord> {
    let plate = child_text(entry, ns, PLATE_NUMBER_TAG)?;
    let time = child_text(entry, ns, CAPTURE_TIME_TAG)?;

    let Some(captured_at) = parse_capture_time(time) else {
        tracing::debug!(time, "skipping plate entry with unparseable capture time");
        return None;
    };

    let country = child_text(entry, ns, COUNTRY_TAG).map(str::to_string);
    DetectionRecord::new(plate, captured_at, country)
}

fn is_element(node: &Node<'_, '_>, ns: Option<&str>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == ns
}

/// Text of the first direct child `name`, trimmed. Empty text counts as
/// missing.
fn child_text<'a>(node: Node<'a, '_>, ns: Option<&str>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|c| is_element(c, ns, name))
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn offset_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<body>.+?)(?P<sign>[+-])(?P<hh>\d{1,2}):?(?P<mm>\d{2})$")
            .expect("offset regex must compile")
    })
}

/// Parse a camera capture timestamp.
///
/// Accepts the compact `YYYYMMDDTHHMMSS±HHMM` form, the 3-digit offset some
/// firmware emits (`-500` for `-05:00`), extended forms with `-`/`:`
/// separators, and a trailing `Z`.
pub fn parse_capture_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let (body, offset) = match raw.strip_suffix('Z') {
        Some(body) => (body.to_string(), "+0000".to_string()),
        None => {
            let caps = offset_suffix().captures(raw)?;
            let offset = format!("{}{:0>2}{}", &caps["sign"], &caps["hh"], &caps["mm"]);
            (caps["body"].to_string(), offset)
        }
    };

    let compact: String = body.chars().filter(|c| *c != '-' && *c != ':').collect();
    DateTime::parse_from_str(&format!("{compact}{offset}"), "%Y%m%dT%H%M%S%z").ok()
}
