//! Metadata tamper heuristics.
//!
//! Every rule is evaluated on every call; a rule that fires appends its
//! reason and nothing short-circuits. Missing fields are signals, never
//! errors.
//!
//! | # | Rule                                                   |
//! |---|--------------------------------------------------------|
//! | 1 | creation and modification dates both present, unequal  |
//! | 2 | author missing or blank                                |
//! | 3 | producer missing or blank                              |
//! | 4 | any value mentions a known editing/conversion tool     |
//! | 5 | creation date later than modification date            |

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::config::TamperConfig;
use crate::types::{MetadataMap, TamperReport};

/// Signal emitted when the tamper component degraded.
pub const TAMPER_UNAVAILABLE_SIGNAL: &str = "tamper_check_unavailable";

/// Evaluates metadata for signs of post-issue editing.
#[derive(Debug, Clone)]
pub struct TamperAnalyzer {
    config: TamperConfig,
    /// Lowercased denylist, matched as substrings.
    tools_folded: Vec<String>,
}

impl Default for TamperAnalyzer {
    fn default() -> Self {
        Self::new(TamperConfig::default())
    }
}

impl TamperAnalyzer {
    /// Create an analyzer from configuration.
    pub fn new(config: TamperConfig) -> Self {
        let tools_folded = config
            .suspicious_tools
            .iter()
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            config,
            tools_folded,
        }
    }

    /// Run all rules over a metadata map.
    pub fn analyze(&self, metadata: &MetadataMap) -> TamperReport {
        let mut report = TamperReport::default();

        let created = metadata.get(&self.config.creation_field);
        let modified = metadata.get(&self.config.modification_field);

        if let (Some(c), Some(m)) = (created, modified) {
            if c != m {
                report.push("modification date differs from creation date");
            }
        }

        if metadata.non_empty(&self.config.author_field).is_none() {
            report.push("author information missing");
        }

        if metadata.non_empty(&self.config.producer_field).is_none() {
            report.push("producer information missing");
        }

        for (_, value) in metadata.iter() {
            let folded = value.to_lowercase();
            if self.tools_folded.iter().any(|t| folded.contains(t.as_str())) {
                report.push(format!("suspicious software detected in metadata: {}", value));
            }
        }

        if let (Some(c), Some(m)) = (created, modified) {
            match (parse_timestamp(c), parse_timestamp(m)) {
                (Some(c), Some(m)) if c > m => {
                    report.push("creation date later than modification date");
                },
                (Some(_), Some(_)) => {},
                _ => debug!(
                    creation = c,
                    modification = m,
                    "Unrecognized timestamp format, skipping ordering check"
                ),
            }
        }

        debug!(
            fields = metadata.len(),
            flag = report.flag,
            reasons = report.reasons.len(),
            "Tamper analysis complete"
        );
        report
    }
}

/// Parse a document timestamp.
///
/// Accepted encodings:
/// - PDF date strings: `D:YYYYMMDDHHmmSSOHH'mm'` with any trailing part omitted
/// - RFC 3339 / ISO 8601 with offset (`pdfinfo -isodates`)
/// - ISO 8601 without offset, read as UTC
/// - `pdfinfo` default output, e.g. `Fri Jan  5 10:00:00 2024 UTC`, read as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(rest) = s.strip_prefix("D:") {
        return parse_pdf_date(rest);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }
    let without_zone = s
        .strip_suffix(" UTC")
        .or_else(|| s.strip_suffix(" GMT"))
        .unwrap_or(s);
    if let Ok(naive) = NaiveDateTime::parse_from_str(without_zone, "%a %b %e %H:%M:%S %Y") {
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    if s.len() >= 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        return parse_pdf_date(s);
    }
    None
}

fn parse_pdf_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, zone) = s.split_at(digits_end);
    if digits.len() < 4 || digits.len() > 14 || digits.len() % 2 != 0 {
        return None;
    }

    let field = |start: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + 2) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month = field(4, 1)?;
    let day = field(6, 1)?;
    let hour = field(8, 0)?;
    let minute = field(10, 0)?;
    let second = field(12, 0)?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let offset = parse_pdf_offset(zone)?;
    offset.from_local_datetime(&naive).single()
}

/// Parse the `Z`, `+HH'mm'`, or `-HH'mm` suffix of a PDF date.
fn parse_pdf_offset(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    if zone.is_empty() || zone == "Z" || zone.starts_with("Z0") {
        return FixedOffset::east_opt(0);
    }
    let sign = match zone.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
