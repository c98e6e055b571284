//! Display helpers shared by front ends.

use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime};

/// Renders an RFC 3339 timestamp as `January 5, 2024, 3:07 PM`.
///
/// The wall clock of the timestamp's own offset is used. Values that do not
/// parse are returned unchanged so a bad timestamp never hides a row.
pub fn format_timestamp(raw: &str) -> String {
    let format = format_description!(
        "[month repr:long] [day padding:none], [year], [hour repr:12 padding:none]:[minute] [period]"
    );

    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|parsed| parsed.format(&format).ok())
        .unwrap_or_else(|| raw.to_string())
}
