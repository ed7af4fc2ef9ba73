//! Plain-text rendering of preview records

use crate::types::PreviewRecord;

/// Text shown when there is nothing to render
pub const EMPTY_PREVIEW: &str = "No preview available yet.";

/// Render preview records as pretty-printed JSON separated by blank lines
///
/// Order is preserved. An empty slice renders [`EMPTY_PREVIEW`].
#[must_use]
pub fn render(records: &[PreviewRecord]) -> String {
    if records.is_empty() {
        return EMPTY_PREVIEW.to_string();
    }

    records
        .iter()
        .map(|record| serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
