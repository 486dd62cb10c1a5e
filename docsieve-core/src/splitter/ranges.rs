use crate::types::{BoundaryRecord, DocumentRange};

/// Turn boundary records into half-open page ranges.
///
/// Range k runs from record k to record k+1; the last one runs to
/// `total_pages`. Records are expected in strictly increasing page order
/// starting at 0, in which case the ranges exactly cover every page.
/// Records at or past `total_pages` produce no range.
pub fn compute_ranges(records: &[BoundaryRecord], total_pages: usize) -> Vec<DocumentRange> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.page < total_pages)
        .map(|(i, record)| {
            let end = records
                .get(i + 1)
                .map(|next| next.page.min(total_pages))
                .unwrap_or(total_pages);
            DocumentRange {
                sequence: i + 1,
                label: record.label.clone(),
                start: record.page,
                end,
            }
        })
        .collect()
}
