//! Filter engine.
//!
//! Narrows a record set through four stages, in order: free-text search,
//! type facet, institution facet, date range. Inactive stages pass records
//! through. Facet categories combine with AND; values inside one facet
//! combine with OR.

use std::collections::BTreeSet;

use crate::models::{FacetOptions, FilterCriteria, Record};

/// Apply `criteria` to `records`, preserving order.
pub fn filter_records(records: &[Record], criteria: &FilterCriteria) -> Vec<Record> {
    let mut matched: Vec<&Record> = records.iter().collect();

    let term = criteria.search_term.trim().to_lowercase();
    if !term.is_empty() {
        matched.retain(|r| r.contains_text(&term));
    }

    if !criteria.types.is_empty() {
        matched.retain(|r| r.types().iter().any(|t| criteria.types.contains(t)));
    }

    if !criteria.institutions.is_empty() {
        matched.retain(|r| criteria.institutions.contains(r.provider_name()));
    }

    if let Some(key) = criteria.date_range {
        let range = key.range();
        matched.retain(|r| r.year().is_some_and(|year| range.contains(year)));
    }

    matched.into_iter().cloned().collect()
}

/// Distinct, sorted type and institution values across `records`.
pub fn facet_options(records: &[Record]) -> FacetOptions {
    let mut types = BTreeSet::new();
    let mut institutions = BTreeSet::new();

    for record in records {
        types.extend(
            record
                .types()
                .iter()
                .filter(|t| !t.trim().is_empty())
                .cloned(),
        );
        institutions.insert(record.provider_name().to_string());
    }

    FacetOptions {
        types: types.into_iter().collect(),
        institutions: institutions.into_iter().collect(),
    }
}
