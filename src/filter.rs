use std::collections::BTreeSet;

use crate::types::{CourseRecord, FilterOptions, FilterSpec, TableFilter};

/// Sorted distinct categorical values and the observed start-date span.
pub fn filter_options(records: &[CourseRecord]) -> FilterOptions {
    let distinct = |pick: fn(&CourseRecord) -> &str| -> Vec<String> {
        records
            .iter()
            .map(|r| pick(r).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };
    let dates = records.iter().filter_map(|r| r.start_date);
    let date_span = dates.clone().min().zip(dates.max());
    FilterOptions {
        companies: distinct(|r| r.company.as_str()),
        modalities: distinct(|r| r.modality.as_str()),
        statuses: distinct(|r| r.status.as_str()),
        date_span,
    }
}

/// Everything selected, full observed date span.
///
/// With no resolvable date at all the date predicate stays off; otherwise
/// undated records drop out of the default view.
pub fn default_spec(options: &FilterOptions) -> FilterSpec {
    FilterSpec::default()
        .with_companies(options.companies.iter().cloned())
        .with_modalities(options.modalities.iter().cloned())
        .with_statuses(options.statuses.iter().cloned())
        .with_date_range(options.date_span)
}

pub fn matches(record: &CourseRecord, spec: &FilterSpec) -> bool {
    if !spec.companies.contains(&record.company)
        || !spec.modalities.contains(&record.modality)
        || !spec.statuses.contains(&record.status)
    {
        return false;
    }
    if let Some((from, to)) = spec.date_range {
        match record.start_date {
            Some(d) if from <= d && d <= to => {}
            _ => return false,
        }
    }
    matches_query(record, &spec.query)
}

/// The records selected by `spec`, in input order.
pub fn apply_filter<'a>(records: &'a [CourseRecord], spec: &FilterSpec) -> Vec<&'a CourseRecord> {
    records.iter().filter(|r| matches(r, spec)).collect()
}

/// Drill down to one company; `None` keeps every company.
pub fn for_company<'a>(subset: &[&'a CourseRecord], company: Option<&str>) -> Vec<&'a CourseRecord> {
    match company {
        Some(c) => subset.iter().copied().filter(|r| r.company == c).collect(),
        None => subset.to_vec(),
    }
}

/// Secondary narrowing used by the course table.
pub fn apply_table_filter<'a>(
    subset: &[&'a CourseRecord],
    filter: &TableFilter,
) -> Vec<&'a CourseRecord> {
    subset
        .iter()
        .copied()
        .filter(|r| filter.statuses.contains(&r.status) && matches_query(r, &filter.query))
        .collect()
}

// Case-insensitive substring over course, company and instructor.
fn matches_query(record: &CourseRecord, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [&record.course, &record.company, &record.instructor]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
}
