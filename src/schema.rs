//! Header normalization and alias resolution.
//!
//! Everything here is table-driven: adding a new spelling of a column means
//! adding a row to `HEADER_ALIASES`, not a new branch.
use std::collections::HashSet;

use tracing::warn;

use crate::types::CanonicalField;

/// Normalized header text -> canonical field.
pub const HEADER_ALIASES: &[(&str, CanonicalField)] = &[
    ("empresa", CanonicalField::Company),
    ("curso", CanonicalField::Course),
    ("nombre del curso", CanonicalField::Course),
    ("horas", CanonicalField::Hours),
    ("fecha", CanonicalField::Date),
    ("modalidad", CanonicalField::Modality),
    ("estado", CanonicalField::Status),
    ("docente", CanonicalField::Instructor),
    ("cantidad de participantes", CanonicalField::Participants),
    ("participantes", CanonicalField::Participants),
    ("aprobados", CanonicalField::Passed),
    ("desaprobados", CanonicalField::Failed),
    ("encuestas", CanonicalField::Survey),
    ("company", CanonicalField::Company),
    ("course", CanonicalField::Course),
    ("hours", CanonicalField::Hours),
    ("date", CanonicalField::Date),
    ("modality", CanonicalField::Modality),
    ("status", CanonicalField::Status),
    ("instructor", CanonicalField::Instructor),
    ("participants", CanonicalField::Participants),
    ("passed", CanonicalField::Passed),
    ("failed", CanonicalField::Failed),
    ("survey", CanonicalField::Survey),
];

const ACCENT_FOLDS: &[(char, char)] = &[('á', 'a'), ('é', 'e'), ('í', 'i'), ('ó', 'o'), ('ú', 'u')];

/// Collapse whitespace (newlines included), lowercase and fold accented vowels.
pub fn normalize_header(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .to_lowercase()
        .chars()
        .map(|c| {
            ACCENT_FOLDS
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

pub fn canonical_field(normalized: &str) -> Option<CanonicalField> {
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, field)| *field)
}

/// Title-case a header: a letter is uppercased when it does not follow
/// another letter, and lowercased otherwise.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// What a source column turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Canonical(CanonicalField),
    /// Index into `HeaderMap::extra_columns`.
    Passthrough(usize),
    /// A later duplicate of a canonical column.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    pub roles: Vec<ColumnRole>,
    pub extra_columns: Vec<String>,
}

impl HeaderMap {
    pub fn recognized(&self) -> usize {
        self.roles
            .iter()
            .filter(|r| matches!(r, ColumnRole::Canonical(_)))
            .count()
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        self.roles.contains(&ColumnRole::Canonical(field))
    }
}

/// Resolve every raw header to its role. The first column that maps to a
/// canonical field wins; later duplicates are ignored.
pub fn resolve_headers<'a, I>(headers: I) -> HeaderMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map = HeaderMap::default();
    let mut seen: HashSet<CanonicalField> = HashSet::new();
    for raw in headers {
        let normalized = normalize_header(raw);
        let role = match canonical_field(&normalized) {
            Some(field) if seen.insert(field) => ColumnRole::Canonical(field),
            Some(field) => {
                warn!(header = raw, field = field.header(), "duplicate column ignored");
                ColumnRole::Ignored
            }
            None => {
                map.extra_columns.push(title_case(&normalized));
                ColumnRole::Passthrough(map.extra_columns.len() - 1)
            }
        };
        map.roles.push(role);
    }
    map
}
