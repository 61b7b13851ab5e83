use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tabled::Tabled;

use crate::util::{display_opt_pct, display_pct};

/// The fixed field set every ingested table is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Company,
    Course,
    Instructor,
    Modality,
    Hours,
    Date,
    Status,
    Participants,
    Passed,
    Failed,
    Survey,
}

impl CanonicalField {
    /// Column order used when exporting records.
    pub const EXPORT_ORDER: [CanonicalField; 11] = [
        CanonicalField::Company,
        CanonicalField::Course,
        CanonicalField::Instructor,
        CanonicalField::Modality,
        CanonicalField::Hours,
        CanonicalField::Date,
        CanonicalField::Status,
        CanonicalField::Participants,
        CanonicalField::Passed,
        CanonicalField::Failed,
        CanonicalField::Survey,
    ];

    pub fn header(self) -> &'static str {
        match self {
            CanonicalField::Company => "Empresa",
            CanonicalField::Course => "Curso",
            CanonicalField::Instructor => "Docente",
            CanonicalField::Modality => "Modalidad",
            CanonicalField::Hours => "Horas",
            CanonicalField::Date => "Fecha",
            CanonicalField::Status => "Estado",
            CanonicalField::Participants => "Participantes",
            CanonicalField::Passed => "Aprobados",
            CanonicalField::Failed => "Desaprobados",
            CanonicalField::Survey => "Encuestas",
        }
    }
}

/// One normalized row of the course table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseRecord {
    pub company: String,
    pub course: String,
    pub instructor: String,
    pub modality: String,
    pub status: String,
    pub hours: u32,
    pub participants: u32,
    pub passed: u32,
    pub failed: u32,
    pub date_text: String,
    pub start_date: Option<NaiveDate>,
    pub survey_text: String,
    pub survey_score: Option<f64>,
    /// Values of passthrough columns, aligned with `Snapshot::extra_columns`.
    pub extra: Vec<String>,
}

impl CourseRecord {
    /// Pass rate in percent; `None` when nobody took the course.
    pub fn pass_rate_pct(&self) -> Option<f64> {
        if self.participants == 0 {
            None
        } else {
            Some(self.passed as f64 * 100.0 / self.participants as f64)
        }
    }

    /// Text representation of a canonical field, as written on export.
    pub fn field_text(&self, field: CanonicalField) -> String {
        match field {
            CanonicalField::Company => self.company.clone(),
            CanonicalField::Course => self.course.clone(),
            CanonicalField::Instructor => self.instructor.clone(),
            CanonicalField::Modality => self.modality.clone(),
            CanonicalField::Hours => self.hours.to_string(),
            CanonicalField::Date => self.date_text.clone(),
            CanonicalField::Status => self.status.clone(),
            CanonicalField::Participants => self.participants.to_string(),
            CanonicalField::Passed => self.passed.to_string(),
            CanonicalField::Failed => self.failed.to_string(),
            CanonicalField::Survey => self.survey_text.clone(),
        }
    }
}

/// Which records belong to a view. Built fresh for every interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub companies: BTreeSet<String>,
    pub modalities: BTreeSet<String>,
    pub statuses: BTreeSet<String>,
    /// Inclusive range over `start_date`. `None` disables the date predicate.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub query: String,
}

impl FilterSpec {
    pub fn with_companies<I, S>(mut self, companies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.companies = companies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_modalities<I, S>(mut self, modalities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modalities = modalities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_range(mut self, range: Option<(NaiveDate, NaiveDate)>) -> Self {
        self.date_range = range;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

/// Secondary narrowing applied to the course table only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    pub statuses: BTreeSet<String>,
    pub query: String,
}

/// Sorted distinct values present in a snapshot; seeds the default view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOptions {
    pub companies: Vec<String>,
    pub modalities: Vec<String>,
    pub statuses: Vec<String>,
    pub date_span: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub course_count: usize,
    pub participant_total: u64,
    pub hours_total: u64,
    pub pass_rate_pct: f64,
    pub avg_participants_per_course: f64,
    pub modalities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CompanySummaryRow {
    #[serde(rename = "Empresa")]
    #[tabled(rename = "Empresa")]
    pub company: String,
    #[serde(rename = "Cursos")]
    #[tabled(rename = "Cursos")]
    pub courses: usize,
    #[serde(rename = "Participantes")]
    #[tabled(rename = "Participantes")]
    pub participants: u64,
    #[serde(rename = "Aprobados")]
    #[tabled(rename = "Aprobados")]
    pub passed: u64,
    #[serde(rename = "Desaprobados")]
    #[tabled(rename = "Desaprobados")]
    pub failed: u64,
    #[serde(rename = "Horas")]
    #[tabled(rename = "Horas")]
    pub hours: u64,
    #[serde(rename = "Tasa_%")]
    #[tabled(rename = "Tasa_%", display_with = "display_opt_pct")]
    pub pass_rate_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CompanyRateRow {
    #[serde(rename = "Empresa")]
    #[tabled(rename = "Empresa")]
    pub company: String,
    #[serde(rename = "Participantes")]
    #[tabled(rename = "Participantes")]
    pub participants: u64,
    #[serde(rename = "Aprobados")]
    #[tabled(rename = "Aprobados")]
    pub passed: u64,
    #[serde(rename = "Tasa_%")]
    #[tabled(rename = "Tasa_%", display_with = "display_pct")]
    pub pass_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CompanyCountRow {
    #[serde(rename = "Empresa")]
    #[tabled(rename = "Empresa")]
    pub company: String,
    #[serde(rename = "Cursos")]
    #[tabled(rename = "Cursos")]
    pub courses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct InstructorRow {
    #[serde(rename = "Docente")]
    #[tabled(rename = "Docente")]
    pub instructor: String,
    #[serde(rename = "Participantes")]
    #[tabled(rename = "Participantes")]
    pub participants: u64,
    #[serde(rename = "Aprobados")]
    #[tabled(rename = "Aprobados")]
    pub passed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CompanySurveyRow {
    #[serde(rename = "Empresa")]
    #[tabled(rename = "Empresa")]
    pub company: String,
    #[serde(rename = "Respuestas")]
    #[tabled(rename = "Respuestas")]
    pub responses: usize,
    #[serde(rename = "Encuesta_%")]
    #[tabled(rename = "Encuesta_%", display_with = "display_pct")]
    pub avg_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveySummary {
    /// Mean of the valid survey values; 0 when `no_data` is set.
    pub overall_avg_pct: f64,
    pub valid_responses: usize,
    pub no_data: bool,
    pub per_company: Vec<CompanySurveyRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub executed: usize,
    pub in_progress: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct CourseTableRow {
    #[serde(rename = "Empresa")]
    #[tabled(rename = "Empresa")]
    pub company: String,
    #[serde(rename = "Curso")]
    #[tabled(rename = "Curso")]
    pub course: String,
    #[serde(rename = "Docente")]
    #[tabled(rename = "Docente")]
    pub instructor: String,
    #[serde(rename = "Modalidad")]
    #[tabled(rename = "Modalidad")]
    pub modality: String,
    #[serde(rename = "Horas")]
    #[tabled(rename = "Horas")]
    pub hours: u32,
    #[serde(rename = "Fecha")]
    #[tabled(rename = "Fecha")]
    pub date_text: String,
    #[serde(rename = "Estado")]
    #[tabled(rename = "Estado")]
    pub status: String,
    #[serde(rename = "Participantes")]
    #[tabled(rename = "Participantes")]
    pub participants: u32,
    #[serde(rename = "Aprobados")]
    #[tabled(rename = "Aprobados")]
    pub passed: u32,
    #[serde(rename = "Desaprobados")]
    #[tabled(rename = "Desaprobados")]
    pub failed: u32,
    #[serde(rename = "Tasa_%")]
    #[tabled(rename = "Tasa_%", display_with = "display_opt_pct")]
    pub pass_rate_pct: Option<f64>,
}

/// Top-line numbers written to `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub loaded_at: String,
    pub records_total: usize,
    pub records_filtered: usize,
    pub kpis: Kpis,
    pub status_counts: StatusCounts,
    pub survey_avg_pct: f64,
    pub survey_no_data: bool,
}
