//! Command-line and environment configuration.
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;

use crate::store::Snapshot;
use crate::types::{CourseRecord, FilterSpec, TableFilter};

/// Training course report: load a course table, filter it and export KPIs.
#[derive(Parser, Debug, Clone)]
#[command(name = "course_report", version)]
pub struct Config {
    /// Path or http(s) URL of the CSV export.
    #[arg(long, env = "COURSES_SOURCE", default_value = "cursos.csv")]
    pub source: String,

    /// Seconds before a loaded snapshot is re-fetched.
    #[arg(long, env = "COURSES_TTL_SECS", default_value_t = 300)]
    pub ttl_secs: u64,

    /// Timeout for fetching the CSV over HTTP.
    #[arg(long, env = "COURSES_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Directory for CSV and JSON exports.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// How many instructors to rank.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Companies to keep (repeatable). Default: all.
    #[arg(long)]
    pub company: Vec<String>,

    /// Modalities to keep (repeatable). Default: all.
    #[arg(long)]
    pub modality: Vec<String>,

    /// Statuses to keep (repeatable). Default: all.
    #[arg(long)]
    pub status: Vec<String>,

    /// First start date to keep (YYYY-MM-DD). Default: earliest observed.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last start date to keep (YYYY-MM-DD). Default: latest observed.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Search text over course, company and instructor.
    #[arg(long, default_value = "")]
    pub query: String,

    /// Statuses shown in the course table (repeatable). Default: all.
    #[arg(long)]
    pub table_status: Vec<String>,

    /// Search text applied to the course table only.
    #[arg(long, default_value = "")]
    pub table_query: String,

    /// Restrict the instructor ranking to one company.
    #[arg(long)]
    pub focus_company: Option<String>,

    /// Load, write every report once and exit instead of showing the menu.
    #[arg(long)]
    pub batch: bool,
}

impl Config {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// The snapshot's default view, narrowed by whatever flags were given.
    pub fn filter_spec(&self, snapshot: &Snapshot) -> FilterSpec {
        let mut spec = snapshot.default_filter().with_query(self.query.clone());
        if !self.company.is_empty() {
            spec = spec.with_companies(self.company.iter().cloned());
        }
        if !self.modality.is_empty() {
            spec = spec.with_modalities(self.modality.iter().cloned());
        }
        if !self.status.is_empty() {
            spec = spec.with_statuses(self.status.iter().cloned());
        }
        if self.from.is_some() || self.to.is_some() {
            let (lo, hi) = spec.date_range.unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
            spec = spec.with_date_range(Some((self.from.unwrap_or(lo), self.to.unwrap_or(hi))));
        }
        spec
    }

    /// Course-table narrowing; statuses default to those in `primary`.
    pub fn table_filter(&self, primary: &[&CourseRecord]) -> TableFilter {
        let statuses: BTreeSet<String> = if self.table_status.is_empty() {
            primary.iter().map(|r| r.status.clone()).collect()
        } else {
            self.table_status.iter().cloned().collect()
        };
        TableFilter {
            statuses,
            query: self.table_query.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadReport;
    use chrono::Utc;

    fn snapshot() -> Snapshot {
        let rec = |company: &str, status: &str, day: u32| CourseRecord {
            company: company.to_string(),
            status: status.to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, day),
            ..CourseRecord::default()
        };
        Snapshot {
            records: vec![rec("Acme", "Ejecutado", 5), rec("Beta", "En proceso", 20)],
            extra_columns: Vec::new(),
            report: LoadReport::default(),
            loaded_at: Utc::now(),
        }
    }

    #[test]
    fn defaults_select_everything() {
        let config = Config::parse_from(["course_report"]);
        assert_eq!(config.ttl(), Duration::from_secs(300));
        let snap = snapshot();
        assert_eq!(config.filter_spec(&snap), snap.default_filter());
    }

    #[test]
    fn flags_narrow_the_default_view() {
        let config = Config::parse_from([
            "course_report",
            "--company",
            "Acme",
            "--from",
            "2024-01-10",
            "--query",
            "excel",
        ]);
        let spec = config.filter_spec(&snapshot());
        assert_eq!(spec.companies.len(), 1);
        assert_eq!(spec.statuses.len(), 2);
        assert_eq!(
            spec.date_range,
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()
            ))
        );
        assert_eq!(spec.query, "excel");
    }

    #[test]
    fn table_filter_defaults_to_statuses_in_view() {
        let config = Config::parse_from(["course_report", "--table-query", "soldadura"]);
        let snap = snapshot();
        let primary: Vec<&CourseRecord> = snap.records.iter().take(1).collect();
        let table = config.table_filter(&primary);
        assert_eq!(table.statuses.into_iter().collect::<Vec<_>>(), vec!["Ejecutado"]);
        assert_eq!(table.query, "soldadura");
    }
}
