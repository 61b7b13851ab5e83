use crate::store::Snapshot;
use crate::types::{
    CompanyCountRow, CompanyRateRow, CompanySummaryRow, CompanySurveyRow, CourseRecord,
    CourseTableRow, InstructorRow, Kpis, StatusCounts, SummaryStats, SurveySummary,
};
use crate::util::{average, rate_pct, round1};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Status value counted as finished.
pub const STATUS_EXECUTED: &str = "Ejecutado";
/// Lowercase fragment that marks a course still running.
pub const STATUS_IN_PROGRESS_FRAGMENT: &str = "proceso";

/// Group records by a text key, keeping groups in first-appearance order.
fn group_in_order<'a>(
    subset: &[&'a CourseRecord],
    key: impl Fn(&CourseRecord) -> &str,
) -> Vec<(String, Vec<&'a CourseRecord>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a CourseRecord>)> = Vec::new();
    for &r in subset {
        let k = key(r);
        match index.get(k) {
            Some(&i) => groups[i].1.push(r),
            None => {
                index.insert(k.to_string(), groups.len());
                groups.push((k.to_string(), vec![r]));
            }
        }
    }
    groups
}

/// Totals that only count records with at least one participant.
#[derive(Default)]
struct RateAcc {
    passed: u64,
    participants: u64,
}

impl RateAcc {
    fn add(&mut self, r: &CourseRecord) {
        if r.participants > 0 {
            self.passed += r.passed as u64;
            self.participants += r.participants as u64;
        }
    }

    fn rate(&self) -> Option<f64> {
        rate_pct(self.passed, self.participants)
    }
}

fn by_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

pub fn kpis(subset: &[&CourseRecord]) -> Kpis {
    // Blank names count as a value.
    let courses: BTreeSet<&str> = subset.iter().map(|r| r.course.as_str()).collect();
    let modalities: BTreeSet<&str> = subset.iter().map(|r| r.modality.as_str()).collect();
    let participant_total: u64 = subset.iter().map(|r| r.participants as u64).sum();
    let hours_total: u64 = subset.iter().map(|r| r.hours as u64).sum();
    let mut rate = RateAcc::default();
    for r in subset {
        rate.add(r);
    }
    let course_count = courses.len();
    Kpis {
        course_count,
        participant_total,
        hours_total,
        pass_rate_pct: rate.rate().unwrap_or(0.0),
        avg_participants_per_course: if course_count == 0 {
            0.0
        } else {
            participant_total as f64 / course_count as f64
        },
        modalities: modalities.into_iter().map(str::to_string).collect(),
    }
}

/// Per-company totals, largest audience first.
pub fn group_by_company(subset: &[&CourseRecord]) -> Vec<CompanySummaryRow> {
    let mut rows: Vec<CompanySummaryRow> = group_in_order(subset, |r| r.company.as_str())
        .into_iter()
        .map(|(company, records)| {
            let mut rate = RateAcc::default();
            for r in &records {
                rate.add(r);
            }
            CompanySummaryRow {
                company,
                courses: records.len(),
                participants: records.iter().map(|r| r.participants as u64).sum(),
                passed: records.iter().map(|r| r.passed as u64).sum(),
                failed: records.iter().map(|r| r.failed as u64).sum(),
                hours: records.iter().map(|r| r.hours as u64).sum(),
                pass_rate_pct: rate.rate().map(round1),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.participants
            .cmp(&a.participants)
            .then_with(|| a.company.cmp(&b.company))
    });
    rows
}

/// Pass rate per company, best first. Companies without a single
/// participant have no rate and are left out.
pub fn pass_rate_by_company(subset: &[&CourseRecord]) -> Vec<CompanyRateRow> {
    let mut rows: Vec<CompanyRateRow> = group_in_order(subset, |r| r.company.as_str())
        .into_iter()
        .filter_map(|(company, records)| {
            let mut acc = RateAcc::default();
            for r in &records {
                acc.add(r);
            }
            let rate = acc.rate()?;
            Some(CompanyRateRow {
                company,
                participants: acc.participants,
                passed: acc.passed,
                pass_rate_pct: round1(rate),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        by_desc(a.pass_rate_pct, b.pass_rate_pct).then_with(|| a.company.cmp(&b.company))
    });
    rows
}

/// Number of course records per company, most first.
pub fn courses_by_company(subset: &[&CourseRecord]) -> Vec<CompanyCountRow> {
    let mut rows: Vec<CompanyCountRow> = group_in_order(subset, |r| r.company.as_str())
        .into_iter()
        .map(|(company, records)| CompanyCountRow {
            company,
            courses: records.len(),
        })
        .collect();
    rows.sort_by(|a, b| b.courses.cmp(&a.courses).then_with(|| a.company.cmp(&b.company)));
    rows
}

/// Instructors with the largest audiences. Ties keep first-appearance order.
pub fn top_instructors(subset: &[&CourseRecord], n: usize) -> Vec<InstructorRow> {
    let mut rows: Vec<InstructorRow> = group_in_order(subset, |r| r.instructor.as_str())
        .into_iter()
        .map(|(instructor, records)| InstructorRow {
            instructor,
            participants: records.iter().map(|r| r.participants as u64).sum(),
            passed: records.iter().map(|r| r.passed as u64).sum(),
        })
        .collect();
    // `sort_by` is stable.
    rows.sort_by(|a, b| b.participants.cmp(&a.participants));
    rows.truncate(n);
    rows
}

pub fn survey_summary(subset: &[&CourseRecord]) -> SurveySummary {
    let valid: Vec<f64> = subset.iter().filter_map(|r| r.survey_score).collect();
    let mut per_company: Vec<CompanySurveyRow> = group_in_order(subset, |r| r.company.as_str())
        .into_iter()
        .filter_map(|(company, records)| {
            let scores: Vec<f64> = records.iter().filter_map(|r| r.survey_score).collect();
            if scores.is_empty() {
                return None;
            }
            Some(CompanySurveyRow {
                company,
                responses: scores.len(),
                avg_pct: average(&scores),
            })
        })
        .collect();
    per_company.sort_by(|a, b| by_desc(a.avg_pct, b.avg_pct).then_with(|| a.company.cmp(&b.company)));
    SurveySummary {
        overall_avg_pct: average(&valid),
        valid_responses: valid.len(),
        no_data: valid.is_empty(),
        per_company,
    }
}

pub fn status_counts(subset: &[&CourseRecord]) -> StatusCounts {
    StatusCounts {
        total: subset.len(),
        executed: subset.iter().filter(|r| r.status == STATUS_EXECUTED).count(),
        in_progress: subset
            .iter()
            .filter(|r| r.status.to_lowercase().contains(STATUS_IN_PROGRESS_FRAGMENT))
            .count(),
    }
}

/// Course table rows ordered by status, company and course.
pub fn course_table(subset: &[&CourseRecord]) -> Vec<CourseTableRow> {
    let mut rows: Vec<CourseTableRow> = subset
        .iter()
        .map(|r| CourseTableRow {
            company: r.company.clone(),
            course: r.course.clone(),
            instructor: r.instructor.clone(),
            modality: r.modality.clone(),
            hours: r.hours,
            date_text: r.date_text.clone(),
            status: r.status.clone(),
            participants: r.participants,
            passed: r.passed,
            failed: r.failed,
            pass_rate_pct: r.pass_rate_pct().map(round1),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| a.company.cmp(&b.company))
            .then_with(|| a.course.cmp(&b.course))
    });
    rows
}

/// Detail listing order: company, start date (undated last), course.
pub fn sort_detail<'a>(subset: &[&'a CourseRecord]) -> Vec<&'a CourseRecord> {
    let mut rows = subset.to_vec();
    rows.sort_by(|a, b| {
        a.company
            .cmp(&b.company)
            .then_with(|| match (a.start_date, b.start_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.course.cmp(&b.course))
    });
    rows
}

/// `primary` is the filtered view; status counts are taken there, before
/// any course-table narrowing.
pub fn generate_summary(snapshot: &Snapshot, primary: &[&CourseRecord]) -> SummaryStats {
    let survey = survey_summary(primary);
    SummaryStats {
        loaded_at: snapshot.loaded_at.to_rfc3339(),
        records_total: snapshot.records.len(),
        records_filtered: primary.len(),
        kpis: kpis(primary),
        status_counts: status_counts(primary),
        survey_avg_pct: survey.overall_avg_pct,
        survey_no_data: survey.no_data,
    }
}
