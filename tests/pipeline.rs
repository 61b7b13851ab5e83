use std::io::Write;
use std::time::Duration;

use chrono::NaiveDate;
use course_report::output::records_csv_bytes;
use course_report::source::FileSource;
use course_report::{
    apply_filter, group_by_company, kpis, normalize_bytes, pass_rate_by_company, status_counts,
    survey_summary, CourseRecord, RecordStore,
};

const EXPORT: &str = "\
Empresa,Nombre del curso,Horas,Fecha,Modalidad,Estado,Docente,Participantes,Aprobados,Desaprobados,Encuestas,Sede
CompanyA,Excel,16,10/01/2024 - 12/01/2024,Virtual,Ejecutado,Ana Ruiz,10,9,1,92%,Lima
CompanyA,Word,8,por definir,Virtual,Programado,Ana Ruiz,0,0,0,-%,Lima
CompanyB,Soldadura,24,15/03/2024,Presencial,En proceso,Luis Soto,5,5,0,88%,Arequipa
";

fn all(records: &[CourseRecord]) -> Vec<&CourseRecord> {
    records.iter().collect()
}

#[test]
fn company_rates_skip_zero_participant_records() {
    let table = normalize_bytes(EXPORT.as_bytes()).unwrap();
    let subset = all(&table.records);

    let rates = pass_rate_by_company(&subset);
    let got: Vec<(&str, f64)> = rates
        .iter()
        .map(|r| (r.company.as_str(), r.pass_rate_pct))
        .collect();
    assert_eq!(got, vec![("CompanyB", 100.0), ("CompanyA", 90.0)]);

    let groups = group_by_company(&subset);
    let a = groups.iter().find(|g| g.company == "CompanyA").unwrap();
    assert_eq!(a.courses, 2);
    assert_eq!(a.participants, 10);
    assert_eq!(a.pass_rate_pct, Some(90.0));
}

#[test]
fn default_view_drops_undated_records_and_kpis_follow() {
    let table = normalize_bytes(EXPORT.as_bytes()).unwrap();
    let store_like = course_report::Snapshot {
        records: table.records.clone(),
        extra_columns: table.extra_columns.clone(),
        report: table.report.clone(),
        loaded_at: chrono::Utc::now(),
    };
    let spec = store_like.default_filter();
    assert_eq!(
        spec.date_range,
        Some((
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        ))
    );
    let primary = apply_filter(&store_like.records, &spec);
    assert_eq!(primary.len(), 2);

    let k = kpis(&primary);
    assert_eq!(k.course_count, 2);
    assert_eq!(k.participant_total, 15);
    assert_eq!(k.hours_total, 40);
    assert!((k.pass_rate_pct - 93.333).abs() < 0.01);
    assert_eq!(k.modalities, vec!["Presencial", "Virtual"]);

    let counts = status_counts(&primary);
    assert_eq!((counts.total, counts.executed, counts.in_progress), (2, 1, 1));

    let survey = survey_summary(&primary);
    assert_eq!(survey.valid_responses, 2);
    assert_eq!(survey.overall_avg_pct, 90.0);
}

#[test]
fn empty_company_selection_empties_every_aggregate() {
    let table = normalize_bytes(EXPORT.as_bytes()).unwrap();
    let spec = course_report::default_spec(&course_report::filter_options(&table.records))
        .with_companies(Vec::<String>::new());
    let subset = apply_filter(&table.records, &spec);
    assert!(subset.is_empty());
    assert_eq!(kpis(&subset).pass_rate_pct, 0.0);
    assert!(group_by_company(&subset).is_empty());
    assert!(survey_summary(&subset).no_data);
}

#[test]
fn exported_records_normalize_back_to_the_same_values() {
    let table = normalize_bytes(EXPORT.as_bytes()).unwrap();
    let subset = all(&table.records);
    let bytes = records_csv_bytes(&table.extra_columns, &subset).unwrap();

    let again = normalize_bytes(&bytes).unwrap();
    assert_eq!(again.extra_columns, table.extra_columns);
    assert_eq!(again.records, table.records);
}

#[test]
fn store_loads_from_file_and_keeps_serving_after_a_broken_refresh() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(EXPORT.as_bytes()).unwrap();
    file.flush().unwrap();

    let store = RecordStore::load(
        Box::new(FileSource::new(file.path())),
        Duration::from_secs(300),
    )
    .unwrap();
    assert_eq!(store.snapshot().records.len(), 3);

    std::fs::write(file.path(), "nothing useful\n").unwrap();
    assert!(store.refresh().is_err());
    assert_eq!(store.snapshot().records.len(), 3);
}
