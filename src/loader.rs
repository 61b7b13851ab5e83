use crate::error::{DataLoadError, RecordIssue};
use crate::schema::{resolve_headers, ColumnRole, HeaderMap};
use crate::types::{CanonicalField, CourseRecord};
use crate::util::{parse_count_safe, parse_survey_pct, resolve_start_date};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub unresolved_dates: usize,
    pub invalid_surveys: usize,
    pub coerced_numbers: usize,
    pub invalid_encoding: usize,
    pub skipped_rows: usize,
    pub passthrough_columns: usize,
}

impl LoadReport {
    fn note(&mut self, issue: &RecordIssue) {
        match issue {
            RecordIssue::DateParseFailure { .. } => self.unresolved_dates += 1,
            RecordIssue::SurveyParseFailure { .. } => self.invalid_surveys += 1,
            RecordIssue::NumericCoerced { .. } => self.coerced_numbers += 1,
            RecordIssue::InvalidEncoding { .. } => self.invalid_encoding += 1,
            RecordIssue::UnreadableRow { .. } => self.skipped_rows += 1,
        }
    }
}

/// A raw table mapped into the canonical schema.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub records: Vec<CourseRecord>,
    pub extra_columns: Vec<String>,
    pub report: LoadReport,
}

/// Normalize a CSV export held in memory.
///
/// Fails as a whole when the table cannot be read, has no data rows or has
/// no header we recognize. Problems inside a single row never fail the load:
/// cells that are not UTF-8 are decoded lossily and rows the reader cannot
/// produce are skipped and counted.
pub fn normalize_bytes(bytes: &[u8]) -> Result<NormalizedTable, DataLoadError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(bytes);
    let (headers, _) = decode_lossy(rdr.byte_headers()?);
    let map = resolve_headers(headers.iter());
    if map.recognized() == 0 {
        let found: Vec<&str> = headers.iter().collect();
        return Err(DataLoadError::NoRecognizedHeaders(found.join(", ")));
    }
    for field in [CanonicalField::Date, CanonicalField::Participants] {
        if !map.has(field) {
            info!(column = field.header(), "column not present, using defaults");
        }
    }

    let mut report = LoadReport {
        passthrough_columns: map.extra_columns.len(),
        ..LoadReport::default()
    };
    let mut records = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let row_no = idx + 1;
        let (record, issues) = match result {
            Ok(raw) => {
                let (row, lossy) = decode_lossy(&raw);
                let (record, mut issues) = normalize_row(&map, &row, row_no);
                if lossy {
                    issues.push(RecordIssue::InvalidEncoding { row: row_no });
                }
                (Some(record), issues)
            }
            Err(e) => (
                None,
                vec![RecordIssue::UnreadableRow {
                    row: row_no,
                    reason: e.to_string(),
                }],
            ),
        };
        for issue in &issues {
            debug!(?issue, "record issue absorbed");
            report.note(issue);
        }
        records.extend(record);
    }
    if records.is_empty() {
        return Err(DataLoadError::Empty);
    }
    report.total_rows = records.len();

    info!(
        rows = report.total_rows,
        unresolved_dates = report.unresolved_dates,
        invalid_surveys = report.invalid_surveys,
        coerced_numbers = report.coerced_numbers,
        invalid_encoding = report.invalid_encoding,
        skipped_rows = report.skipped_rows,
        passthrough_columns = report.passthrough_columns,
        "course table normalized"
    );
    Ok(NormalizedTable {
        records,
        extra_columns: map.extra_columns,
        report,
    })
}

// Returns the decoded record and whether any cell needed replacement.
fn decode_lossy(raw: &ByteRecord) -> (StringRecord, bool) {
    let lossy = raw.iter().any(|cell| std::str::from_utf8(cell).is_err());
    let row = raw.iter().map(String::from_utf8_lossy).collect();
    (row, lossy)
}

fn normalize_row(
    map: &HeaderMap,
    row: &StringRecord,
    row_no: usize,
) -> (CourseRecord, Vec<RecordIssue>) {
    let mut rec = CourseRecord {
        extra: vec![String::new(); map.extra_columns.len()],
        ..CourseRecord::default()
    };
    let mut issues = Vec::new();

    for (i, role) in map.roles.iter().enumerate() {
        let cell = row.get(i).map(str::trim);
        match *role {
            ColumnRole::Canonical(field) => assign(&mut rec, field, cell, row_no, &mut issues),
            ColumnRole::Passthrough(j) => rec.extra[j] = cell.unwrap_or_default().to_string(),
            ColumnRole::Ignored => {}
        }
    }

    rec.start_date = resolve_start_date(&rec.date_text);
    if rec.start_date.is_none() && !rec.date_text.is_empty() {
        issues.push(RecordIssue::DateParseFailure {
            row: row_no,
            text: rec.date_text.clone(),
        });
    }
    rec.survey_score = parse_survey_pct(&rec.survey_text);
    if rec.survey_score.is_none() && !rec.survey_text.is_empty() {
        issues.push(RecordIssue::SurveyParseFailure {
            row: row_no,
            text: rec.survey_text.clone(),
        });
    }
    (rec, issues)
}

fn assign(
    rec: &mut CourseRecord,
    field: CanonicalField,
    cell: Option<&str>,
    row_no: usize,
    issues: &mut Vec<RecordIssue>,
) {
    let text = || cell.unwrap_or_default().to_string();
    match field {
        CanonicalField::Company => rec.company = text(),
        CanonicalField::Course => rec.course = text(),
        CanonicalField::Instructor => rec.instructor = text(),
        CanonicalField::Modality => rec.modality = text(),
        CanonicalField::Status => rec.status = text(),
        CanonicalField::Date => rec.date_text = text(),
        CanonicalField::Survey => rec.survey_text = text(),
        CanonicalField::Hours => rec.hours = count_cell(field, cell, row_no, issues),
        CanonicalField::Participants => rec.participants = count_cell(field, cell, row_no, issues),
        CanonicalField::Passed => rec.passed = count_cell(field, cell, row_no, issues),
        CanonicalField::Failed => rec.failed = count_cell(field, cell, row_no, issues),
    }
}

// Missing or unusable counts read as zero.
fn count_cell(
    field: CanonicalField,
    cell: Option<&str>,
    row_no: usize,
    issues: &mut Vec<RecordIssue>,
) -> u32 {
    match parse_count_safe(cell) {
        Some(v) => v,
        None => {
            if let Some(text) = cell.filter(|t| !t.is_empty()) {
                issues.push(RecordIssue::NumericCoerced {
                    row: row_no,
                    column: field.header(),
                    text: text.to_string(),
                });
            }
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
EMPRESA,\"Nombre del\ncurso\",Horas,Fecha,Modalidad,Estado,Docente,Cantidad de Participantes,Aprobados,Desaprobados,Encuestas,Sede
Acme,Excel Avanzado,24,10/01/2024 - 12/01/2024,Virtual,Ejecutado,Ana Ruiz,10,9,1,92%,Lima
Acme,Soldadura,n/a,por definir,Presencial,En proceso,Luis Soto,,,,-%,Arequipa
";

    #[test]
    fn normalizes_headers_types_and_passthrough_columns() {
        let table = normalize_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.extra_columns, vec!["Sede".to_string()]);
        assert_eq!(table.records.len(), 2);

        let first = &table.records[0];
        assert_eq!(first.company, "Acme");
        assert_eq!(first.course, "Excel Avanzado");
        assert_eq!(first.hours, 24);
        assert_eq!(first.participants, 10);
        assert_eq!(first.passed, 9);
        assert_eq!(first.failed, 1);
        assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(first.survey_score, Some(92.0));
        assert_eq!(first.extra, vec!["Lima".to_string()]);

        let second = &table.records[1];
        assert_eq!(second.hours, 0);
        assert_eq!(second.participants, 0);
        assert_eq!(second.start_date, None);
        assert_eq!(second.survey_score, None);
        assert_eq!(second.date_text, "por definir");

        assert_eq!(
            table.report,
            LoadReport {
                total_rows: 2,
                unresolved_dates: 1,
                invalid_surveys: 1,
                coerced_numbers: 1,
                invalid_encoding: 0,
                skipped_rows: 0,
                passthrough_columns: 1,
            }
        );
    }

    #[test]
    fn missing_columns_default_to_empty_and_zero() {
        let table = normalize_bytes(b"Empresa,Curso\nAcme,\n,Excel\n").unwrap();
        for rec in &table.records {
            assert_eq!(rec.instructor, "");
            assert_eq!(rec.modality, "");
            assert_eq!(rec.status, "");
            assert_eq!(rec.participants, 0);
            assert_eq!(rec.start_date, None);
        }
        assert_eq!(table.records[0].course, "");
        assert_eq!(table.records[1].company, "");
    }

    #[test]
    fn short_rows_are_padded_not_rejected() {
        let table = normalize_bytes(b"Empresa,Curso,Participantes\nAcme\n").unwrap();
        assert_eq!(table.records[0].company, "Acme");
        assert_eq!(table.records[0].participants, 0);
    }

    #[test]
    fn leading_bom_is_ignored() {
        let table = normalize_bytes(b"\xEF\xBB\xBFEmpresa,Curso\nAcme,Excel\n").unwrap();
        assert_eq!(table.records[0].company, "Acme");
        assert!(table.extra_columns.is_empty());
    }

    #[test]
    fn header_only_table_is_a_load_error() {
        let err = normalize_bytes(b"Empresa,Curso\n").unwrap_err();
        assert!(matches!(err, DataLoadError::Empty));
    }

    #[test]
    fn unknown_headers_only_is_a_load_error() {
        let err = normalize_bytes(b"foo,bar\n1,2\n").unwrap_err();
        assert!(matches!(err, DataLoadError::NoRecognizedHeaders(ref h) if h == "foo, bar"));
    }

    #[test]
    fn latin1_cell_does_not_sink_the_other_rows() {
        let mut bytes = b"Empresa,Curso,Participantes\nAcme,Excel,10\n".to_vec();
        bytes.extend_from_slice(b"Beta,Programaci\xF3n,5\n");
        bytes.extend_from_slice(b"Gamma,Word,3\n");

        let table = normalize_bytes(&bytes).unwrap();
        assert_eq!(table.records.len(), 3);
        assert_eq!(table.records[0].company, "Acme");
        assert_eq!(table.records[1].course, "Programaci\u{FFFD}n");
        assert_eq!(table.records[1].participants, 5);
        assert_eq!(table.records[2].company, "Gamma");
        assert_eq!(table.report.invalid_encoding, 1);
        assert_eq!(table.report.skipped_rows, 0);
        assert_eq!(table.report.total_rows, 3);
    }

    #[test]
    fn row_issues_feed_the_load_report() {
        let mut report = LoadReport::default();
        report.note(&RecordIssue::UnreadableRow {
            row: 2,
            reason: "bad".to_string(),
        });
        report.note(&RecordIssue::InvalidEncoding { row: 3 });
        assert_eq!((report.skipped_rows, report.invalid_encoding), (1, 1));
    }

    #[test]
    fn non_utf8_header_is_decoded_lossily() {
        let table = normalize_bytes(b"Empresa,Direcci\xF3n\nAcme,Lima\n").unwrap();
        assert_eq!(table.records[0].company, "Acme");
        assert_eq!(table.extra_columns.len(), 1);
    }

    #[test]
    fn empty_input_is_a_load_error() {
        assert!(normalize_bytes(b"").is_err());
    }
}
