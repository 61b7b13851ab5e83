use crate::error::ExportError;
use crate::types::{CanonicalField, CourseRecord};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Exports start with a byte-order mark so spreadsheet tools pick UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serialize summary rows as BOM-prefixed CSV. An empty set still gets its
/// header row, taken from the `tabled` names (they mirror the serde names).
pub fn csv_bytes<T: Serialize + Tabled>(rows: &[T]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    if rows.is_empty() {
        let headers: Vec<String> = T::headers().into_iter().map(|h| h.into_owned()).collect();
        wtr.write_record(&headers)?;
    }
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Serialize course records: canonical columns in export order, then the
/// passthrough columns. The header row is written even for an empty set.
pub fn records_csv_bytes(
    extra_columns: &[String],
    records: &[&CourseRecord],
) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    let header: Vec<&str> = CanonicalField::EXPORT_ORDER
        .iter()
        .map(|f| f.header())
        .chain(extra_columns.iter().map(String::as_str))
        .collect();
    wtr.write_record(&header)?;
    for r in records {
        let mut row: Vec<String> = CanonicalField::EXPORT_ORDER
            .iter()
            .map(|f| r.field_text(*f))
            .collect();
        row.extend(
            (0..extra_columns.len()).map(|i| r.extra.get(i).cloned().unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

pub fn write_csv<T: Serialize + Tabled>(path: &Path, rows: &[T]) -> Result<(), ExportError> {
    write_bytes(path, &csv_bytes(rows)?)
}

pub fn write_records_csv(
    path: &Path,
    extra_columns: &[String],
    records: &[&CourseRecord],
) -> Result<(), ExportError> {
    write_bytes(path, &records_csv_bytes(extra_columns, records)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(())
}

/// Markdown table of at most `max_rows` rows, or `(no rows)`.
pub fn render_preview<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_preview(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompanyRateRow, CourseTableRow};

    fn rate_row(company: &str, rate: f64) -> CompanyRateRow {
        CompanyRateRow {
            company: company.to_string(),
            participants: 10,
            passed: 9,
            pass_rate_pct: rate,
        }
    }

    #[test]
    fn csv_exports_start_with_bom_and_spanish_headers() {
        let bytes = csv_bytes(&[rate_row("Acme", 90.0)]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "Empresa,Participantes,Aprobados,Tasa_%\nAcme,10,9,90.0\n");
    }

    #[test]
    fn empty_summary_export_still_has_a_header() {
        let bytes = csv_bytes::<CompanyRateRow>(&[]).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "Empresa,Participantes,Aprobados,Tasa_%\n");
    }

    #[test]
    fn empty_and_filled_exports_agree_on_headers() {
        let row = CourseTableRow {
            company: "Acme".to_string(),
            course: "Excel".to_string(),
            instructor: "Ana".to_string(),
            modality: "Virtual".to_string(),
            hours: 8,
            date_text: "10/01/2024".to_string(),
            status: "Ejecutado".to_string(),
            participants: 10,
            passed: 9,
            failed: 1,
            pass_rate_pct: Some(90.0),
        };
        let filled = String::from_utf8(csv_bytes(&[row]).unwrap()).unwrap();
        let empty = String::from_utf8(csv_bytes::<CourseTableRow>(&[]).unwrap()).unwrap();
        assert_eq!(filled.lines().next(), empty.lines().next());
    }

    #[test]
    fn record_export_keeps_column_order_and_passthrough() {
        let rec = CourseRecord {
            company: "Acme".to_string(),
            course: "Excel, nivel 2".to_string(),
            participants: 10,
            passed: 9,
            date_text: "10/01/2024".to_string(),
            survey_text: "92%".to_string(),
            extra: vec!["Lima".to_string()],
            ..CourseRecord::default()
        };
        let bytes = records_csv_bytes(&["Sede".to_string()], &[&rec]).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Empresa,Curso,Docente,Modalidad,Horas,Fecha,Estado,Participantes,Aprobados,Desaprobados,Encuestas,Sede")
        );
        assert_eq!(
            lines.next(),
            Some("Acme,\"Excel, nivel 2\",,,0,10/01/2024,,10,9,0,92%,Lima")
        );
    }

    #[test]
    fn empty_record_export_still_has_a_header() {
        let bytes = records_csv_bytes(&[], &[]).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("Empresa,Curso,"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn files_are_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("rates.csv");
        write_csv(&csv_path, &[rate_row("Acme", 90.0)]).unwrap();
        assert!(std::fs::read(&csv_path).unwrap().starts_with(UTF8_BOM));

        let json_path = dir.path().join("rates.json");
        write_json(&json_path, &rate_row("Acme", 90.0)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["Tasa_%"], 90.0);
    }

    #[test]
    fn preview_limits_rows() {
        let rows = vec![rate_row("Acme", 90.0), rate_row("Beta", 80.0)];
        let out = render_preview(&rows, 1);
        assert!(out.contains("Acme"));
        assert!(out.contains("90.0%"));
        assert!(!out.contains("Beta"));
        assert_eq!(render_preview::<CompanyRateRow>(&[], 3), "(no rows)");
    }
}
