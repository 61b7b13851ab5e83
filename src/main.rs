// Entry point and high-level CLI flow.
//
// - Option [1] loads the course table and prints load diagnostics.
// - Option [2] applies the configured filters, prints report previews and
//   writes the CSV exports plus a JSON summary.
// - Option [3] forces a refresh; a failed refresh keeps the loaded data.
// With `--batch` the program loads, generates once and exits.
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use course_report::config::Config;
use course_report::types::CourseRecord;
use course_report::{filter, output, reports, source, util, RecordStore};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

// Loaded once, then reused for every report generation in this run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { store: None }));

struct AppState {
    store: Option<RecordStore>,
}

fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn print_load_report(store: &RecordStore) {
    let snap = store.snapshot();
    let report = &snap.report;
    println!(
        "Processing dataset... ({} rows loaded at {})",
        util::format_int(report.total_rows as u64),
        snap.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Note: {} rows without a usable start date, {} surveys without a score, {} counts read as zero.",
        util::format_int(report.unresolved_dates as u64),
        util::format_int(report.invalid_surveys as u64),
        util::format_int(report.coerced_numbers as u64)
    );
    if report.skipped_rows > 0 || report.invalid_encoding > 0 {
        println!(
            "Warning: {} unreadable rows skipped, {} rows with invalid characters replaced.",
            util::format_int(report.skipped_rows as u64),
            util::format_int(report.invalid_encoding as u64)
        );
    }
    if report.passthrough_columns > 0 {
        println!("Info: kept {} extra columns: {}", report.passthrough_columns, snap.extra_columns.join(", "));
    }
    println!();
}

/// Handle option [1]: build a fresh store from the configured source.
fn handle_load(config: &Config) -> anyhow::Result<()> {
    let src = source::from_location(&config.source, config.http_timeout())?;
    let store = RecordStore::load(src, config.ttl())
        .with_context(|| format!("failed to load {}", config.source))?;
    print_load_report(&store);
    APP_STATE.lock().unwrap_or_else(PoisonError::into_inner).store = Some(store);
    Ok(())
}

/// Handle option [3]: explicit refresh of an already loaded store.
fn handle_refresh() {
    let state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(store) = state.store.as_ref() else {
        println!("Error: No data loaded. Please load the file first (option 1).\n");
        return;
    };
    match store.refresh() {
        Ok(_) => print_load_report(store),
        Err(e) => println!("Refresh failed ({e}); still serving data from {}.\n", store.last_refresh()),
    }
}

/// Handle option [2]: generate every report for the configured view.
fn handle_generate_reports(config: &Config) -> anyhow::Result<()> {
    let snapshot = {
        let state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(store) = state.store.as_ref() else {
            println!("Error: No data loaded. Please load the file first (option 1).\n");
            return Ok(());
        };
        if let Err(e) = store.refresh_if_stale(Utc::now()) {
            warn!(error = %e, "serving stale snapshot");
        }
        store.snapshot()
    };

    let spec = config.filter_spec(&snapshot);
    let primary: Vec<&CourseRecord> = filter::apply_filter(&snapshot.records, &spec);
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("cannot create {}", config.out_dir.display()))?;
    let out = |name: &str| config.out_dir.join(name);

    println!("Generating reports...");
    println!("Outputs saved to individual files...\n");

    let k = reports::kpis(&primary);
    let period = match spec.date_range {
        Some((from, to)) => format!("{from} → {to}"),
        None => "all dates".to_string(),
    };
    println!("Total courses: {} (period: {})", util::format_int(k.course_count as u64), period);
    println!(
        "Total participants: {} (per course: {})",
        util::format_int(k.participant_total),
        util::format_number(k.avg_participants_per_course, 1)
    );
    println!("Pass rate: {}%", util::format_number(k.pass_rate_pct, 1));
    println!(
        "Hours taught: {} (modalities: {})\n",
        util::format_int(k.hours_total),
        if k.modalities.is_empty() { "-".to_string() } else { k.modalities.join(", ") }
    );

    let r1 = reports::courses_by_company(&primary);
    let file1 = "report1_courses_by_company.csv";
    output::write_csv(&out(file1), &r1)?;
    println!("Report 1: Courses per Company\n");
    output::preview_table_rows(&r1, 5);
    println!("(Full table exported to {})\n", file1);

    let r2 = reports::group_by_company(&primary);
    let file2 = "report2_company_summary.csv";
    output::write_csv(&out(file2), &r2)?;
    println!("Report 2: Participants, Results and Hours per Company\n");
    output::preview_table_rows(&r2, 5);
    println!("(Full table exported to {})\n", file2);

    let r3 = reports::pass_rate_by_company(&primary);
    let file3 = "report3_pass_rate_by_company.csv";
    output::write_csv(&out(file3), &r3)?;
    println!("Report 3: Pass Rate per Company (%)\n");
    output::preview_table_rows(&r3, 5);
    println!("(Full table exported to {})\n", file3);

    let focus = filter::for_company(&primary, config.focus_company.as_deref());
    let r4 = reports::top_instructors(&focus, config.top);
    let file4 = "report4_top_instructors.csv";
    output::write_csv(&out(file4), &r4)?;
    println!(
        "Report 4: Top Instructors by Participants ({})\n",
        config.focus_company.as_deref().unwrap_or("all companies")
    );
    output::preview_table_rows(&r4, config.top);
    println!("(Full table exported to {})\n", file4);

    let survey = reports::survey_summary(&primary);
    let file5 = "report5_survey_by_company.csv";
    output::write_csv(&out(file5), &survey.per_company)?;
    println!("Report 5: Survey Satisfaction");
    if survey.no_data {
        println!("No valid survey scores in the current filter.\n");
    } else {
        println!(
            "Average: {}% over {} responses\n",
            util::format_number(survey.overall_avg_pct, 1),
            util::format_int(survey.valid_responses as u64)
        );
        output::preview_table_rows(&survey.per_company, 5);
    }
    println!("(Full table exported to {})\n", file5);

    // Counts come from the primary view so they don't move with the table filter.
    let counts = reports::status_counts(&primary);
    let table_filter = config.table_filter(&primary);
    let table = reports::course_table(&filter::apply_table_filter(&primary, &table_filter));
    let file6 = "cursos_estado_ejecucion.csv";
    output::write_csv(&out(file6), &table)?;
    println!("Course Execution Status");
    println!(
        "Courses: {} | Executed: {} | In progress: {}\n",
        counts.total, counts.executed, counts.in_progress
    );
    output::preview_table_rows(&table, 5);
    println!("(Full table exported to {})\n", file6);

    let file7 = "cursos_filtrados.csv";
    let detail = reports::sort_detail(&primary);
    output::write_records_csv(&out(file7), &snapshot.extra_columns, &detail)?;
    println!("Filtered records exported to {}\n", file7);

    let summary = reports::generate_summary(&snapshot, &primary);
    output::write_json(&out("summary.json"), &summary)?;
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"records_filtered\": {}, \"pass_rate_pct\": {}, \"survey_avg_pct\": {}}}\n",
        summary.records_filtered,
        util::format_number(summary.kpis.pass_rate_pct, 2),
        util::format_number(summary.survey_avg_pct, 2)
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();
    let config = Config::parse();

    if config.batch {
        handle_load(&config)?;
        return handle_generate_reports(&config);
    }

    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Refresh data\n");
        match read_choice().as_str() {
            "1" => {
                if let Err(e) = handle_load(&config) {
                    eprintln!("Failed to load file: {:#}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(&config) {
                    eprintln!("Report error: {:#}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_refresh(),
            "" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
    Ok(())
}
