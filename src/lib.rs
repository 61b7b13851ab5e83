//! Training course report pipeline.
//!
//! A raw CSV export is normalized into `CourseRecord`s (`loader`, `schema`),
//! held as an immutable snapshot (`store`), narrowed with a `FilterSpec`
//! (`filter`) and summarized (`reports`). `output` renders and exports the
//! results.
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod schema;
pub mod source;
pub mod store;
pub mod types;
pub mod util;

pub use error::{DataLoadError, ExportError, RecordIssue};
pub use filter::{apply_filter, apply_table_filter, default_spec, filter_options, for_company};
pub use loader::{normalize_bytes, LoadReport, NormalizedTable};
pub use reports::{
    course_table, courses_by_company, group_by_company, kpis, pass_rate_by_company,
    status_counts, survey_summary, top_instructors,
};
pub use store::{RecordStore, Snapshot};
pub use types::{CourseRecord, FilterSpec, TableFilter};
