pub mod cleanup;
pub mod import;
pub mod pipeline;
pub mod queries;

pub use cleanup::{run_cleanup, CleanupOutcome, CleanupReport, CleanupStep};
pub use import::{
    check_copy_header, import_csv, import_records, read_file, read_records, ImportError,
    ImportMode, ImportSummary,
};
pub use pipeline::{run_pipeline, run_queries, PipelineOptions, PipelineReport, QueryOutcome};
pub use queries::Query;
