// src/error.rs
use thiserror::Error;

/// Stage-global failures. Anything in here aborts the stage that raised it;
/// per-file and per-row problems never surface as a `PipelineError`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unrecognized file layout: first line has no `,`, tab or `;` delimiter")]
    UnrecognizedShape,

    #[error("file has no header line")]
    EmptyFile,

    #[error("required column `{column}` not found (available: {available:?})")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("no {role} column in {dictionary} dictionary (markers {markers:?}, columns {available:?})")]
    DictionaryColumnNotFound {
        dictionary: &'static str,
        role: &'static str,
        markers: Vec<String>,
        available: Vec<String>,
    },

    #[error("no records found for municipality {municipality}")]
    NoMatchingRecords { municipality: i64 },

    #[error("no source files match `{pattern}`")]
    NoSourceFiles { pattern: String },
}
