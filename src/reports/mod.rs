//! Batch reports over an export. Each report builds plain data from a
//! [crate::data::TableRegistry] and leaves file and console output to the
//! writers in [output] and the CLI.

pub mod character;
pub mod gem;
pub mod hitdamage;
pub mod output;
pub mod scan;
pub mod star_tower;

use std::path::PathBuf;

use thiserror::Error;

use crate::data::DataError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("unable to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
}
