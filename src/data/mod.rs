//! Access to the game-data export: directory layout, table types, the caching
//! loader and the read-only registry handed to the resolver and reports.

pub mod layout;
pub mod loader;
pub mod registry;
pub mod table;

use std::path::PathBuf;

use thiserror::Error;

pub use layout::DataLayout;
pub use loader::TableLoader;
pub use registry::TableRegistry;
pub use table::{Record, Table, TextTable};

/// Fatal load failure. A missing or malformed input file aborts the run.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unable to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse json '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a top-level JSON object in '{}'", path.display())]
    NotAnObject { path: PathBuf },
}
