//! File writers shared by the reports. Parent directories are created on
//! demand; JSON is pretty-printed UTF-8 with non-ASCII text kept as-is.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::reports::ReportError;

pub fn ensure_parent_dir(path: &Path) -> Result<(), ReportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| ReportError::Write {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReportError> {
    ensure_parent_dir(path)?;
    let mut payload = to_pretty_json(value)?;
    payload.push('\n');
    fs::write(path, payload).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "wrote json");
    Ok(())
}

/// Serialize `rows` with a header row derived from the row type.
pub fn write_csv_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ReportError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

/// Explicit header plus pre-rendered string records.
pub fn write_csv_records(
    path: &Path,
    header: &[&str],
    records: &[Vec<String>],
) -> Result<(), ReportError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush().map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), rows = records.len(), "wrote csv");
    Ok(())
}
