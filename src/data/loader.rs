//! Loads export tables from disk. Each path is read at most once per run; later
//! requests for the same path return the cached table.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::data::layout::DataLayout;
use crate::data::table::{Table, TextTable};
use crate::data::DataError;

#[derive(Debug)]
pub struct TableLoader {
    layout: DataLayout,
    tables: HashMap<PathBuf, Arc<Table>>,
    texts: HashMap<PathBuf, Arc<TextTable>>,
}

impl TableLoader {
    pub fn new(layout: DataLayout) -> Self {
        TableLoader {
            layout,
            tables: HashMap::new(),
            texts: HashMap::new(),
        }
    }

    /// Gameplay table `<region>/bin/<name>.json`.
    pub fn table(&mut self, name: &str) -> Result<Arc<Table>, DataError> {
        let path = self.layout.bin_path(name);
        if let Some(table) = self.tables.get(&path) {
            debug!(table = name, "table cache hit");
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(load_table(&path, name)?);
        debug!(table = name, rows = table.len(), path = %path.display(), "loaded table");
        self.tables.insert(path, Arc::clone(&table));
        Ok(table)
    }

    /// String table `<region>/language/<locale>/<name>.json`.
    pub fn text(&mut self, name: &str) -> Result<Arc<TextTable>, DataError> {
        let path = self.layout.text_path(name);
        if let Some(texts) = self.texts.get(&path) {
            debug!(table = name, "text cache hit");
            return Ok(Arc::clone(texts));
        }
        let texts = Arc::new(load_text_table(&path, name)?);
        debug!(table = name, entries = texts.len(), path = %path.display(), "loaded text table");
        self.texts.insert(path, Arc::clone(&texts));
        Ok(texts)
    }

    pub fn cached_paths(&self) -> usize {
        self.tables.len() + self.texts.len()
    }
}

pub fn load_table(path: &Path, name: &str) -> Result<Table, DataError> {
    Ok(Table::new(name, read_object(path)?))
}

pub fn load_text_table(path: &Path, name: &str) -> Result<TextTable, DataError> {
    Ok(TextTable::from_map(name, read_object(path)?))
}

fn read_object(path: &Path) -> Result<Map<String, Value>, DataError> {
    let raw = fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: Value = serde_json::from_str(&raw).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(DataError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}
