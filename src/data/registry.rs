//! Read-only registry of tables built once at startup and passed by reference
//! into the resolver and report builders.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::loader::TableLoader;
use crate::data::table::{Table, TextTable};
use crate::data::DataError;

#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, Arc<Table>>,
    texts: HashMap<String, Arc<TextTable>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        TableRegistry::default()
    }

    /// Load every named table through `loader`. Any missing file is fatal.
    pub fn load(
        loader: &mut TableLoader,
        tables: &[&str],
        texts: &[&str],
    ) -> Result<Self, DataError> {
        let mut registry = TableRegistry::new();
        for name in tables {
            registry.tables.insert((*name).to_string(), loader.table(name)?);
        }
        for name in texts {
            registry.texts.insert((*name).to_string(), loader.text(name)?);
        }
        Ok(registry)
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name().to_string(), Arc::new(table));
        self
    }

    pub fn with_text(mut self, texts: TextTable) -> Self {
        self.texts.insert(texts.name().to_string(), Arc::new(texts));
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).map(Arc::as_ref)
    }

    pub fn text(&self, name: &str) -> Option<&TextTable> {
        self.texts.get(name).map(Arc::as_ref)
    }
}
