//! Fixed directory layout of an export:
//! `<root>/<region>/bin/<Name>.json` for gameplay tables and
//! `<root>/<region>/language/<locale>/<Name>.json` for string tables.

use std::path::PathBuf;

pub const DEFAULT_REGION: &str = "JP";
pub const DEFAULT_LOCALE: &str = "ja_JP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub root: PathBuf,
    pub region: String,
    pub locale: String,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, region: impl Into<String>, locale: impl Into<String>) -> Self {
        DataLayout {
            root: root.into(),
            region: region.into(),
            locale: locale.into(),
        }
    }

    pub fn region_dir(&self) -> PathBuf {
        self.root.join(&self.region)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.region_dir().join("bin")
    }

    pub fn language_dir(&self) -> PathBuf {
        self.region_dir().join("language").join(&self.locale)
    }

    pub fn bin_path(&self, table: &str) -> PathBuf {
        self.bin_dir().join(format!("{table}.json"))
    }

    pub fn text_path(&self, table: &str) -> PathBuf {
        self.language_dir().join(format!("{table}.json"))
    }
}
