use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::{CatalogSource, SectorNumber};
use crate::error::TessError;
use crate::table::{CsvOptions, Table};

/// Local cache layout under one base directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn sector_catalog_path(&self, sector: SectorNumber) -> Utf8PathBuf {
        self.root.join(format!("TESS_targets_S{}.csv", sector.padded()))
    }

    pub fn noise_path(&self, sector: SectorNumber) -> Utf8PathBuf {
        self.root.join(format!("TESS_noise_S{}.csv", sector.padded()))
    }

    pub fn toi_path(&self, source: CatalogSource) -> Utf8PathBuf {
        self.root
            .join("toi")
            .join(format!("toi_catalog_{}.csv", source.as_str()))
    }

    pub fn metadata_path(&self, name: &str) -> Utf8PathBuf {
        self.root.join("metadata").join(format!("{name}.json"))
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().is_file()
    }

    pub fn read_table(path: &Utf8Path) -> Result<Table, TessError> {
        Table::read_csv_path(path, CsvOptions::indexed())
    }

    /// Writes into a temp file beside `path` and renames it into place, so a
    /// reader never sees a half-written table.
    pub fn write_table_atomic(path: &Utf8Path, table: &Table) -> Result<(), TessError> {
        let bytes = table.to_csv_bytes()?;
        Self::write_bytes_atomic(path, &bytes)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), TessError> {
        let parent = path
            .parent()
            .ok_or_else(|| TessError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| TessError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("tess-cat")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| TessError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| TessError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| TessError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &Metadata) -> Result<(), TessError> {
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| TessError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn read_metadata(path: &Utf8Path) -> Result<Metadata, TessError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| TessError::Filesystem(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| TessError::Filesystem(err.to_string()))
    }
}

/// Sidecar written next to every downloaded table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub dataset: String,
    pub source_url: String,
    pub rows: usize,
    pub downloaded_at: String,
    pub tool: String,
    pub resolved_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new(Utf8PathBuf::from("/data/tess"));
        let sector = SectorNumber::new(5).unwrap();

        assert!(store
            .sector_catalog_path(sector)
            .ends_with("TESS_targets_S005.csv"));
        assert!(store.noise_path(sector).ends_with("TESS_noise_S005.csv"));
        assert!(store
            .toi_path(CatalogSource::Mit)
            .ends_with("toi/toi_catalog_mit.csv"));
    }

    #[test]
    fn atomic_write_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("nested").join("file.csv");

        Store::write_bytes_atomic(&path, b"first").unwrap();
        Store::write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(path.as_std_path()).unwrap(), b"second");
    }
}
