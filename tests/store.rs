use camino::Utf8PathBuf;
use tess_catalogs::domain::{CatalogSource, SectorNumber};
use tess_catalogs::store::{Metadata, Store};
use tess_catalogs::table::Table;

fn temp_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, Store::new(root))
}

#[test]
fn layout_paths() {
    let (_temp, store) = temp_store();
    let sector = SectorNumber::new(12).unwrap();

    let catalog = store.sector_catalog_path(sector);
    assert!(catalog.ends_with("TESS_targets_S012.csv"));
    assert!(catalog.starts_with(store.root()));
    assert!(store.noise_path(sector).ends_with("TESS_noise_S012.csv"));
    assert!(store
        .toi_path(CatalogSource::Caltech)
        .ends_with("toi/toi_catalog_caltech.csv"));
    assert!(store
        .metadata_path("TESS_targets_S012")
        .ends_with("metadata/TESS_targets_S012.json"));
}

#[test]
fn cached_table_keeps_columns() {
    let (_temp, store) = temp_store();
    let path = store.toi_path(CatalogSource::Mit);
    let table = Table::from_rows(
        vec!["toi_id".to_string(), "toi_period".to_string()],
        vec![
            vec!["101.01".to_string(), "3.52".to_string()],
            vec!["102.01".to_string(), String::new()],
        ],
    )
    .unwrap();

    Store::write_table_atomic(&path, &table).unwrap();
    assert!(store.exists(&path));
    let content = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert!(content.starts_with(",toi_id,toi_period\n0,101.01,3.52\n"));
    assert_eq!(Store::read_table(&path).unwrap(), table);
}

#[test]
fn metadata_round_trip() {
    let (_temp, store) = temp_store();
    let path = store.metadata_path("toi_catalog_mit");
    let metadata = Metadata {
        dataset: "toi_catalog_mit".to_string(),
        source_url: "https://tev.mit.edu/data/collection/193/csv/6/".to_string(),
        rows: 2,
        downloaded_at: "2026-01-01T00:00:00+00:00".to_string(),
        tool: "tess-cat/0.1.0".to_string(),
        resolved_path: store.toi_path(CatalogSource::Mit).to_string(),
    };

    Store::write_metadata(&path, &metadata).unwrap();
    let loaded = Store::read_metadata(&path).unwrap();
    assert_eq!(loaded.dataset, metadata.dataset);
    assert_eq!(loaded.rows, 2);
    assert!(!store.exists(&store.metadata_path("absent")));
}
