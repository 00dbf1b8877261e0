use std::io::Write;

use assert_matches::assert_matches;
use serde_json::json;
use tess_catalogs::config::{Config, ConfigLoader, DEFAULT_SECTOR_COUNT};
use tess_catalogs::domain::{SectorNumber, SectorSelector};
use tess_catalogs::error::TessError;

#[test]
fn parse_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"base_path": "/srv/tess", "sector_count": 30, "verbose": false, "sectors": [3, 4, 7]}}"#
    )
    .unwrap();

    let settings = ConfigLoader::resolve(file.path().to_str()).unwrap();
    assert_eq!(settings.base_path, "/srv/tess");
    assert_eq!(settings.sector_count, 30);
    assert!(!settings.verbose);
    assert!(!settings.force_redownload);
    assert_eq!(
        settings.sectors,
        SectorSelector::Subset(
            [3, 4, 7]
                .into_iter()
                .map(|value| SectorNumber::new(value).unwrap())
                .collect()
        )
    );
}

#[test]
fn all_sectors_flag() {
    let config = Config {
        sectors: Some(json!(true)),
        ..Config::default()
    };
    let settings = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(settings.sectors, SectorSelector::All);
    assert_eq!(settings.sector_count, DEFAULT_SECTOR_COUNT);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(TessError::ConfigRead(_))
    );
}

#[test]
fn malformed_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ sector_count: ").unwrap();
    assert_matches!(
        ConfigLoader::resolve(file.path().to_str()),
        Err(TessError::ConfigParse(_))
    );

    let config = Config {
        sector_count: Some(0),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(TessError::InvalidArgument(_))
    );
}
