use std::str::FromStr;

use assert_matches::assert_matches;
use tess_catalogs::domain::{CatalogSource, SectorNumber, SectorSelector};
use tess_catalogs::error::TessError;
use tess_catalogs::urls;

fn sectors(values: &[u32]) -> Vec<SectorNumber> {
    values
        .iter()
        .map(|value| SectorNumber::new(*value).unwrap())
        .collect()
}

#[test]
fn sector_selector_forms() {
    assert_eq!(
        SectorSelector::from_str("all").unwrap().sectors(3),
        sectors(&[1, 2, 3])
    );
    assert_eq!(
        SectorSelector::from_str("5").unwrap().sectors(27),
        sectors(&[5])
    );
    assert_eq!(
        SectorSelector::from_str("3,4,7").unwrap().sectors(27),
        sectors(&[3, 4, 7])
    );
    assert_eq!(
        SectorSelector::from_str("3-5").unwrap().sectors(27),
        sectors(&[3, 4, 5])
    );
}

#[test]
fn invalid_selectors() {
    for input in ["3.5", "0", "", "five", "7-3"] {
        assert_matches!(
            SectorSelector::from_str(input),
            Err(TessError::InvalidArgument(_)),
            "{input}"
        );
    }
}

#[test]
fn fractional_sector_rejected_everywhere() {
    assert_matches!(
        "3.5".parse::<SectorSelector>(),
        Err(TessError::InvalidArgument(_))
    );
    assert_matches!(
        SectorSelector::from_value(&serde_json::json!(3.5)),
        Err(TessError::InvalidArgument(_))
    );
    assert_matches!(
        SectorSelector::from_value(&serde_json::json!([3, 4.5])),
        Err(TessError::InvalidArgument(_))
    );
}

#[test]
fn catalog_sources() {
    assert_eq!(CatalogSource::from_str("mit").unwrap(), CatalogSource::Mit);
    assert_eq!(CatalogSource::Caltech.url(), urls::CALTECH_TOI_URL);
    assert_matches!(
        CatalogSource::from_str("harvard"),
        Err(TessError::UnknownCatalogSource(name)) if name == "harvard"
    );
}

#[test]
fn pointing_url_is_zero_padded() {
    let sector = SectorNumber::new(7).unwrap();
    assert_eq!(
        urls::sector_pointings_url(sector),
        "https://tess.mit.edu/wp-content/uploads/all_targets_S007_v1.csv"
    );
}
