use crate::domain::SectorNumber;

pub const CALTECH_TOI_URL: &str =
    "https://exoplanetarchive.ipac.caltech.edu/cgi-bin/nstedAPI/nph-nstedAPI?table=toi";
pub const MIT_TOI_URL: &str = "https://tev.mit.edu/data/collection/193/csv/6/";
pub const MAST_INVOKE_URL: &str = "https://mast.stsci.edu/api/v0/invoke";

pub fn sector_pointings_url(sector: SectorNumber) -> String {
    format!(
        "https://tess.mit.edu/wp-content/uploads/all_targets_S{}_v1.csv",
        sector.padded()
    )
}

/// Returns `None` for an unrecognized catalog source name.
pub fn toi_url(catalog_source: &str) -> Option<&'static str> {
    match catalog_source {
        "caltech" => Some(CALTECH_TOI_URL),
        "mit" => Some(MIT_TOI_URL),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_url_is_padded() {
        let sector = SectorNumber::new(5).unwrap();
        assert_eq!(
            sector_pointings_url(sector),
            "https://tess.mit.edu/wp-content/uploads/all_targets_S005_v1.csv"
        );
    }

    #[test]
    fn unknown_source_has_no_url() {
        assert!(toi_url("kepler").is_none());
        assert_eq!(toi_url("mit"), Some(MIT_TOI_URL));
    }
}
