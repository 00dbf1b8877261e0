use crate::domain::CatalogSource;
use crate::table::Table;

/// Verbose MIT column headers and their short names, matching the Exoplanet
/// Archive convention.
pub const MIT_COLUMN_RENAMES: &[(&str, &str)] = &[
    ("Source Pipeline", "pipeline"),
    ("Full TOI ID", "toi_id"),
    ("TOI Disposition", "toi_pdisposition"),
    ("TIC Right Ascension", "tic_ra"),
    ("TIC Declination", "tic_dec"),
    ("TMag Value", "tmag"),
    ("TMag Uncertainty", "tmag_err"),
    ("Orbital Epoch Value", "epoch"),
    ("Orbital Epoch Error", "epoch_err"),
    ("Orbital Period Value", "toi_period"),
    ("Orbital Period Error", "toi_period_err"),
    ("Transit Duration Value", "toi_transit_dur"),
    ("Transit Duration Error", "toi_transit_dur_err"),
    ("Transit Depth Value", "toi_transit_depth"),
    ("Transit Depth Error", "toi_transit_depth_err"),
    ("Sectors", "sectors"),
    ("Public Comment", "comment"),
    ("Surface Gravity Value", "surface_grav"),
    ("Surface Gravity Uncertainty", "surface_grav_err"),
    ("Signal ID", "signal_id"),
    ("Star Radius Value", "srad"),
    ("Star Radius Error", "srad_err"),
    ("Planet Radius Value", "toi_prad"),
    ("Planet Radius Error", "toi_prad_err"),
    ("Planet Equilibrium Temperature (K) Value", "ptemp"),
    ("Effective Temperature Value", "steff"),
    ("Effective Temperature Uncertainty", "steff_err"),
    ("Effective Stellar Flux Value", "sflux"),
    ("Signal-to-noise", "snr"),
    ("Centroid Offset", "centroid_offset"),
    ("TFOP Master", "tfop_master"),
    ("TFOP SG1a", "tfop_sg1a"),
    ("TFOP SG1b", "tfop_sg1b"),
    ("TFOP SG2", "tfop_sg2"),
    ("TFOP SG3", "tfop_sg3"),
    ("TFOP SG4", "tfop_sg4"),
    ("TFOP SG5", "tfop_sg5"),
    ("Alerted", "alerted"),
    ("Updated", "updated"),
];

pub fn normalize_columns(source: CatalogSource, table: &mut Table) {
    match source {
        CatalogSource::Mit => table.rename_columns(MIT_COLUMN_RENAMES),
        CatalogSource::Caltech => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Table {
        Table::new(names.iter().map(|name| name.to_string()).collect())
    }

    #[test]
    fn mit_headers_are_shortened() {
        let mut table = headers(&["Full TOI ID", "Orbital Period Value", "Unlisted"]);
        normalize_columns(CatalogSource::Mit, &mut table);
        assert_eq!(table.columns(), &["toi_id", "toi_period", "Unlisted"]);
    }

    #[test]
    fn caltech_headers_pass_through() {
        let mut table = headers(&["Full TOI ID", "toi_period"]);
        normalize_columns(CatalogSource::Caltech, &mut table);
        assert_eq!(table.columns(), &["Full TOI ID", "toi_period"]);
    }

    #[test]
    fn rename_targets_are_unique() {
        let mut targets = MIT_COLUMN_RENAMES.iter().map(|(_, to)| *to).collect::<Vec<_>>();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), MIT_COLUMN_RENAMES.len());
    }
}
