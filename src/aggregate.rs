use std::collections::HashMap;

use crate::domain::SectorNumber;
use crate::error::TessError;
use crate::table::{Table, normalize_identifier};

pub const IDENTIFIER_COLUMN: &str = "ticid";
pub const NOISE_COLUMN: &str = "noise";
pub const SECTORS_COLUMN: &str = "sectors";

/// Noise placeholder for a sector whose catalog has no noise value.
pub const MISSING_NOISE: &str = "nan";

/// Per-star record of which sectors observed it and the noise in each,
/// accumulated one sector table at a time.
#[derive(Debug, Default)]
pub struct SectorMembership {
    sectors: HashMap<String, String>,
    noises: HashMap<String, String>,
    counts: HashMap<String, usize>,
}

impl SectorMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sector: SectorNumber, table: &Table) -> Result<(), TessError> {
        let context = format!("sector {sector} catalog");
        let id_idx = table.require_column(IDENTIFIER_COLUMN, &context)?;
        let noise_idx = table.column_index(NOISE_COLUMN);

        for row in table.rows() {
            let ticid = normalize_identifier(&row[id_idx]);
            let noise = noise_idx
                .map(|idx| row[idx].trim())
                .filter(|value| !value.is_empty())
                .unwrap_or(MISSING_NOISE);

            match self.counts.get_mut(&ticid) {
                Some(count) => {
                    *count += 1;
                    append(&mut self.sectors, &ticid, &sector.to_string());
                    append(&mut self.noises, &ticid, noise);
                }
                None => {
                    self.counts.insert(ticid.clone(), 1);
                    self.sectors.insert(ticid.clone(), sector.to_string());
                    self.noises.insert(ticid, noise.to_string());
                }
            }
        }
        Ok(())
    }

    pub fn sectors_of(&self, ticid: &str) -> Option<&str> {
        self.sectors
            .get(&normalize_identifier(ticid))
            .map(String::as_str)
    }

    pub fn noises_of(&self, ticid: &str) -> Option<&str> {
        self.noises
            .get(&normalize_identifier(ticid))
            .map(String::as_str)
    }

    pub fn count_of(&self, ticid: &str) -> usize {
        self.counts
            .get(&normalize_identifier(ticid))
            .copied()
            .unwrap_or(0)
    }

    pub fn distinct_stars(&self) -> usize {
        self.counts.len()
    }

    pub fn multi_sector_stars(&self) -> usize {
        self.counts.values().filter(|&&count| count > 1).count()
    }

    /// Writes the accumulated `sectors` and `noise` strings onto a table that
    /// already holds one row per star.
    pub fn annotate(&self, table: &mut Table) -> Result<(), TessError> {
        let ids = table
            .column(IDENTIFIER_COLUMN)
            .ok_or_else(|| TessError::MissingColumn {
                column: IDENTIFIER_COLUMN.to_string(),
                context: "aggregate catalog".to_string(),
            })?
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let sectors = ids
            .iter()
            .map(|id| self.sectors_of(id).unwrap_or_default().to_string())
            .collect();
        let noises = ids
            .iter()
            .map(|id| self.noises_of(id).unwrap_or_default().to_string())
            .collect();
        table.set_column(SECTORS_COLUMN, sectors)?;
        table.set_column(NOISE_COLUMN, noises)?;
        Ok(())
    }
}

fn append(map: &mut HashMap<String, String>, key: &str, value: &str) {
    if let Some(existing) = map.get_mut(key) {
        existing.push(',');
        existing.push_str(value);
    }
}
