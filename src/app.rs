use std::collections::HashSet;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;

use crate::aggregate::{IDENTIFIER_COLUMN, NOISE_COLUMN, SectorMembership};
use crate::config::{FetchOptions, Settings};
use crate::domain::{CatalogSource, SectorNumber, SectorSelector};
use crate::error::TessError;
use crate::http::{RemoteFetch, user_agent};
use crate::mast::TicCatalog;
use crate::store::{Metadata, Store};
use crate::table::{CsvOptions, JoinKind, Table, normalize_identifier};
use crate::toi;
use crate::urls;

/// Upper bound on sectors probed by [`App::check_sector_count`].
pub const MAX_SECTOR_PROBES: u32 = 1000;

const POINTING_COLUMNS: [&str; 3] = ["TICID", "Camera", "CCD"];
const NOISE_ID_COLUMNS: [&str; 3] = ["ID", "ticid", "TICID"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
}

#[derive(Debug, Clone)]
pub struct DiagnosticEvent {
    pub level: DiagnosticLevel,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
    pub elapsed: Option<Duration>,
}

impl DiagnosticEvent {
    pub fn new(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Vec::new(),
            elapsed: None,
        }
    }

    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }
}

pub trait DiagnosticSink {
    fn event(&self, event: DiagnosticEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    Cache,
    Upgrade,
    Download,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorSummary {
    pub sector: u32,
    pub rows: usize,
    pub has_noise: bool,
    pub action: CacheAction,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StarsResult {
    pub sectors: Vec<SectorSummary>,
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions {
    /// Collapse to one row per star and add `sectors` / `noise` lists.
    pub unique: bool,
    /// Rebuild every sector catalog from the remote sources.
    pub force_resave: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            unique: true,
            force_resave: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorCountReport {
    pub configured: u32,
    pub available: u32,
}

impl SectorCountReport {
    pub fn matches(&self) -> bool {
        self.configured == self.available
    }
}

pub struct App<F: RemoteFetch, C: TicCatalog> {
    settings: Settings,
    store: Store,
    fetch: F,
    tic: C,
}

impl<F: RemoteFetch, C: TicCatalog> App<F, C> {
    pub fn new(settings: Settings, fetch: F, tic: C) -> Self {
        let store = Store::new(settings.base_path.clone());
        Self {
            settings,
            store,
            fetch,
            tic,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The joined TIC + pointing (+ noise) catalog for one sector, from the
    /// local cache when present unless a redownload is forced.
    pub fn stars_from_sector(
        &self,
        sector: SectorNumber,
        options: FetchOptions,
        sink: &dyn DiagnosticSink,
    ) -> Result<Table, TessError> {
        self.load_sector(sector, options, sink).map(|(table, _)| table)
    }

    /// Builds the catalog of every selected sector. Stops at the first failure.
    pub fn stars_for_sectors(
        &self,
        selector: &SectorSelector,
        options: FetchOptions,
        sink: &dyn DiagnosticSink,
    ) -> Result<StarsResult, TessError> {
        let level = progress_level(options.verbose(&self.settings));
        let mut sectors = Vec::new();
        for sector in selector.sectors(self.settings.sector_count) {
            sink.event(
                DiagnosticEvent::new(level, "getting data from TESS sector")
                    .field("sector", sector),
            );
            let (table, action) = match self.load_sector(sector, options, sink) {
                Ok(loaded) => loaded,
                Err(err @ TessError::RemoteDataUnavailable { .. }) => {
                    if matches!(selector, SectorSelector::All) {
                        sink.event(
                            DiagnosticEvent::new(
                                DiagnosticLevel::Warn,
                                "possibly requesting data from a nonexistent sector; run check-sectors to verify the sector count",
                            )
                            .field("sector", sector)
                            .field("sector_count", self.settings.sector_count),
                        );
                    }
                    return Err(err);
                }
                Err(err) => return Err(err),
            };
            sectors.push(SectorSummary {
                sector: sector.get(),
                rows: table.len(),
                has_noise: table.has_column(NOISE_COLUMN),
                action,
                path: self.store.sector_catalog_path(sector).to_string(),
            });
        }
        Ok(StarsResult { sectors })
    }

    /// Merges the selected sector catalogs into one table. With
    /// `catalog.unique` each star appears once, carrying comma-joined
    /// `sectors` and `noise` lists in sector order.
    pub fn stellar_catalog(
        &self,
        selector: &SectorSelector,
        catalog: CatalogOptions,
        options: FetchOptions,
        sink: &dyn DiagnosticSink,
    ) -> Result<Table, TessError> {
        let level = progress_level(options.verbose(&self.settings));
        let sectors = selector.sectors(self.settings.sector_count);
        if sectors.is_empty() {
            return Err(TessError::InvalidArgument("no sectors selected".to_string()));
        }

        let options = FetchOptions {
            force_redownload: Some(catalog.force_resave),
            ..options
        };
        let mut frames = Vec::with_capacity(sectors.len());
        let mut membership = SectorMembership::new();
        for sector in sectors {
            let (table, _) = self.load_sector(sector, options, sink)?;
            if catalog.unique {
                membership.record(sector, &table)?;
            }
            frames.push(table);
        }

        let mut merged = Table::concat(frames);
        if catalog.unique {
            merged.drop_duplicates(IDENTIFIER_COLUMN)?;
            membership.annotate(&mut merged)?;
            sink.event(
                DiagnosticEvent::new(level, "merged sector catalogs")
                    .field("stars", membership.distinct_stars())
                    .field("multi_sector_stars", membership.multi_sector_stars()),
            );
        }
        Ok(merged)
    }

    /// The TOI table of `source`, cached under `toi/`.
    pub fn tois(
        &self,
        source: CatalogSource,
        options: FetchOptions,
        sink: &dyn DiagnosticSink,
    ) -> Result<Table, TessError> {
        let level = progress_level(options.verbose(&self.settings));
        let path = self.store.toi_path(source);
        if !options.force_redownload(&self.settings) && self.store.exists(&path) {
            sink.event(
                DiagnosticEvent::new(level, "using cached TOI table")
                    .field("source", source)
                    .field("path", &path),
            );
            return Store::read_table(&path);
        }

        let url = source.url();
        sink.event(
            DiagnosticEvent::new(level, "retrieving TOI table")
                .field("source", source)
                .field("url", url),
        );
        let start = Instant::now();
        let response = self.fetch.get(url)?;
        if !response.is_success() {
            return Err(TessError::HttpStatus {
                status: response.status,
                message: response.text_lossy(),
            });
        }
        sink.event(
            DiagnosticEvent::new(DiagnosticLevel::Debug, "toi.response")
                .field("bytes", response.body.len())
                .elapsed(start.elapsed()),
        );

        let mut table = Table::from_csv_bytes(&response.body, CsvOptions::indexed())?;
        toi::normalize_columns(source, &mut table);
        Store::write_table_atomic(&path, &table)?;
        self.record_download(&format!("toi_catalog_{source}"), url, &table, &path)?;
        sink.event(
            DiagnosticEvent::new(level, "saved TOI table")
                .field("source", source)
                .field("rows", table.len())
                .field("path", &path),
        );
        Ok(table)
    }

    /// Probes sector pointing lists from sector 1 upward until one is missing
    /// and compares the count with the configured one.
    pub fn check_sector_count(
        &self,
        sink: &dyn DiagnosticSink,
    ) -> Result<SectorCountReport, TessError> {
        let mut available = 0;
        for number in 1..=MAX_SECTOR_PROBES {
            let sector = SectorNumber::new(number)?;
            let response = self.fetch.get(&urls::sector_pointings_url(sector))?;
            if !response.is_success() {
                break;
            }
            available = number;
        }

        let report = SectorCountReport {
            configured: self.settings.sector_count,
            available,
        };
        if !report.matches() {
            sink.event(
                DiagnosticEvent::new(
                    DiagnosticLevel::Warn,
                    "configured sector count differs from available data; update sector_count for the full data",
                )
                .field("configured", report.configured)
                .field("available", report.available),
            );
        }
        Ok(report)
    }

    fn load_sector(
        &self,
        sector: SectorNumber,
        options: FetchOptions,
        sink: &dyn DiagnosticSink,
    ) -> Result<(Table, CacheAction), TessError> {
        let level = progress_level(options.verbose(&self.settings));
        let path = self.store.sector_catalog_path(sector);
        let noise_path = self.store.noise_path(sector);

        if self.store.exists(&path) && !options.force_redownload(&self.settings) {
            let table = Store::read_table(&path)?;
            if !table.has_column(NOISE_COLUMN) && self.store.exists(&noise_path) {
                let table = merge_noise(&table, &noise_path, sector, sink)?;
                Store::write_table_atomic(&path, &table)?;
                sink.event(
                    DiagnosticEvent::new(
                        level,
                        "added photometric noise values to cached sector catalog",
                    )
                    .field("sector", sector)
                    .field("path", &path),
                );
                return Ok((table, CacheAction::Upgrade));
            }
            sink.event(
                DiagnosticEvent::new(DiagnosticLevel::Debug, "using cached sector catalog")
                    .field("sector", sector)
                    .field("path", &path),
            );
            return Ok((table, CacheAction::Cache));
        }

        let url = urls::sector_pointings_url(sector);
        sink.event(
            DiagnosticEvent::new(level, "getting observed targets")
                .field("sector", sector)
                .field("url", &url),
        );
        let start = Instant::now();
        let response = self.fetch.get(&url)?;
        if !response.is_success() {
            return Err(TessError::RemoteDataUnavailable {
                sector: sector.get(),
                status: response.status,
            });
        }
        sink.event(
            DiagnosticEvent::new(DiagnosticLevel::Debug, "pointings.response")
                .field("bytes", response.body.len())
                .elapsed(start.elapsed()),
        );

        let mut pointings = Table::from_csv_bytes(&response.body, CsvOptions::commented())?
            .select(&POINTING_COLUMNS, &format!("sector {sector} target list"))?;
        drop_repeated_identifiers(&mut pointings, "TICID", "target list", sector, sink)?;
        let ids = pointings
            .column("TICID")
            .unwrap_or_default()
            .into_iter()
            .map(normalize_identifier)
            .collect::<Vec<_>>();

        sink.event(
            DiagnosticEvent::new(level, "querying TIC for observed targets")
                .field("sector", sector)
                .field("targets", ids.len()),
        );
        let start = Instant::now();
        let mut stellar = self.tic.query_by_identifiers(&ids)?;
        sink.event(
            DiagnosticEvent::new(DiagnosticLevel::Debug, "tic.response")
                .field("rows", stellar.len())
                .elapsed(start.elapsed()),
        );

        drop_repeated_identifiers(&mut stellar, "ID", "TIC response", sector, sink)?;

        let mut merged = stellar.join(&pointings, "ID", "TICID", JoinKind::Inner)?;
        merged.drop_column("TICID");
        merged.rename_columns(&[("ID", IDENTIFIER_COLUMN)]);

        let matched = merged
            .column(IDENTIFIER_COLUMN)
            .unwrap_or_default()
            .into_iter()
            .map(normalize_identifier)
            .collect::<HashSet<_>>();
        let unmatched = ids.iter().filter(|id| !matched.contains(*id)).count();
        if unmatched > 0 {
            sink.event(
                DiagnosticEvent::new(
                    DiagnosticLevel::Warn,
                    "observed targets without a TIC record were dropped",
                )
                .field("sector", sector)
                .field("dropped", unmatched),
            );
        }

        if self.store.exists(&noise_path) {
            merged = merge_noise(&merged, &noise_path, sector, sink)?;
        } else {
            sink.event(
                DiagnosticEvent::new(
                    DiagnosticLevel::Warn,
                    "noise values not found; place the photometric noise table at the expected path",
                )
                .field("sector", sector)
                .field("path", &noise_path),
            );
        }

        Store::write_table_atomic(&path, &merged)?;
        self.record_download(
            &format!("TESS_targets_S{}", sector.padded()),
            &url,
            &merged,
            &path,
        )?;
        sink.event(
            DiagnosticEvent::new(level, "saved TIC data for sector")
                .field("sector", sector)
                .field("rows", merged.len())
                .field("path", &path),
        );
        Ok((merged, CacheAction::Download))
    }

    fn record_download(
        &self,
        name: &str,
        url: &str,
        table: &Table,
        path: &Utf8Path,
    ) -> Result<(), TessError> {
        let metadata = Metadata {
            dataset: name.to_string(),
            source_url: url.to_string(),
            rows: table.len(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: user_agent(),
            resolved_path: path.to_string(),
        };
        Store::write_metadata(&self.store.metadata_path(name), &metadata)
    }
}

/// Left-joins the noise table at `noise_path` onto `table` by identifier.
fn merge_noise(
    table: &Table,
    noise_path: &Utf8Path,
    sector: SectorNumber,
    sink: &dyn DiagnosticSink,
) -> Result<Table, TessError> {
    let mut noise = Store::read_table(noise_path)?;
    let noise_id = NOISE_ID_COLUMNS
        .iter()
        .copied()
        .find(|name| noise.has_column(name))
        .ok_or_else(|| TessError::MissingColumn {
            column: "ID".to_string(),
            context: format!("noise table {noise_path}"),
        })?;
    drop_repeated_identifiers(&mut noise, noise_id, "noise table", sector, sink)?;
    let mut merged = table.join(&noise, IDENTIFIER_COLUMN, noise_id, JoinKind::Left)?;
    if noise_id != IDENTIFIER_COLUMN {
        merged.drop_column(noise_id);
    }
    Ok(merged)
}

/// A star appears once per sector; later rows with a seen identifier are dropped.
fn drop_repeated_identifiers(
    table: &mut Table,
    column: &str,
    source: &'static str,
    sector: SectorNumber,
    sink: &dyn DiagnosticSink,
) -> Result<(), TessError> {
    let before = table.len();
    table.drop_duplicates(column)?;
    let dropped = before - table.len();
    if dropped > 0 {
        sink.event(
            DiagnosticEvent::new(
                DiagnosticLevel::Warn,
                "repeated identifiers dropped, keeping the first row",
            )
            .field("sector", sector)
            .field("source", source)
            .field("dropped", dropped),
        );
    }
    Ok(())
}

fn progress_level(verbose: bool) -> DiagnosticLevel {
    if verbose {
        DiagnosticLevel::Info
    } else {
        DiagnosticLevel::Debug
    }
}
