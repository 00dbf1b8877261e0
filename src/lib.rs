//! TESS target catalogs: per-sector pointing lists joined with TIC stellar
//! parameters and local photometric noise, plus TOI tables, all cached under
//! one base directory.

pub mod aggregate;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod mast;
pub mod output;
pub mod store;
pub mod table;
pub mod toi;
pub mod urls;
