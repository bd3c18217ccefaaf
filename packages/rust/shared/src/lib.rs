//! Shared types, error model, and configuration for Agency LeadGen.
//!
//! This crate is the foundation depended on by all other LeadGen crates.
//! It provides:
//! - [`LeadGenError`]: the unified error type
//! - Domain types ([`LeadRecord`], [`LeadScore`], [`ExportRow`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GoogleSheetsConfig, LlmConfig, OutputConfig, OutreachConfig, PipelineConfig,
    ScrapingConfig, SearchConfig, SheetsTarget, config_dir, config_file_path, init_config,
    load_config, load_config_from, mask_secret,
};
pub use error::{LeadGenError, Result};
pub use types::{
    ContactStatus, EXPORT_HEADERS, EnrichmentStatus, ExportRow, LeadRecord, LeadScore, RunId,
    word_count,
};
