//! Plate-map ingestion for the proteomics analysis platform.
//!
//! A plate map describes the samples on a plate and the raw MS files acquired
//! from them. [`ingest::Ingestor`] validates it locally, then registers the
//! plate, its samples and MS data records, and transfers or links the files.

pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod output;
pub mod paths;
pub mod platemap;
pub mod platform;
pub mod samples;
pub mod schema;
pub mod serialize;
pub mod storage;
pub mod table;
