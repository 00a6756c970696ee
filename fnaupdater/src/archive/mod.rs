//! Library archive retrieval.
//!
//! This module provides:
//! - Streaming HTTP downloads (`http`)
//! - `tar`-based extraction (`extractor`)
//! - The download → extract → delete sequence (`fetcher`)

mod extractor;
mod fetcher;
mod http;

pub use extractor::ShellExtractor;
pub use fetcher::{archive_file_name, ArchiveFetcher, FetchReport};
pub use http::HttpDownloader;
