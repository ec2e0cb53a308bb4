//! Source catalog and adapters. Each adapter fetches one upstream feed and
//! normalizes its payload into canonical candidates; everything downstream
//! is source-agnostic.

pub mod adapter;
pub mod arxiv;
pub mod crossref;
pub mod github;
pub mod openalex;
pub mod registry;
pub mod rss;
pub mod sitemap;
pub mod synthetic;

pub use adapter::SourceAdapter;
pub use openalex::OpenAlexAdapter;
pub use registry::{adapter_for, get_definition, list_definitions, SOURCE_DEFINITIONS};
