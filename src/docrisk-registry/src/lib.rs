//! # docrisk-registry
//!
//! Broker registry for document risk assessment.
//!
//! The registry is the authoritative list of legitimate
//! `(name, registration number)` pairs. During analysis it is strictly
//! read-only; population happens through a separate administrative
//! ingestion step (see the `docrisk-registry` tool).
//!
//! ## Lifecycle
//!
//! ```text
//!  .xlsx / .csv / .json ──read_source_records()──► SqliteStore::import
//!                                                        │
//!                     ┌──────────────────────────────────┘
//!                     ▼ load_registry()
//!              BrokerRegistry (immutable)
//!                     │
//!                     ▼ publish()
//!              RegistryHandle ──snapshot()──► Arc<BrokerRegistry> ──► lookups
//! ```
//!
//! ## Matching
//!
//! Lookups are exact and case-sensitive by default. No whitespace or case
//! normalization happens unless [`MatchPolicy::CaseInsensitive`] is chosen.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::pedantic)] // Too strict for production code
#![allow(clippy::module_name_repetitions)] // Allow Type in module::Type
#![allow(clippy::must_use_candidate)] // Not all functions need must_use

mod error;
mod handle;
mod snapshot;
mod source;
mod store;

pub use error::RegistryError;
pub use handle::RegistryHandle;
pub use snapshot::{BrokerLookup, BrokerRecord, BrokerRegistry, MatchPolicy};
pub use source::{read_csv_records, read_source_records, read_workbook_records, SourceFormat};
pub use store::{
    load_registry, read_json_records, write_json_records, ImportSummary, RegistryFormat,
    SqliteStore,
};
