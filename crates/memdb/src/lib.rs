//! In-memory implementations of the Freightbook store and collaborator
//! contracts.
//!
//! This crate is the test substrate and the demo backing store. The
//! persistent database lives behind the same traits in the surrounding
//! system and is out of scope here.
//!
//! - [`MemoryStore`] - versioned maps with commit-time optimistic-lock
//!   validation and all-or-nothing application of staged writes
//! - [`MemoryRateSource`] - foreign→base quote table with a refreshable
//!   feed standing in for the scheduled rate scraper
//! - [`StaticPartnerDirectory`] - a fixed partner set that can simulate
//!   directory outages

pub mod directory;
pub mod rates;
pub mod store;

pub use directory::StaticPartnerDirectory;
pub use rates::MemoryRateSource;
pub use store::MemoryStore;
