//! Fixed partner directory with a switchable outage mode.

use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use freightbook_core::store::{DirectoryError, PartnerDirectory};
use freightbook_shared::types::PartnerId;

/// In-memory [`PartnerDirectory`] over a fixed partner set.
///
/// `set_available(false)` makes every lookup fail, standing in for the
/// remote directory's circuit breaker being open.
#[derive(Debug)]
pub struct StaticPartnerDirectory {
    known: RwLock<HashSet<PartnerId>>,
    available: AtomicBool,
}

impl Default for StaticPartnerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPartnerDirectory {
    /// Creates an empty, available directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known: RwLock::new(HashSet::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Creates a directory knowing the given partners.
    #[must_use]
    pub fn with_partners(partners: &[PartnerId]) -> Self {
        let directory = Self::new();
        for partner in partners {
            directory.register(*partner);
        }
        directory
    }

    /// Adds a partner.
    pub fn register(&self, partner: PartnerId) {
        if let Ok(mut known) = self.known.write() {
            known.insert(partner);
        }
    }

    /// Toggles outage mode.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl PartnerDirectory for StaticPartnerDirectory {
    async fn exists(&self, partner: PartnerId) -> Result<bool, DirectoryError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable(
                "partner directory offline".into(),
            ));
        }
        let known = self
            .known
            .read()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".into()))?;
        Ok(known.contains(&partner))
    }
}
