use crate::domain::loan::CopyDetails;
use crate::domain::value_objects::{BookId, CopyId, DomainId, EditionId};
use crate::ports::catalog_service::{CatalogService as CatalogServiceTrait, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Mock implementation of CatalogService
///
/// Stores copies already resolved to edition, title and domains.
pub struct CatalogService {
    copies: Mutex<HashMap<CopyId, CopyDetails>>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self {
            copies: Mutex::new(HashMap::new()),
        }
    }

    /// Register a copy for testing purposes
    pub fn add_copy(&self, details: CopyDetails) {
        self.copies.lock().unwrap().insert(details.copy_id, details);
    }

    /// Register a fresh copy of `book_id` in the given domains and return its id
    pub fn add_copy_of(&self, book_id: BookId, domain_ids: &[DomainId]) -> CopyId {
        let copy_id = CopyId::new();
        self.add_copy(CopyDetails {
            copy_id,
            edition_id: EditionId::new(),
            book_id,
            domain_ids: domain_ids.iter().copied().collect::<BTreeSet<_>>(),
        });
        copy_id
    }
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogServiceTrait for CatalogService {
    async fn resolve_copy(&self, copy_id: CopyId) -> Result<Option<CopyDetails>> {
        Ok(self.copies.lock().unwrap().get(&copy_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_resolves_to_title_and_domains() {
        let catalog = CatalogService::new();
        let book_id = BookId::new();
        let domain = DomainId::new();
        let copy_id = catalog.add_copy_of(book_id, &[domain, domain]);

        let details = catalog.resolve_copy(copy_id).await.unwrap().unwrap();
        assert_eq!(details.book_id, book_id);
        assert_eq!(details.domain_ids.len(), 1);
        assert!(catalog.resolve_copy(CopyId::new()).await.unwrap().is_none());
    }
}
