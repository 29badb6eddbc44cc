use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::Storage;
use crate::errors::{AppError, COMPANY_NOT_FOUND, PARTNER_NOT_FOUND};
use crate::models::{Company, NewCompany, NewPartner, Partner};

#[derive(Debug, Clone)]
struct CompanyRecord {
    legal_name: Option<String>,
    tax_id: String,
    /// Owned partner ids in insertion order.
    partners: Vec<i64>,
}

#[derive(Debug, Clone)]
struct PartnerRecord {
    name: String,
    personal_tax_id: String,
    company_id: i64,
}

/// Records keyed by id. Companies own the partner list; partners hold the
/// back reference. Both sides are only changed through `link` and `unlink`.
#[derive(Debug)]
struct Arena {
    companies: BTreeMap<i64, CompanyRecord>,
    partners: BTreeMap<i64, PartnerRecord>,
    next_company_id: i64,
    next_partner_id: i64,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            companies: BTreeMap::new(),
            partners: BTreeMap::new(),
            next_company_id: 1,
            next_partner_id: 1,
        }
    }
}

impl Arena {
    fn company(&self, id: i64) -> Option<Company> {
        let record = self.companies.get(&id)?;
        let partners = record
            .partners
            .iter()
            .filter_map(|partner_id| self.partner(*partner_id))
            .collect();

        Some(Company {
            id,
            legal_name: record.legal_name.clone(),
            tax_id: record.tax_id.clone(),
            partners,
        })
    }

    fn partner(&self, id: i64) -> Option<Partner> {
        self.partners.get(&id).map(|record| Partner {
            id,
            name: record.name.clone(),
            personal_tax_id: record.personal_tax_id.clone(),
            company_id: record.company_id,
        })
    }

    /// Points `partner_id` at `company_id`, detaching it from its previous
    /// company first. The partner record must already exist.
    fn link(&mut self, partner_id: i64, company_id: i64) -> Result<(), AppError> {
        if !self.companies.contains_key(&company_id) {
            return Err(AppError::company_missing());
        }
        let previous = self
            .partners
            .get(&partner_id)
            .map(|record| record.company_id)
            .ok_or_else(|| AppError::NotFound(PARTNER_NOT_FOUND.to_string()))?;

        if previous == company_id
            && self
                .companies
                .get(&company_id)
                .is_some_and(|c| c.partners.contains(&partner_id))
        {
            return Ok(());
        }

        self.unlink(partner_id);
        if let Some(record) = self.partners.get_mut(&partner_id) {
            record.company_id = company_id;
        }
        if let Some(company) = self.companies.get_mut(&company_id) {
            company.partners.push(partner_id);
        }
        Ok(())
    }

    /// Drops `partner_id` from whichever company currently lists it.
    fn unlink(&mut self, partner_id: i64) {
        let Some(company_id) = self.partners.get(&partner_id).map(|p| p.company_id) else {
            return;
        };
        if let Some(company) = self.companies.get_mut(&company_id) {
            company.partners.retain(|id| *id != partner_id);
        }
    }
}

/// In-memory storage backend.
///
/// Used when no database is configured and by the test suite. State lives for
/// the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    arena: RwLock<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_company(&self, id: i64) -> Result<Option<Company>, AppError> {
        Ok(self.arena.read().await.company(id))
    }

    async fn find_all_companies(&self) -> Result<Vec<Company>, AppError> {
        let arena = self.arena.read().await;
        Ok(arena
            .companies
            .keys()
            .filter_map(|id| arena.company(*id))
            .collect())
    }

    async fn insert_company(&self, company: NewCompany) -> Result<Company, AppError> {
        let mut arena = self.arena.write().await;
        let id = arena.next_company_id;
        arena.next_company_id += 1;
        arena.companies.insert(
            id,
            CompanyRecord {
                legal_name: company.legal_name.clone(),
                tax_id: company.tax_id.clone(),
                partners: Vec::new(),
            },
        );

        Ok(Company {
            id,
            legal_name: company.legal_name,
            tax_id: company.tax_id,
            partners: Vec::new(),
        })
    }

    async fn save_company(&self, company: &Company) -> Result<(), AppError> {
        let mut arena = self.arena.write().await;
        let record = arena
            .companies
            .get_mut(&company.id)
            .ok_or_else(|| AppError::NotFound(COMPANY_NOT_FOUND.to_string()))?;
        record.legal_name = company.legal_name.clone();
        record.tax_id = company.tax_id.clone();
        Ok(())
    }

    async fn remove_company_cascade(&self, id: i64) -> Result<Vec<i64>, AppError> {
        let mut arena = self.arena.write().await;
        let record = arena
            .companies
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(COMPANY_NOT_FOUND.to_string()))?;

        for partner_id in &record.partners {
            arena.partners.remove(partner_id);
        }
        Ok(record.partners)
    }

    async fn find_partner(&self, id: i64) -> Result<Option<Partner>, AppError> {
        Ok(self.arena.read().await.partner(id))
    }

    async fn find_all_partners(&self) -> Result<Vec<Partner>, AppError> {
        let arena = self.arena.read().await;
        Ok(arena
            .partners
            .keys()
            .filter_map(|id| arena.partner(*id))
            .collect())
    }

    async fn insert_partner(&self, partner: NewPartner) -> Result<Partner, AppError> {
        let mut arena = self.arena.write().await;
        if !arena.companies.contains_key(&partner.company_id) {
            return Err(AppError::company_missing());
        }

        let id = arena.next_partner_id;
        arena.next_partner_id += 1;
        arena.partners.insert(
            id,
            PartnerRecord {
                name: partner.name.clone(),
                personal_tax_id: partner.personal_tax_id.clone(),
                company_id: partner.company_id,
            },
        );
        arena.link(id, partner.company_id)?;

        Ok(Partner {
            id,
            name: partner.name,
            personal_tax_id: partner.personal_tax_id,
            company_id: partner.company_id,
        })
    }

    async fn save_partner(&self, partner: &Partner) -> Result<(), AppError> {
        let mut arena = self.arena.write().await;
        arena.link(partner.id, partner.company_id)?;

        let record = arena
            .partners
            .get_mut(&partner.id)
            .ok_or_else(|| AppError::NotFound(PARTNER_NOT_FOUND.to_string()))?;
        record.name = partner.name.clone();
        record.personal_tax_id = partner.personal_tax_id.clone();
        Ok(())
    }

    async fn remove_partner(&self, id: i64) -> Result<(), AppError> {
        let mut arena = self.arena.write().await;
        if !arena.partners.contains_key(&id) {
            return Err(AppError::NotFound(PARTNER_NOT_FOUND.to_string()));
        }
        arena.unlink(id);
        arena.partners.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_company(name: &str) -> NewCompany {
        NewCompany {
            legal_name: Some(name.to_string()),
            tax_id: "12345678901234".to_string(),
        }
    }

    fn new_partner(name: &str, company_id: i64) -> NewPartner {
        NewPartner {
            name: name.to_string(),
            personal_tax_id: "111".to_string(),
            company_id,
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_not_reused() {
        let store = MemoryStore::new();
        let first = store.insert_company(new_company("A")).await.unwrap();
        let second = store.insert_company(new_company("B")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        store.remove_company_cascade(second.id).await.unwrap();
        let third = store.insert_company(new_company("C")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_insert_partner_requires_company() {
        let store = MemoryStore::new();
        let err = store.insert_partner(new_partner("Ana", 42)).await.unwrap_err();

        assert!(matches!(err, AppError::ReferentialIntegrity(_)));
        assert!(store.find_all_partners().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cascade_removes_owned_partners_only() {
        let store = MemoryStore::new();
        let acme = store.insert_company(new_company("Acme")).await.unwrap();
        let other = store.insert_company(new_company("Other")).await.unwrap();
        let ana = store.insert_partner(new_partner("Ana", acme.id)).await.unwrap();
        let bia = store.insert_partner(new_partner("Bia", acme.id)).await.unwrap();
        let caio = store.insert_partner(new_partner("Caio", other.id)).await.unwrap();

        let removed = store.remove_company_cascade(acme.id).await.unwrap();

        assert_eq!(removed, vec![ana.id, bia.id]);
        assert!(store.find_partner(ana.id).await.unwrap().is_none());
        assert!(store.find_partner(bia.id).await.unwrap().is_none());
        assert!(store.find_partner(caio.id).await.unwrap().is_some());
        assert!(store.find_company(acme.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reassign_moves_partner_between_lists() {
        let store = MemoryStore::new();
        let acme = store.insert_company(new_company("Acme")).await.unwrap();
        let other = store.insert_company(new_company("Other")).await.unwrap();
        let mut ana = store.insert_partner(new_partner("Ana", acme.id)).await.unwrap();

        ana.company_id = other.id;
        ana.name = "Ana Maria".to_string();
        store.save_partner(&ana).await.unwrap();

        let acme = store.find_company(acme.id).await.unwrap().unwrap();
        let other = store.find_company(other.id).await.unwrap().unwrap();
        assert!(acme.partners.is_empty());
        assert_eq!(other.partners, vec![ana]);
    }

    #[tokio::test]
    async fn test_save_partner_to_missing_company_changes_nothing() {
        let store = MemoryStore::new();
        let acme = store.insert_company(new_company("Acme")).await.unwrap();
        let ana = store.insert_partner(new_partner("Ana", acme.id)).await.unwrap();

        let moved = Partner {
            company_id: 99,
            name: "Renamed".to_string(),
            ..ana.clone()
        };
        let err = store.save_partner(&moved).await.unwrap_err();

        assert!(matches!(err, AppError::ReferentialIntegrity(_)));
        assert_eq!(store.find_partner(ana.id).await.unwrap(), Some(ana));
    }

    #[tokio::test]
    async fn test_remove_partner_keeps_company() {
        let store = MemoryStore::new();
        let acme = store.insert_company(new_company("Acme")).await.unwrap();
        let ana = store.insert_partner(new_partner("Ana", acme.id)).await.unwrap();

        store.remove_partner(ana.id).await.unwrap();

        let acme = store.find_company(acme.id).await.unwrap().unwrap();
        assert!(acme.partners.is_empty());
        assert!(matches!(
            store.remove_partner(ana.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
