use std::sync::Arc;

use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::storage::Storage;

/// CRUD over companies.
///
/// Built per request from the storage handle in `AppState`.
pub struct CompanyService {
    storage: Arc<dyn Storage>,
}

impl CompanyService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Every company with its partners already populated.
    pub async fn list_all(&self) -> Result<Vec<Company>, AppError> {
        self.storage.find_all_companies().await
    }

    /// `None` when the id does not resolve; the caller picks the response.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Company>, AppError> {
        self.storage.find_company(id).await
    }

    /// Validates the fields and persists a new company.
    pub async fn create(&self, fields: CompanyFields) -> Result<Company, AppError> {
        let new_company = fields.validate()?;
        let company = self
            .storage
            .insert_company(new_company)
            .await
            .context("creating company")?;

        tracing::info!("Company {} created", company.id);
        Ok(company)
    }

    /// Replaces legal name and tax id wholesale.
    pub async fn update(
        &self,
        mut company: Company,
        fields: CompanyFields,
    ) -> Result<Company, AppError> {
        let NewCompany { legal_name, tax_id } = fields.validate()?;
        company.legal_name = legal_name;
        company.tax_id = tax_id;

        self.storage
            .save_company(&company)
            .await
            .with_context(|| format!("updating company {}", company.id))?;

        tracing::info!("Company {} updated", company.id);
        Ok(company)
    }

    /// Removes the company and every partner it owns.
    pub async fn delete(&self, company: Company) -> Result<Vec<i64>, AppError> {
        let removed = self
            .storage
            .remove_company_cascade(company.id)
            .await
            .with_context(|| format!("deleting company {}", company.id))?;

        tracing::info!(
            "Company {} deleted along with {} partner(s)",
            company.id,
            removed.len()
        );
        Ok(removed)
    }
}

/// CRUD over partners. Every write checks that the owning company exists.
pub struct PartnerService {
    storage: Arc<dyn Storage>,
}

impl PartnerService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn list_all(&self) -> Result<Vec<Partner>, AppError> {
        self.storage.find_all_partners().await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Partner>, AppError> {
        self.storage.find_partner(id).await
    }

    /// Persists a new partner linked to `fields.company_id`.
    ///
    /// Nothing is written when the company does not exist.
    pub async fn create(&self, fields: PartnerFields) -> Result<Partner, AppError> {
        let new_partner = fields.validate()?;
        self.require_company(new_partner.company_id).await?;

        let partner = self.storage.insert_partner(new_partner).await?;

        tracing::info!(
            "Partner {} created for company {}",
            partner.id,
            partner.company_id
        );
        Ok(partner)
    }

    /// Replaces name, CPF and owning company wholesale.
    pub async fn update(
        &self,
        mut partner: Partner,
        fields: PartnerFields,
    ) -> Result<Partner, AppError> {
        let NewPartner {
            name,
            personal_tax_id,
            company_id,
        } = fields.validate()?;
        self.require_company(company_id).await?;

        let previous_company = partner.company_id;
        partner.name = name;
        partner.personal_tax_id = personal_tax_id;
        partner.company_id = company_id;

        self.storage.save_partner(&partner).await?;

        if previous_company != company_id {
            tracing::info!(
                "Partner {} moved from company {} to {}",
                partner.id,
                previous_company,
                company_id
            );
        } else {
            tracing::info!("Partner {} updated", partner.id);
        }
        Ok(partner)
    }

    /// Removes the partner only; its company stays.
    pub async fn delete(&self, partner: Partner) -> Result<(), AppError> {
        self.storage
            .remove_partner(partner.id)
            .await
            .with_context(|| format!("deleting partner {}", partner.id))?;

        tracing::info!("Partner {} deleted", partner.id);
        Ok(())
    }

    async fn require_company(&self, company_id: i64) -> Result<(), AppError> {
        if self.storage.find_company(company_id).await?.is_none() {
            tracing::debug!("Company {} not found while linking partner", company_id);
            return Err(AppError::company_missing());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(MemoryStore::new())
    }

    fn acme() -> CompanyFields {
        CompanyFields {
            legal_name: "Acme".to_string(),
            tax_id: "12345678901234".to_string(),
        }
    }

    fn partner_of(name: &str, company_id: i64) -> PartnerFields {
        PartnerFields {
            name: name.to_string(),
            personal_tax_id: "111".to_string(),
            company_id: Some(company_id),
        }
    }

    #[tokio::test]
    async fn test_create_company_is_retrievable() {
        let companies = CompanyService::new(storage());

        let created = companies.create(acme()).await.unwrap();
        let found = companies.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found, created);
        assert_eq!(found.legal_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_create_company_rejects_empty_fields() {
        let store = storage();
        let companies = CompanyService::new(store.clone());

        let err = companies
            .create(CompanyFields {
                legal_name: String::new(),
                tax_id: "12345678901234".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.find_all_companies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_company_overwrites_fields() {
        let companies = CompanyService::new(storage());
        let created = companies.create(acme()).await.unwrap();

        let updated = companies
            .update(
                created.clone(),
                CompanyFields {
                    legal_name: "Acme Holding".to_string(),
                    tax_id: "98.765.432/1098-76".to_string(),
                },
            )
            .await
            .unwrap();

        let found = companies.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, updated);
        assert_eq!(found.tax_id, "98765432109876");
    }

    #[tokio::test]
    async fn test_create_partner_for_missing_company_persists_nothing() {
        let store = storage();
        let partners = PartnerService::new(store.clone());

        let err = partners.create(partner_of("Ana", 7)).await.unwrap_err();

        assert!(matches!(err, AppError::ReferentialIntegrity(_)));
        assert!(partners.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_company_cascades() {
        let store = storage();
        let companies = CompanyService::new(store.clone());
        let partners = PartnerService::new(store.clone());
        let company = companies.create(acme()).await.unwrap();
        let ana = partners.create(partner_of("Ana", company.id)).await.unwrap();
        let bia = partners.create(partner_of("Bia", company.id)).await.unwrap();

        let company = companies.get_by_id(company.id).await.unwrap().unwrap();
        let removed = companies.delete(company).await.unwrap();

        assert_eq!(removed, vec![ana.id, bia.id]);
        assert!(partners.get_by_id(ana.id).await.unwrap().is_none());
        assert!(partners.get_by_id(bia.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_partner_moves_between_companies() {
        let store = storage();
        let companies = CompanyService::new(store.clone());
        let partners = PartnerService::new(store.clone());
        let first = companies.create(acme()).await.unwrap();
        let second = companies.create(acme()).await.unwrap();
        let ana = partners.create(partner_of("Ana", first.id)).await.unwrap();

        partners
            .update(ana.clone(), partner_of("Ana", second.id))
            .await
            .unwrap();

        let first = companies.get_by_id(first.id).await.unwrap().unwrap();
        let second = companies.get_by_id(second.id).await.unwrap().unwrap();
        assert!(first.partners.is_empty());
        assert_eq!(second.partners.len(), 1);
        assert_eq!(second.partners[0].id, ana.id);
    }

    #[tokio::test]
    async fn test_update_partner_to_missing_company_fails() {
        let store = storage();
        let companies = CompanyService::new(store.clone());
        let partners = PartnerService::new(store.clone());
        let company = companies.create(acme()).await.unwrap();
        let ana = partners.create(partner_of("Ana", company.id)).await.unwrap();

        let err = partners
            .update(ana.clone(), partner_of("Ana", company.id + 100))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ReferentialIntegrity(_)));
        assert_eq!(partners.get_by_id(ana.id).await.unwrap(), Some(ana));
    }

    #[tokio::test]
    async fn test_delete_partner_keeps_company() {
        let store = storage();
        let companies = CompanyService::new(store.clone());
        let partners = PartnerService::new(store.clone());
        let company = companies.create(acme()).await.unwrap();
        let ana = partners.create(partner_of("Ana", company.id)).await.unwrap();

        partners.delete(ana).await.unwrap();

        let company = companies.get_by_id(company.id).await.unwrap().unwrap();
        assert!(company.partners.is_empty());
    }
}
