//! Persistence for companies and partners.
//!
//! Every mutating call is durable when it returns. There is no optimistic
//! concurrency control: concurrent writers race and the last one wins.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Company, NewCompany, NewPartner, Partner};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name reported by the health check.
    fn backend(&self) -> &'static str;

    /// Looks up a company with its partners populated.
    async fn find_company(&self, id: i64) -> Result<Option<Company>, AppError>;

    /// Every company, each with its partners loaded in the same pass.
    async fn find_all_companies(&self) -> Result<Vec<Company>, AppError>;

    async fn insert_company(&self, company: NewCompany) -> Result<Company, AppError>;

    /// Overwrites the legal name and tax id. Partners are left untouched.
    async fn save_company(&self, company: &Company) -> Result<(), AppError>;

    /// Removes a company together with every partner it owns.
    ///
    /// Returns the ids of the removed partners.
    async fn remove_company_cascade(&self, id: i64) -> Result<Vec<i64>, AppError>;

    async fn find_partner(&self, id: i64) -> Result<Option<Partner>, AppError>;

    async fn find_all_partners(&self) -> Result<Vec<Partner>, AppError>;

    /// Persists a partner and links it to its company.
    ///
    /// Fails with `ReferentialIntegrity` if the company does not exist.
    async fn insert_partner(&self, partner: NewPartner) -> Result<Partner, AppError>;

    /// Overwrites a partner, moving it to another company when `company_id` changed.
    async fn save_partner(&self, partner: &Partner) -> Result<(), AppError>;

    /// Removes a partner. Its company is not affected.
    async fn remove_partner(&self, id: i64) -> Result<(), AppError>;
}
