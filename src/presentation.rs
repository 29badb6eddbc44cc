//! Wire-format views of companies and partners.
//!
//! Field names follow the public JSON contract (`nome`, `cnpj`, `socios`, ...).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Company, Partner};

/// Company list/detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompanyView {
    pub id: i64,
    /// Legal name.
    pub nome: Option<String>,
    pub cnpj: String,
    pub socios: Vec<CompanyPartnerView>,
}

/// Partner as embedded in a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompanyPartnerView {
    pub id: i64,
    pub nome: String,
    pub cpf: String,
}

/// Partner list/detail item. `empresa` carries only the company id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PartnerView {
    pub id: i64,
    pub nome: String,
    pub cpf: String,
    pub empresa: i64,
}

/// Body returned by create operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Body returned by update and delete operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Body returned with every 4xx/5xx.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&Partner> for CompanyPartnerView {
    fn from(partner: &Partner) -> Self {
        Self {
            id: partner.id,
            nome: partner.name.clone(),
            cpf: partner.personal_tax_id.clone(),
        }
    }
}

impl From<Company> for CompanyView {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            socios: company.partners.iter().map(CompanyPartnerView::from).collect(),
            nome: company.legal_name,
            cnpj: company.tax_id,
        }
    }
}

impl From<Partner> for PartnerView {
    fn from(partner: Partner) -> Self {
        Self {
            id: partner.id,
            nome: partner.name,
            cpf: partner.personal_tax_id,
            empresa: partner.company_id,
        }
    }
}
