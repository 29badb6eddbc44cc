use serde::Deserialize;
use sqlx::FromRow;

use crate::errors::AppError;

/// Length of a normalized CNPJ.
pub const CNPJ_LEN: usize = 14;

// ============ Domain Models ============

/// A company (empresa) and the partners it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Legal name (razão social).
    pub legal_name: Option<String>,
    /// CNPJ, 14 digits.
    pub tax_id: String,
    /// Owned partners in insertion order.
    pub partners: Vec<Partner>,
}

/// A partner (sócio) linked to exactly one company.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Partner {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Full name.
    pub name: String,
    /// CPF.
    pub personal_tax_id: String,
    /// Owning company.
    pub company_id: i64,
}

/// Company row without its partners, as stored in `companies`.
#[derive(Debug, Clone, FromRow)]
pub struct CompanyRow {
    pub id: i64,
    pub legal_name: Option<String>,
    pub tax_id: String,
}

impl CompanyRow {
    pub fn into_company(self, partners: Vec<Partner>) -> Company {
        Company {
            id: self.id,
            legal_name: self.legal_name,
            tax_id: self.tax_id,
            partners,
        }
    }
}

/// Company not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompany {
    pub legal_name: Option<String>,
    pub tax_id: String,
}

/// Partner not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPartner {
    pub name: String,
    pub personal_tax_id: String,
    pub company_id: i64,
}

// ============ Service Inputs ============

/// Mutable company fields, replaced wholesale on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyFields {
    pub legal_name: String,
    pub tax_id: String,
}

impl CompanyFields {
    /// Checks required fields and returns them normalized.
    pub fn validate(&self) -> Result<NewCompany, AppError> {
        let legal_name = self.legal_name.trim();
        if legal_name.is_empty() {
            return Err(AppError::invalid_data());
        }
        let tax_id = normalize_cnpj(&self.tax_id).ok_or_else(AppError::invalid_data)?;

        Ok(NewCompany {
            legal_name: Some(legal_name.to_string()),
            tax_id,
        })
    }
}

/// Mutable partner fields, replaced wholesale on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerFields {
    pub name: String,
    pub personal_tax_id: String,
    /// `None` when the request did not name a company.
    pub company_id: Option<i64>,
}

impl PartnerFields {
    /// Checks required fields and returns them normalized.
    pub fn validate(&self) -> Result<NewPartner, AppError> {
        let name = self.name.trim();
        let personal_tax_id = strip_document_formatting(&self.personal_tax_id);
        let company_id = self.company_id.ok_or_else(AppError::invalid_data)?;
        if name.is_empty() || personal_tax_id.is_empty() {
            return Err(AppError::invalid_data());
        }

        Ok(NewPartner {
            name: name.to_string(),
            personal_tax_id,
            company_id,
        })
    }
}

/// Removes the punctuation used when writing CPF/CNPJ by hand.
pub fn strip_document_formatting(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '.' | '/' | '-') && !c.is_whitespace())
        .collect()
}

/// Normalizes a CNPJ to its 14 digits, or `None` if it is not one.
pub fn normalize_cnpj(raw: &str) -> Option<String> {
    let cnpj = strip_document_formatting(raw);
    if cnpj.len() == CNPJ_LEN && cnpj.chars().all(|c| c.is_ascii_digit()) {
        Some(cnpj)
    } else {
        None
    }
}

// ============ Request Models ============

/// Body of `POST /api/empresas` and `PUT /api/empresas/{id}`.
///
/// Older clients send the legal name as `nome`, some send both keys. A
/// non-empty `razaoSocial` wins over `nome`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanyRequest {
    #[serde(rename = "razaoSocial")]
    pub razao_social: Option<String>,
    pub nome: Option<String>,
    pub cnpj: String,
}

impl From<CompanyRequest> for CompanyFields {
    fn from(req: CompanyRequest) -> Self {
        let legal_name = req
            .razao_social
            .filter(|name| !name.trim().is_empty())
            .or(req.nome)
            .unwrap_or_default();

        Self {
            legal_name,
            tax_id: req.cnpj,
        }
    }
}

/// Body of `POST /api/socios` and `PUT /api/socios/{id}`.
///
/// The owning company is `empresa`; `empresa_id` is read when it is absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartnerRequest {
    pub nome: String,
    pub cpf: String,
    pub empresa: Option<i64>,
    pub empresa_id: Option<i64>,
}

impl From<PartnerRequest> for PartnerFields {
    fn from(req: PartnerRequest) -> Self {
        Self {
            name: req.nome,
            personal_tax_id: req.cpf,
            company_id: req.empresa.or(req.empresa_id),
        }
    }
}
