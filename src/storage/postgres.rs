use async_trait::async_trait;
use sqlx::PgPool;

use super::Storage;
use crate::errors::{AppError, ResultExt, COMPANY_NOT_FOUND, PARTNER_NOT_FOUND};
use crate::models::{Company, CompanyRow, NewCompany, NewPartner, Partner};

/// Postgres error code for a violated foreign key.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// One row of the companies/partners join.
type JoinedRow = (
    i64,
    Option<String>,
    String,
    Option<i64>,
    Option<String>,
    Option<String>,
);

/// Postgres storage backend on `companies` and `partners`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a foreign key failure on `partners.company_id` to a linkage error.
fn map_partner_write_error(err: sqlx::Error) -> AppError {
    let is_fk_violation = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION);

    if is_fk_violation {
        AppError::company_missing()
    } else {
        AppError::DatabaseError(err)
    }
}

/// Folds join rows (ordered by company id) into companies with their partners.
fn group_joined_rows(rows: Vec<JoinedRow>) -> Vec<Company> {
    let mut companies: Vec<Company> = Vec::new();

    for (company_id, legal_name, tax_id, partner_id, name, personal_tax_id) in rows {
        if companies.last().map(|c| c.id) != Some(company_id) {
            companies.push(Company {
                id: company_id,
                legal_name,
                tax_id,
                partners: Vec::new(),
            });
        }

        if let (Some(id), Some(company)) = (partner_id, companies.last_mut()) {
            company.partners.push(Partner {
                id,
                name: name.unwrap_or_default(),
                personal_tax_id: personal_tax_id.unwrap_or_default(),
                company_id,
            });
        }
    }

    companies
}

#[async_trait]
impl Storage for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find_company(&self, id: i64) -> Result<Option<Company>, AppError> {
        let Some(row) = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, legal_name, tax_id FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("loading company {}", id))?
        else {
            return Ok(None);
        };

        let partners = sqlx::query_as::<_, Partner>(
            "SELECT id, name, personal_tax_id, company_id FROM partners WHERE company_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("loading partners of company {}", id))?;

        Ok(Some(row.into_company(partners)))
    }

    async fn find_all_companies(&self) -> Result<Vec<Company>, AppError> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            r#"
            SELECT c.id, c.legal_name, c.tax_id, p.id, p.name, p.personal_tax_id
            FROM companies c
            LEFT JOIN partners p ON p.company_id = c.id
            ORDER BY c.id, p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("listing companies with partners")?;

        Ok(group_joined_rows(rows))
    }

    async fn insert_company(&self, company: NewCompany) -> Result<Company, AppError> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "INSERT INTO companies (legal_name, tax_id) VALUES ($1, $2) RETURNING id, legal_name, tax_id",
        )
        .bind(&company.legal_name)
        .bind(&company.tax_id)
        .fetch_one(&self.pool)
        .await
        .context("inserting company")?;

        Ok(row.into_company(Vec::new()))
    }

    async fn save_company(&self, company: &Company) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE companies SET legal_name = $2, tax_id = $3 WHERE id = $1")
            .bind(company.id)
            .bind(&company.legal_name)
            .bind(&company.tax_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating company {}", company.id))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(COMPANY_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    async fn remove_company_cascade(&self, id: i64) -> Result<Vec<i64>, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut removed: Vec<i64> =
            sqlx::query_scalar("DELETE FROM partners WHERE company_id = $1 RETURNING id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .with_context(|| format!("removing partners of company {}", id))?;

        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("removing company {}", id))?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the partner delete.
            return Err(AppError::NotFound(COMPANY_NOT_FOUND.to_string()));
        }

        tx.commit().await?;
        removed.sort_unstable();
        Ok(removed)
    }

    async fn find_partner(&self, id: i64) -> Result<Option<Partner>, AppError> {
        sqlx::query_as::<_, Partner>(
            "SELECT id, name, personal_tax_id, company_id FROM partners WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("loading partner {}", id))
    }

    async fn find_all_partners(&self) -> Result<Vec<Partner>, AppError> {
        sqlx::query_as::<_, Partner>(
            "SELECT id, name, personal_tax_id, company_id FROM partners ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing partners")
    }

    async fn insert_partner(&self, partner: NewPartner) -> Result<Partner, AppError> {
        sqlx::query_as::<_, Partner>(
            r#"
            INSERT INTO partners (name, personal_tax_id, company_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, personal_tax_id, company_id
            "#,
        )
        .bind(&partner.name)
        .bind(&partner.personal_tax_id)
        .bind(partner.company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_partner_write_error)
    }

    async fn save_partner(&self, partner: &Partner) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE partners SET name = $2, personal_tax_id = $3, company_id = $4 WHERE id = $1",
        )
        .bind(partner.id)
        .bind(&partner.name)
        .bind(&partner.personal_tax_id)
        .bind(partner.company_id)
        .execute(&self.pool)
        .await
        .map_err(map_partner_write_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(PARTNER_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    async fn remove_partner(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM partners WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("removing partner {}", id))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(PARTNER_NOT_FOUND.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_joined_rows() {
        let rows: Vec<JoinedRow> = vec![
            (
                1,
                Some("Acme".to_string()),
                "12345678901234".to_string(),
                Some(1),
                Some("Ana".to_string()),
                Some("111".to_string()),
            ),
            (
                1,
                Some("Acme".to_string()),
                "12345678901234".to_string(),
                Some(3),
                Some("Bia".to_string()),
                Some("222".to_string()),
            ),
            (2, None, "98765432109876".to_string(), None, None, None),
        ];

        let companies = group_joined_rows(rows);

        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].partners.len(), 2);
        assert_eq!(companies[0].partners[1].id, 3);
        assert_eq!(companies[0].partners[1].company_id, 1);
        assert!(companies[1].partners.is_empty());
        assert_eq!(companies[1].legal_name, None);
    }

    #[test]
    fn test_non_database_errors_are_not_linkage_errors() {
        let err = map_partner_write_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
