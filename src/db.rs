use sqlx::{postgres::PgPoolOptions, PgPool};

/// Tables are created if missing. There is no migration history.
const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS companies (
        id BIGSERIAL PRIMARY KEY,
        legal_name VARCHAR(255),
        tax_id VARCHAR(14) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS partners (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        personal_tax_id VARCHAR(255) NOT NULL,
        company_id BIGINT NOT NULL REFERENCES companies(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_partners_company_id ON partners (company_id)",
];

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Creates the `companies` and `partners` tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Database schema ready");
        Ok(())
    }
}
