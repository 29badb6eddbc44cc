use utoipa::OpenApi;
use utoipa::ToSchema;

use crate::presentation::{
    CompanyPartnerView, CompanyView, CreatedResponse, ErrorResponse, PartnerView, StatusResponse,
};

/// Company create/update body. `nome` is read when `razaoSocial` is absent or blank.
#[derive(ToSchema)]
#[allow(non_snake_case, dead_code)]
pub struct CompanyRequestDoc {
    pub razaoSocial: String,
    pub cnpj: String,
}

/// Partner create/update body.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PartnerRequestDoc {
    pub nome: String,
    pub cpf: String,
    /// Owning company id. `empresa_id` is read when this is absent.
    pub empresa: i64,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health,
        crate::handlers::list_companies,
        crate::handlers::get_company,
        crate::handlers::create_company,
        crate::handlers::update_company,
        crate::handlers::delete_company,
        crate::handlers::list_partners,
        crate::handlers::get_partner,
        crate::handlers::create_partner,
        crate::handlers::update_partner,
        crate::handlers::delete_partner,
    ),
    components(
        schemas(
            CompanyRequestDoc,
            PartnerRequestDoc,
            CompanyView,
            CompanyPartnerView,
            PartnerView,
            CreatedResponse,
            StatusResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "Empresas", description = "Companies and their partners"),
        (name = "Sócios", description = "Partners")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/health",
            "/api/empresas",
            "/api/empresas/{id}",
            "/api/socios",
            "/api/socios/{id}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {}",
                expected
            );
        }
    }
}
