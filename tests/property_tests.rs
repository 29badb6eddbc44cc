/// Property-based tests using proptest
/// Tests invariants that should hold for any sequence of service calls
use std::collections::BTreeSet;
use std::sync::Arc;

use empresas_api::models::{normalize_cnpj, CompanyFields, PartnerFields};
use empresas_api::services::{CompanyService, PartnerService};
use empresas_api::storage::{MemoryStore, Storage};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    CreateCompany,
    CreatePartner { company: usize },
    MovePartner { partner: usize, company: usize },
    DeleteCompany { company: usize },
    DeletePartner { partner: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::CreateCompany),
        4 => (0usize..8).prop_map(|company| Op::CreatePartner { company }),
        3 => (0usize..16, 0usize..8).prop_map(|(partner, company)| Op::MovePartner { partner, company }),
        1 => (0usize..8).prop_map(|company| Op::DeleteCompany { company }),
        1 => (0usize..16).prop_map(|partner| Op::DeletePartner { partner }),
    ]
}

/// Ids are picked by index from what exists, plus one past the end so that
/// references to missing companies are exercised as well.
fn pick(ids: &[i64], index: usize) -> i64 {
    ids.get(index).copied().unwrap_or(1_000 + index as i64)
}

async fn apply(store: Arc<dyn Storage>, op: &Op) {
    let companies = CompanyService::new(store.clone());
    let partners = PartnerService::new(store.clone());
    let company_ids: Vec<i64> = store
        .find_all_companies()
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    let partner_ids: Vec<i64> = store
        .find_all_partners()
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();

    match *op {
        Op::CreateCompany => {
            companies
                .create(CompanyFields {
                    legal_name: "Acme".to_string(),
                    tax_id: "12345678901234".to_string(),
                })
                .await
                .unwrap();
        }
        Op::CreatePartner { company } => {
            let company_id = pick(&company_ids, company);
            let result = partners
                .create(PartnerFields {
                    name: "Ana".to_string(),
                    personal_tax_id: "111".to_string(),
                    company_id: Some(company_id),
                })
                .await;
            assert_eq!(result.is_ok(), company_ids.contains(&company_id));
        }
        Op::MovePartner { partner, company } => {
            let Some(partner) = partners.get_by_id(pick(&partner_ids, partner)).await.unwrap() else {
                return;
            };
            let company_id = pick(&company_ids, company);
            let result = partners
                .update(
                    partner,
                    PartnerFields {
                        name: "Ana".to_string(),
                        personal_tax_id: "111".to_string(),
                        company_id: Some(company_id),
                    },
                )
                .await;
            assert_eq!(result.is_ok(), company_ids.contains(&company_id));
        }
        Op::DeleteCompany { company } => {
            if let Some(company) = companies.get_by_id(pick(&company_ids, company)).await.unwrap() {
                let owned: Vec<i64> = company.partners.iter().map(|p| p.id).collect();
                let removed = companies.delete(company).await.unwrap();
                assert_eq!(removed, owned);
            }
        }
        Op::DeletePartner { partner } => {
            if let Some(partner) = partners.get_by_id(pick(&partner_ids, partner)).await.unwrap() {
                partners.delete(partner).await.unwrap();
            }
        }
    }
}

async fn assert_bidirectional(store: &Arc<dyn Storage>) {
    let companies = store.find_all_companies().await.unwrap();
    let partners = store.find_all_partners().await.unwrap();
    let company_ids: BTreeSet<i64> = companies.iter().map(|c| c.id).collect();

    let mut listed = BTreeSet::new();
    for company in &companies {
        for partner in &company.partners {
            assert_eq!(partner.company_id, company.id);
            assert!(listed.insert(partner.id), "partner {} listed twice", partner.id);
        }
        let expected = partners.iter().filter(|p| p.company_id == company.id).count();
        assert_eq!(company.partners.len(), expected);
    }

    for partner in &partners {
        assert!(company_ids.contains(&partner.company_id));
        assert!(listed.contains(&partner.id));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn partner_lists_mirror_company_references(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
            for op in &ops {
                apply(store.clone(), op).await;
                assert_bidirectional(&store).await;
            }
        });
    }
}

// Property: CNPJ normalization
proptest! {
    #[test]
    fn formatted_cnpj_normalizes_to_digits(cnpj in "[0-9]{14}") {
        let formatted = format!("{}.{}.{}/{}-{}",
            &cnpj[0..2], &cnpj[2..5], &cnpj[5..8], &cnpj[8..12], &cnpj[12..14]);

        prop_assert_eq!(normalize_cnpj(&formatted), Some(cnpj.clone()));
        prop_assert_eq!(normalize_cnpj(&cnpj), Some(cnpj));
    }

    #[test]
    fn wrong_length_cnpj_rejected(cnpj in "[0-9]{0,13}|[0-9]{15,20}") {
        prop_assert_eq!(normalize_cnpj(&cnpj), None);
    }

    #[test]
    fn cnpj_normalization_never_panics(raw in "\\PC*") {
        let _ = normalize_cnpj(&raw);
    }
}
