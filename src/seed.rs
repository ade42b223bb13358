//! JSON dataset loader: parses an export of the ecosystem dataset and writes
//! it through the batched `db` writers.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::warn;

use crate::db;
use crate::filters::{Sector, Stage};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub tech_verticals: Vec<VerticalSeed>,
    pub companies: Vec<CompanySeed>,
    pub people: Vec<PersonSeed>,
    pub investment_firms: Vec<InvestmentFirmSeed>,
    pub service_providers: Vec<ServiceProviderSeed>,
    pub funds: Vec<FundSeed>,
    pub positions: Vec<PositionSeed>,
    pub deals: Vec<DealSeed>,
    pub addresses: Vec<AddressSeed>,
}

#[derive(Debug, Deserialize)]
pub struct VerticalSeed {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySeed {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub year_established: Option<i32>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub stage: Option<String>,
    #[serde(default)]
    pub tech_verticals: Vec<String>,
    pub ivc_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSeed {
    pub id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentFirmSeed {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub description: Option<String>,
    pub managed_capital_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderSeed {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundSeed {
    pub id: String,
    pub name: String,
    pub fund_capital_usd: Option<f64>,
    pub status: Option<String>,
    pub managing_firm_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSeed {
    pub person_id: String,
    pub organization_id: String,
    pub title: String,
    pub position_type: Option<String>,
    #[serde(default = "default_true")]
    pub is_current: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealSeed {
    pub id: String,
    pub company_id: String,
    pub deal_type: Option<String>,
    pub deal_date: Option<String>,
    pub amount_usd: Option<f64>,
    pub valuation_usd: Option<f64>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub participants: Vec<DealParticipantSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealParticipantSeed {
    pub entity_id: String,
    pub role: String,
    pub investor_amount_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSeed {
    pub entity_id: String,
    #[serde(default)]
    pub is_main: bool,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

pub struct SeedCounts {
    pub verticals: usize,
    pub companies: usize,
    pub people: usize,
    pub investment_firms: usize,
    pub service_providers: usize,
    pub funds: usize,
    pub positions: usize,
    pub deals: usize,
    pub addresses: usize,
}

impl SeedCounts {
    pub fn print(&self) {
        println!(
            "Saved {} companies, {} people, {} firms, {} providers, {} funds, {} verticals.",
            self.companies,
            self.people,
            self.investment_firms,
            self.service_providers,
            self.funds,
            self.verticals,
        );
        println!(
            "Linked {} positions, {} deals, {} addresses.",
            self.positions, self.deals, self.addresses,
        );
    }
}

pub fn load_dataset(conn: &Connection, path: &Path) -> Result<SeedCounts> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let dataset: Dataset = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
    insert_dataset(conn, dataset)
}

pub fn insert_dataset(conn: &Connection, dataset: Dataset) -> Result<SeedCounts> {
    let total = dataset.companies.len()
        + dataset.people.len()
        + dataset.investment_firms.len()
        + dataset.service_providers.len()
        + dataset.funds.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let verticals: Vec<db::VerticalRow> = dataset
        .tech_verticals
        .into_iter()
        .map(|v| db::VerticalRow { id: v.id, name: v.name })
        .collect();
    let vertical_count = db::save_verticals(conn, &verticals)?;

    // Entities first; every domain row references one.
    let mut entities: Vec<db::EntityRow> = Vec::new();
    for c in &dataset.companies {
        entities.push(db::EntityRow {
            id: c.id.clone(),
            entity_type: "Company",
            ivc_number: c.ivc_number.clone(),
        });
    }
    for p in &dataset.people {
        entities.push(db::EntityRow { id: p.id.clone(), entity_type: "Person", ivc_number: None });
    }
    for f in &dataset.investment_firms {
        entities.push(db::EntityRow {
            id: f.id.clone(),
            entity_type: "InvestmentFirm",
            ivc_number: None,
        });
    }
    for s in &dataset.service_providers {
        entities.push(db::EntityRow {
            id: s.id.clone(),
            entity_type: "ServiceProvider",
            ivc_number: None,
        });
    }
    for f in &dataset.funds {
        entities.push(db::EntityRow { id: f.id.clone(), entity_type: "Fund", ivc_number: None });
    }
    db::save_entities(conn, &entities)?;

    let mut companies = Vec::with_capacity(dataset.companies.len());
    let mut memberships = Vec::new();
    for c in dataset.companies {
        // Unknown labels degrade to NULL, mirroring the permissive decode.
        let sector = validate_label(&c.id, "sector", c.sector, |l| Sector::parse(l).is_some());
        let stage = validate_label(&c.id, "stage", c.stage, |l| Stage::parse(l).is_some());
        for vertical_id in c.tech_verticals {
            memberships.push(db::MembershipRow { company_id: c.id.clone(), vertical_id });
        }
        companies.push(db::CompanyRow {
            entity_id: c.id,
            name: c.name,
            website: c.website,
            linkedin: c.linkedin,
            year_established: c.year_established,
            description: c.description,
            sector,
            stage,
        });
        pb.inc(1);
    }
    let company_count = db::save_companies(conn, &companies, &memberships)?;

    let people: Vec<db::PersonRow> = dataset
        .people
        .into_iter()
        .map(|p| {
            pb.inc(1);
            db::PersonRow {
                entity_id: p.id,
                full_name: p.full_name,
                email: p.email,
                linkedin: p.linkedin,
                bio: p.bio,
            }
        })
        .collect();
    let people_count = db::save_people(conn, &people)?;

    let firms: Vec<db::InvestmentFirmRow> = dataset
        .investment_firms
        .into_iter()
        .map(|f| {
            pb.inc(1);
            db::InvestmentFirmRow {
                entity_id: f.id,
                name: f.name,
                website: f.website,
                linkedin: f.linkedin,
                description: f.description,
                managed_capital_usd: f.managed_capital_usd,
            }
        })
        .collect();
    let firm_count = db::save_investment_firms(conn, &firms)?;

    let providers: Vec<db::ServiceProviderRow> = dataset
        .service_providers
        .into_iter()
        .map(|s| {
            pb.inc(1);
            db::ServiceProviderRow {
                entity_id: s.id,
                name: s.name,
                website: s.website,
                linkedin: s.linkedin,
                description: s.description,
                service_type: s.service_type,
            }
        })
        .collect();
    let provider_count = db::save_service_providers(conn, &providers)?;

    let funds: Vec<db::FundRow> = dataset
        .funds
        .into_iter()
        .map(|f| {
            pb.inc(1);
            db::FundRow {
                entity_id: f.id,
                name: f.name,
                fund_capital_usd: f.fund_capital_usd,
                status: f.status,
                managing_firm_id: f.managing_firm_id,
            }
        })
        .collect();
    let fund_count = db::save_funds(conn, &funds)?;

    let positions: Vec<db::PositionRow> = dataset
        .positions
        .into_iter()
        .map(|p| db::PositionRow {
            person_id: p.person_id,
            organization_id: p.organization_id,
            title: p.title,
            position_type: p.position_type,
            is_current: p.is_current,
            start_date: p.start_date,
            end_date: p.end_date,
        })
        .collect();
    let position_count = db::save_positions(conn, &positions)?;

    let mut deal_rows = Vec::with_capacity(dataset.deals.len());
    let mut participant_rows = Vec::new();
    for d in dataset.deals {
        for p in d.participants {
            participant_rows.push(db::DealParticipantRow {
                deal_id: d.id.clone(),
                participant_id: p.entity_id,
                role: p.role,
                investor_amount_usd: p.investor_amount_usd,
            });
        }
        deal_rows.push(db::DealRow {
            id: d.id,
            company_id: d.company_id,
            deal_type: d.deal_type,
            deal_date: d.deal_date,
            amount_usd: d.amount_usd,
            valuation_usd: d.valuation_usd,
            remarks: d.remarks,
        });
    }
    let deal_count = db::save_deals(conn, &deal_rows, &participant_rows)?;

    let addresses: Vec<db::AddressRow> = dataset
        .addresses
        .into_iter()
        .map(|a| db::AddressRow {
            entity_id: a.entity_id,
            is_main: a.is_main,
            address_line: a.address_line,
            city: a.city,
            country: a.country,
            zip_code: a.zip_code,
        })
        .collect();
    let address_count = db::save_addresses(conn, &addresses)?;

    pb.finish_and_clear();
    Ok(SeedCounts {
        verticals: vertical_count,
        companies: company_count,
        people: people_count,
        investment_firms: firm_count,
        service_providers: provider_count,
        funds: fund_count,
        positions: position_count,
        deals: deal_count,
        addresses: address_count,
    })
}

fn validate_label<F>(
    company_id: &str,
    field: &str,
    label: Option<String>,
    is_valid: F,
) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    match label {
        Some(value) if is_valid(&value) => Some(value),
        Some(value) => {
            warn!("company {company_id}: dropping unknown {field} {value:?}");
            None
        }
        None => None,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, queries};
    use rusqlite::Connection;

    fn sample() -> Dataset {
        serde_json::from_value(serde_json::json!({
            "techVerticals": [
                { "id": "ai", "name": "Artificial Intelligence" }
            ],
            "companies": [
                {
                    "id": "c1",
                    "name": "AgriSense",
                    "sector": "Agritech",
                    "stage": "Seed",
                    "yearEstablished": 2018,
                    "techVerticals": ["ai"]
                },
                {
                    "id": "c2",
                    "name": "Oddity",
                    "sector": "Not A Real Sector",
                    "stage": "Seed"
                }
            ],
            "people": [
                { "id": "p1", "fullName": "Dana Levi" }
            ],
            "positions": [
                { "personId": "p1", "organizationId": "c1", "title": "CEO",
                  "positionType": "Management" }
            ],
            "deals": [
                { "id": "d1", "companyId": "c1", "dealType": "Seed Round",
                  "participants": [
                      { "entityId": "p1", "role": "Investor" }
                  ] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn dataset_round_trips_into_the_store() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();

        let counts = insert_dataset(&conn, sample()).unwrap();
        assert_eq!(counts.companies, 2);
        assert_eq!(counts.people, 1);
        assert_eq!(counts.positions, 1);
        assert_eq!(counts.deals, 1);

        let details = queries::get_company(&conn, "c1").unwrap();
        assert_eq!(details.summary.sector.as_deref(), Some("Agritech"));
        assert_eq!(details.verticals.len(), 1);
        assert_eq!(details.management.len(), 1);
    }

    #[test]
    fn unknown_labels_are_dropped_to_null() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        insert_dataset(&conn, sample()).unwrap();

        let details = queries::get_company(&conn, "c2").unwrap();
        assert_eq!(details.summary.sector, None);
        assert_eq!(details.summary.stage.as_deref(), Some("Seed"));
    }

    #[test]
    fn reseeding_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        insert_dataset(&conn, sample()).unwrap();
        insert_dataset(&conn, sample()).unwrap();

        let stats = queries::ecosystem_stats(&conn).unwrap();
        assert_eq!(stats.companies, 2);
        assert_eq!(stats.people, 1);
    }
}
