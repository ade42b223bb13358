//! Read-only entity query service over the SQLite store.
//!
//! Dynamic WHERE assembly follows the same pattern everywhere: collect
//! conditions and boxed params, join with AND. The tech-vertical restriction
//! is resolved through `matcher` first and layered on as an existence filter
//! over the primary query.

use rusqlite::Connection;

use crate::error::StoreError;
use crate::filters::FilterState;
use crate::matcher::{self, MembershipLookup, MATCH_CAP};
use crate::pagination::PageRequest;

/// Membership lookup backed by the company_tech_verticals table.
pub struct SqliteMemberships<'a> {
    pub conn: &'a Connection,
}

impl MembershipLookup for SqliteMemberships<'_> {
    fn entity_ids_for_vertical(
        &self,
        vertical_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT company_id FROM company_tech_verticals
             WHERE vertical_id = ?1 ORDER BY company_id LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![vertical_id, limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }
}

// ── Companies directory ──

#[derive(Debug, Clone)]
pub struct CompanySummary {
    pub entity_id: String,
    pub name: String,
    pub sector: Option<String>,
    pub stage: Option<String>,
    pub year_established: Option<i32>,
    pub website: Option<String>,
    pub description: Option<String>,
}

struct CompanyFilterSql {
    where_clause: String,
    params: Vec<Box<dyn rusqlite::types::ToSql>>,
    /// Set when the vertical filter matched nothing; the query can be
    /// skipped entirely.
    no_matches: bool,
}

fn build_company_filter(
    conn: &Connection,
    filters: &FilterState,
) -> Result<CompanyFilterSql, StoreError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(tv) = &filters.tech_verticals {
        let eligible = matcher::resolve(&SqliteMemberships { conn }, tv, MATCH_CAP)?;
        if eligible.is_empty() {
            return Ok(CompanyFilterSql {
                where_clause: String::new(),
                params: Vec::new(),
                no_matches: true,
            });
        }
        let mut ids: Vec<String> = eligible.into_iter().collect();
        ids.sort();
        let placeholders: Vec<String> = (1..=ids.len())
            .map(|i| format!("?{}", params.len() + i))
            .collect();
        conditions.push(format!("entity_id IN ({})", placeholders.join(",")));
        for id in ids {
            params.push(Box::new(id));
        }
    }

    if !filters.sectors.is_empty() {
        let placeholders: Vec<String> = (1..=filters.sectors.len())
            .map(|i| format!("?{}", params.len() + i))
            .collect();
        conditions.push(format!("sector IN ({})", placeholders.join(",")));
        for sector in &filters.sectors {
            params.push(Box::new(sector.as_str().to_string()));
        }
    }

    if !filters.stages.is_empty() {
        let placeholders: Vec<String> = (1..=filters.stages.len())
            .map(|i| format!("?{}", params.len() + i))
            .collect();
        conditions.push(format!("stage IN ({})", placeholders.join(",")));
        for stage in &filters.stages {
            params.push(Box::new(stage.as_str().to_string()));
        }
    }

    if let Some(range) = &filters.year_established {
        if let Some(min) = range.min {
            conditions.push(format!("year_established >= ?{}", params.len() + 1));
            params.push(Box::new(min));
        }
        if let Some(max) = range.max {
            conditions.push(format!("year_established <= ?{}", params.len() + 1));
            params.push(Box::new(max));
        }
    }

    if let Some(keyword) = &filters.keyword {
        let like = format!("%{}%", keyword);
        conditions.push(format!(
            "(name LIKE ?{} OR description LIKE ?{})",
            params.len() + 1,
            params.len() + 2
        ));
        params.push(Box::new(like.clone()));
        params.push(Box::new(like));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    Ok(CompanyFilterSql {
        where_clause,
        params,
        no_matches: false,
    })
}

pub fn list_companies(
    conn: &Connection,
    filters: &FilterState,
    page: &PageRequest,
) -> Result<Vec<CompanySummary>, StoreError> {
    let filter_sql = build_company_filter(conn, filters)?;
    if filter_sql.no_matches {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT entity_id, name, sector, stage, year_established, website, description
         FROM companies{}
         ORDER BY entity_id
         LIMIT {} OFFSET {}",
        filter_sql.where_clause,
        page.limit(),
        page.offset(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        filter_sql.params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(CompanySummary {
                entity_id: row.get(0)?,
                name: row.get(1)?,
                sector: row.get(2)?,
                stage: row.get(3)?,
                year_established: row.get(4)?,
                website: row.get(5)?,
                description: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_companies(conn: &Connection, filters: &FilterState) -> Result<u64, StoreError> {
    let filter_sql = build_company_filter(conn, filters)?;
    if filter_sql.no_matches {
        return Ok(0);
    }

    let sql = format!(
        "SELECT COUNT(*) FROM companies{}",
        filter_sql.where_clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        filter_sql.params.iter().map(|p| p.as_ref()).collect();
    let count: i64 = stmt.query_row(param_refs.as_slice(), |row| row.get(0))?;
    Ok(count as u64)
}

// ── Company details ──

#[derive(Debug, Clone)]
pub struct TechVerticalRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PositionHolder {
    pub person_id: String,
    pub person_name: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct DealParticipantView {
    pub participant_id: String,
    pub participant_name: Option<String>,
    pub role: String,
    pub investor_amount_usd: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DealView {
    pub deal_id: String,
    pub deal_type: Option<String>,
    pub deal_date: Option<String>,
    pub amount_usd: Option<f64>,
    pub valuation_usd: Option<f64>,
    pub participants: Vec<DealParticipantView>,
}

#[derive(Debug, Clone)]
pub struct MainAddress {
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug)]
pub struct CompanyDetails {
    pub summary: CompanySummary,
    pub linkedin: Option<String>,
    pub verticals: Vec<TechVerticalRef>,
    pub management: Vec<PositionHolder>,
    pub board: Vec<PositionHolder>,
    pub deals: Vec<DealView>,
    pub address: Option<MainAddress>,
}

pub fn get_company(conn: &Connection, company_id: &str) -> Result<CompanyDetails, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT entity_id, name, sector, stage, year_established, website, description, linkedin
         FROM companies WHERE entity_id = ?1",
    )?;
    let row = stmt
        .query_row([company_id], |row| {
            Ok((
                CompanySummary {
                    entity_id: row.get(0)?,
                    name: row.get(1)?,
                    sector: row.get(2)?,
                    stage: row.get(3)?,
                    year_established: row.get(4)?,
                    website: row.get(5)?,
                    description: row.get(6)?,
                },
                row.get::<_, Option<String>>(7)?,
            ))
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Database(other),
        })?;
    let (summary, linkedin) = row;

    let verticals = company_verticals(conn, company_id)?;
    let management = position_holders(conn, company_id, "Management")?;
    let board = position_holders(conn, company_id, "Board")?;
    let deals = company_deals(conn, company_id)?;
    let address = main_address(conn, company_id)?;

    Ok(CompanyDetails {
        summary,
        linkedin,
        verticals,
        management,
        board,
        deals,
        address,
    })
}

fn company_verticals(
    conn: &Connection,
    company_id: &str,
) -> Result<Vec<TechVerticalRef>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT tv.id, tv.name
         FROM tech_verticals tv
         JOIN company_tech_verticals ctv ON ctv.vertical_id = tv.id
         WHERE ctv.company_id = ?1
         ORDER BY tv.name",
    )?;
    let rows = stmt
        .query_map([company_id], |row| {
            Ok(TechVerticalRef {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn position_holders(
    conn: &Connection,
    organization_id: &str,
    position_type: &str,
) -> Result<Vec<PositionHolder>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT p.person_id, pe.full_name, p.title
         FROM positions p
         JOIN people pe ON pe.entity_id = p.person_id
         WHERE p.organization_id = ?1 AND p.is_current = 1 AND p.position_type = ?2
         ORDER BY pe.full_name",
    )?;
    let rows = stmt
        .query_map([organization_id, position_type], |row| {
            Ok(PositionHolder {
                person_id: row.get(0)?,
                person_name: row.get(1)?,
                title: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn company_deals(conn: &Connection, company_id: &str) -> Result<Vec<DealView>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, deal_type, deal_date, amount_usd, valuation_usd
         FROM deals WHERE company_id = ?1
         ORDER BY deal_date DESC, id",
    )?;
    let mut deals = stmt
        .query_map([company_id], |row| {
            Ok(DealView {
                deal_id: row.get(0)?,
                deal_type: row.get(1)?,
                deal_date: row.get(2)?,
                amount_usd: row.get(3)?,
                valuation_usd: row.get(4)?,
                participants: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut p_stmt = conn.prepare(
        "SELECT dp.participant_id,
                COALESCE(c.name, f.name, sp.name, pe.full_name),
                dp.role, dp.investor_amount_usd
         FROM deal_participants dp
         LEFT JOIN companies c ON c.entity_id = dp.participant_id
         LEFT JOIN investment_firms f ON f.entity_id = dp.participant_id
         LEFT JOIN service_providers sp ON sp.entity_id = dp.participant_id
         LEFT JOIN people pe ON pe.entity_id = dp.participant_id
         WHERE dp.deal_id = ?1
         ORDER BY dp.role, dp.participant_id",
    )?;
    for deal in &mut deals {
        deal.participants = p_stmt
            .query_map([&deal.deal_id], |row| {
                Ok(DealParticipantView {
                    participant_id: row.get(0)?,
                    participant_name: row.get(1)?,
                    role: row.get(2)?,
                    investor_amount_usd: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
    }
    Ok(deals)
}

fn main_address(conn: &Connection, entity_id: &str) -> Result<Option<MainAddress>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT address_line, city, country
         FROM addresses WHERE entity_id = ?1
         ORDER BY is_main DESC, id LIMIT 1",
    )?;
    let mut rows = stmt.query_map([entity_id], |row| {
        Ok(MainAddress {
            address_line: row.get(0)?,
            city: row.get(1)?,
            country: row.get(2)?,
        })
    })?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

// ── Person details ──

#[derive(Debug, Clone)]
pub struct PersonPosition {
    pub organization_id: String,
    pub organization_name: Option<String>,
    pub title: String,
    pub is_current: bool,
}

#[derive(Debug)]
pub struct PersonDetails {
    pub entity_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
    pub current_positions: Vec<PersonPosition>,
    pub past_positions: Vec<PersonPosition>,
}

pub fn get_person(conn: &Connection, person_id: &str) -> Result<PersonDetails, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT entity_id, full_name, email, linkedin, bio FROM people WHERE entity_id = ?1",
    )?;
    let mut person = stmt
        .query_row([person_id], |row| {
            Ok(PersonDetails {
                entity_id: row.get(0)?,
                full_name: row.get(1)?,
                email: row.get(2)?,
                linkedin: row.get(3)?,
                bio: row.get(4)?,
                current_positions: Vec::new(),
                past_positions: Vec::new(),
            })
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Database(other),
        })?;

    let mut p_stmt = conn.prepare(
        "SELECT p.organization_id,
                COALESCE(c.name, f.name, sp.name, fu.name),
                p.title, p.is_current
         FROM positions p
         LEFT JOIN companies c ON c.entity_id = p.organization_id
         LEFT JOIN investment_firms f ON f.entity_id = p.organization_id
         LEFT JOIN service_providers sp ON sp.entity_id = p.organization_id
         LEFT JOIN funds fu ON fu.entity_id = p.organization_id
         WHERE p.person_id = ?1
         ORDER BY p.is_current DESC, p.organization_id",
    )?;
    let positions = p_stmt
        .query_map([person_id], |row| {
            Ok(PersonPosition {
                organization_id: row.get(0)?,
                organization_name: row.get(1)?,
                title: row.get(2)?,
                is_current: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for position in positions {
        if position.is_current {
            person.current_positions.push(position);
        } else {
            person.past_positions.push(position);
        }
    }
    Ok(person)
}

// ── Verticals, stats, search export ──

pub fn list_tech_verticals(conn: &Connection) -> Result<Vec<TechVerticalRef>, StoreError> {
    let mut stmt = conn.prepare("SELECT id, name FROM tech_verticals ORDER BY name, id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TechVerticalRef {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Landing-page aggregates: one COUNT per collection.
#[derive(Debug, PartialEq, Eq)]
pub struct EcosystemStats {
    pub companies: u64,
    pub people: u64,
    pub investment_firms: u64,
    pub funds: u64,
    pub service_providers: u64,
}

pub fn ecosystem_stats(conn: &Connection) -> Result<EcosystemStats, StoreError> {
    let count = |table: &str| -> Result<u64, StoreError> {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        Ok(n as u64)
    };
    Ok(EcosystemStats {
        companies: count("companies")?,
        people: count("people")?,
        investment_firms: count("investment_firms")?,
        funds: count("funds")?,
        service_providers: count("service_providers")?,
    })
}

/// One company plus its vertical names, for building search-index documents.
#[derive(Debug)]
pub struct CompanyExport {
    pub summary: CompanySummary,
    pub vertical_names: Vec<String>,
}

pub fn export_companies(conn: &Connection) -> Result<Vec<CompanyExport>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT entity_id, name, sector, stage, year_established, website, description
         FROM companies ORDER BY entity_id",
    )?;
    let summaries = stmt
        .query_map([], |row| {
            Ok(CompanySummary {
                entity_id: row.get(0)?,
                name: row.get(1)?,
                sector: row.get(2)?,
                stage: row.get(3)?,
                year_established: row.get(4)?,
                website: row.get(5)?,
                description: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut exports = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let vertical_names = company_verticals(conn, &summary.entity_id)?
            .into_iter()
            .map(|v| v.name)
            .collect();
        exports.push(CompanyExport {
            summary,
            vertical_names,
        });
    }
    Ok(exports)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::filters::{decode, FilterOperator, FilterState, TechVerticalFilter};

    fn seeded_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();

        let entity = |id: &str, kind: &'static str| db::EntityRow {
            id: id.to_string(),
            entity_type: kind,
            ivc_number: None,
        };
        db::save_entities(
            &conn,
            &[
                entity("c1", "Company"),
                entity("c2", "Company"),
                entity("c3", "Company"),
                entity("p1", "Person"),
                entity("f1", "InvestmentFirm"),
                entity("d1-inv", "InvestmentFirm"),
            ],
        )
        .unwrap();

        db::save_verticals(
            &conn,
            &[
                db::VerticalRow { id: "ai".to_string(), name: "Artificial Intelligence".to_string() },
                db::VerticalRow { id: "iot".to_string(), name: "IoT".to_string() },
            ],
        )
        .unwrap();

        let company = |id: &str, name: &str, sector: &str, stage: &str, year: i32| db::CompanyRow {
            entity_id: id.to_string(),
            name: name.to_string(),
            website: None,
            linkedin: None,
            year_established: Some(year),
            description: Some(format!("{name} does things")),
            sector: Some(sector.to_string()),
            stage: Some(stage.to_string()),
        };
        let membership = |company: &str, vertical: &str| db::MembershipRow {
            company_id: company.to_string(),
            vertical_id: vertical.to_string(),
        };
        db::save_companies(
            &conn,
            &[
                company("c1", "AgriSense", "Agritech", "Seed", 2018),
                company("c2", "MedCore", "Biomed", "Revenue Growth", 2009),
                company("c3", "GridWise", "Energy", "Seed", 2015),
            ],
            &[
                membership("c1", "ai"),
                membership("c1", "iot"),
                membership("c2", "ai"),
            ],
        )
        .unwrap();

        db::save_people(
            &conn,
            &[db::PersonRow {
                entity_id: "p1".to_string(),
                full_name: "Dana Levi".to_string(),
                email: None,
                linkedin: None,
                bio: Some("Serial founder".to_string()),
            }],
        )
        .unwrap();

        db::save_investment_firms(
            &conn,
            &[
                db::InvestmentFirmRow {
                    entity_id: "f1".to_string(),
                    name: "Vertex Partners".to_string(),
                    website: None,
                    linkedin: None,
                    description: None,
                    managed_capital_usd: Some(1.2e9),
                },
                db::InvestmentFirmRow {
                    entity_id: "d1-inv".to_string(),
                    name: "Delta Capital".to_string(),
                    website: None,
                    linkedin: None,
                    description: None,
                    managed_capital_usd: None,
                },
            ],
        )
        .unwrap();

        db::save_positions(
            &conn,
            &[
                db::PositionRow {
                    person_id: "p1".to_string(),
                    organization_id: "c1".to_string(),
                    title: "CEO".to_string(),
                    position_type: Some("Management".to_string()),
                    is_current: true,
                    start_date: None,
                    end_date: None,
                },
                db::PositionRow {
                    person_id: "p1".to_string(),
                    organization_id: "c2".to_string(),
                    title: "CTO".to_string(),
                    position_type: Some("Management".to_string()),
                    is_current: false,
                    start_date: None,
                    end_date: Some("2019-01-01".to_string()),
                },
            ],
        )
        .unwrap();

        db::save_deals(
            &conn,
            &[db::DealRow {
                id: "d1".to_string(),
                company_id: "c1".to_string(),
                deal_type: Some("Seed Round".to_string()),
                deal_date: Some("2020-06-01".to_string()),
                amount_usd: Some(3_000_000.0),
                valuation_usd: None,
                remarks: None,
            }],
            &[db::DealParticipantRow {
                deal_id: "d1".to_string(),
                participant_id: "d1-inv".to_string(),
                role: "Investor".to_string(),
                investor_amount_usd: Some(3_000_000.0),
            }],
        )
        .unwrap();

        db::save_addresses(
            &conn,
            &[db::AddressRow {
                entity_id: "c1".to_string(),
                is_main: true,
                address_line: None,
                city: Some("Tel Aviv".to_string()),
                country: Some("Israel".to_string()),
                zip_code: None,
            }],
        )
        .unwrap();

        conn
    }

    fn ids(rows: &[CompanySummary]) -> Vec<&str> {
        rows.iter().map(|r| r.entity_id.as_str()).collect()
    }

    #[test]
    fn unfiltered_listing_is_ordered_and_counted() {
        let conn = seeded_conn();
        let rows = list_companies(&conn, &FilterState::default(), &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c1", "c2", "c3"]);
        assert_eq!(count_companies(&conn, &FilterState::default()).unwrap(), 3);
    }

    #[test]
    fn sector_and_stage_filters() {
        let conn = seeded_conn();
        let filters = decode("sectors=Agritech,Biomed");
        let rows = list_companies(&conn, &filters, &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c1", "c2"]);

        let filters = decode("sectors=Agritech,Biomed&stages=Seed");
        let rows = list_companies(&conn, &filters, &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c1"]);
    }

    #[test]
    fn year_range_filter() {
        let conn = seeded_conn();
        let rows =
            list_companies(&conn, &decode("ymin=2010"), &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c1", "c3"]);

        let rows =
            list_companies(&conn, &decode("ymin=2010&ymax=2016"), &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c3"]);
    }

    #[test]
    fn keyword_matches_name_and_description() {
        let conn = seeded_conn();
        let rows = list_companies(&conn, &decode("q=Grid"), &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c3"]);

        let rows = list_companies(&conn, &decode("q=does+things"), &PageRequest::default()).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn vertical_or_filter() {
        let conn = seeded_conn();
        let rows = list_companies(&conn, &decode("tv=ai,iot"), &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c1", "c2"]);
        assert_eq!(count_companies(&conn, &decode("tv=ai,iot")).unwrap(), 2);
    }

    #[test]
    fn vertical_and_filter() {
        let conn = seeded_conn();
        let filters = decode("tv=ai,iot&tvOp=AND");
        let rows = list_companies(&conn, &filters, &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c1"]);
        assert_eq!(count_companies(&conn, &filters).unwrap(), 1);
    }

    #[test]
    fn vertical_filter_composes_with_other_filters() {
        let conn = seeded_conn();
        let filters = decode("tv=ai&sectors=Biomed");
        let rows = list_companies(&conn, &filters, &PageRequest::default()).unwrap();
        assert_eq!(ids(&rows), vec!["c2"]);
    }

    #[test]
    fn unmatched_vertical_yields_empty_page_and_zero_count() {
        let conn = seeded_conn();
        let filters = FilterState {
            tech_verticals: TechVerticalFilter::new(["nope"], FilterOperator::Or),
            ..Default::default()
        };
        assert!(list_companies(&conn, &filters, &PageRequest::default()).unwrap().is_empty());
        assert_eq!(count_companies(&conn, &filters).unwrap(), 0);
    }

    #[test]
    fn listing_pages_are_disjoint() {
        let conn = seeded_conn();
        let first =
            list_companies(&conn, &FilterState::default(), &PageRequest::new(1, 2)).unwrap();
        let second =
            list_companies(&conn, &FilterState::default(), &PageRequest::new(2, 2)).unwrap();
        assert_eq!(ids(&first), vec!["c1", "c2"]);
        assert_eq!(ids(&second), vec!["c3"]);
    }

    #[test]
    fn company_details_are_assembled() {
        let conn = seeded_conn();
        let details = get_company(&conn, "c1").unwrap();
        assert_eq!(details.summary.name, "AgriSense");
        let vertical_names: Vec<&str> =
            details.verticals.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(vertical_names, vec!["Artificial Intelligence", "IoT"]);
        assert_eq!(details.management.len(), 1);
        assert_eq!(details.management[0].person_name, "Dana Levi");
        assert_eq!(details.deals.len(), 1);
        assert_eq!(details.deals[0].participants.len(), 1);
        assert_eq!(
            details.deals[0].participants[0].participant_name.as_deref(),
            Some("Delta Capital")
        );
        assert_eq!(details.address.as_ref().unwrap().city.as_deref(), Some("Tel Aviv"));
    }

    #[test]
    fn missing_company_is_not_found() {
        let conn = seeded_conn();
        assert!(matches!(get_company(&conn, "ghost"), Err(StoreError::NotFound)));
    }

    #[test]
    fn person_details_split_positions() {
        let conn = seeded_conn();
        let person = get_person(&conn, "p1").unwrap();
        assert_eq!(person.full_name, "Dana Levi");
        assert_eq!(person.current_positions.len(), 1);
        assert_eq!(
            person.current_positions[0].organization_name.as_deref(),
            Some("AgriSense")
        );
        assert_eq!(person.past_positions.len(), 1);
        assert_eq!(person.past_positions[0].title, "CTO");
    }

    #[test]
    fn missing_person_is_not_found() {
        let conn = seeded_conn();
        assert!(matches!(get_person(&conn, "c1"), Err(StoreError::NotFound)));
    }

    #[test]
    fn stats_count_every_collection() {
        let conn = seeded_conn();
        let stats = ecosystem_stats(&conn).unwrap();
        assert_eq!(
            stats,
            EcosystemStats {
                companies: 3,
                people: 1,
                investment_firms: 2,
                funds: 0,
                service_providers: 0,
            }
        );
    }

    #[test]
    fn verticals_are_listed_by_name() {
        let conn = seeded_conn();
        let verticals = list_tech_verticals(&conn).unwrap();
        let names: Vec<&str> = verticals.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Artificial Intelligence", "IoT"]);
    }

    #[test]
    fn export_carries_vertical_names() {
        let conn = seeded_conn();
        let exports = export_companies(&conn).unwrap();
        assert_eq!(exports.len(), 3);
        assert_eq!(
            exports[0].vertical_names,
            vec!["Artificial Intelligence".to_string(), "IoT".to_string()]
        );
        assert!(exports[2].vertical_names.is_empty());
    }
}
