use anyhow::Result;
use rusqlite::Connection;

const DB_PATH: &str = "data/techmap.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(parent) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entities (
            id              TEXT PRIMARY KEY,
            entity_type     TEXT NOT NULL CHECK(entity_type IN
                ('Company','Person','InvestmentFirm','ServiceProvider','Fund')),
            ivc_number      TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            last_updated_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type);

        CREATE TABLE IF NOT EXISTS companies (
            entity_id        TEXT PRIMARY KEY REFERENCES entities(id),
            name             TEXT NOT NULL,
            website          TEXT,
            linkedin         TEXT,
            year_established INTEGER,
            description      TEXT,
            sector           TEXT,
            stage            TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_companies_sector ON companies(sector);
        CREATE INDEX IF NOT EXISTS idx_companies_stage ON companies(stage);
        CREATE INDEX IF NOT EXISTS idx_companies_year ON companies(year_established);

        CREATE TABLE IF NOT EXISTS people (
            entity_id TEXT PRIMARY KEY REFERENCES entities(id),
            full_name TEXT NOT NULL,
            email     TEXT,
            linkedin  TEXT,
            bio       TEXT
        );

        CREATE TABLE IF NOT EXISTS investment_firms (
            entity_id           TEXT PRIMARY KEY REFERENCES entities(id),
            name                TEXT NOT NULL,
            website             TEXT,
            linkedin            TEXT,
            description         TEXT,
            managed_capital_usd REAL
        );

        CREATE TABLE IF NOT EXISTS service_providers (
            entity_id    TEXT PRIMARY KEY REFERENCES entities(id),
            name         TEXT NOT NULL,
            website      TEXT,
            linkedin     TEXT,
            description  TEXT,
            service_type TEXT
        );

        CREATE TABLE IF NOT EXISTS funds (
            entity_id        TEXT PRIMARY KEY REFERENCES entities(id),
            name             TEXT NOT NULL,
            fund_capital_usd REAL,
            status           TEXT,
            managing_firm_id TEXT REFERENCES investment_firms(entity_id)
        );
        CREATE INDEX IF NOT EXISTS idx_funds_firm ON funds(managing_firm_id);

        CREATE TABLE IF NOT EXISTS tech_verticals (
            id   TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_verticals_name ON tech_verticals(name);

        -- Membership: many-to-many company <-> tech vertical
        CREATE TABLE IF NOT EXISTS company_tech_verticals (
            company_id  TEXT NOT NULL REFERENCES companies(entity_id),
            vertical_id TEXT NOT NULL REFERENCES tech_verticals(id),
            UNIQUE(company_id, vertical_id)
        );
        CREATE INDEX IF NOT EXISTS idx_ctv_company ON company_tech_verticals(company_id);
        CREATE INDEX IF NOT EXISTS idx_ctv_vertical ON company_tech_verticals(vertical_id);

        CREATE TABLE IF NOT EXISTS positions (
            id              INTEGER PRIMARY KEY,
            person_id       TEXT NOT NULL REFERENCES people(entity_id),
            organization_id TEXT NOT NULL REFERENCES entities(id),
            title           TEXT NOT NULL,
            position_type   TEXT CHECK(position_type IN ('Management','Board','Employee')),
            is_current      BOOLEAN NOT NULL DEFAULT 1,
            start_date      TEXT,
            end_date        TEXT,
            UNIQUE(person_id, organization_id, title)
        );
        CREATE INDEX IF NOT EXISTS idx_positions_person ON positions(person_id);
        CREATE INDEX IF NOT EXISTS idx_positions_org ON positions(organization_id);
        CREATE INDEX IF NOT EXISTS idx_positions_org_current ON positions(organization_id, is_current);

        CREATE TABLE IF NOT EXISTS deals (
            id            TEXT PRIMARY KEY,
            company_id    TEXT NOT NULL REFERENCES companies(entity_id),
            deal_type     TEXT,
            deal_date     TEXT,
            amount_usd    REAL,
            valuation_usd REAL,
            remarks       TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_deals_company ON deals(company_id);

        CREATE TABLE IF NOT EXISTS deal_participants (
            deal_id             TEXT NOT NULL REFERENCES deals(id),
            participant_id      TEXT NOT NULL REFERENCES entities(id),
            role                TEXT NOT NULL CHECK(role IN
                ('Acquirer','Target','Investor','Lead Legal Advisor','Co-Lead Legal Advisor')),
            investor_amount_usd REAL,
            UNIQUE(deal_id, participant_id)
        );
        CREATE INDEX IF NOT EXISTS idx_dp_deal ON deal_participants(deal_id);
        CREATE INDEX IF NOT EXISTS idx_dp_participant ON deal_participants(participant_id);

        CREATE TABLE IF NOT EXISTS addresses (
            id           INTEGER PRIMARY KEY,
            entity_id    TEXT NOT NULL REFERENCES entities(id),
            is_main      BOOLEAN NOT NULL DEFAULT 0,
            address_line TEXT,
            city         TEXT,
            country      TEXT,
            zip_code     TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_addresses_entity ON addresses(entity_id);
        ",
    )?;
    Ok(())
}

// ── Seed writers ──

pub struct EntityRow {
    pub id: String,
    pub entity_type: &'static str,
    pub ivc_number: Option<String>,
}

pub struct CompanyRow {
    pub entity_id: String,
    pub name: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub year_established: Option<i32>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub stage: Option<String>,
}

pub struct PersonRow {
    pub entity_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
}

pub struct InvestmentFirmRow {
    pub entity_id: String,
    pub name: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub description: Option<String>,
    pub managed_capital_usd: Option<f64>,
}

pub struct ServiceProviderRow {
    pub entity_id: String,
    pub name: String,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<String>,
}

pub struct FundRow {
    pub entity_id: String,
    pub name: String,
    pub fund_capital_usd: Option<f64>,
    pub status: Option<String>,
    pub managing_firm_id: Option<String>,
}

pub struct VerticalRow {
    pub id: String,
    pub name: String,
}

pub struct MembershipRow {
    pub company_id: String,
    pub vertical_id: String,
}

pub struct PositionRow {
    pub person_id: String,
    pub organization_id: String,
    pub title: String,
    pub position_type: Option<String>,
    pub is_current: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub struct DealRow {
    pub id: String,
    pub company_id: String,
    pub deal_type: Option<String>,
    pub deal_date: Option<String>,
    pub amount_usd: Option<f64>,
    pub valuation_usd: Option<f64>,
    pub remarks: Option<String>,
}

pub struct DealParticipantRow {
    pub deal_id: String,
    pub participant_id: String,
    pub role: String,
    pub investor_amount_usd: Option<f64>,
}

pub struct AddressRow {
    pub entity_id: String,
    pub is_main: bool,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

pub fn save_entities(conn: &Connection, rows: &[EntityRow]) -> Result<usize> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO entities (id, entity_type, ivc_number, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in rows {
            count += stmt.execute(rusqlite::params![r.id, r.entity_type, r.ivc_number, now])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn save_verticals(conn: &Connection, rows: &[VerticalRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt =
            tx.prepare("INSERT OR REPLACE INTO tech_verticals (id, name) VALUES (?1, ?2)")?;
        for r in rows {
            count += stmt.execute(rusqlite::params![r.id, r.name])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn save_companies(
    conn: &Connection,
    companies: &[CompanyRow],
    memberships: &[MembershipRow],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut c_stmt = tx.prepare(
            "INSERT OR REPLACE INTO companies
             (entity_id, name, website, linkedin, year_established, description, sector, stage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for c in companies {
            c_stmt.execute(rusqlite::params![
                c.entity_id, c.name, c.website, c.linkedin,
                c.year_established, c.description, c.sector, c.stage,
            ])?;
        }

        let mut m_stmt = tx.prepare(
            "INSERT OR IGNORE INTO company_tech_verticals (company_id, vertical_id)
             VALUES (?1, ?2)",
        )?;
        for m in memberships {
            m_stmt.execute(rusqlite::params![m.company_id, m.vertical_id])?;
        }
    }
    tx.commit()?;
    Ok(companies.len())
}

pub fn save_people(conn: &Connection, rows: &[PersonRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO people (entity_id, full_name, email, linkedin, bio)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![r.entity_id, r.full_name, r.email, r.linkedin, r.bio])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

pub fn save_investment_firms(conn: &Connection, rows: &[InvestmentFirmRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO investment_firms
             (entity_id, name, website, linkedin, description, managed_capital_usd)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.entity_id, r.name, r.website, r.linkedin, r.description, r.managed_capital_usd,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

pub fn save_service_providers(conn: &Connection, rows: &[ServiceProviderRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO service_providers
             (entity_id, name, website, linkedin, description, service_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.entity_id, r.name, r.website, r.linkedin, r.description, r.service_type,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

pub fn save_funds(conn: &Connection, rows: &[FundRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO funds
             (entity_id, name, fund_capital_usd, status, managing_firm_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.entity_id, r.name, r.fund_capital_usd, r.status, r.managing_firm_id,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

pub fn save_positions(conn: &Connection, rows: &[PositionRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO positions
             (person_id, organization_id, title, position_type, is_current, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for r in rows {
            count += stmt.execute(rusqlite::params![
                r.person_id, r.organization_id, r.title, r.position_type,
                r.is_current, r.start_date, r.end_date,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn save_deals(
    conn: &Connection,
    deals: &[DealRow],
    participants: &[DealParticipantRow],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut d_stmt = tx.prepare(
            "INSERT OR REPLACE INTO deals
             (id, company_id, deal_type, deal_date, amount_usd, valuation_usd, remarks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for d in deals {
            d_stmt.execute(rusqlite::params![
                d.id, d.company_id, d.deal_type, d.deal_date,
                d.amount_usd, d.valuation_usd, d.remarks,
            ])?;
        }

        let mut p_stmt = tx.prepare(
            "INSERT OR IGNORE INTO deal_participants
             (deal_id, participant_id, role, investor_amount_usd)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in participants {
            p_stmt.execute(rusqlite::params![
                p.deal_id, p.participant_id, p.role, p.investor_amount_usd,
            ])?;
        }
    }
    tx.commit()?;
    Ok(deals.len())
}

pub fn save_addresses(conn: &Connection, rows: &[AddressRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO addresses (entity_id, is_main, address_line, city, country, zip_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.entity_id, r.is_main, r.address_line, r.city, r.country, r.zip_code,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn membership_rows_are_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        save_entities(
            &conn,
            &[EntityRow {
                id: "c1".to_string(),
                entity_type: "Company",
                ivc_number: None,
            }],
        )
        .unwrap();
        save_verticals(
            &conn,
            &[VerticalRow {
                id: "v1".to_string(),
                name: "AI".to_string(),
            }],
        )
        .unwrap();
        let company = CompanyRow {
            entity_id: "c1".to_string(),
            name: "Acme".to_string(),
            website: None,
            linkedin: None,
            year_established: None,
            description: None,
            sector: None,
            stage: None,
        };
        let membership = || MembershipRow {
            company_id: "c1".to_string(),
            vertical_id: "v1".to_string(),
        };
        save_companies(&conn, &[company], &[membership(), membership()]).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM company_tech_verticals", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
