mod db;
mod error;
mod filters;
mod matcher;
mod pagination;
mod queries;
mod search;
mod seed;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::StoreError;
use crate::filters::{FilterOperator, FilterState, Sector, Stage, TechVerticalFilter, YearRange};
use crate::pagination::{PageInfo, PageRequest, DEFAULT_LIMIT};

#[derive(Parser)]
#[command(name = "techmap", about = "Tech-ecosystem directory: companies, people, investors, funds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Default)]
struct FilterArgs {
    /// Tech vertical ids, comma-separated
    #[arg(long = "tv")]
    tech_verticals: Option<String>,
    /// Tech vertical combination mode: AND or OR
    #[arg(long = "tv-op", default_value = "OR")]
    tv_op: String,
    /// Sector labels, comma-separated
    #[arg(long)]
    sectors: Option<String>,
    /// Stage labels, comma-separated
    #[arg(long)]
    stages: Option<String>,
    /// Established on or after this year
    #[arg(long)]
    ymin: Option<i32>,
    /// Established on or before this year
    #[arg(long)]
    ymax: Option<i32>,
}

impl FilterArgs {
    fn to_filter_state(&self, keyword: Option<String>) -> FilterState {
        let operator = match self.tv_op.as_str() {
            "AND" => FilterOperator::And,
            _ => FilterOperator::Or,
        };
        let tech_verticals = self
            .tech_verticals
            .as_deref()
            .and_then(|raw| TechVerticalFilter::new(raw.split(','), operator));

        let mut sectors: Vec<Sector> = self
            .sectors
            .as_deref()
            .map(|raw| raw.split(',').filter_map(|s| Sector::parse(s.trim())).collect())
            .unwrap_or_default();
        sectors.sort_by_key(|s| s.as_str());
        sectors.dedup();

        let mut stages: Vec<Stage> = self
            .stages
            .as_deref()
            .map(|raw| raw.split(',').filter_map(|s| Stage::parse(s.trim())).collect())
            .unwrap_or_default();
        stages.sort_by_key(|s| s.as_str());
        stages.dedup();

        let year_established = if self.ymin.is_some() || self.ymax.is_some() {
            Some(YearRange { min: self.ymin, max: self.ymax })
        } else {
            None
        };

        FilterState {
            tech_verticals,
            sectors,
            stages,
            year_established,
            keyword: keyword.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Load a JSON dataset into the database
    Seed {
        /// Path to the dataset file
        file: PathBuf,
    },
    /// Ecosystem aggregates for the landing view
    Stats,
    /// Companies directory with filters and pagination
    Companies {
        #[command(flatten)]
        filter_args: FilterArgs,
        /// Keyword matched against name and description
        #[arg(short, long)]
        keyword: Option<String>,
        /// Raw URL query string; overrides the individual filter flags
        #[arg(long)]
        query: Option<String>,
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },
    /// Company detail view
    Company { id: String },
    /// Person detail view
    Person { id: String },
    /// List tech verticals
    Verticals,
    /// Keyword search through the external index
    Search {
        keyword: String,
        #[command(flatten)]
        filter_args: FilterArgs,
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },
    /// Push company documents into the external index
    Index,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            println!("Schema ready.");
            Ok(())
        }
        Commands::Seed { file } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            println!("Seeding from {}...", file.display());
            let counts = seed::load_dataset(&conn, &file)?;
            counts.print();
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = queries::ecosystem_stats(&conn)?;
            println!("Companies:         {}", s.companies);
            println!("People:            {}", s.people);
            println!("Investment firms:  {}", s.investment_firms);
            println!("Funds:             {}", s.funds);
            println!("Service providers: {}", s.service_providers);
            Ok(())
        }
        Commands::Companies { filter_args, keyword, query, page, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;

            let (filter_state, requested) = match &query {
                Some(raw) => (
                    filters::decode(raw),
                    PageRequest::from_query_params(&filters::parse_query(raw)),
                ),
                None => (filter_args.to_filter_state(keyword), PageRequest::new(page, limit)),
            };

            let total = queries::count_companies(&conn, &filter_state)?;
            let info = PageInfo::compute(total, &requested);
            let rows =
                queries::list_companies(&conn, &filter_state, &requested.clamped_to(total))?;

            if rows.is_empty() {
                println!("No companies match the current filters.");
            } else {
                println!(
                    "{:<12} | {:<28} | {:<22} | {:<16} | {:>4}",
                    "ID", "Company", "Sector", "Stage", "Year"
                );
                println!("{}", "-".repeat(95));
                for r in &rows {
                    println!(
                        "{:<12} | {:<28} | {:<22} | {:<16} | {:>4}",
                        truncate(&r.entity_id, 12),
                        truncate(&r.name, 28),
                        truncate(r.sector.as_deref().unwrap_or("-"), 22),
                        truncate(r.stage.as_deref().unwrap_or("-"), 16),
                        r.year_established.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
                    );
                }
            }

            println!(
                "\nShowing {}-{} of {} (page {}/{})",
                info.from, info.to, info.total, info.page, info.total_pages
            );
            if filter_state.has_active_filters() {
                println!("Filters: ?{}", filters::encode(&filter_state));
            }
            Ok(())
        }
        Commands::Company { id } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            match queries::get_company(&conn, &id) {
                Ok(details) => {
                    print_company(&details);
                    Ok(())
                }
                Err(StoreError::NotFound) => {
                    println!("Company not found: {id}");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Person { id } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            match queries::get_person(&conn, &id) {
                Ok(person) => {
                    print_person(&person);
                    Ok(())
                }
                Err(StoreError::NotFound) => {
                    println!("Person not found: {id}");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Verticals => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let verticals = queries::list_tech_verticals(&conn)?;
            for v in &verticals {
                println!("{:<16} {}", v.id, v.name);
            }
            println!("\n{} tech verticals", verticals.len());
            Ok(())
        }
        Commands::Search { keyword, filter_args, page, limit } => {
            let client = search::SearchClient::from_env()?;
            let filter_state = filter_args.to_filter_state(None);
            let requested = PageRequest::new(page, limit);
            let results = client.search_companies(&keyword, &filter_state, &requested).await?;

            for hit in &results.hits {
                println!(
                    "{:<12} | {:<28} | {}",
                    truncate(&hit.id, 12),
                    truncate(&hit.company_name, 28),
                    hit.sector.as_deref().unwrap_or("-"),
                );
            }
            let info = PageInfo::compute(results.found, &requested);
            println!(
                "\n{} results ({}-{}, page {}/{})",
                info.total, info.from, info.to, info.page, info.total_pages
            );
            Ok(())
        }
        Commands::Index => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let exports = queries::export_companies(&conn)?;
            if exports.is_empty() {
                println!("No companies to index. Run 'seed' first.");
                return Ok(());
            }
            let docs: Vec<search::CompanyDoc> =
                exports.into_iter().map(search::CompanyDoc::from).collect();

            let client = search::SearchClient::from_env()?;
            client.ensure_collection().await?;
            let accepted = client.index_companies(&docs).await?;
            println!("Indexed {} of {} company documents.", accepted, docs.len());
            Ok(())
        }
    }
}

fn print_company(details: &queries::CompanyDetails) {
    let s = &details.summary;
    println!("{} ({})", s.name, s.entity_id);
    if let Some(website) = &s.website {
        println!("  {}", website);
    }
    if let Some(description) = &s.description {
        println!("  {}", description);
    }
    println!(
        "  Sector: {} | Stage: {} | Established: {}",
        s.sector.as_deref().unwrap_or("-"),
        s.stage.as_deref().unwrap_or("-"),
        s.year_established.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
    );
    if let Some(address) = &details.address {
        let parts: Vec<&str> = [
            address.address_line.as_deref(),
            address.city.as_deref(),
            address.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !parts.is_empty() {
            println!("  Address: {}", parts.join(", "));
        }
    }

    if !details.verticals.is_empty() {
        let names: Vec<&str> = details.verticals.iter().map(|v| v.name.as_str()).collect();
        println!("\nTech verticals: {}", names.join(", "));
    }
    if !details.management.is_empty() {
        println!("\nManagement:");
        for m in &details.management {
            println!("  {} - {} ({})", m.person_name, m.title, m.person_id);
        }
    }
    if !details.board.is_empty() {
        println!("\nBoard:");
        for b in &details.board {
            println!("  {} - {} ({})", b.person_name, b.title, b.person_id);
        }
    }
    if !details.deals.is_empty() {
        println!("\nFunding:");
        for d in &details.deals {
            let amount = d
                .amount_usd
                .map(|a| format!("${:.1}M", a / 1_000_000.0))
                .unwrap_or_else(|| "-".into());
            println!(
                "  {} | {} | {}",
                d.deal_date.as_deref().unwrap_or("-"),
                d.deal_type.as_deref().unwrap_or("-"),
                amount
            );
            for p in &d.participants {
                println!(
                    "    {} ({})",
                    p.participant_name.as_deref().unwrap_or(&p.participant_id),
                    p.role
                );
            }
        }
    }
}

fn print_person(person: &queries::PersonDetails) {
    println!("{} ({})", person.full_name, person.entity_id);
    if let Some(email) = &person.email {
        println!("  {}", email);
    }
    if let Some(linkedin) = &person.linkedin {
        println!("  {}", linkedin);
    }
    if let Some(bio) = &person.bio {
        println!("  {}", bio);
    }
    if !person.current_positions.is_empty() {
        println!("\nCurrent positions:");
        for p in &person.current_positions {
            println!(
                "  {} at {}",
                p.title,
                p.organization_name.as_deref().unwrap_or(&p.organization_id)
            );
        }
    }
    if !person.past_positions.is_empty() {
        println!("\nPast positions:");
        for p in &person.past_positions {
            println!(
                "  {} at {}",
                p.title,
                p.organization_name.as_deref().unwrap_or(&p.organization_id)
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
