//! Keyword search against the external index.
//!
//! Filters are translated into the index's boolean filter-expression grammar;
//! the translation is an order-preserving string join, all semantics live in
//! `filters` and `matcher`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::filters::{FilterOperator, FilterState};
use crate::pagination::PageRequest;
use crate::queries::CompanyExport;

const COLLECTION: &str = "companies";
const QUERY_BY: &str = "companyName,companyDescription";

/// A company document as stored in the search index. Field names follow the
/// index schema, which predates this codebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDoc {
    pub id: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "companyDescription", skip_serializing_if = "Option::is_none")]
    pub company_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(rename = "establishedYear", skip_serializing_if = "Option::is_none")]
    pub established_year: Option<i32>,
    #[serde(rename = "techVerticals", default)]
    pub tech_verticals: Vec<String>,
}

impl From<CompanyExport> for CompanyDoc {
    fn from(export: CompanyExport) -> CompanyDoc {
        let summary = export.summary;
        CompanyDoc {
            id: summary.entity_id,
            company_name: summary.name,
            company_description: summary.description,
            sector: summary.sector,
            stage: summary.stage,
            established_year: summary.year_established,
            tech_verticals: export.vertical_names,
        }
    }
}

/// Translate the non-keyword filters into a filter expression. Clause order
/// follows field order in `FilterState`; an empty result means "no filter".
pub fn filter_expression(filters: &FilterState) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if let Some(tv) = &filters.tech_verticals {
        match tv.operator {
            FilterOperator::Or => {
                clauses.push(format!("techVerticals:=[{}]", quoted_list(&tv.ids)));
            }
            // AND has no list form; one clause per id.
            FilterOperator::And => {
                for id in &tv.ids {
                    clauses.push(format!("techVerticals:=[{}]", quote(id)));
                }
            }
        }
    }
    if !filters.sectors.is_empty() {
        let labels: Vec<String> = filters.sectors.iter().map(|s| s.as_str().to_string()).collect();
        clauses.push(format!("sector:=[{}]", quoted_list(&labels)));
    }
    if !filters.stages.is_empty() {
        let labels: Vec<String> = filters.stages.iter().map(|s| s.as_str().to_string()).collect();
        clauses.push(format!("stage:=[{}]", quoted_list(&labels)));
    }
    if let Some(range) = &filters.year_established {
        if let Some(min) = range.min {
            clauses.push(format!("establishedYear:>={min}"));
        }
        if let Some(max) = range.max {
            clauses.push(format!("establishedYear:<={max}"));
        }
    }

    clauses.join(" && ")
}

fn quote(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        value.to_string()
    } else {
        format!("`{value}`")
    }
}

fn quoted_list(values: &[String]) -> String {
    values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",")
}

// ── HTTP client ──

pub struct SearchClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Debug)]
pub struct SearchResults {
    pub found: u64,
    pub hits: Vec<CompanyDoc>,
}

#[derive(Deserialize)]
struct RawSearchResponse {
    found: u64,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    document: CompanyDoc,
}

impl SearchClient {
    pub fn from_env() -> Result<SearchClient> {
        let host = std::env::var("TYPESENSE_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = std::env::var("TYPESENSE_PORT").unwrap_or_else(|_| "8108".to_string());
        let api_key = std::env::var("TYPESENSE_API_KEY")
            .context("TYPESENSE_API_KEY environment variable must be set")?;
        Ok(SearchClient {
            base_url: format!("http://{host}:{port}"),
            api_key,
            http: reqwest::Client::new(),
        })
    }

    /// Keyword search over company documents, with the decoded filters
    /// applied as an index-side filter expression.
    pub async fn search_companies(
        &self,
        keyword: &str,
        filters: &FilterState,
        page: &PageRequest,
    ) -> Result<SearchResults, StoreError> {
        let url = format!(
            "{}/collections/{}/documents/search",
            self.base_url, COLLECTION
        );
        let mut query: Vec<(&str, String)> = vec![
            ("q", keyword.to_string()),
            ("query_by", QUERY_BY.to_string()),
            ("page", page.page().to_string()),
            ("per_page", page.limit().to_string()),
        ];
        let expression = filter_expression(filters);
        if !expression.is_empty() {
            query.push(("filter_by", expression));
        }

        let response = self
            .http
            .get(&url)
            .header("X-TYPESENSE-API-KEY", &self.api_key)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        let raw: RawSearchResponse = response.json().await?;
        Ok(SearchResults {
            found: raw.found,
            hits: raw.hits.into_iter().map(|h| h.document).collect(),
        })
    }

    /// Create the companies collection if missing. A conflict response means
    /// it already exists.
    pub async fn ensure_collection(&self) -> Result<()> {
        let schema = serde_json::json!({
            "name": COLLECTION,
            "fields": [
                { "name": "companyName", "type": "string" },
                { "name": "companyDescription", "type": "string", "optional": true },
                { "name": "sector", "type": "string", "facet": true, "optional": true },
                { "name": "stage", "type": "string", "facet": true, "optional": true },
                { "name": "establishedYear", "type": "int32", "facet": true, "optional": true },
                { "name": "techVerticals", "type": "string[]", "facet": true },
            ],
        });
        let response = self
            .http
            .post(format!("{}/collections", self.base_url))
            .header("X-TYPESENSE-API-KEY", &self.api_key)
            .json(&schema)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }

    /// Bulk-upsert company documents (JSONL import). Returns the number of
    /// documents the index accepted.
    pub async fn index_companies(&self, docs: &[CompanyDoc]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }
        let mut lines = Vec::with_capacity(docs.len());
        for doc in docs {
            lines.push(serde_json::to_string(doc)?);
        }
        let body = lines.join("\n");

        let url = format!(
            "{}/collections/{}/documents/import?action=upsert",
            self.base_url, COLLECTION
        );
        let response = self
            .http
            .post(&url)
            .header("X-TYPESENSE-API-KEY", &self.api_key)
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        // One JSON result line per document.
        let text = response.text().await?;
        let mut accepted = 0usize;
        for line in text.lines() {
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(value) if value.get("success").and_then(|v| v.as_bool()) == Some(true) => {
                    accepted += 1;
                }
                Ok(value) => warn!("index rejected document: {value}"),
                Err(_) => warn!("unparsable import result line: {line}"),
            }
        }
        Ok(accepted)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::decode;

    #[test]
    fn empty_filters_produce_empty_expression() {
        assert_eq!(filter_expression(&FilterState::default()), "");
    }

    #[test]
    fn or_verticals_become_one_list_clause() {
        let filters = decode("tv=v2,v1");
        assert_eq!(filter_expression(&filters), "techVerticals:=[v1,v2]");
    }

    #[test]
    fn and_verticals_become_one_clause_per_id() {
        let filters = decode("tv=v2,v1&tvOp=AND");
        assert_eq!(
            filter_expression(&filters),
            "techVerticals:=[v1] && techVerticals:=[v2]"
        );
    }

    #[test]
    fn clause_order_is_stable() {
        let filters = decode("tv=v1&sectors=Biomed&stages=Seed&ymin=2010&ymax=2020");
        assert_eq!(
            filter_expression(&filters),
            "techVerticals:=[v1] && sector:=[Biomed] && stage:=[Seed] \
             && establishedYear:>=2010 && establishedYear:<=2020"
        );
    }

    #[test]
    fn labels_with_separators_are_quoted() {
        let filters = decode("sectors=Enterprise%20Software%20%26%20Infrastructure&stages=R%26D");
        assert_eq!(
            filter_expression(&filters),
            "sector:=[`Enterprise Software & Infrastructure`] && stage:=[`R&D`]"
        );
    }

    #[test]
    fn keyword_is_not_part_of_the_expression() {
        let filters = decode("q=robots&sectors=Energy");
        assert_eq!(filter_expression(&filters), "sector:=[Energy]");
    }

    #[test]
    fn doc_serializes_with_index_field_names() {
        let doc = CompanyDoc {
            id: "c1".to_string(),
            company_name: "Acme".to_string(),
            company_description: None,
            sector: Some("Energy".to_string()),
            stage: None,
            established_year: Some(2012),
            tech_verticals: vec!["ai".to_string()],
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["companyName"], "Acme");
        assert_eq!(json["establishedYear"], 2012);
        assert_eq!(json["techVerticals"][0], "ai");
        assert!(json.get("companyDescription").is_none());
    }
}
