//! Filter state and its URL query-string codec.
//!
//! The query string is the one compatibility-sensitive surface: filter state
//! round-trips through it on every navigation, so the encoding is canonical
//! (multi-valued fields sorted, parameters sorted by key) and decoding is
//! permissive (malformed input degrades to "filter absent", never an error).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Company sectors. Closed set; unknown labels are dropped on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "Agritech")]
    Agritech,
    #[serde(rename = "Biomed")]
    Biomed,
    #[serde(rename = "Cleantech")]
    Cleantech,
    #[serde(rename = "Consumer-Oriented Software")]
    ConsumerSoftware,
    #[serde(rename = "Digital Health")]
    DigitalHealth,
    #[serde(rename = "Energy")]
    Energy,
    #[serde(rename = "Enterprise Software & Infrastructure")]
    EnterpriseSoftware,
    #[serde(rename = "Hardware & Industrial")]
    HardwareIndustrial,
    #[serde(rename = "Medical Devices")]
    MedicalDevices,
    #[serde(rename = "Network Infrastructure")]
    NetworkInfrastructure,
    #[serde(rename = "Semiconductor")]
    Semiconductor,
}

impl Sector {
    pub const ALL: [Sector; 11] = [
        Sector::Agritech,
        Sector::Biomed,
        Sector::Cleantech,
        Sector::ConsumerSoftware,
        Sector::DigitalHealth,
        Sector::Energy,
        Sector::EnterpriseSoftware,
        Sector::HardwareIndustrial,
        Sector::MedicalDevices,
        Sector::NetworkInfrastructure,
        Sector::Semiconductor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Agritech => "Agritech",
            Sector::Biomed => "Biomed",
            Sector::Cleantech => "Cleantech",
            Sector::ConsumerSoftware => "Consumer-Oriented Software",
            Sector::DigitalHealth => "Digital Health",
            Sector::Energy => "Energy",
            Sector::EnterpriseSoftware => "Enterprise Software & Infrastructure",
            Sector::HardwareIndustrial => "Hardware & Industrial",
            Sector::MedicalDevices => "Medical Devices",
            Sector::NetworkInfrastructure => "Network Infrastructure",
            Sector::Semiconductor => "Semiconductor",
        }
    }

    pub fn parse(label: &str) -> Option<Sector> {
        Sector::ALL.iter().find(|s| s.as_str() == label).copied()
    }
}

/// Company funding stages. Closed set, same decode rules as `Sector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Seed")]
    Seed,
    #[serde(rename = "R&D")]
    Rd,
    #[serde(rename = "Initial Revenues")]
    InitialRevenues,
    #[serde(rename = "Revenue Growth")]
    RevenueGrowth,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Seed,
        Stage::Rd,
        Stage::InitialRevenues,
        Stage::RevenueGrowth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Seed => "Seed",
            Stage::Rd => "R&D",
            Stage::InitialRevenues => "Initial Revenues",
            Stage::RevenueGrowth => "Revenue Growth",
        }
    }

    pub fn parse(label: &str) -> Option<Stage> {
        Stage::ALL.iter().find(|s| s.as_str() == label).copied()
    }
}

/// Combination mode for multi-valued tech-vertical filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    And,
    Or,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::And => "AND",
            FilterOperator::Or => "OR",
        }
    }
}

/// Tech-vertical restriction: a non-empty, deduplicated, sorted id set plus
/// the operator combining them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechVerticalFilter {
    pub ids: Vec<String>,
    pub operator: FilterOperator,
}

impl TechVerticalFilter {
    /// Canonicalize a raw id list. Returns `None` when nothing survives
    /// trimming, so an empty selection is indistinguishable from no filter.
    pub fn new<I, S>(ids: I, operator: FilterOperator) -> Option<TechVerticalFilter>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<String> = ids
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            None
        } else {
            Some(TechVerticalFilter { ids, operator })
        }
    }
}

/// Year-established bounds; at least one bound is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YearRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

/// Decoded, canonical filter selections. Derived from the URL on every
/// request and never persisted; empty collections mean "filter absent".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub tech_verticals: Option<TechVerticalFilter>,
    pub sectors: Vec<Sector>,
    pub stages: Vec<Stage>,
    pub year_established: Option<YearRange>,
    pub keyword: Option<String>,
}

impl FilterState {
    pub fn has_active_filters(&self) -> bool {
        self.tech_verticals.is_some()
            || !self.sectors.is_empty()
            || !self.stages.is_empty()
            || self.year_established.is_some()
            || self.keyword.is_some()
    }
}

// ── Query-string codec ──

/// Parse a raw query string into key/value pairs. First occurrence of a key
/// wins, keys and values are percent-decoded, `+` reads as a space.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params = BTreeMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        params.entry(key).or_insert_with(|| decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Decode URL query parameters into a canonical `FilterState`. Never fails:
/// unknown enum labels, unparsable years and empty lists all degrade to the
/// filter being absent.
pub fn decode(query: &str) -> FilterState {
    let params = parse_query(query);
    let mut state = FilterState::default();

    if let Some(raw) = params.get("tv") {
        // Anything other than the literal AND means OR.
        let operator = match params.get("tvOp").map(String::as_str) {
            Some("AND") => FilterOperator::And,
            _ => FilterOperator::Or,
        };
        state.tech_verticals = TechVerticalFilter::new(raw.split(','), operator);
    }

    if let Some(raw) = params.get("sectors") {
        let mut sectors: Vec<Sector> = raw
            .split(',')
            .filter_map(|s| Sector::parse(s.trim()))
            .collect();
        sectors.sort_by_key(|s| s.as_str());
        sectors.dedup();
        state.sectors = sectors;
    }

    if let Some(raw) = params.get("stages") {
        let mut stages: Vec<Stage> = raw
            .split(',')
            .filter_map(|s| Stage::parse(s.trim()))
            .collect();
        stages.sort_by_key(|s| s.as_str());
        stages.dedup();
        state.stages = stages;
    }

    let min = params.get("ymin").and_then(|v| v.trim().parse::<i32>().ok());
    let max = params.get("ymax").and_then(|v| v.trim().parse::<i32>().ok());
    if min.is_some() || max.is_some() {
        state.year_established = Some(YearRange { min, max });
    }

    let keyword = params
        .get("q")
        .or_else(|| params.get("keyword"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    state.keyword = keyword;

    state
}

/// Encode a `FilterState` into its canonical query string: absent fields are
/// omitted, multi-valued fields are sorted, parameters are sorted by key and
/// values percent-encoded. Re-encoding a decoded state is byte-stable.
pub fn encode(state: &FilterState) -> String {
    let mut params: BTreeMap<&'static str, String> = BTreeMap::new();

    if let Some(tv) = &state.tech_verticals {
        let mut ids = tv.ids.clone();
        ids.sort();
        ids.dedup();
        params.insert("tv", ids.join(","));
        params.insert("tvOp", tv.operator.as_str().to_string());
    }
    if !state.sectors.is_empty() {
        let mut labels: Vec<&str> = state.sectors.iter().map(Sector::as_str).collect();
        labels.sort();
        labels.dedup();
        params.insert("sectors", labels.join(","));
    }
    if !state.stages.is_empty() {
        let mut labels: Vec<&str> = state.stages.iter().map(Stage::as_str).collect();
        labels.sort();
        labels.dedup();
        params.insert("stages", labels.join(","));
    }
    if let Some(range) = &state.year_established {
        if let Some(min) = range.min {
            params.insert("ymin", min.to_string());
        }
        if let Some(max) = range.max {
            params.insert("ymax", max.to_string());
        }
    }
    if let Some(keyword) = &state.keyword {
        params.insert("q", keyword.clone());
    }

    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_spec_scenario() {
        let state = decode("?tv=v2,v1&tvOp=AND&sectors=Biomed&ymin=2010");
        assert_eq!(
            state.tech_verticals,
            Some(TechVerticalFilter {
                ids: vec!["v1".to_string(), "v2".to_string()],
                operator: FilterOperator::And,
            })
        );
        assert_eq!(state.sectors, vec![Sector::Biomed]);
        assert!(state.stages.is_empty());
        assert_eq!(
            state.year_established,
            Some(YearRange { min: Some(2010), max: None })
        );
        assert_eq!(state.keyword, None);
    }

    #[test]
    fn encode_spec_scenario() {
        let state = decode("?tv=v2,v1&tvOp=AND&sectors=Biomed&ymin=2010");
        assert_eq!(encode(&state), "sectors=Biomed&tv=v1%2Cv2&tvOp=AND&ymin=2010");
    }

    #[test]
    fn round_trip_is_identity_on_canonical_states() {
        let inputs = [
            "",
            "tv=a,b,c&tvOp=OR",
            "sectors=Agritech,Biomed&stages=Seed",
            "ymin=1999&ymax=2021",
            "q=quantum%20sensing",
            "tv=x&sectors=Energy&stages=R%26D&ymax=2015&q=grid",
        ];
        for input in inputs {
            let state = decode(input);
            let encoded = encode(&state);
            assert_eq!(decode(&encoded), state, "input: {input}");
        }
    }

    #[test]
    fn encode_is_order_independent() {
        let a = decode("tv=v3,v1,v2&tvOp=AND");
        let b = decode("tv=v2,v3,v1&tvOp=AND");
        assert_eq!(encode(&a), encode(&b));

        let c = decode("sectors=Biomed,Agritech");
        let d = decode("sectors=Agritech,Biomed,Agritech");
        assert_eq!(encode(&c), encode(&d));
    }

    #[test]
    fn invalid_enum_values_are_dropped() {
        let state = decode("sectors=Agritech,NotASector");
        assert_eq!(state.sectors, vec![Sector::Agritech]);

        let state = decode("stages=Seed,Mezzanine");
        assert_eq!(state.stages, vec![Stage::Seed]);
    }

    #[test]
    fn all_invalid_enum_values_mean_filter_absent() {
        let state = decode("sectors=NotASector,AlsoWrong");
        assert!(state.sectors.is_empty());
        assert!(!state.has_active_filters());
    }

    #[test]
    fn empty_tv_list_is_filter_absent() {
        assert_eq!(decode("tv=").tech_verticals, None);
        assert_eq!(decode("tv=, ,").tech_verticals, None);
    }

    #[test]
    fn tv_operator_defaults_to_or() {
        let state = decode("tv=a,b");
        assert_eq!(state.tech_verticals.unwrap().operator, FilterOperator::Or);

        // Anything but the literal AND is OR.
        let state = decode("tv=a,b&tvOp=and");
        assert_eq!(state.tech_verticals.unwrap().operator, FilterOperator::Or);
    }

    #[test]
    fn tv_ids_are_deduplicated_and_sorted() {
        let state = decode("tv=z,a,z,%20m%20");
        assert_eq!(
            state.tech_verticals.unwrap().ids,
            vec!["a".to_string(), "m".to_string(), "z".to_string()]
        );
    }

    #[test]
    fn year_bounds_parse_leniently() {
        assert_eq!(decode("ymin=abc").year_established, None);
        assert_eq!(
            decode("ymin=abc&ymax=2012").year_established,
            Some(YearRange { min: None, max: Some(2012) })
        );
        assert_eq!(decode("ymin=&ymax=").year_established, None);
    }

    #[test]
    fn keyword_aliases_and_trimming() {
        assert_eq!(decode("q=robotics").keyword.as_deref(), Some("robotics"));
        assert_eq!(decode("keyword=robotics").keyword.as_deref(), Some("robotics"));
        // q wins over the alias
        assert_eq!(decode("q=a&keyword=b").keyword.as_deref(), Some("a"));
        assert_eq!(decode("q=%20%20").keyword, None);
    }

    #[test]
    fn has_active_filters_truth_table() {
        assert!(!FilterState::default().has_active_filters());
        let state = FilterState {
            keyword: Some("x".to_string()),
            ..Default::default()
        };
        assert!(state.has_active_filters());
        assert!(decode("sectors=Energy").has_active_filters());
        assert!(!decode("sectors=Bogus").has_active_filters());
    }

    #[test]
    fn labels_with_ampersands_survive_the_codec() {
        let state = FilterState {
            sectors: vec![Sector::EnterpriseSoftware, Sector::HardwareIndustrial],
            stages: vec![Stage::Rd],
            ..Default::default()
        };
        let encoded = encode(&state);
        assert_eq!(decode(&encoded), state);
    }
}
