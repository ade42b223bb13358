//! Tech-vertical matching over the abstract membership relation.
//!
//! Implemented once against `MembershipLookup` so every backing store shares
//! the same semantics; the SQLite adapter lives in `queries`.

use std::collections::{HashMap, HashSet};

use crate::error::StoreError;
use crate::filters::{FilterOperator, TechVerticalFilter};

/// Upper bound on every per-vertical scan and on the resolved set itself.
/// Keeps adversarial filter combinations from driving unbounded scans.
pub const MATCH_CAP: usize = 1000;

/// Read-only lookup of entity ids holding a membership for one vertical.
pub trait MembershipLookup {
    fn entity_ids_for_vertical(
        &self,
        vertical_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

/// Resolve a tech-vertical filter to the set of matching entity ids.
///
/// OR: an entity matches with a membership for any requested vertical.
/// AND: an entity matches only with memberships for every requested vertical,
/// computed by counting distinct matched verticals per entity.
///
/// The returned set is used purely for membership testing; order is
/// irrelevant. Callers must skip the matcher entirely when no vertical filter
/// is present — an empty id set is rejected rather than guessed at.
pub fn resolve<L: MembershipLookup>(
    lookup: &L,
    filter: &TechVerticalFilter,
    cap: usize,
) -> Result<HashSet<String>, StoreError> {
    if filter.ids.is_empty() {
        return Err(StoreError::UnsupportedFilter(
            "tech-vertical filter with an empty id set".to_string(),
        ));
    }

    match filter.operator {
        FilterOperator::Or => {
            let mut matched = HashSet::new();
            'verticals: for vertical_id in &filter.ids {
                for entity_id in lookup.entity_ids_for_vertical(vertical_id, cap)? {
                    matched.insert(entity_id);
                    if matched.len() >= cap {
                        break 'verticals;
                    }
                }
            }
            Ok(matched)
        }
        FilterOperator::And => {
            // filter.ids is canonical (deduplicated), so an entity counted
            // once per vertical reaches ids.len() iff it holds all of them.
            let mut counts: HashMap<String, usize> = HashMap::new();
            for vertical_id in &filter.ids {
                let members: HashSet<String> = lookup
                    .entity_ids_for_vertical(vertical_id, cap)?
                    .into_iter()
                    .collect();
                for entity_id in members {
                    *counts.entry(entity_id).or_default() += 1;
                }
            }
            let required = filter.ids.len();
            Ok(counts
                .into_iter()
                .filter(|(_, count)| *count == required)
                .map(|(entity_id, _)| entity_id)
                .take(cap)
                .collect())
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    struct InMemoryMemberships {
        rows: Vec<(&'static str, &'static str)>, // (entity, vertical)
    }

    impl MembershipLookup for InMemoryMemberships {
        fn entity_ids_for_vertical(
            &self,
            vertical_id: &str,
            limit: usize,
        ) -> Result<Vec<String>, StoreError> {
            Ok(self
                .rows
                .iter()
                .filter(|(_, v)| *v == vertical_id)
                .map(|(e, _)| e.to_string())
                .take(limit)
                .collect())
        }
    }

    fn fixture() -> InMemoryMemberships {
        InMemoryMemberships {
            rows: vec![
                ("only-a", "A"),
                ("only-b", "B"),
                ("both", "A"),
                ("both", "B"),
                ("other", "C"),
            ],
        }
    }

    fn filter(ids: &[&str], operator: FilterOperator) -> TechVerticalFilter {
        TechVerticalFilter::new(ids.iter().copied(), operator).unwrap()
    }

    #[test]
    fn or_matches_any_membership() {
        let matched = resolve(&fixture(), &filter(&["A", "B"], FilterOperator::Or), MATCH_CAP).unwrap();
        assert_eq!(
            matched,
            HashSet::from(["only-a".to_string(), "only-b".to_string(), "both".to_string()])
        );
    }

    #[test]
    fn and_requires_every_membership() {
        let matched =
            resolve(&fixture(), &filter(&["A", "B"], FilterOperator::And), MATCH_CAP).unwrap();
        assert_eq!(matched, HashSet::from(["both".to_string()]));
    }

    #[test]
    fn and_over_single_vertical_equals_or() {
        let lookup = fixture();
        let and = resolve(&lookup, &filter(&["A"], FilterOperator::And), MATCH_CAP).unwrap();
        let or = resolve(&lookup, &filter(&["A"], FilterOperator::Or), MATCH_CAP).unwrap();
        assert_eq!(and, or);
    }

    #[test]
    fn unmatched_vertical_yields_empty_set() {
        let matched =
            resolve(&fixture(), &filter(&["Z"], FilterOperator::Or), MATCH_CAP).unwrap();
        assert!(matched.is_empty());

        let matched =
            resolve(&fixture(), &filter(&["A", "Z"], FilterOperator::And), MATCH_CAP).unwrap();
        assert!(matched.is_empty());
    }

    #[test]
    fn empty_id_set_is_rejected() {
        let bad = TechVerticalFilter {
            ids: Vec::new(),
            operator: FilterOperator::Or,
        };
        let err = resolve(&fixture(), &bad, MATCH_CAP).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFilter(_)));
    }

    #[test]
    fn or_result_is_capped() {
        let rows: Vec<(&'static str, &'static str)> = (0..50)
            .map(|i| {
                let entity: &'static str = Box::leak(format!("e{i}").into_boxed_str());
                (entity, "A")
            })
            .collect();
        let lookup = InMemoryMemberships { rows };
        let matched = resolve(&lookup, &filter(&["A"], FilterOperator::Or), 10).unwrap();
        assert_eq!(matched.len(), 10);
    }

    #[test]
    fn or_deduplicates_across_verticals() {
        let matched =
            resolve(&fixture(), &filter(&["A", "B"], FilterOperator::Or), MATCH_CAP).unwrap();
        // "both" appears under A and B but is a single member of the set.
        assert_eq!(matched.len(), 3);
    }
}
