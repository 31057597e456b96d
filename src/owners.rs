use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::entities::{Company, Person};
use crate::models::{OwnerHistory, RawOwner, CURRENT_OWNERS_KEY};
use crate::normalize::{clean_text, normalize_ws, parse_iso_date, title_case};

#[derive(Debug, Clone, PartialEq)]
pub enum Owner {
    Person(Person),
    Company(Company),
}

#[derive(Debug, Clone, Default)]
pub struct OwnerResolution {
    pub owners: Vec<Owner>,
    pub sale_links: Vec<(usize, usize)>,
    pub current: Vec<usize>,
}

fn key_part(value: Option<&str>) -> String {
    value.map(|v| normalize_ws(v).to_uppercase()).unwrap_or_default()
}

fn person_key(first: Option<&str>, middle: Option<&str>, last: Option<&str>) -> String {
    format!(
        "PERSON:{}|{}|{}",
        key_part(first),
        key_part(middle),
        key_part(last)
    )
}

fn company_key(name: &str) -> String {
    format!("COMPANY:{}", key_part(Some(name)))
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(value);
    }
}

#[derive(Debug, Default)]
struct OwnerRegistry {
    owners: Vec<Owner>,
    by_key: HashMap<String, usize>,
    by_name: HashMap<(String, String), Vec<usize>>,
}

impl OwnerRegistry {
    fn register(&mut self, raw: &RawOwner) -> Option<usize> {
        match raw {
            RawOwner::Person {
                first_name,
                middle_name,
                last_name,
                prefix_name,
                suffix_name,
            } => {
                let person = Person {
                    prefix_name: clean_text(prefix_name.as_deref()),
                    first_name: clean_text(first_name.as_deref()).map(|n| title_case(&n)),
                    middle_name: clean_text(middle_name.as_deref()).map(|n| title_case(&n)),
                    last_name: clean_text(last_name.as_deref()).map(|n| title_case(&n)),
                    suffix_name: clean_text(suffix_name.as_deref()),
                    ..Person::default()
                };
                if person.first_name.is_none() && person.last_name.is_none() {
                    debug!("Person owner without a name skipped");
                    return None;
                }
                Some(self.register_person(person))
            }
            RawOwner::Company { name } => {
                let Some(name) = clean_text(name.as_deref()) else {
                    debug!("Company owner without a name skipped");
                    return None;
                };
                let key = company_key(&name);
                if let Some(&index) = self.by_key.get(&key) {
                    return Some(index);
                }
                Some(self.push(key, Owner::Company(Company { name })))
            }
        }
    }

    fn register_person(&mut self, person: Person) -> usize {
        let key = person_key(
            person.first_name.as_deref(),
            person.middle_name.as_deref(),
            person.last_name.as_deref(),
        );
        let name = (
            key_part(person.first_name.as_deref()),
            key_part(person.last_name.as_deref()),
        );

        let existing = self.by_key.get(&key).copied().or_else(|| {
            // A record with and one without a middle name are the same
            // person when nobody else shares the first/last name.
            let same_name = self.by_name.get(&name)?;
            let &[only] = same_name.as_slice() else {
                return None;
            };
            let only_middle = match &self.owners[only] {
                Owner::Person(p) => p.middle_name.is_some(),
                Owner::Company(_) => return None,
            };
            (person.middle_name.is_none() || !only_middle).then_some(only)
        });

        match existing {
            Some(index) => {
                if let Owner::Person(known) = &mut self.owners[index] {
                    fill(&mut known.prefix_name, &person.prefix_name);
                    fill(&mut known.middle_name, &person.middle_name);
                    fill(&mut known.suffix_name, &person.suffix_name);
                }
                self.by_key.entry(key).or_insert(index);
                index
            }
            None => {
                let index = self.push(key, Owner::Person(person));
                self.by_name.entry(name).or_default().push(index);
                index
            }
        }
    }

    fn push(&mut self, key: String, owner: Owner) -> usize {
        let index = self.owners.len();
        self.owners.push(owner);
        self.by_key.insert(key, index);
        index
    }
}

/// Dedup every bucket of `history`, then link owners to sales.
///
/// `sale_dates` is the transfer date of each sale, most recent first. A
/// dated bucket links its owners to the sales on that date; the current
/// owners are also linked to the first (most recent) sale.
pub fn resolve_owners(history: &OwnerHistory, sale_dates: &[Option<NaiveDate>]) -> OwnerResolution {
    let mut registry = OwnerRegistry::default();

    let mut dated: Vec<(NaiveDate, &[RawOwner])> = Vec::new();
    let mut undated: Vec<&[RawOwner]> = Vec::new();
    for (key, owners) in &history.owners_by_date {
        if key == CURRENT_OWNERS_KEY {
            continue;
        }
        match parse_iso_date(key) {
            Some(date) => dated.push((date, owners.as_slice())),
            None => {
                warn!(bucket = %key, "Owner bucket key is not a date; owners kept but not linked to a sale");
                undated.push(owners.as_slice());
            }
        }
    }
    dated.sort_by_key(|(date, _)| *date);

    let register_all = |registry: &mut OwnerRegistry, owners: &[RawOwner]| -> Vec<usize> {
        let mut seen = BTreeSet::new();
        owners
            .iter()
            .filter_map(|raw| registry.register(raw))
            .filter(|index| seen.insert(*index))
            .collect()
    };

    let by_date: Vec<(NaiveDate, Vec<usize>)> = dated
        .into_iter()
        .map(|(date, owners)| (date, register_all(&mut registry, owners)))
        .collect();
    for owners in undated {
        register_all(&mut registry, owners);
    }
    let current = history
        .owners_by_date
        .get(CURRENT_OWNERS_KEY)
        .map(|owners| register_all(&mut registry, owners.as_slice()))
        .unwrap_or_default();

    let mut sale_links = Vec::new();
    for (sale, date) in sale_dates.iter().enumerate() {
        let mut linked = BTreeSet::new();
        if let Some(date) = date {
            for (_, owners) in by_date.iter().filter(|(d, _)| d == date) {
                for &owner in owners {
                    if linked.insert(owner) {
                        sale_links.push((sale, owner));
                    }
                }
            }
        }
        if sale == 0 {
            for &owner in &current {
                if linked.insert(owner) {
                    sale_links.push((sale, owner));
                }
            }
        }
    }

    debug!(
        owners = registry.owners.len(),
        links = sale_links.len(),
        current = current.len(),
        "Owners resolved"
    );
    OwnerResolution {
        owners: registry.owners,
        sale_links,
        current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(json: &str) -> OwnerHistory {
        serde_json::from_str(json).expect("owner history")
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn person(owner: &Owner) -> &Person {
        match owner {
            Owner::Person(p) => p,
            Owner::Company(c) => panic!("expected a person, got {c:?}"),
        }
    }

    #[test]
    fn duplicate_without_middle_name_merges_and_keeps_middle() {
        let resolved = resolve_owners(
            &history(
                r#"{"owners_by_date": {
                    "2020-01-15": [{"type": "person", "first_name": "JOHN", "last_name": "SMITH"}],
                    "current": [{"type": "person", "first_name": "john", "middle_name": "q", "last_name": "smith"}]
                }}"#,
            ),
            &[],
        );
        assert_eq!(resolved.owners.len(), 1);
        let john = person(&resolved.owners[0]);
        assert_eq!(john.first_name.as_deref(), Some("John"));
        assert_eq!(john.middle_name.as_deref(), Some("Q"));
        assert_eq!(resolved.current, vec![0]);
    }

    #[test]
    fn first_seen_value_wins() {
        let resolved = resolve_owners(
            &history(
                r#"{"owners_by_date": {
                    "2019-05-01": [{"type": "person", "first_name": "Ann", "last_name": "Lee", "suffix_name": "Jr"}],
                    "2021-05-01": [{"type": "person", "first_name": "ann", "last_name": "LEE", "suffix_name": "Sr", "prefix_name": "Dr"}]
                }}"#,
            ),
            &[],
        );
        assert_eq!(resolved.owners.len(), 1);
        let ann = person(&resolved.owners[0]);
        assert_eq!(ann.suffix_name.as_deref(), Some("Jr"));
        assert_eq!(ann.prefix_name.as_deref(), Some("Dr"));
    }

    #[test]
    fn ambiguous_middle_names_stay_separate() {
        let resolved = resolve_owners(
            &history(
                r#"{"owners_by_date": {"current": [
                    {"type": "person", "first_name": "Sam", "middle_name": "A", "last_name": "Ray"},
                    {"type": "person", "first_name": "Sam", "middle_name": "B", "last_name": "Ray"},
                    {"type": "person", "first_name": "Sam", "last_name": "Ray"}
                ]}}"#,
            ),
            &[],
        );
        assert_eq!(resolved.owners.len(), 3);
    }

    #[test]
    fn companies_dedup_on_normalized_name() {
        let resolved = resolve_owners(
            &history(
                r#"{"owners_by_date": {
                    "2018-02-02": [{"type": "company", "name": "Acme  Holdings LLC"}],
                    "current": [{"type": "company", "name": "ACME HOLDINGS LLC"}, {"type": "company", "name": " "}]
                }}"#,
            ),
            &[],
        );
        assert_eq!(resolved.owners.len(), 1);
        assert_eq!(
            resolved.owners[0],
            Owner::Company(Company {
                name: "Acme Holdings LLC".to_string()
            })
        );
    }

    #[test]
    fn owners_link_by_sale_date_and_current_to_latest_sale() {
        let resolved = resolve_owners(
            &history(
                r#"{"owners_by_date": {
                    "2020-01-15": [{"type": "person", "first_name": "Old", "last_name": "Owner"}],
                    "2022-03-02": [{"type": "person", "first_name": "Jane", "last_name": "Doe"}],
                    "current": [
                        {"type": "person", "first_name": "jane", "last_name": "doe"},
                        {"type": "company", "name": "Doe Family Trust"}
                    ]
                }}"#,
            ),
            &[date(2022, 3, 2), date(2020, 1, 15)],
        );
        // Old Owner, Jane Doe, Doe Family Trust
        assert_eq!(resolved.owners.len(), 3);
        assert_eq!(resolved.current, vec![1, 2]);
        assert_eq!(resolved.sale_links, vec![(0, 1), (0, 2), (1, 0)]);
    }

    #[test]
    fn current_owner_without_dated_history_links_once() {
        let resolved = resolve_owners(
            &history(
                r#"{"owners_by_date": {"current": [
                    {"type": "person", "first_name": "jane", "last_name": "doe"},
                    {"type": "person", "first_name": "JANE", "last_name": "DOE"}
                ]}}"#,
            ),
            &[date(2022, 3, 2), date(2020, 1, 15)],
        );
        assert_eq!(resolved.owners.len(), 1);
        assert_eq!(resolved.current, vec![0]);
        assert_eq!(resolved.sale_links, vec![(0, 0)]);
    }

    #[test]
    fn non_date_buckets_are_kept_but_not_linked() {
        let resolved = resolve_owners(
            &history(
                r#"{"owners_by_date": {"unknown_date_1": [{"type": "company", "name": "Prior Co"}]}}"#,
            ),
            &[date(2022, 3, 2)],
        );
        assert_eq!(resolved.owners.len(), 1);
        assert!(resolved.sale_links.is_empty());
        assert!(resolved.current.is_empty());
    }
}
