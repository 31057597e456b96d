use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::debug;

use crate::error::PipelineError;

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule<T> {
    pub all: Vec<String>,
    #[serde(default)]
    pub none: Vec<String>,
    pub value: T,
}

impl<T> KeywordRule<T> {
    pub fn new(all: &[&str], value: T) -> Self {
        Self {
            all: all.iter().map(|s| s.to_string()).collect(),
            none: Vec::new(),
            value,
        }
    }

    pub fn excluding(mut self, none: &[&str]) -> Self {
        self.none = none.iter().map(|s| s.to_string()).collect();
        self
    }

    fn matches(&self, upper_label: &str) -> bool {
        self.all
            .iter()
            .all(|needle| upper_label.contains(needle.to_uppercase().as_str()))
            && !self
                .none
                .iter()
                .any(|needle| upper_label.contains(needle.to_uppercase().as_str()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct CodeTableFile<T> {
    pub entries: BTreeMap<String, T>,
    #[serde(default)]
    pub keywords: Vec<KeywordRule<T>>,
}

#[derive(Debug, Clone)]
pub struct CodeTable<T> {
    rows: Vec<(String, T)>,
    exact: HashMap<String, usize>,
    numeric: HashMap<String, usize>,
    normalized: HashMap<String, usize>,
    keywords: Vec<KeywordRule<T>>,
}

impl<T> Default for CodeTable<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            exact: HashMap::new(),
            numeric: HashMap::new(),
            normalized: HashMap::new(),
            keywords: Vec::new(),
        }
    }
}

impl<T> CodeTable<T> {
    pub fn new(entries: impl IntoIterator<Item = (String, T)>) -> Self {
        let mut table = Self::default();
        for (key, value) in entries {
            table.insert(key, value);
        }
        table
    }

    pub fn from_file(file: CodeTableFile<T>) -> Self {
        let mut table = Self::new(file.entries);
        table.keywords = file.keywords;
        table
    }

    pub fn with_keywords(mut self, rules: Vec<KeywordRule<T>>) -> Self {
        self.keywords.extend(rules);
        self
    }

    fn insert(&mut self, key: String, value: T) {
        let idx = self.rows.len();
        // first row wins on index collisions; rows arrive in key order
        self.exact.entry(exact_key(&key)).or_insert(idx);
        if let Some(code) = numeric_subcode(&key) {
            self.numeric.entry(code).or_insert(idx);
        }
        let normalized = normalized_key(&key);
        if !normalized.is_empty() {
            self.normalized.entry(normalized).or_insert(idx);
        }
        self.rows.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(key, _)| key.as_str())
    }

    fn row(&self, idx: Option<&usize>) -> Option<&T> {
        idx.and_then(|i| self.rows.get(*i)).map(|(_, value)| value)
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone)]
pub enum Strategy<T> {
    /// Trimmed, upper-cased label equals a table key.
    Exact,
    /// Leading digits of the label (`"0100: SINGLE FAMILY"` -> `100`) equal
    /// the leading digits of a table key, ignoring zero padding.
    NumericSubcode,
    /// Label equals a key once punctuation and whitespace are removed.
    Normalized,
    /// The table's own keyword rules, in order.
    TableKeywords,
    /// Fixed keyword rules supplied by the caller, in order.
    Keywords(Vec<KeywordRule<T>>),
    /// Always resolves. Ends a fail-soft chain.
    Fallback(T),
}

impl<T> Strategy<T> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::NumericSubcode => "numeric_subcode",
            Self::Normalized => "normalized",
            Self::TableKeywords => "table_keywords",
            Self::Keywords(_) => "keywords",
            Self::Fallback(_) => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub strategy: &'static str,
}

#[derive(Debug, Clone)]
pub struct CodeMapper<T> {
    table: CodeTable<T>,
    strategies: Vec<Strategy<T>>,
}

impl<T: Clone> CodeMapper<T> {
    pub fn new(table: CodeTable<T>, strategies: Vec<Strategy<T>>) -> Self {
        Self { table, strategies }
    }

    pub fn strict(table: CodeTable<T>) -> Self {
        Self::new(
            table,
            vec![
                Strategy::Exact,
                Strategy::NumericSubcode,
                Strategy::Normalized,
                Strategy::TableKeywords,
            ],
        )
    }

    pub fn keywords(rules: Vec<KeywordRule<T>>) -> Self {
        Self::new(CodeTable::default(), vec![Strategy::Keywords(rules)])
    }

    pub fn table(&self) -> &CodeTable<T> {
        &self.table
    }

    pub fn resolve(&self, label: &str) -> Option<Resolved<T>> {
        let exact = exact_key(label);
        if exact.is_empty() {
            return None;
        }
        self.strategies.iter().find_map(|strategy| {
            let value = match strategy {
                Strategy::Exact => self.table.row(self.table.exact.get(&exact)),
                Strategy::NumericSubcode => numeric_subcode(label)
                    .and_then(|code| self.table.row(self.table.numeric.get(&code))),
                Strategy::Normalized => {
                    self.table.row(self.table.normalized.get(&normalized_key(label)))
                }
                Strategy::TableKeywords => first_keyword(&self.table.keywords, &exact),
                Strategy::Keywords(rules) => first_keyword(rules, &exact),
                Strategy::Fallback(value) => Some(value),
            }?;
            debug!(label, strategy = strategy.name(), "Code resolved");
            Some(Resolved {
                value: value.clone(),
                strategy: strategy.name(),
            })
        })
    }

    pub fn map(&self, label: &str, path: &str) -> Result<T, PipelineError> {
        self.resolve(label)
            .map(|resolved| resolved.value)
            .ok_or_else(|| PipelineError::unknown_enum(label.trim(), path))
    }
}

fn first_keyword<'a, T>(rules: &'a [KeywordRule<T>], upper_label: &str) -> Option<&'a T> {
    rules
        .iter()
        .find(|rule| rule.matches(upper_label))
        .map(|rule| &rule.value)
}

pub fn exact_key(label: &str) -> String {
    crate::normalize::normalize_ws(label).to_uppercase()
}

pub fn normalized_key(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Leading digit run with zero padding removed (`"0100"` -> `"100"`).
pub fn numeric_subcode(label: &str) -> Option<String> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let stripped = digits.trim_start_matches('0');
    Some(if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    })
}
