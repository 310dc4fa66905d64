//! Query builder inputs
//!
//! A [`PageQuery`] is built per request from untrusted caller input and
//! compiled against an entity's registry by [`plan::compile`]. Nothing here
//! holds server-side state.

pub mod params;
pub mod plan;
pub mod window;

use serde_json::Value as JsonValue;

pub use params::PageParams;
pub use plan::{Order, Predicate, Select};
pub use window::{Page, Window, DEFAULT_PAGE_SIZE};

/// How filter predicates are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combine {
    #[default]
    And,
    Or,
}

impl Combine {
    pub fn from_use_or(use_or: bool) -> Self {
        if use_or {
            Self::Or
        } else {
            Self::And
        }
    }
}

/// Equality constraints on named attributes, in caller order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: Vec<(String, JsonValue)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a constraint, replacing an earlier one on the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Attribute name plus direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub attribute: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Descending,
        }
    }
}

/// Everything `fetch_page` needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    pub filters: FilterSet,
    pub search: Option<String>,
    pub sort: Option<SortKey>,
    pub window: Window,
    pub combine: Combine,
    pub include_relations: bool,
}

impl PageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filters.insert(name, value);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort = Some(key);
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    pub fn combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }

    pub fn with_relations(mut self) -> Self {
        self.include_relations = true;
        self
    }

    /// Search term, with an empty string treated as absent.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_insert_replaces() {
        let filters = FilterSet::new().with("genre", "pop").with("genre", "rock");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.iter().next(), Some(("genre", &json!("rock"))));
    }

    #[test]
    fn empty_search_is_absent() {
        assert_eq!(PageQuery::new().search("").search_term(), None);
        assert_eq!(PageQuery::new().search("lo").search_term(), Some("lo"));
    }

    #[test]
    fn combine_from_flag() {
        assert_eq!(Combine::from_use_or(true), Combine::Or);
        assert_eq!(Combine::from_use_or(false), Combine::And);
    }
}
