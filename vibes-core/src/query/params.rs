//! Pagination request shape as it arrives from a query string

use serde::Deserialize;

use super::{Combine, FilterSet, PageQuery, SortKey, Window, DEFAULT_PAGE_SIZE};
use crate::validation::ValidationError;

/// `{page, size, sort_by, descending, use_or, search}`
///
/// Filters combine with OR unless the caller sends `use_or=false`.
///
/// `page` and `size` are signed so that out-of-range input reaches
/// [`Window::new`] and becomes a validation error instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub page: i64,
    pub size: i64,
    pub sort_by: Option<String>,
    pub descending: bool,
    pub use_or: bool,
    pub search: Option<String>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            size: i64::from(DEFAULT_PAGE_SIZE),
            sort_by: None,
            descending: false,
            use_or: true,
            search: None,
        }
    }
}

impl PageParams {
    /// Build a page query with the given filters.
    pub fn into_query(self, filters: FilterSet) -> Result<PageQuery, ValidationError> {
        let window = Window::new(self.page, self.size)?;
        let sort = self.sort_by.filter(|s| !s.is_empty()).map(|attribute| {
            if self.descending {
                SortKey::desc(attribute)
            } else {
                SortKey::asc(attribute)
            }
        });

        Ok(PageQuery {
            filters,
            search: self.search,
            sort,
            window,
            combine: Combine::from_use_or(self.use_or),
            include_relations: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use axum::extract::Query;
    use axum::http::Uri;

    fn parse(uri: &str) -> PageParams {
        let uri: Uri = uri.parse().unwrap();
        let Query(params) = Query::<PageParams>::try_from_uri(&uri).unwrap();
        params
    }

    #[test]
    fn defaults_from_empty_query() {
        let params = parse("/tracks");
        assert_eq!(params, PageParams::default());

        let query = params.into_query(FilterSet::new()).unwrap();
        assert_eq!(query.window, Window::new(1, i64::from(DEFAULT_PAGE_SIZE)).unwrap());
        assert_eq!(query.combine, Combine::Or);
        assert_eq!(query.sort, None);
    }

    #[test]
    fn use_or_false_requires_every_filter() {
        let query = parse("/tracks?use_or=false").into_query(FilterSet::new()).unwrap();
        assert_eq!(query.combine, Combine::And);
    }

    #[test]
    fn parses_query_string() {
        let params = parse("/tracks?page=2&size=5&sort_by=year&descending=true&use_or=true&search=love");
        let query = params.into_query(FilterSet::new()).unwrap();

        assert_eq!(query.window, Window::new(2, 5).unwrap());
        assert_eq!(query.sort.as_ref().map(|s| s.direction), Some(Direction::Descending));
        assert_eq!(query.combine, Combine::Or);
        assert_eq!(query.search_term(), Some("love"));
    }

    #[test]
    fn negative_page_is_validation_error() {
        let err = parse("/tracks?page=-1").into_query(FilterSet::new()).unwrap_err();
        assert_eq!(err.field(), "page");
    }

    #[test]
    fn zero_size_is_validation_error() {
        let err = parse("/tracks?size=0").into_query(FilterSet::new()).unwrap_err();
        assert_eq!(err.field(), "size");
    }
}
