//! Request DTOs for public library endpoints.

use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Category, VisibilityScope};
use crate::store::PublicSkuFilter;

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default = "default_scope")]
    pub visibility_scope: VisibilityScope,
    #[serde(default)]
    pub partner_whitelist: Option<Vec<Uuid>>,
}

fn default_scope() -> VisibilityScope {
    VisibilityScope::All
}

/// Query string of the library listing. `tags` is comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct PublicBrowseQuery {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PublicBrowseQuery {
    pub fn filter(&self) -> PublicSkuFilter {
        PublicSkuFilter {
            city: self.city.clone(),
            category: self.category,
            tags: split_tags(self.tags.as_deref()),
            keyword: self.keyword.clone(),
        }
    }
}

/// `"a, b,,c"` -> `["a", "b", "c"]`
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct PullQuery {
    #[serde(default = "default_apply_factor")]
    pub apply_factor: bool,
}

fn default_apply_factor() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags(Some("a, b,,c")), vec!["a", "b", "c"]);
        assert!(split_tags(Some(" , ")).is_empty());
        assert!(split_tags(None).is_empty());
    }
}
