//! Link types - discovered pages and business listings with provenance.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use url::Url;

/// A discovered candidate page or business listing.
///
/// Links are created by search providers, merged and ranked by the
/// federator, and then read (never mutated) by the harvester. A harvested
/// page may produce child links for its contact pages; those carry the
/// parent's URL in `base_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Dense position (0..n) assigned at ranking time
    pub id: usize,

    /// 1-based rank assigned after dedup
    pub rank: usize,

    /// Page or business title (first-seen wins on merge)
    pub title: String,

    /// URL as returned by the provider
    pub url: String,

    /// Providers that independently found this URL, in discovery order
    pub source_providers: IndexSet<String>,

    /// Query that produced this link
    pub originating_query: String,

    /// Parent page URL for secondary contact pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Listing details, only for business-search sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<BusinessListing>,
}

/// Geo, review and contact fields attached to business-listing links.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessListing {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f32>,
    pub rating_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl BusinessListing {
    /// True when the listing itself carries a phone number or an address.
    pub fn has_contacts(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.phone) || filled(&self.address)
    }
}

impl Link {
    /// Create an unranked link found by `provider` for `query`.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        provider: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        let mut source_providers = IndexSet::new();
        source_providers.insert(provider.into());
        Self {
            id: 0,
            rank: 0,
            title: title.into(),
            url: url.into(),
            source_providers,
            originating_query: query.into(),
            base_url: None,
            listing: None,
        }
    }

    /// Create a secondary contact-page link discovered under `parent`.
    ///
    /// The child inherits the parent's position so records found on it sort
    /// with the parent.
    pub fn secondary(url: impl Into<String>, parent: &Link) -> Self {
        Self {
            id: parent.id,
            rank: parent.rank,
            title: parent.title.clone(),
            url: url.into(),
            source_providers: parent.source_providers.clone(),
            originating_query: parent.originating_query.clone(),
            base_url: Some(parent.url.clone()),
            listing: None,
        }
    }

    /// Attach business listing details.
    pub fn with_listing(mut self, listing: BusinessListing) -> Self {
        self.listing = Some(listing);
        self
    }

    /// Key used for URL uniqueness within a federated result set.
    pub fn dedup_key(&self) -> String {
        normalize_url(&self.url)
    }

    /// Union another link's providers into this one.
    ///
    /// Title, query and listing of `self` are kept (first seen wins).
    pub fn absorb(&mut self, other: &Link) {
        for provider in &other.source_providers {
            self.source_providers.insert(provider.clone());
        }
        if self.listing.is_none() {
            self.listing = other.listing.clone();
        }
    }
}

/// Normalize a URL for identity comparison.
///
/// Scheme and host are lower-cased (the `url` crate does this on parse),
/// the fragment is dropped, default ports disappear and a trailing slash on a
/// non-root path is removed. Unparseable input falls back to the trimmed
/// string so it still dedups against itself.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

/// Assign dense ids (0..n) and 1-based ranks in list order.
pub fn assign_ranks(links: &mut [Link]) {
    for (position, link) in links.iter_mut().enumerate() {
        link.id = position;
        link.rank = position + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_variants_collapse() {
        let a = normalize_url("https://Example.com/chefs/");
        let b = normalize_url("https://example.com/chefs#contact");
        let c = normalize_url("https://example.com:443/chefs");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_normalize_url_keeps_root_and_query() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com/");
        assert_ne!(
            normalize_url("https://example.com/list?page=2"),
            normalize_url("https://example.com/list?page=3")
        );
    }

    #[test]
    fn test_normalize_url_unparseable_falls_back() {
        assert_eq!(normalize_url("  not a url "), "not a url");
    }

    #[test]
    fn test_absorb_unions_providers_and_keeps_title() {
        let mut first = Link::new("https://a.com", "First title", "google", "q1");
        let second = Link::new("https://a.com/", "Second title", "bing", "q1");

        first.absorb(&second);

        assert_eq!(first.title, "First title");
        let providers: Vec<_> = first.source_providers.iter().cloned().collect();
        assert_eq!(providers, vec!["google", "bing"]);
    }

    #[test]
    fn test_secondary_points_back_to_parent() {
        let parent = Link::new("https://chef.in", "Chef Kochi", "google", "chefs kochi");
        let child = Link::secondary("https://chef.in/contact", &parent);

        assert_eq!(child.base_url.as_deref(), Some("https://chef.in"));
        assert_eq!(child.originating_query, "chefs kochi");
    }

    #[test]
    fn test_assign_ranks_is_dense() {
        let mut links = vec![
            Link::new("https://a.com", "A", "google", "q"),
            Link::new("https://b.com", "B", "google", "q"),
        ];
        assign_ranks(&mut links);
        assert_eq!((links[0].id, links[0].rank), (0, 1));
        assert_eq!((links[1].id, links[1].rank), (1, 2));
    }
}
