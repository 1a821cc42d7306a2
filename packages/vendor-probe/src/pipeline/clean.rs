//! HTML to plain text for contact extraction.
//!
//! Text is taken only from an allow-list of content elements, and whole
//! subtrees of the deny-list (scripts, media, form inputs) are dropped.
//! `mailto:`/`tel:` anchors keep their target inline as
//! `text [Contact:(href)]`. Anchors pointing at contact pages or pagination
//! are cut from the body and returned separately so the harvester can visit
//! them.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::config::HarvestConfig;

const ALLOWED_TAGS: &[&str] = &[
    "p", "li", "div", "a", "span", "tr", "td", "article", "section", "address", "h1", "h2", "h3",
    "h4", "h5", "h6",
];

const DENIED_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "img", "input", "pre", "template",
];

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// Literal `\uXXXX` sequences left behind by JSON embedded in markup
static RE_UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u[0-9A-Fa-f]{4}").unwrap());

/// Cleaned text plus the contact/pagination links found on the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedPage {
    pub text: String,
    /// Absolute URLs in document order, deduplicated
    pub secondary_links: Vec<String>,
}

/// Clean `html` fetched from `page_url`.
pub fn clean_html(html: &str, page_url: &str, config: &HarvestConfig) -> CleanedPage {
    let document = Html::parse_document(html);
    let base = resolve_base(&document, page_url);

    let mut walker = Walker {
        config,
        base: base.as_ref(),
        parts: Vec::new(),
        links: Vec::new(),
    };
    walker.visit(document.root_element(), false);

    let joined = walker.parts.join(" ");
    let collapsed = RE_WHITESPACE.replace_all(&joined, " ");
    let text = RE_UNICODE_ESCAPE.replace_all(&collapsed, "");

    CleanedPage {
        text: RE_WHITESPACE.replace_all(text.trim(), " ").into_owned(),
        secondary_links: walker.links,
    }
}

/// `<base href>` resolved against the page URL, else the page URL.
fn resolve_base(document: &Html, page_url: &str) -> Option<Url> {
    let page = Url::parse(page_url).ok();

    let base_href = Selector::parse("base[href]").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string)
    });

    match (base_href, page) {
        (Some(href), Some(page)) => page.join(&href).ok().or(Some(page)),
        (Some(href), None) => Url::parse(&href).ok(),
        (None, page) => page,
    }
}

struct Walker<'a> {
    config: &'a HarvestConfig,
    base: Option<&'a Url>,
    parts: Vec<String>,
    links: Vec<String>,
}

impl Walker<'_> {
    fn visit(&mut self, element: ElementRef<'_>, inside_allowed: bool) {
        let name = element.value().name();
        if DENIED_TAGS.contains(&name) {
            return;
        }

        if name == "a" {
            if let Some(href) = element.value().attr("href") {
                if self.is_secondary(href) {
                    self.collect_link(href);
                    return;
                }
                let scheme = href.trim_start().to_ascii_lowercase();
                if scheme.starts_with("mailto:") || scheme.starts_with("tel:") {
                    let label = element_text(element);
                    self.parts.push(format!("{} [Contact:({})]", label.trim(), href));
                    return;
                }
            }
        }

        let allowed = inside_allowed || ALLOWED_TAGS.contains(&name);

        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.visit(child_el, allowed);
                    }
                }
                Node::Text(text) if allowed => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        self.parts.push(trimmed.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    fn is_secondary(&self, href: &str) -> bool {
        let lowered = href.to_lowercase();
        if lowered.starts_with("mailto:") || lowered.starts_with("tel:") || lowered.starts_with('#') {
            return false;
        }
        self.config
            .contact_keywords
            .iter()
            .chain(self.config.pagination_markers.iter())
            .any(|marker| lowered.contains(marker.as_str()))
    }

    fn collect_link(&mut self, href: &str) {
        let resolved = match self.base {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        };
        let Some(mut url) = resolved else { return };
        if url.scheme() != "http" && url.scheme() != "https" {
            return;
        }
        url.set_fragment(None);

        let url = url.to_string();
        if !self.links.contains(&url) {
            self.links.push(url);
        }
    }
}

/// Visible text of an element, skipping denied subtrees.
fn element_text(element: ElementRef<'_>) -> String {
    let mut out = Vec::new();
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| DENIED_TAGS.contains(&el.name()))
            });
            if !hidden && !text.trim().is_empty() {
                out.push(text.trim().to_string());
            }
        }
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> CleanedPage {
        clean_html(html, "https://chef.in/menu/", &HarvestConfig::default())
    }

    #[test]
    fn test_keeps_allowed_and_drops_denied() {
        let page = clean(
            r#"<html><head><title>Ignored</title><style>.x{}</style></head>
            <body>
              <p>Event   catering
                 in Kochi</p>
              <script>var a = 1;</script>
              <div>Call us <noscript>enable js</noscript></div>
              <b>orphan bold</b>
            </body></html>"#,
        );
        assert_eq!(page.text, "Event catering in Kochi Call us");
    }

    #[test]
    fn test_mailto_and_tel_annotated() {
        let page = clean(
            r#"<body><p>Reach <a href="mailto:chef@kochi.in">Chef Anu</a> or
            <a href="tel:+919847012345">call</a></p></body>"#,
        );
        assert!(page.text.contains("Chef Anu [Contact:(mailto:chef@kochi.in)]"));
        assert!(page.text.contains("call [Contact:(tel:+919847012345)]"));
    }

    #[test]
    fn test_contact_schemes_match_any_case() {
        let page = clean(
            r#"<body><p><a href="MAILTO:chef@kochi.in">Chef Anu</a>
            <a href="Tel:+919847012345">call</a></p></body>"#,
        );
        assert!(page.text.contains("Chef Anu [Contact:(MAILTO:chef@kochi.in)]"));
        assert!(page.text.contains("call [Contact:(Tel:+919847012345)]"));
        assert!(page.secondary_links.is_empty());
    }

    #[test]
    fn test_contact_links_collected_not_emitted() {
        let page = clean(
            r#"<body><div>
              <a href="/contact-us">Contact us</a>
              <a href="about.html#team">About</a>
              <a href="?page=2">Next</a>
              <a href="/contact-us">Contact again</a>
              <a href="/gallery">Gallery</a>
            </div></body>"#,
        );
        assert_eq!(
            page.secondary_links,
            vec![
                "https://chef.in/contact-us",
                "https://chef.in/menu/about.html",
                "https://chef.in/menu/?page=2",
            ]
        );
        assert_eq!(page.text, "Gallery");
    }

    #[test]
    fn test_base_href_used_for_resolution() {
        let page = clean(
            r#"<html><head><base href="https://cdn.chef.in/site/"></head>
            <body><a href="contact">Contact</a></body></html>"#,
        );
        assert_eq!(page.secondary_links, vec!["https://cdn.chef.in/site/contact"]);
    }

    #[test]
    fn test_unicode_escape_noise_removed() {
        let page = clean(r#"<body><p>Caf\u00e9 menu \u2013 rates</p></body>"#);
        assert_eq!(page.text, "Caf menu rates");
    }

    #[test]
    fn test_nested_allowed_text_emitted_once() {
        let page = clean("<body><div><p><span>once</span></p></div></body>");
        assert_eq!(page.text, "once");
    }
}
