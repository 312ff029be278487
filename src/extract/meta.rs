//! Page metadata extraction from the document `<head>`.

use crate::model::PageMeta;
use scraper::{Html, Selector};
use url::Url;

/// Read title, description, language, and canonical URL from fixed head
/// elements. Missing elements default to empty strings.
///
/// Title prefers `og:title` over `<title>`; description prefers
/// `meta[name=description]` over `og:description`, matching how most sites
/// keep the richer copy in the standard tag.
pub fn extract_meta(html: &str, base_url: &Url) -> PageMeta {
    let doc = Html::parse_document(html);

    let title = select_attr(&doc, "meta[property=\"og:title\"]", "content")
        .or_else(|| select_text(&doc, "title"))
        .unwrap_or_default();

    let description = select_attr(&doc, "meta[name=\"description\"]", "content")
        .or_else(|| select_attr(&doc, "meta[property=\"og:description\"]", "content"))
        .unwrap_or_default();

    let language = select_attr(&doc, "html", "lang").unwrap_or_default();

    let canonical_url = select_attr(&doc, "link[rel=\"canonical\"]", "href")
        .map(|href| super::resolve_url(base_url, &href))
        .unwrap_or_default();

    PageMeta {
        title,
        description,
        language,
        canonical_url,
        ..PageMeta::default()
    }
}

fn select_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn select_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|v| !v.is_empty())
}
