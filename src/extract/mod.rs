//! Section extraction from parsed HTML.
//!
//! Partitions a document (static or browser-rendered) into labeled, typed
//! sections with bounded payloads. Pure functions over `scraper::Html` —
//! no I/O, no side effects. All tree walks use an explicit work-list so
//! pathological nesting cannot overflow the stack.

pub mod meta;

use crate::model::{Section, SectionContent, SectionImage, SectionLink, SectionType};
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Tags whose text content is never user-visible.
const INVISIBLE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Number of words used when deriving a label from body text.
const LABEL_WORDS: usize = 6;

/// Extract all sections from an HTML document.
///
/// Primary pass: topmost landmark elements in document order. Fallback when
/// no landmarks exist: heading groups over h1-h3. An empty document yields
/// an empty sequence, not an error.
pub fn extract_sections(html: &str, base_url: &Url, raw_html_cap: usize) -> Vec<Section> {
    let doc = Html::parse_document(html);

    let landmarks = topmost_landmarks(&doc);
    if !landmarks.is_empty() {
        return landmarks
            .into_iter()
            .map(|(el, section_type)| build_section(el, section_type, base_url, raw_html_cap))
            .collect();
    }

    heading_groups(&doc, base_url, raw_html_cap)
}

/// Find topmost landmark elements in document order.
///
/// A landmark nested inside another landmark is covered by its ancestor's
/// section and is not emitted separately — landmark presence at the top
/// level is authoritative.
fn topmost_landmarks(doc: &Html) -> Vec<(ElementRef<'_>, SectionType)> {
    let mut found = Vec::new();
    let mut stack: Vec<NodeRef<'_, Node>> = Vec::new();

    // Children pushed in reverse so pop order follows document order.
    for child in doc.root_element().children().rev() {
        stack.push(child);
    }

    while let Some(node) = stack.pop() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let tag = el.value().name();
        if let Some(section_type) = SectionType::from_landmark_tag(tag) {
            found.push((el, section_type));
            continue; // do not descend into an emitted landmark
        }
        for child in node.children().rev() {
            stack.push(child);
        }
    }

    found
}

/// Fallback pass: group each h1-h3 heading with its following siblings up to
/// the next heading of equal-or-higher level.
fn heading_groups(doc: &Html, base_url: &Url, raw_html_cap: usize) -> Vec<Section> {
    let selector = Selector::parse("h1, h2, h3").expect("static selector");
    let mut sections = Vec::new();

    for heading in doc.select(&selector) {
        let level = heading_level(heading.value().name()).unwrap_or(3);

        let mut group: Vec<NodeRef<'_, Node>> = vec![*heading];
        for sibling in heading.next_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                if heading_level(el.value().name()).is_some_and(|l| l <= level) {
                    break;
                }
            }
            group.push(sibling);
        }

        sections.push(build_group_section(&group, base_url, raw_html_cap));
    }

    sections
}

/// Heading level for h1-h6 tags, `None` for anything else.
fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Build a section from one landmark element.
fn build_section(
    el: ElementRef<'_>,
    section_type: SectionType,
    base_url: &Url,
    raw_html_cap: usize,
) -> Section {
    let content = extract_content(&[*el], base_url);
    let label = derive_label(&content);
    let (raw_html, truncated) = cap_html(&el.html(), raw_html_cap);

    Section {
        label,
        section_type,
        content,
        raw_html,
        truncated,
    }
}

/// Build a heading-group section from a heading and its trailing siblings.
fn build_group_section(
    nodes: &[NodeRef<'_, Node>],
    base_url: &Url,
    raw_html_cap: usize,
) -> Section {
    let content = extract_content(nodes, base_url);
    let label = derive_label(&content);

    let mut raw = String::new();
    for node in nodes {
        match node.value() {
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(*node) {
                    raw.push_str(&el.html());
                }
            }
            Node::Text(t) => raw.push_str(t),
            _ => {}
        }
    }
    let (raw_html, truncated) = cap_html(&raw, raw_html_cap);

    Section {
        label,
        section_type: SectionType::HeadingGroup,
        content,
        raw_html,
        truncated,
    }
}

/// Extract headings, text, links, images, and lists from a set of nodes.
fn extract_content(roots: &[NodeRef<'_, Node>], base_url: &Url) -> SectionContent {
    let mut content = SectionContent::default();
    let mut text_parts: Vec<String> = Vec::new();

    let mut stack: Vec<NodeRef<'_, Node>> = Vec::new();
    for root in roots.iter().rev() {
        stack.push(*root);
    }

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(t) => {
                let t = t.trim();
                if !t.is_empty() {
                    text_parts.push(t.to_string());
                }
                continue;
            }
            Node::Element(_) => {}
            _ => continue,
        }

        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let tag = el.value().name();

        if INVISIBLE_TAGS.contains(&tag) {
            continue;
        }

        if heading_level(tag).is_some() {
            let heading = normalize_ws(&visible_text(el));
            if !heading.is_empty() {
                content.headings.push(heading);
            }
        }

        match tag {
            "a" => {
                if let Some(href) = el.value().attr("href") {
                    content.links.push(SectionLink {
                        href: resolve_url(base_url, href),
                        text: normalize_ws(&visible_text(el)),
                    });
                }
            }
            "img" => {
                // Lazy-loaded images stash the real source in data attributes,
                // or as a CSS background in the style attribute.
                let src = el
                    .value()
                    .attr("src")
                    .or_else(|| el.value().attr("data-src"))
                    .or_else(|| el.value().attr("data-lazy-src"))
                    .map(str::to_string)
                    .or_else(|| el.value().attr("style").and_then(style_image_url));
                if let Some(src) = src.filter(|s| !s.is_empty()) {
                    content.images.push(SectionImage {
                        src: resolve_url(base_url, &src),
                        alt: el.value().attr("alt").unwrap_or_default().to_string(),
                    });
                }
            }
            "ul" | "ol" => {
                let items = list_items(el);
                if !items.is_empty() {
                    content.lists.push(items);
                }
            }
            _ => {}
        }

        for child in node.children().rev() {
            stack.push(child);
        }
    }

    content.text = normalize_ws(&text_parts.join(" "));
    content
}

/// Collect the visible text under an element, work-list style.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut stack: Vec<NodeRef<'_, Node>> = Vec::new();
    for child in el.children().rev() {
        stack.push(child);
    }

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(t) => parts.push(t),
            Node::Element(e) => {
                if INVISIBLE_TAGS.contains(&e.name()) {
                    continue;
                }
                for child in node.children().rev() {
                    stack.push(child);
                }
            }
            _ => {}
        }
    }

    parts.join(" ")
}

/// Text items of a list element's `<li>` descendants.
fn list_items(el: ElementRef<'_>) -> Vec<String> {
    let selector = Selector::parse("li").expect("static selector");
    el.select(&selector)
        .map(|li| normalize_ws(&visible_text(li)))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Derive a stable section label: first contained heading, else the first
/// few words of the text, else a generic placeholder.
fn derive_label(content: &SectionContent) -> String {
    if let Some(first) = content.headings.first() {
        return first.clone();
    }
    let words: Vec<&str> = content.text.split_whitespace().take(LABEL_WORDS).collect();
    if words.is_empty() {
        return "Section".to_string();
    }
    words.join(" ")
}

/// Pull the first `url(...)` value out of a style attribute.
fn style_image_url(style: &str) -> Option<String> {
    let start = style.find("url(")? + 4;
    let rest = &style[start..];
    let end = rest.find(')')?;
    let inner = rest[..end]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Collapse runs of whitespace into single spaces.
fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate markup to at most `cap` characters on a char boundary.
fn cap_html(html: &str, cap: usize) -> (String, bool) {
    let truncated = html.chars().count() > cap;
    if truncated {
        (html.chars().take(cap).collect(), true)
    } else {
        (html.to_string(), false)
    }
}

/// Resolve a possibly-relative href against the page URL, keeping the raw
/// value when it cannot be parsed.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn extract(html: &str) -> Vec<Section> {
        extract_sections(html, &base(), 2000)
    }

    #[test]
    fn test_single_article_landmark() {
        let html = r#"<html><body>
            <article><h1>Big News</h1><p>Something happened today.</p></article>
        </body></html>"#;
        let sections = extract(html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_type, SectionType::LandmarkArticle);
        assert_eq!(sections[0].label, "Big News");
        assert_eq!(sections[0].content.headings, vec!["Big News"]);
        assert!(sections[0].content.text.contains("Something happened"));
        assert!(!sections[0].truncated);
    }

    #[test]
    fn test_landmarks_in_document_order() {
        let html = r#"<html><body>
            <header><h1>Site</h1></header>
            <nav><a href="/a">A</a></nav>
            <main><p>Body copy</p></main>
            <footer><p>Legal</p></footer>
        </body></html>"#;
        let types: Vec<SectionType> = extract(html)
            .into_iter()
            .map(|s| s.section_type)
            .collect();
        assert_eq!(
            types,
            vec![
                SectionType::LandmarkHeader,
                SectionType::LandmarkNav,
                SectionType::LandmarkMain,
                SectionType::LandmarkFooter,
            ]
        );
    }

    #[test]
    fn test_nested_landmark_not_reemitted() {
        let html = r#"<html><body>
            <main><section><p>Inner</p></section></main>
        </body></html>"#;
        let sections = extract(html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_type, SectionType::LandmarkMain);
    }

    #[test]
    fn test_heading_group_fallback() {
        let html = r#"<html><body><div>
            <h2>First Topic</h2><p>Alpha text.</p><p>More alpha.</p>
            <h2>Second Topic</h2><p>Beta text.</p>
            <h3>Sub Topic</h3><p>Beta detail.</p>
        </div></body></html>"#;
        let sections = extract(html);
        // No landmarks, so h1-h3 each start a group.
        assert_eq!(sections.len(), 3);
        assert!(sections
            .iter()
            .all(|s| s.section_type == SectionType::HeadingGroup));
        assert_eq!(sections[0].label, "First Topic");
        assert!(sections[0].content.text.contains("Alpha text."));
        assert!(sections[0].content.text.contains("More alpha."));
        assert!(!sections[0].content.text.contains("Beta"));
        // A lower-level heading does not end the group, so the h3 content
        // stays inside the second h2's group.
        assert_eq!(sections[1].label, "Second Topic");
        assert!(sections[1].content.text.contains("Beta text."));
        assert!(sections[1].content.text.contains("Beta detail."));
        assert_eq!(sections[2].label, "Sub Topic");
    }

    #[test]
    fn test_links_and_images_resolved_absolute() {
        let html = r#"<html><body><section>
            <a href="/docs">Docs</a>
            <a href="https://other.org/x">Other</a>
            <img src="/logo.png" alt="Logo">
            <img data-src="/lazy.png" alt="">
        </section></body></html>"#;
        let sections = extract(html);
        let content = &sections[0].content;
        assert_eq!(content.links[0].href, "https://example.com/docs");
        assert_eq!(content.links[0].text, "Docs");
        assert_eq!(content.links[1].href, "https://other.org/x");
        assert_eq!(content.images[0].src, "https://example.com/logo.png");
        assert_eq!(content.images[0].alt, "Logo");
        assert_eq!(content.images[1].src, "https://example.com/lazy.png");
    }

    #[test]
    fn test_image_src_from_style_background() {
        let html = r#"<html><body><section>
            <img style="background-image: url('/bg.png')" alt="Hero">
            <img src="/real.png" style="background-image: url('/ignored.png')">
            <img style="color: red">
        </section></body></html>"#;
        let sections = extract(html);
        let images = &sections[0].content.images;
        // Style backgrounds count only when no src attribute variant exists.
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].src, "https://example.com/bg.png");
        assert_eq!(images[0].alt, "Hero");
        assert_eq!(images[1].src, "https://example.com/real.png");
    }

    #[test]
    fn test_style_image_url_quoting_variants() {
        assert_eq!(
            style_image_url("background: url(\"/a.png\")").as_deref(),
            Some("/a.png")
        );
        assert_eq!(
            style_image_url("background-image:url(/b.jpg);").as_deref(),
            Some("/b.jpg")
        );
        assert_eq!(style_image_url("background: url()"), None);
        assert_eq!(style_image_url("color: red"), None);
    }

    #[test]
    fn test_lists_extracted() {
        let html = r#"<html><body><section>
            <ul><li>One</li><li>Two</li></ul>
            <ol><li>First</li></ol>
        </section></body></html>"#;
        let sections = extract(html);
        assert_eq!(
            sections[0].content.lists,
            vec![
                vec!["One".to_string(), "Two".to_string()],
                vec!["First".to_string()]
            ]
        );
    }

    #[test]
    fn test_script_and_style_text_excluded() {
        let html = r#"<html><body><main>
            <p>Visible</p>
            <script>var hidden = 1;</script>
            <style>.x { color: red }</style>
        </main></body></html>"#;
        let sections = extract(html);
        assert_eq!(sections[0].content.text, "Visible");
    }

    #[test]
    fn test_raw_html_capped_and_flagged() {
        let filler = "x".repeat(5000);
        let html = format!("<html><body><section><p>{filler}</p></section></body></html>");
        let sections = extract_sections(&html, &base(), 2000);
        assert_eq!(sections[0].raw_html.chars().count(), 2000);
        assert!(sections[0].truncated);

        let small = "<html><body><section><p>short</p></section></body></html>";
        let sections = extract_sections(small, &base(), 2000);
        assert!(sections[0].raw_html.chars().count() <= 2000);
        assert!(!sections[0].truncated);
    }

    #[test]
    fn test_empty_document_yields_no_sections() {
        assert!(extract("").is_empty());
        assert!(extract("<html><body></body></html>").is_empty());
    }

    #[test]
    fn test_structure_only_landmark_still_emitted() {
        let html = r#"<html><body><nav></nav></body></html>"#;
        let sections = extract(html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].label, "Section");
        assert!(sections[0].content.text.is_empty());
    }

    #[test]
    fn test_label_from_leading_words_when_no_heading() {
        let html = r#"<html><body><section>
            <p>one two three four five six seven eight</p>
        </section></body></html>"#;
        let sections = extract(html);
        assert_eq!(sections[0].label, "one two three four five six");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = r#"<html><body>
            <header><h1>Top</h1></header>
            <section><h2>Mid</h2><p>words here</p><a href="/l">l</a></section>
        </body></html>"#;
        let a = extract(html);
        let b = extract(html);
        let ja = serde_json::to_string(&a).unwrap();
        let jb = serde_json::to_string(&b).unwrap();
        assert_eq!(ja, jb);
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let mut html = String::from("<html><body><main>");
        for _ in 0..3000 {
            html.push_str("<div>");
        }
        html.push_str("<p>deep</p>");
        // html5ever recovers unclosed tags; the walk must not recurse.
        let sections = extract(&html);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].content.text.contains("deep"));
    }
}
