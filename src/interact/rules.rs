//! Heuristic matcher rules for page interaction.
//!
//! Each concern (overlay dismissal, tab activation, pagination) is an
//! ordered list of rules evaluated in priority order, so site-specific
//! rules can be added without touching the driver's control flow. Rules
//! compile to JavaScript snippets executed in the page; clicking through
//! injected JS keeps the browser surface down to `execute_js`.

/// How a rule locates its target elements.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// A plain CSS selector.
    Css(&'static str),
    /// Clickable elements whose visible text matches (case-insensitive).
    ButtonText(&'static str),
    /// `<a rel="next">` pagination link.
    LinkRelNext,
    /// Anchor whose visible text starts with the given word.
    LinkText(&'static str),
}

/// One prioritized interaction rule.
#[derive(Debug, Clone, Copy)]
pub struct MatcherRule {
    pub matcher: Matcher,
}

impl MatcherRule {
    const fn css(selector: &'static str) -> Self {
        Self {
            matcher: Matcher::Css(selector),
        }
    }

    const fn button_text(text: &'static str) -> Self {
        Self {
            matcher: Matcher::ButtonText(text),
        }
    }

    /// Human-readable selector string recorded in the interaction trace.
    pub fn label(&self) -> String {
        match self.matcher {
            Matcher::Css(sel) => sel.to_string(),
            Matcher::ButtonText(text) => format!("button:has-text('{text}')"),
            Matcher::LinkRelNext => "a[rel='next']".to_string(),
            Matcher::LinkText(text) => format!("a:has-text('{text}')"),
        }
    }
}

/// Overlay and cookie-banner close controls, most specific first.
pub const OVERLAY_RULES: &[MatcherRule] = &[
    MatcherRule::css("button[aria-label*='close']"),
    MatcherRule::css(".cookie-banner button"),
    MatcherRule::css(".cookie-consent button"),
    MatcherRule::css(".modal button.close"),
    MatcherRule::css(".popup-close"),
];

/// Tab-like and "load more" controls that surface hidden content.
pub const TAB_RULES: &[MatcherRule] = &[
    MatcherRule::css("[role='tab']"),
    MatcherRule::button_text("load more"),
    MatcherRule::button_text("show more"),
];

/// Next-page links, rel=next before text heuristics.
pub const NEXT_PAGE_RULES: &[MatcherRule] = &[
    MatcherRule {
        matcher: Matcher::LinkRelNext,
    },
    MatcherRule {
        matcher: Matcher::LinkText("next"),
    },
];

/// JS snippet that clicks up to `limit` elements matched by the rule and
/// returns the number actually clicked. Individual click failures are
/// swallowed inside the page.
pub fn click_script(rule: &MatcherRule, limit: u32) -> String {
    match rule.matcher {
        Matcher::Css(sel) => format!(
            r#"(() => {{
                let n = 0;
                for (const el of document.querySelectorAll("{}")) {{
                    if (n >= {limit}) break;
                    try {{ el.click(); n += 1; }} catch (e) {{}}
                }}
                return n;
            }})()"#,
            js_string(sel)
        ),
        Matcher::ButtonText(text) => format!(
            r#"(() => {{
                let n = 0;
                const re = new RegExp("{}", "i");
                for (const el of document.querySelectorAll("button, [role='button'], a")) {{
                    if (n >= {limit}) break;
                    if (!re.test(el.textContent || "")) continue;
                    try {{ el.click(); n += 1; }} catch (e) {{}}
                }}
                return n;
            }})()"#,
            js_string(text)
        ),
        // Pagination rules are not clickable — navigation handles them.
        Matcher::LinkRelNext | Matcher::LinkText(_) => "0".to_string(),
    }
}

/// JS snippet that returns the rule's target href, or null.
pub fn find_href_script(rule: &MatcherRule) -> String {
    match rule.matcher {
        Matcher::LinkRelNext => r#"(() => {
            const a = document.querySelector("a[rel='next']");
            return a ? a.getAttribute('href') : null;
        })()"#
            .to_string(),
        Matcher::LinkText(text) => format!(
            r#"(() => {{
                const re = new RegExp("^{}\\b", "i");
                for (const a of document.querySelectorAll("a")) {{
                    if (re.test((a.textContent || "").trim())) {{
                        const href = a.getAttribute('href');
                        if (href) return href;
                    }}
                }}
                return null;
            }})()"#,
            js_string(text)
        ),
        _ => "null".to_string(),
    }
}

/// Escape a string for safe injection into a double-quoted JS string literal.
///
/// Escapes quote/backslash/control characters and angle brackets so a value
/// can never break out of the string context.
fn js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\'' => result.push_str("\\'"),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
