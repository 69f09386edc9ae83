//! Incremental reader for simple-index pages.

use quick_xml::escape::unescape;
use regex::Regex;
use std::sync::LazyLock;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
        .expect("Valid anchor regex")
});

/// Upper bound on an unterminated anchor carried between lines.
const MAX_PENDING: usize = 64 * 1024;

/// One `<a href="...">name</a>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct SimpleLink {
    /// Anchor text, normally the project name
    name: String,
    /// Link target
    href: String,
}

/// Extracts anchors from a simple index fed one line at a time.
///
/// Only an anchor split across lines is buffered; everything else is
/// discarded as soon as it is scanned.
///
/// # Examples
///
/// ```
/// use cheeseshop_proxy::simple::SimpleIndexParser;
///
/// let mut parser = SimpleIndexParser::new();
/// assert!(parser.feed("<html><body>").is_empty());
/// let links = parser.feed(r#"<a href="/simple/zope-interface/">zope.interface</a>"#);
/// assert_eq!(links[0].name(), "zope.interface");
/// assert_eq!(links[0].href(), "/simple/zope-interface/");
/// ```
#[derive(Debug, Default)]
pub struct SimpleIndexParser {
    pending: String,
}

impl SimpleIndexParser {
    /// Parser with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one more line and return the anchors it completes.
    pub fn feed(&mut self, line: &str) -> Vec<SimpleLink> {
        self.pending.push_str(line);
        self.pending.push('\n');

        let mut links = Vec::new();
        let mut consumed = 0;
        for captures in ANCHOR.captures_iter(&self.pending) {
            let (Some(whole), Some(href), Some(text)) =
                (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };
            consumed = whole.end();
            let name = decode(text.as_str().trim());
            if !name.is_empty() {
                links.push(SimpleLink {
                    name,
                    href: decode(href.as_str()),
                });
            }
        }

        let rest = &self.pending[consumed..];
        self.pending = match rest.to_ascii_lowercase().rfind("<a") {
            Some(start) if rest.len() - start <= MAX_PENDING => rest[start..].to_string(),
            _ => String::new(),
        };
        links
    }
}

fn decode(raw: &str) -> String {
    unescape(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
