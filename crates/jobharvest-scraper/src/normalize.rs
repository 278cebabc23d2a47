//! Job description normalization.
//!
//! Converts a rendered description fragment into flat text that keeps the
//! structure a reader needs: `**bold**`, `• ` list items, blank lines
//! between paragraphs and single line breaks for `<br>`.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::OnceLock;

/// Elements whose content is never text.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "svg", "button"];

fn inline_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\S\n]+").expect("valid regex"))
}

fn excess_breaks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"))
}

/// Normalize an HTML fragment.
///
/// ```
/// use jobharvest_scraper::normalize::normalize;
///
/// assert_eq!(normalize("<p>A</p><p>B</p>"), "A\n\nB");
/// assert_eq!(normalize("<ul><li>Rust</li><li><b>Go</b></li></ul>"), "• Rust\n• **Go**");
/// ```
#[must_use]
pub fn normalize(fragment: &str) -> String {
    let document = Html::parse_fragment(fragment);
    normalize_element(document.root_element())
}

/// Normalize the content of an already parsed element.
#[must_use]
pub fn normalize_element(element: ElementRef<'_>) -> String {
    let mut walker = Walker::default();
    walker.children(element);
    finish(&walker.out)
}

#[derive(Default)]
struct Walker {
    out: String,
    paragraphs: usize,
}

impl Walker {
    fn children(&mut self, element: ElementRef<'_>) {
        let in_list = matches!(element.value().name(), "ul" | "ol");
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                self.element(child_element);
                continue;
            }
            // Comments, doctypes and processing instructions carry no text
            if let Node::Text(text) = child.value() {
                let text: &str = text;
                if in_list && text.trim().is_empty() {
                    continue;
                }
                let text = inline_whitespace().replace_all(text, " ");
                push_escaped(&mut self.out, &text);
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if SKIPPED.contains(&name) {
            return;
        }
        match name {
            "br" => self.out.push('\n'),
            "b" | "strong" => {
                let inner = normalize_element(element);
                if inner.is_empty() {
                    return;
                }
                self.out.push_str("**");
                self.out.push_str(&inner);
                self.out.push_str("**");
            }
            "li" => {
                if !self.out.is_empty() && !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("• ");
                self.children(element);
                self.out.push('\n');
            }
            "p" => {
                // A paragraph opening a list item stays on the bullet's line
                if self.paragraphs > 0 && !self.out.ends_with("• ") {
                    self.out.push_str("\n\n");
                }
                self.paragraphs += 1;
                self.children(element);
            }
            _ => self.children(element),
        }
    }
}

/// Append decoded text, re-escaping `<` and `&` wherever a second parse
/// would read them as a tag or a character reference.
fn push_escaped(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match c {
            '<' if next.is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')) => {
                out.push_str("&lt;");
            }
            '&' if next.is_some_and(|n| n.is_ascii_alphanumeric() || n == '#') => {
                out.push_str("&amp;");
            }
            _ => out.push(c),
        }
    }
}

fn finish(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    excess_breaks()
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs() {
        assert_eq!(normalize("<p>A</p><p>B</p>"), "A\n\nB");
        assert_eq!(normalize("<p>A</p>\n  <p>B</p>\n<p>C</p>"), "A\n\nB\n\nC");
    }

    #[test]
    fn test_bold_and_lists() {
        let html = "<p><strong>About the role</strong></p>\
                    <ul>\n  <li>Build <b>Rust</b> services</li>\n  <li>Own on-call</li>\n</ul>";
        assert_eq!(
            normalize(html),
            "**About the role**\n• Build **Rust** services\n• Own on-call"
        );
    }

    #[test]
    fn test_paragraphs_inside_list_items() {
        let html = "<p>Intro</p><ul><li><p>One</p></li><li><p>Two</p></li></ul>";
        assert_eq!(normalize(html), "Intro\n• One\n• Two");
    }

    #[test]
    fn test_escaped_markup_stays_text() {
        let html = "<p>Experience with &lt;div&gt; layouts and <b>semantic</b> HTML</p>";
        assert_eq!(
            normalize(html),
            "Experience with &lt;div> layouts and **semantic** HTML"
        );
        assert_eq!(normalize("<p>Salary: $120k &amp; super</p>"), "Salary: $120k & super");
        assert_eq!(normalize("R&amp;D team, a &lt; b"), "R&amp;D team, a < b");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(normalize("Line one<br>Line two<br/>Line three"), "Line one\nLine two\nLine three");
    }

    #[test]
    fn test_collapses_runs_of_breaks() {
        assert_eq!(normalize("A<br><br><br><br>B"), "A\n\nB");
        assert_eq!(normalize("A<br><br>B"), "A\n\nB");
    }

    #[test]
    fn test_strips_comments_scripts_and_markup() {
        let html = "<div><!-- tracking --><script>var x = 1;</script>\
                    <style>.a{}</style><span class=\"x\">Hello</span>   <em>world</em></div>";
        assert_eq!(normalize(html), "Hello world");
    }

    #[test]
    fn test_trailing_spaces_and_trim() {
        assert_eq!(normalize("  <p>Lead   </p><p>  Tail  </p>  "), "Lead\n\nTail");
    }

    #[test]
    fn test_empty_bold_is_dropped() {
        assert_eq!(normalize("<p>A<strong> </strong>B</p>"), "AB");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<p>A</p><p>B</p>",
            "<ul><li>One</li><li>Two <strong>three</strong></li></ul><p>After</p>",
            "Text<br><br><br><br><br>More",
            "<div>Salary: $120k &amp; super</div>",
            "<p>Experience with &lt;div&gt; layouts and <b>semantic</b> HTML</p>",
            "<p>R&amp;D on &lt;script&gt;alert(1)&lt;/script&gt; &amp;amp; escapes</p>",
            "<p>Intro</p><ul><li><p>One</p></li><li><p>Two</p></li></ul>",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }
}
