//! Readable plain text from HTML documents.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose content is never shown.
const SKIPPED: &[&str] = &["script", "style", "nav", "header", "footer", "noscript", "template", "svg"];

/// Elements that do not break words apart when flattened to text.
const INLINE: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "i", "kbd", "mark", "q", "s", "samp", "small",
    "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Below this many characters the visible body text is added as well.
const FALLBACK_THRESHOLD: usize = 100;

/// Below this many characters innermost `<div>` text is collected.
const DIV_THRESHOLD: usize = 200;
/// Unclassed divs must be longer than this to count as content.
const DIV_MIN_CHARS: usize = 40;
/// Unclassed divs stop being collected once the output reaches this size.
const DIV_LIMIT: usize = 1000;

/// Class name fragments that mark a div as a content container.
const CONTENT_CLASSES: &[&str] = &["content", "article", "text", "body"];

const RULE_MAX: usize = 40;

/// Extract a readable text rendition of `html`.
///
/// The title is underlined with `=`, then blocks from the first `<main>`,
/// `<article>` or `<body>` follow in document order separated by blank lines.
/// Sparse results are topped up from innermost divs, then from the body text.
pub fn extract_readable(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = Collector::default();

    let title_selector = Selector::parse("title").expect("invalid selector");
    if let Some(title) = document.select(&title_selector).next() {
        let title = collapse(&title.text().collect::<String>());
        if !title.is_empty() {
            out.blocks.push(underlined(&title, '='));
        }
    }

    let root = content_root(&document);
    out.walk(root);
    if out.len() < DIV_THRESHOLD {
        out.leaf_divs(root);
    }

    let mut text = out.blocks.join("\n\n");
    if text.chars().count() < FALLBACK_THRESHOLD {
        let body = body_text(&document);
        if !body.is_empty() && body != collapse(&out.plain) {
            tracing::debug!(chars = text.len(), "sparse extraction; adding body text");
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(&body);
        }
    }

    text.trim().to_string()
}

#[derive(Default)]
struct Collector {
    blocks: Vec<String>,
    /// Text already emitted, without decoration.
    plain: String,
}

impl Collector {
    /// Visit the block elements below `root` in document order.
    fn walk(&mut self, root: ElementRef<'_>) {
        let mut pending: Vec<ElementRef<'_>> = root.children().filter_map(ElementRef::wrap).collect();
        pending.reverse();

        while let Some(child) = pending.pop() {
            let name = child.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            match name {
                "h1" => self.heading(child, Some('=')),
                "h2" => self.heading(child, Some('-')),
                "h3" | "h4" | "h5" | "h6" => self.heading(child, None),
                "p" => {
                    let text = collapse(&visible_text(child));
                    self.push(text.clone(), &text);
                }
                "pre" => {
                    let raw = visible_text(child);
                    let text = raw.trim_matches('\n').trim_end();
                    self.push(text.to_string(), text);
                }
                "ul" => self.list(child, false),
                "ol" => self.list(child, true),
                "table" => self.table(child),
                _ => {
                    let start = pending.len();
                    pending.extend(child.children().filter_map(ElementRef::wrap));
                    pending[start..].reverse();
                }
            }
        }
    }

    /// Collect text from innermost divs: content-classed ones first, then
    /// any longer than [`DIV_MIN_CHARS`] while the output stays short.
    fn leaf_divs(&mut self, root: ElementRef<'_>) {
        let selector = Selector::parse("div").expect("invalid selector");
        let divs: Vec<ElementRef<'_>> = root.select(&selector).collect();

        let mut containers = HashSet::new();
        for div in &divs {
            let parent_div = div
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "div");
            if let Some(parent) = parent_div {
                containers.insert(parent.id());
            }
        }
        let leaves: Vec<ElementRef<'_>> = divs.into_iter().filter(|d| !containers.contains(&d.id())).collect();

        let classed = |div: &ElementRef<'_>| {
            div.value()
                .attr("class")
                .is_some_and(|class| CONTENT_CLASSES.iter().any(|c| class.contains(c)))
        };

        let mut seen = HashSet::new();
        for div in leaves.iter().filter(|d| classed(d)) {
            self.push_div(*div, &mut seen, 0);
        }
        if self.len() < DIV_THRESHOLD {
            for div in &leaves {
                if self.len() >= DIV_LIMIT {
                    break;
                }
                self.push_div(*div, &mut seen, DIV_MIN_CHARS);
            }
        }
    }

    fn push_div(&mut self, div: ElementRef<'_>, seen: &mut HashSet<String>, min_chars: usize) {
        let text = collapse(&visible_text(div));
        if text.chars().count() <= min_chars || collapse(&self.plain).contains(&text) || !seen.insert(text.clone()) {
            return;
        }
        self.push(text.clone(), &text);
    }

    /// Characters emitted so far, separators included.
    fn len(&self) -> usize {
        let text: usize = self.blocks.iter().map(|b| b.chars().count()).sum();
        text + 2 * self.blocks.len().saturating_sub(1)
    }

    fn push(&mut self, block: String, plain: &str) {
        if block.trim().is_empty() {
            return;
        }
        self.blocks.push(block);
        self.plain.push(' ');
        self.plain.push_str(plain);
    }

    fn heading(&mut self, element: ElementRef<'_>, rule: Option<char>) {
        let text = collapse(&visible_text(element));
        let block = match rule {
            Some(ch) if !text.is_empty() => underlined(&text, ch),
            _ => text.clone(),
        };
        self.push(block, &text);
    }

    fn list(&mut self, element: ElementRef<'_>, numbered: bool) {
        let items: Vec<String> = element
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "li")
            .map(|li| collapse(&visible_text(li)))
            .filter(|text| !text.is_empty())
            .collect();

        let lines: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(i, text)| if numbered { format!("{}. {text}", i + 1) } else { format!("• {text}") })
            .collect();

        self.push(lines.join("\n"), &items.join(" "));
    }

    fn table(&mut self, element: ElementRef<'_>) {
        let row_selector = Selector::parse("tr").expect("invalid selector");
        let mut lines = Vec::new();
        let mut plain = Vec::new();

        for row in element.select(&row_selector) {
            let cells: Vec<ElementRef<'_>> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "th" | "td"))
                .collect();
            let texts: Vec<String> = cells.iter().map(|c| collapse(&visible_text(*c))).collect();
            let line = texts.join("\t");
            if line.trim().is_empty() {
                continue;
            }

            let is_header = cells.iter().any(|c| c.value().name() == "th");
            let width = line.chars().count().min(RULE_MAX);
            lines.push(line);
            if is_header {
                lines.push("-".repeat(width));
            }
            plain.extend(texts);
        }

        self.push(lines.join("\n"), &plain.join(" "));
    }
}

fn content_root(document: &Html) -> ElementRef<'_> {
    for tag in ["main", "article", "body"] {
        let selector = Selector::parse(tag).expect("invalid selector");
        if let Some(element) = document.select(&selector).next() {
            return element;
        }
    }
    document.root_element()
}

fn body_text(document: &Html) -> String {
    let selector = Selector::parse("body").expect("invalid selector");
    document
        .select(&selector)
        .next()
        .map(|body| collapse(&visible_text(body)))
        .unwrap_or_default()
}

/// Text of `element` and its descendants, minus skipped subtrees.
///
/// Block-level descendants are padded with spaces and `<br>` becomes a newline.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    // (node, closing): a closing marker pads the end of a block element
    let mut pending: Vec<_> = element.children().map(|node| (node, false)).collect();
    pending.reverse();

    while let Some((node, closing)) = pending.pop() {
        if closing {
            out.push(' ');
            continue;
        }
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if SKIPPED.contains(&el.name()) => {}
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) => {
                if !INLINE.contains(&el.name()) {
                    out.push(' ');
                    pending.push((node, true));
                }
                let start = pending.len();
                pending.extend(node.children().map(|child| (child, false)));
                pending[start..].reverse();
            }
            _ => {}
        }
    }

    out
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn underlined(text: &str, ch: char) -> String {
    let width = text.chars().count().min(RULE_MAX);
    format!("{text}\n{}", ch.to_string().repeat(width))
}
