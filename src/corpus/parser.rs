//! MDX chapter parsing: frontmatter extraction and markup stripping.
//!
//! Chapter sources are Docusaurus-style MDX. Indexing only needs the
//! visible prose, so parsing reduces the source to plain text while
//! keeping paragraph boundaries for the chunker.

use std::collections::BTreeMap;

use pulldown_cmark::{Event, Options, Parser, TagEnd};
use regex::Regex;

/// Cleaned chapters shorter than this are skipped rather than indexed.
pub const MIN_INDEXABLE_CHARS: usize = 50;

/// A chapter source file queued for parsing, identified by its slug.
#[derive(Debug, Clone)]
pub struct ChapterSource {
    /// Stable identity derived from the source path.
    pub slug: String,
    /// Module grouping, e.g. `module-1-foundations`.
    pub module: String,
    /// Raw MDX content.
    pub markdown: String,
}

impl ChapterSource {
    /// Build a source from a path relative to the docs root.
    ///
    /// The slug is the path with separators normalized, any leading
    /// `book/docs/` prefix removed, and the `.mdx`/`.md` extension
    /// stripped. The module is the leading `module-<n>-<name>` path
    /// segment when present, `"unknown"` otherwise.
    pub fn from_relative_path(relative_path: &str, markdown: String) -> Self {
        let mut slug = relative_path.replace('\\', "/");
        if let Some(stripped) = slug.strip_prefix("book/docs/") {
            slug = stripped.to_string();
        }
        for extension in [".mdx", ".md"] {
            if let Some(stripped) = slug.strip_suffix(extension) {
                slug = stripped.to_string();
                break;
            }
        }
        let module = module_from_slug(&slug);
        Self {
            slug,
            module,
            markdown,
        }
    }
}

/// A parsed chapter: metadata plus cleaned plain text.
#[derive(Debug, Clone)]
pub struct ParsedChapter {
    pub slug: String,
    pub module: String,
    /// Key-value header block from the top of the source, when present.
    pub frontmatter: BTreeMap<String, String>,
    /// Plain text with blank-line paragraph boundaries preserved.
    pub text: String,
}

impl ParsedChapter {
    /// Chapter title from frontmatter, when one was declared.
    pub fn title(&self) -> Option<&str> {
        self.frontmatter.get("title").map(String::as_str)
    }

    /// True when the cleaned text is too short to be worth indexing.
    /// This is a skip signal for the indexer, not an error.
    pub fn is_too_short(&self) -> bool {
        self.text.len() < MIN_INDEXABLE_CHARS
    }
}

/// Parse a chapter source into metadata and cleaned text.
pub fn parse_chapter(source: &ChapterSource) -> ParsedChapter {
    let (frontmatter, body) = split_frontmatter(&source.markdown);
    let stripped = strip_mdx_constructs(body);
    let text = markdown_to_text(&stripped);
    ParsedChapter {
        slug: source.slug.clone(),
        module: source.module.clone(),
        frontmatter,
        text,
    }
}

fn module_from_slug(slug: &str) -> String {
    let module_re = Regex::new(r"^(module-\d+-[^/]+)").unwrap();
    module_re
        .captures(slug)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Split a leading `---`-delimited header block off the body.
///
/// Header lines are parsed as `key: value` on the first colon only, so
/// values containing colons survive intact. Sources without a header
/// pass through unchanged.
fn split_frontmatter(markdown: &str) -> (BTreeMap<String, String>, &str) {
    let mut frontmatter = BTreeMap::new();

    if !markdown.starts_with("---") {
        return (frontmatter, markdown);
    }
    let after_open = &markdown[3..];
    let Some(end) = after_open.find("\n---") else {
        return (frontmatter, markdown);
    };

    for line in after_open[..end].lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                frontmatter.insert(key.to_string(), unquote(value.trim()));
            }
        }
    }

    let body = after_open[end + 4..].trim_start();
    (frontmatter, body)
}

fn unquote(value: &str) -> String {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// Remove MDX-only constructs the markdown parser would read as prose:
/// JSX component tags, import/export declarations and HTML comments.
fn strip_mdx_constructs(content: &str) -> String {
    let jsx_tag = Regex::new(r"</?[A-Z][^>]*>").unwrap();
    let import_line = Regex::new(r#"(?m)^import\s+.*?from\s+['"].*?['"];?\s*$"#).unwrap();
    let export_line = Regex::new(r"(?m)^export\s+.*$").unwrap();
    let html_comment = Regex::new(r"(?s)<!--.*?-->").unwrap();

    let content = import_line.replace_all(content, "");
    let content = export_line.replace_all(&content, "");
    let content = html_comment.replace_all(&content, "");
    jsx_tag.replace_all(&content, "").into_owned()
}

/// Reduce markdown to its visible text, one paragraph per block.
///
/// Headings, emphasis, links and images collapse to their text; code
/// fences keep their body; raw HTML is dropped. Entity references are
/// decoded by the parser.
fn markdown_to_text(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(markdown, options);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for event in parser {
        match event {
            Event::Text(text) => current.push_str(&text),
            Event::Code(code) => current.push_str(&code),
            Event::SoftBreak | Event::HardBreak => current.push('\n'),
            Event::End(TagEnd::TableCell) => current.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::CodeBlock
                | TagEnd::Item
                | TagEnd::TableHead
                | TagEnd::TableRow,
            ) => flush_paragraph(&mut paragraphs, &mut current),
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
    }
    flush_paragraph(&mut paragraphs, &mut current);

    paragraphs.join("\n\n")
}

fn flush_paragraph(paragraphs: &mut Vec<String>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        paragraphs.push(text.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(markdown: &str) -> ChapterSource {
        ChapterSource::from_relative_path("module-2-control/pid.mdx", markdown.to_string())
    }

    #[test]
    fn test_slug_and_module_derivation() {
        let s = ChapterSource::from_relative_path(
            "book/docs/module-3-perception/cameras.mdx",
            String::new(),
        );
        assert_eq!(s.slug, "module-3-perception/cameras");
        assert_eq!(s.module, "module-3-perception");

        let s = ChapterSource::from_relative_path("intro.md", String::new());
        assert_eq!(s.slug, "intro");
        assert_eq!(s.module, "unknown");

        let s = ChapterSource::from_relative_path(
            "module-1-foundations\\history.mdx",
            String::new(),
        );
        assert_eq!(s.slug, "module-1-foundations/history");
    }

    #[test]
    fn test_frontmatter_splits_on_first_colon_only() {
        let parsed = parse_chapter(&source(
            "---\ntitle: PID Control: Theory and Practice\nsidebar_position: 2\n---\n\nBody text goes here and is long enough to keep.\n",
        ));
        assert_eq!(
            parsed.title(),
            Some("PID Control: Theory and Practice")
        );
        assert_eq!(
            parsed.frontmatter.get("sidebar_position").map(String::as_str),
            Some("2")
        );
        assert!(parsed.text.starts_with("Body text"));
    }

    #[test]
    fn test_frontmatter_unquotes_values() {
        let parsed = parse_chapter(&source(
            "---\ntitle: \"Sensors\"\n---\n\nParagraph body long enough to pass the minimum size check.\n",
        ));
        assert_eq!(parsed.title(), Some("Sensors"));
    }

    #[test]
    fn test_missing_frontmatter_is_fine() {
        let parsed = parse_chapter(&source("Just a paragraph of ordinary text, nothing else here.\n"));
        assert!(parsed.frontmatter.is_empty());
        assert!(parsed.text.contains("ordinary text"));
    }

    #[test]
    fn test_strips_jsx_imports_and_comments() {
        let parsed = parse_chapter(&source(
            "import Tabs from '@theme/Tabs';\n\n<Callout type=\"info\">\nRobots sense the world through sensors.\n</Callout>\n\n<!-- editor note, drop me -->\n\nexport const answer = 42;\n\nSecond paragraph stays around for the final output.\n",
        ));
        assert!(parsed.text.contains("Robots sense the world"));
        assert!(parsed.text.contains("Second paragraph stays"));
        assert!(!parsed.text.contains("import"));
        assert!(!parsed.text.contains("export"));
        assert!(!parsed.text.contains("Callout"));
        assert!(!parsed.text.contains("editor note"));
    }

    #[test]
    fn test_markdown_reduced_to_visible_text() {
        let parsed = parse_chapter(&source(
            "# Heading One\n\nSome **bold** and *italic* text with a [link](https://example.com) and `inline code`.\n\n```python\nprint(\"kept\")\n```\n",
        ));
        assert!(parsed.text.contains("Heading One"));
        assert!(!parsed.text.contains('#'));
        assert!(parsed.text.contains("bold"));
        assert!(!parsed.text.contains("**"));
        assert!(parsed.text.contains("link"));
        assert!(!parsed.text.contains("https://example.com"));
        assert!(parsed.text.contains("inline code"));
        assert!(parsed.text.contains("print(\"kept\")"));
        assert!(!parsed.text.contains("```"));
    }

    #[test]
    fn test_paragraph_boundaries_preserved() {
        let parsed = parse_chapter(&source(
            "First paragraph with enough words to matter here.\n\nSecond paragraph, also carrying some real content.\n",
        ));
        let paragraphs: Vec<&str> = parsed.text.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn test_too_short_signal() {
        let parsed = parse_chapter(&source("---\ntitle: Stub\n---\n\nTBD\n"));
        assert!(parsed.is_too_short());

        let parsed = parse_chapter(&source(
            "A chapter body that is comfortably longer than the fifty character minimum threshold.\n",
        ));
        assert!(!parsed.is_too_short());
    }
}
