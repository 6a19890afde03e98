//! Content chunking for embedding and retrieval.
//!
//! Chapters are split on paragraph boundaries and packed greedily into
//! word-bounded chunks. A single paragraph longer than the limit is
//! hard-split with an overlapping sliding window; overlap applies only
//! inside such oversized paragraphs, never between adjacent
//! paragraph-packed chunks.

use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;

use super::parser::ParsedChapter;

/// One indexable span of chapter text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chapter_slug: String,
    pub module: String,
    /// Position within the chapter.
    pub index: u32,
    pub text: String,
    pub word_count: usize,
}

/// Split `text` into chunks of at most `max_words` words.
///
/// Paragraphs (blank-line delimited) accumulate into the running chunk
/// while the total stays at or below `max_words`; a paragraph that would
/// overflow flushes the chunk first. A paragraph longer than `max_words`
/// on its own is hard-split on word boundaries, each window advancing
/// `max_words - overlap_words` words past the last.
///
/// Empty input yields no chunks, and no chunk is ever empty. The output
/// is deterministic for identical input.
pub fn chunk_text(text: &str, max_words: usize, overlap_words: usize) -> Vec<String> {
    let step = max_words.saturating_sub(overlap_words).max(1);

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0usize;

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let words: Vec<&str> = paragraph.split_whitespace().collect();

        if current_words + words.len() <= max_words {
            current.push(paragraph);
            current_words += words.len();
            continue;
        }

        if !current.is_empty() {
            chunks.push(current.join("\n\n"));
            current.clear();
            current_words = 0;
        }

        if words.len() <= max_words {
            current.push(paragraph);
            current_words = words.len();
        } else {
            let mut start = 0;
            while start < words.len() {
                let end = (start + max_words).min(words.len());
                chunks.push(words[start..end].join(" "));
                start += step;
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }

    chunks
}

/// Chunk a parsed chapter into indexable records.
pub fn chunk_chapter(parsed: &ParsedChapter, config: &ChunkingConfig) -> Vec<Chunk> {
    chunk_text(&parsed.text, config.max_words, config.overlap_words)
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let word_count = text.split_whitespace().count();
            Chunk {
                chapter_slug: parsed.slug.clone(),
                module: parsed.module.clone(),
                index: index as u32,
                text,
                word_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_count(chunk: &str) -> usize {
        chunk.split_whitespace().count()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 500, 100).is_empty());
        assert!(chunk_text("  \n\n  \n\n", 500, 100).is_empty());
    }

    #[test]
    fn test_exactly_max_words_is_one_chunk() {
        let text = (0..8).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 8, 2);
        assert_eq!(chunks.len(), 1);
        assert_eq!(word_count(&chunks[0]), 8);
    }

    #[test]
    fn test_paragraphs_pack_greedily() {
        let text = "one two three\n\nfour five\n\nsix seven eight nine";
        // 3 + 2 fit in 6; the 4-word paragraph overflows and starts anew.
        let chunks = chunk_text(text, 6, 1);
        assert_eq!(chunks, vec![
            "one two three\n\nfour five".to_string(),
            "six seven eight nine".to_string(),
        ]);
    }

    #[test]
    fn test_oversized_paragraph_hard_splits_with_overlap() {
        let text = "Para one with ten words here for testing purposes now.";
        let chunks = chunk_text(text, 8, 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "Para one with ten words here for testing");
        assert_eq!(chunks[1], "for testing purposes now.");
    }

    #[test]
    fn test_heading_paragraph_then_oversized_then_short() {
        let text = "Title\n\nPara one with ten words here for testing purposes now.\n\nPara two.";
        let chunks = chunk_text(text, 8, 2);
        assert_eq!(chunks, vec![
            "Title".to_string(),
            "Para one with ten words here for testing".to_string(),
            "for testing purposes now.".to_string(),
            "Para two.".to_string(),
        ]);
    }

    #[test]
    fn test_no_overlap_between_paragraph_packed_chunks() {
        let text = "alpha beta gamma delta\n\nepsilon zeta eta theta";
        let chunks = chunk_text(text, 4, 2);
        // Adjacent paragraph-packed chunks share no words; the overlap
        // setting only matters inside an oversized paragraph.
        assert_eq!(chunks, vec![
            "alpha beta gamma delta".to_string(),
            "epsilon zeta eta theta".to_string(),
        ]);
    }

    #[test]
    fn test_no_chunk_exceeds_max_words() {
        let paragraph = (0..57).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let text = format!("{paragraph}\n\nshort tail paragraph");
        for chunk in chunk_text(&text, 10, 3) {
            assert!(word_count(&chunk) <= 10);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Some paragraph here.\n\nAnother one with a few more words in it.\n\nA third.";
        let first = chunk_text(text, 5, 1);
        let second = chunk_text(text, 5, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_chapter_records() {
        let parsed = ParsedChapter {
            slug: "module-1-foundations/intro".to_string(),
            module: "module-1-foundations".to_string(),
            frontmatter: Default::default(),
            text: "First paragraph of prose.\n\nSecond paragraph of prose.".to_string(),
        };
        let config = ChunkingConfig {
            max_words: 4,
            overlap_words: 1,
        };
        let chunks = chunk_chapter(&parsed, &config);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[0].chapter_slug, "module-1-foundations/intro");
        assert_eq!(chunks[0].word_count, 4);
    }
}
