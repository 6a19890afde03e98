//! Offline corpus preparation: chapter parsing and content chunking.

mod chunker;
mod parser;

pub use chunker::{chunk_chapter, chunk_text, Chunk};
pub use parser::{parse_chapter, ChapterSource, ParsedChapter, MIN_INDEXABLE_CHARS};

use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Collect chapter sources under `docs_dir`, in a stable path order.
///
/// Every `.mdx` or `.md` file below the directory becomes one
/// [`ChapterSource`], with its slug derived from the path relative to
/// `docs_dir`. Unreadable entries are logged and skipped so one bad file
/// cannot abort corpus discovery.
pub fn discover_chapters(docs_dir: &Path) -> io::Result<Vec<ChapterSource>> {
    if !docs_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("docs directory not found: {}", docs_dir.display()),
        ));
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_chapter = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("mdx") | Some("md")
        );
        if !is_chapter {
            continue;
        }

        let relative = path.strip_prefix(docs_dir).unwrap_or(path);
        match std::fs::read_to_string(path) {
            Ok(markdown) => {
                sources.push(ChapterSource::from_relative_path(
                    &relative.to_string_lossy(),
                    markdown,
                ));
            }
            Err(err) => {
                log::warn!("skipping unreadable chapter {}: {err}", path.display());
            }
        }
    }

    Ok(sources)
}
