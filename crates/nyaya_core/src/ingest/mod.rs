//! Turns a directory of plain-text legal documents into region-tagged passages.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::config::IngestConfig;
use crate::domain::{Passage, RegionMetadata};
use crate::error::AppError;
use crate::language::detect_language;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Region tags applied to every passage of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct RegionTags {
    pub taluk: Option<String>,
    pub pincode: Option<String>,
}

impl RegionTags {
    fn to_metadata(&self) -> RegionMetadata {
        let fallback = RegionMetadata::default();
        RegionMetadata {
            taluk: non_blank(self.taluk.as_deref()).unwrap_or(fallback.taluk),
            pincode: non_blank(self.pincode.as_deref()).unwrap_or(fallback.pincode),
        }
    }
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn load_documents(
    dir: &Path,
    tags: &RegionTags,
    cfg: &IngestConfig,
) -> Result<Vec<Passage>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::new("INGEST_SOURCE_INVALID", "Documents path must be a directory")
            .with_details(format!("path={}", dir.display())));
    }
    let region = tags.to_metadata();

    let mut out = Vec::new();
    for path in collect_document_files(dir) {
        let raw = fs::read(&path).map_err(|e| {
            AppError::new("INGEST_READ_FAILED", "Failed to read document")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let text = String::from_utf8_lossy(&raw);
        let source = path.to_string_lossy().to_string();
        let chunks = chunk_text(&text, cfg.chunk_size, cfg.chunk_overlap);
        tracing::debug!(source = %source, chunks = chunks.len(), "chunked document");

        for (ordinal, content) in chunks.into_iter().enumerate() {
            out.push(Passage {
                id: passage_id(&source, ordinal, &content),
                language: detect_language(&content),
                source: source.clone(),
                region: region.clone(),
                content,
            });
        }
    }
    Ok(out)
}

/// Content-derived id, so ingesting the same file twice is idempotent.
pub fn passage_id(source: &str, ordinal: usize, content: &str) -> String {
    let payload = format!("source={source}\nordinal={ordinal}\ntext={content}");
    hex::encode(Sha256::digest(payload.as_bytes()))
}

fn collect_document_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(p) = stack.pop() {
        let entries = match fs::read_dir(&p) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(path = %p.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for ent in entries.flatten() {
            let path = ent.path();
            if path.is_dir() {
                stack.push(path);
            } else if path
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
            {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

/// Packs paragraphs into chunks of at most `max_chars` characters.
///
/// Consecutive chunks share up to `overlap` characters, cut at a word
/// boundary. Paragraphs longer than `max_chars` are split at word boundaries,
/// and single words longer than that are split on character boundaries.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    // (text, already overlaps the previous piece)
    let mut pieces: Vec<(String, bool)> = Vec::new();
    for para in normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        if para.chars().count() > max_chars {
            let parts = split_long_paragraph(para, max_chars, overlap);
            pieces.extend(parts.into_iter().enumerate().map(|(i, p)| (p, i > 0)));
        } else {
            pieces.push((para.to_string(), false));
        }
    }

    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;
    for (piece, continues) in pieces {
        let piece_chars = piece.chars().count();
        if !buf.is_empty() && buf_chars + 2 + piece_chars > max_chars {
            let done = std::mem::take(&mut buf);
            buf_chars = 0;
            if !continues {
                let tail = overlap_tail(&done, overlap);
                let tail_chars = tail.chars().count();
                if !tail.is_empty() && tail_chars + 2 + piece_chars <= max_chars {
                    buf = tail;
                    buf_chars = tail_chars;
                }
            }
            out.push(done);
        }
        if !buf.is_empty() {
            buf.push_str("\n\n");
            buf_chars += 2;
        }
        buf.push_str(&piece);
        buf_chars += piece_chars;
    }
    if !buf.trim().is_empty() {
        out.push(buf);
    }
    out
}

/// Trailing whole words of `chunk` totalling at most `overlap` characters.
fn overlap_tail(chunk: &str, overlap: usize) -> String {
    let mut words: Vec<&str> = Vec::new();
    let mut len = 0usize;
    for word in chunk.split_whitespace().rev() {
        let add = word.chars().count() + usize::from(!words.is_empty());
        if len + add > overlap {
            break;
        }
        len += add;
        words.push(word);
    }
    words.reverse();
    words.join(" ")
}

fn hard_split(word: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

fn split_long_paragraph(paragraph: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let words: Vec<String> = paragraph
        .split_whitespace()
        .flat_map(|w| {
            if w.chars().count() > max_chars {
                hard_split(w, max_chars)
            } else {
                vec![w.to_string()]
            }
        })
        .collect();
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < words.len() {
        let mut end = start;
        let mut len = 0usize;
        while end < words.len() {
            let add = words[end].chars().count() + usize::from(end > start);
            if end > start && len + add > max_chars {
                break;
            }
            len += add;
            end += 1;
        }
        out.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }

        // Step back over trailing words that fit in the overlap budget; always
        // advance by at least one word.
        let mut next = end;
        let mut carried = 0usize;
        while next > start + 1 {
            let add = words[next - 1].chars().count() + 1;
            if carried + add > overlap {
                break;
            }
            carried += add;
            next -= 1;
        }
        start = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_paragraphs_are_packed_together() {
        let chunks = chunk_text("one\n\ntwo\n\nthree", 100, 10);
        assert_eq!(chunks, vec!["one\n\ntwo\n\nthree".to_string()]);
    }

    #[test]
    fn paragraphs_are_not_merged_past_the_limit() {
        let a = "a".repeat(60);
        let b = "b".repeat(60);
        let chunks = chunk_text(&format!("{a}\n\n{b}"), 100, 10);
        assert_eq!(chunks, vec![a, b]);
    }

    #[test]
    fn long_paragraphs_split_with_overlap() {
        let words: Vec<String> = (0..50).map(|i| format!("w{i:02}")).collect();
        let chunks = chunk_text(&words.join(" "), 40, 8);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 40, "chunk too long: {c}");
        }
        // The tail of one chunk is repeated at the head of the next.
        assert!(chunks[1].starts_with("w08 w09"));
        assert!(chunks.last().unwrap().ends_with("w49"));
    }

    #[test]
    fn packed_paragraphs_share_overlap() {
        let para = |tag: &str| {
            (0..100)
                .map(|i| format!("{tag}{i:04}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let (a, b, c) = (para("a"), para("b"), para("c"));
        let chunks = chunk_text(&format!("{a}\n\n{b}\n\n{c}"), 1000, 200);

        assert_eq!(chunks.len(), 3);
        for pair in chunks.windows(2) {
            let tail = overlap_tail(&pair[0], 200);
            assert!(!tail.is_empty());
            assert!(pair[1].starts_with(&tail), "no overlap carried into {:.20}", pair[1]);
        }
        for c in &chunks {
            assert!(c.chars().count() <= 1000);
        }
        assert!(chunks[1].starts_with("a"));
        assert!(chunks[1].ends_with("b0099"));
    }

    #[test]
    fn oversized_words_are_split_on_char_boundaries() {
        let url = format!("https://example.org/{}", "ಕ".repeat(1500));
        let chunks = chunk_text(&format!("see {url} here"), 1000, 200);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 1000, "chunk has {} chars", c.chars().count());
        }
        let rejoined: String = chunks.concat();
        assert!(rejoined.contains("https://example.org/"));
        assert!(chunks.last().unwrap().ends_with("here"));
    }
}
