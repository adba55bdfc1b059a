//! Splits oversized documents into bounded chunks along paragraph boundaries.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::types::Chunk;

/// Separator used when packing paragraphs back into a chunk.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid blank-line pattern"));

/// Splits `text` into ordered chunks of at most `max_chars` characters each.
///
/// The input is trimmed first; empty input yields an empty list. A
/// `max_chars` of 0 disables splitting, as does a document that already fits.
/// Otherwise paragraphs (blank-line separated) are greedily packed, joined by
/// [`PARAGRAPH_SEPARATOR`]; a single paragraph longer than the limit is cut
/// into fixed-width slices on its own and does not block packing of the
/// paragraphs after it. Chunk boundaries do not promise sentence integrity.
///
/// Concatenating the returned chunk texts, modulo the paragraph separator,
/// reconstructs the trimmed input with no characters lost.
pub fn split_document(text: &str, max_chars: usize) -> Vec<Chunk> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if max_chars == 0 || char_len(trimmed) <= max_chars {
        return number_chunks(vec![trimmed.to_string()]);
    }

    let paragraphs: Vec<&str> = BLANK_LINE
        .split(trimmed)
        .filter(|paragraph| !paragraph.trim().is_empty())
        .collect();
    let pieces = if paragraphs.is_empty() {
        slice_fixed_width(trimmed, max_chars)
    } else {
        pack_paragraphs(&paragraphs, max_chars)
    };

    debug!(chunks = pieces.len(), limit = max_chars, "document split");
    number_chunks(pieces)
}

fn number_chunks(pieces: Vec<String>) -> Vec<Chunk> {
    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            index: index + 1,
            total,
            text,
        })
        .collect()
}

/// Greedy packing: grow the buffer while the joined length stays within the
/// limit, flush on overflow, slice oversized paragraphs standalone.
fn pack_paragraphs(paragraphs: &[&str], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0_usize;

    for paragraph in paragraphs {
        let paragraph_chars = char_len(paragraph);

        if paragraph_chars > max_chars {
            if !buffer.is_empty() {
                chunks.push(std::mem::take(&mut buffer));
                buffer_chars = 0;
            }
            chunks.extend(slice_fixed_width(paragraph, max_chars));
            continue;
        }

        if buffer.is_empty() {
            buffer.push_str(paragraph);
            buffer_chars = paragraph_chars;
        } else if buffer_chars + PARAGRAPH_SEPARATOR.len() + paragraph_chars <= max_chars {
            buffer.push_str(PARAGRAPH_SEPARATOR);
            buffer.push_str(paragraph);
            buffer_chars += PARAGRAPH_SEPARATOR.len() + paragraph_chars;
        } else {
            chunks.push(std::mem::take(&mut buffer));
            buffer.push_str(paragraph);
            buffer_chars = paragraph_chars;
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }
    chunks
}

/// Consecutive non-overlapping slices of exactly `max_chars` characters; the
/// final slice may be shorter.
fn slice_fixed_width(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|slice| slice.iter().collect())
        .collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
