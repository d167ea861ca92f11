//! Text chunking
//!
//! The content stream is the plain text of every non-empty block of every
//! reading-order document, blocks separated by a blank line. Chunks are
//! byte ranges of that stream and never span two documents.

use crate::document::{Block, Chunk, ChunkMode, ChunkingOptions, DocumentError, Result};

/// Separator between blocks in the content stream
pub const BLOCK_SEPARATOR: &str = "\n\n";

struct Piece {
    block_index: usize,
    offset: usize,
    text: String,
}

/// Chunk the documents of a publication, in reading order.
///
/// `documents[i]` holds the blocks of reading-order document `i`, or `None`
/// when the document could not be read.
pub fn chunk_documents(
    documents: &[Option<&[Block]>],
    options: &ChunkingOptions,
) -> Result<Vec<Chunk>> {
    if options.mode == ChunkMode::Size && options.max_chars == 0 {
        return Err(DocumentError::Chunking(
            "max_chars must be at least 1".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut offset = 0usize;
    let mut first_in_stream = true;

    for (spine_index, blocks) in documents.iter().enumerate() {
        let Some(blocks) = blocks else {
            continue;
        };

        let mut pieces = Vec::new();
        for (block_index, block) in blocks.iter().enumerate() {
            let text = block.plain_text();
            if text.is_empty() {
                continue;
            }
            if !first_in_stream {
                offset += BLOCK_SEPARATOR.len();
            }
            first_in_stream = false;
            pieces.push(Piece {
                block_index,
                offset,
                text,
            });
            offset += pieces.last().map_or(0, |p| p.text.len());
        }
        if pieces.is_empty() {
            continue;
        }

        match options.mode {
            ChunkMode::Document => push_chunk(&mut chunks, spine_index, &pieces),
            ChunkMode::Size => pack(&mut chunks, spine_index, &pieces, options.max_chars),
        }
    }

    Ok(chunks)
}

/// Pack consecutive pieces while the chunk stays within `max_chars`.
fn pack(chunks: &mut Vec<Chunk>, spine_index: usize, pieces: &[Piece], max_chars: usize) {
    let mut start = 0;
    let mut chars = 0;

    for (i, piece) in pieces.iter().enumerate() {
        let piece_chars = piece.text.chars().count();

        if piece_chars > max_chars {
            if start < i {
                push_chunk(chunks, spine_index, &pieces[start..i]);
            }
            split_oversized(chunks, spine_index, piece, max_chars);
            start = i + 1;
            chars = 0;
            continue;
        }

        let joined = if start < i {
            chars + BLOCK_SEPARATOR.len() + piece_chars
        } else {
            piece_chars
        };
        if start < i && joined > max_chars {
            push_chunk(chunks, spine_index, &pieces[start..i]);
            start = i;
            chars = piece_chars;
        } else {
            chars = joined;
        }
    }

    if start < pieces.len() {
        push_chunk(chunks, spine_index, &pieces[start..]);
    }
}

fn push_chunk(chunks: &mut Vec<Chunk>, spine_index: usize, pieces: &[Piece]) {
    let (Some(first), Some(last)) = (pieces.first(), pieces.last()) else {
        return;
    };
    let text = pieces
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR);
    chunks.push(Chunk {
        id: format!("chunk-{}", chunks.len()),
        spine_index,
        first_block: first.block_index,
        last_block: last.block_index,
        start_offset: first.offset,
        end_offset: first.offset + text.len(),
        text,
    });
}

/// Split one block longer than `max_chars` at the last whitespace before
/// the limit, or hard at the limit when there is none.
fn split_oversized(chunks: &mut Vec<Chunk>, spine_index: usize, piece: &Piece, max_chars: usize) {
    let text = piece.text.as_str();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(idx, _)| idx);

        let cut = if limit == rest.len() || rest[limit..].starts_with(char::is_whitespace) {
            limit
        } else {
            rest[..limit]
                .char_indices()
                .rev()
                .find(|(idx, c)| *idx > 0 && c.is_whitespace())
                .map_or(limit, |(idx, _)| idx)
        };

        let segment = rest[..cut].trim_end();
        if !segment.is_empty() {
            chunks.push(Chunk {
                id: format!("chunk-{}", chunks.len()),
                spine_index,
                first_block: piece.block_index,
                last_block: piece.block_index,
                start_offset: piece.offset + pos,
                end_offset: piece.offset + pos + segment.len(),
                text: segment.to_string(),
            });
        }

        pos += cut;
        pos += text[pos..].len() - text[pos..].trim_start().len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(paragraphs: &[&str]) -> Vec<Block> {
        paragraphs.iter().map(|p| Block::paragraph(*p)).collect()
    }

    fn size(max_chars: usize) -> ChunkingOptions {
        ChunkingOptions {
            mode: ChunkMode::Size,
            max_chars,
        }
    }

    fn stream(documents: &[Option<&[Block]>]) -> String {
        documents
            .iter()
            .flatten()
            .flat_map(|blocks| blocks.iter().map(Block::plain_text))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    #[test]
    fn test_size_mode_packs_within_limit_and_document() {
        let a = doc(&["aaaa", "bbbb", "cccc"]);
        let b = doc(&["dd"]);
        let documents = vec![Some(a.as_slice()), Some(b.as_slice())];
        let chunks = chunk_documents(&documents, &size(10)).unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa\n\nbbbb", "cccc", "dd"]);
        assert_eq!((chunks[0].first_block, chunks[0].last_block), (0, 1));
        assert_eq!((chunks[1].first_block, chunks[1].last_block), (2, 2));
        assert_eq!(chunks[2].spine_index, 1);

        let full = stream(&documents);
        for chunk in &chunks {
            assert_eq!(&full[chunk.start_offset..chunk.end_offset], chunk.text);
        }
    }

    #[test]
    fn test_oversized_block_split_at_whitespace() {
        let blocks = doc(&["short", "alpha beta gamma delta", "tail"]);
        let documents = vec![Some(blocks.as_slice())];
        let chunks = chunk_documents(&documents, &size(12)).unwrap();

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["short", "alpha beta", "gamma delta", "tail"]);
        assert!(chunks[1..3].iter().all(|c| c.first_block == 1 && c.last_block == 1));

        let full = stream(&documents);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 12);
            assert_eq!(&full[chunk.start_offset..chunk.end_offset], chunk.text);
        }
    }

    #[test]
    fn test_hard_split_without_whitespace() {
        let blocks = doc(&["abcdefghij"]);
        let chunks = chunk_documents(&[Some(blocks.as_slice())], &size(4)).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunks[1].start_offset, 4);
    }

    #[test]
    fn test_document_mode_and_unreadable_documents() {
        let a = doc(&["one", "", "two"]);
        let c = doc(&["three"]);
        let documents = vec![Some(a.as_slice()), None, Some(c.as_slice())];
        let options = ChunkingOptions {
            mode: ChunkMode::Document,
            max_chars: 1,
        };
        let chunks = chunk_documents(&documents, &options).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "one\n\ntwo");
        assert_eq!((chunks[0].first_block, chunks[0].last_block), (0, 2));
        assert_eq!(chunks[1].spine_index, 2);
        assert_eq!(chunks[1].start_offset, "one\n\ntwo\n\n".len());
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        assert!(chunk_documents(&[], &size(0)).is_err());
    }
}
