use crate::error::IngestError;
use crate::models::{Chunk, ChunkingOptions, NormalizedText};

/// Splits one normalized document into fixed-size overlapping chunks.
///
/// Windows advance by `window - overlap` characters. When the tail left
/// after a full window is shorter than one step, the final window extends
/// to the end of the text instead of emitting a sliver chunk, so no text is
/// ever dropped. Chunk ids continue from `first_id` so a multi-document
/// batch stays sequential; the next free id is returned alongside the
/// chunks.
pub fn chunk_document(
    document: &NormalizedText,
    options: &ChunkingOptions,
    first_id: usize,
) -> Result<(Vec<Chunk>, usize), IngestError> {
    options.validate()?;

    let chars: Vec<char> = document.text.chars().collect();
    let mut chunks = Vec::new();
    let mut next_id = first_id;

    if chars.is_empty() {
        return Ok((chunks, next_id));
    }

    let window = options.window_chars;
    let step = options.step();
    let mut start = 0usize;

    loop {
        let mut end = (start + window).min(chars.len());
        if chars.len() - end < step {
            end = chars.len();
        }

        chunks.push(Chunk {
            id: next_id.to_string(),
            source: document.source.clone(),
            start_offset: start,
            text: chars[start..end].iter().collect(),
        });
        next_id += 1;

        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok((chunks, next_id))
}

/// Chunks a batch of documents with one shared id sequence starting at 0.
pub fn chunk_documents(
    documents: &[NormalizedText],
    options: &ChunkingOptions,
) -> Result<Vec<Chunk>, IngestError> {
    let mut chunks = Vec::new();
    let mut cursor = 0usize;

    for document in documents {
        let (document_chunks, next_cursor) = chunk_document(document, options, cursor)?;
        cursor = next_cursor;
        chunks.extend(document_chunks);
    }

    Ok(chunks)
}
