//! Byte-bounded chunker / 按字节上限切分文档
//!
//! Every emitted unit serializes to at most `max_bytes`, except that a segment may run
//! over by less than one character when a boundary has to be moved off a multi-byte
//! character. Segment texts concatenated in index order reproduce the source text.

use super::schema::{IndexedUnit, SearchableDocument};
use crate::error::{Result, SearchError};

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_bytes: usize,
}

impl Chunker {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Serialized size of everything except the raw text bytes, for a document that is
    /// split into `segments` units / 除正文原始字节外的固定开销
    ///
    /// Includes the JSON escaping of the whole text and the widest segment suffix.
    pub fn overhead(&self, doc: &SearchableDocument, segments: usize) -> Result<usize> {
        let last = segments.max(1) - 1;
        let frame = serde_json::to_vec(&IndexedUnit::segment(doc, last, String::new()))?.len();
        let escaped = serde_json::to_string(&doc.text)?.len() - 2;
        Ok(frame + escaped - doc.text.len())
    }

    /// Serialized size of the whole document as a single unit / 整体序列化大小
    pub fn encoded_size(&self, doc: &SearchableDocument) -> Result<usize> {
        Ok(self.overhead(doc, 1)? + doc.text.len())
    }

    /// Minimum number of segments so that each fits under the ceiling / 最少分段数
    pub fn segment_count(&self, doc: &SearchableDocument) -> Result<usize> {
        let text_size = doc.text.len();
        let mut count = 1;
        loop {
            let overhead = self.overhead(doc, count)?;
            if overhead >= self.max_bytes {
                return Err(SearchError::ChunkingInvariant {
                    id: doc.id.clone(),
                    overhead,
                    max_bytes: self.max_bytes,
                });
            }
            let budget = self.max_bytes - overhead;
            let needed = ((text_size + budget - 1) / budget).max(1);
            // wider suffixes can raise the overhead, so iterate until stable
            if needed <= count {
                return Ok(count);
            }
            count = needed;
        }
    }

    /// Split a document into index units / 切分为索引单元
    pub fn split(&self, doc: &SearchableDocument) -> Result<Vec<IndexedUnit>> {
        if doc.text.is_empty() || self.encoded_size(doc)? <= self.max_bytes {
            return Ok(vec![IndexedUnit::segment(doc, 0, doc.text.clone())]);
        }

        let count = self.segment_count(doc)?;
        let bounds = boundaries(&doc.text, count);

        Ok(bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| IndexedUnit::segment(doc, i, doc.text[w[0]..w[1]].to_string()))
            .collect())
    }
}

/// Byte offsets `0 = b0 < b1 < .. < bk = len` of `count` near-equal slices, each moved
/// down onto a character boundary. Yields fewer slices when a slice would be narrower
/// than one character.
fn boundaries(text: &str, count: usize) -> Vec<usize> {
    let len = text.len();
    let mut bounds = Vec::with_capacity(count + 1);
    bounds.push(0);
    let mut prev = 0;

    for i in 1..count {
        let mut end = len * i / count;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end <= prev {
            // never emit an empty slice: take the next whole character
            end = prev + 1;
            while end < len && !text.is_char_boundary(end) {
                end += 1;
            }
        }
        if end >= len {
            break;
        }
        bounds.push(end);
        prev = end;
    }

    bounds.push(len);
    bounds
}
