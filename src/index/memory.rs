//! In-memory segment implementation.
//!
//! [`MemorySegment`] implements the reader contracts of [`crate::index::reader`]
//! over postings held in memory. It is meant for tests, benchmarks and
//! embedding callers whose data is already resident.
//!
//! # Examples
//!
//! ```
//! use alignrank::index::memory::MemorySegmentBuilder;
//! use alignrank::index::reader::SegmentReader;
//!
//! let mut builder = MemorySegmentBuilder::new("seg-0");
//! let doc = builder.add_document();
//! builder.add_text(doc, "body", "quick brown fox");
//! let segment = builder.build();
//!
//! let body = segment.field("body").unwrap();
//! assert_eq!(body.docs_count(), 1);
//! assert_eq!(body.total_term_freq(), Some(3));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::tokenizer::Tokenizer;
use crate::error::{AlignRankError, Result};
use crate::index::reader::{
    FieldReader, NO_MORE_DOCS, NormReader, PostingIterator, SegmentReader, TermAttributes,
};

/// Which per-posting data a field records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOptions {
    /// Record term frequencies.
    pub frequencies: bool,
    /// Record term positions (requires frequencies).
    pub positions: bool,
    /// Record per-document field lengths.
    pub norms: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions {
            frequencies: true,
            positions: true,
            norms: true,
        }
    }
}

impl FieldOptions {
    /// Options for a field indexed with document ids only.
    pub fn docs_only() -> Self {
        FieldOptions {
            frequencies: false,
            positions: false,
            norms: false,
        }
    }
}

/// A single posting of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPosting {
    /// Document ID.
    pub doc_id: u64,
    /// Positions of the term in the document, ascending.
    pub positions: Vec<u64>,
}

/// Field lengths of every document in a segment.
#[derive(Debug, Clone)]
pub struct MemoryNorms {
    lengths: Vec<u32>,
}

impl NormReader for MemoryNorms {
    fn field_length(&self, doc_id: u64) -> u32 {
        usize::try_from(doc_id)
            .ok()
            .and_then(|idx| self.lengths.get(idx))
            .copied()
            .unwrap_or(0)
    }
}

/// A field of a [`MemorySegment`].
#[derive(Debug)]
pub struct MemoryField {
    name: String,
    options: FieldOptions,
    terms: BTreeMap<Vec<u8>, Arc<Vec<MemoryPosting>>>,
    docs_count: u64,
    total_term_freq: u64,
    norms: Option<MemoryNorms>,
}

impl MemoryField {
    /// Number of distinct terms in the field.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

impl FieldReader for MemoryField {
    fn name(&self) -> &str {
        &self.name
    }

    fn docs_count(&self) -> u64 {
        self.docs_count
    }

    fn total_term_freq(&self) -> Option<u64> {
        self.options.frequencies.then_some(self.total_term_freq)
    }

    fn has_positions(&self) -> bool {
        self.options.positions
    }

    fn term(&self, term: &[u8]) -> Option<TermAttributes> {
        self.terms.get(term).map(|postings| TermAttributes {
            doc_freq: Some(postings.len() as u64),
            total_freq: self
                .options
                .frequencies
                .then(|| postings.iter().map(|p| p.positions.len() as u64).sum()),
        })
    }

    fn postings(&self, term: &[u8]) -> Result<Option<Box<dyn PostingIterator>>> {
        Ok(self.terms.get(term).map(|postings| {
            Box::new(MemoryPostingIterator::new(postings.clone(), self.options))
                as Box<dyn PostingIterator>
        }))
    }

    fn norms(&self) -> Option<&dyn NormReader> {
        self.norms.as_ref().map(|norms| norms as &dyn NormReader)
    }
}

/// Posting iterator over a shared in-memory posting list.
#[derive(Debug, Clone)]
pub struct MemoryPostingIterator {
    postings: Arc<Vec<MemoryPosting>>,
    options: FieldOptions,
    position: usize,
    started: bool,
}

impl MemoryPostingIterator {
    /// Create an iterator positioned before the first posting.
    pub fn new(postings: Arc<Vec<MemoryPosting>>, options: FieldOptions) -> Self {
        MemoryPostingIterator {
            postings,
            options,
            position: 0,
            started: false,
        }
    }

    fn current(&self) -> Option<&MemoryPosting> {
        if self.started {
            self.postings.get(self.position)
        } else {
            None
        }
    }
}

impl PostingIterator for MemoryPostingIterator {
    fn doc_id(&self) -> u64 {
        self.current().map(|p| p.doc_id).unwrap_or(NO_MORE_DOCS)
    }

    fn term_freq(&self) -> u64 {
        match self.current() {
            Some(p) if self.options.frequencies => p.positions.len() as u64,
            Some(_) => 1,
            None => 0,
        }
    }

    fn positions(&self) -> Result<Vec<u64>> {
        if !self.options.positions {
            return Err(AlignRankError::index("field was indexed without positions"));
        }
        Ok(self
            .current()
            .map(|p| p.positions.clone())
            .unwrap_or_default())
    }

    fn positions_into(&self, out: &mut Vec<u64>) -> Result<()> {
        if !self.options.positions {
            return Err(AlignRankError::index("field was indexed without positions"));
        }
        out.clear();
        if let Some(posting) = self.current() {
            out.extend_from_slice(&posting.positions);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
        } else if self.position < self.postings.len() {
            self.position += 1;
        }
        Ok(self.position < self.postings.len())
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        self.started = true;
        if self.position >= self.postings.len() {
            return Ok(false);
        }
        if self.postings[self.position].doc_id >= target {
            return Ok(true);
        }

        // Postings are sorted by doc id.
        let rest = &self.postings[self.position..];
        self.position += rest.partition_point(|p| p.doc_id < target);
        Ok(self.position < self.postings.len())
    }

    fn cost(&self) -> u64 {
        self.postings.len() as u64
    }
}

/// An immutable in-memory segment.
#[derive(Debug)]
pub struct MemorySegment {
    name: String,
    doc_count: u64,
    fields: AHashMap<String, MemoryField>,
}

impl MemorySegment {
    /// Names of the fields present in this segment.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl SegmentReader for MemorySegment {
    fn name(&self) -> &str {
        &self.name
    }

    fn doc_count(&self) -> u64 {
        self.doc_count
    }

    fn max_doc(&self) -> u64 {
        self.doc_count
    }

    fn field(&self, name: &str) -> Option<&dyn FieldReader> {
        self.fields.get(name).map(|field| field as &dyn FieldReader)
    }
}

#[derive(Debug, Default)]
struct FieldAccumulator {
    terms: BTreeMap<Vec<u8>, Vec<MemoryPosting>>,
    lengths: AHashMap<u64, u32>,
    /// First free position per document.
    next_position: AHashMap<u64, u64>,
}

/// Builder for [`MemorySegment`].
#[derive(Debug)]
pub struct MemorySegmentBuilder {
    name: String,
    doc_count: u64,
    options: AHashMap<String, FieldOptions>,
    fields: AHashMap<String, FieldAccumulator>,
}

impl MemorySegmentBuilder {
    /// Create a builder for a segment with the given name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        MemorySegmentBuilder {
            name: name.into(),
            doc_count: 0,
            options: AHashMap::new(),
            fields: AHashMap::new(),
        }
    }

    /// Set the indexing options of a field (defaults to [`FieldOptions::default`]).
    pub fn field_options<S: Into<String>>(mut self, field: S, options: FieldOptions) -> Self {
        self.options.insert(field.into(), options);
        self
    }

    /// Allocate the next document id.
    pub fn add_document(&mut self) -> u64 {
        let doc_id = self.doc_count;
        self.doc_count += 1;
        doc_id
    }

    /// Append tokens to a field of a document.
    ///
    /// Tokens take consecutive positions after any tokens already added to the
    /// same field of the same document.
    pub fn add_tokens<I, T>(&mut self, doc_id: u64, field: &str, tokens: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.add_positioned(
            doc_id,
            field,
            tokens.into_iter().enumerate().map(|(i, token)| (i as u64, token)),
        );
    }

    /// Append whitespace-separated tokens of `text` to a field of a document.
    pub fn add_text(&mut self, doc_id: u64, field: &str, text: &str) {
        self.add_tokens(doc_id, field, text.split_whitespace());
    }

    /// Append the tokens `tokenizer` produces for `text`.
    ///
    /// Token positions are kept as the tokenizer reports them, offset past any
    /// earlier value of the same field. Tokens sharing a position stack.
    pub fn add_analyzed(
        &mut self,
        doc_id: u64,
        field: &str,
        text: &str,
        tokenizer: &dyn Tokenizer,
    ) -> Result<()> {
        let tokens = tokenizer.tokenize(text)?;
        self.add_positioned(
            doc_id,
            field,
            tokens.map(|token| (token.position as u64, token.text)),
        );
        Ok(())
    }

    /// `tokens` carries positions relative to this value, non-decreasing.
    fn add_positioned<I, T>(&mut self, doc_id: u64, field: &str, tokens: I)
    where
        I: IntoIterator<Item = (u64, T)>,
        T: AsRef<[u8]>,
    {
        if doc_id >= self.doc_count {
            self.doc_count = doc_id + 1;
        }

        let acc = self.fields.entry(field.to_string()).or_default();
        let length = acc.lengths.entry(doc_id).or_insert(0);
        let next_position = acc.next_position.entry(doc_id).or_insert(0);
        let base = *next_position;

        for (offset, token) in tokens {
            let position = base + offset;
            *length += 1;
            *next_position = (*next_position).max(position + 1);

            let postings = acc.terms.entry(token.as_ref().to_vec()).or_default();
            match postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
                Ok(idx) => {
                    let positions = &mut postings[idx].positions;
                    if positions.last() != Some(&position) {
                        positions.push(position);
                    }
                }
                Err(idx) => postings.insert(
                    idx,
                    MemoryPosting {
                        doc_id,
                        positions: vec![position],
                    },
                ),
            }
        }
    }

    /// Finish the segment.
    pub fn build(self) -> MemorySegment {
        let doc_count = self.doc_count;
        let mut fields = AHashMap::with_capacity(self.fields.len());

        for (name, acc) in self.fields {
            let options = self.options.get(&name).copied().unwrap_or_default();

            let mut lengths = vec![0u32; doc_count as usize];
            for (&doc_id, &length) in &acc.lengths {
                lengths[doc_id as usize] = length;
            }

            let docs_count = lengths.iter().filter(|&&len| len > 0).count() as u64;
            let total_term_freq = lengths.iter().map(|&len| len as u64).sum();

            let terms = acc
                .terms
                .into_iter()
                .map(|(term, mut postings)| {
                    if !options.frequencies {
                        postings.iter_mut().for_each(|p| p.positions.truncate(1));
                    }
                    (term, Arc::new(postings))
                })
                .collect();

            let field = MemoryField {
                name: name.clone(),
                options,
                terms,
                docs_count,
                total_term_freq,
                norms: options.norms.then_some(MemoryNorms { lengths }),
            };
            fields.insert(name, field);
        }

        MemorySegment {
            name: self.name,
            doc_count,
            fields,
        }
    }
}
