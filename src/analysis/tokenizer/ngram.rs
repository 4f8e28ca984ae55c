//! N-gram tokenizer implementation.

use serde::{Deserialize, Serialize};

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::{AlignRankError, Result};

/// Options of [`NgramTokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NgramOptions {
    /// Minimum n-gram size, in characters.
    pub min: usize,
    /// Maximum n-gram size, in characters.
    pub max: usize,
    /// Also emit the whole input when it is longer than `max`.
    #[serde(default)]
    pub preserve_original: bool,
}

/// A tokenizer that generates character n-grams.
///
/// Grams are emitted by start character, shortest first, each taking the next
/// position.
///
/// # Examples
///
/// ```
/// use alignrank::analysis::tokenizer::ngram::NgramTokenizer;
/// use alignrank::analysis::tokenizer::Tokenizer;
///
/// let tokenizer = NgramTokenizer::new(2, 2).unwrap();
/// let tokens: Vec<_> = tokenizer.tokenize("hello").unwrap()
///     .map(|t| t.text)
///     .collect();
/// assert_eq!(tokens, vec!["he", "el", "ll", "lo"]);
///
/// let tokenizer = NgramTokenizer::new(2, 3).unwrap();
/// let tokens: Vec<_> = tokenizer.tokenize("abc").unwrap()
///     .map(|t| t.text)
///     .collect();
/// assert_eq!(tokens, vec!["ab", "abc", "bc"]);
/// ```
#[derive(Clone, Debug)]
pub struct NgramTokenizer {
    /// Minimum n-gram size
    min_gram: usize,
    /// Maximum n-gram size
    max_gram: usize,
    preserve_original: bool,
}

impl NgramTokenizer {
    /// Create a new n-gram tokenizer.
    ///
    /// Fails if `min_gram` is 0 or `max_gram` is less than `min_gram`.
    pub fn new(min_gram: usize, max_gram: usize) -> Result<Self> {
        Self::from_options(NgramOptions {
            min: min_gram,
            max: max_gram,
            preserve_original: false,
        })
    }

    pub fn from_options(options: NgramOptions) -> Result<Self> {
        if options.min == 0 {
            return Err(AlignRankError::analysis("min_gram must be at least 1"));
        }
        if options.max < options.min {
            return Err(AlignRankError::analysis(format!(
                "max_gram ({}) must be >= min_gram ({})",
                options.max, options.min
            )));
        }
        Ok(NgramTokenizer {
            min_gram: options.min,
            max_gram: options.max,
            preserve_original: options.preserve_original,
        })
    }

    /// Create a bigram tokenizer (n=2).
    pub fn bigram() -> Self {
        NgramTokenizer {
            min_gram: 2,
            max_gram: 2,
            preserve_original: false,
        }
    }

    /// Create a trigram tokenizer (n=3).
    pub fn trigram() -> Self {
        NgramTokenizer {
            min_gram: 3,
            max_gram: 3,
            preserve_original: false,
        }
    }

    pub fn with_preserve_original(mut self, preserve_original: bool) -> Self {
        self.preserve_original = preserve_original;
        self
    }
}

impl Tokenizer for NgramTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        // Byte offset of every char boundary, including the end of text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut tokens = Vec::new();
        for start in 0..char_count {
            for gram_size in self.min_gram..=self.max_gram {
                let end = start + gram_size;
                if end > char_count {
                    break;
                }
                let (from, to) = (boundaries[start], boundaries[end]);
                tokens.push(Token::with_offsets(&text[from..to], tokens.len(), from, to));
            }

            if start == 0 && self.preserve_original && char_count > self.max_gram {
                tokens.push(Token::with_offsets(text, tokens.len(), 0, text.len()));
            }
        }

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "ngram"
    }
}
