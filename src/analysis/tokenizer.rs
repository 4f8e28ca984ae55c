//! Tokenizers turning text into terms.
//!
//! - [`whitespace::WhitespaceTokenizer`] - splits on whitespace
//! - [`ngram::NgramTokenizer`] - character n-grams, the usual source of
//!   n-gram similarity patterns
//!
//! # Examples
//!
//! ```
//! use alignrank::analysis::tokenizer::Tokenizer;
//! use alignrank::analysis::tokenizer::whitespace::WhitespaceTokenizer;
//!
//! let tokenizer = WhitespaceTokenizer::new();
//! let tokens: Vec<_> = tokenizer.tokenize("Hello world").unwrap().collect();
//! assert_eq!(tokens.len(), 2);
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod ngram;
pub mod whitespace;
