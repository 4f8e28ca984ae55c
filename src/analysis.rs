//! Text analysis.
//!
//! Tokenizers turn a target string into the ordered terms of an n-gram
//! similarity pattern, and can feed the same terms into an in-memory segment.

pub mod token;
pub mod tokenizer;

pub use token::{Token, TokenStream};
pub use tokenizer::Tokenizer;
pub use tokenizer::ngram::{NgramOptions, NgramTokenizer};
pub use tokenizer::whitespace::WhitespaceTokenizer;
