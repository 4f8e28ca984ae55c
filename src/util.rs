//! Shared utility modules used across AlignRank components.

pub mod sqrt;
pub mod varint;
