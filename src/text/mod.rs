//! Text normalization for spoken output

pub mod markdown;

pub use markdown::strip_markdown;
