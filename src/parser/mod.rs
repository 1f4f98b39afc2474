//! Message decoding: MIME structure via `mail-parser`, and `Date:` parsing.

pub mod date;
pub mod mime;
