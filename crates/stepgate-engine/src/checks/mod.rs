//! Built-in predicates over pipeline artifacts.
//!
//! Every check reads through an [`ArtifactCache`](crate::cache::ArtifactCache)
//! and converts structural failures into a failing
//! [`CheckResult`](stepgate_types::CheckResult); none of them return errors.

pub mod primitive;
pub mod quality;

pub use primitive::{contains_text, file_exists_and_valid, has_key};
pub use quality::{find_placeholders, generic_language, no_placeholder, GenericPhrases};
