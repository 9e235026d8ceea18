// ABOUTME: Extraction strategies applied to resolved HTML pages.
// ABOUTME: Includes baseline/configured metadata fields, readable text, and the rule regex cache.

//! Content extraction module.
//!
//! Submodules:
//! - `compiled`: cache of compiled rule regexes.
//! - `fields`: baseline metadata and rule-driven configured fields.
//! - `readable`: main-region readable text.

pub mod compiled;
pub mod fields;
pub mod readable;
