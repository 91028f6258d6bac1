//! procmap-interchange: parse-document and reference-map types.
//!
//! Provides typed structs for the records handed over by the document
//! parser (process definitions, sequence flows, diagram bounds) and the
//! externally curated reference map, together with JSON deserialization
//! for both.
//!
//! Nothing in this crate performs I/O. Callers read documents however they
//! like and pass `serde_json::Value`s or strings in; the resolution engine in
//! `procmap-core` consumes the resulting [`Corpus`] and [`ReferenceMap`].

pub mod deserialize;
pub mod reference_map;
pub mod types;

pub use deserialize::{parse_document, InterchangeError};
pub use reference_map::{AcceptedMatch, MappedInvocationPoint, ReferenceMap, ReferenceMapFile};
pub use types::*;
