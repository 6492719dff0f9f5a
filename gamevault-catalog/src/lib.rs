//! Game catalog data model, filename parsing, and existence classification.
//!
//! This crate defines the catalog types without any database dependencies.
//! Everything here is pure: the parser turns a filename into structured
//! fields, and the classifier decides how a freshly scanned file relates to
//! what the catalog already holds. Persistence lives in `gamevault-db`.

pub mod existence;
pub mod name_parser;
pub mod normalize;
pub mod types;
pub mod yaml;

pub use existence::{
    ClassifyError, ExistenceCheck, ExistenceState, GameCandidate, TrackedField, classify,
};
pub use name_parser::{ParsedFilename, parse_filename};
pub use normalize::{slugify, sort_title};
pub use types::*;
pub use yaml::{YamlError, load_metadata_records};
