//! Unified diff parsing and the function-name heuristic run over patches.

pub mod functions;
pub mod parser;

pub use functions::{extract_functions, functions_by_file, FileFunctions};
pub use parser::{parse_patch, DiffParseError, PatchedFile};
