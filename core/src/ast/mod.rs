//! Checks predicted labels against the declarations actually present in a
//! local checkout.
//!
//! A [`SourceFrontend`] turns a source file into a tree of [`DeclNode`]s; the
//! validator walks that tree and keeps every interesting declaration whose
//! name contains one of the symbols expected for the file.

mod clang;
#[cfg(feature = "symbols-cpp")]
mod cpp_grammar;

pub use clang::ClangFrontend;
#[cfg(feature = "symbols-cpp")]
pub use cpp_grammar::TreeSitterFrontend;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontendError {
    #[error("clang not found at {0}")]
    ClangMissing(PathBuf),
    #[error("clang not found in PATH; pass --clang <path> or use --frontend tree-sitter")]
    ClangNotInPath,
    #[error("clang failed on {path}: {stderr}")]
    ClangFailed { path: PathBuf, stderr: String },
    #[error("Invalid AST dump for {path}: {source}")]
    Dump {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("AST dump for {path} nests deeper than {limit} levels")]
    TooDeep { path: PathBuf, limit: usize },
    #[error("Could not parse {0}")]
    Unparsed(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declaration kinds worth reporting, named the way libclang names cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeclKind {
    #[serde(rename = "FUNCTION_DECL")]
    Function,
    #[serde(rename = "CXX_METHOD")]
    Method,
    #[serde(rename = "CONSTRUCTOR")]
    Constructor,
    #[serde(rename = "CLASS_DECL")]
    Class,
    #[serde(rename = "STRUCT_DECL")]
    Struct,
    #[serde(rename = "ENUM_DECL")]
    Enum,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION_DECL",
            Self::Method => "CXX_METHOD",
            Self::Constructor => "CONSTRUCTOR",
            Self::Class => "CLASS_DECL",
            Self::Struct => "STRUCT_DECL",
            Self::Enum => "ENUM_DECL",
        }
    }
}

impl std::fmt::Display for DeclKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the declaration tree. Nodes the front-end does not care about
/// carry no kind; their declarations are hoisted into the nearest kept
/// ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclNode {
    pub name: String,
    pub kind: Option<DeclKind>,
    pub line: u32,
    pub children: Vec<DeclNode>,
}

impl DeclNode {
    pub fn root(name: impl Into<String>, children: Vec<DeclNode>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            line: 0,
            children,
        }
    }

    /// Pre-order, depth-first walk over this node and everything below it.
    pub fn walk(&self) -> impl Iterator<Item = &DeclNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

/// Options passed to the front-end for every file.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub args: Vec<String>,
    pub detailed_processing_record: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            args: vec!["-std=c++17".to_owned()],
            detailed_processing_record: true,
        }
    }
}

pub trait SourceFrontend {
    fn parse(&self, path: &Path, options: &ParseOptions) -> Result<DeclNode, FrontendError>;
}

/// A declaration that matched an expected symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AstMatch {
    pub name: String,
    pub line: u32,
    pub kind: DeclKind,
}

/// File → symbols expected in it, from labels of the form `file::symbol`.
/// Labels without `::` are ignored.
pub fn expected_symbols(labels: &[String]) -> BTreeMap<String, BTreeSet<String>> {
    let mut expected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for label in labels {
        if let Some((file, symbol)) = label.split_once("::") {
            expected
                .entry(file.trim().to_owned())
                .or_default()
                .insert(symbol.trim().to_owned());
        }
    }
    expected
}

/// Every kept declaration under `tree` whose name contains one of `symbols`.
pub fn find_matches(tree: &DeclNode, symbols: &BTreeSet<String>) -> Vec<AstMatch> {
    tree.walk()
        .filter_map(|node| {
            let kind = node.kind?;
            symbols
                .iter()
                .any(|s| node.name.contains(s.as_str()))
                .then(|| AstMatch {
                    name: node.name.clone(),
                    line: node.line,
                    kind,
                })
        })
        .collect()
}

/// Parse each of `files` under `root` and collect matches for the symbols the
/// labels expect in that file. Missing files and files that fail to parse are
/// logged and skipped; files without a match are left out.
pub fn validate<F: SourceFrontend + ?Sized>(
    frontend: &F,
    root: &Path,
    files: &[String],
    labels: &[String],
    options: &ParseOptions,
) -> BTreeMap<String, Vec<AstMatch>> {
    let expected = expected_symbols(labels);
    let empty = BTreeSet::new();
    let mut results = BTreeMap::new();

    for file in files {
        let path = root.join(file);
        if !path.is_file() {
            log::warn!("[ast] File not found: {}", path.display());
            continue;
        }

        let tree = match frontend.parse(&path, options) {
            Ok(tree) => tree,
            Err(e) => {
                log::warn!("[ast] Skipping {file}: {e}");
                continue;
            }
        };

        let symbols = expected.get(file.as_str()).unwrap_or(&empty);
        let matches = find_matches(&tree, symbols);
        log::debug!("[ast] {file}: {} match(es)", matches.len());
        if !matches.is_empty() {
            results.insert(file.clone(), matches);
        }
    }

    results
}
