//! Front-end backed by `clang -Xclang -ast-dump=json`.

use super::{DeclKind, DeclNode, FrontendError, ParseOptions, SourceFrontend};
use crate::process::find_executable;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Runs a clang binary once per file and lowers its JSON AST dump.
#[derive(Debug, Clone)]
pub struct ClangFrontend {
    program: PathBuf,
}

impl ClangFrontend {
    /// Use `explicit` when given (it must exist), otherwise find `clang` in
    /// PATH.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, FrontendError> {
        match explicit {
            Some(path) if path.is_file() => Ok(Self {
                program: path.to_path_buf(),
            }),
            Some(path) => Err(FrontendError::ClangMissing(path.to_path_buf())),
            None => find_executable("clang")
                .map(|program| Self { program })
                .ok_or(FrontendError::ClangNotInPath),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, path: &Path, options: &ParseOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-fsyntax-only", "-Xclang", "-ast-dump=json"]);
        if options.detailed_processing_record {
            cmd.args(["-Xclang", "-detailed-preprocessing-record"]);
        }
        cmd.args(&options.args).arg(path);
        cmd
    }
}

impl SourceFrontend for ClangFrontend {
    fn parse(&self, path: &Path, options: &ParseOptions) -> Result<DeclNode, FrontendError> {
        log::debug!("[ast] clang {}", path.display());

        let output = self
            .command(path, options)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        // Missing includes make clang exit non-zero but it still dumps what
        // it could parse.
        if output.stdout.is_empty() {
            return Err(FrontendError::ClangFailed {
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !output.status.success() {
            log::debug!(
                "[ast] clang reported errors for {}, using partial AST",
                path.display()
            );
        }

        parse_dump(&output.stdout, path)
    }
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    loc: Option<RawLoc>,
    #[serde(default)]
    range: Option<RawRange>,
    #[serde(default, rename = "isImplicit")]
    is_implicit: bool,
    #[serde(default, rename = "tagUsed")]
    tag_used: Option<String>,
    #[serde(default)]
    inner: Vec<RawNode>,
}

#[derive(Deserialize)]
struct RawLoc {
    #[serde(default)]
    line: Option<u32>,
    #[serde(default, rename = "spellingLoc")]
    spelling: Option<Box<RawLoc>>,
    #[serde(default, rename = "expansionLoc")]
    expansion: Option<Box<RawLoc>>,
}

#[derive(Deserialize)]
struct RawRange {
    #[serde(default)]
    begin: Option<RawLoc>,
    #[serde(default)]
    end: Option<RawLoc>,
}

/// clang only writes `line` when it differs from the previously written
/// location, so the current line has to be carried through the dump in
/// emission order: `loc`, then `range`, then `inner`.
#[derive(Default)]
struct LineTracker {
    last: u32,
}

impl LineTracker {
    /// Advance past `loc` and return its line. Macro locations resolve to the
    /// expansion site.
    fn see(&mut self, loc: &RawLoc) -> u32 {
        if loc.spelling.is_none() && loc.expansion.is_none() {
            if let Some(line) = loc.line {
                self.last = line;
            }
            return self.last;
        }
        if let Some(spelling) = &loc.spelling {
            self.see(spelling);
        }
        match &loc.expansion {
            Some(expansion) => self.see(expansion),
            None => self.last,
        }
    }
}

fn decl_kind(node: &RawNode) -> Option<DeclKind> {
    match node.kind.as_str() {
        "FunctionDecl" => Some(DeclKind::Function),
        "CXXMethodDecl" => Some(DeclKind::Method),
        "CXXConstructorDecl" => Some(DeclKind::Constructor),
        "EnumDecl" => Some(DeclKind::Enum),
        "CXXRecordDecl" | "RecordDecl" => match node.tag_used.as_deref() {
            Some("class") => Some(DeclKind::Class),
            Some("struct") => Some(DeclKind::Struct),
            _ => None,
        },
        _ => None,
    }
}

fn lower(node: RawNode, lines: &mut LineTracker, out: &mut Vec<DeclNode>) {
    let line = match &node.loc {
        Some(loc) => lines.see(loc),
        None => lines.last,
    };
    if let Some(range) = &node.range {
        for loc in [&range.begin, &range.end].into_iter().flatten() {
            lines.see(loc);
        }
    }

    let kind = decl_kind(&node).filter(|_| !node.is_implicit);
    match (kind, node.name) {
        (Some(kind), Some(name)) => {
            let mut children = Vec::new();
            for child in node.inner {
                lower(child, lines, &mut children);
            }
            out.push(DeclNode {
                name,
                kind: Some(kind),
                line,
                children,
            });
        }
        _ => {
            for child in node.inner {
                lower(child, lines, out);
            }
        }
    }
}

/// Deepest JSON nesting accepted from a dump. Deserializing and lowering
/// both recurse once per level.
const MAX_DUMP_DEPTH: usize = 512;

/// Whether `json` nests objects and arrays deeper than `limit`. Brackets
/// inside strings are skipped.
fn nests_deeper_than(json: &[u8], limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in json {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

/// Lower a JSON AST dump into a [`DeclNode`] tree rooted at `path`.
pub(crate) fn parse_dump(json: &[u8], path: &Path) -> Result<DeclNode, FrontendError> {
    if nests_deeper_than(json, MAX_DUMP_DEPTH) {
        return Err(FrontendError::TooDeep {
            path: path.to_path_buf(),
            limit: MAX_DUMP_DEPTH,
        });
    }

    let mut de = serde_json::Deserializer::from_slice(json);
    // Expression trees in real sources nest deeper than serde's default;
    // the depth is already bounded above.
    de.disable_recursion_limit();
    let raw = RawNode::deserialize(&mut de).map_err(|source| FrontendError::Dump {
        path: path.to_path_buf(),
        source,
    })?;

    let mut children = Vec::new();
    lower(raw, &mut LineTracker::default(), &mut children);
    Ok(DeclNode::root(path.display().to_string(), children))
}
