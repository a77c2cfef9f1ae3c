//! Stable issue identity across runs.
//!
//! A fingerprint is a SHA-256 over `{detector, type, normalized message,
//! relative file path}`. Line and column are excluded: they shift on every
//! unrelated edit. Message normalization lowercases and replaces quoted
//! literals, paths and numbers with placeholders so messages that differ
//! only in interpolated data collapse to one signature.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::Issue;

/// Field separator fed to the hasher so ("ab", "c") and ("a", "bc") differ.
const FIELD_SEP: [u8; 1] = [0x1f];

/// Hex-encoded SHA-256 issue signature.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

struct Normalizers {
    quoted: Regex,
    path: Regex,
    number: Regex,
    whitespace: Regex,
}

fn normalizers() -> &'static Normalizers {
    static NORMALIZERS: OnceLock<Normalizers> = OnceLock::new();
    NORMALIZERS.get_or_init(|| Normalizers {
        quoted: Regex::new(r#"'[^']*'|"[^"]*"|`[^`]*`"#).expect("static regex"),
        path: Regex::new(r"(?:[a-z]:)?(?:[\w.@~-]*[/\\])+[\w.@~-]*").expect("static regex"),
        number: Regex::new(r"\b0x[0-9a-f]+\b|\b\d+(?:\.\d+)*\b").expect("static regex"),
        whitespace: Regex::new(r"\s+").expect("static regex"),
    })
}

/// Lowercase `message` and strip interpolated data.
///
/// ```
/// use odavl_core::fingerprint::normalize_message;
///
/// assert_eq!(
///     normalize_message("Variable 'userId' unused in src/app/user.ts at 42"),
///     "variable <str> unused in <path> at <num>",
/// );
/// ```
pub fn normalize_message(message: &str) -> String {
    let n = normalizers();
    let lowered = message.to_lowercase();
    let out = n.quoted.replace_all(&lowered, "<str>");
    let out = n.path.replace_all(&out, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        if looks_like_path(token) {
            "<path>".to_string()
        } else {
            token.to_string()
        }
    });
    let out = n.number.replace_all(&out, "<num>");
    let out = n.whitespace.replace_all(&out, " ");
    out.trim().to_string()
}

/// Slash-joined prose such as `try/catch` or `and/or` is not a path. A token
/// counts when it is anchored (`/`, `./`, `../`, `~`, a drive letter), has at
/// least two separators, or ends in a file name with an extension.
fn looks_like_path(token: &str) -> bool {
    let bytes = token.as_bytes();
    let anchored = token.starts_with(['/', '\\', '~'])
        || token.starts_with("./")
        || token.starts_with("../")
        || token.starts_with(".\\")
        || (bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':');
    if anchored {
        return true;
    }
    if token.matches(['/', '\\']).count() >= 2 {
        return true;
    }
    let file_name = token.rsplit(['/', '\\']).next().unwrap_or(token);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Derives fingerprints, optionally relative to a workspace root.
#[derive(Debug, Clone, Default)]
pub struct FingerprintEngine {
    root: Option<String>,
}

impl FingerprintEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip `root` from absolute issue paths before hashing.
    ///
    /// A relative root such as `.` is resolved against the current directory
    /// so absolute issue paths under it still match.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let resolved: PathBuf = std::path::absolute(root)
            .unwrap_or_else(|_| root.to_path_buf())
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        let mut prefix = to_forward_slashes(&resolved.to_string_lossy());
        while prefix.ends_with('/') && prefix.len() > 1 {
            prefix.pop();
        }
        Self { root: Some(prefix) }
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.root.as_ref().map(PathBuf::from)
    }

    /// Workspace-relative path with `/` separators and no leading `./`.
    pub fn relative_path(&self, file: &str) -> String {
        let mut path = to_forward_slashes(file.trim());
        if let Some(root) = &self.root {
            if let Some(rest) = path.strip_prefix(root.as_str()) {
                if rest.starts_with('/') {
                    path = rest.trim_start_matches('/').to_string();
                }
            }
        }
        while let Some(rest) = path.strip_prefix("./") {
            path = rest.to_string();
        }
        path
    }

    pub fn fingerprint(&self, issue: &Issue) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(issue.detector.trim().as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(issue.issue_type.trim().as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(normalize_message(&issue.message).as_bytes());
        hasher.update(FIELD_SEP);
        hasher.update(self.relative_path(&issue.file).as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Fingerprint `issue` without a workspace root.
pub fn fingerprint(issue: &Issue) -> Fingerprint {
    FingerprintEngine::default().fingerprint(issue)
}
