//! Read a string binding out of a declarative version file.
//!
//! Version files such as `__version__.py` are key-value declarations
//! (`__version__ = "1.2.3"`). They are scanned line by line, never executed.

use std::sync::LazyLock;

use regex::Regex;

/// Name bound to the version in declaration files.
pub const VERSION_BINDING: &str = "__version__";

static ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*(?::[^=]*)?=(?P<rhs>[^=].*|)$").unwrap()
});

static STRING_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:"(?P<dq>[^"\\]*)"|'(?P<sq>[^'\\]*)')\s*(?:#.*)?$"#).unwrap()
});

/// A binding exists but cannot be read without evaluating code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: `{name}` is not bound to a plain string literal: {rhs}")]
pub struct UnsupportedBinding {
    pub name: String,
    pub line: usize,
    pub rhs: String,
}

/// Find the value bound to `name` at top level of `source`.
///
/// Returns `Ok(None)` when the name is never bound. The last binding wins.
pub fn find_string_binding(
    source: &str,
    name: &str,
) -> Result<Option<String>, UnsupportedBinding> {
    let mut found = None;
    for (idx, line) in source.lines().enumerate() {
        let Some(caps) = ASSIGNMENT_RE.captures(line.trim_end()) else {
            continue;
        };
        if &caps["name"] != name {
            continue;
        }
        let rhs = &caps["rhs"];
        let Some(literal) = STRING_LITERAL_RE.captures(rhs) else {
            return Err(UnsupportedBinding {
                name: name.to_string(),
                line: idx + 1,
                rhs: rhs.trim().to_string(),
            });
        };
        let value = literal
            .name("dq")
            .or_else(|| literal.name("sq"))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        found = Some(value);
    }
    Ok(found)
}
