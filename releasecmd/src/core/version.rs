//! Version string grammar (PEP 440) and tag naming.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder substituted by [`render_tag`].
pub const VERSION_PLACEHOLDER: &str = "{version}";
/// Default tag template (`1.2.3` -> `v1.2.3`).
pub const DEFAULT_TAG_TEMPLATE: &str = "v{version}";

static PEP440_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^
        v?
        (?:[0-9]+!)?
        [0-9]+(?:\.[0-9]+)*
        (?:[-_.]?(?:alpha|a|beta|b|preview|pre|c|rc)[-_.]?[0-9]*)?
        (?:-[0-9]+|[-_.]?(?:post|rev|r)[-_.]?[0-9]*)?
        (?:[-_.]?dev[-_.]?[0-9]*)?
        (?:\+[a-z0-9]+(?:[-_.][a-z0-9]+)*)?
        $",
    )
    .unwrap()
});

/// True when `version` is a valid PEP 440 version string.
pub fn is_valid_version(version: &str) -> bool {
    PEP440_RE.is_match(version)
}

/// Render a tag name from `template` by substituting [`VERSION_PLACEHOLDER`].
pub fn render_tag(template: &str, version: &str) -> String {
    template.replace(VERSION_PLACEHOLDER, version)
}
