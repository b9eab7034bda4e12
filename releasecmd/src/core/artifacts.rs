//! File-name matching for built distribution artifacts.

use regex::Regex;

/// Matches artifact file names for one version.
///
/// Names look like `<project>-<version>[suffix].(tar.gz|whl)[.asc]`. The version
/// is matched literally, so `1.2.3` never matches `1x2x3`.
#[derive(Debug, Clone)]
pub struct ArtifactMatcher {
    upload: Regex,
    signable: Regex,
}

impl ArtifactMatcher {
    pub fn new(version: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(version);
        let upload = Regex::new(&format!(r"^.+-{escaped}.*(\.tar\.gz|\.whl)(\.asc)?$"))?;
        let signable = Regex::new(&format!(r"^.+-{escaped}.*(\.tar\.gz|\.whl)$"))?;
        Ok(Self { upload, signable })
    }

    /// Package or detached signature to upload.
    pub fn is_upload_candidate(&self, file_name: &str) -> bool {
        self.upload.is_match(file_name)
    }

    /// Package that can receive a detached signature (no `.asc` files).
    pub fn is_signable(&self, file_name: &str) -> bool {
        self.signable.is_match(file_name)
    }

    /// Filter `names`, keeping their order.
    pub fn select_uploads<'a, I>(&self, names: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| self.is_upload_candidate(name))
            .collect()
    }
}
