//! Raw module source.

use std::fs;

use tracing::trace;

use crate::error::LoaderError;
use crate::path::ScriptPath;

/// A path plus its text, read once when the asset is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    path: ScriptPath,
    text: String,
}

impl SourceAsset {
    pub fn read(path: ScriptPath) -> Result<Self, LoaderError> {
        let text = fs::read_to_string(path.absolute_path()).map_err(|source| LoaderError::Io {
            path: path.absolute_path().to_path_buf(),
            source,
        })?;
        trace!(path = %path, bytes = text.len(), "read source");
        Ok(Self { path, text })
    }

    /// An asset whose text did not come from disk.
    pub fn from_text(path: ScriptPath, text: impl Into<String>) -> Self {
        Self {
            path,
            text: text.into(),
        }
    }

    pub fn path(&self) -> &ScriptPath {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_parts(self) -> (ScriptPath, String) {
        (self.path, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "export const a = 1;").unwrap();

        let asset = SourceAsset::read(ScriptPath::new(&file)).unwrap();
        assert_eq!(asset.text(), "export const a = 1;");
        assert_eq!(asset.path().basename(), "a.ts");

        let err = SourceAsset::read(ScriptPath::new(dir.path().join("b.ts"))).unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
        assert!(err.to_string().starts_with("failed to read "));
    }
}
