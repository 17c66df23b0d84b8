//! The instructions file.

use crate::error::StartupError;
use rootcause::Report;
use std::path::Path;
use std::sync::Arc;

/// System prompt text read once at startup.
///
/// Cloning shares the same text; it never changes after loading.
#[derive(Debug, Clone)]
pub struct Instructions(Arc<str>);

impl Instructions {
    /// Reads and trims the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not valid UTF-8.
    pub async fn load(path: &Path) -> Result<Self, Report<StartupError>> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StartupError::Instructions {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_text(&text))
    }

    /// Builds instructions from text already in memory.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self(Arc::from(text.trim()))
    }

    /// Returns the instructions text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_and_trims() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n  You route support requests.  \n").unwrap();

        let instructions = Instructions::load(file.path()).await.unwrap();

        assert_eq!(instructions.as_str(), "You route support requests.");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instructions.txt");

        let err = Instructions::load(&path).await.unwrap_err();

        assert!(err.to_string().contains("instructions.txt"));
    }

    #[test]
    fn clones_share_text() {
        let a = Instructions::from_text("be brief");
        let b = a.clone();
        assert!(std::ptr::eq(a.as_str(), b.as_str()));
    }
}
