use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The write primitive: replace a whole file with verified before-text.
///
/// Every mutation pass ends in one of these. The new content is computed in
/// memory from what was read; on write the file must still hold exactly that
/// text, otherwise someone else changed it in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "FileWrite does nothing until apply() is called"]
pub struct FileWrite {
    /// Path to the file (absolute, validated by the workspace guard)
    pub file: PathBuf,
    /// Full new content
    pub new_content: String,
    /// What we expect to find before writing
    pub expected_before: EditVerification,
}

/// Verification strategy for write safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large files)
    Hash(u64),
    /// The file must not exist yet
    Absent,
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
            EditVerification::Absent => false,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("File changed since it was read: {file}")]
    BeforeTextMismatch { file: PathBuf },

    #[error("File appeared since it was planned: {file}")]
    UnexpectedFile { file: PathBuf },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result of applying a write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "WriteResult should be checked for written/unchanged"]
pub enum WriteResult {
    /// The file now holds the new content
    Written { file: PathBuf, bytes: usize },
    /// The file already held the new content
    Unchanged { file: PathBuf },
}

impl FileWrite {
    /// Replace `file`, which was read as `before`, with `new_content`.
    pub fn new(file: impl Into<PathBuf>, new_content: impl Into<String>, before: &str) -> Self {
        Self {
            file: file.into(),
            new_content: new_content.into(),
            expected_before: EditVerification::from_text(before),
        }
    }

    /// Create `file`, which must not exist yet.
    pub fn create(file: impl Into<PathBuf>, new_content: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            new_content: new_content.into(),
            expected_before: EditVerification::Absent,
        }
    }

    /// Check the file on disk against the expected before-text.
    ///
    /// Returns `true` when the file already holds the new content.
    fn verify(&self) -> Result<bool, EditError> {
        if self.expected_before == EditVerification::Absent {
            return match fs::read(&self.file) {
                Ok(bytes) if bytes == self.new_content.as_bytes() => Ok(true),
                Ok(_) => Err(EditError::UnexpectedFile {
                    file: self.file.clone(),
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            };
        }

        let current = String::from_utf8(fs::read(&self.file)?)?;
        if current == self.new_content {
            return Ok(true);
        }
        if !self.expected_before.matches(&current) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
            });
        }
        Ok(false)
    }

    /// Apply this write atomically.
    ///
    /// Uses tempfile + fsync + rename for crash safety.
    pub fn apply(&self) -> Result<WriteResult, EditError> {
        if self.verify()? {
            return Ok(WriteResult::Unchanged {
                file: self.file.clone(),
            });
        }
        self.write()
    }

    fn write(&self) -> Result<WriteResult, EditError> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&self.file, self.new_content.as_bytes())?;

        // Bump mtime so dev servers and bundlers pick the change up
        filetime::set_file_mtime(&self.file, filetime::FileTime::now())?;

        Ok(WriteResult::Written {
            file: self.file.clone(),
            bytes: self.new_content.len(),
        })
    }

    /// Apply several writes: every file is verified before any is written.
    pub fn apply_all(writes: &[FileWrite]) -> Result<Vec<WriteResult>, EditError> {
        let mut unchanged = Vec::with_capacity(writes.len());
        for write in writes {
            unchanged.push(write.verify()?);
        }

        writes
            .iter()
            .zip(unchanged)
            .map(|(write, unchanged)| {
                if unchanged {
                    Ok(WriteResult::Unchanged {
                        file: write.file.clone(),
                    })
                } else {
                    write.write()
                }
            })
            .collect()
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
