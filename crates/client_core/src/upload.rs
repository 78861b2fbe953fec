//! Acceptance rules for the image picked by the user.

use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// A file offered by the user before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageCandidate {
    pub fn new(file_name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no file was provided")]
    NoFile,
    #[error("only one image can be analyzed at a time ({0} files were provided)")]
    TooManyFiles(usize),
    #[error("unsupported file type '{0}'; use a JPEG, PNG or WEBP image")]
    UnsupportedType(String),
    #[error("file is {size} bytes, larger than the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("file is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub accepted_mime_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|mime| mime.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Accepts exactly one file from a drop or picker selection.
    pub fn accept(&self, mut files: Vec<ImageCandidate>) -> Result<ImageCandidate, ValidationError> {
        match files.len() {
            0 => Err(ValidationError::NoFile),
            1 => {
                let candidate = files.remove(0);
                self.validate(&candidate)?;
                Ok(candidate)
            }
            n => Err(ValidationError::TooManyFiles(n)),
        }
    }

    pub fn validate(&self, candidate: &ImageCandidate) -> Result<(), ValidationError> {
        let mime = candidate
            .mime_type
            .as_deref()
            .map(|mime| mime.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !self.is_accepted_type(&mime) {
            let shown = if mime.is_empty() { "unknown".to_string() } else { mime };
            return Err(ValidationError::UnsupportedType(shown));
        }

        let size = candidate.size();
        if size == 0 {
            return Err(ValidationError::Empty);
        }
        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    fn is_accepted_type(&self, mime: &str) -> bool {
        !mime.is_empty()
            && self
                .accepted_mime_types
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(mime: Option<&str>, size: usize) -> ImageCandidate {
        ImageCandidate::new("leaf", mime.map(str::to_string), vec![7; size])
    }

    #[test]
    fn accepts_supported_types_up_to_the_limit() {
        let policy = UploadPolicy::default().with_max_bytes(100);
        for mime in ["image/jpeg", "image/png", "IMAGE/WEBP"] {
            assert!(policy.validate(&candidate(Some(mime), 100)).is_ok(), "{mime}");
        }
        assert_eq!(
            policy.validate(&candidate(Some("image/png"), 101)),
            Err(ValidationError::TooLarge { size: 101, max: 100 })
        );
    }

    #[test]
    fn rejects_missing_or_foreign_types_and_empty_files() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.validate(&candidate(None, 10)),
            Err(ValidationError::UnsupportedType("unknown".into()))
        );
        assert_eq!(
            policy.validate(&candidate(Some("image/gif"), 10)),
            Err(ValidationError::UnsupportedType("image/gif".into()))
        );
        assert_eq!(
            policy.validate(&candidate(Some("image/jpeg"), 0)),
            Err(ValidationError::Empty)
        );
    }

    #[test]
    fn accept_requires_exactly_one_file() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.accept(Vec::new()), Err(ValidationError::NoFile));
        assert_eq!(
            policy.accept(vec![candidate(Some("image/png"), 1); 3]),
            Err(ValidationError::TooManyFiles(3))
        );
        let accepted = policy
            .accept(vec![candidate(Some("image/png"), 1)])
            .expect("single file");
        assert_eq!(accepted.file_name, "leaf");
    }
}
