/// Why an uploaded filename was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Longer than 255 bytes.
    TooLong,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename is `.` or `..`, or starts with a dot.
    Hidden,
    /// Outside `[A-Za-z0-9._-]`.
    InvalidCharacter,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::TooLong => "Filename must be at most 255 bytes",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::Hidden => "Invalid filename: names starting with '.' are not allowed",
            Self::InvalidCharacter => {
                "Invalid filename: only letters, digits, '.', '_' and '-' are allowed"
            }
        }
    }
}

/// Validates a flat filename that will become the last segment of an object key.
///
/// Returns the trimmed name on success.
pub fn validate_artifact_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }
    if trimmed.len() > 255 {
        return Err(FilenameError::TooLong);
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }
    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(FilenameError::InvalidCharacter);
    }

    Ok(trimmed)
}

/// Whether `filename` names a Makefile (`makefile`, any casing, no extension).
pub fn is_makefile_name(filename: &str) -> bool {
    filename.eq_ignore_ascii_case("makefile")
}

/// Whether a zip entry name would escape the extraction root.
pub fn is_unsafe_entry_path(path: &str) -> bool {
    path.starts_with('/')
        || path.starts_with('\\')
        || path.contains('\0')
        || path.split(['/', '\\']).any(|segment| segment == "..")
        || path.as_bytes().get(1) == Some(&b':')
}
