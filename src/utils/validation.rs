//! Validation of client-supplied upload names and sizes.

/// Security-related constants for input validation
pub const MAX_FILENAME_LENGTH: usize = 255;
pub const MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024; // 16MB

/// Security validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Filename too long: exceeds {MAX_FILENAME_LENGTH} characters")]
    FilenameTooLong,
    #[error("Invalid filename: contains path traversal or invalid characters")]
    InvalidFilename,
    #[error("Empty filename provided")]
    EmptyFilename,
    #[error("Upload of {0} bytes exceeds the {MAX_UPLOAD_SIZE} byte limit")]
    UploadTooLarge(usize),
}

/// Secure filename validation to prevent directory traversal and other attacks
///
/// Validates and sanitizes filenames by:
/// - Checking length limits
/// - Preventing directory traversal (../, ..\\)
/// - Removing potentially dangerous characters
/// - Ensuring filename is not empty after sanitization
///
/// The result is only ever matched against name tables; it is never opened.
///
/// # Errors
///
/// Returns `ValidationError::EmptyFilename` if the filename is empty,
/// `ValidationError::FilenameTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidFilename` if it contains invalid characters.
pub fn validate_filename(filename: &str) -> Result<String, ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    if filename.len() > MAX_FILENAME_LENGTH {
        return Err(ValidationError::FilenameTooLong);
    }

    // Prevent directory traversal attacks
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(ValidationError::InvalidFilename);
    }

    // Null bytes and other control characters
    if filename.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFilename);
    }

    // Keep only characters that can appear in extension and glob tables
    let sanitized = filename
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '+' | '~')
        })
        .collect::<String>();

    if sanitized.trim().trim_matches('.').is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    Ok(sanitized)
}

/// Validate an upload's optional filename and its size
///
/// Empty content is accepted: it classifies as empty rather than failing.
///
/// # Errors
///
/// Returns `ValidationError::UploadTooLarge` if the content exceeds
/// [`MAX_UPLOAD_SIZE`], or a filename error from [`validate_filename`].
pub fn validate_upload(
    filename: Option<&str>,
    content: &[u8],
) -> Result<Option<String>, ValidationError> {
    if content.len() > MAX_UPLOAD_SIZE {
        return Err(ValidationError::UploadTooLarge(content.len()));
    }
    filename.map(validate_filename).transpose()
}
