//! Upload validation, applied before any quota is claimed or byte stored.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Filename has no extension")]
    MissingExtension,

    #[error("File type '{0}' is not supported")]
    InvalidExtension(String),

    #[error("File size {size} bytes exceeds the maximum of {max} bytes")]
    FileTooLarge { size: u64, max: u64 },
}

/// A validated upload: sanitized filename, lowercase extension, and the
/// content type we will record for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    pub filename: String,
    pub extension: String,
    pub content_type: &'static str,
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Strip path components and control characters from a client-supplied
/// filename. Only the basename survives.
fn sanitize_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    basename
        .chars()
        .filter(|c| !c.is_control())
        .take(255)
        .collect()
}

pub fn validate_upload(
    filename: &str,
    size: u64,
    allowed_extensions: &[String],
    max_size: u64,
) -> Result<ValidatedUpload, ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if size > max_size {
        return Err(ValidationError::FileTooLarge { size, max: max_size });
    }

    let filename = sanitize_filename(filename);
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
        .ok_or(ValidationError::MissingExtension)?;

    if !allowed_extensions.iter().any(|e| e == &extension) {
        return Err(ValidationError::InvalidExtension(extension));
    }

    let content_type = content_type_for(&extension);
    Ok(ValidatedUpload {
        filename,
        extension,
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["mp4".to_string(), "mov".to_string(), "webm".to_string()]
    }

    #[test]
    fn test_valid_upload() {
        let v = validate_upload("Holiday Video.MP4", 1024, &allowed(), 10_000).unwrap();
        assert_eq!(v.extension, "mp4");
        assert_eq!(v.content_type, "video/mp4");
        assert_eq!(v.filename, "Holiday Video.MP4");
    }

    #[test]
    fn test_empty_file_rejected() {
        assert_eq!(
            validate_upload("a.mp4", 0, &allowed(), 10_000),
            Err(ValidationError::EmptyFile)
        );
    }

    #[test]
    fn test_too_large_rejected() {
        assert_eq!(
            validate_upload("a.mp4", 10_001, &allowed(), 10_000),
            Err(ValidationError::FileTooLarge {
                size: 10_001,
                max: 10_000
            })
        );
    }

    #[test]
    fn test_bad_extension_rejected() {
        assert_eq!(
            validate_upload("a.exe", 10, &allowed(), 10_000),
            Err(ValidationError::InvalidExtension("exe".to_string()))
        );
        assert_eq!(
            validate_upload("noext", 10, &allowed(), 10_000),
            Err(ValidationError::MissingExtension)
        );
    }

    #[test]
    fn test_filename_sanitized() {
        let v = validate_upload("../../etc/evil.mp4", 10, &allowed(), 10_000).unwrap();
        assert_eq!(v.filename, "evil.mp4");

        let v = validate_upload("C:\\Users\\me\\clip.mov", 10, &allowed(), 10_000).unwrap();
        assert_eq!(v.filename, "clip.mov");
    }
}
