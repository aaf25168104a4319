//! Multi-encoding source loading.

use std::io::ErrorKind;
use std::path::Path;

use tracing::trace;

use crate::encoding::{decode_bytes, TextEncoding, DEFAULT_ENCODINGS};
use crate::error::LoadError;

/// Load a source file using [`DEFAULT_ENCODINGS`].
pub fn load(path: impl AsRef<Path>) -> Result<String, LoadError> {
    load_with(path, &DEFAULT_ENCODINGS)
}

/// Load a source file, returning the text from the first encoding that decodes it.
///
/// Every attempt reads the file again from the start.
///
/// # Errors
/// - [`LoadError::NotFound`] if `path` does not exist.
/// - [`LoadError::DecodeFailure`] with the last attempt's error if no
///   encoding succeeds (or `encodings` is empty).
/// - [`LoadError::Io`] for any other read failure.
pub fn load_with(path: impl AsRef<Path>, encodings: &[TextEncoding]) -> Result<String, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mut last_failure = None;
    for &encoding in encodings {
        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        match decode_bytes(&bytes, encoding) {
            Ok(text) => {
                trace!(path = %path.display(), %encoding, "decoded source");
                return Ok(text);
            }
            Err(err) => {
                trace!(path = %path.display(), %encoding, error = %err, "decode attempt failed");
                last_failure = Some((encoding, err));
            }
        }
    }

    Err(match last_failure {
        Some((encoding, err)) => LoadError::DecodeFailure {
            path: path.to_path_buf(),
            encoding: Some(encoding.name().to_string()),
            reason: err.to_string(),
        },
        None => LoadError::DecodeFailure {
            path: path.to_path_buf(),
            encoding: None,
            reason: "no encodings configured".to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebcdic::CP037;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_utf8() {
        let file = write_temp(b"PGM\nENDPGM\n");
        assert_eq!(load(file.path()).unwrap(), "PGM\nENDPGM\n");
    }

    #[test]
    fn test_load_falls_through_to_ebcdic() {
        let bytes = CP037.encode("SELECT A FROM T;").unwrap();
        let file = write_temp(&bytes);
        assert_eq!(load(file.path()).unwrap(), "SELECT A FROM T;");
    }

    #[test]
    fn test_load_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("MISSING.clle")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert!(err.to_string().starts_with("file not found: "));
    }

    #[test]
    fn test_decode_failure_reports_last_encoding() {
        let file = write_temp(b"\xFFabc");
        let err = load_with(file.path(), &[TextEncoding::Utf8]).unwrap_err();
        match err {
            LoadError::DecodeFailure { encoding, reason, .. } => {
                assert_eq!(encoding.as_deref(), Some("utf-8"));
                assert!(reason.contains("byte 0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_encoding_list() {
        let file = write_temp(b"abc");
        let err = load_with(file.path(), &[]).unwrap_err();
        assert!(matches!(err, LoadError::DecodeFailure { encoding: None, .. }));
    }

    #[test]
    fn test_order_is_respected() {
        let file = write_temp(&[0xC1]);
        assert_eq!(
            load_with(file.path(), &[TextEncoding::Latin1, TextEncoding::Cp037]).unwrap(),
            "Á"
        );
        assert_eq!(
            load_with(file.path(), &[TextEncoding::Cp037, TextEncoding::Latin1]).unwrap(),
            "A"
        );
    }
}
