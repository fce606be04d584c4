//! Local image path resolution for listing uploads.

use crate::taxonomy::IMAGE_EXTENSIONS;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Expands `~`-relative paths and canonicalizes each entry. A path that
/// does not land on an existing regular file is dropped from the result
/// and reported as a warning — a missing file cannot be uploaded, so
/// keeping it would only fail later in the browser.
pub fn resolve_paths(paths: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let mut resolved = Vec::new();
    let mut warnings = Vec::new();

    for raw in paths {
        let expanded = expand_home(raw);
        match std::fs::canonicalize(&expanded) {
            Ok(canonical) if canonical.is_file() => resolved.push(canonical),
            _ => warnings.push(format!("Image file not found: {raw}")),
        }
    }

    (resolved, warnings)
}

/// Strict mode: any resolved path with an extension outside the accepted
/// image set is a hard error.
pub fn enforce_formats(paths: &[PathBuf]) -> Result<(), ImageError> {
    for path in paths {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ImageError::UnsupportedFormat(path.display().to_string()));
        }
    }
    Ok(())
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_files_resolve_to_canonical_paths() {
        let file = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile()
            .expect("temp file");
        let raw = file.path().display().to_string();

        let (resolved, warnings) = resolve_paths(&[raw]);
        assert_eq!(resolved.len(), 1);
        assert!(warnings.is_empty());
        assert!(resolved[0].is_absolute());
    }

    #[test]
    fn missing_files_are_dropped_with_a_warning() {
        let file = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile()
            .expect("temp file");
        let present = file.path().display().to_string();
        let absent = "/no/such/photo.jpg".to_string();

        let (resolved, warnings) = resolve_paths(&[absent.clone(), present]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains(&absent));
    }

    #[test]
    fn directories_do_not_count_as_images() {
        let dir = tempfile::tempdir().expect("temp dir");
        let raw = dir.path().display().to_string();
        let (resolved, warnings) = resolve_paths(&[raw]);
        assert!(resolved.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn strict_mode_rejects_foreign_extensions() {
        let ok = PathBuf::from("/photos/front.JPG");
        let bad = PathBuf::from("/photos/notes.pdf");
        assert!(enforce_formats(std::slice::from_ref(&ok)).is_ok());
        let err = enforce_formats(&[ok, bad]).unwrap_err();
        assert!(err.to_string().contains("notes.pdf"));
    }
}
