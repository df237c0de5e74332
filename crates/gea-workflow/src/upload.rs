//! Upload validation: allowed file types, size cap and safe stored names

use crate::{WorkflowError, WorkflowResult};
use uuid::Uuid;

/// Accepted upload extensions (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "png", "jpg", "jpeg", "gif",
];

/// 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Lowercased extension of `filename`, if any
pub fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reduce a client-supplied name to a safe single path component
///
/// Directory parts are dropped; anything outside `[A-Za-z0-9._-]` becomes
/// `_`; leading dots are stripped.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Validate an upload and return its sanitized name
pub fn validate(filename: &str, size: u64, max_bytes: u64) -> WorkflowResult<String> {
    let sanitized = sanitize_filename(filename);
    if sanitized.is_empty() {
        return Err(WorkflowError::InvalidInput("empty file name".to_string()));
    }
    if !is_allowed(&sanitized) {
        return Err(WorkflowError::FileTypeNotAllowed(filename.to_string()));
    }
    if size > max_bytes {
        return Err(WorkflowError::FileTooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(sanitized)
}

/// Name on disk: `{uuid}_{sanitized}`
pub fn stored_name(sanitized: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions_case_insensitive() {
        assert!(is_allowed("report.PDF"));
        assert!(is_allowed("scan.jpeg"));
        assert!(!is_allowed("script.exe"));
        assert!(!is_allowed("noext"));
        assert!(!is_allowed(".pdf"));
    }

    #[test]
    fn test_sanitize_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\My File (1).pdf"), "My_File__1_.pdf");
        assert_eq!(sanitize_filename("..hidden.pdf"), "hidden.pdf");
    }

    #[test]
    fn test_validate_limits() {
        assert_eq!(validate("plan.docx", 10, 100).unwrap(), "plan.docx");
        assert!(matches!(
            validate("plan.docx", 101, 100),
            Err(WorkflowError::FileTooLarge { size: 101, limit: 100 })
        ));
        assert!(matches!(
            validate("plan.sh", 1, 100),
            Err(WorkflowError::FileTypeNotAllowed(_))
        ));
        assert!(validate("/", 1, 100).is_err());
    }

    #[test]
    fn test_stored_name_keeps_sanitized_suffix() {
        let name = stored_name("plan.docx");
        assert!(name.ends_with("_plan.docx"));
        assert_eq!(name.len(), 32 + 1 + "plan.docx".len());
    }
}
