use crate::TransferError;

/// Validates a vault-relative destination path.
///
/// Vault paths always use `/` as separator, independent of the local
/// platform. Rejects:
/// - Empty paths and paths ending in `/`
/// - Absolute paths (`/x`, `C:/x`)
/// - Backslashes
/// - `.` / `..` segments and empty segments (`a//b`)
/// - Control characters
pub fn validate_vault_path(path: &str) -> Result<(), TransferError> {
    if path.is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }
    if path.starts_with('/') {
        return Err(TransferError::InvalidPath(format!(
            "absolute path not allowed: {path}"
        )));
    }
    if path.contains('\\') {
        return Err(TransferError::InvalidPath(format!(
            "backslash not allowed: {path}"
        )));
    }
    if path.chars().any(char::is_control) {
        return Err(TransferError::InvalidPath(format!(
            "control character not allowed: {path:?}"
        )));
    }

    for (i, segment) in path.split('/').enumerate() {
        match segment {
            "" => {
                return Err(TransferError::InvalidPath(format!(
                    "empty path segment: {path}"
                )));
            }
            "." | ".." => {
                return Err(TransferError::InvalidPath(format!(
                    "relative segment not allowed: {path}"
                )));
            }
            s if i == 0 && s.len() == 2 && s.ends_with(':') => {
                return Err(TransferError::InvalidPath(format!(
                    "drive prefix not allowed: {path}"
                )));
            }
            _ => {}
        }
    }

    Ok(())
}
