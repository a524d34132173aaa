//! Player and club tags.
//!
//! The game prints tags as `#` followed by upper-case alphanumerics. Users
//! type them with or without the marker and in any case, so every tag entering
//! the system goes through [`normalize`] before it is stored or compared.

use crate::shared::AppError;

pub const TAG_MARKER: char = '#';

/// Longest tag body the store accepts (the column holds 15 chars with the marker).
const MAX_TAG_LEN: usize = 14;

/// Canonical `#XXXXXXXX` form of a raw tag.
pub fn normalize(raw: &str) -> Result<String, AppError> {
    let body = bare(raw.trim()).to_ascii_uppercase();

    if body.is_empty() || body.len() > MAX_TAG_LEN {
        return Err(AppError::InvalidTag(raw.to_string()));
    }
    if !body.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidTag(raw.to_string()));
    }

    Ok(format!("{TAG_MARKER}{body}"))
}

/// Tag without its leading marker.
pub fn bare(tag: &str) -> &str {
    tag.strip_prefix(TAG_MARKER).unwrap_or(tag)
}

/// Tag as a URL path segment, with the marker percent-encoded.
pub fn path_segment(tag: &str) -> String {
    format!("%23{}", bare(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_marker_and_uppercases() {
        assert_eq!(normalize("2rqryv0l").unwrap(), "#2RQRYV0L");
        assert_eq!(normalize("#9090YYGQ").unwrap(), "#9090YYGQ");
        assert_eq!(normalize("  #p0gvgvrp ").unwrap(), "#P0GVGVRP");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(normalize(""), Err(AppError::InvalidTag(_))));
        assert!(matches!(normalize("#"), Err(AppError::InvalidTag(_))));
        assert!(matches!(normalize("#AB-CD"), Err(AppError::InvalidTag(_))));
        assert!(matches!(
            normalize("#ABCDEFGHIJKLMNOP"),
            Err(AppError::InvalidTag(_))
        ));
    }

    #[test]
    fn encodes_marker_in_paths() {
        assert_eq!(path_segment("#2RQRYV0L"), "%232RQRYV0L");
        assert_eq!(path_segment("2RQRYV0L"), "%232RQRYV0L");
    }
}
