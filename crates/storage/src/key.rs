//! Object key generation.

use uuid::Uuid;

/// Longest extension carried over from the client filename.
const MAX_EXTENSION_LEN: usize = 10;

/// A fresh, collision-free object key that keeps the original extension.
///
/// Client filenames are never used verbatim; only a short alphanumeric
/// extension survives.
pub fn object_key(filename: &str) -> String {
    let id = Uuid::new_v4();
    match extension(filename) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn extension(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_lowercased_extension() {
        let key = object_key("Site Photo.JPG");
        assert!(key.ends_with(".jpg"));
        assert_eq!(key.len(), 36 + 4);
    }

    #[test]
    fn drops_suspicious_extensions() {
        assert_eq!(extension("../../etc/passwd"), None);
        assert_eq!(extension(".bashrc"), None);
        assert_eq!(extension("clip.m p4"), None);
        assert_eq!(extension("C:\\notes\\memo.webm"), Some("webm".to_string()));
    }

    #[test]
    fn keys_are_unique() {
        assert_ne!(object_key("a.pdf"), object_key("a.pdf"));
    }
}
