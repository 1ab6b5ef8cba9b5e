//! Content-addressed document identity.

use md5::{Digest, Md5};

/// Derive the primary key of a document from its two text fields.
///
/// MD5 over the bytes of `vague` immediately followed by `actual` (no
/// separator), rendered as lowercase hex. These are the ids already present in
/// the shipped ground-truth CSV, so the digest must not change.
pub fn derive_id(vague: &str, actual: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(vague.as_bytes());
    hasher.update(actual.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_calls() {
        let a = derive_id("sync up on the roadmap", "schedule a planning meeting");
        let b = derive_id("sync up on the roadmap", "schedule a planning meeting");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn matches_stored_ingestion_ids() {
        assert_eq!(
            derive_id("sync up on the roadmap", "schedule a planning meeting"),
            "bdd20a85bffde4fc372a21c51dccc8db"
        );
        assert_eq!(derive_id("", ""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(derive_id("a", "bc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn field_order_matters() {
        assert_ne!(derive_id("circle back", "reply later"), derive_id("reply later", "circle back"));
    }

    #[test]
    fn only_the_concatenation_is_hashed() {
        assert_eq!(derive_id("abc", ""), derive_id("", "abc"));
        assert_eq!(derive_id("ab", "c"), derive_id("a", "bc"));
    }
}
