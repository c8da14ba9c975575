//! Content hashing for change detection.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Hash a source string to a `u64` digest.
///
/// Used for convolution-kernel change detection: two sources hash equal
/// iff their text is identical, so editing a kernel (even a comment)
/// produces a new digest and triggers probe invalidation.
#[must_use]
pub fn content_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sources_hash_equal() {
        assert_eq!(content_hash("fn main() {}"), content_hash("fn main() {}"));
    }

    #[test]
    fn edited_source_changes_hash() {
        let a = content_hash("let x = 1.0;");
        let b = content_hash("let x = 2.0;");
        assert_ne!(a, b);
    }
}
