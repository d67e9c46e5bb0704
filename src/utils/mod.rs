//! Shared helpers: file writes, content digests and name suggestions.

pub mod fs;

use sha2::{Digest, Sha256};
use strsim::levenshtein;

use crate::constants::SIMILARITY_THRESHOLD_PERCENT;

/// Compute a `sha256:<hex>` digest of some bytes.
///
/// ```rust
/// use stacksynth::utils::sha256_digest;
///
/// let digest = sha256_digest(b"");
/// assert_eq!(digest, "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
/// ```
#[must_use]
pub fn sha256_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Find up to three names close to `target`, closest first.
///
/// Used for "did you mean" suggestions on unknown node ids, attributes and
/// variable names. Candidates further than half the target's length are
/// dropped.
pub fn similar_names<'a, I>(target: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut scored: Vec<(&String, usize)> = candidates
        .into_iter()
        .map(|candidate| (candidate, levenshtein(target, candidate)))
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .collect();

    // Stable sort keeps candidate order for equal distances
    scored.sort_by_key(|(_, distance)| *distance);
    scored.into_iter().take(3).map(|(name, _)| name.clone()).collect()
}
