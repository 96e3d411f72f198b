use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 16;

/// Short SHA-256 hex over `parts` joined with `|`. An identity/similarity
/// proxy only.
pub fn fingerprint(parts: &[&str]) -> String {
    let digest = Sha256::digest(parts.join("|").as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(FINGERPRINT_LEN);
    hex
}

pub fn content_hash(text: &str) -> String {
    fingerprint(&[text])
}
