use crate::classifier::ModalCandidate;

pub const SYNTHETIC_ID_PREFIX: &str = "reminder-modal-";

/// Characters of the text excerpt that feed the content hash.
const ID_EXCERPT_CHARS: usize = 100;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Synthetic id for a dialog without a DOM id: a hash over the start of its
/// text, its classes and the shape of its direct children.
pub fn content_id(candidate: &ModalCandidate<'_, '_>) -> String {
    let excerpt: String = candidate
        .facts()
        .excerpt
        .chars()
        .take(ID_EXCERPT_CHARS)
        .collect();
    let classes = candidate.classes().join(" ");

    let mut hash = FNV_OFFSET;
    for part in [
        excerpt.as_str(),
        classes.as_str(),
        candidate.structural_signature(),
    ] {
        hash = fnv1a(hash, part.as_bytes());
        // Field separator so ("ab", "c") and ("a", "bc") differ.
        hash = fnv1a(hash, &[0x1f]);
    }

    format!("{SYNTHETIC_ID_PREFIX}{}", to_base36(hash))
}

fn fnv1a(mut hash: u32, bytes: &[u8]) -> u32 {
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_rendering() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u32::MAX), "1z141z3");
    }

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a(FNV_OFFSET, b""), 0x811c_9dc5);
        assert_eq!(fnv1a(FNV_OFFSET, b"a"), 0xe40c_292c);
    }
}
