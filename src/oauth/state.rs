use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::error;

/// Generate a CSRF state nonce: 128 random bits, base64url without padding.
pub fn generate_state() -> String {
    let bytes = rand::random::<u128>().to_be_bytes();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare a received state against the stored one. An empty stored state
/// (never issued, or already consumed) never matches.
pub fn validate_state(received: &str, expected: &str) -> bool {
    if expected.is_empty() {
        error!("State mismatch: no state was issued or it was already used");
        return false;
    }
    if !constant_time_eq(received, expected) {
        error!("State mismatch in OAuth callback");
        return false;
    }
    true
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_length() {
        // 16 bytes base64url-encoded without padding: ceil(16*4/3) = 22 chars
        assert_eq!(generate_state().len(), 22);
    }

    #[test]
    fn state_uses_url_safe_chars() {
        let state = generate_state();
        for ch in state.chars() {
            assert!(
                ch.is_ascii_alphanumeric() || ch == '-' || ch == '_',
                "Invalid char in state: '{ch}'"
            );
        }
    }

    #[test]
    fn states_are_unique() {
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn validate_matching_state() {
        assert!(validate_state("abc123", "abc123"));
    }

    #[test]
    fn validate_rejects_mismatch() {
        assert!(!validate_state("abc124", "abc123"));
        assert!(!validate_state("abc12", "abc123"));
    }

    #[test]
    fn validate_rejects_when_nothing_stored() {
        assert!(!validate_state("", ""));
        assert!(!validate_state("abc123", ""));
    }
}
