use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::debug;

/// base64url that accepts payloads with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Expiry details derived from a token's claims at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JwtExpInfo {
    /// `exp` claim as seconds since the epoch, if present.
    pub expires_at: Option<i64>,
    /// Percentage of the `iat..exp` window still ahead of now. Never
    /// negative; may exceed 100 when now precedes `iat`.
    pub life_remaining: i64,
}

/// Decode `token` and compute its remaining life against the wall clock.
/// Only the payload's `iat`/`exp` claims are read; the signature is not
/// verified.
pub fn exp_info(token: &str) -> Option<JwtExpInfo> {
    exp_info_at(token, chrono::Utc::now().timestamp())
}

/// Same as [`exp_info`] with an explicit `now` in seconds since the epoch.
pub fn exp_info_at(token: &str, now: i64) -> Option<JwtExpInfo> {
    if token.is_empty() {
        debug!("JWT is empty");
        return None;
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        debug!("Invalid JWT format: expected 3 parts, got {}", parts.len());
        return None;
    }

    let payload = match URL_SAFE_LENIENT.decode(parts[1]) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Failed to decode JWT payload: {e}");
            return None;
        }
    };

    let claims: serde_json::Value = match serde_json::from_slice(&payload) {
        Ok(value) => value,
        Err(e) => {
            debug!("Failed to parse JWT payload: {e}");
            return None;
        }
    };

    let exp = claims.get("exp").and_then(numeric_claim);
    let iat = claims.get("iat").and_then(numeric_claim);
    let life_remaining = life_remaining(iat, exp, now);
    debug!("Token life remaining: {life_remaining}%");

    Some(JwtExpInfo {
        expires_at: exp,
        life_remaining,
    })
}

/// NumericDate claims, accepting float encodings such as `1.7e9`.
fn numeric_claim(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// `floor((exp - now) / (exp - iat) * 100)`, floored at zero. Missing
/// claims or an empty window yield zero.
pub fn life_remaining(iat: Option<i64>, exp: Option<i64>, now: i64) -> i64 {
    match (iat, exp) {
        (Some(iat), Some(exp)) if exp > iat => {
            // i128 keeps extreme claims from overflowing
            let ahead = i128::from(exp) - i128::from(now);
            let window = i128::from(exp) - i128::from(iat);
            let remaining = ahead as f64 / window as f64 * 100.0;
            (remaining.floor() as i64).max(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE;
    use serde_json::json;

    use super::*;

    #[test]
    fn half_life_remaining() {
        let token = encode_test_token(&json!({"iat": 1000, "exp": 2000}));
        let info = exp_info_at(&token, 1500).unwrap();
        assert_eq!(info.expires_at, Some(2000));
        assert_eq!(info.life_remaining, 50);
    }

    #[test]
    fn result_is_floored() {
        // 2/3 of the window left: 66.66..% floors to 66
        assert_eq!(life_remaining(Some(0), Some(3), 1), 66);
    }

    #[test]
    fn expired_token_floors_at_zero() {
        assert_eq!(life_remaining(Some(1000), Some(2000), 5000), 0);
    }

    #[test]
    fn before_issue_time_exceeds_hundred() {
        assert_eq!(life_remaining(Some(1000), Some(2000), 500), 150);
    }

    #[test]
    fn missing_or_inverted_claims_yield_zero() {
        assert_eq!(life_remaining(None, Some(2000), 1500), 0);
        assert_eq!(life_remaining(Some(1000), None, 1500), 0);
        assert_eq!(life_remaining(Some(2000), Some(2000), 1500), 0);
        assert_eq!(life_remaining(Some(3000), Some(2000), 1500), 0);
    }

    #[test]
    fn missing_exp_reports_no_expiry() {
        let token = encode_test_token(&json!({"iat": 1000}));
        let info = exp_info_at(&token, 1500).unwrap();
        assert_eq!(info.expires_at, None);
        assert_eq!(info.life_remaining, 0);
    }

    #[test]
    fn strictly_decreases_inside_window() {
        let (iat, exp) = (1_000, 1_000 + 400);
        let mut previous = i64::MAX;
        for now in (iat + 1..exp).step_by(4) {
            let life = life_remaining(Some(iat), Some(exp), now);
            assert!((0..=100).contains(&life), "now={now} life={life}");
            assert!(life < previous, "now={now} life={life} previous={previous}");
            previous = life;
        }
    }

    #[test]
    fn padded_payload_accepted() {
        let header = URL_SAFE.encode(b"{}");
        let payload = URL_SAFE.encode(br#"{"iat":1,"exp":101}"#);
        let token = format!("{header}.{payload}.sig");
        assert!(payload.ends_with('='));
        assert_eq!(exp_info_at(&token, 51).unwrap().life_remaining, 50);
    }

    #[test]
    fn extreme_claims_do_not_overflow() {
        let token = encode_test_token(&json!({"iat": -1, "exp": i64::MAX}));
        let info = exp_info_at(&token, 1_700_000_000).unwrap();
        assert_eq!(info.expires_at, Some(i64::MAX));
        assert_eq!(info.life_remaining, 99);

        assert_eq!(life_remaining(Some(i64::MIN), Some(i64::MAX), 0), 50);
        assert_eq!(life_remaining(Some(0), Some(1), i64::MIN), i64::MAX);
        assert_eq!(life_remaining(Some(0), Some(1), i64::MAX), 0);
    }

    #[test]
    fn float_encoded_claims_accepted() {
        let token = encode_test_token(&json!({"iat": 1.0e3, "exp": 2.0e3}));
        let info = exp_info_at(&token, 1500).unwrap();
        assert_eq!(info.expires_at, Some(2000));
        assert_eq!(info.life_remaining, 50);
    }

    #[test]
    fn malformed_tokens_yield_none() {
        assert!(exp_info_at("", 0).is_none());
        assert!(exp_info_at("only.two", 0).is_none());
        assert!(exp_info_at("a.b.c.d", 0).is_none());
        assert!(exp_info_at("a.!!!notbase64!!!.c", 0).is_none());

        let not_json = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("plain text");
        assert!(exp_info_at(&format!("a.{not_json}.c"), 0).is_none());
    }
}
