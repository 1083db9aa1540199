use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{de::IgnoredAny, Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of the `exp` claim.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// The only algorithm a token may be signed with.
const ALLOWED_ALGORITHM: Algorithm = Algorithm::HS256;

/// Reasons a token is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// Not a structurally valid JWT.
    #[error("malformed token")]
    Malformed,

    /// The header declares an algorithm outside the allow-list.
    #[error("token algorithm not allowed")]
    AlgorithmNotAllowed,

    /// Signature does not verify under the current secret.
    #[error("bad token signature")]
    BadSignature,

    /// The `exp` claim is in the past.
    #[error("token expired")]
    Expired,

    /// `sub` or `exp` is missing or not an integer.
    #[error("malformed token claims")]
    MalformedClaims,
}

/// Claims written on issue.
#[derive(Debug, Serialize)]
struct IssuedClaims {
    sub: i64,
    exp: i64,
}

/// Claims read on parse. Both fields tolerate several encodings.
#[derive(Debug, Deserialize)]
struct ReceivedClaims {
    #[serde(default)]
    sub: Option<NumericClaim>,
    #[serde(default)]
    exp: Option<NumericClaim>,
}

/// A numeric claim as it may appear on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericClaim {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl NumericClaim {
    /// Normalises to `i64`. Floats must be integral and in range, strings
    /// must be decimal integers.
    fn to_i64(&self) -> Option<i64> {
        match self {
            NumericClaim::Int(value) => Some(*value),
            NumericClaim::Float(value) => {
                let in_range = value.is_finite()
                    && value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64;
                in_range.then_some(*value as i64)
            }
            NumericClaim::Text(value) => value.trim().parse().ok(),
            NumericClaim::Other(_) => None,
        }
    }
}

/// Issues and verifies stateless session tokens.
///
/// A token is an HS256 JWT carrying exactly two claims: `sub` (the user id)
/// and `exp` (absolute expiry, seconds since the epoch). The secret is fixed
/// at construction, so rotating it invalidates every token issued before.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Creates a codec bound to `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(ALLOWED_ALGORITHM);
        validation.algorithms = vec![ALLOWED_ALGORITHM];
        // Expiry and subject are checked after normalisation in `parse_at`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::days(TOKEN_TTL_DAYS),
        }
    }

    /// Issues a token for `user_id` that expires [`TOKEN_TTL_DAYS`] from now.
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = IssuedClaims {
            sub: user_id,
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(ALLOWED_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies a token and returns the user id it was issued for.
    pub fn parse(&self, token: &str) -> Result<i64, TokenError> {
        self.parse_at(token, Utc::now())
    }

    /// Verifies a token against the clock value `now`.
    pub fn parse_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != ALLOWED_ALGORITHM {
            return Err(TokenError::AlgorithmNotAllowed);
        }

        // The header is sound, so a JSON failure past this point is the payload.
        let claims = decode::<ReceivedClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::AlgorithmNotAllowed
                }
                ErrorKind::Json(_) => TokenError::MalformedClaims,
                _ => TokenError::Malformed,
            })?
            .claims;

        let expires_at = claims
            .exp
            .as_ref()
            .and_then(NumericClaim::to_i64)
            .ok_or(TokenError::MalformedClaims)?;
        if now.timestamp() > expires_at {
            return Err(TokenError::Expired);
        }

        claims
            .sub
            .as_ref()
            .and_then(NumericClaim::to_i64)
            .ok_or(TokenError::MalformedClaims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &[u8] = b"test-secret-please-ignore";

    fn sign_raw(claims: serde_json::Value, alg: Algorithm, secret: &[u8]) -> String {
        encode(&Header::new(alg), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn in_a_day() -> i64 {
        (Utc::now() + Duration::days(1)).timestamp()
    }

    #[test]
    fn issued_token_round_trips() {
        let codec = TokenCodec::new(SECRET);
        let token = codec.issue(42).unwrap();
        assert_eq!(codec.parse(&token), Ok(42));
    }

    #[test]
    fn issued_token_expires_after_seven_days() {
        let codec = TokenCodec::new(SECRET);
        let issued = Utc::now();
        let token = codec.issue_at(7, issued).unwrap();

        let just_before = issued + Duration::days(TOKEN_TTL_DAYS) - Duration::seconds(1);
        assert_eq!(codec.parse_at(&token, just_before), Ok(7));

        let just_after = issued + Duration::days(TOKEN_TTL_DAYS) + Duration::seconds(1);
        assert_eq!(codec.parse_at(&token, just_after), Err(TokenError::Expired));
    }

    #[test]
    fn expired_token_is_rejected_even_with_valid_signature() {
        let codec = TokenCodec::new(SECRET);
        let token = codec
            .issue_at(1, Utc::now() - Duration::days(TOKEN_TTL_DAYS + 1))
            .unwrap();
        assert_eq!(codec.parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let old = TokenCodec::new(b"previous-secret");
        let current = TokenCodec::new(SECRET);
        let token = old.issue(1).unwrap();
        assert_eq!(current.parse(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn other_algorithm_is_rejected_even_with_the_right_secret() {
        let codec = TokenCodec::new(SECRET);
        let token = sign_raw(json!({"sub": 1, "exp": in_a_day()}), Algorithm::HS512, SECRET);
        assert_eq!(codec.parse(&token), Err(TokenError::AlgorithmNotAllowed));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        // {"alg":"none","typ":"JWT"}.{"sub":1,"exp":9999999999}.
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJzdWIiOjEsImV4cCI6OTk5OTk5OTk5OX0.";
        assert!(codec.parse(token).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = TokenCodec::new(SECRET);
        assert_eq!(codec.parse("not.a.token"), Err(TokenError::Malformed));
        assert_eq!(codec.parse(""), Err(TokenError::Malformed));
    }

    #[test]
    fn string_and_float_claims_are_normalised() {
        let codec = TokenCodec::new(SECRET);
        let exp = in_a_day();

        let as_strings = sign_raw(
            json!({"sub": "15", "exp": exp.to_string()}),
            Algorithm::HS256,
            SECRET,
        );
        assert_eq!(codec.parse(&as_strings), Ok(15));

        let as_floats = sign_raw(
            json!({"sub": 16.0, "exp": exp as f64}),
            Algorithm::HS256,
            SECRET,
        );
        assert_eq!(codec.parse(&as_floats), Ok(16));
    }

    #[test]
    fn expired_string_claim_is_still_expired() {
        let codec = TokenCodec::new(SECRET);
        let past = (Utc::now() - Duration::hours(1)).timestamp().to_string();
        let token = sign_raw(json!({"sub": 3, "exp": past}), Algorithm::HS256, SECRET);
        assert_eq!(codec.parse(&token), Err(TokenError::Expired));
    }

    #[test]
    fn missing_or_unusable_subject_is_malformed() {
        let codec = TokenCodec::new(SECRET);
        let exp = in_a_day();

        let missing = sign_raw(json!({"exp": exp}), Algorithm::HS256, SECRET);
        assert_eq!(codec.parse(&missing), Err(TokenError::MalformedClaims));

        let fractional = sign_raw(json!({"sub": 1.5, "exp": exp}), Algorithm::HS256, SECRET);
        assert_eq!(codec.parse(&fractional), Err(TokenError::MalformedClaims));

        let words = sign_raw(json!({"sub": "alice", "exp": exp}), Algorithm::HS256, SECRET);
        assert_eq!(codec.parse(&words), Err(TokenError::MalformedClaims));

        let object = sign_raw(json!({"sub": {"id": 1}, "exp": exp}), Algorithm::HS256, SECRET);
        assert_eq!(codec.parse(&object), Err(TokenError::MalformedClaims));
    }

    #[test]
    fn object_or_array_claims_are_malformed_claims() {
        let codec = TokenCodec::new(SECRET);
        let exp = in_a_day();

        for claims in [
            json!({"sub": {}, "exp": exp}),
            json!({"sub": [1], "exp": exp}),
            json!({"sub": 1, "exp": {}}),
            json!({"sub": 1, "exp": [exp]}),
        ] {
            let token = sign_raw(claims.clone(), Algorithm::HS256, SECRET);
            assert_eq!(
                codec.parse(&token),
                Err(TokenError::MalformedClaims),
                "claims: {claims}"
            );
        }
    }

    #[test]
    fn structured_claims_under_a_foreign_secret_are_still_bad_signature() {
        let codec = TokenCodec::new(SECRET);
        let token = sign_raw(
            json!({"sub": {"id": 1}, "exp": in_a_day()}),
            Algorithm::HS256,
            b"someone-else",
        );
        assert_eq!(codec.parse(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn missing_expiry_is_malformed() {
        let codec = TokenCodec::new(SECRET);
        let token = sign_raw(json!({"sub": 1}), Algorithm::HS256, SECRET);
        assert_eq!(codec.parse(&token), Err(TokenError::MalformedClaims));
    }
}
