use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("invalid expiry spec: {0}")]
    InvalidExpiry(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub exp: i64,
}

/// Parses an expiry spec of the form `<number><unit>` where the unit is one
/// of `s`, `m`, `h`, `d`.
pub fn parse_expiry(spec: &str) -> Result<Duration, JwtError> {
    let (value, unit) = spec.split_at(spec.len().saturating_sub(1));
    let amount: i64 = value
        .parse()
        .map_err(|_| JwtError::InvalidExpiry(spec.to_string()))?;
    if amount < 0 {
        return Err(JwtError::InvalidExpiry(spec.to_string()));
    }
    match unit {
        "s" => Ok(Duration::seconds(amount)),
        "m" => Ok(Duration::minutes(amount)),
        "h" => Ok(Duration::hours(amount)),
        "d" => Ok(Duration::days(amount)),
        _ => Err(JwtError::InvalidExpiry(spec.to_string())),
    }
}

pub fn sign(secret: &str, id: Uuid, email: &str, ttl: Duration) -> Result<String, JwtError> {
    let claims = Claims {
        id,
        email: email.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify(secret: &str, token: &str) -> Result<Claims, JwtError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Reads the claims without checking the signature or expiry. Used to learn
/// when a token being revoked would have expired on its own.
pub fn decode_unverified(token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_specs() {
        assert_eq!(parse_expiry("30s").unwrap(), Duration::seconds(30));
        assert_eq!(parse_expiry("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_expiry("12h").unwrap(), Duration::hours(12));
        assert_eq!(parse_expiry("7d").unwrap(), Duration::days(7));
        assert!(parse_expiry("7w").is_err());
        assert!(parse_expiry("").is_err());
        assert!(parse_expiry("d").is_err());
    }

    #[test]
    fn sign_verify_roundtrip() {
        let id = Uuid::new_v4();
        let token = sign("secret", id, "a@b.c", Duration::hours(1)).unwrap();

        let claims = verify("secret", &token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.email, "a@b.c");

        assert!(verify("wrong-secret", &token).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected_but_still_decodable() {
        let id = Uuid::new_v4();
        let token = sign("secret", id, "a@b.c", Duration::seconds(-120)).unwrap();

        assert!(verify("secret", &token).is_err());
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.id, id);
    }
}
