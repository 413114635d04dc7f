//! Token signing and verification
//!
//! Compact HS256 JWTs over [`Claims`] with a single process-wide secret.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;

use crate::auth::claims::Claims;
use crate::error::{AppError, ConfigError, TokenError};

/// Signs and verifies bearer tokens
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish()
    }
}

impl TokenCodec {
    /// Build a codec from the signing secret.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingRequired` for a blank secret
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }

        // Only HS256 is accepted; a token naming any other algorithm is
        // rejected before its signature is looked at.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign a claims set
    ///
    /// # Errors
    /// Returns `AppError::Internal` if encoding fails
    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify a token and return its claims
    ///
    /// # Errors
    /// Returns the precise rejection reason. Callers facing untrusted
    /// clients must collapse it into a uniform "invalid token".
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::UnsupportedAlgorithm
                }
                _ => TokenError::Malformed(e.to_string()),
            })?;

        // jsonwebtoken accepts exp == now; a token is dead at its expiry instant.
        if claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET).expect("Failed to build codec")
    }

    #[test]
    fn test_sign_and_verify() {
        let codec = codec();
        let claims = Claims::new(42, TokenKind::Access, 3600);

        let token = codec.sign(&claims).expect("Failed to sign");
        let verified = codec.verify(&token).expect("Failed to verify");

        assert_eq!(verified, claims);
    }

    #[test]
    fn test_blank_secret_rejected() {
        assert!(matches!(
            TokenCodec::new(""),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            codec().verify("garbage"),
            Err(TokenError::Malformed(_))
        ));
        assert!(codec().verify("invalid.token.here").is_err());
    }

    #[test]
    fn test_expired_token() {
        let codec = codec();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims::with_expiry(1, TokenKind::Access, now - 7200, now - 3600);

        let token = codec.sign(&claims).unwrap();
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_expiring_now_is_rejected() {
        let codec = codec();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims::with_expiry(1, TokenKind::Access, now - 10, now);

        let token = codec.sign(&claims).unwrap();
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let token = codec().sign(&Claims::new(1, TokenKind::Access, 3600)).unwrap();
        let other = TokenCodec::new("a-completely-different-secret").unwrap();

        assert_eq!(other.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_every_bit_flip_is_rejected() {
        let codec = codec();
        let token = codec.sign(&Claims::new(9, TokenKind::Refresh, 3600)).unwrap();
        let bytes = token.as_bytes();

        for i in 0..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[i] ^= 0x01;
            let tampered = String::from_utf8(tampered).unwrap();

            assert!(
                codec.verify(&tampered).is_err(),
                "bit flip at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = Claims::new(1, TokenKind::Access, 3600);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec().verify(&token), Err(TokenError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        // {"alg":"none","typ":"JWT"}
        let header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let token = codec().sign(&Claims::new(1, TokenKind::Access, 3600)).unwrap();
        let payload = token.split('.').nth(1).unwrap();

        let forged = format!("{}.{}.", header, payload);
        assert!(codec().verify(&forged).is_err());
    }
}
