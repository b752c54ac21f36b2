use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

type HmacSha256 = Hmac<Sha256>;

/// What a bearer token asserts: who the caller is and until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub login: String,
    /// Expiry as unix seconds.
    pub exp: i64,
}

/// Issues and validates the gateway's bearer tokens.
///
/// A token is `base64url(claims-json) . base64url(hmac-sha256(claims))`, signed with the configured secret. This
/// keeps token handling self-contained; there is no session state in the store.
#[derive(Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { config: config.clone() }
    }

    pub fn issue_token(&self, login: &str) -> Result<String, ServerError> {
        let claims = TokenClaims { login: login.to_string(), exp: (Utc::now() + self.config.token_ttl).timestamp() };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| ServerError::Unspecified(format!("Could not serialize token claims. {e}")))?;
        let body = base64::encode_config(payload, base64::URL_SAFE_NO_PAD);
        let signature = base64::encode_config(self.sign(body.as_bytes()), base64::URL_SAFE_NO_PAD);
        Ok(format!("{body}.{signature}"))
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let (body, signature) = token
            .split_once('.')
            .ok_or_else(|| AuthError::InvalidToken("Token is not in the correct format".to_string()))?;
        let signature = base64::decode_config(signature, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let mut mac = self.keyed_mac();
        mac.update(body.as_bytes());
        mac.verify_slice(&signature).map_err(|_| AuthError::InvalidToken("Signature mismatch".to_string()))?;
        let payload =
            base64::decode_config(body, base64::URL_SAFE_NO_PAD).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }
        Ok(claims)
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.keyed_mac();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    fn keyed_mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.config.hmac_secret.reveal().as_bytes())
            .expect("HMAC accepts keys of any size")
    }
}

/// Extractor for routes that require a logged-in caller. Pulls the bearer token from the `Authorization` header
/// and validates it against the issuer in app data.
pub struct AuthenticatedUser {
    pub login: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::Unspecified("TokenIssuer is not configured".to_string()))?;
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    let claims = issuer.validate_token(token)?;
    Ok(AuthenticatedUser { login: claims.login })
}
