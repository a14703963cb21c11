//! JWT issuing and verification.
//!
//! Two token shapes share one signing secret: operator tokens (CLI-minted)
//! and the per-task result-updater tokens handed to workflow submissions.
//! A result token embeds the task id as its `user_id` and is only good for
//! updating that task's result.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{codes, Fault};
use crate::domain::ports::ResultTokenIssuer;
use crate::services::RESULT_UPDATER_USER;

/// Result-updater tokens expire after 30 days; past that only polling can
/// finalize the task.
const RESULT_TOKEN_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// For result-updater tokens this is the task id.
    pub user_id: i64,
    pub user_name: String,
    pub real_name: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: i64, user_name: &str, real_name: &str, ttl: Duration) -> Result<String, Fault> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            user_name: user_name.to_string(),
            real_name: real_name.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| Fault::new(codes::SERVER_ERR, format!("sign token: {e}")))
    }

    /// Long-lived operator token for the CLI.
    pub fn issue_operator_token(&self, user: &str, days: i64) -> Result<String, Fault> {
        self.issue(0, user, user, Duration::days(days))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Fault> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Fault::new(codes::TOKEN_EXPIRED, "token expired")
                }
                _ => Fault::new(codes::TOKEN_INVALID, e.to_string()),
            })
    }
}

impl ResultTokenIssuer for JwtService {
    fn issue_result_token(&self, task_id: i64) -> Result<String, Fault> {
        self.issue(task_id, RESULT_UPDATER_USER, "workflow", Duration::days(RESULT_TOKEN_DAYS))
    }
}
