//! Submission-key verification
//!
//! The endpoint authenticates with a static shared secret carried in the
//! `X-AEGIS-KEY` header. Keys are compared as SHA-256 digests so the
//! comparison cost does not depend on where the strings first differ.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::AppError;

/// Header carrying the submission key.
pub const API_KEY_HEADER: &str = "X-AEGIS-KEY";

pub fn verify_submission_key(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let supplied = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    if digest(supplied) != digest(expected) {
        return Err(AppError::InvalidApiKey);
    }

    Ok(())
}

fn digest(key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key.parse().unwrap());
        headers
    }

    #[test]
    fn correct_key_passes() {
        assert!(verify_submission_key(&headers_with("hive-secret"), "hive-secret").is_ok());
    }

    #[test]
    fn wrong_key_is_rejected() {
        assert!(verify_submission_key(&headers_with("guess"), "hive-secret").is_err());
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(verify_submission_key(&HeaderMap::new(), "hive-secret").is_err());
    }
}
