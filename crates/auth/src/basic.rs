//! `Authorization: Basic` header parsing.

use base64::{Engine as _, engine::general_purpose};

use crate::{AuthFailure, Secret};

const SCHEME: &str = "basic";

/// Login/secret pair carried by a Basic-Auth header.
#[derive(Debug)]
pub struct BasicCredentials {
    pub login: String,
    pub secret: Secret,
}

impl BasicCredentials {
    /// Decode the raw `Authorization` header value, if any.
    ///
    /// The scheme is matched case-insensitively and the payload is split on the
    /// first `:`, so secrets may contain colons.
    pub fn from_header(value: Option<&str>) -> Result<Self, AuthFailure> {
        let value = value.ok_or(AuthFailure::MissingCredentials)?.trim();

        let (scheme, payload) = value
            .split_once(' ')
            .ok_or(AuthFailure::MalformedCredentials)?;
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(AuthFailure::MalformedCredentials);
        }

        let payload = payload.trim();
        if payload.is_empty() {
            return Err(AuthFailure::MalformedCredentials);
        }

        let decoded = general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| AuthFailure::MalformedCredentials)?;
        let colon = decoded
            .iter()
            .position(|b| *b == b':')
            .ok_or(AuthFailure::MalformedCredentials)?;

        let login = std::str::from_utf8(&decoded[..colon])
            .map_err(|_| AuthFailure::MalformedCredentials)?
            .to_string();
        let secret = Secret::new(&decoded[colon + 1..]);

        Ok(Self { login, secret })
    }
}
