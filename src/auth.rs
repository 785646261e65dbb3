//! HTTP Basic authentication.
//!
//! Three extractors express the route classes: [`CurrentAccount`] for
//! endpoints that require a valid account, [`OptionalAuth`] for public
//! endpoints that must still reject bad credentials when they are offered,
//! and [`AnonymousOnly`] for registration, which refuses authenticated
//! callers outright.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sqlx::PgPool;

use crate::account::Account;
use crate::AppError;

///////////////////////////////////////////// Credentials ///////////////////////////////////////////

/// Email and password taken from a Basic Authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Parses an HTTP Basic Authorization header value. The scheme is
    /// matched case-insensitively.
    pub fn from_header(value: &str) -> Result<Credentials, AppError> {
        let encoded = match value.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("basic") => rest.trim(),
            _ => {
                return Err(AppError::unauthorized(
                    "authorization scheme must be Basic",
                ));
            }
        };
        let decoded = decode_base64(encoded)
            .map_err(|_| AppError::unauthorized("invalid base64 in authorization header"))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| AppError::unauthorized("credentials are not valid utf-8"))?;
        let Some((email, password)) = decoded.split_once(':') else {
            return Err(AppError::unauthorized("credentials must be email:password"));
        };
        Ok(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    /// Looks the account up by email and checks the password.
    pub async fn authenticate(&self, pool: &PgPool) -> Result<Account, AppError> {
        match crate::sql::account::get_by_email(pool, &self.email).await? {
            Some(account) if account.password == self.password => Ok(account),
            _ => Err(AppError::unauthorized("invalid credentials")),
        }
    }
}

/// Builds the Authorization header value the extractors accept.
pub fn basic_auth_header(email: &str, password: &str) -> String {
    let credentials = format!("{}:{}", email, password);
    format!("Basic {}", encode_base64(credentials.as_bytes()))
}

fn authorization_header(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::unauthorized("authorization header is not valid utf-8"))?;
    Ok(Some(value.to_string()))
}

///////////////////////////////////////////// Extractors ////////////////////////////////////////////

/// The authenticated caller. Rejects the request when the header is missing
/// or the credentials do not match an account.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

#[axum::async_trait]
impl FromRequestParts<PgPool> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, pool: &PgPool) -> Result<Self, Self::Rejection> {
        let Some(header) = authorization_header(parts)? else {
            return Err(AppError::unauthorized("authorization required"));
        };
        let credentials = Credentials::from_header(&header)?;
        Ok(CurrentAccount(credentials.authenticate(pool).await?))
    }
}

/// An optional caller. Anonymous requests pass through, but credentials that
/// are offered must validate.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<Account>);

#[axum::async_trait]
impl FromRequestParts<PgPool> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, pool: &PgPool) -> Result<Self, Self::Rejection> {
        let Some(header) = authorization_header(parts)? else {
            return Ok(OptionalAuth(None));
        };
        let credentials = Credentials::from_header(&header)?;
        Ok(OptionalAuth(Some(credentials.authenticate(pool).await?)))
    }
}

/// Registration is for new users. Any Authorization header at all gets the
/// request refused.
#[derive(Debug, Clone, Copy)]
pub struct AnonymousOnly;

#[axum::async_trait]
impl FromRequestParts<PgPool> for AnonymousOnly {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _: &PgPool) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(AUTHORIZATION) {
            return Err(AppError::forbidden("already authenticated"));
        }
        Ok(AnonymousOnly)
    }
}

/////////////////////////////////////////// Base64 Encoding /////////////////////////////////////////

const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_base64(input: &[u8]) -> String {
    let mut result = String::new();
    let mut i = 0;

    while i < input.len() {
        let b1 = input[i];
        let b2 = if i + 1 < input.len() { input[i + 1] } else { 0 };
        let b3 = if i + 2 < input.len() { input[i + 2] } else { 0 };

        let combined = ((b1 as u32) << 16) | ((b2 as u32) << 8) | (b3 as u32);

        result.push(BASE64_CHARS[((combined >> 18) & 0x3F) as usize] as char);
        result.push(BASE64_CHARS[((combined >> 12) & 0x3F) as usize] as char);

        if i + 1 < input.len() {
            result.push(BASE64_CHARS[((combined >> 6) & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }

        if i + 2 < input.len() {
            result.push(BASE64_CHARS[(combined & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }

        i += 3;
    }

    result
}

fn decode_base64(input: &str) -> Result<Vec<u8>, &'static str> {
    let mut chars: Vec<char> = input.chars().collect();

    // Tolerate unpadded input
    while !chars.len().is_multiple_of(4) {
        chars.push('=');
    }

    let mut result = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c1 = chars[i];
        let c2 = chars[i + 1];
        let c3 = chars[i + 2];
        let c4 = chars[i + 3];

        let v1 = char_to_base64_value(c1)?;
        let v2 = char_to_base64_value(c2)?;
        let v3 = if c3 == '=' {
            0
        } else {
            char_to_base64_value(c3)?
        };
        let v4 = if c4 == '=' {
            0
        } else {
            char_to_base64_value(c4)?
        };

        let combined = (v1 << 18) | (v2 << 12) | (v3 << 6) | v4;

        result.push((combined >> 16) as u8);
        if c3 != '=' {
            result.push((combined >> 8) as u8);
        }
        if c4 != '=' {
            result.push(combined as u8);
        }

        i += 4;
    }

    Ok(result)
}

fn char_to_base64_value(c: char) -> Result<u32, &'static str> {
    match c {
        'A'..='Z' => Ok((c as u32) - ('A' as u32)),
        'a'..='z' => Ok((c as u32) - ('a' as u32) + 26),
        '0'..='9' => Ok((c as u32) - ('0' as u32) + 52),
        '+' => Ok(62),
        '/' => Ok(63),
        '=' => Ok(0), // Padding
        _ => Err("Invalid base64 character"),
    }
}
