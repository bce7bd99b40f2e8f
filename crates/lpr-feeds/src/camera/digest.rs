//! HTTP digest authentication (MD5, `qop=auth` or legacy no-qop).
//!
//! The challenge from the last `401` is cached and reused for later requests
//! with an incrementing nonce count, so a steady poll costs one round trip
//! instead of two. A rejected cached challenge is replaced by the next one the
//! server sends.

use md5::{Digest, Md5};
use rand::RngCore;
use std::sync::{Mutex, PoisonError};

/// Parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `true` when the server offered `qop=auth`.
    pub qop_auth: bool,
    /// `true` for `MD5-sess`.
    pub session: bool,
}

impl DigestChallenge {
    /// Parse a `Digest` challenge header value. Returns `None` for other
    /// schemes, missing `realm`/`nonce`, or a non-MD5 algorithm.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop_auth = false;
        let mut session = false;

        for (key, value) in auth_params(rest) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => {
                    qop_auth = value
                        .split(',')
                        .any(|q| q.trim().eq_ignore_ascii_case("auth"));
                }
                "algorithm" => match value.to_ascii_uppercase().as_str() {
                    "MD5" => {}
                    "MD5-SESS" => session = true,
                    other => {
                        tracing::warn!(algorithm = other, "unsupported digest algorithm");
                        return None;
                    }
                },
                _ => {}
            }
        }

        Some(Self {
            realm: realm?,
            nonce: nonce?,
            opaque,
            qop_auth,
            session,
        })
    }
}

/// Split `k1="v, 1", k2=v2` into pairs, honouring quoted commas and `\"`.
fn auth_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        let key = key.trim().to_string();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    c => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
            value = value.trim().to_string();
        }
        params.push((key, value));
    }

    params
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Compute the `response` field for one request.
pub fn compute_response(
    challenge: &DigestChallenge,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    nc: &str,
    cnonce: &str,
) -> String {
    let mut ha1 = md5_hex(&format!("{username}:{}:{password}", challenge.realm));
    if challenge.session {
        ha1 = md5_hex(&format!("{ha1}:{}:{cnonce}", challenge.nonce));
    }
    let ha2 = md5_hex(&format!("{method}:{uri}"));

    if challenge.qop_auth {
        md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", challenge.nonce))
    } else {
        md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce))
    }
}

fn new_cnonce() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug)]
struct Cached {
    challenge: DigestChallenge,
    nc: u32,
}

/// Credentials plus the cached challenge for one camera.
#[derive(Debug)]
pub struct DigestAuth {
    username: String,
    password: String,
    cached: Mutex<Option<Cached>>,
}

impl DigestAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            cached: Mutex::new(None),
        }
    }

    /// Store a fresh challenge, resetting the nonce count. Returns `false`
    /// when the header is not a usable digest challenge.
    pub fn accept_challenge(&self, header: &str) -> bool {
        let Some(challenge) = DigestChallenge::parse(header) else {
            return false;
        };
        tracing::debug!(realm = %challenge.realm, qop_auth = challenge.qop_auth, "digest challenge cached");
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(Cached { challenge, nc: 0 });
        true
    }

    /// Drop the cached challenge.
    pub fn forget(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// `Authorization` header value for the next request, or `None` before
    /// the first challenge.
    pub fn authorization(&self, method: &str, uri: &str) -> Option<String> {
        let mut guard = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let cached = guard.as_mut()?;
        cached.nc = cached.nc.wrapping_add(1);

        let challenge = &cached.challenge;
        let nc = format!("{:08x}", cached.nc);
        let cnonce = new_cnonce();
        let response = compute_response(
            challenge,
            &self.username,
            &self.password,
            method,
            uri,
            &nc,
            &cnonce,
        );

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
            self.username, challenge.realm, challenge.nonce, uri, response
        );
        header.push_str(if challenge.session { ", algorithm=MD5-sess" } else { ", algorithm=MD5" });
        if challenge.qop_auth {
            header.push_str(&format!(r#", qop=auth, nc={nc}, cnonce="{cnonce}""#));
        } else if challenge.session {
            header.push_str(&format!(r#", cnonce="{cnonce}""#));
        }
        if let Some(opaque) = &challenge.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        Some(header)
    }
}
