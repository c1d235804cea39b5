//! Payment challenges and their two header encodings.
//!
//! Structured: `WWW-Authenticate: X402 price="0.5", wallet="…", token="…", nonce="…", expiry="…"`.
//! Flat: one header per field, `X-Payment-Price`, `X-Payment-Wallet`, ...
//!
//! A complete structured challenge wins over flat headers.

use crate::error::PaymentError;
use http::header::{HeaderMap, HeaderName, HeaderValue, WWW_AUTHENTICATE};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use shardex_core::{PaymentConfig, Price};

/// Terms a resource server demands before granting access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentChallenge {
    pub price: Price,
    pub pay_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Unix seconds after which the challenge is void.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

impl PaymentChallenge {
    pub fn new(price: Price, pay_to: impl Into<String>) -> Self {
        Self {
            price,
            pay_to: pay_to.into(),
            token: None,
            nonce: None,
            expiry: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_expiry(mut self, expiry: u64) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// The expiry second itself is still valid.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiry.is_some_and(|expiry| now > expiry)
    }
}

/// Require a 402 Payment Required status.
pub fn validate_status(status: StatusCode) -> Result<(), PaymentError> {
    if status == StatusCode::PAYMENT_REQUIRED {
        Ok(())
    } else {
        Err(PaymentError::UnsupportedStatus(status.as_u16()))
    }
}

/// Parse with the default scheme and header prefix.
pub fn parse_challenge(headers: &HeaderMap) -> Result<Option<PaymentChallenge>, PaymentError> {
    ChallengeCodec::default().parse(headers)
}

#[derive(Debug, Clone)]
struct FlatHeaders {
    price: HeaderName,
    wallet: HeaderName,
    token: HeaderName,
    nonce: HeaderName,
    expiry: HeaderName,
}

/// Reads and writes challenges for one scheme / header prefix.
#[derive(Debug, Clone)]
pub struct ChallengeCodec {
    scheme: String,
    flat: FlatHeaders,
}

impl Default for ChallengeCodec {
    fn default() -> Self {
        Self {
            scheme: "X402".to_string(),
            flat: FlatHeaders {
                price: HeaderName::from_static("x-payment-price"),
                wallet: HeaderName::from_static("x-payment-wallet"),
                token: HeaderName::from_static("x-payment-token"),
                nonce: HeaderName::from_static("x-payment-nonce"),
                expiry: HeaderName::from_static("x-payment-expiry"),
            },
        }
    }
}

#[derive(Debug, Default)]
struct RawChallenge {
    price: Option<String>,
    wallet: Option<String>,
    token: Option<String>,
    nonce: Option<String>,
    expiry: Option<String>,
}

impl RawChallenge {
    fn set(&mut self, key: &str, value: String) {
        let slot = match key {
            "price" => &mut self.price,
            "wallet" => &mut self.wallet,
            "token" => &mut self.token,
            "nonce" => &mut self.nonce,
            "expiry" => &mut self.expiry,
            _ => return,
        };
        *slot = Some(value);
    }

    fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.price.as_deref().is_none_or(str::is_empty) {
            missing.push("price");
        }
        if self.wallet.as_deref().is_none_or(str::is_empty) {
            missing.push("wallet");
        }
        missing
    }

    fn into_challenge(self) -> Result<PaymentChallenge, PaymentError> {
        let missing = self.missing();
        let (Some(price), Some(wallet)) = (self.price, self.wallet) else {
            return Err(PaymentError::MalformedChallenge(format!(
                "missing {}",
                missing.join(", ")
            )));
        };
        if !missing.is_empty() {
            return Err(PaymentError::MalformedChallenge(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        let price: Price = price
            .parse()
            .map_err(|e| PaymentError::MalformedChallenge(format!("price: {e}")))?;
        let expiry = match self.expiry.filter(|v| !v.is_empty()) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                PaymentError::MalformedChallenge(format!("expiry `{raw}` is not unix seconds"))
            })?),
            None => None,
        };
        Ok(PaymentChallenge {
            price,
            pay_to: wallet,
            token: self.token.filter(|v| !v.is_empty()),
            nonce: self.nonce.filter(|v| !v.is_empty()),
            expiry,
        })
    }
}

impl ChallengeCodec {
    pub fn new(scheme: impl Into<String>, header_prefix: &str) -> Result<Self, PaymentError> {
        let name = |field: &str| {
            HeaderName::from_bytes(format!("{header_prefix}{field}").as_bytes()).map_err(|e| {
                PaymentError::Encoding(format!("header name `{header_prefix}{field}`: {e}"))
            })
        };
        Ok(Self {
            scheme: scheme.into(),
            flat: FlatHeaders {
                price: name("Price")?,
                wallet: name("Wallet")?,
                token: name("Token")?,
                nonce: name("Nonce")?,
                expiry: name("Expiry")?,
            },
        })
    }

    pub fn from_config(config: &PaymentConfig) -> Result<Self, PaymentError> {
        Self::new(config.scheme.clone(), &config.header_prefix)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Extract a challenge. `Ok(None)` when neither encoding is present.
    pub fn parse(&self, headers: &HeaderMap) -> Result<Option<PaymentChallenge>, PaymentError> {
        let structured = self.parse_structured(headers)?;
        let flat = self.parse_flat(headers);

        let raw = match (structured, flat) {
            (None, None) => return Ok(None),
            (Some(s), _) if s.missing().is_empty() => s,
            (_, Some(f)) if f.missing().is_empty() => f,
            (Some(partial), _) | (None, Some(partial)) => partial,
        };
        raw.into_challenge().map(Some)
    }

    fn parse_structured(&self, headers: &HeaderMap) -> Result<Option<RawChallenge>, PaymentError> {
        for value in headers.get_all(WWW_AUTHENTICATE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let value = value.trim();
            let (scheme, params) = value
                .split_once(char::is_whitespace)
                .unwrap_or((value, ""));
            if !scheme.eq_ignore_ascii_case(&self.scheme) {
                continue;
            }
            let mut raw = RawChallenge::default();
            for (key, val) in parse_auth_params(params)? {
                raw.set(&key, val);
            }
            return Ok(Some(raw));
        }
        Ok(None)
    }

    fn parse_flat(&self, headers: &HeaderMap) -> Option<RawChallenge> {
        let read = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        };
        let raw = RawChallenge {
            price: read(&self.flat.price),
            wallet: read(&self.flat.wallet),
            token: read(&self.flat.token),
            nonce: read(&self.flat.nonce),
            expiry: read(&self.flat.expiry),
        };
        let any = raw.price.is_some()
            || raw.wallet.is_some()
            || raw.token.is_some()
            || raw.nonce.is_some()
            || raw.expiry.is_some();
        any.then_some(raw)
    }

    /// The structured `WWW-Authenticate` value for `challenge`.
    pub fn structured_value(&self, challenge: &PaymentChallenge) -> String {
        let mut params = vec![
            format!("price={}", quote(&challenge.price.to_string())),
            format!("wallet={}", quote(&challenge.pay_to)),
        ];
        if let Some(token) = &challenge.token {
            params.push(format!("token={}", quote(token)));
        }
        if let Some(nonce) = &challenge.nonce {
            params.push(format!("nonce={}", quote(nonce)));
        }
        if let Some(expiry) = challenge.expiry {
            params.push(format!("expiry={}", quote(&expiry.to_string())));
        }
        format!("{} {}", self.scheme, params.join(", "))
    }

    /// Write both encodings into `headers`.
    pub fn render(
        &self,
        challenge: &PaymentChallenge,
        headers: &mut HeaderMap,
    ) -> Result<(), PaymentError> {
        let value = |raw: &str| {
            HeaderValue::from_str(raw).map_err(|e| PaymentError::Encoding(e.to_string()))
        };
        headers.append(WWW_AUTHENTICATE, value(&self.structured_value(challenge))?);
        headers.insert(self.flat.price.clone(), value(&challenge.price.to_string())?);
        headers.insert(self.flat.wallet.clone(), value(&challenge.pay_to)?);
        if let Some(token) = &challenge.token {
            headers.insert(self.flat.token.clone(), value(token)?);
        }
        if let Some(nonce) = &challenge.nonce {
            headers.insert(self.flat.nonce.clone(), value(nonce)?);
        }
        if let Some(expiry) = challenge.expiry {
            headers.insert(self.flat.expiry.clone(), value(&expiry.to_string())?);
        }
        Ok(())
    }
}

fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Parse `key="value", key2=token` auth-params. Keys are lowercased.
fn parse_auth_params(input: &str) -> Result<Vec<(String, String)>, PaymentError> {
    let malformed = |msg: &str| PaymentError::MalformedChallenge(msg.to_string());
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        {
            key.push(c.to_ascii_lowercase());
        }
        if key.is_empty() {
            return Err(malformed("expected parameter name"));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.next_if_eq(&'=').is_none() {
            return Err(malformed("expected `=` after parameter name"));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped) => value.push(escaped),
                        None => break,
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => value.push(other),
                }
            }
            if !closed {
                return Err(malformed("unterminated quoted value"));
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != ',') {
                value.push(c);
            }
        }
        params.push((key, value));
    }
    Ok(params)
}
