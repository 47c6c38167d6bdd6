#![forbid(unsafe_code)]

//! Login-side helper: pull the subject out of an identity token and fetch its
//! salt from the auth service. Every failure is an error; there is no fallback
//! salt, so a caller that cannot fetch one has to abort the login.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use suicare_kernel_contracts::wire::{ErrorResponse, SaltResponse, SALT_ROUTE};
use suicare_kernel_contracts::{ContractViolation, Salt, SubjectId};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
pub enum ClientError {
    MalformedToken(&'static str),
    InvalidValue(ContractViolation),
    Transport(String),
    Status { code: u16, error: Option<String> },
    MalformedResponse(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedToken(reason) => write!(f, "malformed identity token: {reason}"),
            Self::InvalidValue(v) => write!(f, "{v}"),
            Self::Transport(detail) => write!(f, "salt service unreachable: {detail}"),
            Self::Status {
                code,
                error: Some(error),
            } => write!(f, "salt service returned {code}: {error}"),
            Self::Status { code, error: None } => write!(f, "salt service returned {code}"),
            Self::MalformedResponse(detail) => {
                write!(f, "salt service response malformed: {detail}")
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ContractViolation> for ClientError {
    fn from(value: ContractViolation) -> Self {
        Self::InvalidValue(value)
    }
}

#[derive(Deserialize)]
struct IdTokenClaims {
    sub: Option<String>,
}

/// Reads the `sub` claim from a compact JWT.
///
/// The signature is not checked here; the identity provider SDK has already
/// verified the token by the time the login flow asks for a salt.
pub fn subject_from_id_token(token: &str) -> Result<SubjectId, ClientError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ClientError::MalformedToken("expected three segments"));
    };

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| ClientError::MalformedToken("payload is not base64url"))?;
    let claims = serde_json::from_slice::<IdTokenClaims>(&decoded)
        .map_err(|_| ClientError::MalformedToken("payload is not a JSON object"))?;
    let sub = claims
        .sub
        .ok_or(ClientError::MalformedToken("missing sub claim"))?;
    Ok(SubjectId::new(sub)?)
}

#[derive(Debug, Clone)]
pub struct SaltServiceClient {
    base_url: String,
    agent: ureq::Agent,
}

impl SaltServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .try_proxy_from_env(false)
            .build();
        Self {
            base_url: base_url.into(),
            agent,
        }
    }

    pub fn salt_url(&self) -> String {
        format!("{}{SALT_ROUTE}", self.base_url.trim_end_matches('/'))
    }

    pub fn fetch_salt(&self, subject: &SubjectId) -> Result<Salt, ClientError> {
        let response = match self
            .agent
            .get(&self.salt_url())
            .set("Accept", "application/json")
            .query("sub", subject.as_str())
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let error = response
                    .into_json::<ErrorResponse>()
                    .ok()
                    .map(|body| body.error);
                return Err(ClientError::Status { code, error });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(ClientError::Transport(transport.to_string()));
            }
        };

        let body = response
            .into_json::<SaltResponse>()
            .map_err(|err| ClientError::MalformedResponse(err.to_string()))?;
        Salt::new(body.salt).map_err(|v| ClientError::MalformedResponse(v.to_string()))
    }

    /// Token in, salt out. The pair feeds zkLogin address derivation.
    pub fn fetch_salt_for_token(&self, id_token: &str) -> Result<(SubjectId, Salt), ClientError> {
        let subject = subject_from_id_token(id_token)?;
        let salt = self.fetch_salt(&subject)?;
        Ok((subject, salt))
    }
}
