use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngExt;
use sha2::Sha256;
use tracing::warn;

use crate::domain::repository::CodeRepository;
use crate::domain::types::GRACE_WINDOW_SECS;
use crate::error::DownloadServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Length of the random token carried in every capability URL.
const LINK_TOKEN_LEN: usize = 32;

/// Charset for link tokens (mixed-case alphanumeric).
const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Anti-forgery form token time-to-live in seconds.
const FORM_TOKEN_TTL_SECS: i64 = 3600;

fn generate_link_token() -> String {
    let mut rng = rand::rng();
    (0..LINK_TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// A minted capability link. The code itself is deliberately absent; the
/// fetch side recovers it from the store by requester address.
#[derive(Debug, Clone)]
pub struct IssuedLink {
    pub token: String,
    pub expires: i64,
    pub signature: String,
}

/// Signs and verifies capability URLs and form tokens with the
/// process-wide secret key. The only component that ever sees the key.
#[derive(Clone)]
pub struct LinkSigner {
    secret: Vec<u8>,
}

impl LinkSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn sign_payload(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn verify_payload(&self, payload: &str, signature: &str) -> bool {
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        // verify_slice is constant-time.
        mac.verify_slice(&signature).is_ok()
    }

    pub fn sign(&self, code: &str, expires: i64, token: &str) -> String {
        self.sign_payload(&format!("{code}|{expires}|{token}"))
    }

    pub fn verify(&self, code: &str, expires: i64, token: &str, signature: &str) -> bool {
        self.verify_payload(&format!("{code}|{expires}|{token}"), signature)
    }

    /// Mint a capability link for a just-redeemed code.
    pub fn issue(&self, code: &str, now: DateTime<Utc>, ttl: Duration) -> IssuedLink {
        let token = generate_link_token();
        let expires = (now + ttl).timestamp();
        let signature = self.sign(code, expires, &token);
        IssuedLink {
            token,
            expires,
            signature,
        }
    }

    /// Mint an anti-forgery token for the code-entry form. Stateless:
    /// `{expires}.{hmac}`, verified against the same secret.
    pub fn issue_form_token(&self, now: DateTime<Utc>) -> String {
        let expires = (now + Duration::seconds(FORM_TOKEN_TTL_SECS)).timestamp();
        format!("{expires}.{}", self.sign_payload(&format!("form|{expires}")))
    }

    pub fn verify_form_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        let Some((expires_str, signature)) = token.split_once('.') else {
            return false;
        };
        let Ok(expires) = expires_str.parse::<i64>() else {
            return false;
        };
        if now.timestamp() > expires {
            return false;
        }
        self.verify_payload(&format!("form|{expires}"), signature)
    }
}

// ── FetchDownload (capability verification) ──────────────────────────────────

pub struct FetchDownloadInput {
    pub token: String,
    pub expires: i64,
    pub signature: String,
    pub requester_ip: String,
}

/// Verifies a capability URL at fetch time and resolves it back to the
/// redemption that minted it. On success the caller may stream the file.
pub struct FetchDownloadUseCase<R: CodeRepository> {
    pub codes: R,
    pub signer: LinkSigner,
}

impl<R: CodeRepository> FetchDownloadUseCase<R> {
    pub async fn execute(
        &self,
        input: FetchDownloadInput,
        now: DateTime<Utc>,
    ) -> Result<(), DownloadServiceError> {
        // Expiry first: an expired link fails the same way no matter how
        // well it is signed.
        if now.timestamp() > input.expires {
            return Err(DownloadServiceError::LinkExpired);
        }

        // The URL never carries the code. The capability is bound to "the
        // most recent redemption by this address inside the grace window";
        // recover that record and let its code feed the signature check.
        let since = now - Duration::seconds(GRACE_WINDOW_SECS);
        let record = self
            .codes
            .find_recent_redemption(&input.requester_ip, since)
            .await?;
        let Some(record) = record else {
            warn!(ip = %input.requester_ip, "capability fetch with no recent redemption");
            return Err(DownloadServiceError::AccessDenied);
        };

        if !self
            .signer
            .verify(&record.code, input.expires, &input.token, &input.signature)
        {
            warn!(ip = %input.requester_ip, "capability signature mismatch");
            return Err(DownloadServiceError::AccessDenied);
        }

        Ok(())
    }
}
