use std::path::Path;

use anyhow::{Context as _, bail};
use rand::RngExt;

/// Secret key length in bytes (hex-encoded on disk).
pub const SECRET_KEY_BYTES: usize = 64;

/// Process-wide HMAC key for capability links. Loaded once at startup and
/// handed to the link signer; no other component sees it. No Debug impl:
/// the key must never reach logs.
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Load the key from `path`, or generate a fresh 64-byte key and
    /// persist it there on first start.
    pub fn load_or_generate(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let encoded = std::fs::read_to_string(path)
                .with_context(|| format!("read secret key file {}", path.display()))?;
            let bytes =
                hex::decode(encoded.trim()).context("secret key file is not valid hex")?;
            if bytes.len() != SECRET_KEY_BYTES {
                bail!(
                    "secret key file holds {} bytes, expected {SECRET_KEY_BYTES}",
                    bytes.len()
                );
            }
            return Ok(Self(bytes));
        }

        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..SECRET_KEY_BYTES)
            .map(|_| rng.random_range(0..=u8::MAX))
            .collect();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("create secret key directory {}", parent.display())
                })?;
            }
        }
        std::fs::write(path, hex::encode(&bytes))
            .with_context(|| format!("write secret key file {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .context("restrict secret key file permissions")?;
        }

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
