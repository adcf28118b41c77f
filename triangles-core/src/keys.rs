//! Key material
//!
//! Secret keys are accepted as 64 hex characters or NIP-19 `nsec1…` strings.

use crate::error::KeyError;
use bech32::{Bech32, Hrp};
use secp256k1::{Keypair, SECP256K1, SecretKey, XOnlyPublicKey};
use std::fmt;

pub const NSEC_HRP: &str = "nsec";
pub const NPUB_HRP: &str = "npub";

/// A signing keypair with its x-only public key
#[derive(Clone, PartialEq, Eq)]
pub struct Keys {
    keypair: Keypair,
    public_key: XOnlyPublicKey,
}

impl Keys {
    /// Generate a fresh random keypair
    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut secp256k1::rand::thread_rng());
        Self::from_secret_key(secret)
    }

    /// Parse hex or `nsec` key material
    pub fn parse(secret: &str) -> Result<Self, KeyError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(KeyError::Empty);
        }

        let bytes = if secret.starts_with("nsec1") {
            decode_bech32(NSEC_HRP, secret)?
        } else {
            hex::decode(secret).map_err(|e| KeyError::InvalidHex(e.to_string()))?
        };

        Self::from_secret_bytes(&bytes)
    }

    /// Build from 32 raw secret bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 32 {
            return Err(KeyError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let secret =
            SecretKey::from_slice(bytes).map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self::from_secret_key(secret))
    }

    fn from_secret_key(secret: SecretKey) -> Self {
        let keypair = Keypair::from_secret_key(SECP256K1, &secret);
        let (public_key, _parity) = keypair.x_only_public_key();
        Self {
            keypair,
            public_key,
        }
    }

    pub fn public_key(&self) -> XOnlyPublicKey {
        self.public_key
    }

    pub(crate) fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Secret key as lowercase hex
    pub fn secret_hex(&self) -> String {
        hex::encode(self.keypair.secret_bytes())
    }

    /// Secret key as `nsec1…`
    pub fn nsec(&self) -> Result<String, KeyError> {
        encode_bech32(NSEC_HRP, &self.keypair.secret_bytes())
    }

    /// Public key as `npub1…`
    pub fn npub(&self) -> Result<String, KeyError> {
        npub(&self.public_key)
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("public_key", &self.public_key.to_string())
            .finish_non_exhaustive()
    }
}

/// Encode any public key as `npub1…`
pub fn npub(public_key: &XOnlyPublicKey) -> Result<String, KeyError> {
    encode_bech32(NPUB_HRP, &public_key.serialize())
}

fn encode_bech32(hrp: &str, data: &[u8]) -> Result<String, KeyError> {
    let hrp = Hrp::parse(hrp).map_err(|e| KeyError::InvalidBech32(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, data).map_err(|e| KeyError::InvalidBech32(e.to_string()))
}

fn decode_bech32(expected_hrp: &str, encoded: &str) -> Result<Vec<u8>, KeyError> {
    let expected = Hrp::parse(expected_hrp).map_err(|e| KeyError::InvalidBech32(e.to_string()))?;
    let (hrp, data) =
        bech32::decode(encoded).map_err(|e| KeyError::InvalidBech32(e.to_string()))?;

    if hrp != expected {
        return Err(KeyError::InvalidBech32(format!(
            "expected prefix {}, got {}",
            expected_hrp, hrp
        )));
    }

    Ok(data)
}
