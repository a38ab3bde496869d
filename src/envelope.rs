//! Symmetric envelope around verification payloads.
//!
//! Wire format: standard base64 of `nonce || ciphertext || tag`, where the
//! cipher is ChaCha20-Poly1305 keyed with SHA-256 of the pre-shared secret.
//! Every seal draws a fresh nonce, so sealing the same value twice yields
//! different text.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::{
  ChaCha20Poly1305, Key, Nonce,
  aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("decryption failed: {0}")]
  Decryption(&'static str),

  #[error("encryption failed: {0}")]
  Encryption(String),
}

#[derive(Clone)]
pub struct Envelope {
  cipher: ChaCha20Poly1305,
}

impl fmt::Debug for Envelope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Envelope").finish_non_exhaustive()
  }
}

impl Envelope {
  /// Returns `None` for an empty secret.
  pub fn new(secret: &str) -> Option<Self> {
    if secret.is_empty() {
      return None;
    }

    let digest = Sha256::digest(secret.as_bytes());
    let cipher = ChaCha20Poly1305::new(Key::from_slice(digest.as_slice()));
    Some(Self { cipher })
  }

  pub fn seal<T>(&self, value: &T) -> Result<String, Error>
  where
    T: Serialize + ?Sized,
  {
    let plaintext =
      json::to_vec(value).map_err(|err| Error::Encryption(err.to_string()))?;
    self.seal_bytes(&plaintext)
  }

  pub fn open<T: DeserializeOwned>(&self, sealed: &str) -> Result<T, Error> {
    let plaintext = self.open_bytes(sealed)?;
    let text = std::str::from_utf8(&plaintext)
      .map_err(|_| Error::Decryption("payload is not UTF-8"))?;
    json::from_str(text).map_err(|_| Error::Decryption("payload is not JSON"))
  }

  fn seal_bytes(&self, plaintext: &[u8]) -> Result<String, Error> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = self
      .cipher
      .encrypt(Nonce::from_slice(&nonce), plaintext)
      .map_err(|err| Error::Encryption(err.to_string()))?;

    let mut bytes = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(bytes))
  }

  fn open_bytes(&self, sealed: &str) -> Result<Vec<u8>, Error> {
    let bytes = STANDARD
      .decode(sealed.trim())
      .map_err(|_| Error::Decryption("invalid base64"))?;

    if bytes.len() < NONCE_SIZE + TAG_SIZE {
      return Err(Error::Decryption("data too short"));
    }

    let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
    self
      .cipher
      .decrypt(Nonce::from_slice(nonce), ciphertext)
      .map_err(|_| Error::Decryption("wrong key or tampered data"))
  }
}

#[cfg(test)]
mod tests {
  use json::{Value, json};

  use super::*;

  fn envelope() -> Envelope {
    Envelope::new("correct horse battery staple").unwrap()
  }

  #[test]
  fn test_empty_secret_rejected() {
    assert!(Envelope::new("").is_none());
  }

  #[test]
  fn test_round_trip() {
    let env = envelope();
    let payloads = [
      json!({ "licenseKey": "A1B2C3D4-E5F6A7B8-00112233-44556677" }),
      json!({ "licenseKey": "K", "hardwareId": "ünïcødé-🔑" }),
      json!({}),
      json!([1, 2, 3]),
      json!("plain string"),
      json!(null),
    ];

    for payload in payloads {
      let sealed = env.seal(&payload).unwrap();
      let opened: Value = env.open(&sealed).unwrap();
      assert_eq!(opened, payload);
    }
  }

  #[test]
  fn test_seal_is_not_deterministic() {
    let env = envelope();
    let payload = json!({ "licenseKey": "same" });

    let a = env.seal(&payload).unwrap();
    let b = env.seal(&payload).unwrap();
    assert_ne!(a, b);

    assert_eq!(env.open::<Value>(&a).unwrap(), payload);
    assert_eq!(env.open::<Value>(&b).unwrap(), payload);
  }

  #[test]
  fn test_foreign_key_fails() {
    let sealed = envelope().seal(&json!({ "licenseKey": "K" })).unwrap();
    let other = Envelope::new("another secret").unwrap();

    assert!(matches!(
      other.open::<Value>(&sealed),
      Err(Error::Decryption(_))
    ));
  }

  #[test]
  fn test_tampered_ciphertext_fails() {
    let env = envelope();
    let sealed = env.seal(&json!({ "licenseKey": "K" })).unwrap();

    let mut bytes = STANDARD.decode(&sealed).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let tampered = STANDARD.encode(bytes);

    assert!(matches!(
      env.open::<Value>(&tampered),
      Err(Error::Decryption(_))
    ));
  }

  #[test]
  fn test_malformed_input_fails() {
    let env = envelope();
    for garbage in ["", "not base64 at all!", "AAAA", "U2FsdGVkX1+abc="] {
      assert!(
        matches!(env.open::<Value>(garbage), Err(Error::Decryption(_))),
        "accepted {garbage:?}"
      );
    }
  }

  #[test]
  fn test_non_json_plaintext_fails() {
    let env = envelope();
    let sealed = env.seal_bytes(b"definitely { not json").unwrap();
    assert!(matches!(
      env.open::<Value>(&sealed),
      Err(Error::Decryption("payload is not JSON"))
    ));

    let sealed = env.seal_bytes(&[0xff, 0xfe, 0xfd]).unwrap();
    assert!(matches!(
      env.open::<Value>(&sealed),
      Err(Error::Decryption("payload is not UTF-8"))
    ));
  }

  #[test]
  fn test_surrounding_whitespace_ignored() {
    let env = envelope();
    let sealed = env.seal(&json!({ "a": 1 })).unwrap();
    let padded = format!("  {sealed}\r\n");
    assert_eq!(env.open::<Value>(&padded).unwrap(), json!({ "a": 1 }));
  }
}
