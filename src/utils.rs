use chrono::NaiveDate;
use rand::{RngCore, rngs::OsRng};

const KEY_GROUPS: usize = 4;
const KEY_GROUP_BYTES: usize = 4;

/// Generates a key like `A1B2C3D4-E5F6A7B8-0011AABB-CCDDEEFF`.
pub fn generate_license_key() -> String {
  let mut groups = Vec::with_capacity(KEY_GROUPS);
  for _ in 0..KEY_GROUPS {
    let mut bytes = [0u8; KEY_GROUP_BYTES];
    OsRng.fill_bytes(&mut bytes);
    groups.push(hex::encode_upper(bytes));
  }
  groups.join("-")
}

pub fn generate_user_hash() -> String {
  let mut bytes = [0u8; 16];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

pub fn is_license_key(key: &str) -> bool {
  let groups: Vec<&str> = key.split('-').collect();
  groups.len() == KEY_GROUPS
    && groups.iter().all(|group| {
      group.len() == KEY_GROUP_BYTES * 2
        && group.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'))
    })
}

pub fn format_day(day: NaiveDate) -> String {
  day.format("%Y-%m-%d").to_string()
}

/// Shortens an identifier for logs so raw hardware ids never hit the output.
pub fn redact(value: &str) -> String {
  let prefix: String = value.chars().take(4).collect();
  format!("{prefix}…")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_license_key_format() {
    for _ in 0..32 {
      let key = generate_license_key();
      assert_eq!(key.len(), 35);
      assert!(is_license_key(&key), "bad key: {key}");
    }
  }

  #[test]
  fn test_license_keys_differ() {
    assert_ne!(generate_license_key(), generate_license_key());
  }

  #[test]
  fn test_is_license_key_rejects_garbage() {
    assert!(!is_license_key(""));
    assert!(!is_license_key("a1b2c3d4-e5f6a7b8-00112233-44556677"));
    assert!(!is_license_key("A1B2C3D4-E5F6A7B8-00112233"));
    assert!(!is_license_key("A1B2C3D4-E5F6A7B8-00112233-4455667G"));
  }

  #[test]
  fn test_user_hash() {
    let hash = generate_user_hash();
    assert_eq!(hash.len(), 32);
    assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
    assert_ne!(hash, generate_user_hash());
  }

  #[test]
  fn test_format_day() {
    let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
    assert_eq!(format_day(day), "2026-03-07");
  }

  #[test]
  fn test_redact() {
    assert_eq!(redact("HWID-123456"), "HWID…");
    assert_eq!(redact("ab"), "ab…");
  }
}
