use std::env;

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Pre-shared secret for the verification envelope.
  pub envelope_secret: String,
  /// Bearer token for the admin API. `None` disables it.
  pub admin_token: Option<String>,
  pub rate_per_second: u64,
  pub rate_burst: u32,
  pub max_body_bytes: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:licenses.db?mode=rwc"),
      port: 3000,
      envelope_secret: String::new(),
      admin_token: None,
      rate_per_second: 2,
      rate_burst: 100,
      max_body_bytes: 64 * 1024,
    }
  }
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let defaults = Self::default();

    let envelope_secret = var("ENVELOPE_SECRET")
      .or_else(|| var("AES_SECRET_KEY"))
      .ok_or_else(|| {
        Error::Config("ENVELOPE_SECRET (or AES_SECRET_KEY) is not set".into())
      })?;

    Ok(Self {
      database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
      port: parse_or(var("PORT"), "PORT", defaults.port)?,
      envelope_secret,
      admin_token: var("ADMIN_TOKEN").map(|t| t.trim().to_string()),
      rate_per_second: parse_or(
        var("RATE_LIMIT_PER_SECOND"),
        "RATE_LIMIT_PER_SECOND",
        defaults.rate_per_second,
      )?,
      rate_burst: parse_or(
        var("RATE_LIMIT_BURST"),
        "RATE_LIMIT_BURST",
        defaults.rate_burst,
      )?,
      max_body_bytes: parse_or(
        var("MAX_BODY_BYTES"),
        "MAX_BODY_BYTES",
        defaults.max_body_bytes,
      )?,
    })
  }
}

fn parse_or<T: std::str::FromStr>(
  raw: Option<String>,
  key: &str,
  default: T,
) -> Result<T> {
  match raw {
    Some(raw) => raw
      .trim()
      .parse()
      .map_err(|_| Error::Config(format!("Invalid {key} value: {raw}"))),
    None => Ok(default),
  }
}
