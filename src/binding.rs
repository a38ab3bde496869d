//! Hardware binding decision, kept free of storage and transport.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
  HardwareIdRequired,
  HardwareMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Accept,
  /// First use: the supplied id must be captured onto the license.
  Bind(String),
  Reject(Rejection),
}

/// An empty supplied id counts as no id at all.
pub fn resolve(
  binding_enabled: bool,
  supplied: Option<&str>,
  stored: Option<&str>,
) -> Resolution {
  if !binding_enabled {
    return Resolution::Accept;
  }

  let Some(supplied) = supplied.filter(|id| !id.is_empty()) else {
    return Resolution::Reject(Rejection::HardwareIdRequired);
  };

  match stored {
    None => Resolution::Bind(supplied.to_string()),
    Some(stored) if stored == supplied => Resolution::Accept,
    Some(_) => Resolution::Reject(Rejection::HardwareMismatch),
  }
}
