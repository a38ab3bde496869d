pub mod license;
pub mod user;

pub use license::LicenseStatus;
