pub use std::time::Duration;

pub use anyhow::Context;
pub use chrono::{NaiveDateTime as DateTime, TimeDelta, Utc};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
  PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
  TransactionTrait,
};
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Policy, Result};
pub(crate) use crate::utils;
