//! Customer profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 3, message = "full name must be at least 3 characters"))]
    pub full_name: String,
}
