// libs/availability-cell/src/models.rs
use serde::{Deserialize, Serialize};

use shared_models::WeeklyScheduleEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProviderRequest {
    pub display_name: String,
    /// IANA timezone identifier, e.g. "Europe/Berlin".
    pub timezone: String,
    pub slot_duration_minutes: i32,
    #[serde(default)]
    pub schedule: Vec<WeeklyScheduleEntry>,
}
