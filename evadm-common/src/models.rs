//! Attendee, event location and survey response models
//!
//! Field names on the wire and in stored documents are camelCase to stay
//! compatible with documents written by the registration flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection holding attendee registrations
pub const REGISTRATIONS: &str = "registrations";
/// Collection holding event locations
pub const EVENT_LOCATIONS: &str = "eventLocation";
/// Collection holding post-event survey responses
pub const SURVEY_RESPONSES: &str = "surveyResponses";

/// Stored field names used by the scan workflows
pub mod fields {
    pub const ID_NUMBER: &str = "idNumber";
    pub const STATUS: &str = "status";
    pub const CHECK_TIME_STAMP: &str = "checkTimeStamp";
    pub const REDEEMED_GIFT: &str = "redeemedGift";
    pub const REDEMPTION_TIME_STAMP: &str = "redemptionTimeStamp";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const SUBMITTED: &str = "submitted";
}

/// Status value written by a successful check-in
pub const CHECKED_IN: &str = "checked-in";

/// Attendee registration record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    pub id: String,
    pub app_downloaded: bool,
    pub contact_number: String,
    pub created_at: String,
    pub customer_type: String,
    pub dealer_company_name: String,
    pub email_address: String,
    pub full_name: String,
    /// Identity key, canonically `NNNNNN-NN-NNNN`
    pub id_number: String,
    pub id_type: String,
    pub tshirt_size: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_time_stamp: Option<DateTime<Utc>>,
    pub redeemed_gift: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_time_stamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

impl Customer {
    pub fn is_checked_in(&self) -> bool {
        self.status.as_deref() == Some(CHECKED_IN)
    }
}

/// Lifecycle state of an event location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventLocationStatus {
    Upcoming,
    Available,
    Closed,
    WalkIn,
}

impl EventLocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLocationStatus::Upcoming => "upcoming",
            EventLocationStatus::Available => "available",
            EventLocationStatus::Closed => "closed",
            EventLocationStatus::WalkIn => "walk-in",
        }
    }
}

/// Event venue and schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLocation {
    #[serde(default)]
    pub id: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub venue: String,
    pub status: EventLocationStatus,
    /// Display position, 1 = top
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u32>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// New event location as supplied to a bulk upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEventLocation {
    pub location: String,
    pub date: String,
    pub time: String,
    pub venue: String,
    pub status: EventLocationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u32>,
}

/// Partial event location edit; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventLocationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u32>,
}

/// Post-event survey submission
///
/// Ratings are 1-5; `marketing` is 1 for "yes".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurveyResponse {
    pub id: String,
    pub contact_number: String,
    pub email: String,
    pub event_location_id: String,
    pub feedback: String,
    pub marketing: i64,
    pub name: String,
    #[serde(rename = "presenter-JaydenKok")]
    pub presenter_jayden_kok: i64,
    #[serde(rename = "presenter-LeeWengFai")]
    pub presenter_lee_weng_fai: i64,
    #[serde(rename = "session-app")]
    pub session_app: i64,
    #[serde(rename = "session-commercial")]
    pub session_commercial: i64,
    #[serde(rename = "session-installation")]
    pub session_installation: i64,
    #[serde(rename = "session-residential")]
    pub session_residential: i64,
    pub submitted: String,
    pub user_id: String,
}
