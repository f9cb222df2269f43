use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::scoring::ScoreCategory;

// ============ Enumerations ============

/// Returned when a stored or submitted value is not a member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of lowercase string values stored as TEXT columns.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum! {
    /// Trade requested by a lead.
    ServiceType {
        Plumbing => "plumbing",
        Electrical => "electrical",
        Landscaping => "landscaping",
        Hvac => "hvac",
        Roofing => "roofing",
        Cleaning => "cleaning",
        Renovation => "renovation",
        Other => "other",
    }
}

text_enum! {
    /// Channel the lead arrived through.
    LeadSource {
        Website => "website",
        Referral => "referral",
        Instagram => "instagram",
        Facebook => "facebook",
        Google => "google",
        Other => "other",
    }
}

text_enum! {
    LeadStatus {
        Pending => "pending",
        Contacted => "contacted",
        Qualified => "qualified",
        Converted => "converted",
        Closed => "closed",
    }
}

text_enum! {
    InteractionType {
        Call => "call",
        Email => "email",
        Sms => "sms",
        Meeting => "meeting",
        QuoteSent => "quote_sent",
        FollowUp => "follow_up",
    }
}

text_enum! {
    AppointmentStatus {
        Scheduled => "scheduled",
        Confirmed => "confirmed",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
}

text_enum! {
    SubscriptionPlan {
        Basic => "basic",
        Premium => "premium",
        Enterprise => "enterprise",
    }
}

text_enum! {
    SubscriptionStatus {
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

text_enum! {
    CommunicationMethod {
        Email => "email",
        Phone => "phone",
        Sms => "sms",
    }
}

impl AppointmentStatus {
    /// Statuses counted as upcoming work on the dashboard.
    pub const ACTIVE: &'static [AppointmentStatus] = &[
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
    ];

    /// Whether an appointment in this status still occupies its time slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }

    /// Lead status implied by an appointment reaching this status, if any.
    pub fn lead_outcome(&self) -> Option<LeadStatus> {
        match self {
            AppointmentStatus::Completed => Some(LeadStatus::Converted),
            AppointmentStatus::Cancelled | AppointmentStatus::NoShow => Some(LeadStatus::Closed),
            _ => None,
        }
    }
}

// ============ Database Models ============

/// A prospective customer's service request.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[sqlx(try_from = "String")]
    pub service_type: ServiceType,
    pub message: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeadStatus,
    /// Last persisted engine output, always within `[0, 10]`.
    pub score: i16,
    #[sqlx(try_from = "String")]
    pub source: LeadSource,
    /// Provider the lead was assigned to when an appointment was booked.
    pub assigned_to: Option<Uuid>,
    pub follow_up_date: Option<DateTime<Utc>>,
    #[sqlx(json)]
    pub notes: Vec<LeadNote>,
    #[sqlx(json)]
    pub interactions: Vec<Interaction>,
    pub submission_time: DateTime<Utc>,
    /// First time the lead moved to `contacted`.
    pub response_time: Option<DateTime<Utc>>,
    pub appointment_booked: bool,
    pub estimated_value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Free-form note left by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadNote {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Touch point recorded against a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Provider business registered with the service.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: Uuid,
    pub business_name: String,
    pub owner_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub phone: String,
    pub service_types: Vec<String>,
    #[sqlx(json)]
    pub service_area: ServiceArea,
    #[sqlx(json)]
    pub business_info: BusinessInfo,
    pub rating_average: f64,
    pub rating_count: i32,
    #[sqlx(json)]
    pub subscription: Subscription,
    #[sqlx(json)]
    pub settings: ProviderSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceArea {
    /// Travel radius in miles.
    pub radius: f64,
    #[serde(default)]
    pub zip_codes: Vec<String>,
}

impl Default for ServiceArea {
    fn default() -> Self {
        Self {
            radius: 25.0,
            zip_codes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    pub license_number: Option<String>,
    pub years_in_business: Option<i32>,
    pub insurance_info: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            plan: SubscriptionPlan::Basic,
            status: SubscriptionStatus::Active,
            expires_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub auto_assign_leads: bool,
    pub email_notifications: bool,
    pub sms_notifications: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            auto_assign_leads: true,
            email_notifications: true,
            sms_notifications: false,
        }
    }
}

/// End customer account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub phone: Option<String>,
    #[sqlx(json)]
    pub address: Address,
    #[sqlx(json)]
    pub preferences: CustomerPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPreferences {
    #[serde(default)]
    pub service_types: Vec<String>,
    pub communication_method: CommunicationMethod,
    pub notifications: bool,
}

impl Default for CustomerPreferences {
    fn default() -> Self {
        Self {
            service_types: Vec::new(),
            communication_method: CommunicationMethod::Email,
            notifications: true,
        }
    }
}

/// A provider's booked visit for a lead.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub provider_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    /// Length of the visit in minutes.
    pub duration: i32,
    pub service_type: String,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    #[sqlx(json)]
    pub location: Location,
    pub notes: Option<String>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub completion_notes: Option<String>,
    pub customer_rating: Option<i16>,
    pub customer_review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// ============ API Request Models ============

/// Public intake form body. Fields stay optional so validation can name what is missing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service_type: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

/// Intake form after validation and normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_type: ServiceType,
    pub message: Option<String>,
    pub source: LeadSource,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InteractionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListQuery {
    pub status: Option<String>,
    pub service_type: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRegistration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRegistration {
    pub business_name: Option<String>,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub service_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated customer sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Validated provider sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProvider {
    pub business_name: String,
    pub owner_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub service_types: Vec<ServiceType>,
}

/// Validated login attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub lead_id: Option<String>,
    pub scheduled_date: Option<String>,
    pub duration: Option<i64>,
    pub service_type: Option<String>,
    pub location: Option<LocationInput>,
    pub notes: Option<String>,
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Validated appointment booking.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub lead_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub duration: i32,
    pub service_type: String,
    pub location: Location,
    pub notes: Option<String>,
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStatusUpdate {
    pub status: Option<String>,
    pub completion_notes: Option<String>,
    pub actual_cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    /// Look-back window in days.
    pub period: Option<i64>,
}

// ============ API Response Models ============

/// Provider names shown wherever a lead or appointment references its provider.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub id: Uuid,
    pub business_name: String,
    pub owner_name: String,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Lead contact details embedded in appointment responses.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_type: String,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Lead with its freshly computed category and assignee.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub category: ScoreCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<ProviderSummary>,
}

/// Appointment with the lead and provider it references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub lead: Option<LeadSummary>,
    pub provider: Option<ProviderSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: u32,
    pub pages: u32,
    pub total: i64,
}

impl Pagination {
    pub fn new(current: u32, limit: u32, total: i64) -> Self {
        let limit = i64::from(limit.max(1));
        let pages = (total.max(0) + limit - 1) / limit;
        Self {
            current,
            pages: u32::try_from(pages).unwrap_or(u32::MAX),
            total,
        }
    }
}

/// One bucket of a grouped count, keyed the way the dashboard front end expects.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct BreakdownEntry {
    #[serde(rename = "_id")]
    pub key: Option<String>,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_round_trips_through_str() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(*status));
        }
        assert_eq!(InteractionType::QuoteSent.as_str(), "quote_sent");
    }

    #[test]
    fn test_text_enum_rejects_unknown_value() {
        let err = "carpentry".parse::<ServiceType>().unwrap_err();
        assert_eq!(err.kind, "ServiceType");
        assert_eq!(err.value, "carpentry");
    }

    #[test]
    fn test_appointment_status_side_effects() {
        assert_eq!(
            AppointmentStatus::Completed.lead_outcome(),
            Some(LeadStatus::Converted)
        );
        assert_eq!(
            AppointmentStatus::NoShow.lead_outcome(),
            Some(LeadStatus::Closed)
        );
        assert_eq!(AppointmentStatus::Confirmed.lead_outcome(), None);
        assert!(!AppointmentStatus::Cancelled.holds_slot());
        assert!(AppointmentStatus::InProgress.holds_slot());
    }

    #[test]
    fn test_pagination_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(2, 10, 11).pages, 2);
    }

    #[test]
    fn test_interaction_serializes_type_key() {
        let interaction = Interaction {
            kind: InteractionType::FollowUp,
            description: Some("Status updated to contacted".to_string()),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&interaction).unwrap();
        assert_eq!(value["type"], "follow_up");
    }
}
