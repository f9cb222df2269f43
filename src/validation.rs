//! Contact-shape checks and request validation.
//!
//! Request validators return the first problem found as
//! [`AppError::Validation`], phrased the way the front end displays it
//! (`"email" must be a valid email`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::*;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

static FORMATTED_PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([0-9]{3}\)\s[0-9]{3}-[0-9]{4}$").expect("phone pattern compiles"));

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_APPOINTMENT_MINUTES: i64 = 15;
pub const MAX_APPOINTMENT_MINUTES: i64 = 480;
pub const DEFAULT_APPOINTMENT_MINUTES: i32 = 60;

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn is_well_formed_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// `(NNN) NNN-NNNN`, or anything that leaves exactly ten ASCII digits once
/// every other character is removed.
pub fn is_valid_phone(phone: &str) -> bool {
    FORMATTED_PHONE_RE.is_match(phone) || phone.chars().filter(|c| c.is_ascii_digit()).count() == 10
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM[:SS]` (read as UTC) and bare dates.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    parse_day(raw).and_then(|day| day.and_hms_opt(0, 0, 0)).map(|naive| naive.and_utc())
}

/// Calendar day from `YYYY-MM-DD` or the date part of a timestamp.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    let value = value.ok_or_else(|| AppError::Validation(format!("\"{}\" is required", field)))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!(
            "\"{}\" is not allowed to be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn email(field: &str, value: Option<String>) -> Result<String, AppError> {
    let value = required(field, value)?.to_lowercase();
    if !is_well_formed_email(&value) {
        return Err(AppError::Validation(format!(
            "\"{}\" must be a valid email",
            field
        )));
    }
    Ok(value)
}

fn password(value: Option<String>) -> Result<String, AppError> {
    let value = value.ok_or_else(|| AppError::Validation("\"password\" is required".to_string()))?;
    if value.is_empty() {
        return Err(AppError::Validation(
            "\"password\" is not allowed to be empty".to_string(),
        ));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "\"password\" length must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(value)
}

/// Parses one member of a closed set, listing the allowed values on failure.
pub fn choice<T>(field: &str, raw: &str, allowed: &[T]) -> Result<T, AppError>
where
    T: FromStr + fmt::Display,
{
    raw.trim().parse::<T>().map_err(|_| {
        let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
        AppError::Validation(format!(
            "\"{}\" must be one of [{}]",
            field,
            options.join(", ")
        ))
    })
}

impl LeadSubmission {
    pub fn validate(self) -> Result<NewLead, AppError> {
        let name = required("name", self.name)?;
        let email = email("email", self.email)?;
        let phone = required("phone", self.phone)?;
        let service_type = required("serviceType", self.service_type)?;
        let service_type = choice("serviceType", &service_type, ServiceType::ALL)?;
        let source = match optional(self.source) {
            Some(raw) => choice("source", &raw, LeadSource::ALL)?,
            None => LeadSource::Website,
        };

        Ok(NewLead {
            name,
            email,
            phone,
            service_type,
            message: optional(self.message),
            source,
        })
    }
}

impl CustomerRegistration {
    pub fn validate(self) -> Result<NewCustomer, AppError> {
        Ok(NewCustomer {
            name: required("name", self.name)?,
            email: email("email", self.email)?,
            password: password(self.password)?,
            phone: optional(self.phone),
        })
    }
}

impl ProviderRegistration {
    pub fn validate(self) -> Result<NewProvider, AppError> {
        let business_name = required("businessName", self.business_name)?;
        let owner_name = required("ownerName", self.owner_name)?;
        let email = email("email", self.email)?;
        let password = password(self.password)?;
        let phone = required("phone", self.phone)?;
        let raw_types = self
            .service_types
            .ok_or_else(|| AppError::Validation("\"serviceTypes\" is required".to_string()))?;

        let mut service_types = Vec::with_capacity(raw_types.len());
        for (idx, raw) in raw_types.iter().enumerate() {
            let parsed = choice(&format!("serviceTypes[{}]", idx), raw, ServiceType::ALL)?;
            if !service_types.contains(&parsed) {
                service_types.push(parsed);
            }
        }

        Ok(NewProvider {
            business_name,
            owner_name,
            email,
            password,
            phone,
            service_types,
        })
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, AppError> {
        let email = email("email", self.email)?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("\"password\" is required".to_string()))?;
        Ok(Credentials { email, password })
    }
}

impl AppointmentRequest {
    pub fn validate(self) -> Result<NewAppointment, AppError> {
        let lead_id = required("leadId", self.lead_id)?;
        let lead_id = Uuid::parse_str(&lead_id)
            .map_err(|_| AppError::Validation("\"leadId\" must be a valid GUID".to_string()))?;

        let scheduled_date = required("scheduledDate", self.scheduled_date)?;
        let scheduled_date = parse_datetime(&scheduled_date).ok_or_else(|| {
            AppError::Validation("\"scheduledDate\" must be a valid date".to_string())
        })?;

        let duration = match self.duration {
            None => DEFAULT_APPOINTMENT_MINUTES,
            Some(d) if d < MIN_APPOINTMENT_MINUTES => {
                return Err(AppError::Validation(format!(
                    "\"duration\" must be greater than or equal to {}",
                    MIN_APPOINTMENT_MINUTES
                )))
            }
            Some(d) if d > MAX_APPOINTMENT_MINUTES => {
                return Err(AppError::Validation(format!(
                    "\"duration\" must be less than or equal to {}",
                    MAX_APPOINTMENT_MINUTES
                )))
            }
            Some(d) => i32::try_from(d).unwrap_or(DEFAULT_APPOINTMENT_MINUTES),
        };

        let service_type = required("serviceType", self.service_type)?;

        let location = self
            .location
            .ok_or_else(|| AppError::Validation("\"location\" is required".to_string()))?;
        let location = Location {
            address: required("location.address", location.address)?,
            city: required("location.city", location.city)?,
            state: required("location.state", location.state)?,
            zip_code: required("location.zipCode", location.zip_code)?,
            coordinates: None,
        };

        if let Some(cost) = self.estimated_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(AppError::Validation(
                    "\"estimatedCost\" must be greater than or equal to 0".to_string(),
                ));
            }
        }

        Ok(NewAppointment {
            lead_id,
            scheduled_date,
            duration,
            service_type,
            location,
            notes: optional(self.notes),
            estimated_cost: self.estimated_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> LeadSubmission {
        LeadSubmission {
            name: Some("  Jane Doe ".to_string()),
            email: Some("Jane@Example.com".to_string()),
            phone: Some("(555) 123-4567".to_string()),
            service_type: Some("hvac".to_string()),
            message: Some("".to_string()),
            source: None,
        }
    }

    fn details(err: AppError) -> String {
        match err {
            AppError::Validation(details) => details,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_well_formed_email("user@example.com"));
        assert!(is_well_formed_email("a@b.c"));
        assert!(!is_well_formed_email("user@examplecom"));
        assert!(!is_well_formed_email("user @example.com"));
        assert!(!is_well_formed_email("user@@example.com"));
        assert!(!is_well_formed_email(""));
    }

    #[test]
    fn test_phone_shapes() {
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(is_valid_phone("5551234567"));
        assert!(is_valid_phone("555-123-4567"));
        assert!(is_valid_phone("+1 (555) 123-456"));
        assert!(!is_valid_phone("+1 555 123 4567"));
        assert!(!is_valid_phone("123-4567"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn test_submission_normalises_fields() {
        let lead = submission().validate().unwrap();
        assert_eq!(lead.name, "Jane Doe");
        assert_eq!(lead.email, "jane@example.com");
        assert_eq!(lead.service_type, ServiceType::Hvac);
        assert_eq!(lead.source, LeadSource::Website);
        assert_eq!(lead.message, None);
    }

    #[test]
    fn test_submission_reports_first_problem() {
        let mut missing = submission();
        missing.name = None;
        assert_eq!(details(missing.validate().unwrap_err()), "\"name\" is required");

        let mut bad_service = submission();
        bad_service.service_type = Some("carpentry".to_string());
        let msg = details(bad_service.validate().unwrap_err());
        assert!(msg.starts_with("\"serviceType\" must be one of [plumbing, electrical"));

        let mut bad_email = submission();
        bad_email.email = Some("jane.example.com".to_string());
        assert_eq!(
            details(bad_email.validate().unwrap_err()),
            "\"email\" must be a valid email"
        );
    }

    #[test]
    fn test_password_minimum_length() {
        let registration = CustomerRegistration {
            name: Some("Jane".to_string()),
            email: Some("jane@example.com".to_string()),
            password: Some("12345".to_string()),
            phone: None,
        };
        assert_eq!(
            details(registration.validate().unwrap_err()),
            "\"password\" length must be at least 6 characters long"
        );
    }

    #[test]
    fn test_provider_service_types_required_and_checked() {
        let registration = |service_types: Option<Vec<&str>>| ProviderRegistration {
            business_name: Some("Acme Plumbing".to_string()),
            owner_name: Some("Ann Acme".to_string()),
            email: Some("ann@acme.test".to_string()),
            password: Some("secret123".to_string()),
            phone: Some("5551234567".to_string()),
            service_types: service_types.map(|v| v.into_iter().map(String::from).collect()),
        };

        assert_eq!(
            details(registration(None).validate().unwrap_err()),
            "\"serviceTypes\" is required"
        );
        assert!(details(registration(Some(vec!["welding"])).validate().unwrap_err())
            .starts_with("\"serviceTypes[0]\" must be one of"));

        let provider = registration(Some(vec!["plumbing", "plumbing", "hvac"]))
            .validate()
            .unwrap();
        assert_eq!(
            provider.service_types,
            vec![ServiceType::Plumbing, ServiceType::Hvac]
        );
    }

    #[test]
    fn test_appointment_defaults_and_bounds() {
        let request = || AppointmentRequest {
            lead_id: Some(Uuid::new_v4().to_string()),
            scheduled_date: Some("2026-10-20T14:00:00Z".to_string()),
            duration: None,
            service_type: Some("hvac".to_string()),
            location: Some(LocationInput {
                address: Some("1 Main St".to_string()),
                city: Some("Springfield".to_string()),
                state: Some("IL".to_string()),
                zip_code: Some("62701".to_string()),
            }),
            notes: None,
            estimated_cost: Some(250.0),
        };

        let appointment = request().validate().unwrap();
        assert_eq!(appointment.duration, DEFAULT_APPOINTMENT_MINUTES);
        assert_eq!(appointment.location.city, "Springfield");

        let mut short = request();
        short.duration = Some(10);
        assert_eq!(
            details(short.validate().unwrap_err()),
            "\"duration\" must be greater than or equal to 15"
        );

        let mut no_location = request();
        no_location.location = None;
        assert_eq!(
            details(no_location.validate().unwrap_err()),
            "\"location\" is required"
        );

        let mut negative = request();
        negative.estimated_cost = Some(-1.0);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 20)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parse_datetime("2026-10-20T14:00:00Z"), Some(expected));
        assert_eq!(parse_datetime("2026-10-20T16:00:00+02:00"), Some(expected));
        assert_eq!(parse_datetime("2026-10-20T14:00"), Some(expected));
        assert_eq!(
            parse_datetime("2026-10-20"),
            Some(expected - chrono::Duration::hours(14))
        );
        assert_eq!(parse_datetime("next tuesday"), None);
    }
}
