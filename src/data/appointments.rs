use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::data::leads::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::validation::{choice, parse_day};

/// Filters and page for a provider's appointment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub day: Option<NaiveDate>,
    pub page: u32,
    pub limit: u32,
}

impl AppointmentQuery {
    pub fn from_params(params: AppointmentListQuery) -> Result<Self, AppError> {
        let status = params
            .status
            .filter(|s| !s.is_empty())
            .map(|s| choice("status", &s, AppointmentStatus::ALL))
            .transpose()?;
        let day = params
            .date
            .filter(|s| !s.is_empty())
            .map(|s| {
                parse_day(&s)
                    .ok_or_else(|| AppError::Validation("\"date\" must be a valid date".to_string()))
            })
            .transpose()?;

        Ok(Self {
            status,
            day,
            page: params.page.unwrap_or(1).max(1),
            limit: params
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    fn window(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self.day.map(day_bounds) {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        }
    }
}

/// Half-open UTC range covering one calendar day.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

#[derive(FromRow)]
struct AppointmentRow {
    #[sqlx(flatten)]
    appointment: Appointment,
    lead_name: Option<String>,
    lead_email: Option<String>,
    lead_phone: Option<String>,
    lead_service_type: Option<String>,
    lead_message: Option<String>,
    provider_business_name: Option<String>,
    provider_owner_name: Option<String>,
    provider_phone: Option<String>,
    provider_email: Option<String>,
}

impl From<AppointmentRow> for AppointmentView {
    fn from(row: AppointmentRow) -> Self {
        let lead = match (
            row.lead_name,
            row.lead_email,
            row.lead_phone,
            row.lead_service_type,
        ) {
            (Some(name), Some(email), Some(phone), Some(service_type)) => Some(LeadSummary {
                id: row.appointment.lead_id,
                name,
                email,
                phone,
                service_type,
                message: row.lead_message,
            }),
            _ => None,
        };
        let provider = match (row.provider_business_name, row.provider_owner_name) {
            (Some(business_name), Some(owner_name)) => Some(ProviderSummary {
                id: row.appointment.provider_id,
                business_name,
                owner_name,
                phone: row.provider_phone,
                email: row.provider_email,
            }),
            _ => None,
        };

        AppointmentView {
            appointment: row.appointment,
            lead,
            provider,
        }
    }
}

const LIST_VIEW: &str = r#"
    SELECT a.*,
           l.name AS lead_name,
           l.email AS lead_email,
           l.phone AS lead_phone,
           l.service_type AS lead_service_type,
           NULL::text AS lead_message,
           p.business_name AS provider_business_name,
           p.owner_name AS provider_owner_name,
           NULL::text AS provider_phone,
           NULL::text AS provider_email
    FROM appointments a
    LEFT JOIN leads l ON l.id = a.lead_id
    LEFT JOIN providers p ON p.id = a.provider_id
"#;

const DETAIL_VIEW: &str = r#"
    SELECT a.*,
           l.name AS lead_name,
           l.email AS lead_email,
           l.phone AS lead_phone,
           l.service_type AS lead_service_type,
           l.message AS lead_message,
           p.business_name AS provider_business_name,
           p.owner_name AS provider_owner_name,
           p.phone AS provider_phone,
           p.email AS provider_email
    FROM appointments a
    LEFT JOIN leads l ON l.id = a.lead_id
    LEFT JOIN providers p ON p.id = a.provider_id
"#;

/// Persistence for appointments and the lead transitions they cause.
pub struct AppointmentStore {
    pool: PgPool,
}

impl AppointmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Books a visit and marks the lead qualified, booked and assigned in one transaction.
    pub async fn create(
        &self,
        provider_id: Uuid,
        booking: &NewAppointment,
    ) -> Result<AppointmentView, AppError> {
        let mut tx = self.pool.begin().await?;

        let lead_exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM leads WHERE id = $1 FOR UPDATE")
                .bind(booking.lead_id)
                .fetch_optional(&mut *tx)
                .await?;
        if lead_exists.is_none() {
            return Err(AppError::NotFound("Lead not found".to_string()));
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, lead_id, provider_id, scheduled_date, duration, service_type,
                status, location, notes, estimated_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(booking.lead_id)
        .bind(provider_id)
        .bind(booking.scheduled_date)
        .bind(booking.duration)
        .bind(&booking.service_type)
        .bind(AppointmentStatus::Scheduled.as_str())
        .bind(sqlx::types::Json(&booking.location))
        .bind(&booking.notes)
        .bind(booking.estimated_cost)
        .execute(&mut *tx)
        .await
        .context("inserting appointment")?;

        sqlx::query(
            r#"
            UPDATE leads
            SET status = $2, appointment_booked = true, assigned_to = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(booking.lead_id)
        .bind(LeadStatus::Qualified.as_str())
        .bind(provider_id)
        .execute(&mut *tx)
        .await
        .context("marking lead as booked")?;

        tx.commit().await?;

        self.find_listed(provider_id, id)
            .await?
            .ok_or_else(|| AppError::InternalError("Appointment vanished after insert".to_string()))
    }

    /// One page of the provider's appointments, soonest first, plus the total.
    pub async fn list(
        &self,
        provider_id: Uuid,
        query: &AppointmentQuery,
    ) -> Result<(Vec<AppointmentView>, i64), AppError> {
        let status = query.status.map(|s| s.as_str());
        let (from, until) = query.window();

        let sql = format!(
            "{} WHERE a.provider_id = $1 \
               AND ($2::text IS NULL OR a.status = $2) \
               AND ($3::timestamptz IS NULL OR a.scheduled_date >= $3) \
               AND ($4::timestamptz IS NULL OR a.scheduled_date < $4) \
             ORDER BY a.scheduled_date ASC, a.id \
             LIMIT $5 OFFSET $6",
            LIST_VIEW
        );

        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(provider_id)
            .bind(status)
            .bind(from)
            .bind(until)
            .bind(i64::from(query.limit))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .context("listing appointments")?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM appointments \
             WHERE provider_id = $1 \
               AND ($2::text IS NULL OR status = $2) \
               AND ($3::timestamptz IS NULL OR scheduled_date >= $3) \
               AND ($4::timestamptz IS NULL OR scheduled_date < $4)",
        )
        .bind(provider_id)
        .bind(status)
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await
        .context("counting appointments")?;

        Ok((rows.into_iter().map(AppointmentView::from).collect(), total))
    }

    /// The provider's appointment with the lead message and provider contact details.
    pub async fn find_detailed(
        &self,
        provider_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AppointmentView>, AppError> {
        self.find_view(DETAIL_VIEW, provider_id, id).await
    }

    async fn find_listed(
        &self,
        provider_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AppointmentView>, AppError> {
        self.find_view(LIST_VIEW, provider_id, id).await
    }

    async fn find_view(
        &self,
        view: &str,
        provider_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AppointmentView>, AppError> {
        let sql = format!("{} WHERE a.id = $1 AND a.provider_id = $2", view);
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AppointmentView::from))
    }

    /// Moves an appointment to `status` and applies the implied lead outcome.
    ///
    /// Returns `None` when the provider owns no appointment with this id.
    pub async fn update_status(
        &self,
        provider_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
        completion_notes: Option<&str>,
        actual_cost: Option<f64>,
    ) -> Result<Option<Appointment>, AppError> {
        let mut tx = self.pool.begin().await?;

        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $3,
                completion_notes = COALESCE($4, completion_notes),
                actual_cost = COALESCE($5, actual_cost),
                updated_at = now()
            WHERE id = $1 AND provider_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(provider_id)
        .bind(status.as_str())
        .bind(completion_notes)
        .bind(actual_cost)
        .fetch_optional(&mut *tx)
        .await
        .context("updating appointment status")?;

        let Some(appointment) = appointment else {
            return Ok(None);
        };

        if let Some(outcome) = status.lead_outcome() {
            sqlx::query("UPDATE leads SET status = $2, updated_at = now() WHERE id = $1")
                .bind(appointment.lead_id)
                .bind(outcome.as_str())
                .execute(&mut *tx)
                .await
                .context("applying appointment outcome to lead")?;
        }

        tx.commit().await?;
        Ok(Some(appointment))
    }

    /// Start times of the provider's slot-holding appointments on `day`.
    pub async fn booked_times(
        &self,
        provider_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, AppError> {
        let (start, end) = day_bounds(day);
        let released: Vec<&str> = AppointmentStatus::ALL
            .iter()
            .filter(|s| !s.holds_slot())
            .map(|s| s.as_str())
            .collect();

        let times: Vec<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT scheduled_date FROM appointments
            WHERE provider_id = $1
              AND scheduled_date >= $2 AND scheduled_date < $3
              AND status <> ALL($4)
            "#,
        )
        .bind(provider_id)
        .bind(start)
        .bind(end)
        .bind(&released)
        .fetch_all(&self.pool)
        .await?;

        Ok(times)
    }

    pub async fn count_for_provider(&self, provider_id: Uuid) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE provider_id = $1")
            .bind(provider_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Appointments still scheduled, confirmed or in progress.
    pub async fn count_active(&self, provider_id: Uuid) -> Result<i64, AppError> {
        let active: Vec<&str> = AppointmentStatus::ACTIVE.iter().map(|s| s.as_str()).collect();
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM appointments WHERE provider_id = $1 AND status = ANY($2)",
        )
        .bind(provider_id)
        .bind(&active)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Sum of actual costs of completed appointments scheduled since `since`.
    pub async fn revenue_since(
        &self,
        provider_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<f64, AppError> {
        let revenue: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(actual_cost), 0)::float8
            FROM appointments
            WHERE provider_id = $1 AND status = $2 AND scheduled_date >= $3
            "#,
        )
        .bind(provider_id)
        .bind(AppointmentStatus::Completed.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(revenue)
    }
}
