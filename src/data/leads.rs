use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::scoring::{HOT_THRESHOLD, WARM_THRESHOLD};
use crate::validation::choice;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Column a lead listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadSortField {
    CreatedAt,
    UpdatedAt,
    Score,
    Name,
    Status,
    ServiceType,
}

impl LeadSortField {
    pub const ALL: &'static [LeadSortField] = &[
        LeadSortField::CreatedAt,
        LeadSortField::UpdatedAt,
        LeadSortField::Score,
        LeadSortField::Name,
        LeadSortField::Status,
        LeadSortField::ServiceType,
    ];

    fn column(&self) -> &'static str {
        match self {
            LeadSortField::CreatedAt => "l.created_at",
            LeadSortField::UpdatedAt => "l.updated_at",
            LeadSortField::Score => "l.score",
            LeadSortField::Name => "l.name",
            LeadSortField::Status => "l.status",
            LeadSortField::ServiceType => "l.service_type",
        }
    }

    fn param(&self) -> &'static str {
        match self {
            LeadSortField::CreatedAt => "createdAt",
            LeadSortField::UpdatedAt => "updatedAt",
            LeadSortField::Score => "score",
            LeadSortField::Name => "name",
            LeadSortField::Status => "status",
            LeadSortField::ServiceType => "serviceType",
        }
    }
}

impl std::fmt::Display for LeadSortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.param())
    }
}

impl std::str::FromStr for LeadSortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadSortField::ALL
            .iter()
            .copied()
            .find(|field| field.param() == s)
            .ok_or(())
    }
}

/// Filters, ordering and page for a lead listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub service_type: Option<ServiceType>,
    pub sort_by: LeadSortField,
    pub descending: bool,
    pub page: u32,
    pub limit: u32,
}

impl LeadQuery {
    pub fn from_params(params: LeadListQuery) -> Result<Self, AppError> {
        let status = params
            .status
            .filter(|s| !s.is_empty())
            .map(|s| choice("status", &s, LeadStatus::ALL))
            .transpose()?;
        let service_type = params
            .service_type
            .filter(|s| !s.is_empty())
            .map(|s| choice("serviceType", &s, ServiceType::ALL))
            .transpose()?;
        let sort_by = params
            .sort_by
            .filter(|s| !s.is_empty())
            .map(|s| choice("sortBy", &s, LeadSortField::ALL))
            .transpose()?
            .unwrap_or(LeadSortField::CreatedAt);
        let descending = params.sort_order.as_deref() != Some("asc");

        Ok(Self {
            status,
            service_type,
            sort_by,
            descending,
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
}

#[derive(FromRow)]
struct LeadRow {
    #[sqlx(flatten)]
    lead: Lead,
    assignee_id: Option<Uuid>,
    assignee_business_name: Option<String>,
    assignee_owner_name: Option<String>,
}

impl LeadRow {
    fn into_parts(self) -> (Lead, Option<ProviderSummary>) {
        let assignee = match (
            self.assignee_id,
            self.assignee_business_name,
            self.assignee_owner_name,
        ) {
            (Some(id), Some(business_name), Some(owner_name)) => Some(ProviderSummary {
                id,
                business_name,
                owner_name,
                phone: None,
                email: None,
            }),
            _ => None,
        };
        (self.lead, assignee)
    }
}

const LEAD_WITH_ASSIGNEE: &str = r#"
    SELECT l.*,
           p.id AS assignee_id,
           p.business_name AS assignee_business_name,
           p.owner_name AS assignee_owner_name
    FROM leads l
    LEFT JOIN providers p ON p.id = l.assigned_to
"#;

/// Persistence for leads.
pub struct LeadStore {
    pool: PgPool,
}

impl LeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, lead: &Lead) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO leads (
                id, name, email, phone, service_type, message, status, score, source,
                assigned_to, follow_up_date, notes, interactions, submission_time,
                response_time, appointment_booked, estimated_value, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.service_type.as_str())
        .bind(&lead.message)
        .bind(lead.status.as_str())
        .bind(lead.score)
        .bind(lead.source.as_str())
        .bind(lead.assigned_to)
        .bind(lead.follow_up_date)
        .bind(sqlx::types::Json(&lead.notes))
        .bind(sqlx::types::Json(&lead.interactions))
        .bind(lead.submission_time)
        .bind(lead.response_time)
        .bind(lead.appointment_booked)
        .bind(lead.estimated_value)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await
        .context("inserting lead")?;

        Ok(())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lead)
    }

    pub async fn find_with_assignee(
        &self,
        id: Uuid,
    ) -> Result<Option<(Lead, Option<ProviderSummary>)>, AppError> {
        let sql = format!("{} WHERE l.id = $1", LEAD_WITH_ASSIGNEE);
        let row = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(LeadRow::into_parts))
    }

    /// One page of leads plus the total matching the filters.
    pub async fn list(
        &self,
        query: &LeadQuery,
    ) -> Result<(Vec<(Lead, Option<ProviderSummary>)>, i64), AppError> {
        let status = query.status.map(|s| s.as_str());
        let service_type = query.service_type.map(|s| s.as_str());
        let direction = if query.descending { "DESC" } else { "ASC" };

        let sql = format!(
            "{} WHERE ($1::text IS NULL OR l.status = $1) \
               AND ($2::text IS NULL OR l.service_type = $2) \
             ORDER BY {} {}, l.id \
             LIMIT $3 OFFSET $4",
            LEAD_WITH_ASSIGNEE,
            query.sort_by.column(),
            direction
        );

        let rows = sqlx::query_as::<_, LeadRow>(&sql)
            .bind(status)
            .bind(service_type)
            .bind(i64::from(query.limit))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .context("listing leads")?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM leads \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR service_type = $2)",
        )
        .bind(status)
        .bind(service_type)
        .fetch_one(&self.pool)
        .await
        .context("counting leads")?;

        Ok((rows.into_iter().map(LeadRow::into_parts).collect(), total))
    }

    /// Writes back everything a status update touches.
    pub async fn save_progress(&self, lead: &Lead) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE leads
            SET status = $2,
                response_time = $3,
                notes = $4,
                interactions = $5,
                score = $6,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(lead.id)
        .bind(lead.status.as_str())
        .bind(lead.response_time)
        .bind(sqlx::types::Json(&lead.notes))
        .bind(sqlx::types::Json(&lead.interactions))
        .bind(lead.score)
        .execute(&self.pool)
        .await
        .context("saving lead status update")?;

        Ok(())
    }

    /// Appends one interaction; returns false when the lead does not exist.
    pub async fn append_interaction(
        &self,
        id: Uuid,
        interaction: &Interaction,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET interactions = interactions || jsonb_build_array($2::jsonb),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(sqlx::types::Json(interaction))
        .execute(&self.pool)
        .await
        .context("appending interaction")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_all(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads")
            .fetch_all(&self.pool)
            .await?;
        Ok(leads)
    }

    /// Every lead the rescoring pass is responsible for.
    pub async fn find_open(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE status <> $1")
            .bind(LeadStatus::Closed.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(leads)
    }

    pub async fn find_by_status(&self, status: LeadStatus) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE status = $1")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(leads)
    }

    /// Persists new scores in one transaction. Returns the number of rows written.
    pub async fn update_scores(&self, changes: &[(Uuid, i16)]) -> Result<u64, AppError> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for (id, score) in changes {
            let result =
                sqlx::query("UPDATE leads SET score = $2, updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(score)
                    .execute(&mut *tx)
                    .await
                    .context("updating lead score")?;
            written += result.rows_affected();
        }
        tx.commit().await?;

        Ok(written)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn count_with_status(&self, status: LeadStatus) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Pending leads nobody has answered since `cutoff`.
    pub async fn count_pending_before(&self, cutoff: DateTime<Utc>) -> Result<i64, AppError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leads WHERE status = $1 AND created_at < $2")
                .bind(LeadStatus::Pending.as_str())
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    /// Contacted leads whose follow-up date has arrived.
    pub async fn count_follow_ups_due(&self, now: DateTime<Utc>) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM leads WHERE status = $1 AND follow_up_date <= $2",
        )
        .bind(LeadStatus::Contacted.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Lead counts per status, optionally limited to leads created since a date.
    pub async fn status_breakdown(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<BreakdownEntry>, AppError> {
        self.breakdown("status", since).await
    }

    pub async fn source_breakdown(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<BreakdownEntry>, AppError> {
        self.breakdown("source", since).await
    }

    /// Lead counts per service type, largest first.
    pub async fn service_breakdown(&self) -> Result<Vec<BreakdownEntry>, AppError> {
        let rows = sqlx::query_as::<_, BreakdownEntry>(
            "SELECT service_type AS key, COUNT(*) AS count FROM leads \
             GROUP BY service_type ORDER BY count DESC, key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Category counts from stored scores.
    pub async fn stored_score_breakdown(&self) -> Result<Vec<BreakdownEntry>, AppError> {
        let rows = sqlx::query_as::<_, BreakdownEntry>(
            r#"
            SELECT CASE
                       WHEN score >= $1 THEN 'hot'
                       WHEN score >= $2 THEN 'warm'
                       ELSE 'cold'
                   END AS key,
                   COUNT(*) AS count
            FROM leads
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(i16::from(HOT_THRESHOLD))
        .bind(i16::from(WARM_THRESHOLD))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// New leads per UTC calendar day since `since`, oldest first.
    pub async fn daily_counts(&self, since: DateTime<Utc>) -> Result<Vec<BreakdownEntry>, AppError> {
        let rows = sqlx::query_as::<_, BreakdownEntry>(
            r#"
            SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS key,
                   COUNT(*) AS count
            FROM leads
            WHERE created_at >= $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn breakdown(
        &self,
        column: &'static str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<BreakdownEntry>, AppError> {
        let sql = format!(
            "SELECT {column} AS key, COUNT(*) AS count FROM leads \
             WHERE ($1::timestamptz IS NULL OR created_at >= $1) \
             GROUP BY {column} ORDER BY count DESC, key"
        );
        let rows = sqlx::query_as::<_, BreakdownEntry>(&sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
