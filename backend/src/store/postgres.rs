//! PostgreSQL store
//!
//! Units of work run in a SERIALIZABLE transaction: preconditions are
//! checked, then every record is upserted by id. Serialization failures and
//! partial unique indexes both surface as `StoreError::Conflict`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{MoveStore, Precondition, Record, StoreError, StoreResult, UnitOfWork};
use crate::actor::User;
use crate::booking::{Booking, BookingFilter, BookingStatus};
use crate::client::{Client, ClientFilter};
use crate::folder::{Folder, FolderFilter, FolderStatus};
use crate::lead::{Lead, LeadFilter};
use crate::models::{PageRequest, PaginatedResponse};
use crate::mover::{Mover, MoverFilter, MoverStatus};
use crate::payment::{Payment, PaymentStatus};
use crate::quote::{Quote, QuoteFilter, QuoteStatus};
use crate::top3::{ShortlistEntry, Top3Selection};

/// Mover row; zones are stored as `TEXT[]`
#[derive(sqlx::FromRow)]
struct MoverRow {
    id: Uuid,
    company_name: String,
    siret: String,
    email: String,
    phone: Option<String>,
    coverage_zones: Vec<String>,
    rating: Option<Decimal>,
    review_count: i32,
    financial_risk_score: Option<i32>,
    litigation_count: i32,
    blacklisted: bool,
    blacklist_reason: Option<String>,
    status: MoverStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<MoverRow> for Mover {
    fn from(row: MoverRow) -> Self {
        Mover {
            id: row.id,
            company_name: row.company_name,
            siret: row.siret,
            email: row.email,
            phone: row.phone,
            coverage_zones: row.coverage_zones.into_iter().collect(),
            rating: row.rating,
            review_count: row.review_count,
            financial_risk_score: row.financial_risk_score,
            litigation_count: row.litigation_count,
            blacklisted: row.blacklisted,
            blacklist_reason: row.blacklist_reason,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Shortlist row; the three entries are flattened into columns
#[derive(sqlx::FromRow)]
struct Top3Row {
    id: Uuid,
    folder_id: Uuid,
    quote_id_1: Uuid,
    score_1: Decimal,
    total_amount_1: Decimal,
    quote_id_2: Uuid,
    score_2: Decimal,
    total_amount_2: Decimal,
    quote_id_3: Uuid,
    score_3: Decimal,
    total_amount_3: Decimal,
    presented_at: DateTime<Utc>,
}

impl From<Top3Row> for Top3Selection {
    fn from(row: Top3Row) -> Self {
        Top3Selection {
            id: row.id,
            folder_id: row.folder_id,
            entries: [
                ShortlistEntry {
                    quote_id: row.quote_id_1,
                    score: row.score_1,
                    total_amount: row.total_amount_1,
                },
                ShortlistEntry {
                    quote_id: row.quote_id_2,
                    score: row.score_2,
                    total_amount: row.total_amount_2,
                },
                ShortlistEntry {
                    quote_id: row.quote_id_3,
                    score: row.score_3,
                    total_amount: row.total_amount_3,
                },
            ],
            presented_at: row.presented_at,
        }
    }
}

fn folder_statuses(statuses: &[FolderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn quote_statuses(statuses: &[QuoteStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn booking_statuses(statuses: &[BookingStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn payment_keys(seen: &[(Uuid, PaymentStatus)]) -> Vec<String> {
    seen.iter()
        .map(|(id, status)| format!("{}:{}", id, status.as_str()))
        .collect()
}

/// Postgres-backed `MoveStore`
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn holds(conn: &mut PgConnection, precondition: &Precondition) -> StoreResult<bool> {
        let query = match precondition {
            Precondition::UserIdFree { user_id } => {
                sqlx::query_scalar::<_, bool>("SELECT NOT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                    .bind(user_id.clone())
            }
            Precondition::LeadStatus { lead_id, status } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM leads WHERE id = $1 AND deleted_at IS NULL AND status = $2)",
            )
            .bind(*lead_id)
            .bind(*status),
            Precondition::ClientActive { client_id } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1 AND anonymized_at IS NULL)",
            )
            .bind(*client_id),
            Precondition::MoverEligible { mover_id } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM movers WHERE id = $1 AND deleted_at IS NULL AND NOT blacklisted)",
            )
            .bind(*mover_id),
            Precondition::MoverIdle { mover_id } => sqlx::query_scalar(
                r#"
                SELECT NOT EXISTS(
                    SELECT 1 FROM quotes
                    WHERE mover_id = $1 AND deleted_at IS NULL
                      AND status IN ('requested', 'reminded', 'validated')
                ) AND NOT EXISTS(
                    SELECT 1 FROM bookings
                    WHERE mover_id = $1 AND status NOT IN ('completed', 'cancelled')
                )
                "#,
            )
            .bind(*mover_id),
            Precondition::MoverRevision {
                mover_id,
                updated_at,
            } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM movers WHERE id = $1 AND deleted_at IS NULL AND updated_at = $2)",
            )
            .bind(*mover_id)
            .bind(*updated_at),
            Precondition::FolderStatus { folder_id, allowed } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM folders WHERE id = $1 AND deleted_at IS NULL AND status::text = ANY($2))",
            )
            .bind(*folder_id)
            .bind(folder_statuses(allowed)),
            Precondition::FolderSelection {
                folder_id,
                selected,
            } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM folders WHERE id = $1 AND deleted_at IS NULL AND selected_quote_id IS NOT DISTINCT FROM $2)",
            )
            .bind(*folder_id)
            .bind(*selected),
            Precondition::FolderRevision {
                folder_id,
                updated_at,
            } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM folders WHERE id = $1 AND deleted_at IS NULL AND updated_at = $2)",
            )
            .bind(*folder_id)
            .bind(*updated_at),
            Precondition::QuoteStatus { quote_id, allowed } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM quotes WHERE id = $1 AND deleted_at IS NULL AND status::text = ANY($2))",
            )
            .bind(*quote_id)
            .bind(quote_statuses(allowed)),
            Precondition::QuoteRevision {
                quote_id,
                updated_at,
            } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM quotes WHERE id = $1 AND updated_at = $2)",
            )
            .bind(*quote_id)
            .bind(*updated_at),
            Precondition::QuoteNotSelected { quote_id } => sqlx::query_scalar(
                "SELECT NOT EXISTS(SELECT 1 FROM folders WHERE selected_quote_id = $1 AND deleted_at IS NULL)",
            )
            .bind(*quote_id),
            Precondition::QuoteUnbooked { quote_id } => sqlx::query_scalar(
                "SELECT NOT EXISTS(SELECT 1 FROM bookings WHERE quote_id = $1)",
            )
            .bind(*quote_id),
            Precondition::NoOpenBooking { folder_id } => sqlx::query_scalar(
                "SELECT NOT EXISTS(SELECT 1 FROM bookings WHERE folder_id = $1 AND status NOT IN ('completed', 'cancelled'))",
            )
            .bind(*folder_id),
            Precondition::BookingStatus {
                booking_id,
                allowed,
            } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM bookings WHERE id = $1 AND status::text = ANY($2))",
            )
            .bind(*booking_id)
            .bind(booking_statuses(allowed)),
            Precondition::PaymentStatus { payment_id, status } => sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM payments WHERE id = $1 AND status = $2)",
            )
            .bind(*payment_id)
            .bind(*status),
            Precondition::PaymentsUnchanged { booking_id, seen } => sqlx::query_scalar(
                r#"
                SELECT current @> $2 AND current <@ $2
                FROM (
                    SELECT COALESCE(array_agg(id::text || ':' || status::text), '{}'::text[]) AS current
                    FROM payments WHERE booking_id = $1
                ) AS snapshot
                "#,
            )
            .bind(*booking_id)
            .bind(payment_keys(seen)),
        };

        Ok(query.fetch_one(&mut *conn).await?)
    }

    async fn upsert(conn: &mut PgConnection, record: &Record) -> StoreResult<()> {
        match record {
            Record::User(u) => {
                sqlx::query(
                    r#"
                    INSERT INTO users (id, email, name, role, mover_id, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (id) DO UPDATE SET
                        email = EXCLUDED.email, name = EXCLUDED.name,
                        role = EXCLUDED.role, mover_id = EXCLUDED.mover_id
                    "#,
                )
                .bind(&u.id)
                .bind(&u.email)
                .bind(&u.name)
                .bind(u.role)
                .bind(u.mover_id)
                .bind(u.created_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Lead(l) => {
                sqlx::query(
                    r#"
                    INSERT INTO leads (
                        id, first_name, last_name, email, phone,
                        origin_address, origin_city, origin_postal_code,
                        destination_address, destination_city, destination_postal_code,
                        estimated_volume, estimation_method, desired_date, source,
                        status, converted_at, created_at, updated_at, deleted_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                    ON CONFLICT (id) DO UPDATE SET
                        first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name,
                        email = EXCLUDED.email, phone = EXCLUDED.phone,
                        origin_address = EXCLUDED.origin_address, origin_city = EXCLUDED.origin_city,
                        origin_postal_code = EXCLUDED.origin_postal_code,
                        destination_address = EXCLUDED.destination_address,
                        destination_city = EXCLUDED.destination_city,
                        destination_postal_code = EXCLUDED.destination_postal_code,
                        estimated_volume = EXCLUDED.estimated_volume,
                        estimation_method = EXCLUDED.estimation_method,
                        desired_date = EXCLUDED.desired_date, source = EXCLUDED.source,
                        status = EXCLUDED.status, converted_at = EXCLUDED.converted_at,
                        updated_at = EXCLUDED.updated_at, deleted_at = EXCLUDED.deleted_at
                    "#,
                )
                .bind(l.id)
                .bind(&l.first_name)
                .bind(&l.last_name)
                .bind(&l.email)
                .bind(&l.phone)
                .bind(&l.origin_address)
                .bind(&l.origin_city)
                .bind(&l.origin_postal_code)
                .bind(&l.destination_address)
                .bind(&l.destination_city)
                .bind(&l.destination_postal_code)
                .bind(l.estimated_volume)
                .bind(l.estimation_method)
                .bind(l.desired_date)
                .bind(&l.source)
                .bind(l.status)
                .bind(l.converted_at)
                .bind(l.created_at)
                .bind(l.updated_at)
                .bind(l.deleted_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Client(c) => {
                sqlx::query(
                    r#"
                    INSERT INTO clients (
                        id, first_name, last_name, email, phone, anonymized_at, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (id) DO UPDATE SET
                        first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name,
                        email = EXCLUDED.email, phone = EXCLUDED.phone,
                        anonymized_at = EXCLUDED.anonymized_at, updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(c.id)
                .bind(&c.first_name)
                .bind(&c.last_name)
                .bind(&c.email)
                .bind(&c.phone)
                .bind(c.anonymized_at)
                .bind(c.created_at)
                .bind(c.updated_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Mover(m) => {
                let zones: Vec<String> = m.coverage_zones.iter().cloned().collect();
                sqlx::query(
                    r#"
                    INSERT INTO movers (
                        id, company_name, siret, email, phone, coverage_zones, rating,
                        review_count, financial_risk_score, litigation_count, blacklisted,
                        blacklist_reason, status, created_at, updated_at, deleted_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                    ON CONFLICT (id) DO UPDATE SET
                        company_name = EXCLUDED.company_name, siret = EXCLUDED.siret,
                        email = EXCLUDED.email, phone = EXCLUDED.phone,
                        coverage_zones = EXCLUDED.coverage_zones, rating = EXCLUDED.rating,
                        review_count = EXCLUDED.review_count,
                        financial_risk_score = EXCLUDED.financial_risk_score,
                        litigation_count = EXCLUDED.litigation_count,
                        blacklisted = EXCLUDED.blacklisted,
                        blacklist_reason = EXCLUDED.blacklist_reason, status = EXCLUDED.status,
                        updated_at = EXCLUDED.updated_at, deleted_at = EXCLUDED.deleted_at
                    "#,
                )
                .bind(m.id)
                .bind(&m.company_name)
                .bind(&m.siret)
                .bind(&m.email)
                .bind(&m.phone)
                .bind(zones)
                .bind(m.rating)
                .bind(m.review_count)
                .bind(m.financial_risk_score)
                .bind(m.litigation_count)
                .bind(m.blacklisted)
                .bind(&m.blacklist_reason)
                .bind(m.status)
                .bind(m.created_at)
                .bind(m.updated_at)
                .bind(m.deleted_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Folder(f) => {
                sqlx::query(
                    r#"
                    INSERT INTO folders (
                        id, client_id, lead_id,
                        origin_address, origin_city, origin_postal_code, origin_floor, origin_elevator,
                        destination_address, destination_city, destination_postal_code,
                        destination_floor, destination_elevator,
                        volume, distance_km, moving_date, needs_packing, needs_storage, needs_insurance,
                        status, selected_quote_id, quotes_requested_at, top3_ready_at,
                        created_at, updated_at, deleted_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                            $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
                    ON CONFLICT (id) DO UPDATE SET
                        origin_address = EXCLUDED.origin_address, origin_city = EXCLUDED.origin_city,
                        origin_postal_code = EXCLUDED.origin_postal_code,
                        origin_floor = EXCLUDED.origin_floor, origin_elevator = EXCLUDED.origin_elevator,
                        destination_address = EXCLUDED.destination_address,
                        destination_city = EXCLUDED.destination_city,
                        destination_postal_code = EXCLUDED.destination_postal_code,
                        destination_floor = EXCLUDED.destination_floor,
                        destination_elevator = EXCLUDED.destination_elevator,
                        volume = EXCLUDED.volume, distance_km = EXCLUDED.distance_km,
                        moving_date = EXCLUDED.moving_date, needs_packing = EXCLUDED.needs_packing,
                        needs_storage = EXCLUDED.needs_storage, needs_insurance = EXCLUDED.needs_insurance,
                        status = EXCLUDED.status, selected_quote_id = EXCLUDED.selected_quote_id,
                        quotes_requested_at = EXCLUDED.quotes_requested_at,
                        top3_ready_at = EXCLUDED.top3_ready_at,
                        updated_at = EXCLUDED.updated_at, deleted_at = EXCLUDED.deleted_at
                    "#,
                )
                .bind(f.id)
                .bind(f.client_id)
                .bind(f.lead_id)
                .bind(&f.origin_address)
                .bind(&f.origin_city)
                .bind(&f.origin_postal_code)
                .bind(f.origin_floor)
                .bind(f.origin_elevator)
                .bind(&f.destination_address)
                .bind(&f.destination_city)
                .bind(&f.destination_postal_code)
                .bind(f.destination_floor)
                .bind(f.destination_elevator)
                .bind(f.volume)
                .bind(f.distance_km)
                .bind(f.moving_date)
                .bind(f.needs_packing)
                .bind(f.needs_storage)
                .bind(f.needs_insurance)
                .bind(f.status)
                .bind(f.selected_quote_id)
                .bind(f.quotes_requested_at)
                .bind(f.top3_ready_at)
                .bind(f.created_at)
                .bind(f.updated_at)
                .bind(f.deleted_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Quote(q) => {
                sqlx::query(
                    r#"
                    INSERT INTO quotes (
                        id, folder_id, mover_id, source, total_amount, currency, valid_until,
                        status, reminder_count, last_reminded_at,
                        score_price, score_reputation, score_financial, score_litigation,
                        score, scored_at, validated_by, validated_at, rejection_reason,
                        created_at, updated_at, deleted_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                            $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
                    ON CONFLICT (id) DO UPDATE SET
                        total_amount = EXCLUDED.total_amount, currency = EXCLUDED.currency,
                        valid_until = EXCLUDED.valid_until, status = EXCLUDED.status,
                        reminder_count = EXCLUDED.reminder_count,
                        last_reminded_at = EXCLUDED.last_reminded_at,
                        score_price = EXCLUDED.score_price,
                        score_reputation = EXCLUDED.score_reputation,
                        score_financial = EXCLUDED.score_financial,
                        score_litigation = EXCLUDED.score_litigation,
                        score = EXCLUDED.score, scored_at = EXCLUDED.scored_at,
                        validated_by = EXCLUDED.validated_by, validated_at = EXCLUDED.validated_at,
                        rejection_reason = EXCLUDED.rejection_reason,
                        updated_at = EXCLUDED.updated_at, deleted_at = EXCLUDED.deleted_at
                    "#,
                )
                .bind(q.id)
                .bind(q.folder_id)
                .bind(q.mover_id)
                .bind(q.source)
                .bind(q.total_amount)
                .bind(&q.currency)
                .bind(q.valid_until)
                .bind(q.status)
                .bind(q.reminder_count)
                .bind(q.last_reminded_at)
                .bind(q.score_price)
                .bind(q.score_reputation)
                .bind(q.score_financial)
                .bind(q.score_litigation)
                .bind(q.score)
                .bind(q.scored_at)
                .bind(&q.validated_by)
                .bind(q.validated_at)
                .bind(&q.rejection_reason)
                .bind(q.created_at)
                .bind(q.updated_at)
                .bind(q.deleted_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Top3(t) => {
                let [first, second, third] = t.entries;
                // Snapshots are immutable: a replayed id is a no-op
                sqlx::query(
                    r#"
                    INSERT INTO top3_selections (
                        id, folder_id,
                        quote_id_1, score_1, total_amount_1,
                        quote_id_2, score_2, total_amount_2,
                        quote_id_3, score_3, total_amount_3,
                        presented_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(t.id)
                .bind(t.folder_id)
                .bind(first.quote_id)
                .bind(first.score)
                .bind(first.total_amount)
                .bind(second.quote_id)
                .bind(second.score)
                .bind(second.total_amount)
                .bind(third.quote_id)
                .bind(third.score)
                .bind(third.total_amount)
                .bind(t.presented_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Booking(b) => {
                sqlx::query(
                    r#"
                    INSERT INTO bookings (
                        id, folder_id, quote_id, mover_id, total_amount, deposit_amount,
                        remaining_amount, status, confirmed_at, contacts_exchanged_at,
                        completed_at, cancelled_at, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                    ON CONFLICT (id) DO UPDATE SET
                        status = EXCLUDED.status, confirmed_at = EXCLUDED.confirmed_at,
                        contacts_exchanged_at = EXCLUDED.contacts_exchanged_at,
                        completed_at = EXCLUDED.completed_at, cancelled_at = EXCLUDED.cancelled_at,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(b.id)
                .bind(b.folder_id)
                .bind(b.quote_id)
                .bind(b.mover_id)
                .bind(b.total_amount)
                .bind(b.deposit_amount)
                .bind(b.remaining_amount)
                .bind(b.status)
                .bind(b.confirmed_at)
                .bind(b.contacts_exchanged_at)
                .bind(b.completed_at)
                .bind(b.cancelled_at)
                .bind(b.created_at)
                .bind(b.updated_at)
                .execute(&mut *conn)
                .await?;
            }
            Record::Payment(p) => {
                sqlx::query(
                    r#"
                    INSERT INTO payments (
                        id, booking_id, payment_type, amount, commission_rate, commission_amount,
                        provider_net_amount, processor_reference, idempotency_key, status,
                        settled_at, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    ON CONFLICT (id) DO UPDATE SET
                        processor_reference = EXCLUDED.processor_reference,
                        status = EXCLUDED.status, settled_at = EXCLUDED.settled_at,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(p.id)
                .bind(p.booking_id)
                .bind(p.payment_type)
                .bind(p.amount)
                .bind(p.commission_rate)
                .bind(p.commission_amount)
                .bind(p.provider_net_amount)
                .bind(&p.processor_reference)
                .bind(&p.idempotency_key)
                .bind(p.status)
                .bind(p.settled_at)
                .bind(p.created_at)
                .bind(p.updated_at)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn apply(&self, unit: &UnitOfWork) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        for precondition in &unit.preconditions {
            if !Self::holds(&mut *tx, precondition).await? {
                tx.rollback().await?;
                return Err(StoreError::Conflict(precondition.violation()));
            }
        }

        for record in &unit.records {
            Self::upsert(&mut *tx, record).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MoveStore for PgStore {
    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_lead(&self, id: Uuid) -> StoreResult<Option<Lead>> {
        Ok(sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_leads(
        &self,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Lead>> {
        let where_clause = "deleted_at IS NULL AND ($1::lead_status IS NULL OR status = $1)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM leads WHERE {}", where_clause))
            .bind(filter.status)
            .fetch_one(&self.pool)
            .await?;

        let data = sqlx::query_as::<_, Lead>(&format!(
            "SELECT * FROM leads WHERE {} ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            where_clause
        ))
        .bind(filter.status)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedResponse {
            data,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get_client(&self, id: Uuid) -> StoreResult<Option<Client>> {
        Ok(sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_client_by_email(&self, email: &str) -> StoreResult<Option<Client>> {
        Ok(sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE lower(email) = lower($1) AND anonymized_at IS NULL",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_clients(
        &self,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Client>> {
        let where_clause = "($1 OR anonymized_at IS NULL)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM clients WHERE {}", where_clause))
            .bind(filter.include_anonymized)
            .fetch_one(&self.pool)
            .await?;

        let data = sqlx::query_as::<_, Client>(&format!(
            "SELECT * FROM clients WHERE {} ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            where_clause
        ))
        .bind(filter.include_anonymized)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedResponse {
            data,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get_mover(&self, id: Uuid) -> StoreResult<Option<Mover>> {
        let row = sqlx::query_as::<_, MoverRow>("SELECT * FROM movers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Mover::from))
    }

    async fn find_mover_by_siret(&self, siret: &str) -> StoreResult<Option<Mover>> {
        let row = sqlx::query_as::<_, MoverRow>(
            "SELECT * FROM movers WHERE siret = $1 AND deleted_at IS NULL",
        )
        .bind(siret)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Mover::from))
    }

    async fn find_mover_by_email(&self, email: &str) -> StoreResult<Option<Mover>> {
        let row = sqlx::query_as::<_, MoverRow>(
            "SELECT * FROM movers WHERE lower(email) = lower($1) AND deleted_at IS NULL",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Mover::from))
    }

    async fn list_movers(
        &self,
        filter: &MoverFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Mover>> {
        let where_clause = r#"
            deleted_at IS NULL
            AND ($1::mover_status IS NULL OR status = $1)
            AND ($2::text IS NULL OR EXISTS (
                SELECT 1 FROM unnest(coverage_zones) AS zone WHERE $2 LIKE zone || '%'
            ))
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM movers WHERE {}", where_clause))
            .bind(filter.status)
            .bind(&filter.zone)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, MoverRow>(&format!(
            "SELECT * FROM movers WHERE {} ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            where_clause
        ))
        .bind(filter.status)
        .bind(&filter.zone)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Mover::from).collect(),
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get_folder(&self, id: Uuid) -> StoreResult<Option<Folder>> {
        Ok(sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_folders(
        &self,
        filter: &FolderFilter,
        page: PageRequest,
    ) -> StoreResult<PaginatedResponse<Folder>> {
        let where_clause = r#"
            deleted_at IS NULL
            AND ($1::uuid IS NULL OR client_id = $1)
            AND ($2::folder_status IS NULL OR status = $2)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM folders WHERE {}", where_clause))
            .bind(filter.client_id)
            .bind(filter.status)
            .fetch_one(&self.pool)
            .await?;

        let data = sqlx::query_as::<_, Folder>(&format!(
            "SELECT * FROM folders WHERE {} ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            where_clause
        ))
        .bind(filter.client_id)
        .bind(filter.status)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedResponse {
            data,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get_quote(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        Ok(sqlx::query_as::<_, Quote>("SELECT * FROM quotes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> StoreResult<Vec<Quote>> {
        let statuses = filter.statuses.as_deref().map(quote_statuses);
        Ok(sqlx::query_as::<_, Quote>(
            r#"
            SELECT * FROM quotes
            WHERE deleted_at IS NULL
              AND ($1::uuid IS NULL OR folder_id = $1)
              AND ($2::uuid IS NULL OR mover_id = $2)
              AND ($3::text[] IS NULL OR status::text = ANY($3))
            ORDER BY score DESC NULLS LAST, created_at DESC, id ASC
            "#,
        )
        .bind(filter.folder_id)
        .bind(filter.mover_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_top3(&self, folder_id: Uuid) -> StoreResult<Vec<Top3Selection>> {
        let rows = sqlx::query_as::<_, Top3Row>(
            "SELECT * FROM top3_selections WHERE folder_id = $1 ORDER BY presented_at DESC, id DESC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Top3Selection::from).collect())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        Ok(sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE ($1::uuid IS NULL OR folder_id = $1)
              AND ($2::uuid IS NULL OR quote_id = $2)
              AND ($3::uuid IS NULL OR mover_id = $3)
              AND (NOT $4 OR status NOT IN ('completed', 'cancelled'))
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.folder_id)
        .bind(filter.quote_id)
        .bind(filter.mover_id)
        .bind(filter.open_only)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_payment_by_idempotency_key(&self, key: &str) -> StoreResult<Option<Payment>> {
        Ok(
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE idempotency_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_payments(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>> {
        Ok(sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn commit(&self, unit: UnitOfWork) -> StoreResult<()> {
        self.apply(&unit).await
    }
}
