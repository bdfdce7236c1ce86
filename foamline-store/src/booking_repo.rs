use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foamline_core::booking::{Booking, BookingStatus, NewBooking, PaymentRail};
use foamline_core::error::EngineError;
use foamline_core::repository::BookingStore;
use sqlx::PgPool;

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, street_address, \
     postal_code, party_size, package_id, event_date, event_time, notes, status, payment_rail, \
     expected_amount_cents, received_amount_cents, amount_paid_cents, travel_fee_cents, \
     travel_distance_miles, checkout_session_id, evidence_ref, payment_verified, verified_at, \
     verification_notes, needs_manual_review, confirmation_number, pending_expires_at, \
     payment_reminder_sent_at, event_reminder_48h_sent_at, event_reminder_24h_sent_at, \
     cancellation_note, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    street_address: String,
    postal_code: String,
    party_size: i32,
    package_id: String,
    event_date: String,
    event_time: String,
    notes: Option<String>,
    status: String,
    payment_rail: Option<String>,
    expected_amount_cents: Option<i64>,
    received_amount_cents: Option<i64>,
    amount_paid_cents: Option<i64>,
    travel_fee_cents: Option<i64>,
    travel_distance_miles: Option<f64>,
    checkout_session_id: Option<String>,
    evidence_ref: Option<String>,
    payment_verified: bool,
    verified_at: Option<DateTime<Utc>>,
    verification_notes: Option<String>,
    needs_manual_review: bool,
    confirmation_number: Option<String>,
    pending_expires_at: Option<DateTime<Utc>>,
    payment_reminder_sent_at: Option<DateTime<Utc>>,
    event_reminder_48h_sent_at: Option<DateTime<Utc>>,
    event_reminder_24h_sent_at: Option<DateTime<Utc>>,
    cancellation_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = EngineError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| EngineError::Storage(format!("bad status in row {}: {}", row.id, row.status)))?;
        let payment_rail = match row.payment_rail.as_deref() {
            None => None,
            Some(s) => Some(PaymentRail::parse(s).ok_or_else(|| {
                EngineError::Storage(format!("bad payment rail in row {}: {s}", row.id))
            })?),
        };

        Ok(Booking {
            id: row.id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            street_address: row.street_address,
            postal_code: row.postal_code,
            party_size: row.party_size,
            package_id: row.package_id,
            event_date: row.event_date,
            event_time: row.event_time,
            notes: row.notes,
            status,
            payment_rail,
            expected_amount_cents: row.expected_amount_cents,
            received_amount_cents: row.received_amount_cents,
            amount_paid_cents: row.amount_paid_cents,
            travel_fee_cents: row.travel_fee_cents,
            travel_distance_miles: row.travel_distance_miles,
            checkout_session_id: row.checkout_session_id,
            evidence_ref: row.evidence_ref,
            payment_verified: row.payment_verified,
            verified_at: row.verified_at,
            verification_notes: row.verification_notes,
            needs_manual_review: row.needs_manual_review,
            confirmation_number: row.confirmation_number,
            pending_expires_at: row.pending_expires_at,
            payment_reminder_sent_at: row.payment_reminder_sent_at,
            event_reminder_48h_sent_at: row.event_reminder_48h_sent_at,
            event_reminder_24h_sent_at: row.event_reminder_24h_sent_at,
            cancellation_note: row.cancellation_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn storage_err(err: sqlx::Error) -> EngineError {
    EngineError::Storage(err.to_string())
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create(&self, new: NewBooking) -> Result<Booking, EngineError> {
        let sql = format!(
            "INSERT INTO bookings (customer_name, customer_email, customer_phone, street_address, \
             postal_code, party_size, package_id, event_date, event_time, notes, \
             pending_expires_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) \
             RETURNING {BOOKING_COLUMNS}"
        );
        let row: BookingRow = sqlx::query_as(&sql)
            .bind(&new.customer_name)
            .bind(&new.customer_email)
            .bind(&new.customer_phone)
            .bind(&new.street_address)
            .bind(&new.postal_code)
            .bind(new.party_size)
            .bind(&new.package_id)
            .bind(&new.event_date)
            .bind(&new.event_time)
            .bind(&new.notes)
            .bind(new.pending_expires_at)
            .bind(new.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        row.try_into()
    }

    async fn get(&self, id: i64) -> Result<Option<Booking>, EngineError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Booking>, EngineError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY id");
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, EngineError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = $1 ORDER BY id");
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn update(&self, booking: &Booking) -> Result<(), EngineError> {
        // Lifecycle fields (status, amount_paid_cents, confirmation_number)
        // move only through the conditional operations below.
        let result = sqlx::query(
            "UPDATE bookings SET \
                customer_name = $2, customer_email = $3, customer_phone = $4, \
                street_address = $5, postal_code = $6, party_size = $7, package_id = $8, \
                event_date = $9, event_time = $10, notes = $11, payment_rail = $12, \
                expected_amount_cents = $13, received_amount_cents = $14, \
                travel_fee_cents = $15, travel_distance_miles = $16, \
                checkout_session_id = $17, evidence_ref = $18, payment_verified = $19, \
                verified_at = $20, verification_notes = $21, needs_manual_review = $22, \
                pending_expires_at = $23, payment_reminder_sent_at = $24, \
                event_reminder_48h_sent_at = $25, event_reminder_24h_sent_at = $26, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(booking.id)
        .bind(&booking.customer_name)
        .bind(&booking.customer_email)
        .bind(&booking.customer_phone)
        .bind(&booking.street_address)
        .bind(&booking.postal_code)
        .bind(booking.party_size)
        .bind(&booking.package_id)
        .bind(&booking.event_date)
        .bind(&booking.event_time)
        .bind(&booking.notes)
        .bind(booking.payment_rail.map(|r| r.as_str()))
        .bind(booking.expected_amount_cents)
        .bind(booking.received_amount_cents)
        .bind(booking.travel_fee_cents)
        .bind(booking.travel_distance_miles)
        .bind(&booking.checkout_session_id)
        .bind(&booking.evidence_ref)
        .bind(booking.payment_verified)
        .bind(booking.verified_at)
        .bind(&booking.verification_notes)
        .bind(booking.needs_manual_review)
        .bind(booking.pending_expires_at)
        .bind(booking.payment_reminder_sent_at)
        .bind(booking.event_reminder_48h_sent_at)
        .bind(booking.event_reminder_24h_sent_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::not_found(format!("booking {}", booking.id)));
        }
        Ok(())
    }

    async fn confirm_payment(
        &self,
        id: i64,
        amount_cents: i64,
        confirmation_number: &str,
    ) -> Result<bool, EngineError> {
        // Single conditional update: pending and unpaid, or nothing happens.
        let result = sqlx::query(
            "UPDATE bookings SET status = 'confirmed', amount_paid_cents = $2, \
                confirmation_number = $3, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' AND amount_paid_cents IS NULL",
        )
        .bind(id)
        .bind(amount_cents)
        .bind(confirmation_number)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel(
        &self,
        id: i64,
        note: &str,
        allow_confirmed: bool,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'cancelled', cancellation_note = $2, updated_at = NOW() \
             WHERE id = $1 AND (status = 'pending' OR (status = 'confirmed' AND $3))",
        )
        .bind(id)
        .bind(note)
        .bind(allow_confirmed)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete(&self, id: i64) -> Result<bool, EngineError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'completed', updated_at = NOW() \
             WHERE id = $1 AND status = 'confirmed'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }
}
