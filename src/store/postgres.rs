use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info};

use super::{normalize_search, Store};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::models::{
    Booking, BookingDetails, BookingId, Event, EventDetails, EventId, NewBooking, NewEvent,
    NewVenue, Venue, VenueId,
};
use crate::rules::truncated_date;

const VENUE_COLUMNS: &str = "venue_id, venue_name, venue_location, venue_capacity, image_url";
const EVENT_COLUMNS: &str = "event_id, event_name, event_date, event_description, venue_id";
const BOOKING_COLUMNS: &str = "booking_id, event_id, venue_id, booking_date";

const EVENT_DETAILS_SELECT: &str = r#"
    SELECT e.event_id, e.event_name, e.event_date, e.event_description, e.venue_id, v.venue_name
    FROM events e
    JOIN venues v ON v.venue_id = e.venue_id
"#;

const BOOKING_DETAILS_SELECT: &str = r#"
    SELECT b.booking_id, b.event_id, b.venue_id, b.booking_date,
           e.event_name, e.event_date, v.venue_name
    FROM bookings b
    JOIN events e ON e.event_id = b.event_id
    JOIN venues v ON v.venue_id = b.venue_id
"#;

// $1 venue, $2 incoming event, $3 booking being edited (NULL on create).
const CONFLICT_EXISTS: &str = r#"
    SELECT EXISTS(
        SELECT 1
        FROM bookings b
        JOIN events e ON e.event_id = b.event_id
        WHERE b.venue_id = $1
          AND e.event_date::date = (SELECT event_date::date FROM events WHERE event_id = $2)
          AND b.event_id <> $2
          AND ($3::BIGINT IS NULL OR b.booking_id <> $3)
    )
"#;

// $1 event being rescheduled, $2 its new date. Any venue one of its bookings
// names that holds a booking for another event on the new day.
const RESCHEDULE_CONFLICT_EXISTS: &str = r#"
    SELECT EXISTS(
        SELECT 1
        FROM bookings mine
        JOIN bookings other ON other.venue_id = mine.venue_id AND other.event_id <> mine.event_id
        JOIN events e ON e.event_id = other.event_id
        WHERE mine.event_id = $1
          AND e.event_date::date = $2::date
    )
"#;

/// `%text%` with LIKE wildcards in the user's text escaped.
fn like_pattern(search: Option<&str>) -> Option<String> {
    normalize_search(search).map(|s| {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    /// Opens a transaction holding the venue's advisory lock and re-runs the
    /// conflict check inside it. The lock is released on commit or rollback.
    ///
    /// The event row is share-locked before the venue, the same order
    /// `update_event` takes them in, so a concurrent reschedule of the event
    /// is either fully visible to the recheck or waits for it.
    async fn lock_venue_for_booking(
        &self,
        venue_id: VenueId,
        event_id: EventId,
        editing: Option<BookingId>,
    ) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT 1 FROM events WHERE event_id = $1 FOR SHARE")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        lock_venue(&mut tx, venue_id).await?;

        let clash = sqlx::query_scalar::<_, bool>(CONFLICT_EXISTS)
            .bind(venue_id)
            .bind(event_id)
            .bind(editing)
            .fetch_one(&mut *tx)
            .await?;

        if clash {
            debug!(%venue_id, %event_id, "locked recheck found a same-day booking");
            tx.rollback().await?;
            return Err(StoreError::BookingConflict);
        }

        Ok(tx)
    }
}

async fn lock_venue(tx: &mut Transaction<'static, Postgres>, venue_id: VenueId) -> Result<(), StoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(venue_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn find_venue_by_id(&self, venue_id: VenueId) -> Result<Option<Venue>, StoreError> {
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE venue_id = $1");
        Ok(sqlx::query_as::<_, Venue>(&sql)
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_event_by_id(&self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_event_details(&self, event_id: EventId) -> Result<Option<EventDetails>, StoreError> {
        let sql = format!("{EVENT_DETAILS_SELECT} WHERE e.event_id = $1");
        Ok(sqlx::query_as::<_, EventDetails>(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_booking_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, StoreError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1");
        Ok(sqlx::query_as::<_, Booking>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_booking_details(
        &self,
        booking_id: BookingId,
    ) -> Result<Option<BookingDetails>, StoreError> {
        let sql = format!("{BOOKING_DETAILS_SELECT} WHERE b.booking_id = $1");
        Ok(sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_venues(&self, search: Option<&str>) -> Result<Vec<Venue>, StoreError> {
        let sql = format!(
            "SELECT {VENUE_COLUMNS} FROM venues
             WHERE ($1::TEXT IS NULL OR venue_name ILIKE $1)
             ORDER BY venue_id"
        );
        Ok(sqlx::query_as::<_, Venue>(&sql)
            .bind(like_pattern(search))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_events(&self, search: Option<&str>) -> Result<Vec<EventDetails>, StoreError> {
        let sql = format!(
            "{EVENT_DETAILS_SELECT}
             WHERE ($1::TEXT IS NULL OR e.event_name ILIKE $1 OR v.venue_name ILIKE $1)
             ORDER BY e.event_id"
        );
        Ok(sqlx::query_as::<_, EventDetails>(&sql)
            .bind(like_pattern(search))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_bookings(&self, search: Option<&str>) -> Result<Vec<BookingDetails>, StoreError> {
        let sql = format!(
            "{BOOKING_DETAILS_SELECT}
             WHERE ($1::TEXT IS NULL OR v.venue_name ILIKE $1 OR e.event_name ILIKE $1)
             ORDER BY b.booking_id"
        );
        Ok(sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(like_pattern(search))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_bookings_by_venue(&self, venue_id: VenueId) -> Result<Vec<BookingDetails>, StoreError> {
        let sql = format!("{BOOKING_DETAILS_SELECT} WHERE b.venue_id = $1 ORDER BY b.booking_id");
        Ok(sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(venue_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_bookings_by_event(&self, event_id: EventId) -> Result<Vec<Booking>, StoreError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE event_id = $1 ORDER BY booking_id"
        );
        Ok(sqlx::query_as::<_, Booking>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_events_by_venue(&self, venue_id: VenueId) -> Result<Vec<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE venue_id = $1 ORDER BY event_id");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(venue_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_venue(&self, venue: &NewVenue) -> Result<Venue, StoreError> {
        let sql = format!(
            "INSERT INTO venues (venue_name, venue_location, venue_capacity, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING {VENUE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Venue>(&sql)
            .bind(&venue.venue_name)
            .bind(&venue.venue_location)
            .bind(venue.venue_capacity)
            .bind(&venue.image_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_venue(&self, venue: &Venue) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE venues
             SET venue_name = $1, venue_location = $2, venue_capacity = $3, image_url = $4
             WHERE venue_id = $5",
        )
        .bind(&venue.venue_name)
        .bind(&venue.venue_location)
        .bind(venue.venue_capacity)
        .bind(&venue.image_url)
        .bind(venue.venue_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_venue(&self, venue_id: VenueId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM venues WHERE venue_id = $1")
            .bind(venue_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<Event, StoreError> {
        let sql = format!(
            "INSERT INTO events (event_name, event_date, event_description, venue_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {EVENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(&event.event_name)
            .bind(event.event_date)
            .bind(&event.event_description)
            .bind(event.venue_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_event(&self, event: &Event) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, NaiveDateTime>(
            "SELECT event_date FROM events WHERE event_id = $1 FOR UPDATE",
        )
        .bind(event.event_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(false);
        };

        if truncated_date(current) != event.event_day() {
            // Venues are locked in ascending order.
            let venues = sqlx::query_scalar::<_, VenueId>(
                "SELECT DISTINCT venue_id FROM bookings WHERE event_id = $1 ORDER BY venue_id",
            )
            .bind(event.event_id)
            .fetch_all(&mut *tx)
            .await?;
            for venue_id in venues {
                lock_venue(&mut tx, venue_id).await?;
            }

            let clash = sqlx::query_scalar::<_, bool>(RESCHEDULE_CONFLICT_EXISTS)
                .bind(event.event_id)
                .bind(event.event_date)
                .fetch_one(&mut *tx)
                .await?;
            if clash {
                debug!(event_id = %event.event_id, "reschedule recheck found a same-day booking");
                tx.rollback().await?;
                return Err(StoreError::BookingConflict);
            }
        }

        let result = sqlx::query(
            "UPDATE events
             SET event_name = $1, event_date = $2, event_description = $3, venue_id = $4
             WHERE event_id = $5",
        )
        .bind(&event.event_name)
        .bind(event.event_date)
        .bind(&event.event_description)
        .bind(event.venue_id)
        .bind(event.event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_event(&self, event_id: EventId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_booking(&self, booking: &NewBooking) -> Result<Booking, StoreError> {
        let mut tx = self
            .lock_venue_for_booking(booking.venue_id, booking.event_id, None)
            .await?;

        let sql = format!(
            "INSERT INTO bookings (event_id, venue_id, booking_date)
             VALUES ($1, $2, $3)
             RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking.event_id)
            .bind(booking.venue_id)
            .bind(booking.booking_date)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<bool, StoreError> {
        let mut tx = self
            .lock_venue_for_booking(booking.venue_id, booking.event_id, Some(booking.booking_id))
            .await?;

        let result = sqlx::query(
            "UPDATE bookings
             SET event_id = $1, venue_id = $2, booking_date = $3
             WHERE booking_id = $4",
        )
        .bind(booking.event_id)
        .bind(booking.venue_id)
        .bind(booking.booking_date)
        .bind(booking.booking_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_booking(&self, booking_id: BookingId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
