use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::errors::PersistenceError;
use crate::models::{
    Booking, BookingPatch, BookingStatus, Customer, InventoryItem, Mechanic, Money, Shift,
    ShiftsByMechanic, Vehicle,
};

pub type QueryResult<T> = Result<T, PersistenceError>;

// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn format_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(field: &str, s: &str) -> QueryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| PersistenceError::Malformed(format!("{field}: {s:?} is not a timestamp")))
}

fn parse_date(field: &str, s: &str) -> QueryResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| PersistenceError::Malformed(format!("{field}: {s:?} is not a date")))
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

// ── Customers ──

pub fn insert_customer(conn: &Connection, customer: &Customer) -> QueryResult<()> {
    conn.execute(
        "INSERT INTO customers (customer_id, first_name, last_name, email, phone, date_of_birth, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            customer.customer_id,
            customer.first_name,
            customer.last_name,
            customer.email,
            customer.phone,
            customer.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            customer.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn update_customer(conn: &Connection, customer: &Customer) -> QueryResult<bool> {
    let count = conn.execute(
        "UPDATE customers SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
             date_of_birth = ?5, is_active = ?6
         WHERE customer_id = ?7",
        params![
            customer.first_name,
            customer.last_name,
            customer.email,
            customer.phone,
            customer.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            customer.is_active as i32,
            customer.customer_id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_customer(conn: &Connection, customer_id: &str) -> QueryResult<Option<Customer>> {
    let result = conn
        .query_row(
            "SELECT customer_id, first_name, last_name, email, phone, date_of_birth, is_active
             FROM customers WHERE customer_id = ?1",
            params![customer_id],
            |row| Ok(parse_customer_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn list_customers(conn: &Connection) -> QueryResult<Vec<Customer>> {
    let mut stmt = conn.prepare(
        "SELECT customer_id, first_name, last_name, email, phone, date_of_birth, is_active
         FROM customers ORDER BY last_name ASC, first_name ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(parse_customer_row(row)))?;

    let mut customers = vec![];
    for row in rows {
        customers.push(row??);
    }
    Ok(customers)
}

fn parse_customer_row(row: &rusqlite::Row) -> QueryResult<Customer> {
    let date_of_birth: Option<String> = row.get(5)?;
    Ok(Customer {
        customer_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        date_of_birth: date_of_birth
            .map(|d| parse_date("date_of_birth", &d))
            .transpose()?,
        is_active: row.get::<_, i32>(6)? != 0,
    })
}

// ── Mechanics & Shifts ──

pub fn insert_mechanic(conn: &Connection, mechanic: &Mechanic) -> QueryResult<()> {
    conn.execute(
        "INSERT INTO mechanics (id, name, email, specialization, is_active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            mechanic.id,
            mechanic.name,
            mechanic.email,
            mechanic.specialization,
            mechanic.is_active as i32,
        ],
    )?;
    Ok(())
}

fn parse_mechanic_row(row: &rusqlite::Row) -> rusqlite::Result<Mechanic> {
    Ok(Mechanic {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        specialization: row.get(3)?,
        is_active: row.get::<_, i32>(4)? != 0,
    })
}

pub fn get_mechanic(conn: &Connection, id: &str) -> QueryResult<Option<Mechanic>> {
    let mechanic = conn
        .query_row(
            "SELECT id, name, email, specialization, is_active FROM mechanics WHERE id = ?1",
            params![id],
            parse_mechanic_row,
        )
        .optional()?;
    Ok(mechanic)
}

pub fn list_mechanics(conn: &Connection) -> QueryResult<Vec<Mechanic>> {
    let mut stmt =
        conn.prepare("SELECT id, name, email, specialization, is_active FROM mechanics ORDER BY name ASC")?;
    let rows = stmt.query_map([], parse_mechanic_row)?;

    let mut mechanics = vec![];
    for row in rows {
        mechanics.push(row?);
    }
    Ok(mechanics)
}

pub fn insert_shift(conn: &Connection, shift: &Shift) -> QueryResult<()> {
    conn.execute(
        "INSERT INTO shifts (id, mechanic_id, start_time, end_time) VALUES (?1, ?2, ?3, ?4)",
        params![
            shift.id,
            shift.mechanic_id,
            format_ts(&shift.start),
            format_ts(&shift.end),
        ],
    )?;
    Ok(())
}

fn parse_shift_row(row: &rusqlite::Row) -> QueryResult<Shift> {
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;
    Ok(Shift {
        id: row.get(0)?,
        mechanic_id: row.get(1)?,
        start: parse_ts("shift start", &start)?,
        end: parse_ts("shift end", &end)?,
    })
}

pub fn get_shift(conn: &Connection, id: &str) -> QueryResult<Option<Shift>> {
    let result = conn
        .query_row(
            "SELECT id, mechanic_id, start_time, end_time FROM shifts WHERE id = ?1",
            params![id],
            |row| Ok(parse_shift_row(row)),
        )
        .optional()?;
    result.transpose()
}

/// Shifts grouped by mechanic. Every requested id gets an entry, empty when
/// the mechanic has no shifts.
pub fn get_shifts_for_mechanics(conn: &Connection, mechanic_ids: &[String]) -> QueryResult<ShiftsByMechanic> {
    let mut by_mechanic: ShiftsByMechanic = mechanic_ids
        .iter()
        .map(|id| (id.clone(), Vec::new()))
        .collect();
    if mechanic_ids.is_empty() {
        return Ok(by_mechanic);
    }

    let sql = format!(
        "SELECT id, mechanic_id, start_time, end_time FROM shifts
         WHERE mechanic_id IN ({}) ORDER BY start_time ASC",
        placeholders(mechanic_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(mechanic_ids.iter()), |row| {
        Ok(parse_shift_row(row))
    })?;

    for row in rows {
        let shift = row??;
        by_mechanic
            .entry(shift.mechanic_id.clone())
            .or_default()
            .push(shift);
    }
    Ok(by_mechanic)
}

/// Hands a shift over to another mechanic.
pub fn reassign_shift(conn: &Connection, shift_id: &str, mechanic_id: &str) -> QueryResult<bool> {
    let count = conn.execute(
        "UPDATE shifts SET mechanic_id = ?1 WHERE id = ?2",
        params![mechanic_id, shift_id],
    )?;
    Ok(count > 0)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, customer_id, mechanic_id, vehicle_make, vehicle_model, vehicle_year, \
     service_type, scheduled_time, notes, status, revision, created_at, updated_at";

pub enum BookingFilter<'a> {
    All,
    Customer(&'a str),
    Mechanic(&'a str),
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> QueryResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            booking.id,
            booking.customer_id,
            booking.mechanic_id,
            booking.vehicle.make,
            booking.vehicle.model,
            booking.vehicle.year,
            booking.service_type,
            format_ts(&booking.scheduled_time),
            booking.notes,
            booking.status.as_str(),
            booking.revision,
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> QueryResult<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn get_bookings(conn: &Connection, filter: BookingFilter<'_>) -> QueryResult<Vec<Booking>> {
    let (clause, arg) = match filter {
        BookingFilter::All => ("", None),
        BookingFilter::Customer(id) => ("WHERE customer_id = ?1", Some(id)),
        BookingFilter::Mechanic(id) => ("WHERE mechanic_id = ?1", Some(id)),
    };
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings {clause} ORDER BY scheduled_time ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(arg), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Writes the fields set in `patch` and bumps the revision. With
/// `expected_revision`, only a row still at that revision is updated.
pub fn update_booking_fields(
    conn: &Connection,
    id: &str,
    patch: &BookingPatch,
    expected_revision: Option<i64>,
) -> QueryResult<Booking> {
    let count = if patch.is_empty() {
        0
    } else {
        conn.execute(
            "UPDATE bookings SET
               status = COALESCE(?1, status),
               mechanic_id = COALESCE(?2, mechanic_id),
               revision = revision + 1,
               updated_at = ?3
             WHERE id = ?4 AND (?5 IS NULL OR revision = ?5)",
            params![
                patch.status.map(|s| s.as_str()),
                patch.mechanic_id,
                format_ts(&Utc::now()),
                id,
                expected_revision,
            ],
        )?
    };

    match get_booking_by_id(conn, id)? {
        None => Err(PersistenceError::NotFound(format!("booking {id}"))),
        Some(booking) if count == 0 && !patch.is_empty() => Err(PersistenceError::Conflict {
            id: booking.id,
            expected: expected_revision.unwrap_or(booking.revision),
        }),
        Some(booking) => Ok(booking),
    }
}

fn parse_booking_row(row: &rusqlite::Row) -> QueryResult<Booking> {
    let scheduled_time: String = row.get(7)?;
    let status: String = row.get(9)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        mechanic_id: row.get(2)?,
        vehicle: Vehicle {
            make: row.get(3)?,
            model: row.get(4)?,
            year: row.get(5)?,
        },
        service_type: row.get(6)?,
        scheduled_time: parse_ts("scheduled_time", &scheduled_time)?,
        notes: row.get(8)?,
        status: BookingStatus::parse(&status)
            .ok_or_else(|| PersistenceError::Malformed(format!("status: {status:?}")))?,
        revision: row.get(10)?,
        created_at: parse_ts("created_at", &created_at)?,
        updated_at: parse_ts("updated_at", &updated_at)?,
    })
}

// ── Inventory ──

pub fn insert_inventory_item(conn: &Connection, item: &InventoryItem) -> QueryResult<()> {
    conn.execute(
        "INSERT INTO inventory_items (id, item_name, quantity, price_cents, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            item.id,
            item.item_name,
            item.quantity,
            item.price.cents(),
            item.description,
        ],
    )?;
    Ok(())
}

fn parse_inventory_row(row: &rusqlite::Row) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        item_name: row.get(1)?,
        quantity: row.get(2)?,
        price: Money(row.get(3)?),
        description: row.get(4)?,
    })
}

pub fn get_inventory_item(conn: &Connection, id: &str) -> QueryResult<Option<InventoryItem>> {
    let item = conn
        .query_row(
            "SELECT id, item_name, quantity, price_cents, description FROM inventory_items WHERE id = ?1",
            params![id],
            parse_inventory_row,
        )
        .optional()?;
    Ok(item)
}

pub fn list_inventory(conn: &Connection) -> QueryResult<Vec<InventoryItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, item_name, quantity, price_cents, description FROM inventory_items ORDER BY item_name ASC",
    )?;
    let rows = stmt.query_map([], parse_inventory_row)?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn update_stock(conn: &Connection, id: &str, quantity: i64) -> QueryResult<bool> {
    let count = conn.execute(
        "UPDATE inventory_items SET quantity = ?1 WHERE id = ?2",
        params![quantity, id],
    )?;
    Ok(count > 0)
}
