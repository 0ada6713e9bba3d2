//! SQL DDL for initializing the flight school database.
//!
//! Decimal columns are TEXT (see `codec`). Timestamps are TEXT in the
//! normalized RFC 3339 form, so `<` on them orders instants.
//!
//! The booking triggers reject overlapping live bookings that share an
//! aircraft or an instructor. Handlers check first and report the conflicting
//! ids; the triggers catch writes that race past that check.

pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    phone TEXT NULL,
    role TEXT NOT NULL DEFAULT 'member',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS instructors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
    rating TEXT NULL,
    hourly_rate TEXT NOT NULL,
    employment_type TEXT NOT NULL DEFAULT 'contractor',
    status TEXT NOT NULL DEFAULT 'active',
    notes TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS aircraft (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    registration TEXT NOT NULL UNIQUE,
    aircraft_type TEXT NOT NULL,
    hourly_rate TEXT NOT NULL,
    charge_basis TEXT NOT NULL DEFAULT 'hobbs',
    total_time_method TEXT NOT NULL DEFAULT 'hobbs',
    current_hobbs TEXT NOT NULL DEFAULT '0',
    current_tacho TEXT NOT NULL DEFAULT '0',
    total_hours TEXT NOT NULL DEFAULT '0',
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS aircraft_components (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    aircraft_id INTEGER NOT NULL REFERENCES aircraft(id),
    name TEXT NOT NULL,
    interval_hours TEXT NULL,
    interval_days INTEGER NULL,
    last_completed_hours TEXT NULL,
    last_completed_at TEXT NULL,
    extension_hours TEXT NULL,
    notes TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_components_aircraft ON aircraft_components(aircraft_id)",
    r#"
CREATE TABLE IF NOT EXISTS equipment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    serial_number TEXT NULL,
    status TEXT NOT NULL DEFAULT 'available',
    notes TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS equipment_issuance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    equipment_id INTEGER NOT NULL REFERENCES equipment(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    issued_at TEXT NOT NULL,
    expected_return_at TEXT NULL,
    returned_at TEXT NULL,
    notes TEXT NULL
)"#,
    // at most one outstanding issuance per item
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_issuance_outstanding ON equipment_issuance(equipment_id) WHERE returned_at IS NULL",
    r#"
CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    instructor_id INTEGER NULL REFERENCES instructors(id),
    aircraft_id INTEGER NULL REFERENCES aircraft(id),
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'unconfirmed',
    booking_type TEXT NOT NULL DEFAULT 'flight',
    purpose TEXT NULL,
    remarks TEXT NULL,
    cancellation_reason TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT NULL,
    CHECK (end_time > start_time)
)"#,
    "CREATE INDEX IF NOT EXISTS idx_bookings_aircraft_time ON bookings(aircraft_id, start_time)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_instructor_time ON bookings(instructor_id, start_time)",
    r#"
CREATE TRIGGER IF NOT EXISTS bookings_no_overlap_insert
BEFORE INSERT ON bookings
WHEN NEW.status != 'cancelled' AND NEW.deleted_at IS NULL AND EXISTS (
    SELECT 1 FROM bookings b
    WHERE b.status != 'cancelled' AND b.deleted_at IS NULL
      AND (b.aircraft_id = NEW.aircraft_id OR b.instructor_id = NEW.instructor_id)
      AND b.start_time < NEW.end_time AND NEW.start_time < b.end_time
)
BEGIN
    SELECT RAISE(ABORT, 'booking_conflict');
END"#,
    r#"
CREATE TRIGGER IF NOT EXISTS bookings_no_overlap_update
BEFORE UPDATE OF start_time, end_time, aircraft_id, instructor_id, status, deleted_at ON bookings
WHEN NEW.status != 'cancelled' AND NEW.deleted_at IS NULL AND EXISTS (
    SELECT 1 FROM bookings b
    WHERE b.id != NEW.id AND b.status != 'cancelled' AND b.deleted_at IS NULL
      AND (b.aircraft_id = NEW.aircraft_id OR b.instructor_id = NEW.instructor_id)
      AND b.start_time < NEW.end_time AND NEW.start_time < b.end_time
)
BEGIN
    SELECT RAISE(ABORT, 'booking_conflict');
END"#,
    r#"
CREATE TABLE IF NOT EXISTS flight_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    booking_id INTEGER NOT NULL UNIQUE REFERENCES bookings(id),
    aircraft_id INTEGER NOT NULL REFERENCES aircraft(id),
    hobbs_start TEXT NULL,
    hobbs_end TEXT NULL,
    tacho_start TEXT NULL,
    tacho_end TEXT NULL,
    airswitch_start TEXT NULL,
    airswitch_end TEXT NULL,
    solo_end_hobbs TEXT NULL,
    solo_end_tacho TEXT NULL,
    billing_hours TEXT NOT NULL,
    dual_time TEXT NOT NULL,
    solo_time TEXT NOT NULL,
    credited_hours TEXT NOT NULL,
    total_hours_start TEXT NULL,
    total_hours_end TEXT NULL,
    applied INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS tax_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    rate TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_number TEXT NULL UNIQUE,
    user_id INTEGER NOT NULL REFERENCES users(id),
    booking_id INTEGER NULL UNIQUE REFERENCES bookings(id),
    status TEXT NOT NULL DEFAULT 'draft',
    tax_rate TEXT NOT NULL,
    subtotal TEXT NOT NULL DEFAULT '0',
    tax_total TEXT NOT NULL DEFAULT '0',
    total_amount TEXT NOT NULL DEFAULT '0',
    total_paid TEXT NOT NULL DEFAULT '0',
    balance_due TEXT NOT NULL DEFAULT '0',
    issue_date TEXT NULL,
    due_date TEXT NULL,
    notes TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    voided_at TEXT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS invoice_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id INTEGER NOT NULL REFERENCES invoices(id),
    source TEXT NULL,
    description TEXT NOT NULL,
    quantity TEXT NOT NULL,
    unit_price TEXT NOT NULL,
    rate_inclusive TEXT NOT NULL,
    amount TEXT NOT NULL,
    tax_rate TEXT NOT NULL,
    tax_amount TEXT NOT NULL,
    line_total TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice ON invoice_items(invoice_id)",
    r#"
CREATE TABLE IF NOT EXISTS payments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id INTEGER NOT NULL REFERENCES invoices(id),
    amount TEXT NOT NULL,
    method TEXT NOT NULL,
    reference TEXT NULL,
    paid_at TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS lesson_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    booking_id INTEGER NOT NULL REFERENCES bookings(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    instructor_id INTEGER NULL REFERENCES instructors(id),
    lesson TEXT NOT NULL,
    status TEXT NOT NULL,
    comments TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS flight_authorizations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    booking_id INTEGER NOT NULL UNIQUE REFERENCES bookings(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    purpose TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    approved_by INTEGER NULL REFERENCES instructors(id),
    decided_at TEXT NULL,
    rejection_reason TEXT NULL,
    created_at TEXT NOT NULL
)"#,
];
