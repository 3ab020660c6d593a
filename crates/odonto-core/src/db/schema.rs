//! SQLite schema definition.

/// Complete database schema for odonto-core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Reference entities
-- ============================================================================

CREATE TABLE IF NOT EXISTS clinics (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    address TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS practitioners (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS treatments (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    duration_minutes INTEGER,
    price REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    -- Not UNIQUE: duplicate national ids do occur (imports, re-registration)
    -- and are what the duplicate resolver exists to clean up
    national_id TEXT,
    phone TEXT,
    email TEXT,
    address TEXT,
    birth_date TEXT,
    origin TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_national_id ON patients(national_id);
CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    clinic_id TEXT NOT NULL REFERENCES clinics(id),
    practitioner_id TEXT REFERENCES practitioners(id),
    treatment_id TEXT REFERENCES treatments(id),
    datetime_start TEXT NOT NULL,
    datetime_end TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'confirmed'
        CHECK (status IN ('confirmed', 'cancelled', 'attended', 'no_show')),
    category TEXT CHECK (category IN ('normal', 'surgery', 'lab_work')),
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (datetime_start < datetime_end)
);

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_practitioner
    ON appointments(practitioner_id, datetime_start, datetime_end);
CREATE INDEX IF NOT EXISTS idx_appointments_start ON appointments(datetime_start);

-- ============================================================================
-- Medical records and leads
-- ============================================================================

CREATE TABLE IF NOT EXISTS medical_records (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    appointment_id TEXT REFERENCES appointments(id),
    treatment_id TEXT REFERENCES treatments(id),
    practitioner_id TEXT REFERENCES practitioners(id),
    record_date TEXT NOT NULL,
    notes TEXT,
    attachments TEXT NOT NULL DEFAULT '[]',      -- JSON array of file paths
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_medical_records_patient ON medical_records(patient_id);

CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    origin TEXT,
    message TEXT,
    status TEXT,
    patient_id TEXT REFERENCES patients(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_leads_patient ON leads(patient_id);

-- ============================================================================
-- Odontogram: event log (append-only) + derived state (mutable)
-- ============================================================================

CREATE TABLE IF NOT EXISTS tooth_events (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    tooth_number INTEGER NOT NULL CHECK (
        tooth_number BETWEEN 11 AND 18 OR tooth_number BETWEEN 21 AND 28 OR
        tooth_number BETWEEN 31 AND 38 OR tooth_number BETWEEN 41 AND 48
    ),
    kind TEXT NOT NULL CHECK (kind IN (
        'healthy', 'caries', 'filled', 'crown', 'root_canal', 'missing',
        'extraction', 'implant', 'bridge', 'fracture', 'watch'
    )),
    treatment_id TEXT REFERENCES treatments(id),
    appointment_id TEXT REFERENCES appointments(id),
    medical_record_id TEXT REFERENCES medical_records(id),
    note TEXT,
    event_date TEXT NOT NULL,
    created_by TEXT REFERENCES practitioners(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_tooth_events_patient_tooth
    ON tooth_events(patient_id, tooth_number);

-- The event log is the source of truth: rows never change once written.
-- Rows only ever disappear through the patient cascade (merge cleanup).
CREATE TRIGGER IF NOT EXISTS tooth_events_no_update BEFORE UPDATE ON tooth_events
BEGIN
    SELECT RAISE(ABORT, 'Tooth events are append-only');
END;

CREATE TABLE IF NOT EXISTS tooth_states (
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    tooth_number INTEGER NOT NULL,
    current_status TEXT NOT NULL,
    last_event_id TEXT NOT NULL REFERENCES tooth_events(id) ON DELETE CASCADE,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (patient_id, tooth_number)
);

-- ============================================================================
-- Inventory: materials + stock movements
-- ============================================================================

CREATE TABLE IF NOT EXISTS materials (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit TEXT NOT NULL,
    current_stock REAL NOT NULL DEFAULT 0,
    min_stock REAL NOT NULL DEFAULT 0,
    target_stock REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS stock_movements (
    id TEXT PRIMARY KEY,
    material_id TEXT NOT NULL REFERENCES materials(id),
    movement_type TEXT NOT NULL CHECK (movement_type IN ('inbound', 'outbound', 'adjustment')),
    quantity REAL NOT NULL CHECK (quantity > 0),
    reason TEXT,
    created_by TEXT REFERENCES practitioners(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_stock_movements_material ON stock_movements(material_id);

-- Stock is maintained only through movements; outbound moves that would go
-- negative are rejected before the row lands
CREATE TRIGGER IF NOT EXISTS stock_movements_check_outbound BEFORE INSERT ON stock_movements
WHEN new.movement_type = 'outbound'
BEGIN
    SELECT CASE
        WHEN (SELECT current_stock FROM materials WHERE id = new.material_id) < new.quantity THEN
            RAISE(ABORT, 'Insufficient stock')
    END;
END;

CREATE TRIGGER IF NOT EXISTS stock_movements_apply AFTER INSERT ON stock_movements
BEGIN
    UPDATE materials SET current_stock = current_stock + CASE new.movement_type
        WHEN 'inbound' THEN new.quantity
        WHEN 'outbound' THEN -new.quantity
        ELSE new.quantity
    END
    WHERE id = new.material_id;
END;
"#;
