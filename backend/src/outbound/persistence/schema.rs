//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are
//! used by Diesel for compile-time query validation and type-safe SQL
//! generation. `tire_codes` carries unique indexes on both `code_public`
//! and `tire_size_id` (the 1:1 mapping), and `tire_sizes.size_normalized`
//! is unique; foreign keys cascade on size deletion.

diesel::table! {
    /// Catalogued tire sizes with parsed components.
    tire_sizes (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Original trimmed input, spacing and case preserved.
        size_raw -> Varchar,
        /// Canonical `NNN/NNRNN` form; unique.
        size_normalized -> Varchar,
        width -> Int4,
        aspect_ratio -> Int4,
        rim_diameter -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Public codes, mapped 1:1 to tire sizes.
    tire_codes (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Public identifier; unique.
        code_public -> Varchar,
        /// Owning size; unique, enforcing the 1:1 relationship.
        tire_size_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Load/speed-index ratings per size; insert-only.
    tire_variants (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        tire_size_id -> Uuid,
        load_index -> Nullable<Int4>,
        speed_index -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only search log.
    search_logs (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        query -> Varchar,
        /// One of `code`, `size`, `unknown`.
        query_type -> Varchar,
        result_found -> Bool,
        /// SHA-256 hex digest of the caller IP, when one was supplied.
        ip_hash -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Deferred CSV import jobs.
    import_jobs (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Serialised rows plus submission timestamp.
        payload -> Jsonb,
        /// One of `queued`, `running`, `completed`, `failed`.
        state -> Varchar,
        attempts -> Int4,
        /// Outcome summary recorded on completion.
        result -> Nullable<Jsonb>,
        last_error -> Nullable<Varchar>,
        submitted_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(tire_codes -> tire_sizes (tire_size_id));
diesel::joinable!(tire_variants -> tire_sizes (tire_size_id));

diesel::allow_tables_to_appear_in_same_query!(tire_sizes, tire_codes, tire_variants,);
