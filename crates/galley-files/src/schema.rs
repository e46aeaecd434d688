//! Canonical SQLite schema for the file store.
//!
//! `files` carries the five versioning columns next to its data columns.
//! Both versioning invariants are encoded as CHECK constraints so a
//! structurally invalid row cannot exist, whatever code path produced it:
//! a live row never links to another live row, and a draft never carries
//! a deletion request. `UNIQUE(live_id)` caps each live record at one
//! draft.
//!
//! `clipboard_items` and `share_links` are the referencing tables subject
//! to rewiring when a draft is published or discarded; `file_labels` is
//! auxiliary data copied between versions by the `copy_relations` hook.

/// Migration v1: folders, files, labels, and referencing tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS folders (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    is_live INTEGER NOT NULL DEFAULT 0 CHECK (is_live IN (0, 1)),
    live_id INTEGER UNIQUE REFERENCES files(id) ON DELETE RESTRICT,
    published_at_us INTEGER,
    deletion_requested INTEGER NOT NULL DEFAULT 0 CHECK (deletion_requested IN (0, 1)),
    folder_id INTEGER REFERENCES folders(id) ON DELETE SET NULL,
    name TEXT NOT NULL,
    original_filename TEXT,
    description TEXT,
    owner TEXT,
    sha1 TEXT CHECK (sha1 IS NULL OR length(sha1) = 40),
    size_bytes INTEGER NOT NULL DEFAULT 0 CHECK (size_bytes >= 0),
    mime_type TEXT,
    is_public INTEGER NOT NULL DEFAULT 0 CHECK (is_public IN (0, 1)),
    uploaded_at_us INTEGER NOT NULL,
    CHECK (NOT (is_live = 1 AND live_id IS NOT NULL)),
    CHECK (NOT (is_live = 0 AND deletion_requested = 1))
);

CREATE TABLE IF NOT EXISTS file_labels (
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    label TEXT NOT NULL CHECK (length(trim(label)) > 0),
    PRIMARY KEY (file_id, label)
);

CREATE TABLE IF NOT EXISTS clipboard_items (
    id INTEGER PRIMARY KEY,
    clipboard TEXT NOT NULL,
    file_id INTEGER NOT NULL REFERENCES files(id),
    added_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS share_links (
    id INTEGER PRIMARY KEY,
    token TEXT NOT NULL UNIQUE,
    file_id INTEGER NOT NULL UNIQUE REFERENCES files(id),
    created_at_us INTEGER NOT NULL
);
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_files_folder
    ON files(folder_id);

CREATE INDEX IF NOT EXISTS idx_files_live_flags
    ON files(is_live, deletion_requested);

CREATE INDEX IF NOT EXISTS idx_clipboard_items_file
    ON clipboard_items(file_id);

CREATE INDEX IF NOT EXISTS idx_clipboard_items_clipboard
    ON clipboard_items(clipboard, file_id);
";

/// Indexes expected by listing and rewiring query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_files_folder",
    "idx_files_live_flags",
    "idx_clipboard_items_file",
    "idx_clipboard_items_clipboard",
];
