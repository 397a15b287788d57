//! Database schema definition.

use rusqlite::{Connection, Result};

/// The complete SQL schema for the domain store.
pub const SCHEMA_SQL: &str = r"
    -- Projects
    CREATE TABLE IF NOT EXISTS project (
        id INTEGER PRIMARY KEY,
        key TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL
    );

    -- Users, addressed by opaque stable key
    CREATE TABLE IF NOT EXISTS app_user (
        user_key TEXT PRIMARY KEY,
        username TEXT NOT NULL,
        display_name TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_app_user_username ON app_user(username);

    -- Issue constants: status, priority, resolution, issue type
    CREATE TABLE IF NOT EXISTS issue_constant (
        kind TEXT NOT NULL,
        id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        icon_path TEXT,
        sequence INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (kind, id)
    );

    -- Per-locale constant translations
    CREATE TABLE IF NOT EXISTS constant_translation (
        kind TEXT NOT NULL,
        constant_id TEXT NOT NULL,
        locale TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        PRIMARY KEY (kind, constant_id, locale)
    );

    -- Project versions
    CREATE TABLE IF NOT EXISTS project_version (
        id INTEGER PRIMARY KEY,
        project_id INTEGER NOT NULL REFERENCES project(id),
        name TEXT NOT NULL,
        sequence INTEGER NOT NULL DEFAULT 0,
        released INTEGER NOT NULL DEFAULT 0,
        archived INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_project_version_project ON project_version(project_id);

    -- Project components
    CREATE TABLE IF NOT EXISTS component (
        id INTEGER PRIMARY KEY,
        project_id INTEGER NOT NULL REFERENCES project(id),
        name TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_component_project ON component(project_id);

    -- Security levels
    CREATE TABLE IF NOT EXISTS security_level (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT
    );

    -- Issues
    CREATE TABLE IF NOT EXISTS issue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project INTEGER,
        issue_type TEXT,
        summary TEXT,
        description TEXT,
        environment TEXT,
        assignee TEXT,
        reporter TEXT,
        creator TEXT,
        due_date TEXT,
        security_level INTEGER,
        priority TEXT,
        status TEXT,
        resolution TEXT,
        created TEXT,
        updated TEXT,
        resolution_date TEXT,
        time_original_estimate INTEGER,
        time_estimate INTEGER,
        time_spent INTEGER,
        votes INTEGER,
        watches INTEGER,
        number INTEGER,
        workflow_id INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_issue_project ON issue(project);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_issue_project_number
        ON issue(project, number) WHERE project IS NOT NULL AND number IS NOT NULL;
    CREATE INDEX IF NOT EXISTS idx_issue_assignee ON issue(assignee);
    CREATE INDEX IF NOT EXISTS idx_issue_status ON issue(status);

    -- Labels
    CREATE TABLE IF NOT EXISTS issue_label (
        issue_id INTEGER NOT NULL REFERENCES issue(id) ON DELETE CASCADE,
        label TEXT NOT NULL,
        PRIMARY KEY (issue_id, label)
    );
    CREATE INDEX IF NOT EXISTS idx_issue_label_label ON issue_label(label);

    -- Component relation
    CREATE TABLE IF NOT EXISTS issue_component (
        issue_id INTEGER NOT NULL REFERENCES issue(id) ON DELETE CASCADE,
        component_id INTEGER NOT NULL REFERENCES component(id),
        PRIMARY KEY (issue_id, component_id)
    );

    -- Version relation, affects/fixes discriminated by column
    CREATE TABLE IF NOT EXISTS issue_version (
        issue_id INTEGER NOT NULL REFERENCES issue(id) ON DELETE CASCADE,
        version_id INTEGER NOT NULL REFERENCES project_version(id),
        relation TEXT NOT NULL CHECK (relation IN ('affects', 'fixes')),
        PRIMARY KEY (issue_id, version_id, relation)
    );

    -- Subtask parent/child links; a child has at most one parent
    CREATE TABLE IF NOT EXISTS subtask_link (
        child_id INTEGER PRIMARY KEY REFERENCES issue(id) ON DELETE CASCADE,
        parent_id INTEGER NOT NULL REFERENCES issue(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_subtask_link_parent ON subtask_link(parent_id);

    -- Custom fields
    CREATE TABLE IF NOT EXISTS custom_field (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        default_value TEXT
    );
    CREATE TABLE IF NOT EXISTS custom_field_value (
        field_id INTEGER NOT NULL REFERENCES custom_field(id),
        issue_id INTEGER NOT NULL REFERENCES issue(id) ON DELETE CASCADE,
        value TEXT NOT NULL,
        PRIMARY KEY (field_id, issue_id)
    );

    -- Change history: one group per consumed change map
    CREATE TABLE IF NOT EXISTS change_group (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL REFERENCES issue(id) ON DELETE CASCADE,
        author TEXT,
        created TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_change_group_issue ON change_group(issue_id);

    CREATE TABLE IF NOT EXISTS change_item (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        group_id INTEGER NOT NULL REFERENCES change_group(id) ON DELETE CASCADE,
        field TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_change_item_group ON change_item(group_id);
";

/// Apply the schema to the database.
///
/// Idempotent: all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // WAL for concurrent readers, and enforce the relation constraints
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}
