//! Migration 001: initial schema
//!
//! Core tables for the workbench:
//! - projects, features, documents
//! - generation_sessions, generation_results
//! - llm_providers, app_settings
//! - context_documents

use rusqlite::Connection;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Core tables

        CREATE TABLE projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            path TEXT NOT NULL UNIQUE,
            has_blueprints BOOLEAN NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_opened_at TEXT
        );
        CREATE INDEX idx_projects_path ON projects(path);

        CREATE TABLE features (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            feature_id TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('planning', 'in-progress', 'review', 'done')),
            project_id INTEGER NOT NULL,
            spec_path TEXT,
            tech_path TEXT,
            steps_path TEXT,
            status_path TEXT,
            FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
        );
        CREATE INDEX idx_features_project_id ON features(project_id);
        CREATE INDEX idx_features_feature_id ON features(feature_id);

        CREATE TABLE documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type TEXT NOT NULL CHECK(type IN ('spec', 'tech', 'steps', 'status', 'quick')),
            content TEXT NOT NULL,
            feature_id INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (feature_id) REFERENCES features(id) ON DELETE CASCADE
        );
        CREATE INDEX idx_documents_feature_id ON documents(feature_id);
        CREATE INDEX idx_documents_type ON documents(type);

        -- Multi-provider generation tables

        CREATE TABLE generation_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            feature_id INTEGER NOT NULL,
            document_type TEXT NOT NULL CHECK(document_type IN ('spec', 'tech', 'steps', 'status', 'quick')),
            status TEXT NOT NULL CHECK(status IN ('pending', 'generating', 'comparing', 'merged', 'cancelled')),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (feature_id) REFERENCES features(id) ON DELETE CASCADE
        );
        CREATE INDEX idx_generation_sessions_feature_id ON generation_sessions(feature_id);

        CREATE TABLE generation_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL,
            provider TEXT NOT NULL CHECK(provider IN ('openai', 'google', 'deepseek', 'anthropic')),
            model TEXT NOT NULL,
            content TEXT NOT NULL,
            generation_time_ms INTEGER NOT NULL,
            token_count INTEGER NOT NULL,
            selected_sections TEXT NOT NULL,
            FOREIGN KEY (session_id) REFERENCES generation_sessions(id) ON DELETE CASCADE
        );
        CREATE INDEX idx_generation_results_session_id ON generation_results(session_id);

        -- Settings tables

        CREATE TABLE llm_providers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(name IN ('openai', 'google', 'deepseek', 'anthropic')) UNIQUE,
            api_key TEXT NOT NULL,
            default_model TEXT NOT NULL,
            is_enabled BOOLEAN NOT NULL DEFAULT 1,
            usage_this_month INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE app_settings (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            blueprints_path TEXT NOT NULL,
            theme TEXT NOT NULL CHECK(theme IN ('light', 'dark', 'system')) DEFAULT 'system',
            default_providers TEXT NOT NULL,
            review_provider TEXT NOT NULL
        );

        -- Project context documents (synced with files on disk)

        CREATE TABLE context_documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('context', 'standards', 'notes', 'custom')),
            file_path TEXT NOT NULL,
            content TEXT NOT NULL,
            is_dirty BOOLEAN NOT NULL DEFAULT 0,
            last_synced TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_modified_external TEXT,
            FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
        );
        CREATE INDEX idx_context_documents_project_id ON context_documents(project_id);
        "#,
    )
}

pub fn down(conn: &Connection) -> rusqlite::Result<()> {
    // Drop in reverse order to avoid foreign key conflicts
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS context_documents;
        DROP TABLE IF EXISTS app_settings;
        DROP TABLE IF EXISTS llm_providers;
        DROP TABLE IF EXISTS generation_results;
        DROP TABLE IF EXISTS generation_sessions;
        DROP TABLE IF EXISTS documents;
        DROP TABLE IF EXISTS features;
        DROP TABLE IF EXISTS projects;
        "#,
    )
}
