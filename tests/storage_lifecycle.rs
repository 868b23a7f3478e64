//! Integration tests for the connection manager lifecycle: corruption
//! quarantine, backup, close/reopen.

mod common;

use common::TestContext;
use devstudio::db::migrations::{self, MigrationRunner};
use devstudio::db::{self, DatabaseManager};
use devstudio::db::repos::{NewProject, ProjectRepository};
use rusqlite::Connection;

#[test]
fn corrupted_file_is_quarantined_and_replaced() {
    let ctx = TestContext::uninitialized().unwrap();
    std::fs::write(&ctx.db_path, b"garbage bytes, definitely not sqlite").unwrap();

    let mut manager = DatabaseManager::new(ctx.db_path.clone());
    manager.initialize().unwrap();

    // The bad file was moved aside, not silently discarded
    let quarantined = ctx.quarantine_files();
    assert_eq!(quarantined.len(), 1);
    assert!(quarantined[0].starts_with("test.corrupt."));
    assert!(quarantined[0].ends_with(".db"));

    // And the replacement database is healthy and fully migrated
    assert!(manager.check_integrity().unwrap());
    let runner = MigrationRunner::new(manager.connection().unwrap());
    assert_eq!(
        runner.history().unwrap().len(),
        migrations::all().unwrap().len()
    );
}

#[test]
fn repeated_corruption_keeps_all_quarantines() {
    let ctx = TestContext::uninitialized().unwrap();

    for round in 0..2 {
        std::fs::write(&ctx.db_path, format!("garbage round {}", round)).unwrap();
        let mut manager = DatabaseManager::new(ctx.db_path.clone());
        manager.initialize().unwrap();
        manager.close();
        // Timestamps resolve to sub-second precision; avoid a name collision
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    assert_eq!(ctx.quarantine_files().len(), 2);
}

#[test]
fn healthy_database_survives_reinitialize_untouched() {
    let ctx = TestContext::new().unwrap();
    {
        let conn = ctx.manager.connection().unwrap();
        ProjectRepository::new(conn)
            .create(&NewProject {
                name: "Persistent".into(),
                path: "/keep".into(),
                has_blueprints: true,
                last_opened_at: None,
            })
            .unwrap();
    }

    let mut manager = DatabaseManager::new(ctx.db_path.clone());
    manager.initialize().unwrap();

    assert!(ctx.quarantine_files().is_empty());
    let project = ProjectRepository::new(manager.connection().unwrap())
        .find_by_path("/keep")
        .unwrap();
    assert!(project.is_some());
}

#[test]
fn backup_produces_openable_copy() {
    let ctx = TestContext::new().unwrap();
    let conn = ctx.manager.connection().unwrap();
    ProjectRepository::new(conn)
        .create(&NewProject {
            name: "Backed up".into(),
            path: "/backed-up".into(),
            has_blueprints: false,
            last_opened_at: None,
        })
        .unwrap();

    let dest = ctx.temp_path().join("backups").join("snapshot.db");
    ctx.manager.backup(&dest).unwrap();

    // Callers only get the postcondition: a valid, openable copy
    assert!(db::check_integrity_at(&dest));
    let copy = Connection::open(&dest).unwrap();
    let count: i64 = copy
        .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn backup_before_initialize_fails_fast() {
    let ctx = TestContext::uninitialized().unwrap();
    let dest = ctx.temp_path().join("snapshot.db");
    assert!(ctx.manager.backup(&dest).is_err());
    assert!(!dest.exists());
}

#[test]
fn close_then_reinitialize() {
    let mut ctx = TestContext::new().unwrap();

    ctx.manager.close();
    assert!(ctx.manager.connection().is_err());

    ctx.manager.initialize().unwrap();
    assert!(ctx.manager.connection().is_ok());
    assert!(ctx.manager.check_integrity().unwrap());
}

#[test]
fn integrity_probe_leaves_file_usable() {
    let ctx = TestContext::new().unwrap();

    // Probe with its own read-only handle while no writer holds the file
    assert!(db::check_integrity_at(&ctx.db_path));

    // The live connection is unaffected
    let conn = ctx.manager.connection().unwrap();
    conn.execute("INSERT INTO projects (name, path) VALUES ('p', '/p')", [])
        .unwrap();
}
