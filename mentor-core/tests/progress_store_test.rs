//! Progress store tests against a DuckDB file
//!
//! Run with: cargo test --test progress_store_test -- --nocapture

use std::time::Instant;

use chrono::Duration;
use tempfile::TempDir;

use mentor_core::adapters::duckdb::DuckDbProgressStore;
use mentor_core::domain::{AssessmentRecord, JourneyProgress};
use mentor_core::ports::ProgressStore;
use mentor_core::Skill;

#[test]
fn test_sequential_connections() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("mentor.duckdb");

    for i in 0..5 {
        let start = Instant::now();
        let store = DuckDbProgressStore::new(&db_path).unwrap();
        store.ensure_schema().unwrap();
        println!("Connection {}: opened in {:?}", i, start.elapsed());
    }
}

#[test]
fn test_migrations_apply_once() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("mentor.duckdb");

    let first = DuckDbProgressStore::new(&db_path).unwrap().run_migrations().unwrap();
    assert!(!first.applied.is_empty());

    let second = DuckDbProgressStore::new(&db_path).unwrap().run_migrations().unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.already_applied, first.applied.len());
}

#[test]
fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("mentor.duckdb");

    {
        let store = DuckDbProgressStore::new(&db_path).unwrap();
        store.ensure_schema().unwrap();
        store
            .save_progress(&JourneyProgress::new("u1", true, 3, [1, 2].into_iter().collect()))
            .unwrap();
        store
            .save_assessment(&AssessmentRecord::new("u1", Skill::ConflictResolution, "first"))
            .unwrap();
        let mut second = AssessmentRecord::new("u1", Skill::Adaptability, "second");
        second.submitted_at += Duration::seconds(1);
        store.save_assessment(&second).unwrap();
    }

    let store = DuckDbProgressStore::new(&db_path).unwrap();
    store.ensure_schema().unwrap();

    let progress = store.get_progress("u1").unwrap().unwrap();
    assert!(progress.is_premium);
    assert_eq!(progress.current_phase, 3);
    assert_eq!(progress.completed_phases, [1, 2].into_iter().collect());

    assert_eq!(store.count_assessments("u1").unwrap(), 2);
    assert_eq!(
        store.get_latest_assessment("u1").unwrap().unwrap().response,
        "second"
    );
    assert!(store.get_progress("u2").unwrap().is_none());
}
