// Shared fixtures for the scenario tests: a real SQLite-backed PS over a
// temp-file database, the in-memory CS, and deterministic time/id fakes.
// Grounded on the `FixedTime`/`SeqIds` test doubles in
// `testorch_core::application::scheduler`'s own unit tests, generalized
// to a real clock a test can advance between scheduler ticks.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use testorch_core::port::{IdProvider, TimeProvider};
use testorch_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository, SqliteMaintenance};

/// A clock the test drives by hand, so reaper-sweep scenarios don't need
/// to sleep for real heartbeat-freshness windows.
pub struct FakeTimeProvider {
    millis: AtomicI64,
}

impl FakeTimeProvider {
    pub fn new(start: i64) -> Self {
        Self {
            millis: AtomicI64::new(start),
        }
    }

    pub fn advance(&self, delta_millis: i64) -> i64 {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst) + delta_millis
    }
}

impl TimeProvider for FakeTimeProvider {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Sequential ids, so assertions can name expected job/group/agent ids
/// instead of capturing whatever a real `UuidProvider` handed back.
pub struct SeqIdProvider {
    prefix: &'static str,
    next: AtomicU64,
}

impl SeqIdProvider {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }
}

impl IdProvider for SeqIdProvider {
    fn generate_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{n}", self.prefix)
    }
}

/// A migrated SQLite pool backed by a temp file, per the numbered
/// scenarios' "a real `SqliteJobRepository` over a temp-file SQLite
/// database" requirement -- `:memory:` doesn't give two independently
/// constructed connections a shared database, which the concurrent
/// replica/fetch scenarios need.
pub struct TempDb {
    pub pool: sqlx::SqlitePool,
    _path: tempfile::TempPath,
}

pub async fn temp_db() -> TempDb {
    let file = tempfile::NamedTempFile::new().expect("create temp db file");
    let path = file.into_temp_path();
    let url = format!("sqlite://{}", path.display());

    let pool = create_pool(&url).await.expect("create sqlite pool");
    run_migrations(&pool).await.expect("run migrations");

    TempDb { pool, _path: path }
}

pub fn job_repo(db: &TempDb) -> Arc<SqliteJobRepository> {
    Arc::new(SqliteJobRepository::new(db.pool.clone()))
}

pub fn maintenance(db: &TempDb) -> Arc<SqliteMaintenance> {
    Arc::new(SqliteMaintenance::new(db.pool.clone()))
}
