use std::sync::Arc;

use api::{
    AppState,
    auth::{AuthConfig, CurrentUser, UserRole},
    seed::{SeededRecords, seed_demo},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use url::Url;
use uuid::Uuid;

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub state: AppState,
    pub seeded: SeededRecords,
    admin_url: String,
    db_name: String,
}

impl TestContext {
    /// Returns None (and the test silently passes) when TEST_DATABASE_URL is
    /// not set; otherwise the test runs against its own disposable database.
    pub async fn new() -> Option<Self> {
        let base = std::env::var("TEST_DATABASE_URL").ok()?;
        let (admin_url, db_name, test_url) = build_urls(&base)?;
        let admin = Database::connect(&admin_url).await.ok()?;
        let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE);", db_name);
        let create_sql = format!("CREATE DATABASE \"{}\";", db_name);
        let _ = admin
            .execute(Statement::from_string(DatabaseBackend::Postgres, drop_sql))
            .await;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                create_sql,
            ))
            .await
            .ok()?;
        let conn = Database::connect(&test_url).await.ok()?;
        Migrator::up(&conn, None).await.ok()?;
        let seeded = seed_demo(&conn).await.ok()?;
        let db = Arc::new(conn);
        let state = AppState {
            db: db.clone(),
            auth: Arc::new(AuthConfig {
                jwt_secret: "test-secret".into(),
                session_ttl_minutes: 60,
            }),
            blob: None,
        };
        Some(Self {
            db,
            state,
            seeded,
            admin_url,
            db_name,
        })
    }

    pub fn sales_actor(&self) -> CurrentUser {
        CurrentUser {
            user_id: self.seeded.sales.id,
            role: UserRole::Sales,
        }
    }

    pub fn admin_actor(&self) -> CurrentUser {
        CurrentUser {
            user_id: self.seeded.admin.id,
            role: UserRole::Admin,
        }
    }

    pub async fn cleanup(self) {
        let Self {
            db,
            state,
            admin_url,
            db_name,
            ..
        } = self;
        drop(state);
        drop(db);
        if let Ok(admin) = Database::connect(&admin_url).await {
            let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE);", db_name);
            let _ = admin
                .execute(Statement::from_string(DatabaseBackend::Postgres, drop_sql))
                .await;
        }
    }
}

fn build_urls(base: &str) -> Option<(String, String, String)> {
    let url = Url::parse(base).ok()?;
    let db_path = url.path().trim_start_matches('/').to_string();
    let base_name = if db_path.is_empty() {
        "crm_suite_test".to_string()
    } else {
        db_path
    };
    let db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
    let mut admin_url = url.clone();
    admin_url.set_path("/postgres");
    let mut test_url = url.clone();
    test_url.set_path(&format!("/{}", db_name));
    Some((admin_url.to_string(), db_name, test_url.to_string()))
}
