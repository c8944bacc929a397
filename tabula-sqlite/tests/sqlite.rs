#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};
    use tabula_sqlite::SqliteGateway;
    use tabula_tests::{execute_tests, init_logs};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn sqlite_memory() {
        init_logs();
        let gateway = SqliteGateway::connect(SqliteGateway::MEMORY)
            .await
            .expect("Could not open the in memory database");
        execute_tests(gateway).await;
    }

    #[tokio::test]
    async fn sqlite_file_with_prefix() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/tests.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH).await.expect(
                format!("Failed to remove existing test database file {}", DB_PATH).as_str(),
            );
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        let gateway = SqliteGateway::connect(format!("sqlite://{}?mode=rwc&prefix=app_", DB_PATH))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        execute_tests(gateway).await;
    }
}
