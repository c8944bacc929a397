#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use std::{path::Path, sync::Mutex};
    use tabula::{Gateway, Query, Value};
    use tabula_sqlite::SqliteGateway;
    use tabula_tests::{init_logs, silent_logs};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn create_database() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/creation.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .await
                .expect(format!("Failed to remove test database file {}", DB_PATH).as_str());
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        SqliteGateway::connect(format!("sqlite://{}?mode=rwc", DB_PATH))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        SqliteGateway::connect(format!("sqlite://{}?mode=ro", DB_PATH))
            .await
            .expect("Could not open the database");
        fs::remove_file(DB_PATH)
            .await
            .expect(format!("Failed to remove existing test database file {}", DB_PATH).as_str());
        silent_logs! {
            assert!(
                SqliteGateway::connect(format!("sqlite://{}?mode=ro", DB_PATH))
                    .await
                    .is_err(),
                "Should not be able to open in read only unexisting database"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteGateway::connect("duckdb://some_value")
                    .await
                    .is_err()
            );
            assert!(
                SqliteGateway::connect("sqlite::memory:?mode=append")
                    .await
                    .is_err()
            );
        };
    }

    #[tokio::test]
    async fn prefix_and_introspection() {
        init_logs();
        let mut gateway = SqliteGateway::connect("sqlite::memory:?prefix=shop_")
            .await
            .expect("Could not open the in memory database");
        assert_eq!(gateway.table_prefix(), "shop_");
        gateway
            .execute_batch(
                r#"CREATE TABLE "shop_items" ("id" INTEGER PRIMARY KEY, "label" TEXT, "qty" INTEGER);
                INSERT INTO "shop_items" ("label", "qty") VALUES ('pen', 3), ('ink', NULL);"#,
            )
            .await
            .expect("Failed to set up the table");
        assert_eq!(
            gateway.columns_of("shop_items").await.unwrap(),
            ["id", "label", "qty"]
        );
        assert!(gateway.columns_of("missing").await.unwrap().is_empty());
        let row = gateway
            .fetch_one(Query::new(r#"SELECT "label", "qty" FROM "shop_items" WHERE "qty" IS NULL;"#))
            .await
            .unwrap()
            .expect("Expected a row");
        assert_eq!(row.get_column("label"), Some(&Value::from("ink")));
        assert!(row.get_column("qty").unwrap().is_null());
        let result = gateway
            .execute(
                Query::new(r#"UPDATE "shop_items" SET "qty" = ? WHERE "label" = ?;"#)
                    .with(10)
                    .with("pen"),
            )
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        let result = gateway
            .execute(Query::new(r#"INSERT INTO "shop_items" ("label") VALUES (?);"#).with("nib"))
            .await
            .unwrap();
        assert_eq!(result.last_affected_id, Some(3));
        silent_logs! {
            assert!(
                gateway
                    .execute(Query::new(r#"SELECT 1; SELECT 2;"#))
                    .await
                    .is_err()
            );
            assert!(
                gateway
                    .execute(Query::new(r#"UPDATE "shop_items" SET "qty" = ?;"#))
                    .await
                    .is_err()
            );
        }
    }

    #[tokio::test]
    async fn boolean_columns() {
        init_logs();
        let mut gateway = SqliteGateway::connect("sqlite::memory:")
            .await
            .expect("Could not open the in memory database");
        gateway
            .execute_batch(
                r#"CREATE TABLE "flags" ("id" INTEGER PRIMARY KEY, "active" BOOLEAN, "count" INTEGER);
                INSERT INTO "flags" ("active", "count") VALUES (1, 1), (0, 0), (NULL, 2);"#,
            )
            .await
            .expect("Failed to set up the table");
        let rows = gateway
            .fetch(Query::new(
                r#"SELECT "active", "count", "active" + 0 AS "sum" FROM "flags" ORDER BY "id";"#,
            ))
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[0].get_column("active"), Some(Value::Boolean(Some(true)))));
        assert!(matches!(rows[1].get_column("active"), Some(Value::Boolean(Some(false)))));
        assert!(rows[2].get_column("active").unwrap().is_null());
        assert!(matches!(rows[0].get_column("count"), Some(Value::Int64(Some(1)))));
        assert!(matches!(rows[0].get_column("sum"), Some(Value::Int64(Some(1)))));
    }
}
