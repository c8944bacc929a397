use crate::silent_logs;
use indoc::formatdoc;
use std::sync::LazyLock;
use tabula::{Conditions, Error, Gateway, Model, ModelDef, Query, Saved, Value, conditions};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Columns are introspected, the password never leaves the database.
pub struct User;
static USER: ModelDef = ModelDef::new("User", "users").excluding(&["password"]);
impl Model for User {
    fn def() -> &'static ModelDef {
        &USER
    }
}

pub async fn users<G: Gateway>(gateway: &mut G) {
    let _lock = MUTEX.lock().await;
    let table = format!("{}users", gateway.table_prefix());

    // Setup
    gateway
        .execute(Query::new(format!(r#"DROP TABLE IF EXISTS "{table}";"#)))
        .await
        .expect("Failed to drop the users table");
    gateway
        .execute(Query::new(formatdoc! {r#"
            CREATE TABLE "{table}" (
                "id" INTEGER PRIMARY KEY,
                "name" TEXT NOT NULL,
                "email" TEXT,
                "score" INTEGER,
                "password" TEXT
            );
        "#}))
        .await
        .expect("Failed to create the users table");

    // Create
    let mut alice = User::create(gateway)
        .await
        .expect("Failed to create a new User");
    assert!(!alice.is_saved());
    assert_eq!(alice.fields(), ["id", "name", "email", "score"]);
    assert!(alice.get("name").expect("`name` is a field").is_null());
    alice
        .set_fields([
            ("score", Value::from(56)),
            ("name", Value::from("Alice")),
            ("password", Value::from("hunter2")),
            ("nickname", Value::from("ally")),
            ("email", Value::from("alice@example.com")),
        ])
        .set_fields([("unknown", 1)]);
    assert_eq!(
        alice.get_fields().keys().collect::<Vec<_>>(),
        ["name", "email", "score"]
    );
    silent_logs! {
        let error = alice.set("password", "hunter2").expect_err("`password` is excluded");
        assert!(error.is_undefined_attribute(), "Unexpected error: {error}");
        let error = alice.get("nickname").expect_err("`nickname` is not a field");
        assert!(error.is_undefined_attribute(), "Unexpected error: {error}");
    }

    // Insert
    let id = match alice.save(gateway).await.expect("Failed to save alice") {
        Saved::Inserted(id) => id,
        saved => panic!("Expected alice to be inserted, got {:?}", saved),
    };
    assert!(!id.is_null());
    assert!(alice.is_saved());
    assert_eq!(alice.primary_key(), Some(&id));

    // Get
    let mut loaded = User::get(gateway, id.clone())
        .await
        .expect("Failed to get alice back");
    assert_eq!(loaded.get_as::<String>("name").unwrap(), "Alice");
    assert_eq!(
        loaded.get_as::<String>("email").unwrap(),
        "alice@example.com"
    );
    assert_eq!(loaded.get_as::<i64>("score").unwrap(), 56);
    assert_eq!(loaded.get_fields().len(), 4);
    assert_eq!(loaded.get_fields(), alice.get_fields());

    // Update
    loaded.set("score", 60).unwrap();
    assert_eq!(
        loaded.save(gateway).await.expect("Failed to update alice"),
        Saved::Updated(1)
    );
    let loaded = User::get(gateway, id.clone()).await.unwrap();
    assert_eq!(loaded.get_as::<i64>("score").unwrap(), 60);
    assert_eq!(loaded.get_as::<u8>("score").unwrap(), 60);

    for (name, score) in [("Bob", 12), ("Carol", 99)] {
        let mut user = User::create(gateway).await.unwrap();
        user.set_fields([("name", Value::from(name)), ("score", Value::from(score))]);
        assert!(matches!(
            user.save(gateway).await.expect("Failed to save a user"),
            Saved::Inserted(..)
        ));
    }

    // Get all and where
    let all = User::get_all(gateway, Conditions::new()).await.unwrap();
    assert_eq!(all.count(), 3);
    assert!(
        User::get_all(gateway, conditions! { "name" => "Nobody" })
            .await
            .unwrap()
            .is_empty()
    );
    let bob = User::get_where(gateway, conditions! { "name" => "Bob" })
        .await
        .expect("Failed to get bob");
    assert_eq!(bob.get_as::<i64>("score").unwrap(), 12);
    assert_eq!(bob.get_as::<Option<String>>("email").unwrap(), None);
    let without_email = User::get_all(gateway, conditions! { "email" => Value::Null })
        .await
        .unwrap();
    assert_eq!(without_email.count(), 2);
    let result = User::get(gateway, 9999).await;
    assert!(
        matches!(result, Err(Error::NotFound { .. })),
        "Expected NotFound, got {:?}",
        result
    );
    silent_logs! {
        let result = User::get_where(gateway, Conditions::new()).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
        let result = User::get_where(gateway, conditions! { "nickname" => "ally" }).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
    }

    // Raw query
    let rows = User::raw_query(
        gateway,
        Query::new(formatdoc! {r#"
            SELECT "id", "name", 1 AS "extra"
            FROM "{table}"
            WHERE "score" > ?
            ORDER BY "score";
        "#})
        .with(50),
    )
    .await
    .expect("Failed to run the raw query");
    assert_eq!(
        rows.pluck("name").into_vec(),
        [Value::from("Alice"), Value::from("Carol")]
    );
    assert!(!rows[0].get_fields().contains_key("extra"));
    assert!(!rows[0].is_set("score").unwrap());

    // Delete
    assert!(bob.delete(gateway).await.expect("Failed to delete bob"));
    assert!(!bob.delete(gateway).await.unwrap());
    assert_eq!(bob.get_as::<String>("name").unwrap(), "Bob");
    let unsaved = User::create(gateway).await.unwrap();
    assert!(!unsaved.delete(gateway).await.unwrap());
    assert_eq!(
        User::delete_where(gateway, conditions! { "name" => "Carol" })
            .await
            .expect("Failed to delete carol"),
        1
    );
    silent_logs! {
        let result = User::delete_where(gateway, Conditions::new()).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
        let result = User::delete_where(gateway, conditions! { "nickname" => "ally" }).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
    }
    assert_eq!(
        User::get_all(gateway, Conditions::new())
            .await
            .unwrap()
            .count(),
        1
    );

    // Insert with an explicit key, then replace it
    let mut dave = User::create(gateway).await.unwrap();
    dave.set_fields([("id", Value::from(100)), ("name", Value::from("Dave"))]);
    assert_eq!(
        dave.insert(gateway).await.expect("Failed to insert dave"),
        Saved::Inserted(Value::from(100))
    );
    dave.set("name", "David").unwrap();
    dave.insert(gateway).await.expect("Failed to replace dave");
    let david = User::get(gateway, 100).await.expect("Failed to get dave");
    assert_eq!(david.get_as::<String>("name").unwrap(), "David");
    assert_eq!(
        User::get_all(gateway, Conditions::new())
            .await
            .unwrap()
            .count(),
        2
    );

    // A save without fields to write is a no-op
    let mut only_key = User::create(gateway).await.unwrap();
    only_key.set("id", 100).unwrap();
    assert_eq!(only_key.save(gateway).await.unwrap(), Saved::Updated(0));
}
