use crate::silent_logs;
use indoc::formatdoc;
use std::sync::LazyLock;
use tabula::{
    Collection, Conditions, Entity, Error, Gateway, Model, ModelDef, Query, Saved, Value,
    conditions,
};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

struct Product;
static PRODUCT: ModelDef = ModelDef::new("Product", "products");
impl Model for Product {
    fn def() -> &'static ModelDef {
        &PRODUCT
    }
}

pub async fn shopping<G: Gateway>(gateway: &mut G) {
    let _lock = MUTEX.lock().await;
    let table = format!("{}products", gateway.table_prefix());

    // Setup
    gateway
        .execute(Query::new(format!(r#"DROP TABLE IF EXISTS "{table}";"#)))
        .await
        .expect("Failed to drop the products table");
    gateway
        .execute(Query::new(formatdoc! {r#"
            CREATE TABLE "{table}" (
                "id" INTEGER PRIMARY KEY,
                "name" TEXT NOT NULL,
                "price" REAL NOT NULL,
                "stock" INTEGER NOT NULL,
                "active" BOOLEAN NOT NULL DEFAULT 1
            );
        "#}))
        .await
        .expect("Failed to create the products table");

    // Save a whole collection
    let mut products = Collection::<Entity<Product>>::new();
    for (name, price, stock) in [
        ("Rust-Proof Coffee Mug", 12.99, 42),
        ("Zero-Cost Abstraction Hoodie", 49.95, 0),
        ("Borrow Checker Plush", 19.5, 7),
        ("Lifetime Annotation Stickers", 3.25, 0),
    ] {
        let mut product = Product::create(gateway)
            .await
            .expect("Failed to create a product");
        product.set_fields([
            ("name", Value::from(name)),
            ("price", Value::from(price)),
            ("stock", Value::from(stock)),
            ("active", Value::from(true)),
        ]);
        products.push(product);
    }
    let saved = products
        .save(gateway)
        .await
        .expect("Failed to save the products");
    assert_eq!(saved.len(), 4);
    assert!(saved.iter().all(|v| matches!(v, Saved::Inserted(..))));
    assert!(products.iter().all(|v| v.is_saved()));
    for product in products.iter() {
        let id = product.primary_key().expect("Saved products have an id").clone();
        let loaded = Product::get(gateway, id)
            .await
            .expect("Failed to get a product back");
        assert_eq!(loaded.get_fields(), product.get_fields());
    }

    // Transforms over loaded rows
    let products = Product::get_all(gateway, Conditions::new())
        .await
        .expect("Failed to load the products");
    assert_eq!(products.count(), 4);
    let by_price = products
        .clone()
        .sort_by(|p| p.get_as::<f64>("price").unwrap_or_default());
    assert_eq!(
        by_price.pluck("name").into_vec(),
        [
            Value::from("Lifetime Annotation Stickers"),
            Value::from("Rust-Proof Coffee Mug"),
            Value::from("Borrow Checker Plush"),
            Value::from("Zero-Cost Abstraction Hoodie"),
        ]
    );
    let expensive_first = by_price
        .clone()
        .sort_by_desc(|p| p.get_as::<f64>("price").unwrap_or_default());
    assert_eq!(
        expensive_first.pluck("id").into_vec(),
        by_price.pluck("id").into_vec().into_iter().rev().collect::<Vec<_>>()
    );
    let total_stock = products.reduce(0, |acc, p| acc + p.get_as::<i64>("stock").unwrap());
    assert_eq!(total_stock, 49);
    let names = products
        .clone()
        .filter(|p| p.get_as::<i64>("stock").unwrap() > 0)
        .map(|p| p.get_as::<String>("name").unwrap());
    assert_eq!(
        names.into_vec(),
        ["Rust-Proof Coffee Mug", "Borrow Checker Plush"]
    );
    let json: serde_json::Value = serde_json::from_str(
        &by_price
            .to_json()
            .expect("Failed to serialize the products"),
    )
    .expect("The collection is not valid JSON");
    assert_eq!(json[0]["name"], "Lifetime Annotation Stickers");
    assert_eq!(json[0]["price"], 3.25);
    assert_eq!(json[3]["stock"], 0);

    // Bulk save
    let sold_out = products
        .clone()
        .filter(|p| p.get_as::<i64>("stock").unwrap() == 0);
    let result = Product::bulk_save(
        gateway,
        &sold_out,
        conditions! { "active" => false, "discontinued" => true },
    )
    .await
    .expect("Failed to bulk save");
    assert_eq!(result.rows_affected, 2);
    assert!(
        sold_out
            .iter()
            .all(|p| p.get_as::<bool>("active").unwrap())
    );
    let inactive = Product::get_all(gateway, conditions! { "active" => false })
        .await
        .unwrap();
    assert_eq!(inactive.pluck("id"), sold_out.pluck("id"));
    silent_logs! {
        let result = Product::bulk_save(gateway, &Collection::new(), conditions! { "active" => true }).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
        let result = Product::bulk_save(gateway, &sold_out, conditions! { "discontinued" => true }).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
        let unsaved = Collection::from(vec![Product::create(gateway).await.unwrap()]);
        let result = Product::bulk_save(gateway, &unsaved, conditions! { "active" => true }).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
    }

    // Saving a loaded collection writes every member back
    let mut restocked = inactive.map(|mut p| {
        p.set("stock", 5).unwrap();
        p
    });
    let saved = restocked.save(gateway).await.expect("Failed to restock");
    assert_eq!(saved, [Saved::Updated(1), Saved::Updated(1)]);
    let total_stock = Product::get_all(gateway, Conditions::new())
        .await
        .unwrap()
        .reduce(0, |acc, p| acc + p.get_as::<i64>("stock").unwrap());
    assert_eq!(total_stock, 59);
}
