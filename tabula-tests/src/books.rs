use crate::silent_logs;
use indoc::formatdoc;
use std::sync::LazyLock;
use tabula::{
    Attribute, Conditions, Error, Gateway, MissingRelated, Model, ModelDef, Query, Related,
    Relation, Saved, Value, conditions,
};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub struct Author;
pub struct Biography;
pub struct Book;

static AUTHOR_RELATIONS: [Relation; 2] = [
    Relation::one_to_one(Biography::def, "id", "author_id")
        .named("biography")
        .when_missing(MissingRelated::Absent),
    Relation::one_to_many(Book::def, "id", "author_id").named("books"),
];
static AUTHOR: ModelDef = ModelDef::new("Author", "authors").with_relations(&AUTHOR_RELATIONS);
static BIOGRAPHY: ModelDef = ModelDef::new("Biography", "biographies");
static BOOK_RELATIONS: [Relation; 1] =
    [Relation::one_to_one(Author::def, "author_id", "id").named("author")];
static BOOK: ModelDef = ModelDef::new("Book", "books")
    .with_fields(&["id", "title", "author_id", "year"])
    .with_relations(&BOOK_RELATIONS);

impl Model for Author {
    fn def() -> &'static ModelDef {
        &AUTHOR
    }
}
impl Model for Biography {
    fn def() -> &'static ModelDef {
        &BIOGRAPHY
    }
}
impl Model for Book {
    fn def() -> &'static ModelDef {
        &BOOK
    }
}

async fn insert<M: Model, G: Gateway>(gateway: &mut G, values: &[(&str, Value)]) -> Value {
    let mut entity = M::create(gateway)
        .await
        .expect("Failed to create a new entity");
    entity.set_fields(values.iter().cloned());
    match entity.save(gateway).await.expect("Failed to save the entity") {
        Saved::Inserted(id) => id,
        saved => panic!("Expected an insert, got {:?}", saved),
    }
}

pub async fn books<G: Gateway>(gateway: &mut G) {
    let _lock = MUTEX.lock().await;
    let prefix = gateway.table_prefix().to_owned();

    // Setup
    for table in ["books", "biographies", "authors"] {
        gateway
            .execute(Query::new(format!(
                r#"DROP TABLE IF EXISTS "{prefix}{table}";"#
            )))
            .await
            .expect("Failed to drop a table");
    }
    for sql in [
        formatdoc! {r#"
            CREATE TABLE "{prefix}authors" (
                "id" INTEGER PRIMARY KEY,
                "name" TEXT NOT NULL,
                "country" TEXT
            );
        "#},
        formatdoc! {r#"
            CREATE TABLE "{prefix}biographies" (
                "id" INTEGER PRIMARY KEY,
                "author_id" INTEGER NOT NULL,
                "text" TEXT NOT NULL
            );
        "#},
        formatdoc! {r#"
            CREATE TABLE "{prefix}books" (
                "id" INTEGER PRIMARY KEY,
                "title" TEXT NOT NULL,
                "author_id" INTEGER,
                "year" INTEGER,
                "isbn" TEXT
            );
        "#},
    ] {
        gateway
            .execute(Query::new(sql))
            .await
            .expect("Failed to create a table");
    }

    let rowling = insert::<Author, _>(
        gateway,
        &[("name", "J.K. Rowling".into()), ("country", "UK".into())],
    )
    .await;
    let tolkien = insert::<Author, _>(
        gateway,
        &[("name", "J.R.R. Tolkien".into()), ("country", "UK".into())],
    )
    .await;
    insert::<Author, _>(gateway, &[("name", "Anonymous".into())]).await;
    insert::<Biography, _>(
        gateway,
        &[
            ("author_id", rowling.clone()),
            ("text", "British author, best known for Harry Potter.".into()),
        ],
    )
    .await;
    for (title, author, year) in [
        ("Harry Potter and the Philosopher's Stone", &rowling, 1997),
        ("Harry Potter and the Chamber of Secrets", &rowling, 1998),
        ("The Hobbit", &tolkien, 1937),
        ("Beowulf", &Value::Null, 1000),
    ] {
        insert::<Book, _>(
            gateway,
            &[
                ("title", title.into()),
                ("author_id", author.clone()),
                ("year", year.into()),
            ],
        )
        .await;
    }

    // One to one and one to many
    let author = Author::get(gateway, rowling.clone())
        .await
        .expect("Failed to get Rowling");
    let biography = author
        .one::<Biography>("biography")
        .expect("`biography` is a one to one relationship")
        .expect("Rowling has a biography");
    assert_eq!(
        biography.get_as::<String>("text").unwrap(),
        "British author, best known for Harry Potter."
    );
    let books = author
        .many::<Book>("books")
        .expect("`books` is a one to many relationship");
    assert_eq!(books.count(), 2);
    assert_eq!(
        books
            .sort_by(|b| b.get("year").cloned().unwrap_or_default())
            .pluck("year")
            .into_vec(),
        [Value::Int64(Some(1997)), Value::Int64(Some(1998))]
    );
    assert!(matches!(
        author.attribute("books"),
        Ok(Attribute::Relation(Some(Related::Many(..))))
    ));

    // Related entities do not resolve their own relationships
    let book = author.many::<Book>("books").unwrap();
    let book = book.first().expect("Rowling has books");
    assert!(book.related("author").unwrap().is_none());
    assert!(book.one::<Author>("author").unwrap().is_none());

    // Missing one to one allowed by the declaration
    let author = Author::get(gateway, tolkien.clone()).await.unwrap();
    assert!(author.one::<Biography>("biography").unwrap().is_none());
    assert_eq!(author.many::<Book>("books").unwrap().count(), 1);

    // Every loaded row is resolved
    let authors = Author::get_all(gateway, Conditions::new()).await.unwrap();
    assert_eq!(authors.count(), 3);
    let books_per_author = authors
        .iter()
        .map(|a| a.many::<Book>("books").unwrap().count())
        .collect::<Vec<_>>();
    assert_eq!(books_per_author, [2, 1, 0]);

    // Book to author
    let hobbit = Book::get_where(gateway, conditions! { "title" => "The Hobbit" })
        .await
        .expect("Failed to get The Hobbit");
    let author = hobbit
        .one::<Author>("author")
        .unwrap()
        .expect("The Hobbit has an author");
    assert_eq!(author.get_as::<String>("name").unwrap(), "J.R.R. Tolkien");
    assert_eq!(author.primary_key(), Some(&tolkien));

    // NULL local key
    let beowulf = Book::get_where(gateway, conditions! { "title" => "Beowulf" })
        .await
        .unwrap();
    assert!(matches!(
        beowulf.related("author").unwrap(),
        Some(Related::One(None))
    ));

    // Missing one to one refused by the declaration
    insert::<Book, _>(
        gateway,
        &[("title", "Ghost".into()), ("author_id", 999.into())],
    )
    .await;
    let result = Book::get_where(gateway, conditions! { "title" => "Ghost" }).await;
    assert!(
        matches!(result, Err(Error::NotFound { .. })),
        "Expected NotFound, got {:?}",
        result
    );
    assert_eq!(
        Book::delete_where(gateway, conditions! { "title" => "Ghost" })
            .await
            .unwrap(),
        1
    );

    // Columns outside the explicit field list are ignored
    assert_eq!(hobbit.fields(), ["id", "title", "author_id", "year"]);

    // Attribute validation
    silent_logs! {
        let error = hobbit.related("title").expect_err("`title` is a field");
        assert!(error.is_undefined_attribute(), "Unexpected error: {error}");
        let error = hobbit.get("author").expect_err("`author` is a relationship");
        assert!(error.is_invalid_argument(), "Unexpected error: {error}");
        let error = hobbit.attribute("publisher").expect_err("`publisher` does not exist");
        assert!(error.is_undefined_attribute(), "Unexpected error: {error}");
        let error = hobbit.many::<Author>("author").expect_err("`author` is one to one");
        assert!(error.is_invalid_argument(), "Unexpected error: {error}");
    }
}
