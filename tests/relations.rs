mod resource {
    #[allow(dead_code)]
    pub mod mock;
}

#[cfg(test)]
mod tests {
    use crate::resource::mock::{MockGateway, row};
    use indoc::indoc;
    use tabula::{
        Collection, Error, MissingRelated, Model, ModelDef, Related, RelationKind, Relation, Value,
        conditions,
    };

    struct Author;
    struct Book;
    struct Profile;
    struct Broken;
    struct Clashing;

    static AUTHOR_RELATIONS: [Relation; 2] = [
        Relation::one_to_many(Book::def, "id", "author_id"),
        Relation::one_to_one(Profile::def, "id", "author_id")
            .named("profile")
            .when_missing(MissingRelated::Absent),
    ];
    static AUTHOR: ModelDef = ModelDef::new("Author", "authors")
        .with_fields(&["id", "name"])
        .with_relations(&AUTHOR_RELATIONS);
    static BOOK_RELATIONS: [Relation; 1] =
        [Relation::one_to_one(Author::def, "author_id", "id").named("author")];
    static BOOK: ModelDef = ModelDef::new("Book", "books")
        .with_fields(&["id", "title", "author_id"])
        .with_relations(&BOOK_RELATIONS);
    static PROFILE: ModelDef =
        ModelDef::new("Profile", "profiles").with_fields(&["id", "author_id", "bio"]);
    static BROKEN_RELATIONS: [Relation; 1] =
        [Relation::one_to_many(Book::def, "id", "writer_id").named("books")];
    static BROKEN: ModelDef = ModelDef::new("Broken", "authors")
        .with_fields(&["id", "name"])
        .with_relations(&BROKEN_RELATIONS);
    static CLASHING_RELATIONS: [Relation; 1] =
        [Relation::one_to_one(Author::def, "author_id", "id").named("title")];
    static CLASHING: ModelDef = ModelDef::new("Clashing", "books")
        .with_fields(&["id", "title", "author_id"])
        .with_relations(&CLASHING_RELATIONS);

    impl Model for Author {
        fn def() -> &'static ModelDef {
            &AUTHOR
        }
    }
    impl Model for Book {
        fn def() -> &'static ModelDef {
            &BOOK
        }
    }
    impl Model for Profile {
        fn def() -> &'static ModelDef {
            &PROFILE
        }
    }
    impl Model for Broken {
        fn def() -> &'static ModelDef {
            &BROKEN
        }
    }
    impl Model for Clashing {
        fn def() -> &'static ModelDef {
            &CLASHING
        }
    }

    fn book(id: i64, title: &str, author: Value) -> tabula::RowLabeled {
        row(&[
            ("id", Value::from(id)),
            ("title", Value::from(title)),
            ("author_id", author),
        ])
    }

    #[tokio::test]
    async fn one_to_many_and_absent_one_to_one() {
        let mut gateway = MockGateway::new("rel_");
        gateway
            .script(vec![row(&[("id", Value::from(1i64)), ("name", Value::from("Ursula"))])])
            .script(vec![
                book(10, "A Wizard of Earthsea", Value::from(1i64)),
                book(11, "The Dispossessed", Value::from(1i64)),
            ])
            .script(vec![]);
        let author = Author::get(&mut gateway, 1).await.unwrap();
        assert_eq!(
            gateway.sql()[1..],
            [
                indoc! {r#"
                    SELECT "id", "title", "author_id"
                    FROM "rel_books"
                    WHERE "author_id" = ?;
                "#}
                .trim(),
                indoc! {r#"
                    SELECT "id", "author_id", "bio"
                    FROM "rel_profiles"
                    WHERE "author_id" = ?
                    LIMIT 1;
                "#}
                .trim(),
            ]
        );
        assert_eq!(gateway.queries[1].params, [Value::from(1i64)]);

        // The relationship name defaults to the related model name
        let books = author.many::<Book>("Book").unwrap();
        assert_eq!(
            books.pluck("title"),
            Collection::from(vec![
                Value::from("A Wizard of Earthsea"),
                Value::from("The Dispossessed")
            ])
        );
        assert!(books.iter().all(|v| v.related("author").unwrap().is_none()));
        assert!(matches!(
            author.related("profile").unwrap(),
            Some(Related::One(None))
        ));
        assert!(author.one::<Profile>("profile").unwrap().is_none());
        assert_eq!(
            author
                .related("Book")
                .unwrap()
                .and_then(Related::as_many)
                .map(Collection::count),
            Some(2)
        );

        assert!(books.pluck("author").iter().all(Value::is_null));

        // Relationships pluck as the JSON text of the attached rows
        let authors = Collection::from(vec![author]);
        assert_eq!(
            authors.pluck("Book").into_vec(),
            [Value::from(
                r#"[{"id":10,"title":"A Wizard of Earthsea","author_id":1},{"id":11,"title":"The Dispossessed","author_id":1}]"#
            )]
        );
        assert_eq!(authors.pluck("profile").into_vec(), [Value::Null]);
    }

    #[tokio::test]
    async fn null_local_key() {
        let mut gateway = MockGateway::new("null_key_");
        gateway.script(vec![book(12, "Beowulf", Value::Null)]);
        let beowulf = Book::get_where(&mut gateway, conditions! { "title" => "Beowulf" })
            .await
            .unwrap();
        assert_eq!(gateway.queries.len(), 1);
        assert!(beowulf.one::<Author>("author").unwrap().is_none());
        assert_eq!(
            beowulf.related("author").unwrap().map(Related::kind),
            Some(RelationKind::OneToOne)
        );
    }

    #[tokio::test]
    async fn missing_one_to_one_fails() {
        let mut gateway = MockGateway::new("orphan_");
        gateway.script(vec![book(13, "Orphan", Value::from(99i64))]);
        let result = Book::get(&mut gateway, 13).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(gateway.queries.len(), 2);
    }

    #[tokio::test]
    async fn every_row_resolved() {
        let mut gateway = MockGateway::new("every_");
        gateway
            .script(vec![
                book(1, "First", Value::from(1i64)),
                book(2, "Second", Value::from(2i64)),
            ])
            .script(vec![row(&[("id", Value::from(1i64)), ("name", Value::from("One"))])])
            .script(vec![row(&[("id", Value::from(2i64)), ("name", Value::from("Two"))])]);
        let books = Book::get_all(&mut gateway, conditions! {}).await.unwrap();
        assert_eq!(gateway.queries.len(), 3);
        let authors = books
            .iter()
            .map(|v| {
                v.one::<Author>("author")
                    .unwrap()
                    .and_then(|v| v.get_as::<String>("name").ok())
            })
            .collect::<Vec<_>>();
        assert_eq!(authors, [Some("One".to_string()), Some("Two".to_string())]);
        // Related authors are not resolved themselves
        let author = books[0].one::<Author>("author").unwrap().unwrap();
        assert!(author.related("Book").unwrap().is_none());
        assert!(author.many::<Book>("Book").unwrap().is_empty());
    }

    #[tokio::test]
    async fn declaration_errors() {
        let mut gateway = MockGateway::new("broken_");
        gateway.script(vec![row(&[("id", Value::from(1i64)), ("name", Value::from("X"))])]);
        let result = Broken::get(&mut gateway, 1).await;
        assert!(
            matches!(&result, Err(Error::UndefinedAttribute { name, .. }) if name == "writer_id"),
            "Unexpected result: {:?}",
            result.map(|_| ())
        );
        let result = Clashing::create(&mut gateway).await;
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
    }

    #[tokio::test]
    async fn attach_checks_kind() {
        let mut gateway = MockGateway::new("attach_");
        let mut author = Author::create(&mut gateway).await.unwrap();
        let result = author.set_related("profile", Related::Many(Collection::new()));
        assert!(matches!(result, Err(Error::InvalidArgument(..))));
        let result = author.set_related("publisher", Related::One(None));
        assert!(matches!(result, Err(Error::UndefinedAttribute { .. })));

        let mut book = Book::create(&mut gateway).await.unwrap();
        book.set("title", "Loose").unwrap();
        author
            .set_related("Book", Related::Many(Collection::from(vec![book.into_record()])))
            .unwrap();
        assert_eq!(author.many::<Book>("Book").unwrap().count(), 1);
        let error = author.many::<Profile>("Book").unwrap_err();
        assert!(error.is_invalid_argument());
        let error = author.one::<Book>("Book").unwrap_err();
        assert!(error.is_invalid_argument());
        assert!(author.is::<Author>());
        assert!(author.clone().into_record().downcast::<Book>().is_err());
    }
}
