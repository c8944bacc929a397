#[cfg(test)]
mod tests {
    use indoc::indoc;
    use tabula::{
        Conditions, GenericSqlWriter, SqlWriter, Value, build_where_clause,
        build_where_clause_with, conditions,
    };

    const WRITER: GenericSqlWriter = GenericSqlWriter::new();

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|&v| v.to_owned()).collect()
    }

    #[test]
    fn empty_is_tautology() {
        let predicate = build_where_clause(&Conditions::new(), &fields(&["id", "name"]));
        assert_eq!(predicate.sql, "1 = 1");
        assert!(predicate.params.is_empty());
        assert!(predicate.is_tautology());
    }

    #[test]
    fn unknown_columns_dropped() {
        let known = fields(&["id", "name", "score"]);
        let predicate = build_where_clause(
            &conditions! { "nickname" => "johnny", "name" => "John", "age" => 30 },
            &known,
        );
        assert_eq!(predicate.sql, r#""name" = ?"#);
        assert_eq!(predicate.params, [Value::from("John")]);
        assert_eq!(predicate.terms, 1);

        let predicate = build_where_clause(&conditions! { "nickname" => "johnny" }, &known);
        assert_eq!(predicate.sql, "1 = 1");
        assert!(predicate.is_tautology());
    }

    #[test]
    fn conjunction_keeps_order() {
        let predicate = build_where_clause(
            &conditions! { "score" => 30, "name" => "John" },
            &fields(&["id", "name", "score"]),
        );
        assert_eq!(predicate.sql, r#""score" = ? AND "name" = ?"#);
        assert_eq!(predicate.params, [Value::from(30), Value::from("John")]);
        assert_eq!(predicate.terms, 2);
    }

    #[test]
    fn null_is_not_bound() {
        let predicate = build_where_clause(
            &conditions! { "email" => Value::Null, "name" => "John", "score" => Option::<i64>::None },
            &fields(&["email", "name", "score"]),
        );
        assert_eq!(predicate.sql, r#""email" IS NULL AND "name" = ? AND "score" IS NULL"#);
        assert_eq!(predicate.params, [Value::from("John")]);
    }

    #[test]
    fn values_never_in_sql() {
        let hostile = "'; DROP TABLE users; --";
        let predicate = build_where_clause(
            &conditions! { "name" => hostile },
            &fields(&["id", "name"]),
        );
        assert!(!predicate.sql.contains("DROP"));
        assert_eq!(predicate.sql, r#""name" = ?"#);
        assert_eq!(predicate.params, [Value::from(hostile)]);
    }

    #[test]
    fn identifiers_quoted() {
        let predicate = build_where_clause(
            &conditions! { r#"we"ird"# => 1, "select" => 2 },
            &fields(&[r#"we"ird"#, "select"]),
        );
        assert_eq!(predicate.sql, r#""we""ird" = ? AND "select" = ?"#);
    }

    #[test]
    fn insert_keeps_first_position() {
        let mut conditions = conditions! { "a" => 1, "b" => 2 };
        conditions.insert("a", 3);
        assert_eq!(
            conditions.iter().collect::<Vec<_>>(),
            [("a", &Value::from(3)), ("b", &Value::from(2))]
        );
        assert_eq!(conditions.to_string(), "{ a: 3, b: 2 }");
        assert_eq!(Conditions::new().to_string(), "{}");
        let from_array = Conditions::from([("name", "John"), ("city", "Rome")]);
        assert_eq!(from_array.get("city"), Some(&Value::from("Rome")));
    }

    #[test]
    fn select_statement() {
        let mut sql = String::new();
        let mut params = Vec::new();
        WRITER.write_select(
            &mut sql,
            &mut params,
            "users",
            &fields(&["id", "name"]),
            &conditions! { "name" => "John", "password" => "x" },
            &fields(&["id", "name"]),
            Some(1),
        );
        assert_eq!(
            sql,
            indoc! {r#"
                SELECT "id", "name"
                FROM "users"
                WHERE "name" = ?
                LIMIT 1;
            "#}
            .trim()
        );
        assert_eq!(params, [Value::from("John")]);
    }

    #[test]
    fn insert_statement() {
        let (name, score, id) = (Value::from("John"), Value::from(30), Value::from(7));
        let mut sql = String::new();
        let mut params = Vec::new();
        WRITER.write_insert(
            &mut sql,
            &mut params,
            "users",
            "id",
            &[("name", &name), ("score", &score)],
        );
        assert_eq!(sql, r#"INSERT INTO "users" ("name", "score") VALUES (?, ?);"#);
        assert_eq!(params, [name.clone(), score.clone()]);

        let mut sql = String::new();
        let mut params = Vec::new();
        WRITER.write_insert(
            &mut sql,
            &mut params,
            "users",
            "id",
            &[("id", &id), ("name", &name), ("score", &score)],
        );
        assert_eq!(
            sql,
            indoc! {r#"
                INSERT INTO "users" ("id", "name", "score") VALUES (?, ?, ?)
                ON CONFLICT ("id") DO UPDATE SET
                "name" = EXCLUDED."name",
                "score" = EXCLUDED."score";
            "#}
            .trim()
        );

        let mut sql = String::new();
        WRITER.write_insert(&mut sql, &mut Vec::new(), "users", "id", &[("id", &id)]);
        assert_eq!(
            sql,
            indoc! {r#"
                INSERT INTO "users" ("id") VALUES (?)
                ON CONFLICT ("id") DO NOTHING;
            "#}
            .trim()
        );

        let mut sql = String::new();
        WRITER.write_insert(&mut sql, &mut Vec::new(), "users", "id", &[]);
        assert_eq!(sql, r#"INSERT INTO "users" DEFAULT VALUES;"#);
    }

    #[test]
    fn update_statements() {
        let (score, id) = (Value::from(31), Value::from(7));
        let mut sql = String::new();
        let mut params = Vec::new();
        WRITER.write_update(&mut sql, &mut params, "users", &[("score", &score)], "id", &id);
        assert_eq!(
            sql,
            indoc! {r#"
                UPDATE "users" SET "score" = ?
                WHERE "id" = ?;
            "#}
            .trim()
        );
        assert_eq!(params, [score.clone(), id.clone()]);

        let active = Value::from(false);
        let mut sql = String::new();
        let mut params = Vec::new();
        WRITER.write_bulk_update(
            &mut sql,
            &mut params,
            "users",
            &[("active", &active), ("score", &score)],
            "id",
            &[Value::from(1), Value::from(2), Value::from(3)],
        );
        assert_eq!(
            sql,
            indoc! {r#"
                UPDATE "users" SET "active" = ?, "score" = ?
                WHERE "id" IN (?, ?, ?);
            "#}
            .trim()
        );
        assert_eq!(
            params,
            [
                active,
                score,
                Value::from(1),
                Value::from(2),
                Value::from(3)
            ]
        );
    }

    #[test]
    fn delete_statement() {
        let mut sql = String::new();
        let mut params = Vec::new();
        WRITER.write_delete(
            &mut sql,
            &mut params,
            "users",
            &conditions! { "name" => "John", "email" => Value::Null },
            &fields(&["id", "name", "email"]),
        );
        assert_eq!(
            sql,
            indoc! {r#"
                DELETE FROM "users"
                WHERE "name" = ? AND "email" IS NULL;
            "#}
            .trim()
        );
        assert_eq!(params, [Value::from("John")]);
    }

    #[test]
    fn numbered_placeholders() {
        struct NumberedWriter;
        impl SqlWriter for NumberedWriter {
            fn as_dyn(&self) -> &dyn SqlWriter {
                self
            }
            fn write_placeholder(&self, out: &mut String, index: usize) {
                out.push('$');
                out.push_str(&index.to_string());
            }
        }
        let predicate = build_where_clause_with(
            NumberedWriter.as_dyn(),
            &conditions! { "name" => "John", "email" => Value::Null, "score" => 30 },
            &fields(&["name", "email", "score"]),
        );
        assert_eq!(
            predicate.sql,
            r#""name" = $1 AND "email" IS NULL AND "score" = $2"#
        );
        assert_eq!(predicate.params.len(), 2);
    }
}
