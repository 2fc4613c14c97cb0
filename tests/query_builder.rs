//! Integration tests for the fluent builder running on SQLite

mod common;

use chrono::NaiveDate;
use common::database;
use tidewater::{Grammar, Order, Outcome, QueryBuilder, Row, TideExecutor, Value};

fn seed(db: &dyn TideExecutor) {
    let users = [
        ("Alice", 31, "2023-01-15"),
        ("Bob", 17, "2023-06-30"),
        ("Carol", 45, "2024-01-02"),
        ("Dave", 31, "2024-03-09"),
    ];
    for (name, age, joined) in users {
        let row = Row::new()
            .with("name", name)
            .with("age", age)
            .with("joined", joined);
        QueryBuilder::table("users").insert(db, &row).unwrap();
    }
}

#[test]
fn test_compiled_sql_shape() {
    let (sql, params) = QueryBuilder::table("users")
        .where_op("age", ">", 18)
        .order_by("name", Order::Asc)
        .limit(10)
        .to_sql();
    assert_eq!(sql, "select * from `users` where `age` > ? order by `name` asc limit 10");
    assert_eq!(params, vec![Value::Integer(18)]);
}

#[test]
fn test_placeholders_match_parameters() {
    let (sql, params) = QueryBuilder::table("users")
        .where_eq("name", "Alice")
        .or_where_op("age", "<", 20)
        .where_in("ID", [1, 2, 3])
        .where_like("email", "%@example.com")
        .where_date("joined", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        .group_by(&["age"])
        .having("age", ">", 10)
        .to_sql_with(Grammar::Sqlite);
    assert_eq!(sql.matches('?').count(), params.len());
    assert_eq!(params.first(), Some(&Value::from("Alice")));
    assert_eq!(params.last(), Some(&Value::Integer(10)));
}

#[test]
fn test_filters_against_sqlite() {
    let db = database();
    seed(&*db);

    let names = |b: QueryBuilder| -> Vec<Value> { b.order_by("name", Order::Asc).pluck_list(&*db, "name").unwrap() };

    assert_eq!(
        names(QueryBuilder::table("users").where_eq("age", 31)),
        vec![Value::from("Alice"), Value::from("Dave")]
    );
    assert_eq!(
        names(QueryBuilder::table("users").where_year("joined", 2024)),
        vec![Value::from("Carol"), Value::from("Dave")]
    );
    assert_eq!(
        names(QueryBuilder::table("users").where_month("joined", 6)),
        vec![Value::from("Bob")]
    );
    assert_eq!(
        names(QueryBuilder::table("users").where_not_in("name", ["Alice", "Bob"])),
        vec![Value::from("Carol"), Value::from("Dave")]
    );
    assert_eq!(
        names(
            QueryBuilder::table("users")
                .where_date_op("joined", "<", NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
        ),
        vec![Value::from("Alice"), Value::from("Bob")]
    );
}

#[test]
fn test_empty_in_set() {
    let db = database();
    seed(&*db);

    let builder = QueryBuilder::table("users").where_in("ID", Vec::<i64>::new());
    assert_eq!(builder.to_sql().0, "select * from `users` where 0 = 1");
    assert!(builder.get(&*db).unwrap().is_empty());

    // EDGE CASE: an empty exclusion set keeps every row
    let all = QueryBuilder::table("users")
        .where_not_in("ID", Vec::<i64>::new())
        .count(&*db)
        .unwrap();
    assert_eq!(all, 4);
}

#[test]
fn test_aggregates_and_grouping() {
    let db = database();
    seed(&*db);

    assert_eq!(QueryBuilder::table("users").count(&*db).unwrap(), 4);
    assert_eq!(QueryBuilder::table("users").avg(&*db, "age").unwrap(), Some(31.0));
    assert_eq!(
        QueryBuilder::table("users").where_eq("name", "Nobody").max(&*db, "age").unwrap(),
        None
    );
    assert_eq!(
        QueryBuilder::table("users").where_eq("name", "Nobody").sum(&*db, "age").unwrap(),
        0.0
    );

    let repeated = QueryBuilder::table("users")
        .select(&["age"])
        .group_by(&["age"])
        .having_raw("count(*) > 1")
        .get(&*db)
        .unwrap();
    assert_eq!(repeated.len(), 1);
    assert_eq!(repeated[0].get("age"), Some(&Value::Integer(31)));
}

#[test]
fn test_paging_and_first() {
    let db = database();
    seed(&*db);

    let page = QueryBuilder::table("users")
        .oldest("ID")
        .skip(1)
        .take(2)
        .pluck_list(&*db, "name")
        .unwrap();
    assert_eq!(page, vec![Value::from("Bob"), Value::from("Carol")]);

    let youngest = QueryBuilder::table("users").oldest("age").value(&*db, "name").unwrap();
    assert_eq!(youngest, Some(Value::from("Bob")));

    // EDGE CASE: offset without limit on SQLite
    let tail = QueryBuilder::table("users").oldest("ID").offset(3).get(&*db).unwrap();
    assert_eq!(tail.len(), 1);
}

#[test]
fn test_update_increment_delete() {
    let db = database();
    seed(&*db);

    let updated = QueryBuilder::table("users")
        .where_eq("age", 31)
        .update(&*db, &Row::new().with("email", "thirty-one@example.com"))
        .unwrap();
    assert_eq!(updated, 2);

    QueryBuilder::table("users")
        .where_eq("name", "Bob")
        .increment(&*db, "age", 2)
        .unwrap();
    let bob = QueryBuilder::table("users").where_eq("name", "Bob").value(&*db, "age").unwrap();
    assert_eq!(bob.and_then(|v| v.as_i64()), Some(19));

    QueryBuilder::table("users").where_eq("name", "Carol").decrement(&*db, "age", 5).unwrap();
    assert!(QueryBuilder::table("users").where_eq("age", 40).exists(&*db).unwrap());

    let deleted = QueryBuilder::table("users").where_op("age", ">", 30).delete(&*db).unwrap();
    assert_eq!(deleted, 3);
    assert!(QueryBuilder::table("users").where_op("age", ">", 30).doesnt_exist(&*db).unwrap());

    QueryBuilder::table("users").truncate(&*db).unwrap();
    assert_eq!(QueryBuilder::table("users").count(&*db).unwrap(), 0);
}

#[test]
fn test_join_and_union() {
    let db = database();
    seed(&*db);
    let alice = QueryBuilder::table("users").where_eq("name", "Alice").value(&*db, "ID").unwrap();
    QueryBuilder::table("games")
        .insert(&*db, &Row::new().with("user_id", alice).with("title", "Go"))
        .unwrap();

    let rows = QueryBuilder::table("users")
        .select(&["users.name", "games.title"])
        .join("games", "users.ID", "=", "games.user_id")
        .get(&*db)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("title"), Some(&Value::from("Go")));

    let both = QueryBuilder::table("users")
        .select(&["name"])
        .where_eq("age", 17)
        .union(QueryBuilder::table("users").select(&["name"]).where_eq("age", 45))
        .get(&*db)
        .unwrap();
    assert_eq!(both.len(), 2);
}

#[test]
fn test_insert_get_id_and_run() {
    let db = database();
    let id = QueryBuilder::table("roles")
        .insert_get_id(&*db, &Row::new().with("label", "admin"))
        .unwrap();
    assert_eq!(id, Value::Integer(1));

    let outcome = db.run("select label from roles", &[]).unwrap();
    assert!(matches!(outcome, Outcome::Rows(ref rows) if rows.len() == 1));
}

#[test]
fn test_insert_get_id_unsupported() {
    let database = tidewater::Database::open_in_memory()
        .unwrap()
        .with_insert_get_id(false);
    let db = tidewater::test_helpers::TestDatabase::from_database(database, common::SCHEMA).unwrap();
    let err = QueryBuilder::table("roles")
        .insert_get_id(&*db, &Row::new().with("label", "admin"))
        .unwrap_err();
    assert_eq!(err.kind(), tidewater::ErrorKind::Unsupported);
}
