//! Integration tests for explicit transactions and implicit statement transactions

mod common;

use common::{database, fake_user, User};
use tidewater::{ActiveRecord, Database, QueryBuilder, Relations, Row, TideError, TideExecutor};

#[test]
fn test_records_saved_inside_committed_transaction() {
    let db = database();
    let tx = db.begin().unwrap();
    let mut user = fake_user(28);
    user.save(&tx).unwrap();
    assert_eq!(User::count(&tx).unwrap(), 1);
    tx.commit().unwrap();

    assert_eq!(User::count(&*db).unwrap(), 1);
}

#[test]
fn test_rolled_back_and_dropped_transactions_leave_no_rows() {
    let db = database();

    let tx = db.begin().unwrap();
    User::create(&tx, &fake_user(1)).unwrap();
    tx.rollback().unwrap();
    assert_eq!(User::count(&*db).unwrap(), 0);

    {
        let tx = db.begin().unwrap();
        User::create(&tx, &fake_user(2)).unwrap();
    }
    assert_eq!(User::count(&*db).unwrap(), 0);
}

#[test]
fn test_implicit_transactions_suppressed_inside_explicit_one() {
    let db = database();
    let tx = db.begin().unwrap();
    QueryBuilder::table("roles")
        .insert(&tx, &Row::new().with("label", "a"))
        .unwrap();
    QueryBuilder::table("roles")
        .insert(&tx, &Row::new().with("label", "b"))
        .unwrap();
    tx.commit().unwrap();

    // statement text only; transaction control is not reported to listeners
    assert_eq!(db.listener().queries_starting_with("insert").len(), 2);
    assert_eq!(QueryBuilder::table("roles").count(&*db).unwrap(), 2);
}

#[test]
fn test_nested_savepoint_rollback() {
    let db = database();
    let user = User::create(&*db, &fake_user(50)).unwrap();

    let mut tx = db.begin().unwrap();
    let mut game = common::game("Outer", 1.0);
    user.associate(&tx, &mut game, "user_id").unwrap();

    let nested = tx.begin_nested().unwrap();
    let mut lost = common::game("Inner", 2.0);
    user.associate(&nested, &mut lost, "user_id").unwrap();
    nested.rollback().unwrap();

    tx.commit().unwrap();
    let titles = QueryBuilder::table("games").pluck_list(&*db, "title").unwrap();
    assert_eq!(titles, vec![tidewater::Value::from("Outer")]);
}

#[test]
fn test_closure_transaction_rolls_back_failed_work() {
    let db = Database::open_in_memory().unwrap();
    db.execute_batch("create table t (x integer)").unwrap();
    let result: Result<(), TideError> = db.transaction(|tx| {
        tx.execute("insert into t (x) values (1)", &[])?;
        tx.execute("insert into missing (x) values (1)", &[])?;
        Ok(())
    });
    assert!(result.is_err());
    assert_eq!(QueryBuilder::table("t").count(&db).unwrap(), 0);
}

#[test]
fn test_disabled_implicit_transactions() {
    let raw = Database::open_in_memory().unwrap().with_transactions(false);
    raw.execute_batch("create table t (x integer unique)").unwrap();
    raw.execute("insert into t (x) values (1)", &[]).unwrap();
    assert!(raw.execute("insert into t (x) values (1)", &[]).is_err());
    assert_eq!(QueryBuilder::table("t").count(&raw).unwrap(), 1);
}
