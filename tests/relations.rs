//! Integration tests for relationship accessors and pivot tables

mod common;

use common::{database, fake_user, game, role, Game, Role, User};
use tidewater::{ActiveRecord, ErrorKind, QueryBuilder, Relations, Value};

#[test]
fn test_has_many_query_shape() {
    let db = database();
    let mut user = fake_user(22);
    user.id = Some(7);
    user.save(&*db).unwrap();

    for (title, score) in [("Chess", 1200.0), ("Go", 5.5)] {
        let mut g = game(title, score);
        user.associate(&*db, &mut g, "user_id").unwrap();
    }
    let mut unowned = game("Unowned", 0.0);
    unowned.save(&*db).unwrap();

    db.listener().clear();
    let games: Vec<Game> = user.has_many(&*db, "user_id").unwrap();
    assert_eq!(games.len(), 2);
    assert!(games.iter().all(|g| g.user_id == Some(7)));
    assert_eq!(db.listener().queries(), vec!["select * from `games` where `user_id` = ?"]);
}

#[test]
fn test_belongs_to_and_has_one() {
    let db = database();
    let user = User::create(&*db, &fake_user(30)).unwrap();
    let mut g = game("Tetris", 99.0);
    user.associate(&*db, &mut g, "user_id").unwrap();

    let owner: Option<User> = g.belongs_to(&*db, "user_id").unwrap();
    assert_eq!(owner, Some(user.clone()));
    let owner: Option<User> = g.has_one(&*db, "user_id").unwrap();
    assert_eq!(owner, Some(user));

    let err = g.has_one::<User, _>(&*db, "owner").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Relationship);
}

#[test]
fn test_attach_is_idempotent() {
    let db = database();
    let user = User::create(&*db, &fake_user(30)).unwrap();
    let admin = Role::create(&*db, &role("admin")).unwrap();

    assert!(user.attach(&*db, "role_user", "user_id", "role_id", &admin).unwrap());
    assert!(!user.attach(&*db, "role_user", "user_id", "role_id", &admin).unwrap());

    let join_rows = QueryBuilder::table("role_user").count(&*db).unwrap();
    assert_eq!(join_rows, 1);
}

#[test]
fn test_belongs_to_many_and_detach() {
    let db = database();
    let user = User::create(&*db, &fake_user(30)).unwrap();
    let roles: Vec<Role> = ["admin", "editor", "viewer"]
        .into_iter()
        .map(|label| Role::create(&*db, &role(label)).unwrap())
        .collect();

    // EDGE CASE: no join rows yet
    let none: Vec<Role> = user.belongs_to_many(&*db, "role_user", "user_id", "role_id").unwrap();
    assert!(none.is_empty());

    for r in &roles {
        user.attach(&*db, "role_user", "user_id", "role_id", r).unwrap();
    }
    let linked: Vec<Role> = user.belongs_to_many(&*db, "role_user", "user_id", "role_id").unwrap();
    assert_eq!(linked, roles);

    let removed = user
        .detach(&*db, "role_user", "user_id", "role_id", &roles[..2])
        .unwrap();
    assert_eq!(removed, 2);
    let linked: Vec<Role> = user.belongs_to_many(&*db, "role_user", "user_id", "role_id").unwrap();
    assert_eq!(linked, vec![roles[2].clone()]);
}

#[test]
fn test_pivot_row_and_value() {
    let db = database();
    let user = User::create(&*db, &fake_user(30)).unwrap();
    let editor = Role::create(&*db, &role("editor")).unwrap();
    let viewer = Role::create(&*db, &role("viewer")).unwrap();

    user.attach(&*db, "role_user", "user_id", "role_id", &editor).unwrap();
    QueryBuilder::table("role_user")
        .where_eq("role_id", editor.id)
        .update(&*db, &tidewater::Row::new().with("granted_by", "root"))
        .unwrap();

    let pivot = user
        .pivot(&*db, "role_user", "user_id", "role_id", &editor)
        .unwrap()
        .expect("join row exists");
    assert_eq!(pivot.get("role_id"), Some(&Value::from(editor.id)));

    let granted = user
        .pivot_value(&*db, "role_user", "user_id", "role_id", &editor, "granted_by")
        .unwrap();
    assert_eq!(granted, Some(Value::from("root")));

    let missing = user
        .pivot(&*db, "role_user", "user_id", "role_id", &viewer)
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn test_attach_requires_saved_records() {
    let db = database();
    let user = User::create(&*db, &fake_user(30)).unwrap();
    let err = user
        .attach(&*db, "role_user", "user_id", "role_id", &role("unsaved"))
        .unwrap_err();
    assert!(matches!(err, tidewater::TideError::NullPrimaryKey(_)));
}
