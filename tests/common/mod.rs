//! Models and schema shared by the integration suites

#![allow(dead_code)]

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use tidewater::test_helpers::TestDatabase;
use tidewater::{attribute, Attribute, Model};

pub const SCHEMA: &str = r#"
    CREATE TABLE users (
        ID INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        age INTEGER,
        joined TEXT
    );
    CREATE TABLE games (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        title TEXT NOT NULL,
        score REAL
    );
    CREATE TABLE roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL
    );
    CREATE TABLE role_user (
        user_id INTEGER NOT NULL,
        role_id INTEGER NOT NULL,
        granted_by TEXT
    );
"#;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub joined: Option<chrono::NaiveDate>,
    pub session: Option<String>,
}

impl Model for User {
    fn attributes() -> Vec<Attribute<Self>> {
        vec![
            attribute!(User, id => "ID"),
            attribute!(User, name),
            attribute!(User, email),
            attribute!(User, age),
            attribute!(User, joined),
            attribute!(User, session).ignored(),
        ]
    }

    fn primary_key() -> &'static str {
        "ID"
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Game {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub title: String,
    pub score: Option<f64>,
}

impl Model for Game {
    fn attributes() -> Vec<Attribute<Self>> {
        vec![
            attribute!(Game, id),
            attribute!(Game, user_id),
            attribute!(Game, title),
            attribute!(Game, score),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Role {
    pub id: Option<i64>,
    pub label: String,
}

impl Model for Role {
    fn attributes() -> Vec<Attribute<Self>> {
        vec![attribute!(Role, id), attribute!(Role, label)]
    }
}

pub fn database() -> TestDatabase {
    TestDatabase::new(SCHEMA).expect("Failed to create test database")
}

pub fn fake_user(age: i32) -> User {
    User {
        name: Name().fake(),
        email: Some(SafeEmail().fake()),
        age: Some(age),
        ..User::default()
    }
}

pub fn game(title: &str, score: f64) -> Game {
    Game {
        title: title.to_string(),
        score: Some(score),
        ..Game::default()
    }
}

pub fn role(label: &str) -> Role {
    Role {
        id: None,
        label: label.to_string(),
    }
}
