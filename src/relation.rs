//! Relationships between models
//!
//! [`Relations`] is implemented for every [`Model`]:
//! - `has_one` / `belongs_to`: the related record whose primary key is held by one of
//!   this record's fields
//! - `has_many`: related records whose foreign key column holds this record's primary key
//! - `belongs_to_many`: related records linked through a join (pivot) table
//!
//! Join rows are managed with `attach` and `detach`, and read with `pivot`.
//! Accessors always re-query; nothing is cached on the record.

use crate::active_model::ActiveRecord;
use crate::error::TideError;
use crate::executor::TideExecutor;
use crate::model::{find_attribute, primary_value, Model};
use crate::query::QueryBuilder;
use crate::value::{Row, Value};
use std::any::TypeId;

/// Relationship accessors available on every model
///
/// # Example
///
/// ```no_run
/// use tidewater::{attribute, Attribute, Database, Model, Relations, TideError};
///
/// #[derive(Debug, Clone, Default)]
/// struct User {
///     id: Option<i64>,
///     name: String,
/// }
///
/// #[derive(Debug, Clone, Default)]
/// struct Game {
///     id: Option<i64>,
///     user_id: Option<i64>,
/// }
///
/// impl Model for User {
///     fn attributes() -> Vec<Attribute<Self>> {
///         vec![attribute!(User, id), attribute!(User, name)]
///     }
/// }
///
/// impl Model for Game {
///     fn attributes() -> Vec<Attribute<Self>> {
///         vec![attribute!(Game, id), attribute!(Game, user_id)]
///     }
/// }
///
/// # fn main() -> Result<(), TideError> {
/// let db = Database::open_in_memory()?;
/// let user = User { id: Some(7), name: "Alice".into() };
/// let games: Vec<Game> = user.has_many(&db, "user_id")?;
///
/// let mut game = Game::default();
/// user.associate(&db, &mut game, "user_id")?; // saves `game` with user_id = 7
/// # Ok(())
/// # }
/// ```
pub trait Relations: Model {
    /// Related record whose primary key equals this record's `foreign_key` field
    ///
    /// `foreign_key` may name the field or its column.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Relationship` if no field matches `foreign_key`.
    fn has_one<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        foreign_key: &str,
    ) -> Result<Option<R>, TideError> {
        let attribute = find_attribute::<Self>(foreign_key)
            .ok_or_else(|| missing_foreign_key::<Self>(foreign_key))?;
        R::query()
            .where_eq(R::primary_key(), attribute.get(self))
            .first(exec)
    }

    /// Owning record, read through the field named `foreign_key`
    ///
    /// # Errors
    ///
    /// Returns `TideError::Relationship` if no field is named `foreign_key`.
    fn belongs_to<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        foreign_key: &str,
    ) -> Result<Option<R>, TideError> {
        let attribute = Self::attributes()
            .into_iter()
            .find(|a| !a.is_ignored() && a.name() == foreign_key)
            .ok_or_else(|| missing_foreign_key::<Self>(foreign_key))?;
        R::query()
            .where_eq(R::primary_key(), attribute.get(self))
            .first(exec)
    }

    /// Related records whose `foreign_key` column holds this record's primary key
    ///
    /// # Errors
    ///
    /// Returns `TideError::Configuration` if this model has no primary key field, or
    /// the query error.
    fn has_many<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        foreign_key: &str,
    ) -> Result<Vec<R>, TideError> {
        R::query()
            .where_eq(foreign_key, primary_value(self)?)
            .get(exec)
    }

    /// Related records linked through `join_table`
    ///
    /// `this_key` is the join column holding this record's key and `related_key` the
    /// one holding the related record's key.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Configuration` if this model has no primary key field, or
    /// the query error.
    fn belongs_to_many<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        join_table: &str,
        this_key: &str,
        related_key: &str,
    ) -> Result<Vec<R>, TideError> {
        let ids = QueryBuilder::table(join_table)
            .where_eq(this_key, primary_value(self)?)
            .pluck_list(exec, related_key)?;
        R::query().where_in(R::primary_key(), ids).get(exec)
    }

    /// Point `instance`'s `foreign_key` at this record and save it
    ///
    /// # Errors
    ///
    /// Returns `TideError::Relationship` if `R` is this model's type or `instance`
    /// has no field matching `foreign_key`, `TideError::NullPrimaryKey` if this
    /// record is unsaved, or the save error.
    fn associate<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        instance: &mut R,
        foreign_key: &str,
    ) -> Result<(), TideError> {
        ensure_distinct::<Self, R>()?;
        let attribute =
            find_attribute::<R>(foreign_key).ok_or_else(|| missing_foreign_key::<R>(foreign_key))?;
        attribute.set(instance, key_of(self)?)?;
        instance.save(exec)
    }

    /// Insert the join row linking this record and `instance`
    ///
    /// Returns `false` without writing when `instance` is already linked.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Relationship` if `R` is this model's type,
    /// `TideError::NullPrimaryKey` if either record is unsaved, or the execution error.
    fn attach<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        join_table: &str,
        this_key: &str,
        related_key: &str,
        instance: &R,
    ) -> Result<bool, TideError> {
        ensure_distinct::<Self, R>()?;
        let this = key_of(self)?;
        let related = key_of(instance)?;

        for linked in self.belongs_to_many::<R, E>(exec, join_table, this_key, related_key)? {
            if primary_value(&linked)? == related {
                log::debug!("{} {related} already attached to {this}", R::type_name());
                return Ok(false);
            }
        }

        let row = Row::new().with(this_key, this).with(related_key, related);
        QueryBuilder::table(join_table).insert(exec, &row)?;
        Ok(true)
    }

    /// Delete the join rows linking this record and each of `instances`
    ///
    /// # Errors
    ///
    /// Returns `TideError::Relationship` if `R` is this model's type,
    /// `TideError::NullPrimaryKey` if a record is unsaved, or the execution error.
    fn detach<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        join_table: &str,
        this_key: &str,
        related_key: &str,
        instances: &[R],
    ) -> Result<u64, TideError> {
        ensure_distinct::<Self, R>()?;
        if instances.is_empty() {
            return Ok(0);
        }
        let this = key_of(self)?;
        let mut deleted = 0;
        for instance in instances {
            deleted += QueryBuilder::table(join_table)
                .where_eq(this_key, this.clone())
                .where_eq(related_key, key_of(instance)?)
                .delete(exec)?;
        }
        Ok(deleted)
    }

    /// The join row linking this record and `instance`
    ///
    /// # Errors
    ///
    /// Returns `TideError::NullPrimaryKey` if either record is unsaved, or the query
    /// error.
    fn pivot<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        join_table: &str,
        this_key: &str,
        related_key: &str,
        instance: &R,
    ) -> Result<Option<Row>, TideError> {
        QueryBuilder::table(join_table)
            .where_eq(this_key, key_of(self)?)
            .where_eq(related_key, key_of(instance)?)
            .first(exec)
    }

    /// One column of the join row linking this record and `instance`
    ///
    /// # Errors
    ///
    /// Returns `TideError::NullPrimaryKey` if either record is unsaved, or the query
    /// error.
    fn pivot_value<R: Model, E: TideExecutor + ?Sized>(
        &self,
        exec: &E,
        join_table: &str,
        this_key: &str,
        related_key: &str,
        instance: &R,
        column: &str,
    ) -> Result<Option<Value>, TideError> {
        QueryBuilder::table(join_table)
            .where_eq(this_key, key_of(self)?)
            .where_eq(related_key, key_of(instance)?)
            .value(exec, column)
    }
}

impl<M: Model> Relations for M {}

fn ensure_distinct<M: Model, R: Model>() -> Result<(), TideError> {
    if TypeId::of::<M>() == TypeId::of::<R>() {
        return Err(TideError::Relationship(format!(
            "Cannot relate {} to itself",
            M::type_name()
        )));
    }
    Ok(())
}

fn missing_foreign_key<M: Model>(foreign_key: &str) -> TideError {
    TideError::Relationship(format!(
        "Foreign key {foreign_key} not found on {}",
        M::type_name()
    ))
}

/// Non-null primary key value of `record`
fn key_of<M: Model>(record: &M) -> Result<Value, TideError> {
    let value = primary_value(record)?;
    if value.is_null() {
        return Err(TideError::NullPrimaryKey(M::primary_key().to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute;
    use crate::model::Attribute;
    use crate::test_helpers::TestDatabase;
    use crate::ErrorKind;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Author {
        id: Option<i64>,
        name: String,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Book {
        id: Option<i64>,
        author_id: Option<i64>,
        title: String,
    }

    impl Model for Author {
        fn attributes() -> Vec<Attribute<Self>> {
            vec![attribute!(Author, id), attribute!(Author, name)]
        }
    }

    impl Model for Book {
        fn attributes() -> Vec<Attribute<Self>> {
            vec![
                attribute!(Book, id),
                attribute!(Book, author_id => "writer"),
                attribute!(Book, title),
            ]
        }
    }

    const SCHEMA: &str = "
        create table authors (id integer primary key, name text);
        create table books (id integer primary key, writer integer, title text);
    ";

    fn seeded() -> (TestDatabase, Author) {
        let db = TestDatabase::new(SCHEMA).unwrap();
        let author = Author::create(&*db, &Author { id: None, name: "Le Guin".into() }).unwrap();
        (db, author)
    }

    #[test]
    fn test_associate_and_has_many() {
        let (db, author) = seeded();
        for title in ["Earthsea", "The Dispossessed"] {
            let mut book = Book {
                title: title.into(),
                ..Book::default()
            };
            author.associate(&*db, &mut book, "writer").unwrap();
            assert_eq!(book.author_id, author.id);
            assert!(book.id.is_some());
        }

        db.listener().clear();
        let books: Vec<Book> = author.has_many(&*db, "writer").unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(db.listener().queries(), vec!["select * from `books` where `writer` = ?"]);
    }

    #[test]
    fn test_owner_lookups() {
        let (db, author) = seeded();
        let mut book = Book {
            title: "Lathe".into(),
            ..Book::default()
        };
        author.associate(&*db, &mut book, "author_id").unwrap();

        let by_field: Option<Author> = book.belongs_to(&*db, "author_id").unwrap();
        assert_eq!(by_field, Some(author.clone()));
        let by_column: Option<Author> = book.has_one(&*db, "writer").unwrap();
        assert_eq!(by_column, Some(author));

        // EDGE CASE: belongs_to only resolves field names
        let err = book.belongs_to::<Author, _>(&*db, "writer").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Relationship);
    }

    #[test]
    fn test_unsaved_owner_has_no_books() {
        let (db, _) = seeded();
        let loose = Book {
            title: "Orphan".into(),
            ..Book::default()
        };
        let owner: Option<Author> = loose.belongs_to(&*db, "author_id").unwrap();
        assert_eq!(owner, None);
    }

    #[test]
    fn test_same_type_is_refused() {
        let (db, author) = seeded();
        let mut other = Author::default();
        let err = author.associate(&*db, &mut other, "id").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Relationship);

        let err = author
            .attach(&*db, "friends", "a", "b", &author.clone())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Relationship);
    }

    #[test]
    fn test_detach_empty_slice_is_noop() {
        let (db, author) = seeded();
        db.listener().clear();
        let deleted = author
            .detach::<Book, _>(&*db, "author_book", "author_id", "book_id", &[])
            .unwrap();
        assert_eq!(deleted, 0);
        assert!(db.listener().queries().is_empty());
    }
}
