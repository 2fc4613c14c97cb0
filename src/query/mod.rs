//! Query building
//!
//! - **`builder`** - [`QueryBuilder`], the raw fluent builder over one table
//! - **`model_query`** - [`ModelQuery`], a builder bound to one [`Model`](crate::Model)
//!   type exposing only type-aware terminals
//! - **`grammar`** - [`Grammar`], per-backend dialect rendering
//! - **`disambiguate`** - the quoted compound identifier pass applied to compiled SQL

pub mod builder;
pub mod disambiguate;
pub mod grammar;
pub mod model_query;

pub use builder::{Numeric, Order, QueryBuilder};
pub use disambiguate::disambiguate;
pub use grammar::{DatePart, Grammar, Lock};
pub use model_query::ModelQuery;
