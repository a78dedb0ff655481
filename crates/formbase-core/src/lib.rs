//! Core types for the formbase schema materialization engine.
//!
//! Turns arbitrarily nested JSON documents into a relational layout: one
//! table per nested-object path, linked by surrogate keys and tagged with the
//! owning document. This crate is free of database dependencies; storage
//! backends (e.g. `formbase-store-sqlite`) implement [`sink::DocumentSink`].

// Native `async fn` in traits; the returned futures are bounded explicitly.
#![allow(async_fn_in_trait)]

pub mod batch;
pub mod document;
pub mod error;
pub mod ident;
pub mod report;
pub mod schema;
pub mod shape;
pub mod sink;
pub mod sql_type;

pub use error::{Error, Result};
pub use schema::{ColumnDef, SchemaMap, TableLayout};
pub use sql_type::{ColumnTypePolicy, SqlType, TypeConflict};
