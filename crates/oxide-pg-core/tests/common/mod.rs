//! Shared records and an in-memory catalog for the integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;

use chrono::{DateTime, Utc};
use oxide_pg_core::catalog::{CatalogSource, ColumnRow, ConstraintRow, Trigger, UniqueIndexRow};
use oxide_pg_derive::Record;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[table(name = "nodes")]
pub struct Node {
    #[pg("type=uuid,primary,default=gen_random_uuid()")]
    pub id: Uuid,
    #[pg("type=varchar(255)")]
    pub name: String,
    #[pg("type=uuid,nullable,ref=(id cascade)")]
    pub source_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Address {
    #[pg("type=text")]
    pub street: String,
    #[pg("type=text")]
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Audit {
    #[pg("type=timestamptz,default=now()")]
    pub created_at: DateTime<Utc>,
    #[pg("type=text,nullable")]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[table(name = "customers")]
pub struct Customer {
    #[pg("type=uuid,primary")]
    pub id: Uuid,
    #[pg("type=varchar(255),unique_index=customers_email_uindex")]
    pub email: String,
    #[pg("name=display_name,type=text")]
    pub name: String,
    #[pg("type=integer,default=0,check=age >= 0")]
    pub age: i32,
    #[pg(embed)]
    pub audit: Audit,
    #[pg(embed = "type=jsonb,nullable")]
    pub address: Address,
    #[pg("-")]
    pub session: String,
    pub cache: Vec<u8>,
}

/// Catalog rows served from memory.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub columns: Vec<ColumnRow>,
    pub constraints: Vec<ConstraintRow>,
    pub unique_indexes: Vec<UniqueIndexRow>,
    pub triggers: Vec<Trigger>,
}

fn narrow<T: Clone>(rows: &[T], tables: &[String], table_of: impl Fn(&T) -> &str) -> Vec<T> {
    rows.iter()
        .filter(|row| tables.is_empty() || tables.iter().any(|t| t == table_of(row)))
        .cloned()
        .collect()
}

impl CatalogSource for FakeCatalog {
    type Error = Infallible;

    fn column_rows(
        &self,
        _search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<ColumnRow>, Self::Error>> + Send {
        let rows = narrow(&self.columns, tables, |r| r.table_name.as_str());
        async move { Ok(rows) }
    }

    fn constraint_rows(
        &self,
        _search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<ConstraintRow>, Self::Error>> + Send {
        let rows = narrow(&self.constraints, tables, |r| r.table_name.as_str());
        async move { Ok(rows) }
    }

    fn unique_index_rows(
        &self,
        _search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<UniqueIndexRow>, Self::Error>> + Send {
        let rows = narrow(&self.unique_indexes, tables, |r| r.table_name.as_str());
        async move { Ok(rows) }
    }

    fn trigger_rows(
        &self,
        _search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<Trigger>, Self::Error>> + Send {
        let rows = narrow(&self.triggers, tables, |r| r.table_name.as_str());
        async move { Ok(rows) }
    }
}

pub fn column_row(table: &str, name: &str, position: i32, data_type: &str) -> ColumnRow {
    ColumnRow {
        table_name: table.into(),
        table_type: "BASE TABLE".into(),
        column_name: name.into(),
        ordinal_position: position,
        data_type: data_type.into(),
        ..ColumnRow::default()
    }
}

pub fn constraint_row(table: &str, column: &str, name: &str, kind: &str, definition: &str) -> ConstraintRow {
    ConstraintRow {
        table_name: table.into(),
        column_name: column.into(),
        constraint_name: name.into(),
        constraint_type: kind.into(),
        constraint_definition: definition.into(),
        index_type: String::new(),
    }
}

/// The live shape of [`Node`].
pub fn nodes_catalog() -> FakeCatalog {
    let mut id = column_row("nodes", "id", 1, "uuid");
    id.column_default = Some("gen_random_uuid()".into());
    let mut source_id = column_row("nodes", "source_id", 3, "uuid");
    source_id.is_nullable = true;

    FakeCatalog {
        columns: vec![
            id,
            column_row("nodes", "name", 2, "character varying(255)"),
            source_id,
        ],
        constraints: vec![
            constraint_row("nodes", "id", "nodes_pkey", "p", "PRIMARY KEY (id)"),
            constraint_row(
                "nodes",
                "source_id",
                "nodes_source_id_fkey",
                "f",
                "FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE",
            ),
        ],
        ..FakeCatalog::default()
    }
}
