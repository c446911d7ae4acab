//! INSERT and UPSERT generation.

use tracing::trace;

use super::{
    ensure_writable, extract_arguments, quote_identifier, quote_list,
    value_placeholder, Argument, Statement,
};
use crate::error::QueryBuildError;
use crate::record::Record;
use crate::table::Table;

/// Options of an INSERT statement.
///
/// ```rust,ignore
/// let (sql, args) = InsertQuery::new(&table)
///     .on_conflict("customer_unique_idx")
///     .returning()
///     .build(&customer)?;
/// ```
#[derive(Debug, Clone)]
pub struct InsertQuery<'a> {
    table: &'a Table,
    returning: bool,
    upsert: bool,
    force_on_conflict: Option<String>,
    full: bool,
}

/// Resolved `ON CONFLICT` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OnConflict {
    target: Vec<String>,
    action: String,
}

impl OnConflict {
    fn is_update(&self) -> bool {
        self.action.to_ascii_uppercase().contains("DO UPDATE")
    }
}

impl<'a> InsertQuery<'a> {
    /// Starts an INSERT into `table`.
    #[must_use]
    pub const fn new(table: &'a Table) -> Self {
        Self {
            table,
            returning: false,
            upsert: false,
            force_on_conflict: None,
            full: false,
        }
    }

    /// Appends `RETURNING` the primary key when the conflict path allows it.
    #[must_use]
    pub const fn returning(mut self) -> Self {
        self.returning = true;
        self
    }

    /// Updates every inserted column on a unique violation.
    #[must_use]
    pub const fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    /// Forces the conflict target: a unique index name or a unique column name.
    #[must_use]
    pub fn on_conflict(mut self, target: impl Into<String>) -> Self {
        self.force_on_conflict = Some(target.into());
        self
    }

    /// Inserts zero values too, instead of leaving them to column defaults.
    #[must_use]
    pub const fn full(mut self) -> Self {
        self.full = true;
        self
    }

    /// Builds the statement for `record`.
    pub fn build<R: Record>(&self, record: &R) -> Result<Statement, QueryBuildError> {
        let table = self.table;
        ensure_writable(table)?;

        let args: Vec<Argument<'_>> = extract_arguments(table, record, true, |c| !c.auto_generated)?
            .into_iter()
            .filter(|a| {
                if self.full {
                    !(a.column.is_generated() && a.value.is_zero())
                } else {
                    !a.value.is_zero()
                }
            })
            .collect();

        if args.is_empty() {
            return Err(QueryBuildError::NoArguments {
                table: table.name.clone(),
            });
        }

        let columns: Vec<&str> = args.iter().map(|a| a.column.name.as_str()).collect();
        let placeholders: Vec<String> = args
            .iter()
            .enumerate()
            .map(|(i, a)| value_placeholder(table, a.column, i + 1))
            .collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.qualified_name(),
            quote_list(columns.iter().copied()),
            placeholders.join(", ")
        );

        let conflict = self.resolve_conflict(&args)?;
        if let Some(conflict) = &conflict {
            sql.push_str(" ON CONFLICT");
            if !conflict.target.is_empty() {
                sql.push_str(&format!(
                    " ({})",
                    quote_list(conflict.target.iter().map(String::as_str))
                ));
            }
            sql.push(' ');
            sql.push_str(&conflict.action);
        }

        if self.returning && conflict.as_ref().map_or(true, OnConflict::is_update) {
            if let Some(primary_key) = table.primary_key() {
                sql.push_str(" RETURNING ");
                sql.push_str(&quote_identifier(&primary_key.name));
            }
        }
        sql.push(';');

        trace!(table = %table.name, %sql, "built insert query");
        Ok((sql, args.into_iter().map(|a| a.value).collect()))
    }

    /// Conflict precedence: forced target, then the table's declared action,
    /// then an automatic upsert.
    fn resolve_conflict(&self, args: &[Argument<'_>]) -> Result<Option<OnConflict>, QueryBuildError> {
        let table = self.table;
        let inserted: Vec<&str> = args.iter().map(|a| a.column.name.as_str()).collect();

        if let Some(name) = &self.force_on_conflict {
            let target = if let Some(group) = table
                .unique_indexes()
                .into_iter()
                .find(|g| g.name == *name)
            {
                group.columns
            } else if let Some(column) = table
                .column(name)
                .filter(|c| c.unique || !c.unique_index.is_empty())
            {
                vec![column.name.clone()]
            } else {
                return Err(QueryBuildError::UnresolvedConflictTarget {
                    table: table.name.clone(),
                    name: name.clone(),
                });
            };
            let action = update_action(&inserted, &target);
            return Ok(Some(OnConflict { target, action }));
        }

        if let Some(column) = table.conflict_column() {
            let mut target = names_where(args, |a| a.column.unique);
            if target.is_empty() {
                target = names_where(args, |a| !a.column.unique_index.is_empty());
            }
            return Ok(Some(OnConflict {
                target,
                action: column.conflict.clone(),
            }));
        }

        if self.upsert {
            let mut target = names_where(args, |a| !a.column.unique_index.is_empty());
            if target.is_empty() {
                target = names_where(args, |a| a.column.unique);
            }
            if target.is_empty() {
                return Ok(None);
            }
            let action = update_action(&inserted, &target);
            return Ok(Some(OnConflict { target, action }));
        }

        Ok(None)
    }
}

/// Builds a plain INSERT, optionally returning the primary key.
pub fn build_insert_query<R: Record>(
    table: &Table,
    record: &R,
    returning: bool,
) -> Result<Statement, QueryBuildError> {
    let query = InsertQuery::new(table);
    if returning {
        query.returning().build(record)
    } else {
        query.build(record)
    }
}

fn names_where(args: &[Argument<'_>], predicate: impl Fn(&Argument<'_>) -> bool) -> Vec<String> {
    args.iter()
        .filter(|a| predicate(a))
        .map(|a| a.column.name.clone())
        .collect()
}

/// `DO UPDATE SET c = EXCLUDED.c, ..` over the inserted non-target columns.
fn update_action(inserted: &[&str], target: &[String]) -> String {
    let sets: Vec<String> = inserted
        .iter()
        .filter(|name| !target.iter().any(|t| t == *name))
        .map(|name| {
            let quoted = quote_identifier(name);
            format!("{quoted} = EXCLUDED.{quoted}")
        })
        .collect();

    if sets.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", sets.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::PasswordHandler;
    use crate::testing::{account, accounts};
    use crate::value::SqlValue;

    #[test]
    fn test_plain_insert_skips_zero_values() {
        let table = accounts();
        let mut record = account();
        record.age = 0;

        let (sql, args) = build_insert_query(&table, &record, true).unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO "public"."accounts" ("id", "tenant", "email", "name", "password") VALUES ($1, $2, $3, $4, crypt($5, gen_salt('bf'))) RETURNING "id";"#
        );
        assert_eq!(args.len(), 5);
        assert_eq!(args[3], SqlValue::Text("Ada".into()));
    }

    #[test]
    fn test_full_insert_keeps_zero_values() {
        let table = accounts();
        let mut record = account();
        record.id = uuid::Uuid::nil();
        record.age = 0;

        let (sql, args) = InsertQuery::new(&table).full().build(&record).unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO "public"."accounts" ("tenant", "email", "name", "password", "age") VALUES ($1, $2, $3, crypt($4, gen_salt('bf')), $5);"#
        );
        assert_eq!(args[4], SqlValue::Int(0));
    }

    #[test]
    fn test_forced_unique_index_target() {
        let table = accounts();
        let (sql, _) = InsertQuery::new(&table)
            .on_conflict("accounts_tenant_email")
            .returning()
            .build(&account())
            .unwrap();
        assert!(sql.contains(r#"ON CONFLICT ("tenant", "email") DO UPDATE SET "id" = EXCLUDED."id", "name" = EXCLUDED."name""#), "{sql}");
        assert!(sql.ends_with(r#"RETURNING "id";"#), "{sql}");
    }

    #[test]
    fn test_forced_target_by_column() {
        let table = accounts();
        let (sql, _) = InsertQuery::new(&table)
            .on_conflict("email")
            .build(&account())
            .unwrap();
        assert!(sql.contains(r#"ON CONFLICT ("email") DO UPDATE SET "id" = EXCLUDED."id", "tenant" = EXCLUDED."tenant""#), "{sql}");
    }

    #[test]
    fn test_unresolved_conflict_target() {
        let table = accounts();
        let err = InsertQuery::new(&table)
            .on_conflict("nope")
            .build(&account())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "table 'accounts': can't find unique index with name: nope"
        );
    }

    #[test]
    fn test_declared_conflict_action_disables_returning() {
        let mut table = accounts();
        if let Some(column) = table.column_mut("email") {
            column.conflict = "DO NOTHING".into();
        }
        let (sql, _) = build_insert_query(&table, &account(), true).unwrap();
        assert!(sql.ends_with(r#"ON CONFLICT ("tenant", "email") DO NOTHING;"#), "{sql}");
    }

    #[test]
    fn test_upsert_without_unique_columns_is_plain_insert() {
        let mut table = accounts();
        for column in &mut table.columns {
            column.unique_index.clear();
        }
        let (sql, _) = InsertQuery::new(&table).upsert().build(&account()).unwrap();
        assert!(!sql.contains("ON CONFLICT"), "{sql}");
    }

    #[test]
    fn test_upsert_updates_non_target_columns() {
        let table = accounts();
        let (sql, _) = InsertQuery::new(&table)
            .upsert()
            .returning()
            .build(&account())
            .unwrap();
        assert!(sql.contains(r#"ON CONFLICT ("tenant", "email") DO UPDATE SET"#), "{sql}");
        assert!(sql.contains(r#""password" = EXCLUDED."password""#), "{sql}");
        assert!(sql.ends_with(r#"RETURNING "id";"#), "{sql}");
    }

    #[test]
    fn test_encrypt_hook_replaces_crypt() {
        let mut table = accounts();
        table.password_handler = Some(
            PasswordHandler::new().with_encrypt(|_, plain| Ok(format!("enc:{plain}"))),
        );
        let (sql, args) = build_insert_query(&table, &account(), false).unwrap();
        assert!(!sql.contains("crypt("), "{sql}");
        assert!(args.contains(&SqlValue::Text("enc:secret".into())));
    }

    #[test]
    fn test_empty_record_has_no_arguments() {
        let table = accounts();
        let err = build_insert_query(&table, &crate::testing::Account::default(), false).unwrap_err();
        assert!(matches!(err, QueryBuildError::NoArguments { .. }));
    }
}
