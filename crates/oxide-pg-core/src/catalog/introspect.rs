//! Assembles table models from catalog rows.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::constraint::Constraint;
use super::{CatalogSource, ColumnRow, Trigger, UniqueIndexRow};
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::table::{Column, Table, TableKind, UniqueIndex};

/// Reads table models out of a live database.
///
/// ```rust,ignore
/// let introspector = Introspector::new(&catalog, &settings);
/// let tables = introspector.list_tables(&["customers".to_string()]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Introspector<'a, S> {
    source: &'a S,
    search_path: String,
}

impl<'a, S: CatalogSource + Sync> Introspector<'a, S> {
    /// Creates an introspector over `source` for the settings' search path.
    #[must_use]
    pub fn new(source: &'a S, settings: &Settings) -> Self {
        Self {
            source,
            search_path: settings.search_path.clone(),
        }
    }

    /// Schema being introspected.
    #[must_use]
    pub fn search_path(&self) -> &str {
        &self.search_path
    }

    /// Lists the tables named in `tables`, or every table of the schema when
    /// `tables` is empty.
    ///
    /// Base tables come first, those without an underscore in their name
    /// before the others; views and materialized views come last.
    pub async fn list_tables(&self, tables: &[String]) -> Result<Vec<Table>> {
        let columns = self.list_columns(tables).await?;
        let tables = assemble_tables(&self.search_path, columns);
        debug!(
            search_path = %self.search_path,
            tables = tables.len(),
            "introspected tables"
        );
        Ok(tables)
    }

    /// Lists the columns of the given tables with their constraints and
    /// unique indexes merged in.
    pub async fn list_columns(&self, tables: &[String]) -> Result<Vec<Column>> {
        let rows = self
            .source
            .column_rows(&self.search_path, tables)
            .await
            .map_err(catalog_error)?;
        let constraints = self.list_constraints(tables).await?;
        let unique_indexes = self
            .source
            .unique_index_rows(&self.search_path, tables)
            .await
            .map_err(catalog_error)?;

        Ok(assemble_columns(rows, &constraints, &unique_indexes))
    }

    /// Lists and decodes the constraints of the given tables.
    pub async fn list_constraints(&self, tables: &[String]) -> Result<Vec<Constraint>> {
        let rows = self
            .source
            .constraint_rows(&self.search_path, tables)
            .await
            .map_err(catalog_error)?;
        Ok(rows.iter().filter_map(Constraint::from_row).collect())
    }

    /// Lists the unique indexes that no constraint already describes.
    pub async fn list_unique_indexes(&self, tables: &[String]) -> Result<Vec<UniqueIndex>> {
        let rows = self
            .source
            .unique_index_rows(&self.search_path, tables)
            .await
            .map_err(catalog_error)?;
        Ok(rows
            .into_iter()
            .map(|row| UniqueIndex {
                table_name: row.table_name,
                name: row.index_name,
                columns: row.columns,
            })
            .collect())
    }

    /// Lists the triggers of the given tables.
    pub async fn list_triggers(&self, tables: &[String]) -> Result<Vec<Trigger>> {
        self.source
            .trigger_rows(&self.search_path, tables)
            .await
            .map_err(catalog_error)
    }
}

fn catalog_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::Catalog(Box::new(err))
}

/// Merges column rows with their decoded constraints and unique indexes.
///
/// Columns backed by a primary key, a unique constraint or a unique index lose
/// their index type: PostgreSQL creates those indexes itself.
#[must_use]
pub fn assemble_columns(
    rows: Vec<ColumnRow>,
    constraints: &[Constraint],
    unique_indexes: &[UniqueIndexRow],
) -> Vec<Column> {
    rows.into_iter()
        .map(|row| {
            let mut column = column_from_row(row);

            let (table, name) = (column.table_name.clone(), column.name.clone());
            for constraint in constraints
                .iter()
                .filter(|c| c.table_name == table && c.column_name == name)
            {
                constraint.apply_to(&mut column);
            }

            if let Some(index) = unique_indexes.iter().find(|index| {
                index.table_name == column.table_name
                    && index.columns.iter().any(|name| *name == column.name)
            }) {
                column.unique = false;
                column.unique_index.clone_from(&index.index_name);
            }

            if column.primary_key || column.unique || !column.unique_index.is_empty() {
                column.index = None;
            }

            trace!(
                table = %column.table_name,
                column = %column.name,
                tag = %column.annotation(false),
                "merged column"
            );
            column
        })
        .collect()
}

fn column_from_row(row: ColumnRow) -> Column {
    let (data_type, type_argument) = match DataType::parse(&row.data_type) {
        Some((data_type, argument)) => (Some(data_type), argument.unwrap_or_default()),
        None => {
            debug!(
                table = %row.table_name,
                column = %row.column_name,
                data_type = %row.data_type,
                "unknown column data type"
            );
            (None, String::new())
        }
    };

    Column {
        table_name: row.table_name,
        table_description: with_period(row.table_description),
        table_kind: TableKind::parse(&row.table_type).unwrap_or_default(),
        name: row.column_name,
        ordinal_position: row.ordinal_position,
        description: with_period(row.column_description),
        data_type,
        type_argument,
        identity: row.is_identity,
        default: row.column_default.unwrap_or_default(),
        nullable: row.is_nullable,
        auto_generated: row.is_identity || row.is_generated,
        unscannable: data_type == Some(DataType::TsVector),
        ..Column::default()
    }
}

/// Comments are stored as sentences.
fn with_period(text: Option<String>) -> String {
    let mut text = text.unwrap_or_default();
    if !text.is_empty() && !text.ends_with('.') {
        text.push('.');
    }
    text
}

/// Groups columns by table, keeping first-seen order, then orders the tables.
#[must_use]
pub fn assemble_tables(search_path: &str, columns: Vec<Column>) -> Vec<Table> {
    let mut tables: Vec<Table> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for column in columns {
        let at = *positions.entry(column.table_name.clone()).or_insert_with(|| {
            let mut table = Table::new(search_path, column.table_name.clone());
            table.description.clone_from(&column.table_description);
            table.kind = column.table_kind;
            tables.push(table);
            tables.len() - 1
        });
        tables[at].add_columns([column]);
    }

    tables.sort_by_key(|t| (t.is_read_only(), t.name.contains('_')));
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ConstraintRow;
    use crate::index_type::IndexType;

    fn column_row(table: &str, name: &str, position: i32, data_type: &str) -> ColumnRow {
        ColumnRow {
            table_name: table.into(),
            table_type: "BASE TABLE".into(),
            column_name: name.into(),
            ordinal_position: position,
            data_type: data_type.into(),
            ..ColumnRow::default()
        }
    }

    fn constraint(table: &str, column: &str, name: &str, kind: &str, def: &str, index: &str) -> Constraint {
        Constraint::from_row(&ConstraintRow {
            table_name: table.into(),
            column_name: column.into(),
            constraint_name: name.into(),
            constraint_type: kind.into(),
            constraint_definition: def.into(),
            index_type: index.into(),
        })
        .unwrap()
    }

    #[test]
    fn test_assemble_columns_merges_constraints() {
        let mut id = column_row("blog_posts", "id", 1, "uuid");
        id.column_default = Some("gen_random_uuid()".into());
        let rows = vec![
            id,
            column_row("blog_posts", "blog_id", 2, "uuid"),
            column_row("blog_posts", "title", 3, "character varying(255)"),
            column_row("blog_posts", "source_url", 4, "character varying(255)"),
        ];
        let constraints = vec![
            constraint("blog_posts", "id", "blog_posts_pkey", "p", "PRIMARY KEY (id)", "btree"),
            constraint(
                "blog_posts",
                "",
                "blog_posts_blog_id_fkey",
                "i",
                "CREATE INDEX blog_posts_blog_id_fkey ON public.blog_posts USING btree (blog_id)",
                "",
            ),
            constraint(
                "blog_posts",
                "blog_id",
                "blog_posts_blog_id_fkey",
                "f",
                "FOREIGN KEY (blog_id) REFERENCES blogs(id) ON DELETE CASCADE DEFERRABLE",
                "",
            ),
            constraint("blog_posts", "title", "uk_blog_post", "u", "UNIQUE (title, source_url)", "btree"),
            constraint("blog_posts", "source_url", "uk_blog_post", "u", "UNIQUE (title, source_url)", "btree"),
        ];

        let columns = assemble_columns(rows, &constraints, &[]);
        assert_eq!(
            columns[0].annotation(false),
            "name=id,type=uuid,primary,default=gen_random_uuid()"
        );
        assert_eq!(
            columns[1].annotation(false),
            "name=blog_id,type=uuid,ref=blogs(id CASCADE deferrable),index=btree"
        );
        assert_eq!(columns[2].unique_index, "uk_blog_post");
        assert_eq!(columns[2].type_argument, "255");
        assert_eq!(columns[2].index, None);
    }

    #[test]
    fn test_unique_index_rows_override_unique() {
        let rows = vec![
            column_row("customer_devices", "customer_id", 1, "uuid"),
            column_row("customer_devices", "type", 2, "integer"),
        ];
        let constraints = vec![constraint(
            "customer_devices",
            "type",
            "customer_devices_type_key",
            "u",
            "UNIQUE (type)",
            "btree",
        )];
        let unique_indexes = vec![UniqueIndexRow {
            table_name: "customer_devices".into(),
            index_name: "customer_devices_unique".into(),
            columns: vec!["customer_id".into(), "type".into()],
        }];

        let columns = assemble_columns(rows, &constraints, &unique_indexes);
        assert_eq!(columns[0].unique_index, "customer_devices_unique");
        assert!(!columns[1].unique);
        assert_eq!(columns[1].unique_index, "customer_devices_unique");
        assert_eq!(columns[1].index, None);
    }

    #[test]
    fn test_plain_index_is_kept() {
        let rows = vec![column_row("customers", "name", 1, "text")];
        let constraints = vec![constraint(
            "customers",
            "",
            "customers_name_idx",
            "i",
            "CREATE INDEX customers_name_idx ON public.customers USING gin (name)",
            "",
        )];
        let columns = assemble_columns(rows, &constraints, &[]);
        assert_eq!(columns[0].index, Some(IndexType::Gin));
    }

    #[test]
    fn test_descriptions_get_a_period() {
        let mut row = column_row("blogs", "name", 1, "text");
        row.table_description = Some("Blogs".into());
        row.column_description = Some("The name.".into());
        let columns = assemble_columns(vec![row], &[], &[]);
        assert_eq!(columns[0].table_description, "Blogs.");
        assert_eq!(columns[0].description, "The name.");
    }

    #[test]
    fn test_identity_and_tsvector_rows() {
        let mut id = column_row("events", "id", 1, "bigint");
        id.is_identity = true;
        let search = column_row("events", "search", 2, "tsvector");
        let columns = assemble_columns(vec![id, search], &[], &[]);
        assert!(columns[0].identity);
        assert!(columns[0].auto_generated);
        assert!(columns[1].unscannable);
    }

    #[test]
    fn test_assemble_tables_order() {
        let mut view = column_row("customer_view", "id", 1, "uuid");
        view.table_type = "VIEW".into();
        let columns = assemble_columns(
            vec![
                view,
                column_row("blog_posts", "id", 1, "uuid"),
                column_row("blogs", "id", 1, "uuid"),
                column_row("blogs", "name", 2, "text"),
                column_row("customers", "id", 1, "uuid"),
            ],
            &[],
            &[],
        );

        let tables = assemble_tables("public", columns);
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["blogs", "customers", "blog_posts", "customer_view"]);
        assert_eq!(tables[0].column_names(), vec!["id", "name"]);
        assert_eq!(tables[3].kind, TableKind::View);
        assert_eq!(tables[0].search_path, "public");
    }
}
