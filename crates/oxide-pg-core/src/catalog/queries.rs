//! Catalog queries run by a [`super::CatalogSource`].
//!
//! Every query takes the schema as `$1` and a `varchar[]` of table names as
//! `$2`; an empty array selects every table of the schema.

/// Basic column information, one row per column, ordered by table and position.
///
/// Columns: `table_name, table_description, table_type, column_name,
/// ordinal_position, column_description, column_default, data_type,
/// is_nullable, is_identity, is_generated`.
pub const LIST_COLUMNS: &str = r"SELECT
    c.table_name::text AS table_name,
    obj_description(p.attrelid::regclass) AS table_description,
    t.table_type::text AS table_type,
    c.column_name::text AS column_name,
    c.ordinal_position::int4 AS ordinal_position,
    col_description(p.attrelid::regclass, p.attnum) AS column_description,
    c.column_default::text AS column_default,
    pg_catalog.format_type(p.atttypid, p.atttypmod) AS data_type,
    (c.is_nullable = 'YES') AS is_nullable,
    (c.is_identity = 'YES') AS is_identity,
    (c.is_generated = 'ALWAYS') AS is_generated
FROM information_schema.columns c
JOIN information_schema.tables t
    ON t.table_catalog = c.table_catalog
    AND t.table_schema = c.table_schema
    AND t.table_name = c.table_name
JOIN pg_catalog.pg_attribute p
    ON p.attrelid = (quote_ident(c.table_schema) || '.' || quote_ident(c.table_name))::regclass
    AND p.attname = c.column_name
WHERE c.table_catalog = current_database()
    AND c.table_schema = $1
    AND (CARDINALITY($2::varchar[]) = 0 OR c.table_name = ANY($2::varchar[]))
ORDER BY c.table_name, c.ordinal_position";

/// Constraints per column, unioned with the plain (non-unique) indexes.
///
/// Index rows carry an empty `column_name` and `index_type`; both are decoded
/// from the definition. Columns: `table_name, column_name, constraint_name,
/// constraint_type, constraint_definition, index_type`.
pub const LIST_CONSTRAINTS: &str = r"SELECT
    cl.relname::text AS table_name,
    a.attname::text AS column_name,
    con.conname::text AS constraint_name,
    con.contype::text AS constraint_type,
    pg_get_constraintdef(con.oid) AS constraint_definition,
    COALESCE(am.amname::text, '') AS index_type
FROM pg_catalog.pg_class cl
JOIN pg_catalog.pg_namespace n ON n.oid = cl.relnamespace
JOIN pg_catalog.pg_attribute a ON a.attrelid = cl.oid
JOIN pg_catalog.pg_constraint con ON con.conrelid = cl.oid AND a.attnum = ANY (con.conkey)
LEFT JOIN pg_catalog.pg_index idx ON idx.indrelid = cl.oid AND idx.indexrelid = con.conindid
LEFT JOIN pg_catalog.pg_class i ON i.oid = idx.indexrelid
LEFT JOIN pg_catalog.pg_am am ON am.oid = i.relam
WHERE n.nspname = $1
    AND (CARDINALITY($2::varchar[]) = 0 OR cl.relname = ANY($2::varchar[]))
UNION ALL
SELECT
    tablename::text AS table_name,
    '' AS column_name,
    indexname::text AS constraint_name,
    'i' AS constraint_type,
    indexdef AS constraint_definition,
    '' AS index_type
FROM pg_indexes
WHERE schemaname = $1
    AND (CARDINALITY($2::varchar[]) = 0 OR tablename = ANY($2::varchar[]))
    AND indexdef NOT LIKE '%UNIQUE%'
ORDER BY table_name, column_name";

/// Unique indexes that are neither a primary key nor backing a constraint.
///
/// Columns: `table_name, index_name, index_columns`.
pub const LIST_UNIQUE_INDEXES: &str = r"SELECT
    t.relname::text AS table_name,
    i.relname::text AS index_name,
    array_agg(a.attname::text ORDER BY a.attnum) AS index_columns
FROM pg_index p
JOIN pg_class t ON t.oid = p.indrelid
JOIN pg_class i ON i.oid = p.indexrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(p.indkey)
WHERE n.nspname = $1
    AND (CARDINALITY($2::varchar[]) = 0 OR t.relname = ANY($2::varchar[]))
    AND p.indisunique
    AND NOT p.indisprimary
    AND NOT EXISTS (SELECT 1 FROM pg_constraint c WHERE c.conindid = p.indexrelid)
GROUP BY n.nspname, t.relname, i.relname
ORDER BY t.relname, i.relname";

/// Triggers of the given tables.
///
/// Columns: `catalog, search_path, name, manipulation, table_name,
/// action_statement, action_orientation, action_timing`.
pub const LIST_TRIGGERS: &str = r"SELECT
    event_object_catalog::text AS catalog,
    event_object_schema::text AS search_path,
    trigger_name::text AS name,
    event_manipulation::text AS manipulation,
    event_object_table::text AS table_name,
    action_statement::text AS action_statement,
    action_orientation::text AS action_orientation,
    action_timing::text AS action_timing
FROM information_schema.triggers
WHERE event_object_catalog = current_database()
    AND event_object_schema = $1
    AND (CARDINALITY($2::varchar[]) = 0 OR event_object_table = ANY($2::varchar[]))
ORDER BY event_object_table, trigger_name";
