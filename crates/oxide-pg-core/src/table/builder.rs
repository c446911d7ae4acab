//! Builds a [`Table`] from a record descriptor.

use tracing::debug;

use super::annotation::{self, TagOption, SKIP};
use super::{Column, Table};
use crate::data_type::DataType;
use crate::error::AnnotationError;
use crate::record::{FieldDescriptor, FieldKind, Record, RecordDescriptor};
use crate::settings::Settings;
use crate::value::HostType;

const CHARACTER_VARYING_CAST: &str = "::character varying";
const GEN_RANDOM_UUID: &str = "gen_random_uuid()";

impl Table {
    /// Builds the table model of a record type.
    pub fn from_record<R: Record>(name: &str, settings: &Settings) -> Result<Self, AnnotationError> {
        Self::from_descriptor(name, &R::descriptor(), settings)
    }

    /// Builds a table model from a descriptor.
    ///
    /// Embedded records are flattened unless their annotation marks them as a
    /// single JSON column. Presenter composites, fields without an annotation
    /// and fields annotated with `-` are left out.
    pub fn from_descriptor(
        name: &str,
        descriptor: &RecordDescriptor,
        settings: &Settings,
    ) -> Result<Self, AnnotationError> {
        let mut columns = Vec::new();
        collect_columns(name, descriptor, &[], settings, &mut columns)?;

        if columns.is_empty() {
            return Err(AnnotationError::NoColumns {
                table: name.to_string(),
            });
        }

        let mut conflicts = columns.iter().filter(|c| !c.conflict.is_empty());
        if let (Some(first), Some(second)) = (conflicts.next(), conflicts.next()) {
            return Err(AnnotationError::DuplicateConflict {
                table: name.to_string(),
                first: first.name.clone(),
                second: second.name.clone(),
            });
        }

        let mut table = Self::new(settings.search_path.clone(), name);
        table.record_type = Some(descriptor.type_name);
        table.crypt_algorithm.clone_from(&settings.crypt_algorithm);
        table.add_columns(columns);

        debug!(
            table = %table.name,
            record = descriptor.type_name,
            columns = table.columns.len(),
            "built table model"
        );
        Ok(table)
    }
}

fn collect_columns(
    table: &str,
    descriptor: &RecordDescriptor,
    prefix: &[usize],
    settings: &Settings,
    out: &mut Vec<Column>,
) -> Result<(), AnnotationError> {
    for (i, field) in descriptor.fields.iter().enumerate() {
        let annotation = field.annotation.trim();
        if annotation == SKIP {
            continue;
        }

        let mut path = prefix.to_vec();
        path.push(i);

        if let FieldKind::Composite(nested) = field.kind {
            if has_option(annotation, "presenter", |v| v != "false") {
                continue;
            }
            if !has_option(annotation, "type", |v| v.starts_with("json")) {
                let before = out.len();
                collect_columns(table, &nested(), &path, settings, out)?;
                if out.len() > before {
                    continue;
                }
            }
        }

        if annotation.is_empty() {
            continue;
        }

        out.push(build_column(table, field, path, annotation, settings)?);
    }
    Ok(())
}

/// True if the annotation sets `key` to a value accepted by `accept`.
///
/// Values are lowercased; a bare key reads as `true`.
fn has_option(annotation: &str, key: &str, accept: impl Fn(&str) -> bool) -> bool {
    annotation::split_options(annotation).into_iter().any(|option| {
        let (k, value) = option.split_once('=').unwrap_or((option, "true"));
        k.trim().eq_ignore_ascii_case(key) && accept(&value.trim().to_ascii_lowercase())
    })
}

fn build_column(
    table: &str,
    field: &FieldDescriptor,
    path: Vec<usize>,
    annotation: &str,
    settings: &Settings,
) -> Result<Column, AnnotationError> {
    let host = field.host();
    let mut column = Column {
        table_name: table.to_string(),
        name: settings.column_naming.apply(field.name),
        field_name: field.name.to_string(),
        field_path: path,
        host: Some(host),
        optional: field.is_optional(),
        data_type: host.default_data_type(),
        scanner: host == HostType::Custom,
        ..Column::default()
    };

    let options = annotation::parse_options(field.name, table, annotation)?;
    let bare_unique_index = options
        .iter()
        .any(|o| matches!(o, TagOption::UniqueIndex(name) if name.is_empty()));
    column.apply_options(options);

    if bare_unique_index {
        column.unique_index = format!("{table}_{}_uindex", column.name);
    }

    if column.unique && !column.unique_index.is_empty() {
        return Err(AnnotationError::UniqueConflict {
            field: field.name.to_string(),
        });
    }

    if column.primary_key
        && !column.nullable
        && column.data_type == Some(DataType::Uuid)
        && column.default.is_empty()
        && column.reference.is_none()
    {
        column.default = GEN_RANDOM_UUID.to_string();
    }

    if column.password && column.data_type.is_none() {
        column.data_type = Some(DataType::Text);
    }

    if column.data_type.is_none() {
        return Err(AnnotationError::InvalidDataType {
            field: field.name.to_string(),
            value: annotation.to_string(),
        });
    }

    if column.data_type == Some(DataType::CharacterVarying)
        && !column.default.is_empty()
        && !column.has_null_default()
        && !column
            .default
            .to_ascii_lowercase()
            .ends_with(CHARACTER_VARYING_CAST)
    {
        column.default.push_str(CHARACTER_VARYING_CAST);
    }

    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldDescriptor;

    fn settings() -> Settings {
        Settings::default()
    }

    fn address() -> RecordDescriptor {
        RecordDescriptor::new(
            "Address",
            vec![
                FieldDescriptor::value("street", "type=text", HostType::String, false),
                FieldDescriptor::value("city", "", HostType::String, false),
            ],
        )
    }

    fn untagged() -> RecordDescriptor {
        RecordDescriptor::new(
            "Untagged",
            vec![FieldDescriptor::value("x", "", HostType::String, false)],
        )
    }

    #[test]
    fn test_flattens_embedded_records() {
        let descriptor = RecordDescriptor::new(
            "Customer",
            vec![
                FieldDescriptor::value("id", "primary", HostType::Uuid, false),
                FieldDescriptor::composite("address", "", address),
                FieldDescriptor::composite("billing", "type=jsonb", address),
                FieldDescriptor::composite("meta", "name=meta,type=json", untagged),
                FieldDescriptor::composite("skipped", "-", address),
            ],
        );
        let table = Table::from_descriptor("customers", &descriptor, &settings()).unwrap();
        assert_eq!(table.column_names(), vec!["id", "street", "billing", "meta"]);
        assert_eq!(table.columns[1].field_path, vec![1, 0]);
        assert_eq!(table.columns[2].field_path, vec![2]);
        assert_eq!(table.columns[2].data_type, Some(DataType::Jsonb));
    }

    #[test]
    fn test_skip_and_untagged_fields_excluded() {
        let descriptor = RecordDescriptor::new(
            "Only",
            vec![
                FieldDescriptor::value("a", "-", HostType::String, false),
                FieldDescriptor::value("b", "", HostType::String, false),
            ],
        );
        let err = Table::from_descriptor("only", &descriptor, &settings()).unwrap_err();
        assert!(matches!(err, AnnotationError::NoColumns { .. }));
    }

    #[test]
    fn test_uuid_primary_key_gets_default() {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![FieldDescriptor::value("id", "primary", HostType::Uuid, false)],
        );
        let table = Table::from_descriptor("t", &descriptor, &settings()).unwrap();
        assert_eq!(table.columns[0].default, "gen_random_uuid()");
    }

    #[test]
    fn test_referencing_uuid_primary_key_has_no_default() {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![FieldDescriptor::value("id", "primary,ref=users(id)", HostType::Uuid, false)],
        );
        let table = Table::from_descriptor("t", &descriptor, &settings()).unwrap();
        assert!(table.columns[0].default.is_empty());
    }

    #[test]
    fn test_unique_and_unique_index_rejected() {
        for annotation in ["unique,unique_index=uq", "unique_index=uq,unique"] {
            let descriptor = RecordDescriptor::new(
                "T",
                vec![FieldDescriptor::value("a", annotation, HostType::String, false)],
            );
            let err = Table::from_descriptor("t", &descriptor, &settings()).unwrap_err();
            assert!(matches!(err, AnnotationError::UniqueConflict { .. }), "{annotation}");
        }
    }

    #[test]
    fn test_bare_unique_index_gets_a_name() {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![FieldDescriptor::value("email", "unique_index", HostType::String, false)],
        );
        let table = Table::from_descriptor("users", &descriptor, &settings()).unwrap();
        assert_eq!(table.columns[0].unique_index, "users_email_uindex");
    }

    #[test]
    fn test_password_defaults_to_text_and_custom_needs_type() {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![FieldDescriptor::value("secret", "password", HostType::Custom, false)],
        );
        let table = Table::from_descriptor("t", &descriptor, &settings()).unwrap();
        assert_eq!(table.columns[0].data_type, Some(DataType::Text));
        assert!(table.columns[0].scanner);

        let descriptor = RecordDescriptor::new(
            "T",
            vec![FieldDescriptor::value("point", "name=pt", HostType::Custom, false)],
        );
        let err = Table::from_descriptor("t", &descriptor, &settings()).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidDataType { .. }));
    }

    #[test]
    fn test_duplicate_conflict_rejected() {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![
                FieldDescriptor::value("a", "unique,conflict=DO NOTHING", HostType::String, false),
                FieldDescriptor::value("b", "unique,conflict=DO NOTHING", HostType::String, false),
            ],
        );
        let err = Table::from_descriptor("t", &descriptor, &settings()).unwrap_err();
        assert!(matches!(err, AnnotationError::DuplicateConflict { .. }));
    }

    #[test]
    fn test_varchar_default_cast_not_duplicated() {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![
                FieldDescriptor::value("a", "type=varchar(255),default=''", HostType::String, false),
                FieldDescriptor::value(
                    "b",
                    "type=varchar,default='x'::CHARACTER VARYING",
                    HostType::String,
                    false,
                ),
            ],
        );
        let table = Table::from_descriptor("t", &descriptor, &settings()).unwrap();
        assert_eq!(table.columns[0].default, "''::character varying");
        assert_eq!(table.columns[0].type_argument, "255");
        assert_eq!(table.columns[1].default, "'x'::CHARACTER VARYING");
    }

    #[test]
    fn test_column_naming_and_search_path() {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![FieldDescriptor::value("CreatedAt", "default=now()", HostType::Timestamp, false)],
        );
        let settings = Settings::default().with_search_path("app");
        let table = Table::from_descriptor("t", &descriptor, &settings).unwrap();
        assert_eq!(table.search_path, "app");
        assert_eq!(table.columns[0].name, "created_at");
        assert_eq!(table.columns[0].data_type, Some(DataType::Timestamp));
        assert_eq!(table.record_type, Some("T"));
    }

    #[test]
    fn test_presenter_composite_is_skipped() {
        let descriptor = RecordDescriptor::new(
            "Customer",
            vec![
                FieldDescriptor::value("id", "primary", HostType::Uuid, false),
                FieldDescriptor::composite("summary", "presenter", address),
                FieldDescriptor::composite("shipping", "presenter=false", address),
            ],
        );
        let table = Table::from_descriptor("customers", &descriptor, &settings()).unwrap();
        assert_eq!(table.column_names(), vec!["id", "street"]);
        assert_eq!(table.column("street").unwrap().field_path, vec![2, 0]);
    }

    fn single_column(annotation: &'static str) -> Column {
        let descriptor = RecordDescriptor::new(
            "T",
            vec![FieldDescriptor::value("f", annotation, HostType::String, false)],
        );
        let mut table = Table::from_descriptor("posts", &descriptor, &settings()).unwrap();
        table.columns.remove(0)
    }

    #[test]
    fn test_strict_annotation_reparses_to_same_column() {
        let annotations = [
            "name=tags,type=varchar(64)[],nullable",
            "name=blog_id,type=uuid,ref=blogs(id set null deferrable),index=hash",
            "name=title,type=varchar(32),default='a,b',unique_index=posts_title",
            "name=search,type=tsvector,nullable",
            "name=email,type=citext,conflict=DO NOTHING,username,unique",
            "name=id,type=bigint,primary,identity",
            "name=secret,password",
            "name=score,type=numeric(10,2),default=0,check=score >= 0",
        ];

        for annotation in annotations {
            let column = single_column(annotation);
            let rendered: &'static str = Box::leak(column.annotation(true).into_boxed_str());
            let reparsed = single_column(rendered);
            assert_eq!(reparsed, column, "{annotation} -> {rendered}");
            assert_eq!(reparsed.annotation(true), rendered);
        }
    }
}
