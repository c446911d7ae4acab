//! Decoding result rows into records.
//!
//! A [`ScanPlan`] is built once per result shape: every returned column is
//! matched case-insensitively against the table's columns and gets a
//! [`Decoder`]. Rows are then decoded by position.
//!
//! ```rust,ignore
//! let plan = ScanPlan::new(&table, &["id", "email", "password"])?;
//! let account: Account = plan.decode(row_values)?;
//! ```

use tracing::trace;

use crate::data_type::DataType;
use crate::error::ScanError;
use crate::record::Record;
use crate::table::{PasswordHandler, Table};
use crate::value::SqlValue;

/// How one result column is written into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoder {
    /// Convert the value and store it in the field at `path`.
    Field {
        /// Field path in the record descriptor.
        path: Vec<usize>,
    },
    /// Like [`Decoder::Field`], but a NULL leaves the field untouched.
    ///
    /// Used for nullable uuid and text columns bound to non-optional fields.
    Nullable {
        /// Field path in the record descriptor.
        path: Vec<usize>,
    },
    /// Run the table's decrypt hook and store a non-empty result.
    Password {
        /// Field path in the record descriptor.
        path: Vec<usize>,
    },
    /// Discard the value.
    Skip,
}

/// A result column and its decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Result column name.
    pub column: String,
    /// Decoding strategy.
    pub decoder: Decoder,
}

/// Per-shape decoding plan.
#[derive(Debug, Clone)]
pub struct ScanPlan<'t> {
    table: &'t Table,
    targets: Vec<ScanTarget>,
}

impl<'t> ScanPlan<'t> {
    /// Plans the decoding of rows with the given column names.
    ///
    /// Strict tables reject a returned column that matches no table column;
    /// other tables discard it.
    pub fn new<S: AsRef<str>>(table: &'t Table, field_names: &[S]) -> Result<Self, ScanError> {
        let can_decrypt = table
            .password_handler
            .as_ref()
            .is_some_and(PasswordHandler::can_decrypt);

        let targets = field_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let Some(column) = table.column(name) else {
                    if table.strict {
                        return Err(ScanError::UnmappedColumn {
                            column: name.to_string(),
                        });
                    }
                    return Ok(ScanTarget {
                        column: name.to_string(),
                        decoder: Decoder::Skip,
                    });
                };

                let path = column.field_path.clone();
                let decoder = if column.unscannable || path.is_empty() {
                    Decoder::Skip
                } else if column.password && can_decrypt {
                    Decoder::Password { path }
                } else if column.nullable
                    && !column.optional
                    && matches!(
                        column.data_type,
                        Some(DataType::Uuid | DataType::Text | DataType::CharacterVarying)
                    )
                {
                    Decoder::Nullable { path }
                } else {
                    Decoder::Field { path }
                };

                Ok(ScanTarget {
                    column: name.to_string(),
                    decoder,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        trace!(table = %table.name, columns = targets.len(), "built scan plan");
        Ok(Self { table, targets })
    }

    /// Planned targets, in result column order.
    #[must_use]
    pub fn targets(&self) -> &[ScanTarget] {
        &self.targets
    }

    /// Decodes one row, given its values in result column order.
    pub fn decode<R: Record>(&self, values: Vec<SqlValue>) -> Result<R, ScanError> {
        let mut record = R::default();
        self.decode_into(&mut record, values)?;
        Ok(record)
    }

    /// Decodes one row into an existing record.
    pub fn decode_into<R: Record>(
        &self,
        record: &mut R,
        values: Vec<SqlValue>,
    ) -> Result<(), ScanError> {
        if values.len() != self.targets.len() {
            return Err(ScanError::ColumnCount {
                expected: self.targets.len(),
                found: values.len(),
            });
        }

        for (target, value) in self.targets.iter().zip(values) {
            self.apply(record, target, value)
                .map_err(|source| ScanError::Column {
                    column: target.column.clone(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    fn apply<R: Record>(
        &self,
        record: &mut R,
        target: &ScanTarget,
        value: SqlValue,
    ) -> Result<(), ScanError> {
        match &target.decoder {
            Decoder::Skip => Ok(()),
            Decoder::Field { path } => record.set_field_value(path, value),
            Decoder::Nullable { path } => {
                if value.is_null() {
                    return Ok(());
                }
                record.set_field_value(path, value)
            }
            Decoder::Password { path } => {
                let encrypted = match value {
                    SqlValue::Null => return Ok(()),
                    SqlValue::Text(text) => text,
                    other => {
                        return Err(ScanError::Decode {
                            expected: crate::value::HostType::String,
                            found: other.kind(),
                        })
                    }
                };
                let Some(handler) = &self.table.password_handler else {
                    return record.set_field_value(path, SqlValue::Text(encrypted));
                };
                let plain = handler
                    .decrypt(&self.table.name, &encrypted)
                    .map_err(|source| ScanError::Credential {
                        table: self.table.name.clone(),
                        source,
                    })?;
                if plain.is_empty() {
                    return Ok(());
                }
                record.set_field_value(path, SqlValue::Text(plain))
            }
        }
    }
}

/// Decodes every row with one plan.
pub fn scan_rows<R, S, I>(table: &Table, field_names: &[S], rows: I) -> Result<Vec<R>, ScanError>
where
    R: Record,
    S: AsRef<str>,
    I: IntoIterator<Item = Vec<SqlValue>>,
{
    let plan = ScanPlan::new(table, field_names)?;
    rows.into_iter().map(|values| plan.decode(values)).collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::testing::{accounts, Account};

    #[test]
    fn test_plan_decoders() {
        let mut table = accounts();
        if let Some(column) = table.column_mut("name") {
            column.nullable = true;
        }
        if let Some(column) = table.column_mut("age") {
            column.unscannable = true;
        }

        let plan = ScanPlan::new(&table, &["ID", "name", "password", "age", "extra"]).unwrap();
        let decoders: Vec<&Decoder> = plan.targets().iter().map(|t| &t.decoder).collect();
        assert_eq!(
            decoders,
            vec![
                &Decoder::Field { path: vec![0] },
                &Decoder::Nullable { path: vec![4] },
                &Decoder::Field { path: vec![5] },
                &Decoder::Skip,
                &Decoder::Skip,
            ]
        );
    }

    #[test]
    fn test_strict_rejects_unknown_column() {
        let mut table = accounts();
        table.set_strict(true);
        let err = ScanPlan::new(&table, &["id", "extra"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "record doesn't have corresponding field for column: extra (strict check)"
        );
    }

    #[test]
    fn test_decode_row() {
        let table = accounts();
        let id = Uuid::new_v4();
        let account: Account = ScanPlan::new(&table, &["id", "email", "age"])
            .unwrap()
            .decode(vec![
                SqlValue::Uuid(id),
                SqlValue::Text("ada@example.com".into()),
                SqlValue::Int(36),
            ])
            .unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(account.age, 36);
    }

    #[test]
    fn test_null_into_required_field_fails_unless_nullable() {
        let mut table = accounts();
        let err = ScanPlan::new(&table, &["name"])
            .unwrap()
            .decode::<Account>(vec![SqlValue::Null])
            .unwrap_err();
        assert!(matches!(err, ScanError::Column { .. }), "{err}");

        if let Some(column) = table.column_mut("name") {
            column.nullable = true;
        }
        let account: Account = ScanPlan::new(&table, &["name"])
            .unwrap()
            .decode(vec![SqlValue::Null])
            .unwrap();
        assert!(account.name.is_empty());
    }

    #[test]
    fn test_password_decrypt_hook() {
        let mut table = accounts();
        table.password_handler = Some(
            PasswordHandler::new().with_decrypt(|_, encrypted| {
                Ok(encrypted.strip_prefix("enc:").unwrap_or_default().to_string())
            }),
        );
        let plan = ScanPlan::new(&table, &["password"]).unwrap();
        assert_eq!(plan.targets()[0].decoder, Decoder::Password { path: vec![5] });

        let account: Account = plan.decode(vec![SqlValue::Text("enc:secret".into())]).unwrap();
        assert_eq!(account.password, "secret");

        let account: Account = plan.decode(vec![SqlValue::Text("opaque".into())]).unwrap();
        assert!(account.password.is_empty());
    }

    #[test]
    fn test_column_count_mismatch() {
        let table = accounts();
        let plan = ScanPlan::new(&table, &["id", "name"]).unwrap();
        let err = plan.decode::<Account>(vec![SqlValue::Null]).unwrap_err();
        assert!(matches!(err, ScanError::ColumnCount { expected: 2, found: 1 }));
    }

    #[test]
    fn test_scan_rows() {
        let rows = vec![
            vec![SqlValue::Text("a".into())],
            vec![SqlValue::Text("b".into())],
        ];
        let decoded: Vec<Account> = scan_rows(&accounts(), &["tenant"], rows).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].tenant, "b");
    }
}
