//! One-time installation of table change notification triggers.
//!
//! The notification function is created once per [`ChangeNotifier`] and every
//! table gets its trigger at most once, however many tasks ask for it
//! concurrently. Listening on the channel is left to the caller.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{PgError, Result};

/// Default notification channel.
pub const DEFAULT_CHANNEL: &str = "table_change_notifications";

/// Default name of the trigger function.
pub const DEFAULT_FUNCTION: &str = "table_change_notify";

/// A row change that fires a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableChange {
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
}

impl TableChange {
    /// Every change kind.
    pub const ALL: [Self; 3] = [Self::Insert, Self::Update, Self::Delete];

    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for TableChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Installs the notification function and per-table triggers at most once.
#[derive(Debug)]
pub struct ChangeNotifier {
    channel: String,
    function: String,
    function_installed: AtomicBool,
    triggers: Mutex<HashSet<String>>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL, DEFAULT_FUNCTION)
    }
}

impl ChangeNotifier {
    /// Creates a notifier for `channel` using the trigger function `function`.
    #[must_use]
    pub fn new(channel: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            function: function.into(),
            function_installed: AtomicBool::new(false),
            triggers: Mutex::new(HashSet::new()),
        }
    }

    /// Notification channel.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// `CREATE OR REPLACE FUNCTION` statement of the trigger function.
    ///
    /// The payload is `{"table", "change", "old", "new"}` as JSON text.
    #[must_use]
    pub fn function_sql(&self) -> String {
        format!(
            "CREATE OR REPLACE FUNCTION {function}() RETURNS trigger AS $$ \
             DECLARE payload text; channel text := '{channel}'; \
             BEGIN \
             SELECT json_build_object('table', TG_TABLE_NAME, 'change', TG_OP, 'old', OLD, 'new', NEW)::text INTO payload; \
             PERFORM pg_notify(channel, payload); \
             IF (TG_OP = 'DELETE') THEN RETURN OLD; ELSE RETURN NEW; END IF; \
             END; $$ LANGUAGE plpgsql;",
            function = self.function,
            channel = self.channel.replace('\'', "''"),
        )
    }

    /// `CREATE OR REPLACE TRIGGER` statement for one table.
    #[must_use]
    pub fn trigger_sql(&self, table: &str, changes: &[TableChange]) -> String {
        let events: Vec<&str> = changes.iter().map(|c| c.as_sql()).collect();
        format!(
            "CREATE OR REPLACE TRIGGER {table}_{function} AFTER {events} ON {table} FOR EACH ROW EXECUTE FUNCTION {function}();",
            function = self.function,
            events = events.join(" OR "),
        )
    }

    /// Installs the function and the trigger of `table` on `pool`.
    pub async fn prepare(&self, pool: &PgPool, table: &str, changes: &[TableChange]) -> Result<()> {
        self.prepare_with(table, changes, |sql| async move {
            sqlx::query(&sql).execute(pool).await?;
            Ok::<(), PgError>(())
        })
        .await
    }

    /// Installs the function and the trigger of `table` through `execute`.
    ///
    /// Does nothing when `changes` is empty.
    pub async fn prepare_with<F, Fut>(
        &self,
        table: &str,
        changes: &[TableChange],
        mut execute: F,
    ) -> Result<()>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if changes.is_empty() {
            return Ok(());
        }

        let mut triggers = self.triggers.lock().await;

        if !self.function_installed.load(Ordering::Acquire) {
            execute(self.function_sql()).await?;
            self.function_installed.store(true, Ordering::Release);
            info!(function = %self.function, channel = %self.channel, "installed change function");
        }

        if triggers.contains(table) {
            return Ok(());
        }
        execute(self.trigger_sql(table, changes)).await?;
        triggers.insert(table.to_string());
        info!(table, function = %self.function, "installed change trigger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_trigger_sql() {
        let notifier = ChangeNotifier::default();
        assert_eq!(
            notifier.trigger_sql("customers", &[TableChange::Insert, TableChange::Delete]),
            "CREATE OR REPLACE TRIGGER customers_table_change_notify AFTER INSERT OR DELETE ON customers FOR EACH ROW EXECUTE FUNCTION table_change_notify();"
        );
        assert!(notifier
            .function_sql()
            .starts_with("CREATE OR REPLACE FUNCTION table_change_notify() RETURNS trigger"));
        assert!(notifier
            .function_sql()
            .contains("channel text := 'table_change_notifications';"));
    }

    #[tokio::test]
    async fn test_installs_once() {
        let notifier = Arc::new(ChangeNotifier::default());
        let executed = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for table in ["customers", "customers", "orders"] {
            let notifier = Arc::clone(&notifier);
            let executed = Arc::clone(&executed);
            handles.push(tokio::spawn(async move {
                notifier
                    .prepare_with(table, &TableChange::ALL, |sql| {
                        executed.lock().unwrap().push(sql);
                        async { Ok::<(), PgError>(()) }
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let executed = executed.lock().unwrap();
        assert_eq!(executed.len(), 3);
        assert_eq!(
            executed.iter().filter(|sql| sql.contains("FUNCTION table_change_notify()")).count(),
            3
        );
        assert_eq!(
            executed.iter().filter(|sql| sql.starts_with("CREATE OR REPLACE FUNCTION")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_no_changes_is_a_no_op() {
        let notifier = ChangeNotifier::default();
        let mut calls = 0;
        notifier
            .prepare_with("customers", &[], |_| {
                calls += 1;
                async { Ok::<(), PgError>(()) }
            })
            .await
            .unwrap();
        assert_eq!(calls, 0);
    }
}
