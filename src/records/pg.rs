use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use time::Date;
use tracing::debug;
use uuid::Uuid;

use super::repo::{insert_fields, updatable_fields, CategorySummary, ListOptions, Record, RecordStore};
use super::tables::{Column, Direction, OwnedTable};
use crate::error::AppError;

/// Postgres-backed repository. Rows are returned through `to_jsonb` and
/// payloads are written through `jsonb_populate_record`, so column types are
/// converted by the database.
#[derive(Clone)]
pub struct PgRecordStore {
    db: PgPool,
}

impl PgRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn order_clause(table: OwnedTable) -> String {
    let mut keys: Vec<String> = table
        .order()
        .iter()
        .map(|(name, dir)| {
            let dir = match dir {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            format!("t.{name} {dir} NULLS LAST")
        })
        .collect();
    keys.push("t.created_at DESC".into());
    keys.push("t.id ASC".into());
    keys.join(", ")
}

pub(crate) fn list_sql(table: OwnedTable, include_shared: bool) -> String {
    let scope = if include_shared && table.shareable() {
        "(t.user_id = $1 OR t.is_shared = true)"
    } else {
        "t.user_id = $1"
    };
    // LEFT JOIN keeps rows whose reference is unset
    let (record, join) = match table.lookup() {
        Some(l) => (
            format!("to_jsonb(t) || jsonb_build_object('{}', l.{})", l.alias, l.column),
            format!(" LEFT JOIN {} l ON l.id = t.{}", l.table, l.foreign_key),
        ),
        None => ("to_jsonb(t)".to_string(), String::new()),
    };
    format!(
        "SELECT {record} AS record FROM {table} t{join} WHERE {scope} ORDER BY {order} LIMIT $2 OFFSET $3",
        table = table.name(),
        order = order_clause(table),
    )
}

pub(crate) fn insert_sql(table: OwnedTable, columns: &[&str]) -> String {
    let name = table.name();
    if columns.is_empty() {
        return format!("INSERT INTO {name} AS t (user_id) VALUES ($1) RETURNING to_jsonb(t) AS record");
    }
    let cols = columns.join(", ");
    let picked = columns
        .iter()
        .map(|c| format!("r.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {name} AS t (user_id, {cols}) \
         SELECT $1, {picked} FROM jsonb_populate_record(NULL::{name}, $2) AS r \
         RETURNING to_jsonb(t) AS record"
    )
}

pub(crate) fn update_sql(table: OwnedTable, columns: &[&str]) -> String {
    let name = table.name();
    let picked = columns
        .iter()
        .map(|c| format!("r.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let target = if columns.len() == 1 {
        columns[0].to_string()
    } else {
        format!("({})", columns.join(", "))
    };
    format!(
        "UPDATE {name} AS t SET {target} = \
         (SELECT {picked} FROM jsonb_populate_record(NULL::{name}, $3) AS r) \
         WHERE t.id = $1 AND t.user_id = $2 \
         RETURNING to_jsonb(t) AS record"
    )
}

pub(crate) fn delete_sql(table: OwnedTable) -> String {
    format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", table.name())
}

fn into_record(value: Value) -> Result<Record, AppError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Internal(anyhow!("expected a JSON object row, got {other}"))),
    }
}

fn payload(picked: &[(&'static Column, Value)]) -> (Vec<&'static str>, Value) {
    let names = picked.iter().map(|(c, _)| c.name).collect();
    let object = picked
        .iter()
        .map(|(c, v)| (c.name.to_string(), v.clone()))
        .collect::<Record>();
    (names, Value::Object(object))
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list(
        &self,
        table: OwnedTable,
        user_id: Uuid,
        opts: ListOptions,
    ) -> Result<Vec<Record>, AppError> {
        let opts = opts.clamped();
        let rows = sqlx::query_scalar::<_, Value>(&list_sql(table, opts.include_shared))
            .bind(user_id)
            .bind(opts.limit)
            .bind(opts.offset)
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(into_record).collect()
    }

    async fn insert(&self, table: OwnedTable, user_id: Uuid, fields: Record) -> Result<Record, AppError> {
        let (columns, body) = payload(&insert_fields(table, &fields)?);
        let row = sqlx::query_scalar::<_, Value>(&insert_sql(table, &columns))
            .bind(user_id)
            .bind(body)
            .fetch_one(&self.db)
            .await?;
        debug!(table = table.name(), %user_id, "record inserted");
        into_record(row)
    }

    async fn update(
        &self,
        table: OwnedTable,
        user_id: Uuid,
        id: Uuid,
        fields: Record,
    ) -> Result<Record, AppError> {
        let (columns, body) = payload(&updatable_fields(table, &fields)?);
        let row = sqlx::query_scalar::<_, Value>(&update_sql(table, &columns))
            .bind(id)
            .bind(user_id)
            .bind(body)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        into_record(row)
    }

    async fn delete(&self, table: OwnedTable, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(&delete_sql(table))
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn complete_habit(&self, user_id: Uuid, id: Uuid, today: Date) -> Result<Record, AppError> {
        let row = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE habits AS t
               SET streak = t.streak + 1, last_completed = $3
             WHERE t.id = $1 AND t.user_id = $2
            RETURNING to_jsonb(t) AS record
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(today)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)?;
        into_record(row)
    }

    async fn summarize_transactions(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<CategorySummary>, AppError> {
        let rows = sqlx::query_as::<_, CategorySummary>(
            r#"
            SELECT category,
                   COALESCE(SUM(CASE WHEN type = 'expense' THEN amount ELSE 0.00 END), 0.00) AS expenses,
                   COALESCE(SUM(CASE WHEN type = 'income' THEN amount ELSE 0.00 END), 0.00) AS income
              FROM transactions
             WHERE (user_id = $1 OR is_shared = true)
               AND date BETWEEN $2 AND $3
             GROUP BY category
             ORDER BY category ASC NULLS LAST
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
