use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{types::Decimal, FromRow};
use time::{macros::format_description, Date};
use uuid::Uuid;

use super::tables::{Column, Kind, OwnedTable};
use crate::error::AppError;

/// A row as a free-form JSON object; nested fields pass through untouched.
pub type Record = Map<String, Value>;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Also return `is_shared` rows of other users. Ignored for tables without sharing.
    pub include_shared: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_shared: false,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ListOptions {
    pub fn clamped(self) -> Self {
        Self {
            include_shared: self.include_shared,
            limit: self.limit.clamp(1, MAX_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

/// Income and expense totals of one transaction category.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CategorySummary {
    pub category: Option<String>,
    pub expenses: Decimal,
    pub income: Decimal,
}

/// Every query is scoped to `user_id`: rows of other users are invisible to
/// update and delete and surface as `NotFound`, the same as a missing id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(
        &self,
        table: OwnedTable,
        user_id: Uuid,
        opts: ListOptions,
    ) -> Result<Vec<Record>, AppError>;

    /// `user_id` always comes from the caller, never from `fields`.
    async fn insert(&self, table: OwnedTable, user_id: Uuid, fields: Record) -> Result<Record, AppError>;

    async fn update(
        &self,
        table: OwnedTable,
        user_id: Uuid,
        id: Uuid,
        fields: Record,
    ) -> Result<Record, AppError>;

    async fn delete(&self, table: OwnedTable, user_id: Uuid, id: Uuid) -> Result<(), AppError>;

    /// Bumps the streak of an owned habit and stamps `last_completed`.
    async fn complete_habit(&self, user_id: Uuid, id: Uuid, today: Date) -> Result<Record, AppError>;

    /// Totals of the caller's and shared transactions dated within `[from, to]`.
    async fn summarize_transactions(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<CategorySummary>, AppError>;
}

/// Parses a NUMERIC payload value: a JSON number or a numeric string.
pub(crate) fn parse_decimal(v: &Value) -> Option<Decimal> {
    let text = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn is_date(s: &str) -> bool {
    let day = s.get(..10).unwrap_or(s);
    let rest = s.get(10..).unwrap_or("");
    Date::parse(day, format_description!("[year]-[month]-[day]")).is_ok()
        && (rest.is_empty() || rest.starts_with('T') || rest.starts_with(' '))
}

fn is_uuid(v: &Value) -> bool {
    v.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok())
}

/// Rejects values the column's database type would refuse.
pub(crate) fn check_value(column: &Column, value: &Value) -> Result<(), AppError> {
    if value.is_null() {
        return if column.nullable() {
            Ok(())
        } else {
            Err(AppError::validation(format!("{} is required", column.name)))
        };
    }
    let ok = match column.kind {
        Kind::Text => matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)),
        Kind::Date => value.as_str().is_some_and(is_date),
        Kind::Numeric => parse_decimal(value).is_some(),
        Kind::Integer => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
        Kind::Bool => value.is_boolean(),
        Kind::Json => true,
        Kind::Uuid => is_uuid(value),
        Kind::UuidArray => value.as_array().is_some_and(|items| items.iter().all(is_uuid)),
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid value for {}", column.name)))
    }
}

/// Whitelisted, type-checked columns of `fields`. Unknown keys, `id`,
/// `user_id` and `created_at` are dropped.
fn writable_fields(table: OwnedTable, fields: &Record) -> Result<Vec<(&'static Column, Value)>, AppError> {
    table
        .columns()
        .iter()
        .filter_map(|c| fields.get(c.name).map(|v| (c, v)))
        .map(|(c, v)| check_value(c, v).map(|_| (c, v.clone())))
        .collect()
}

/// Payload of an insert; every required column must be present.
pub(crate) fn insert_fields(table: OwnedTable, fields: &Record) -> Result<Vec<(&'static Column, Value)>, AppError> {
    let picked = writable_fields(table, fields)?;
    if let Some(missing) = table
        .columns()
        .iter()
        .find(|c| c.required && !picked.iter().any(|(p, _)| p.name == c.name))
    {
        return Err(AppError::validation(format!("{} is required", missing.name)));
    }
    Ok(picked)
}

/// Payload of a partial update; at least one writable column.
pub(crate) fn updatable_fields(
    table: OwnedTable,
    fields: &Record,
) -> Result<Vec<(&'static Column, Value)>, AppError> {
    let picked = writable_fields(table, fields)?;
    if picked.is_empty() {
        return Err(AppError::validation("No updatable fields"));
    }
    Ok(picked)
}
