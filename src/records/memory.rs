use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Decimal;
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::repo::{
    insert_fields, parse_decimal, updatable_fields, CategorySummary, ListOptions, Record, RecordStore,
};
use super::tables::{Column, Direction, Kind, OwnedTable};
use crate::error::AppError;

/// In-process repository backing the test suite. Payloads go through the
/// same validation as the Postgres store; ownership, schema defaults and
/// ordering mirror the SQL.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<OwnedTable, Vec<Record>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn str_field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn is_owned(record: &Record, user_id: Uuid) -> bool {
    str_field(record, "user_id") == Some(user_id.to_string().as_str())
}

fn is_shared(record: &Record) -> bool {
    record.get("is_shared").and_then(Value::as_bool).unwrap_or(false)
}

fn has_id(record: &Record, id: Uuid) -> bool {
    str_field(record, "id") == Some(id.to_string().as_str())
}

/// Non-null values only; nulls are placed by the caller.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => parse_decimal(a).cmp(&parse_decimal(b)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn cmp_key(a: &Record, b: &Record, key: &str, dir: Direction) -> Ordering {
    let a = a.get(key).filter(|v| !v.is_null());
    let b = b.get(key).filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match dir {
            Direction::Asc => cmp_values(x, y),
            Direction::Desc => cmp_values(y, x),
        },
    }
}

fn cmp_records(table: OwnedTable, a: &Record, b: &Record) -> Ordering {
    table
        .order()
        .iter()
        .map(|(key, dir)| cmp_key(a, b, key, *dir))
        .chain([
            cmp_key(a, b, "created_at", Direction::Desc),
            cmp_key(a, b, "id", Direction::Asc),
        ])
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Value a column takes when an insert omits it.
fn column_default(column: &Column) -> Value {
    match (column.defaulted, column.kind) {
        (true, Kind::Bool) => Value::Bool(false),
        (true, Kind::Numeric | Kind::Integer) => Value::from(0),
        _ => Value::Null,
    }
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| AppError::Internal(e.into()))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(
        &self,
        table: OwnedTable,
        user_id: Uuid,
        opts: ListOptions,
    ) -> Result<Vec<Record>, AppError> {
        let opts = opts.clamped();
        let with_shared = opts.include_shared && table.shareable();
        let tables = self.tables.lock().await;
        let mut rows: Vec<Record> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| is_owned(r, user_id) || (with_shared && is_shared(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| cmp_records(table, a, b));
        let mut page: Vec<Record> = rows
            .into_iter()
            .skip(opts.offset as usize)
            .take(opts.limit as usize)
            .collect();
        // no reference data here; the joined column is always unset
        if let Some(lookup) = table.lookup() {
            for r in &mut page {
                r.insert(lookup.alias.into(), Value::Null);
            }
        }
        Ok(page)
    }

    async fn insert(&self, table: OwnedTable, user_id: Uuid, fields: Record) -> Result<Record, AppError> {
        let mut record = Record::new();
        record.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        record.insert("user_id".into(), Value::String(user_id.to_string()));
        for c in table.columns() {
            record.insert(c.name.into(), column_default(c));
        }
        if table == OwnedTable::Habits {
            record.insert("streak".into(), Value::from(0));
            record.insert("last_completed".into(), Value::Null);
        }
        for (c, v) in insert_fields(table, &fields)? {
            record.insert(c.name.into(), v);
        }
        record.insert("created_at".into(), Value::String(now_rfc3339()?));

        self.tables
            .lock()
            .await
            .entry(table)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        table: OwnedTable,
        user_id: Uuid,
        id: Uuid,
        fields: Record,
    ) -> Result<Record, AppError> {
        let picked = updatable_fields(table, &fields)?;
        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| has_id(r, id) && is_owned(r, user_id)))
            .ok_or(AppError::NotFound)?;
        for (c, v) in picked {
            row.insert(c.name.into(), v);
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: OwnedTable, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let rows = tables.get_mut(&table).ok_or(AppError::NotFound)?;
        let before = rows.len();
        rows.retain(|r| !(has_id(r, id) && is_owned(r, user_id)));
        if rows.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn complete_habit(&self, user_id: Uuid, id: Uuid, today: Date) -> Result<Record, AppError> {
        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(&OwnedTable::Habits)
            .and_then(|rows| rows.iter_mut().find(|r| has_id(r, id) && is_owned(r, user_id)))
            .ok_or(AppError::NotFound)?;
        let streak = row.get("streak").and_then(Value::as_i64).unwrap_or(0);
        row.insert("streak".into(), Value::from(streak + 1));
        row.insert("last_completed".into(), Value::String(today.to_string()));
        Ok(row.clone())
    }

    async fn summarize_transactions(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<CategorySummary>, AppError> {
        let (from, to) = (from.to_string(), to.to_string());
        let tables = self.tables.lock().await;
        let mut totals: Vec<CategorySummary> = Vec::new();
        for r in tables.get(&OwnedTable::Transactions).into_iter().flatten() {
            if !(is_owned(r, user_id) || is_shared(r)) {
                continue;
            }
            let Some(date) = str_field(r, "date").map(|d| d.get(..10).unwrap_or(d)) else {
                continue;
            };
            if date < from.as_str() || date > to.as_str() {
                continue;
            }
            let category = str_field(r, "category").map(str::to_string);
            let amount = r.get("amount").and_then(parse_decimal).unwrap_or_default();
            let idx = match totals.iter().position(|s| s.category == category) {
                Some(i) => i,
                None => {
                    totals.push(CategorySummary {
                        category,
                        expenses: Decimal::new(0, 2),
                        income: Decimal::new(0, 2),
                    });
                    totals.len() - 1
                }
            };
            match str_field(r, "type") {
                Some("expense") => totals[idx].expenses += amount,
                Some("income") => totals[idx].income += amount,
                _ => {}
            }
        }
        for t in &mut totals {
            t.expenses.rescale(2);
            t.income.rescale(2);
        }
        totals.sort_by(|a, b| match (&a.category, &b.category) {
            (Some(x), Some(y)) => x.cmp(y),
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => Ordering::Equal,
        });
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    fn fields(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn id_of(r: &Record) -> Uuid {
        Uuid::parse_str(str_field(r, "id").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn insert_ignores_spoofed_owner() {
        let store = MemoryRecordStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rec = store
            .insert(
                OwnedTable::Workouts,
                alice,
                fields(json!({"user_id": bob.to_string(), "date": "2024-03-01", "type": "run"})),
            )
            .await
            .unwrap();
        assert_eq!(str_field(&rec, "user_id"), Some(alice.to_string().as_str()));
        assert!(store.list(OwnedTable::Workouts, bob, ListOptions::default()).await.unwrap().is_empty());
        assert_eq!(store.list(OwnedTable::Workouts, alice, ListOptions::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_applies_defaults_and_keeps_nested_json() {
        let store = MemoryRecordStore::new();
        let alice = Uuid::new_v4();
        let rec = store
            .insert(OwnedTable::Transactions, alice, fields(json!({"date": "2024-03-01", "amount": 9.5})))
            .await
            .unwrap();
        assert_eq!(rec.get("is_shared"), Some(&json!(false)));
        assert_eq!(rec.get("category"), Some(&Value::Null));
        assert!(rec.get("created_at").is_some());

        let workout = store
            .insert(
                OwnedTable::Workouts,
                alice,
                fields(json!({"date": "2024-03-01", "exercises": [{"name": "squat", "sets": [5, 5]}]})),
            )
            .await
            .unwrap();
        assert_eq!(workout.get("exercises"), Some(&json!([{"name": "squat", "sets": [5, 5]}])));
    }

    #[tokio::test]
    async fn null_flags_and_malformed_values_are_rejected() {
        let store = MemoryRecordStore::new();
        let alice = Uuid::new_v4();
        for payload in [
            json!({"date": "2024-03-01", "amount": 1, "is_shared": null}),
            json!({"date": "not-a-date", "amount": 1}),
            json!({"date": "2024-03-01", "amount": "abc"}),
        ] {
            let err = store
                .insert(OwnedTable::Transactions, alice, fields(payload))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(store.list(OwnedTable::Transactions, alice, ListOptions::default()).await.unwrap().is_empty());

        let rec = store
            .insert(OwnedTable::Transactions, alice, fields(json!({"date": "2024-03-01", "amount": "12.50"})))
            .await
            .unwrap();
        let err = store
            .update(OwnedTable::Transactions, alice, id_of(&rec), fields(json!({"is_shared": null})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "is_shared is required"));
    }

    #[tokio::test]
    async fn relocation_plans_carry_country_name() {
        let store = MemoryRecordStore::new();
        let alice = Uuid::new_v4();
        store
            .insert(OwnedTable::RelocationPlans, alice, fields(json!({"target_date": "2030-01-01"})))
            .await
            .unwrap();
        let rows = store.list(OwnedTable::RelocationPlans, alice, ListOptions::default()).await.unwrap();
        assert_eq!(rows[0].get("country_name"), Some(&Value::Null));
        assert_eq!(rows[0].get("current_savings"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn missing_required_column_is_a_validation_error() {
        let store = MemoryRecordStore::new();
        let err = store
            .insert(OwnedTable::Transactions, Uuid::new_v4(), fields(json!({"date": "2024-03-01"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn other_users_records_are_not_found() {
        let store = MemoryRecordStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rec = store
            .insert(OwnedTable::Budgets, bob, fields(json!({"category": "food", "monthly_limit": 300})))
            .await
            .unwrap();
        let id = id_of(&rec);

        let err = store
            .update(OwnedTable::Budgets, alice, id, fields(json!({"monthly_limit": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
        let err = store.delete(OwnedTable::Budgets, alice, id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        // indistinguishable from an id that never existed
        let missing = store.delete(OwnedTable::Budgets, alice, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(missing.to_string(), err.to_string());

        let untouched = store.list(OwnedTable::Budgets, bob, ListOptions::default()).await.unwrap();
        assert_eq!(untouched[0].get("monthly_limit"), Some(&json!(300)));
    }

    #[tokio::test]
    async fn shared_records_cannot_be_modified_by_others() {
        let store = MemoryRecordStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rec = store
            .insert(
                OwnedTable::Transactions,
                alice,
                fields(json!({"date": "2024-03-01", "amount": 20, "is_shared": true})),
            )
            .await
            .unwrap();
        let err = store
            .update(OwnedTable::Transactions, bob, id_of(&rec), fields(json!({"amount": 0})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn update_is_partial_and_ignores_owner_field() {
        let store = MemoryRecordStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let rec = store
            .insert(OwnedTable::SavingsGoals, alice, fields(json!({"name": "Car", "target_amount": 5000})))
            .await
            .unwrap();
        let updated = store
            .update(
                OwnedTable::SavingsGoals,
                alice,
                id_of(&rec),
                fields(json!({"current_amount": 250, "user_id": bob.to_string()})),
            )
            .await
            .unwrap();
        assert_eq!(updated.get("current_amount"), Some(&json!(250)));
        assert_eq!(updated.get("name"), Some(&json!("Car")));
        assert_eq!(str_field(&updated, "user_id"), Some(alice.to_string().as_str()));
    }

    #[tokio::test]
    async fn list_with_shared_is_union_without_duplicates() {
        let store = MemoryRecordStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let tx = |date: &str, shared: bool| fields(json!({"date": date, "amount": 1, "is_shared": shared}));

        store.insert(OwnedTable::Transactions, alice, tx("2024-01-01", false)).await.unwrap();
        store.insert(OwnedTable::Transactions, alice, tx("2024-01-02", true)).await.unwrap();
        store.insert(OwnedTable::Transactions, bob, tx("2024-01-03", true)).await.unwrap();
        store.insert(OwnedTable::Transactions, bob, tx("2024-01-04", false)).await.unwrap();

        let opts = ListOptions { include_shared: true, ..Default::default() };
        let rows = store.list(OwnedTable::Transactions, alice, opts).await.unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| str_field(r, "date").unwrap()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);

        let own = store.list(OwnedTable::Transactions, alice, ListOptions::default()).await.unwrap();
        assert_eq!(own.len(), 2);
    }

    #[tokio::test]
    async fn list_order_is_deterministic_and_paginates() {
        let store = MemoryRecordStore::new();
        let alice = Uuid::new_v4();
        for (priority, name) in [(Value::Null, "later"), (json!(2), "b"), (json!(1), "a"), (json!(2), "c")] {
            store
                .insert(
                    OwnedTable::SavingsGoals,
                    alice,
                    fields(json!({"name": name, "target_amount": 10, "priority": priority})),
                )
                .await
                .unwrap();
        }
        let all = store.list(OwnedTable::SavingsGoals, alice, ListOptions::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|r| str_field(r, "name").unwrap()).collect();
        assert_eq!(names[0], "a");
        assert_eq!(names[3], "later");

        let again = store.list(OwnedTable::SavingsGoals, alice, ListOptions::default()).await.unwrap();
        assert_eq!(all, again);

        let page = store
            .list(OwnedTable::SavingsGoals, alice, ListOptions { limit: 2, offset: 1, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page, all[1..3].to_vec());
    }

    #[tokio::test]
    async fn complete_habit_increments_streak_for_owner_only() {
        let store = MemoryRecordStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let habit = store
            .insert(OwnedTable::Habits, alice, fields(json!({"name": "stretch", "streak": 99})))
            .await
            .unwrap();
        assert_eq!(habit.get("streak"), Some(&json!(0)));

        let id = id_of(&habit);
        store.complete_habit(alice, id, date!(2024 - 06 - 01)).await.unwrap();
        let done = store.complete_habit(alice, id, date!(2024 - 06 - 02)).await.unwrap();
        assert_eq!(done.get("streak"), Some(&json!(2)));
        assert_eq!(done.get("last_completed"), Some(&json!("2024-06-02")));

        let err = store.complete_habit(bob, id, date!(2024 - 06 - 02)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn summary_covers_own_and_shared_within_range() {
        let store = MemoryRecordStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let tx = |date: &str, amount: &str, category: &str, kind: &str, shared: bool| {
            fields(json!({"date": date, "amount": amount, "category": category, "type": kind, "is_shared": shared}))
        };
        store.insert(OwnedTable::Transactions, alice, tx("2024-02-03", "39.90", "food", "expense", false)).await.unwrap();
        store.insert(OwnedTable::Transactions, alice, tx("2024-02-29", "1000", "salary", "income", false)).await.unwrap();
        store.insert(OwnedTable::Transactions, bob, tx("2024-02-10", "0.10", "food", "expense", true)).await.unwrap();
        store.insert(OwnedTable::Transactions, bob, tx("2024-02-11", "500", "food", "expense", false)).await.unwrap();
        store.insert(OwnedTable::Transactions, alice, tx("2024-03-01", "7", "food", "expense", false)).await.unwrap();

        let summary = store
            .summarize_transactions(alice, date!(2024 - 02 - 01), date!(2024 - 02 - 29))
            .await
            .unwrap();
        assert_eq!(
            summary,
            vec![
                CategorySummary { category: Some("food".into()), expenses: Decimal::new(4000, 2), income: Decimal::new(0, 2) },
                CategorySummary { category: Some("salary".into()), expenses: Decimal::new(0, 2), income: Decimal::new(100000, 2) },
            ]
        );
    }
}
