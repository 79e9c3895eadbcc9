use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub region: Option<String>,
    pub cost_of_living_index: Option<f64>,
    pub rent_index: Option<f64>,
    pub groceries_index: Option<f64>,
    pub avg_salary: Option<i32>,
    pub data: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PetRequirements {
    pub id: Uuid,
    pub country_id: Uuid,
    pub pets_allowed: Option<bool>,
    pub quarantine_required: Option<bool>,
    pub quarantine_days: Option<i32>,
    pub requirements: Option<Value>,
    pub estimated_cost: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// `region` is an exact match and wins over `search`, a case-insensitive
/// substring of the country name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub search: Option<String>,
}

/// Shared reference data; not scoped to any user.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_countries(&self, filter: &CountryFilter) -> Result<Vec<Country>, AppError>;
    async fn find_country(&self, id: Uuid) -> Result<Option<Country>, AppError>;
    async fn pet_requirements(&self, country_id: Uuid) -> Result<Option<PetRequirements>, AppError>;
}

#[derive(Clone)]
pub struct PgCatalogStore {
    db: PgPool,
}

impl PgCatalogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const COUNTRY_COLUMNS: &str = "id, name, code, region, cost_of_living_index, rent_index, \
                               groceries_index, avg_salary, data, created_at";

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_countries(&self, filter: &CountryFilter) -> Result<Vec<Country>, AppError> {
        let rows = if let Some(region) = filter.region.as_deref().filter(|r| !r.is_empty()) {
            sqlx::query_as::<_, Country>(&format!(
                "SELECT {COUNTRY_COLUMNS} FROM countries WHERE region = $1 ORDER BY name"
            ))
            .bind(region)
            .fetch_all(&self.db)
            .await?
        } else if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            sqlx::query_as::<_, Country>(&format!(
                "SELECT {COUNTRY_COLUMNS} FROM countries \
                 WHERE name ILIKE '%' || $1 || '%' ORDER BY name"
            ))
            .bind(search)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, Country>(&format!(
                "SELECT {COUNTRY_COLUMNS} FROM countries ORDER BY name"
            ))
            .fetch_all(&self.db)
            .await?
        };
        Ok(rows)
    }

    async fn find_country(&self, id: Uuid) -> Result<Option<Country>, AppError> {
        let row = sqlx::query_as::<_, Country>(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn pet_requirements(&self, country_id: Uuid) -> Result<Option<PetRequirements>, AppError> {
        let row = sqlx::query_as::<_, PetRequirements>(
            r#"
            SELECT id, country_id, pets_allowed, quarantine_required, quarantine_days,
                   requirements, estimated_cost, created_at
              FROM pet_requirements
             WHERE country_id = $1
             ORDER BY created_at ASC
             LIMIT 1
            "#,
        )
        .bind(country_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
