use serde::{Deserialize, Serialize};

use super::repo::{ListOptions, DEFAULT_LIMIT, MAX_LIMIT};
use super::tables::OwnedTable;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(alias = "includeShared")]
    pub include_shared: Option<bool>,
}

impl ListQuery {
    /// Shareable tables include shared rows unless the caller opts out, and
    /// page at the maximum by default.
    pub fn options_for(&self, table: OwnedTable) -> ListOptions {
        let default_limit = if table.shareable() { MAX_LIMIT } else { DEFAULT_LIMIT };
        ListOptions {
            include_shared: self.include_shared.unwrap_or(table.shareable()),
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0),
        }
        .clamped()
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}
