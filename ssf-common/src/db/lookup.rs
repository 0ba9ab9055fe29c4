//! Batched code → id lookups backing the import resolver

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

use crate::framework::resolver::CodeLookup;
use crate::framework::Level;
use crate::Result;

impl CodeLookup for SqlitePool {
    async fn lookup_codes(&self, level: Level, codes: &[String]) -> Result<HashMap<String, i64>> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT code, id FROM {} WHERE code IN (", level.table()));
        let mut separated = builder.separated(", ");
        for code in codes {
            separated.push_bind(code.clone());
        }
        separated.push_unseparated(")");

        let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(self).await?;
        Ok(rows.into_iter().collect())
    }
}
