use rusqlite::{params, types::Value};

use super::*;

impl SalesDb {
    // =========================================================================
    // Sales
    // =========================================================================

    fn map_sale_row(row: &rusqlite::Row) -> rusqlite::Result<DbSale> {
        Ok(DbSale {
            id: row.get(0)?,
            client_id: row.get(1)?,
            date: row.get(2)?,
            amount: row.get(3)?,
            product_or_service: row.get(4)?,
        })
    }

    /// Insert a sale against an existing client and return the populated
    /// row. Amounts must be positive.
    pub fn add_sale(&self, client_id: i64, sale: &NewSale) -> Result<DbSale, DbError> {
        if sale.amount <= 0.0 {
            return Err(DbError::InvalidAmount(sale.amount));
        }
        self.conn.execute(
            "INSERT INTO sales (client_id, date, amount, product_or_service)
             VALUES (?1, ?2, ?3, ?4)",
            params![client_id, sale.date, sale.amount, sale.product_or_service],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(DbSale {
            id,
            client_id,
            date: sale.date.clone(),
            amount: sale.amount,
            product_or_service: sale.product_or_service.clone(),
        })
    }

    /// Get a sale by id.
    pub fn get_sale(&self, id: i64) -> Result<Option<DbSale>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_id, date, amount, product_or_service
             FROM sales WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_sale_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List one client's sales, most recent first.
    pub fn list_sales_for_client(&self, client_id: i64) -> Result<Vec<DbSale>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_id, date, amount, product_or_service
             FROM sales
             WHERE client_id = ?1
             ORDER BY date DESC",
        )?;
        let rows = stmt.query_map(params![client_id], Self::map_sale_row)?;

        let mut sales = Vec::new();
        for row in rows {
            sales.push(row?);
        }
        Ok(sales)
    }

    /// List every sale belonging to a user's clients, most recent first,
    /// optionally bounded to `[start, end]` (inclusive, RFC3339 strings —
    /// lexicographic comparison is chronological for this format).
    pub fn list_sales_for_user(
        &self,
        user_id: i64,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<DbSale>, DbError> {
        let mut sql = String::from(
            "SELECT s.id, s.client_id, s.date, s.amount, s.product_or_service
             FROM sales s
             JOIN clients c ON c.id = s.client_id
             WHERE c.user_id = ?",
        );
        let mut values: Vec<Value> = vec![Value::from(user_id)];
        if let Some(start) = start {
            sql.push_str(" AND s.date >= ?");
            values.push(Value::from(start.to_string()));
        }
        if let Some(end) = end {
            sql.push_str(" AND s.date <= ?");
            values.push(Value::from(end.to_string()));
        }
        sql.push_str(" ORDER BY s.date DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), Self::map_sale_row)?;

        let mut sales = Vec::new();
        for row in rows {
            sales.push(row?);
        }
        Ok(sales)
    }

    /// Apply a partial update. Unknown id is a zero-row no-op.
    pub fn update_sale(&self, id: i64, patch: &SalePatch) -> Result<usize, DbError> {
        if let Some(amount) = patch.amount {
            if amount <= 0.0 {
                return Err(DbError::InvalidAmount(amount));
            }
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(date) = &patch.date {
            sets.push("date = ?");
            values.push(Value::from(date.clone()));
        }
        if let Some(amount) = patch.amount {
            sets.push("amount = ?");
            values.push(Value::from(amount));
        }
        if let Some(product) = &patch.product_or_service {
            sets.push("product_or_service = ?");
            values.push(Value::from(product.clone()));
        }

        if sets.is_empty() {
            return Ok(0);
        }

        let sql = format!("UPDATE sales SET {} WHERE id = ?", sets.join(", "));
        values.push(Value::from(id));
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(changed)
    }

    /// Delete a sale.
    pub fn delete_sale(&self, id: i64) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM sales WHERE id = ?1", params![id])?;
        Ok(())
    }
}
