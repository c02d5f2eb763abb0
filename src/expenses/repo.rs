use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Expense, ExpenseChanges, ExpenseFilter, NewExpense};

// Every statement below binds user_id: expenses are never readable or writable across users.

impl Expense {
    /// Owner's expenses, newest date first.
    pub async fn list(
        db: &PgPool,
        user_id: Uuid,
        filter: &ExpenseFilter,
    ) -> anyhow::Result<Vec<Expense>> {
        let rows = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, user_id, expense_name, price, category, date_created
              FROM expenses
             WHERE user_id = $1
               AND ($2::text IS NULL OR category = $2)
               AND ($3::text IS NULL OR expense_name = $3)
             ORDER BY date_created DESC, id
            "#,
        )
        .bind(user_id)
        .bind(filter.category.as_deref())
        .bind(filter.expense_name.as_deref())
        .fetch_all(db)
        .await
        .context("list expenses")?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Expense>> {
        let row = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, user_id, expense_name, price, category, date_created
              FROM expenses
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find expense")?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, user_id: Uuid, new: &NewExpense) -> anyhow::Result<Expense> {
        let row = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (user_id, expense_name, price, category, date_created)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, expense_name, price, category, date_created
            "#,
        )
        .bind(user_id)
        .bind(&new.expense_name)
        .bind(new.price)
        .bind(new.category.as_deref())
        .bind(new.date_created)
        .fetch_one(db)
        .await
        .context("insert expense")?;
        Ok(row)
    }

    /// Returns `None` when no expense with this id belongs to the user.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: &ExpenseChanges,
    ) -> anyhow::Result<Option<Expense>> {
        let (set_category, category) = match &changes.category {
            Some(c) => (true, c.as_deref()),
            None => (false, None),
        };
        let row = sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses
               SET expense_name = COALESCE($3, expense_name),
                   price        = COALESCE($4, price),
                   category     = CASE WHEN $5 THEN $6 ELSE category END,
                   date_created = COALESCE($7, date_created)
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, expense_name, price, category, date_created
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.expense_name.as_deref())
        .bind(changes.price)
        .bind(set_category)
        .bind(category)
        .bind(changes.date_created)
        .fetch_optional(db)
        .await
        .context("update expense")?;
        Ok(row)
    }

    /// Returns whether a row was deleted.
    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await
            .context("delete expense")?;
        Ok(result.rows_affected() > 0)
    }
}
