use rust_decimal::Decimal;
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

/// Expense record in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expense_name: String,
    pub price: Decimal, // NUMERIC(8,2)
    pub category: Option<String>,
    pub date_created: Date,
}

/// Validated values for an insert. Ownership is supplied separately by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub expense_name: String,
    pub price: Decimal,
    pub category: Option<String>,
    pub date_created: Date,
}

/// Columns to overwrite on update; `None` keeps the stored value.
/// `category: Some(None)` clears the category.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpenseChanges {
    pub expense_name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<Option<String>>,
    pub date_created: Option<Date>,
}

/// Equality filters for listing.
#[derive(Debug, Default, Clone)]
pub struct ExpenseFilter {
    pub category: Option<String>,
    pub expense_name: Option<String>,
}
