use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{Expense, ExpenseFilter};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Price as sent. A value that is not a decimal is kept so validation can report it on `price`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Valid(Decimal),
    Invalid(serde_json::Value),
}

impl From<Decimal> for PriceInput {
    fn from(price: Decimal) -> Self {
        Self::Valid(price)
    }
}

/// Date as sent; anything other than `YYYY-MM-DD` is `Invalid`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Valid(#[serde(with = "iso_date")] Date),
    Invalid(serde_json::Value),
}

impl From<Date> for DateInput {
    fn from(date: Date) -> Self {
        Self::Valid(date)
    }
}

/// Body for create (POST) and full replace (PUT).
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseRequest {
    pub expense_name: Option<String>,
    pub price: Option<PriceInput>,
    pub category: Option<String>,
    pub date_created: Option<DateInput>,
}

/// Body for PATCH. `category: null` clears it, an absent key leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct PatchExpenseRequest {
    pub expense_name: Option<String>,
    pub price: Option<PriceInput>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    pub date_created: Option<DateInput>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub expense_name: String,
    pub price: Decimal,
    pub category: Option<String>,
    #[serde(with = "iso_date")]
    pub date_created: Date,
}

impl From<Expense> for ExpenseResponse {
    fn from(e: Expense) -> Self {
        Self {
            id: e.id,
            expense_name: e.expense_name,
            price: e.price,
            category: e.category,
            date_created: e.date_created,
        }
    }
}

/// `?category=..&expense_name=..`; empty values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub category: Option<String>,
    pub expense_name: Option<String>,
}

impl From<ExpenseQuery> for ExpenseFilter {
    fn from(q: ExpenseQuery) -> Self {
        Self {
            category: q.category.filter(|c| !c.is_empty()),
            expense_name: q.expense_name.filter(|n| !n.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn request_accepts_decimal_strings_and_iso_dates() {
        let req: ExpenseRequest = serde_json::from_value(json!({
            "expense_name": "Gas",
            "price": "1000.00",
            "date_created": "2023-02-13",
        }))
        .unwrap();
        assert_eq!(req.expense_name.as_deref(), Some("Gas"));
        assert_eq!(req.price, Some(PriceInput::Valid(Decimal::new(100000, 2))));
        assert_eq!(req.date_created, Some(DateInput::Valid(date!(2023 - 02 - 13))));
        assert!(req.category.is_none());
    }

    #[test]
    fn request_without_date_leaves_it_unset() {
        let req: ExpenseRequest =
            serde_json::from_value(json!({ "expense_name": "Expense", "price": 12.5 })).unwrap();
        assert!(req.date_created.is_none());
        assert_eq!(req.price, Some(PriceInput::Valid(Decimal::new(125, 1))));
    }

    #[test]
    fn wrongly_typed_price_and_date_still_deserialize() {
        let req: ExpenseRequest = serde_json::from_value(json!({
            "price": "abc",
            "date_created": "13/02/2023",
        }))
        .unwrap();
        assert_eq!(req.price, Some(PriceInput::Invalid(json!("abc"))));
        assert_eq!(req.date_created, Some(DateInput::Invalid(json!("13/02/2023"))));

        let patch: PatchExpenseRequest =
            serde_json::from_value(json!({ "price": true, "date_created": 20230213 })).unwrap();
        assert_eq!(patch.price, Some(PriceInput::Invalid(json!(true))));
        assert_eq!(patch.date_created, Some(DateInput::Invalid(json!(20230213))));
    }

    #[test]
    fn null_price_and_date_are_absent() {
        let req: ExpenseRequest =
            serde_json::from_value(json!({ "price": null, "date_created": null })).unwrap();
        assert!(req.price.is_none());
        assert!(req.date_created.is_none());
    }

    #[test]
    fn patch_distinguishes_null_from_missing_category() {
        let cleared: PatchExpenseRequest =
            serde_json::from_value(json!({ "category": null })).unwrap();
        assert_eq!(cleared.category, Some(None));

        let untouched: PatchExpenseRequest =
            serde_json::from_value(json!({ "price": "3.50" })).unwrap();
        assert_eq!(untouched.category, None);

        let set: PatchExpenseRequest =
            serde_json::from_value(json!({ "category": "Food" })).unwrap();
        assert_eq!(set.category, Some(Some("Food".to_string())));
    }

    #[test]
    fn response_serializes_price_as_string_and_date_as_iso() {
        let resp = ExpenseResponse {
            id: Uuid::nil(),
            expense_name: "Groceries".into(),
            price: Decimal::new(100000, 2),
            category: Some("Food".into()),
            date_created: date!(2023 - 02 - 13),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["price"], "1000.00");
        assert_eq!(value["date_created"], "2023-02-13");
        assert_eq!(value["category"], "Food");
        assert_eq!(value["id"], Uuid::nil().to_string());
    }

    #[test]
    fn empty_query_values_are_not_filters() {
        let filter = ExpenseFilter::from(ExpenseQuery {
            category: Some(String::new()),
            expense_name: Some("Gas".into()),
        });
        assert!(filter.category.is_none());
        assert_eq!(filter.expense_name.as_deref(), Some("Gas"));
    }
}
