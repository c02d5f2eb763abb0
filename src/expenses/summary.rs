//! Monthly, per-category spending totals.
//!
//! Rows are grouped by `(category, month)` in category-then-month order
//! (uncategorised last), summed, then re-grouped by month in first-seen order.
//! No further sorting is applied across months.

use std::{cmp::Ordering, collections::BTreeMap};

use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Month};
use uuid::Uuid;

use super::{repo_types::Expense, services::PRICE_DECIMAL_PLACES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseSummary {
    pub user: String,
    pub summary: Vec<MonthSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    /// e.g. `"February-2023"`
    pub month: String,
    pub expense_total: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: Option<String>,
    pub total_spending: Decimal,
}

/// Calendar month a date falls in. Orders by year, then month number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MonthKey {
    year: i32,
    month: Month,
}

impl MonthKey {
    fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    fn label(self) -> String {
        format!("{}-{:04}", self.month, self.year)
    }
}

impl Ord for MonthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, u8::from(self.month)).cmp(&(other.year, u8::from(other.month)))
    }
}

impl PartialOrd for MonthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `(is_uncategorised, category, month)`: sorts named categories first, like `ORDER BY category` in Postgres.
type GroupKey = (bool, Option<String>, MonthKey);

pub fn month_label(date: Date) -> String {
    MonthKey::of(date).label()
}

/// Builds the summary for `user_id`. Rows owned by anyone else are ignored.
pub fn expense_summary(user_id: Uuid, email: &str, expenses: &[Expense]) -> ExpenseSummary {
    let mut totals: BTreeMap<GroupKey, Decimal> = BTreeMap::new();
    for e in expenses.iter().filter(|e| e.user_id == user_id) {
        let key = (
            e.category.is_none(),
            e.category.clone(),
            MonthKey::of(e.date_created),
        );
        *totals.entry(key).or_insert(Decimal::ZERO) += e.price;
    }

    let mut months: Vec<(MonthKey, MonthSummary)> = Vec::new();
    for ((_, category, month), mut total) in totals {
        total.rescale(PRICE_DECIMAL_PLACES);
        let entry = CategoryTotal {
            category,
            total_spending: total,
        };
        match months.iter_mut().find(|(key, _)| *key == month) {
            Some((_, summary)) => summary.expense_total.push(entry),
            None => months.push((
                month,
                MonthSummary {
                    month: month.label(),
                    expense_total: vec![entry],
                },
            )),
        }
    }

    ExpenseSummary {
        user: email.to_string(),
        summary: months.into_iter().map(|(_, s)| s).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use time::macros::date;

    fn expense(user_id: Uuid, category: Option<&str>, price: &str, date_created: Date) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            user_id,
            expense_name: "Groceries".into(),
            price: Decimal::from_str(price).unwrap(),
            category: category.map(String::from),
            date_created,
        }
    }

    fn total(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn labels_use_full_month_name_and_year() {
        assert_eq!(month_label(date!(2023 - 02 - 13)), "February-2023");
        assert_eq!(month_label(date!(2024 - 12 - 31)), "December-2024");
    }

    #[test]
    fn month_keys_order_by_year_then_month_number() {
        let mut keys = vec![
            MonthKey::of(date!(2023 - 12 - 01)),
            MonthKey::of(date!(2023 - 02 - 01)),
            MonthKey::of(date!(2022 - 12 - 31)),
            MonthKey::of(date!(2023 - 10 - 15)),
        ];
        keys.sort();
        let labels: Vec<String> = keys.into_iter().map(MonthKey::label).collect();
        assert_eq!(
            labels,
            vec!["December-2022", "February-2023", "October-2023", "December-2023"]
        );
    }

    #[test]
    fn no_expenses_means_empty_summary() {
        let summary = expense_summary(Uuid::new_v4(), "test@example.com", &[]);
        assert_eq!(summary.user, "test@example.com");
        assert!(summary.summary.is_empty());
    }

    #[test]
    fn two_months_sum_exactly_per_category() {
        let me = Uuid::new_v4();
        let rows = vec![
            expense(me, Some("Food"), "10.10", date!(2023 - 01 - 03)),
            expense(me, Some("Food"), "0.20", date!(2023 - 01 - 28)),
            expense(me, Some("Rent"), "800.00", date!(2023 - 01 - 01)),
            expense(me, Some("Food"), "5.05", date!(2023 - 02 - 14)),
            expense(me, Some("Fun"), "19.99", date!(2023 - 02 - 02)),
        ];

        let summary = expense_summary(me, "me@example.com", &rows);
        assert_eq!(summary.summary.len(), 2);

        let jan = &summary.summary[0];
        assert_eq!(jan.month, "January-2023");
        assert_eq!(
            jan.expense_total,
            vec![
                CategoryTotal { category: Some("Food".into()), total_spending: total("10.30") },
                CategoryTotal { category: Some("Rent".into()), total_spending: total("800.00") },
            ]
        );

        let feb = &summary.summary[1];
        assert_eq!(feb.month, "February-2023");
        assert_eq!(
            feb.expense_total,
            vec![
                CategoryTotal { category: Some("Food".into()), total_spending: total("5.05") },
                CategoryTotal { category: Some("Fun".into()), total_spending: total("19.99") },
            ]
        );
    }

    #[test]
    fn other_users_rows_are_ignored() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let rows = vec![
            expense(other, Some("Food"), "1000.00", date!(2023 - 01 - 03)),
            expense(me, Some("Food"), "1.00", date!(2023 - 01 - 03)),
            expense(other, Some("Travel"), "50.00", date!(2023 - 03 - 03)),
        ];

        let summary = expense_summary(me, "me@example.com", &rows);
        assert_eq!(summary.summary.len(), 1);
        assert_eq!(summary.summary[0].expense_total.len(), 1);
        assert_eq!(summary.summary[0].expense_total[0].total_spending, total("1.00"));
    }

    #[test]
    fn months_follow_first_category_order_not_calendar_order() {
        let me = Uuid::new_v4();
        // "Apples" only appears in March, so March is seen before January.
        let rows = vec![
            expense(me, Some("Books"), "3.00", date!(2023 - 01 - 10)),
            expense(me, Some("Apples"), "2.00", date!(2023 - 03 - 10)),
        ];

        let months: Vec<String> = expense_summary(me, "me@example.com", &rows)
            .summary
            .into_iter()
            .map(|m| m.month)
            .collect();
        assert_eq!(months, vec!["March-2023", "January-2023"]);
    }

    #[test]
    fn uncategorised_rows_sort_after_named_categories() {
        let me = Uuid::new_v4();
        let rows = vec![
            expense(me, None, "4.00", date!(2023 - 05 - 01)),
            expense(me, None, "6.00", date!(2023 - 05 - 20)),
            expense(me, Some("Zoo"), "1.50", date!(2023 - 05 - 02)),
        ];

        let summary = expense_summary(me, "me@example.com", &rows);
        let may = &summary.summary[0].expense_total;
        assert_eq!(may[0].category.as_deref(), Some("Zoo"));
        assert_eq!(may[1].category, None);
        assert_eq!(may[1].total_spending, total("10.00"));
    }

    #[test]
    fn same_month_in_different_years_stays_apart() {
        let me = Uuid::new_v4();
        let rows = vec![
            expense(me, Some("Food"), "1.00", date!(2022 - 06 - 01)),
            expense(me, Some("Food"), "2.00", date!(2023 - 06 - 01)),
        ];
        let summary = expense_summary(me, "me@example.com", &rows);
        let labels: Vec<&str> = summary.summary.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["June-2022", "June-2023"]);
    }

    #[test]
    fn serialized_shape() {
        let me = Uuid::new_v4();
        let rows = vec![expense(me, Some("Food"), "12.5", date!(2023 - 02 - 13))];
        let value = serde_json::to_value(expense_summary(me, "test@example.com", &rows)).unwrap();
        assert_eq!(
            value,
            json!({
                "user": "test@example.com",
                "summary": [{
                    "month": "February-2023",
                    "expense_total": [{ "category": "Food", "total_spending": "12.50" }]
                }]
            })
        );
    }
}
