use rust_decimal::Decimal;
use time::Date;

use super::{
    dto::{DateInput, ExpenseRequest, PatchExpenseRequest, PriceInput},
    repo_types::{ExpenseChanges, NewExpense},
};
use crate::error::{AppError, FieldErrors, REQUIRED};

pub const PRICE_DECIMAL_PLACES: u32 = 2;
pub const PRICE_MAX_DIGITS: u32 = 8;
pub const MAX_TEXT_LEN: usize = 255;

const INVALID_PRICE: &str = "A valid number is required.";
const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// Rescales a price to exactly two fraction digits, within NUMERIC(8,2).
///
/// The scale is checked as written, so `"1.50000"` is rejected like `"1.005"`.
pub fn check_price(mut price: Decimal) -> Result<Decimal, String> {
    if price.scale() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    let limit = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if price.abs() >= limit {
        return Err(format!(
            "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
        ));
    }
    price.rescale(PRICE_DECIMAL_PLACES);
    Ok(price)
}

fn check_text(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
        None
    } else if value.chars().count() > MAX_TEXT_LEN {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_TEXT_LEN} characters."),
        );
        None
    } else {
        Some(value.to_string())
    }
}

/// Blank categories are stored as "no category".
fn check_category(errors: &mut FieldErrors, raw: Option<&str>) -> Option<String> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(c) => check_text(errors, "category", c),
    }
}

fn check_price_field(errors: &mut FieldErrors, price: PriceInput) -> Option<Decimal> {
    match price {
        PriceInput::Valid(p) => check_price(p).map_err(|msg| errors.add("price", msg)).ok(),
        PriceInput::Invalid(_) => {
            errors.add("price", INVALID_PRICE);
            None
        }
    }
}

fn check_date_field(errors: &mut FieldErrors, date: Option<DateInput>) -> Option<Date> {
    match date? {
        DateInput::Valid(d) => Some(d),
        DateInput::Invalid(_) => {
            errors.add("date_created", INVALID_DATE);
            None
        }
    }
}

struct FullExpense {
    expense_name: String,
    price: Decimal,
    category: Option<String>,
    date_created: Option<Date>,
}

fn validate_full(req: ExpenseRequest) -> Result<FullExpense, AppError> {
    let mut errors = FieldErrors::new();

    let expense_name = match req.expense_name.as_deref() {
        Some(raw) => check_text(&mut errors, "expense_name", raw),
        None => {
            errors.add("expense_name", REQUIRED);
            None
        }
    };
    let price = match req.price {
        Some(p) => check_price_field(&mut errors, p),
        None => {
            errors.add("price", REQUIRED);
            None
        }
    };
    let category = check_category(&mut errors, req.category.as_deref());
    let date_created = check_date_field(&mut errors, req.date_created);

    match (expense_name, price) {
        (Some(expense_name), Some(price)) if errors.is_empty() => Ok(FullExpense {
            expense_name,
            price,
            category,
            date_created,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

/// Validates a create payload. A missing date becomes `today`.
pub fn validate_new(req: ExpenseRequest, today: Date) -> Result<NewExpense, AppError> {
    let full = validate_full(req)?;
    Ok(NewExpense {
        expense_name: full.expense_name,
        price: full.price,
        category: full.category,
        date_created: full.date_created.unwrap_or(today),
    })
}

/// Validates a PUT payload: name and price are required, the category is replaced
/// (cleared when absent) and an absent date keeps the stored one.
pub fn validate_replace(req: ExpenseRequest) -> Result<ExpenseChanges, AppError> {
    let full = validate_full(req)?;
    Ok(ExpenseChanges {
        expense_name: Some(full.expense_name),
        price: Some(full.price),
        category: Some(full.category),
        date_created: full.date_created,
    })
}

pub fn validate_patch(req: PatchExpenseRequest) -> Result<ExpenseChanges, AppError> {
    let mut errors = FieldErrors::new();

    let expense_name = req
        .expense_name
        .as_deref()
        .and_then(|raw| check_text(&mut errors, "expense_name", raw));
    let price = req.price.and_then(|p| check_price_field(&mut errors, p));
    let category = req
        .category
        .map(|c| check_category(&mut errors, c.as_deref()));
    let date_created = check_date_field(&mut errors, req.date_created);

    errors.into_result()?;
    Ok(ExpenseChanges {
        expense_name,
        price,
        category,
        date_created,
    })
}
