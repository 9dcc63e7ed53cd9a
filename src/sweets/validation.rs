use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::{
    dto::SweetInput,
    repo_types::{Sweet, SweetFields},
};
use crate::error::{AppError, FieldErrors, REQUIRED};

pub const NAME_MAX_LENGTH: usize = 255;
pub const CATEGORY_MAX_LENGTH: usize = 100;
pub const PRICE_MAX_DIGITS: u32 = 6;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub const QUANTITY_NOT_INTEGER: &str = "quantity must be a valid integer.";
pub const QUANTITY_NOT_POSITIVE: &str = "quantity must be a positive integer.";
pub const QUANTITY_TOO_LARGE: &str = "quantity is too large.";

const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_A_NUMBER: &str = "A valid number is required.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";
const NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

/// Which fields must be present in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Replace,
    Patch,
}

/// Integer coercion shared by stock fields: JSON integers, integral
/// floats and numeric strings.
pub fn coerce_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_text(v: &Value, max_len: usize) -> Result<String, String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_A_STRING.into()),
    };
    if s.is_empty() {
        return Err(BLANK.into());
    }
    if s.chars().count() > max_len {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            max_len
        ));
    }
    Ok(s)
}

fn parse_price(v: &Value) -> Result<Decimal, String> {
    let raw = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_A_NUMBER.into()),
    };
    // rust_decimal accepts `1_000`; plain decimal notation only
    if raw.contains('_') {
        return Err(NOT_A_NUMBER.into());
    }
    let value = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| NOT_A_NUMBER.to_string())?
        .normalize();

    let digits = value.mantissa().unsigned_abs().to_string().len() as u32;
    let decimals = value.scale();
    let total = digits.max(decimals);
    let whole = total - decimals;

    if total > PRICE_MAX_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {} digits in total.",
            PRICE_MAX_DIGITS
        ));
    }
    if decimals > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_DECIMAL_PLACES
        ));
    }
    if whole > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES
        ));
    }
    if value.is_sign_negative() && !value.is_zero() {
        return Err(NEGATIVE.into());
    }

    let mut value = value;
    value.rescale(PRICE_DECIMAL_PLACES);
    Ok(value)
}

fn parse_stock(v: &Value) -> Result<i32, String> {
    let n = coerce_int(v).ok_or_else(|| NOT_AN_INTEGER.to_string())?;
    if n < 0 {
        return Err(NEGATIVE.into());
    }
    i32::try_from(n)
        .map_err(|_| format!("Ensure this value is less than or equal to {}.", i32::MAX))
}

fn field<T>(
    errors: &mut FieldErrors,
    name: &str,
    value: Option<&Value>,
    parse: impl Fn(&Value) -> Result<T, String>,
    fallback: Option<T>,
) -> Option<T> {
    match (value, fallback) {
        (Some(v), _) => match parse(v) {
            Ok(parsed) => Some(parsed),
            Err(msg) => {
                errors.add(name, msg);
                None
            }
        },
        (None, Some(fallback)) => Some(fallback),
        (None, None) => {
            errors.add(name, REQUIRED);
            None
        }
    }
}

/// Turns a request body into writable fields. `existing` supplies values
/// for fields the mode allows to be omitted.
pub fn validate_sweet(
    input: &SweetInput,
    existing: Option<&Sweet>,
    mode: WriteMode,
) -> Result<SweetFields, FieldErrors> {
    let kept = if mode == WriteMode::Patch { existing } else { None };

    let mut errors = FieldErrors::new();
    let name = field(
        &mut errors,
        "name",
        input.name.as_ref(),
        |v| parse_text(v, NAME_MAX_LENGTH),
        kept.map(|s| s.name.clone()),
    );
    let category = field(
        &mut errors,
        "category",
        input.category.as_ref(),
        |v| parse_text(v, CATEGORY_MAX_LENGTH),
        kept.map(|s| s.category.clone()),
    );
    let price = field(
        &mut errors,
        "price",
        input.price.as_ref(),
        parse_price,
        kept.map(|s| s.price),
    );
    let quantity_in_stock = field(
        &mut errors,
        "quantity_in_stock",
        input.quantity_in_stock.as_ref(),
        parse_stock,
        Some(existing.map_or(0, |s| s.quantity_in_stock)),
    );

    match (name, category, price, quantity_in_stock) {
        (Some(name), Some(category), Some(price), Some(quantity_in_stock)) if errors.is_empty() => {
            Ok(SweetFields {
                name,
                category,
                price,
                quantity_in_stock,
            })
        }
        _ => Err(errors),
    }
}

/// Restock amount: must coerce to an integer and be strictly positive.
pub fn restock_quantity(value: Option<&Value>) -> Result<i32, AppError> {
    let n = value
        .and_then(coerce_int)
        .ok_or_else(|| AppError::BadRequest(QUANTITY_NOT_INTEGER.into()))?;
    if n <= 0 {
        return Err(AppError::BadRequest(QUANTITY_NOT_POSITIVE.into()));
    }
    i32::try_from(n).map_err(|_| AppError::BadRequest(QUANTITY_TOO_LARGE.into()))
}
