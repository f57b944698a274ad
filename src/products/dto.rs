use std::str::FromStr;

use lazy_static::lazy_static;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    products::repo_types::{NewProduct, ProductChanges},
    validation::{required_string, FieldErrors},
};

const MAX_NAME_LEN: usize = 255;
const PRICE_SCALE: u32 = 2;

lazy_static! {
    // NUMERIC(12, 2)
    static ref MAX_PRICE: Decimal = Decimal::new(999_999_999_999, PRICE_SCALE);
}

/// Body of `POST /products` and `PUT /products/{id}`.
///
/// Fields are kept as raw JSON so type mismatches surface as field errors, and so an
/// explicit `null` can be told apart from an absent key.
#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn name_rule(errors: &mut FieldErrors, value: &Value) -> Option<String> {
    match value {
        Value::Null => required_string(errors, "name", None, MAX_NAME_LEN).map(str::to_string),
        Value::String(s) => {
            required_string(errors, "name", Some(s.as_str()), MAX_NAME_LEN).map(str::to_string)
        }
        _ => {
            errors.add("name", "The name field must be a string.");
            None
        }
    }
}

/// Empty strings collapse to `null`.
fn description_rule(errors: &mut FieldErrors, value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => {
            let trimmed = s.trim();
            Some((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        _ => {
            errors.add("description", "The description field must be a string.");
            None
        }
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn price_rule(errors: &mut FieldErrors, value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Null => {
            errors.add("price", "The price field is required.");
            return None;
        }
        Value::String(s) if s.trim().is_empty() => {
            errors.add("price", "The price field is required.");
            return None;
        }
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    };
    let Some(price) = parsed else {
        errors.add("price", "The price field must be a number.");
        return None;
    };
    if price.is_sign_negative() && !price.is_zero() {
        errors.add("price", "The price field must be at least 0.");
        return None;
    }
    let price = price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if price > *MAX_PRICE {
        errors.add(
            "price",
            format!("The price field must not be greater than {}.", *MAX_PRICE),
        );
        return None;
    }
    Some(price)
}

impl ProductPayload {
    /// All of `name` and `price` are required.
    pub fn validate_create(&self) -> Result<NewProduct, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = name_rule(&mut errors, self.name.as_ref().unwrap_or(&Value::Null));
        let description = match &self.description {
            Some(v) => description_rule(&mut errors, v),
            None => Some(None),
        };
        let price = price_rule(&mut errors, self.price.as_ref().unwrap_or(&Value::Null));

        match (name, description, price) {
            (Some(name), Some(description), Some(price)) => Ok(NewProduct {
                name,
                description,
                price,
            }),
            _ => Err(errors),
        }
    }

    /// Only the keys present in the body are checked and changed.
    pub fn validate_update(&self) -> Result<ProductChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        let changes = ProductChanges {
            name: self.name.as_ref().and_then(|v| name_rule(&mut errors, v)),
            description: self
                .description
                .as_ref()
                .and_then(|v| description_rule(&mut errors, v)),
            price: self.price.as_ref().and_then(|v| price_rule(&mut errors, v)),
        };
        errors.into_result().map(|()| changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(body: Value) -> ProductPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn null_and_absent_are_distinct() {
        let p = payload(json!({ "description": null }));
        assert_eq!(p.description, Some(Value::Null));
        assert_eq!(p.name, None);
    }

    #[test]
    fn create_requires_name_and_price() {
        let errors = payload(json!({})).validate_create().unwrap_err();
        assert_eq!(
            errors.get("name"),
            Some(&["The name field is required.".to_string()][..])
        );
        assert_eq!(
            errors.get("price"),
            Some(&["The price field is required.".to_string()][..])
        );
        assert!(errors.get("description").is_none());
    }

    #[test]
    fn negative_price_is_rejected_and_zero_accepted() {
        let errors = payload(json!({ "name": "Pen", "price": -1 }))
            .validate_create()
            .unwrap_err();
        assert_eq!(
            errors.get("price"),
            Some(&["The price field must be at least 0.".to_string()][..])
        );

        let ok = payload(json!({ "name": "Pen", "price": 0 }))
            .validate_create()
            .unwrap();
        assert_eq!(ok.price, Decimal::ZERO);
        assert_eq!(ok.description, None);
    }

    #[test]
    fn price_accepts_numeric_strings_and_rounds() {
        let ok = payload(json!({ "name": "Laptop", "price": " 1200.005 " }))
            .validate_create()
            .unwrap();
        assert_eq!(ok.price, Decimal::new(120001, 2));

        let ok = payload(json!({ "name": "Pen", "price": 0.125 }))
            .validate_create()
            .unwrap();
        assert_eq!(ok.price, Decimal::new(13, 2));

        let ok = payload(json!({ "name": "Laptop", "price": 799.99 }))
            .validate_create()
            .unwrap();
        assert_eq!(ok.price, Decimal::new(79999, 2));

        let ok = payload(json!({ "name": "Laptop", "price": "1e3" }))
            .validate_create()
            .unwrap();
        assert_eq!(ok.price, Decimal::new(1000, 0));
    }

    #[test]
    fn price_type_errors() {
        for bad in [json!("cheap"), json!(true), json!([1]), json!({ "amount": 1 })] {
            let errors = payload(json!({ "name": "Pen", "price": bad }))
                .validate_create()
                .unwrap_err();
            assert_eq!(
                errors.get("price"),
                Some(&["The price field must be a number.".to_string()][..])
            );
        }
        let errors = payload(json!({ "name": "Pen", "price": "10000000000000" }))
            .validate_create()
            .unwrap_err();
        assert!(errors.get("price").is_some());
    }

    #[test]
    fn name_rules() {
        let errors = payload(json!({ "name": 42, "price": 1 }))
            .validate_create()
            .unwrap_err();
        assert_eq!(
            errors.get("name"),
            Some(&["The name field must be a string.".to_string()][..])
        );
        let errors = payload(json!({ "name": "x".repeat(256), "price": 1 }))
            .validate_create()
            .unwrap_err();
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn update_only_touches_supplied_fields() {
        let changes = payload(json!({ "description": "x" }))
            .validate_update()
            .unwrap();
        assert_eq!(
            changes,
            ProductChanges {
                name: None,
                description: Some(Some("x".into())),
                price: None,
            }
        );

        let changes = payload(json!({ "description": null })).validate_update().unwrap();
        assert_eq!(changes.description, Some(None));

        assert_eq!(
            payload(json!({})).validate_update().unwrap(),
            ProductChanges::default()
        );
    }

    #[test]
    fn update_validates_present_fields() {
        let errors = payload(json!({ "name": "", "price": -5, "description": 3 }))
            .validate_update()
            .unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("price").is_some());
        assert!(errors.get("description").is_some());

        let errors = payload(json!({ "name": null })).validate_update().unwrap_err();
        assert_eq!(
            errors.get("name"),
            Some(&["The name field is required.".to_string()][..])
        );
    }
}
