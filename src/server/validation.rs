use crate::server::response::ApiError;

const MAX_PRODUCT_NAME_LEN: usize = 255;
const MAX_TAG_NAME_LEN: usize = 100;

fn validate_name(name: &str, entity: &str, max_len: usize) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation(format!(
            "{entity} name cannot be empty"
        )));
    }
    if name.len() > max_len {
        return Err(ApiError::validation(format!(
            "{entity} name cannot exceed {max_len} characters"
        )));
    }
    Ok(())
}

pub fn validate_product_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Product", MAX_PRODUCT_NAME_LEN)
}

pub fn validate_tag_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Tag", MAX_TAG_NAME_LEN)
}

/// Validates a price and normalizes it to two fraction digits.
pub fn normalize_price(price: f64) -> Result<f64, ApiError> {
    if !price.is_finite() {
        return Err(ApiError::validation("Price must be a number"));
    }
    if price < 0.0 {
        return Err(ApiError::validation("Price cannot be negative"));
    }
    Ok((price * 100.0).round() / 100.0)
}

pub fn validate_initial_stock(initial_stock: i64) -> Result<(), ApiError> {
    if initial_stock < 0 {
        return Err(ApiError::validation("Initial stock cannot be negative"));
    }
    Ok(())
}
