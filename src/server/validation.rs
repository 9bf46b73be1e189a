use crate::server::response::ApiError;

const MAX_USERNAME_LEN: usize = 64;
const MAX_CENTER_CODE_LEN: usize = 32;
const MAX_DISPLAY_NAME_LEN: usize = 200;
const MAX_UNIT_LEN: usize = 20;

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_name(
    name: &str,
    entity: &str,
    max_len: usize,
    allow_period: bool,
) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{entity} cannot be empty"));
    }
    if name.len() > max_len {
        return Err(format!("{entity} cannot exceed {max_len} characters"));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(format!("{entity} can only contain {allowed}"));
    }
    if name.starts_with('-') || name.starts_with('_') {
        return Err(format!("{entity} cannot start with a hyphen or underscore"));
    }
    Ok(())
}

pub fn validate_username(name: &str) -> Result<(), String> {
    validate_name(name, "Username", MAX_USERNAME_LEN, true)
}

pub fn validate_center_code(code: &str) -> Result<(), ApiError> {
    validate_name(code, "Center code", MAX_CENTER_CODE_LEN, false).map_err(ApiError::bad_request)
}

/// Free-text names (items, centers): trimmed, non-empty, bounded.
pub fn validate_display_name(name: &str, entity: &str) -> Result<(), ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request(format!("{entity} name cannot be empty")));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "{entity} name cannot exceed {MAX_DISPLAY_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_quantity(quantity: f64) -> Result<(), ApiError> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(ApiError::bad_request("Quantity must be a non-negative number"));
    }
    Ok(())
}

pub fn validate_unit(unit: &str) -> Result<(), ApiError> {
    let unit = unit.trim();
    if unit.is_empty() || unit.len() > MAX_UNIT_LEN {
        return Err(ApiError::bad_request(format!(
            "Unit must be 1 to {MAX_UNIT_LEN} characters"
        )));
    }
    Ok(())
}
