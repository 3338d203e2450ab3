/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse an optional positive limit. `0`, `none`, `off` and `false` mean "no limit" and yield `Ok(None)`.
pub fn parse_optional_limit(value: &str) -> Result<Option<i64>, String> {
    let value = value.trim().to_ascii_lowercase();
    if ["0", "none", "off", "false"].contains(&value.as_str()) {
        return Ok(None);
    }
    match value.parse::<i64>() {
        Ok(v) if v > 0 => Ok(Some(v)),
        Ok(v) => Err(format!("{v} is not a positive number")),
        Err(e) => Err(format!("{value} is not a number. {e}")),
    }
}
