use serde_json::Value;

/// Normalize a scraped price into whole currency units.
///
/// Accepts JSON numbers and strings such as `"1290"`, `"$1.290"`, `"1,290"` or
/// `"$12.990,50"`. Both `.` and `,` are read as thousands separators, except a
/// final separator followed by one or two digits, which marks cents and is
/// dropped. Anything that does not reduce to a non-negative integer yields 0.
pub fn normalize_price(value: &Value) -> u64 {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                v
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 => f.trunc() as u64,
                    _ => 0,
                }
            }
        }
        Value::String(s) => parse_price_str(s),
        _ => 0,
    }
}

pub fn parse_price_str(raw: &str) -> u64 {
    let text: String = raw.chars().filter(|c| *c != '$').collect();
    let text = text.trim();

    let whole = match text.rfind(['.', ',']) {
        Some(pos) => {
            let fraction = &text[pos + 1..];
            if (1..=2).contains(&fraction.len())
                && fraction.chars().all(|c| c.is_ascii_digit())
            {
                &text[..pos]
            } else {
                text
            }
        }
        None => text,
    };

    let digits: String = whole.chars().filter(|c| *c != '.' && *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return 0;
    }
    digits.parse().unwrap_or(0)
}
