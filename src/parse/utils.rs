/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Remove every `"` from a field, wherever it sits.
pub fn strip_quotes(raw: &str) -> String {
    raw.replace('"', "")
}

/// Lenient integer read: `"076"` → 76, `"100.0"` → 100, anything else → None.
pub fn coerce_int(raw: &str) -> Option<i64> {
    let s = strip_quotes(raw);
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Lenient float read; NaN and infinities count as unreadable.
pub fn coerce_float(raw: &str) -> Option<f64> {
    let s = strip_quotes(raw);
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decode file bytes as UTF-8, falling back to Latin-1 for legacy exports.
/// The flag is true when the fallback was used.
pub fn decode_bytes(bytes: &[u8]) -> (String, bool) {
    let (text, latin1) = match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), true),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => (rest.to_string(), latin1),
        None => (text, latin1),
    }
}
