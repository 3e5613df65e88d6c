//! Type-coercing equality over field values.
//!
//! Form hosts compare submitted values loosely: the string `"1"` equals the
//! integer `1`, `null` equals the empty string, and booleans compare by
//! truthiness. The diff engine must agree with the host, otherwise every save
//! would log spurious changes for values that only changed representation.

use serde_json::{Map, Number, Value};

/// Whether a string is a numeric literal (`"12"`, `" -1.5"`, `"3e2"`, `".5"`).
///
/// Surrounding whitespace is allowed; hex, `inf` and `nan` are not numeric.
pub fn is_numeric(s: &str) -> bool {
    parse_numeric(s).is_some()
}

/// Parse a numeric string into a float, or `None` if it is not numeric.
pub(crate) fn parse_numeric(s: &str) -> Option<f64> {
    let t = s.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'));
    let b = t.as_bytes();
    let mut i = 0;

    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits + frac_digits == 0 {
        return None;
    }

    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        i += 1;
        if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    if i != b.len() {
        return None;
    }

    t.parse::<f64>().ok()
}

/// Truthiness of a value.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn numbers_eq(x: &Number, y: &Number) -> bool {
    if let (Some(i), Some(j)) = (x.as_i64(), y.as_i64()) {
        return i == j;
    }
    if let (Some(i), Some(j)) = (x.as_u64(), y.as_u64()) {
        return i == j;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn objects_eq(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(k, v)| b.get(k).map_or(false, |other| loose_eq(v, other)))
}

fn list_object_eq(list: &[Value], obj: &Map<String, Value>) -> bool {
    list.len() == obj.len()
        && list.iter().enumerate().all(|(i, v)| {
            obj.get(&i.to_string())
                .map_or(false, |other| loose_eq(v, other))
        })
}

/// Loose (type-coercing) equality.
///
/// Symmetric: `loose_eq(a, b) == loose_eq(b, a)` for all inputs.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), other) | (other, Value::Bool(x)) => *x == truthy(other),
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Null, other) | (other, Value::Null) => !truthy(other),
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (parse_numeric(s), n.as_f64()) {
                (Some(parsed), Some(f)) => parsed == f,
                _ => false,
            }
        }
        (Value::String(x), Value::String(y)) => match (parse_numeric(x), parse_numeric(y)) {
            (Some(a), Some(b)) => a == b,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => objects_eq(x, y),
        (Value::Array(list), Value::Object(obj)) | (Value::Object(obj), Value::Array(list)) => {
            list_object_eq(list, obj)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_strings() {
        for s in ["1", "-1", "+3", "1.5", ".5", "5.", "1e3", "1E-2", " 42", "42 ", "007"] {
            assert!(is_numeric(s), "{s:?} should be numeric");
        }
        for s in ["", " ", "abc", "1a", "0x1A", "inf", "NaN", "1e", "--1", ".", "1 2"] {
            assert!(!is_numeric(s), "{s:?} should not be numeric");
        }
    }

    #[test]
    fn test_number_string_coercion() {
        assert!(loose_eq(&json!("1"), &json!(1)));
        assert!(loose_eq(&json!(1), &json!("1.0")));
        assert!(loose_eq(&json!("1e3"), &json!("1000")));
        assert!(loose_eq(&json!("01"), &json!("1")));
        assert!(!loose_eq(&json!("1abc"), &json!(1)));
        assert!(!loose_eq(&json!("abc"), &json!(0)));
    }

    #[test]
    fn test_null_and_bool() {
        assert!(loose_eq(&json!(null), &json!("")));
        assert!(!loose_eq(&json!(null), &json!("0")));
        assert!(loose_eq(&json!(null), &json!(0)));
        assert!(loose_eq(&json!(null), &json!([])));
        assert!(loose_eq(&json!(false), &json!("0")));
        assert!(loose_eq(&json!(true), &json!("yes")));
        assert!(!loose_eq(&json!(true), &json!("")));
    }

    #[test]
    fn test_structured_values() {
        assert!(loose_eq(&json!(["1", 2]), &json!([1, "2"])));
        assert!(!loose_eq(&json!([1, 2]), &json!([1, 2, 3])));
        assert!(loose_eq(&json!({"a": "1"}), &json!({"a": 1})));
        assert!(!loose_eq(&json!({"a": 1}), &json!({"b": 1})));
        assert!(loose_eq(&json!(["x", "y"]), &json!({"0": "x", "1": "y"})));
        assert!(!loose_eq(&json!([1]), &json!(1)));
    }
}
