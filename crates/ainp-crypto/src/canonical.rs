use serde_json::Value;

/// Serialize a JSON value into deterministic canonical bytes.
///
/// Rules: object keys are sorted lexicographically by their UTF-8 bytes,
/// there is no insignificant whitespace, numbers are printed in their
/// shortest decimal form, and arrays keep the order given. This is what
/// `sign`/`verify` operate over so two implementations agree byte-for-byte.
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => out.extend_from_slice(canonical_number(n).as_bytes()),
        Value::String(s) => write_canonical_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical_string(key, out);
                out.push(b':');
                write_canonical(&map[*key], out);
            }
            out.push(b'}');
        }
    }
}

/// Shortest round-tripping decimal form: integers with no trailing `.0`,
/// floats via their minimal `serde_json` representation.
fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    n.to_string()
}

fn write_canonical_string(s: &str, out: &mut Vec<u8>) {
    // serde_json's string escaping already matches the minimal-escape JSON
    // grammar we need; reuse it rather than hand-roll escaping rules.
    let escaped = serde_json::to_string(s).expect("string always serializes");
    out.extend_from_slice(escaped.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys() {
        let v = json!({"b": 1, "a": 2});
        assert_eq!(canonicalize(&v), b"{\"a\":2,\"b\":1}");
    }

    #[test]
    fn preserves_array_order() {
        let v = json!([3, 1, 2]);
        assert_eq!(canonicalize(&v), b"[3,1,2]");
    }

    #[test]
    fn no_whitespace() {
        let v = json!({"x": [1, 2], "y": "z"});
        let bytes = canonicalize(&v);
        assert!(!bytes.contains(&b' '));
        assert!(!bytes.contains(&b'\n'));
    }

    #[test]
    fn nested_objects_sort_recursively() {
        let v = json!({"outer": {"z": 1, "a": 2}});
        assert_eq!(canonicalize(&v), b"{\"outer\":{\"a\":2,\"z\":1}}");
    }

    #[test]
    fn identical_values_canonicalize_identically() {
        let v1 = json!({"a": 1, "b": [true, null, "x"]});
        let v2 = json!({"b": [true, null, "x"], "a": 1});
        assert_eq!(canonicalize(&v1), canonicalize(&v2));
    }
}
