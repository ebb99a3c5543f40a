use rhai::{Array, Dynamic, Map};
use serde_json::Value;
use swarmgate_core::{Error, GuardConfig, Result};

/// Bind a JSON value as a rhai constant, enforcing the sandbox's string,
/// array and map limits on the data itself. Oversized values are rejected
/// before any expression runs.
///
/// Integers that fit `i64` stay integers so guards can compare them with
/// integer literals; other numbers become floats.
pub fn json_to_dynamic(value: &Value, limits: &GuardConfig) -> Result<Dynamic> {
    convert(value, limits, "$")
}

fn convert(value: &Value, limits: &GuardConfig, path: &str) -> Result<Dynamic> {
    let dynamic = match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Dynamic::from(i),
            (None, Some(f)) => Dynamic::from(f),
            (None, None) => Dynamic::from(n.to_string()),
        },
        Value::String(s) => {
            check_size(path, "string", s.len(), limits.max_string_size)?;
            Dynamic::from(s.clone())
        }
        Value::Array(items) => {
            check_size(path, "array", items.len(), limits.max_array_size)?;
            let array = items
                .iter()
                .enumerate()
                .map(|(i, item)| convert(item, limits, &format!("{}[{}]", path, i)))
                .collect::<Result<Array>>()?;
            Dynamic::from(array)
        }
        Value::Object(fields) => {
            check_size(path, "map", fields.len(), limits.max_map_size)?;
            let mut map = Map::new();
            for (key, field) in fields {
                let field = convert(field, limits, &format!("{}.{}", path, key))?;
                map.insert(key.as_str().into(), field);
            }
            Dynamic::from(map)
        }
    };
    Ok(dynamic)
}

fn check_size(path: &str, kind: &str, size: usize, max: usize) -> Result<()> {
    // rhai treats a zero limit as unlimited
    if max > 0 && size > max {
        return Err(Error::Guard(format!(
            "{} at {} has size {}, limit is {}",
            kind, path, size, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_object() {
        let value = json!({"data": {"count": 3, "ratio": 0.5, "tags": ["a"]}});
        let dynamic = json_to_dynamic(&value, &GuardConfig::default()).unwrap();
        let map = dynamic.try_cast::<Map>().unwrap();
        let data = map.get("data").unwrap().clone().try_cast::<Map>().unwrap();
        assert_eq!(data.get("count").unwrap().as_int().unwrap(), 3);
        assert_eq!(data.get("ratio").unwrap().as_float().unwrap(), 0.5);
        assert!(data.get("tags").unwrap().is::<Array>());
        assert!(json_to_dynamic(&Value::Null, &GuardConfig::default())
            .unwrap()
            .is_unit());
    }

    #[test]
    fn test_oversized_values_name_their_path() {
        let limits = GuardConfig {
            max_string_size: 4,
            max_array_size: 2,
            ..GuardConfig::default()
        };

        let err = json_to_dynamic(&json!({"data": {"text": "hello"}}), &limits).unwrap_err();
        assert!(matches!(err, Error::Guard(_)));
        assert!(err.to_string().contains("$.data.text"));

        let err = json_to_dynamic(&json!({"tags": ["a", "b", "c"]}), &limits).unwrap_err();
        assert!(err.to_string().contains("array at $.tags"));

        assert!(json_to_dynamic(&json!({"tags": ["ab", "cd"]}), &limits).is_ok());
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let limits = GuardConfig {
            max_map_size: 0,
            ..GuardConfig::default()
        };
        let wide: serde_json::Map<String, Value> =
            (0..2_000).map(|i| (format!("k{}", i), json!(i))).collect();
        assert!(json_to_dynamic(&Value::Object(wide), &limits).is_ok());
    }
}
