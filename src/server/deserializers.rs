use serde::{Deserialize, Deserializer};
use serde_json::Value;

// `?page=abc` falls back to the default page instead of rejecting the request
pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.trim().parse::<i64>().ok()))
}

/// Ids and difficulties come from `<select>` values, so a numeric string is as good as
/// a number. Anything else, including `null` and `""`, is `None`.
pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "deserialize_optional_id")]
        id: Option<i64>,
    }

    fn id_of(value: serde_json::Value) -> Option<i64> {
        serde_json::from_value::<Body>(value).unwrap().id
    }

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(id_of(json!({"id": 3})), Some(3));
        assert_eq!(id_of(json!({"id": " 4 "})), Some(4));
    }

    #[test]
    fn ids_reject_everything_else() {
        assert_eq!(id_of(json!({})), None);
        assert_eq!(id_of(json!({"id": null})), None);
        assert_eq!(id_of(json!({"id": ""})), None);
        assert_eq!(id_of(json!({"id": 2.5})), None);
        assert_eq!(id_of(json!({"id": [1]})), None);
    }
}
