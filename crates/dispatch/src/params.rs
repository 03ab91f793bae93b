use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Parameters of a request, or fields of a response.
pub type Fields = Map<String, Value>;

/// Absent, `null` and `""` all count as "not given".
fn given<'a>(params: &'a Fields, name: &str) -> Option<&'a Value> {
    params.get(name).filter(|value| !matches!(value, Value::Null) && value.as_str() != Some(""))
}

/// Reads a required parameter.
pub fn required<T: DeserializeOwned>(params: &Fields, name: &str) -> Result<T> {
    match given(params, name) {
        Some(value) => T::deserialize(value).or_raise(|| ErrorKind::InvalidParameter(name.to_string())),
        None => exn::bail!(ErrorKind::MissingParameter(name.to_string())),
    }
}

/// Reads an optional parameter.
pub fn optional<T: DeserializeOwned>(params: &Fields, name: &str) -> Result<Option<T>> {
    given(params, name)
        .map(|value| T::deserialize(value).or_raise(|| ErrorKind::InvalidParameter(name.to_string())))
        .transpose()
}

/// Serializes a handler result into response fields.
///
/// Objects are merged into the response as-is; anything else is placed
/// under `payload`.
pub fn fields(value: impl Serialize) -> Result<Fields> {
    match serde_json::to_value(value).or_raise(|| ErrorKind::Encode)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Fields::new()),
        other => Ok(Fields::from_iter([("payload".to_string(), other)])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn params(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({ "filename": null }))]
    #[case(json!({ "filename": "" }))]
    fn test_required_missing(#[case] value: Value) {
        let err = required::<String>(&params(value), "filename").unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingParameter(name) if name == "filename"));
    }

    #[test]
    fn test_required_wrong_shape() {
        let err = required::<Vec<String>>(&params(json!({ "records": "nope" })), "records").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidParameter(_)));
    }

    #[test]
    fn test_optional() {
        let params = params(json!({ "filesize": 10, "filepath": "" }));
        assert_eq!(optional::<u64>(&params, "filesize").unwrap(), Some(10));
        assert_eq!(optional::<String>(&params, "filepath").unwrap(), None);
        assert_eq!(optional::<String>(&params, "dir").unwrap(), None);
    }

    #[test]
    fn test_fields_wraps_non_objects() {
        assert_eq!(fields(vec![1, 2]).unwrap(), params(json!({ "payload": [1, 2] })));
        assert_eq!(fields(json!({ "a": 1 })).unwrap(), params(json!({ "a": 1 })));
        assert!(fields(()).unwrap().is_empty());
    }
}
