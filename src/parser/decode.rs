use std::collections::BTreeSet;

use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::record::{Dataset, Record, Scalar};

/// Parse repaired JSON text into a dataset.
pub fn decode(json: &str) -> Result<Dataset> {
    let value: Value = serde_json::from_str(json)?;
    decode_value(value)
}

/// Convert an already-parsed JSON array of flat objects.
pub fn decode_value(value: Value) -> Result<Dataset> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::Shape(format!(
                "expected an array of records, got {}",
                kind(&other)
            )))
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| to_record(i, item))
        .collect::<Result<Vec<_>>>()?;

    warn_if_heterogeneous(&records);
    Ok(Dataset::new(records))
}

fn to_record(index: usize, item: Value) -> Result<Record> {
    let map = match item {
        Value::Object(map) => map,
        other => {
            return Err(Error::Shape(format!(
                "record {} is {}, expected an object",
                index,
                kind(&other)
            )))
        }
    };

    let mut fields = Vec::with_capacity(map.len());
    for (key, value) in map {
        let scalar = match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(b),
            Value::Number(n) => match n.as_f64() {
                Some(f) => Scalar::Number(f),
                None => return Err(Error::NotNumeric { record: index, field: key }),
            },
            Value::String(s) => Scalar::Text(s),
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::NonScalar { record: index, field: key })
            }
        };
        fields.push((key, scalar));
    }
    Ok(Record::new(fields))
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn warn_if_heterogeneous(records: &[Record]) {
    let Some(first) = records.first() else {
        return;
    };
    let expected: BTreeSet<&str> = first.field_names().collect();
    if let Some(i) = records
        .iter()
        .position(|r| r.field_names().collect::<BTreeSet<_>>() != expected)
    {
        warn!(record = i, "field set differs from the first record in this batch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_record_and_field_order() {
        let ds = decode(r#"[{"z":1,"a":"x"},{"z":2,"a":"y"}]"#).unwrap();
        assert_eq!(ds.len(), 2);
        let names: Vec<&str> = ds.records()[0].field_names().collect();
        assert_eq!(names, ["z", "a"]);
        assert_eq!(ds.records()[1].get("z"), Some(&Scalar::Number(2.0)));
    }

    #[test]
    fn scalar_kinds() {
        let ds = decode(r#"[{"s":"a","n":1.5,"b":true,"x":null}]"#).unwrap();
        let r = &ds.records()[0];
        assert_eq!(r.get("s"), Some(&Scalar::Text("a".into())));
        assert_eq!(r.get("n"), Some(&Scalar::Number(1.5)));
        assert_eq!(r.get("b"), Some(&Scalar::Bool(true)));
        assert_eq!(r.get("x"), Some(&Scalar::Null));
    }

    #[test]
    fn syntax_error_is_decode_error() {
        let err = decode("[{\"a\": 1,}]").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn nested_value_rejected() {
        let err = decode(r#"[{"a":[1,2]}]"#).unwrap_err();
        assert!(matches!(err, Error::NonScalar { record: 0, ref field } if field == "a"));
    }

    #[test]
    fn non_array_rejected() {
        assert!(matches!(decode(r#"{"a":1}"#).unwrap_err(), Error::Shape(_)));
        assert!(matches!(decode("[1]").unwrap_err(), Error::Shape(_)));
    }

    #[test]
    fn differing_field_sets_still_decode() {
        let ds = decode(r#"[{"a":1,"b":2},{"a":3},{"a":4,"c":"x"}]"#).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records()[1].field_names().collect::<Vec<_>>(), ["a"]);
        assert_eq!(ds.records()[2].get("c"), Some(&Scalar::Text("x".into())));
        assert!(!ds.has_field("b"));
    }

    #[test]
    fn empty_array_is_empty_dataset() {
        assert!(decode("[]").unwrap().is_empty());
    }
}
