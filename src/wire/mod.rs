//! Envelope parsing (spec §4.A): splits a raw `//OK[...]` / `//EX[...]` response
//! body into the string table and the data stack the rest of the decoder reads.

pub mod stack;

use serde_json::Value;

use crate::error::DecodeError;

#[derive(Debug)]
pub struct Envelope {
    pub stack: Vec<Value>,
    pub strings: Vec<String>,
}

impl Envelope {
    pub fn parse(raw: &str) -> Result<Envelope, DecodeError> {
        let raw = raw.trim();

        if let Some(body) = raw.strip_prefix("//EX") {
            return Err(DecodeError::RemoteException { body: body.trim().to_string() });
        }

        let body = raw.strip_prefix("//OK").ok_or(DecodeError::Envelope)?;
        let value: Value = serde_json::from_str(body.trim()).map_err(|_| DecodeError::Envelope)?;
        let mut items = match value {
            Value::Array(items) => items,
            _ => return Err(DecodeError::Envelope),
        };

        // Last 3 elements: [string table, flags, protocol version].
        if items.len() < 3 {
            return Err(DecodeError::Envelope);
        }
        items.pop(); // protocol version
        items.pop(); // flags
        let strings = match items.pop() {
            Some(Value::Array(entries)) => {
                entries.into_iter().map(|v| v.as_str().map(str::to_owned).unwrap_or_default()).collect()
            }
            _ => return Err(DecodeError::Envelope),
        };

        Ok(Envelope { stack: items, strings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_envelope() {
        let envelope = Envelope::parse(r#"//OK[[],0,7]"#).unwrap();
        assert!(envelope.stack.is_empty());
        assert!(envelope.strings.is_empty());
    }

    #[test]
    fn splits_stack_from_string_table() {
        let envelope = Envelope::parse(r#"//OK[1,2,["a","b"],0,7]"#).unwrap();
        assert_eq!(envelope.stack, vec![Value::from(1), Value::from(2)]);
        assert_eq!(envelope.strings, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn exception_envelope_is_an_error() {
        let err = Envelope::parse(r#"//EX["boom"]"#).unwrap_err();
        assert!(matches!(err, DecodeError::RemoteException { .. }));
    }

    #[test]
    fn unrecognized_prefix_is_an_error() {
        let err = Envelope::parse("garbage").unwrap_err();
        assert!(matches!(err, DecodeError::Envelope));
    }
}
