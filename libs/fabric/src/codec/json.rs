use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{Error, Result};

/// JSON codec, UTF-8 on the wire
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn encodes_as_utf8_json() {
        let bytes = JsonCodec.encode(&json!({"response": "OK"})).unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), r#"{"response":"OK"}"#);
    }

    #[test]
    fn preserves_value_types() {
        let value = json!({
            "seq": 12,
            "ratio": -0.5,
            "label": "touch",
            "active": false,
            "nested": {"list": [1, "two", [3.25], null]},
        });
        let decoded: Value = JsonCodec.decode(&JsonCodec.encode(&value).unwrap()).unwrap();
        assert_eq!(decoded, value);
        assert!(decoded["seq"].is_u64());
        assert!(decoded["ratio"].is_f64());
    }

    #[test]
    fn malformed_payload_is_codec_error() {
        let result: Result<Value> = JsonCodec.decode(b"{\"test\": ");
        assert!(matches!(result, Err(Error::Codec(_))));

        let result: Result<Value> = JsonCodec.decode(&[0xff, 0xfe]);
        assert!(matches!(result, Err(Error::Codec(_))));
    }
}
