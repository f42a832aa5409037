//! JSON body encoders
//!
//! The render helper hands the caller's data to a [`JsonEncoder`] as a
//! type-erased [`Serialize`] value, so it is streamed straight into the body
//! without an intermediate `serde_json::Value`. The default
//! [`CompactEncoder`] writes one line of JSON followed by a newline.

use erased_serde::Serialize;
use std::io::Write;

/// Writes a JSON value to a response body
pub trait JsonEncoder: Send + Sync {
    /// Serialize `value` into `out`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    fn encode(&self, out: &mut dyn Write, value: &dyn Serialize) -> serde_json::Result<()>;
}

impl<F> JsonEncoder for F
where
    F: Fn(&mut dyn Write, &dyn Serialize) -> serde_json::Result<()> + Send + Sync,
{
    fn encode(&self, out: &mut dyn Write, value: &dyn Serialize) -> serde_json::Result<()> {
        self(out, value)
    }
}

/// Compact single-line JSON terminated by a newline
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactEncoder;

impl JsonEncoder for CompactEncoder {
    fn encode(&self, out: &mut dyn Write, value: &dyn Serialize) -> serde_json::Result<()> {
        serde_json::to_writer(&mut *out, value)?;
        out.write_all(b"\n").map_err(serde_json::Error::io)
    }
}

/// Indented JSON terminated by a newline
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyEncoder;

impl JsonEncoder for PrettyEncoder {
    fn encode(&self, out: &mut dyn Write, value: &dyn Serialize) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(&mut *out, value)?;
        out.write_all(b"\n").map_err(serde_json::Error::io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_encoder() {
        let mut out = Vec::new();
        CompactEncoder
            .encode(&mut out, &json!({"id": 7, "tags": ["a"]}))
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"id\":7,\"tags\":[\"a\"]}\n");
    }

    #[test]
    fn test_pretty_encoder() {
        let mut out = Vec::new();
        PrettyEncoder.encode(&mut out, &json!({"id": 7})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"id\": 7\n}\n");
    }

    #[test]
    fn test_closure_encoder() {
        let encoder = |out: &mut dyn Write, value: &dyn Serialize| -> serde_json::Result<()> {
            out.write_all(b")]}',\n").map_err(serde_json::Error::io)?;
            serde_json::to_writer(out, value)
        };

        let mut out = Vec::new();
        encoder.encode(&mut out, &json!([1, 2])).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ")]}',\n[1,2]");
    }
}
