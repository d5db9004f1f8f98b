//! Opaque document value handed out by the store.

use std::io;

use serde_json::Value;

use super::StoreError;

/// A JSON document. The gateway only serializes it, never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document(Value);

impl Document {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a document from JSON text.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Serialize into `writer`.
    pub fn write_json<W: io::Write>(&self, writer: W, pretty: bool) -> Result<(), StoreError> {
        if pretty {
            serde_json::to_writer_pretty(writer, &self.0)?;
        } else {
            serde_json::to_writer(writer, &self.0)?;
        }
        Ok(())
    }

    pub fn to_json(&self, pretty: bool) -> Result<Vec<u8>, StoreError> {
        let mut out = Vec::new();
        self.write_json(&mut out, pretty)?;
        Ok(out)
    }

    /// Length of the serialized form, computed without building it.
    pub fn json_byte_count(&self, pretty: bool) -> Result<usize, StoreError> {
        let mut counter = ByteCounter::default();
        self.write_json(&mut counter, pretty)?;
        Ok(counter.0)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[derive(Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
