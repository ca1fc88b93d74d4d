//! Host buffer decoding.
//!
//! A chunk is JSON lines: every non-blank line is `[tag, time, record]`,
//! where `time` is epoch seconds (fractions are truncated) and `record` is an
//! object.

use serde_json::Value;

use crate::error::DecodeError;
use crate::types::{Batch, Event};

pub fn decode_batch(chunk: &[u8]) -> Result<Batch, DecodeError> {
    let mut batch = Batch::default();
    for (idx, raw) in chunk.split(|b| *b == b'\n').enumerate() {
        let line = idx + 1;
        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let value: Value =
            serde_json::from_slice(raw).map_err(|source| DecodeError::Json { line, source })?;
        batch.push(decode_event(value, line)?);
    }
    Ok(batch)
}

/// Encode a batch in the same line format, mainly for hosts and tests.
pub fn encode_batch(batch: &Batch) -> Vec<u8> {
    let mut out = Vec::new();
    for event in batch.events() {
        let line = serde_json::json!([event.tag, event.time, event.record]);
        out.extend_from_slice(line.to_string().as_bytes());
        out.push(b'\n');
    }
    out
}

fn decode_event(value: Value, line: usize) -> Result<Event, DecodeError> {
    let shape = |reason: &str| DecodeError::Shape {
        line,
        reason: reason.to_string(),
    };

    let Value::Array(items) = value else {
        return Err(shape("expected [tag, time, record]"));
    };
    let [tag, time, record]: [Value; 3] = items
        .try_into()
        .map_err(|_| shape("expected exactly three elements"))?;

    let Value::String(tag) = tag else {
        return Err(shape("tag must be a string"));
    };
    let time = match time {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| shape("time out of range"))?,
        _ => return Err(shape("time must be a number")),
    };
    let Value::Object(record) = record else {
        return Err(shape("record must be an object"));
    };

    Ok(Event::new(tag, time, record))
}
