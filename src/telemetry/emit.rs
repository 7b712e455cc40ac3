use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

/// Envelope metadata; present only on timed apply results.
#[derive(Serialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

pub fn print_plan<T: Serialize>(op: &str, plan: &T, meta: Option<Meta>) -> Result<()> {
    write_envelope(op, false, "plan", plan, meta)
}

pub fn print_result<T: Serialize>(op: &str, result: &T, meta: Option<Meta>) -> Result<()> {
    write_envelope(op, true, "result", result, meta)
}

/// One `{"op", "apply", "plan"|"result", "meta"}` object per line on
/// stdout; this is the whole machine-readable surface of a run.
fn write_envelope<T: Serialize>(
    op: &str,
    apply: bool,
    key: &str,
    payload: &T,
    meta: Option<Meta>,
) -> Result<()> {
    let mut envelope = serde_json::Map::new();
    envelope.insert("op".to_string(), Value::from(op));
    envelope.insert("apply".to_string(), Value::from(apply));
    envelope.insert(key.to_string(), serde_json::to_value(payload)?);
    envelope.insert(
        "meta".to_string(),
        match meta {
            Some(meta) => serde_json::to_value(meta)?,
            None => Value::Null,
        },
    );

    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, &Value::Object(envelope))?;
    out.write_all(b"\n")?;
    Ok(())
}
