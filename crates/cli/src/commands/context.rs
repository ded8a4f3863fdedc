//! `gymcoach context`: what the model would be told about the user.

use gymcoach_agent::{SnapshotBuilder, SnapshotRequest};
use std::path::Path;

pub async fn run(full: bool, data: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let store = super::load_store(data)?;

    let built = SnapshotBuilder::new(store)
        .build(SnapshotRequest::from_config(&config.context))
        .await;

    let fingerprint = built.snapshot.fingerprint();
    let mut out = serde_json::json!({
        "contract": built.contract,
        "fingerprint": fingerprint,
        "meta": built.meta,
    });
    if full {
        out["snapshot"] = built.snapshot.to_value();
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
