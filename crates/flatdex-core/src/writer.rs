use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use flatdex_model::RegistryModel;
use flatdex_utils::fs::atomic_write;

use crate::error::Result;

/// Encodes a value as JSON with sorted object keys and 4-space indentation,
/// so snapshots diff cleanly between runs.
pub(crate) fn to_sorted_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    // Round-tripping through Value sorts the keys: its objects are
    // BTreeMap-backed.
    let value = serde_json::to_value(value)?;

    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    Ok(buf)
}

/// Writes a registry snapshot, leaving the file untouched (modification time
/// included) when the content is unchanged. Returns whether the file was
/// replaced.
pub fn write_snapshot(model: &RegistryModel, path: &Path) -> Result<bool> {
    let content = to_sorted_pretty(model)?;
    let changed = atomic_write(path, &content)?;

    if changed {
        info!("Wrote {}", path.display());
    } else {
        info!("{} is unchanged", path.display());
    }

    Ok(changed)
}
