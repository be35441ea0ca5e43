use serde_yaml::Value;

use crate::types::Document;

/// Deep-merge `overlay` on top of `base`.
/// If both sides hold a mapping for the same key, recurse.
/// Otherwise, `overlay`'s value wins, including `null` and sequences.
/// Keys only present in `base` are kept, in their original position.
pub fn deep_merge(mut base: Document, overlay: Document) -> Document {
    merge_into(&mut base, overlay);
    base
}

/// In-place form of [`deep_merge`].
pub fn merge_into(base: &mut Document, overlay: Document) {
    for (key, overlay_val) in overlay {
        match base.get_mut(&key) {
            Some(slot) => merge_value(slot, overlay_val),
            None => {
                base.insert(key, overlay_val);
            }
        }
    }
}

fn merge_value(slot: &mut Value, overlay: Value) {
    match overlay {
        Value::Mapping(overlay_map) if slot.is_mapping() => {
            if let Value::Mapping(base_map) = slot {
                merge_into(base_map, overlay_map);
            }
        }
        other => *slot = other,
    }
}
