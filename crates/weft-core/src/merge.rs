use serde_json::Value;

/// Deep-merge `overlay` into `base`, returning the merged value.
///
/// Objects merge key by key, recursing into keys present on both
/// sides. Any other pairing overwrites: arrays, scalars, and
/// mismatched types take the overlay value wholesale.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                match merged.get(key) {
                    Some(existing) => {
                        let combined = deep_merge(existing, overlay_value);
                        merged.insert(key.clone(), combined);
                    }
                    None => {
                        merged.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}
