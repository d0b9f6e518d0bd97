//! Table-wise merge of TOML values used while layering configuration
//! sources on top of the embedded defaults.

/// Recursively merge `overlay` into `base`, overwriting scalars and
/// concatenating nothing — later layers always win on a per-key basis.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_table.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_wins_on_leaf_conflict() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\nx = 9\n").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(9));
        assert_eq!(base["a"]["y"].as_integer(), Some(2));
    }

    #[test]
    fn overlay_adds_new_tables() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\n").unwrap();
        let overlay: toml::Value = toml::from_str("[b]\nz = 1\n").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["b"]["z"].as_integer(), Some(1));
    }
}
