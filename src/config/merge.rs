// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Deep merge of settings tables
//!
//! - Tables: merged key by key (recursive), overlay wins on conflict
//! - Arrays: replaced wholesale, never concatenated
//! - Scalars: overlay wins
//!
//! Keys keep the position they had in the base table; keys new in the
//! overlay are appended in overlay order.

use toml::{Table, Value};

/// Deep merge two values, `overlay` taking precedence
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => Value::Table(merge_tables(base, overlay)),
        (_, overlay) => overlay,
    }
}

/// Deep merge two tables, `overlay` taking precedence
pub fn merge_tables(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => {
                let current = std::mem::replace(existing, Value::Boolean(false));
                *existing = deep_merge(current, overlay_value);
            }
            None => {
                base.insert(key, overlay_value);
            }
        }
    }
    base
}

/// Merge layers in order, first is least derived
pub fn merge_layers(layers: impl IntoIterator<Item = Table>) -> Table {
    layers.into_iter().fold(Table::new(), merge_tables)
}

/// Copy of `table` without the given keys, order preserved
pub fn without_keys(table: Table, keys: &[&str]) -> Table {
    table
        .into_iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .collect()
}
