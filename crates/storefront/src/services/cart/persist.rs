//! Write-through mirror of the cart in the durable store.
//!
//! The slot holds `{"version": 1, "items": [...]}`. Anything else found in
//! the slot is dropped and the cart starts empty.

use serde::{Deserialize, Serialize};

use timberline_core::CartLineItem;

use crate::models::storage_keys;
use crate::storage::KeyValueStore;

/// Current layout of the persisted cart.
const VERSION: u32 = 1;

#[derive(Serialize)]
struct PersistedCartRef<'a> {
    version: u32,
    items: &'a [CartLineItem],
}

#[derive(Deserialize)]
struct PersistedCart {
    version: u32,
    items: Vec<CartLineItem>,
}

/// Read the persisted lines.
///
/// Malformed or unknown-version data clears the slot and yields an empty
/// list. Read failures yield an empty list and keep the slot.
pub(super) fn load(store: &dyn KeyValueStore) -> Vec<CartLineItem> {
    let raw = match store.get(storage_keys::CART) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted cart, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<PersistedCart>(&raw) {
        Ok(cart) if cart.version == VERSION => cart.items,
        Ok(cart) => {
            tracing::warn!(version = cart.version, "Unsupported persisted cart version, discarding");
            discard(store);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed persisted cart, discarding");
            discard(store);
            Vec::new()
        }
    }
}

/// Mirror `items` into the durable store. Failures are logged only.
pub(super) fn save(store: &dyn KeyValueStore, items: &[CartLineItem]) {
    let payload = PersistedCartRef {
        version: VERSION,
        items,
    };
    let result = serde_json::to_string(&payload)
        .map_err(|e| e.to_string())
        .and_then(|json| {
            store
                .set(storage_keys::CART, &json)
                .map_err(|e| e.to_string())
        });
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to persist cart");
    }
}

fn discard(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(storage_keys::CART) {
        tracing::warn!(error = %e, "Failed to remove malformed cart slot");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use timberline_core::{CartProduct, Price, ProductId, Quantity};

    use super::*;
    use crate::storage::MemoryStore;

    fn line(id: &str, qty: u32) -> CartLineItem {
        CartLineItem::new(
            CartProduct {
                id: ProductId::parse(id).unwrap(),
                name: format!("Item {id}"),
                unit_price: Price::parse("12.50").unwrap(),
                image: None,
            },
            Quantity::new(qty).unwrap(),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let items = vec![line("chair", 2), line("desk", 1)];
        save(&store, &items);

        let raw = store.get(storage_keys::CART).unwrap().unwrap();
        assert!(raw.starts_with(r#"{"version":1,"#));
        assert_eq!(load(&store), items);
    }

    #[test]
    fn test_empty_slot_loads_empty() {
        assert!(load(&MemoryStore::new()).is_empty());
    }

    #[test]
    fn test_malformed_slot_is_discarded() {
        let store = MemoryStore::with_slots([(storage_keys::CART, "{not json")]);
        assert!(load(&store).is_empty());
        assert_eq!(store.get(storage_keys::CART).unwrap(), None);
    }

    #[test]
    fn test_zero_quantity_line_is_malformed() {
        let store = MemoryStore::with_slots([(
            storage_keys::CART,
            r#"{"version":1,"items":[{"id":"a","name":"A","unit_price":"1","quantity":0,"added_at":"2025-01-01T00:00:00Z"}]}"#,
        )]);
        assert!(load(&store).is_empty());
        assert_eq!(store.get(storage_keys::CART).unwrap(), None);
    }

    #[test]
    fn test_unknown_version_is_discarded() {
        let store = MemoryStore::with_slots([(storage_keys::CART, r#"{"version":2,"items":[]}"#)]);
        assert!(load(&store).is_empty());
        assert_eq!(store.get(storage_keys::CART).unwrap(), None);
    }
}
