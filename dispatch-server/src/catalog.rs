//! In-process catalog registry
//!
//! The catalog is an external collaborator: this service holds read-only
//! product snapshots (and seller pickup points) pushed in by whatever owns
//! the catalog. The engine never mutates descriptive product data; stock
//! counters live in the inventory ledger, not here.

use dashmap::DashMap;
use shared::{Address, ProductSnapshot};

/// Concurrent product snapshot registry
#[derive(Debug, Default)]
pub struct CatalogService {
    products: DashMap<String, ProductSnapshot>,
    seller_addresses: DashMap<String, Address>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or refresh a product snapshot
    pub fn upsert_product(&self, product: ProductSnapshot) {
        self.products.insert(product.product_id.clone(), product);
    }

    /// Register a seller's pickup address
    pub fn set_seller_address(&self, seller_id: impl Into<String>, address: Address) {
        self.seller_addresses.insert(seller_id.into(), address);
    }

    pub fn get_product(&self, product_id: &str) -> Option<ProductSnapshot> {
        self.products.get(product_id).map(|entry| entry.clone())
    }

    pub fn seller_address(&self, seller_id: &str) -> Option<Address> {
        self.seller_addresses.get(seller_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_and_get() {
        let catalog = CatalogService::new();
        assert!(catalog.is_empty());

        catalog.upsert_product(ProductSnapshot {
            product_id: "p1".to_string(),
            seller_id: "s1".to_string(),
            name: "Widget".to_string(),
            price: 100.0,
            discount: 0.0,
        });

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get_product("p1").unwrap().name, "Widget");
        assert!(catalog.get_product("p2").is_none());
    }
}
