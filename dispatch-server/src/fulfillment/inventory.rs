//! Inventory ledger - reservation counters with non-negativity invariants
//!
//! The ledger owns the per-product `available`/`reserved` counters. A
//! reservation is a conditional update: the availability check and the
//! counter mutation happen inside the caller's write transaction, so two
//! concurrent checkouts can never both pass the check when combined
//! quantities exceed stock.

use redb::WriteTransaction;
use shared::StockRecord;

use super::storage::DispatchStorage;
use super::traits::DispatchError;

/// Reserve `qty` units of a product.
///
/// Fails with [`DispatchError::InsufficientStock`] when `available < qty`;
/// otherwise decrements `available`, increments `reserved`, and bumps the
/// product's monotonic `order_count` (popularity ranking, best effort).
pub fn reserve(
    storage: &DispatchStorage,
    txn: &WriteTransaction,
    product_id: &str,
    qty: i64,
) -> Result<(), DispatchError> {
    let mut stock = storage
        .get_stock_txn(txn, product_id)?
        .ok_or_else(|| DispatchError::ProductNotFound(product_id.to_string()))?;

    if stock.available < qty {
        return Err(DispatchError::InsufficientStock {
            product_id: product_id.to_string(),
            requested: qty,
            available: stock.available,
        });
    }

    stock.available -= qty;
    stock.reserved += qty;
    stock.order_count += 1;
    storage.put_stock(txn, product_id, &stock)?;

    tracing::debug!(
        product_id = %product_id,
        qty,
        available = stock.available,
        reserved = stock.reserved,
        "Stock reserved"
    );
    Ok(())
}

/// Release `qty` previously reserved units.
///
/// The reserved counter floors at zero; over-release is a logged anomaly,
/// never an error.
pub fn release(
    storage: &DispatchStorage,
    txn: &WriteTransaction,
    product_id: &str,
    qty: i64,
) -> Result<(), DispatchError> {
    let Some(mut stock) = storage.get_stock_txn(txn, product_id)? else {
        tracing::warn!(product_id = %product_id, qty, "Release for unknown product");
        return Ok(());
    };

    if stock.reserved < qty {
        tracing::warn!(
            product_id = %product_id,
            reserved = stock.reserved,
            qty,
            "Over-release detected, flooring reserved at zero"
        );
    }
    stock.reserved = (stock.reserved - qty).max(0);
    storage.put_stock(txn, product_id, &stock)?;
    Ok(())
}

/// Register or refresh a product's stock counters, preserving existing
/// reservations when the product is already known.
pub fn sync_stock(
    storage: &DispatchStorage,
    product_id: &str,
    available: i64,
) -> Result<(), DispatchError> {
    let record = match storage.get_stock(product_id)? {
        Some(mut existing) => {
            existing.available = available;
            existing
        }
        None => StockRecord::with_available(available),
    };
    storage.set_stock(product_id, &record)?;
    Ok(())
}
