use serde::{Deserialize, Serialize};

use stockflow_core::{ProductId, WorkflowError, WorkflowResult};

/// An inventory product and its authoritative stock count.
///
/// `version` is the optimistic-concurrency stamp: the store bumps it on every
/// committed mutation and rejects commits whose expected version is stale.
/// Domain methods never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub version: u64,
}

impl Product {
    /// Create a new product. Name must be non-empty, quantity non-negative.
    pub fn new(id: ProductId, name: impl Into<String>, quantity: i64) -> WorkflowResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WorkflowError::validation("product name cannot be empty"));
        }
        if quantity < 0 {
            return Err(WorkflowError::validation(
                "initial quantity cannot be negative",
            ));
        }
        Ok(Self {
            id,
            name,
            quantity,
            version: 0,
        })
    }

    /// Reserve `qty` units: the stock decrement performed at request
    /// submission time, before approval.
    pub fn reserve(&mut self, qty: i64) -> WorkflowResult<()> {
        if qty <= 0 {
            return Err(WorkflowError::validation("quantity must be positive"));
        }
        if qty > self.quantity {
            return Err(WorkflowError::insufficient_stock(qty, self.quantity));
        }
        self.quantity -= qty;
        Ok(())
    }

    /// Return `qty` previously reserved units to stock.
    ///
    /// No upper bound is enforced; products have no stock ceiling, so
    /// repeated releases can inflate the count without limit.
    pub fn release(&mut self, qty: i64) -> WorkflowResult<()> {
        if qty <= 0 {
            return Err(WorkflowError::validation("quantity must be positive"));
        }
        self.quantity += qty;
        Ok(())
    }

    /// Administrative override of the stock count, unconstrained by the
    /// request workflow.
    pub fn set_quantity(&mut self, new_quantity: i64) -> WorkflowResult<()> {
        if new_quantity < 0 {
            return Err(WorkflowError::validation("quantity cannot be negative"));
        }
        self.quantity = new_quantity;
        Ok(())
    }

    /// Administrative rename.
    pub fn rename(&mut self, name: impl Into<String>) -> WorkflowResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WorkflowError::validation("product name cannot be empty"));
        }
        self.name = name;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64) -> Product {
        Product::new(ProductId::new(), "cilindro 20lb", quantity).unwrap()
    }

    #[test]
    fn new_rejects_empty_name() {
        let err = Product::new(ProductId::new(), "  ", 5).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn new_rejects_negative_quantity() {
        let err = Product::new(ProductId::new(), "cilindro", -1).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn reserve_decrements_stock() {
        let mut p = product(10);
        p.reserve(4).unwrap();
        assert_eq!(p.quantity, 6);
    }

    #[test]
    fn reserve_exact_stock_drains_to_zero() {
        let mut p = product(10);
        p.reserve(10).unwrap();
        assert_eq!(p.quantity, 0);
    }

    #[test]
    fn reserve_beyond_stock_fails_and_leaves_quantity_unchanged() {
        let mut p = product(10);
        let err = p.reserve(20).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InsufficientStock {
                requested: 20,
                available: 10
            }
        );
        assert_eq!(p.quantity, 10);
    }

    #[test]
    fn reserve_rejects_non_positive_quantity() {
        let mut p = product(10);
        assert!(matches!(
            p.reserve(0).unwrap_err(),
            WorkflowError::Validation(_)
        ));
        assert!(matches!(
            p.reserve(-3).unwrap_err(),
            WorkflowError::Validation(_)
        ));
        assert_eq!(p.quantity, 10);
    }

    #[test]
    fn release_after_reserve_round_trips() {
        let mut p = product(10);
        p.reserve(4).unwrap();
        p.release(4).unwrap();
        assert_eq!(p.quantity, 10);
    }

    #[test]
    fn set_quantity_rejects_negative() {
        let mut p = product(10);
        assert!(p.set_quantity(-1).is_err());
        assert_eq!(p.quantity, 10);
    }

    #[test]
    fn rename_rejects_empty() {
        let mut p = product(10);
        assert!(p.rename("").is_err());
        assert_eq!(p.name, "cilindro 20lb");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Reserve(i64),
            Release(i64),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1..50i64).prop_map(Op::Reserve),
                (1..50i64).prop_map(Op::Release),
            ]
        }

        proptest! {
            // Quantity never goes negative under any sequence of reserves
            // and releases, and failed reserves never mutate.
            #[test]
            fn quantity_never_negative(
                initial in 0..100i64,
                ops in proptest::collection::vec(op_strategy(), 0..64),
            ) {
                let mut p = Product::new(ProductId::new(), "producto", initial).unwrap();
                for op in ops {
                    let before = p.quantity;
                    match op {
                        Op::Reserve(qty) => {
                            if p.reserve(qty).is_err() {
                                prop_assert_eq!(p.quantity, before);
                            }
                        }
                        Op::Release(qty) => {
                            p.release(qty).unwrap();
                        }
                    }
                    prop_assert!(p.quantity >= 0);
                }
            }
        }
    }
}
