//! Read-only view of a cart joined with the current catalog.

use common::UserId;
use domain::{Cart, CartLine, Product};
use store::{CartRepository, ProductRepository};

use crate::error::{CheckoutError, Result};

/// A cart line paired with the product it currently refers to.
#[derive(Debug, Clone)]
pub struct SnapshotLine {
    pub line: CartLine,

    /// `None` when the product was removed from the catalog.
    pub product: Option<Product>,
}

/// A non-empty cart with every line resolved against the catalog.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub cart: Cart,
    pub lines: Vec<SnapshotLine>,
}

/// Loads carts together with their products. Never mutates anything.
#[derive(Clone)]
pub struct CartSnapshotReader<C, P> {
    carts: C,
    products: P,
}

impl<C, P> CartSnapshotReader<C, P>
where
    C: CartRepository,
    P: ProductRepository,
{
    pub fn new(carts: C, products: P) -> Self {
        Self { carts, products }
    }

    /// Loads the user's cart in line order.
    ///
    /// Fails with `EmptyCart` when the user has no cart or it has no lines.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, user_id: UserId) -> Result<CartSnapshot> {
        let cart = self
            .carts
            .get_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;

        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = self.products.get_product(line.product_id).await?;
            lines.push(SnapshotLine {
                line: line.clone(),
                product,
            });
        }

        Ok(CartSnapshot { cart, lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::{InMemoryCartStore, InMemoryProductStore};

    #[tokio::test]
    async fn missing_or_empty_cart_is_empty_cart() {
        let carts = InMemoryCartStore::new();
        let reader = CartSnapshotReader::new(carts.clone(), InMemoryProductStore::new());
        let user_id = UserId::new();

        assert!(matches!(
            reader.load(user_id).await,
            Err(CheckoutError::EmptyCart)
        ));

        carts.save_cart(&Cart::new(user_id)).await.unwrap();
        assert!(matches!(
            reader.load(user_id).await,
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn resolves_current_and_missing_products() {
        let kept = Product::new("Denim Jacket", Money::from_cents(8_000), 4);
        let dropped = Product::new("Old Hat", Money::from_cents(1_500), 2);
        let products = InMemoryProductStore::with_products([kept.clone(), dropped.clone()]);
        let carts = InMemoryCartStore::new();
        let user_id = UserId::new();

        let mut cart = Cart::new(user_id);
        cart.add_item(&kept, 1, "M", "blue").unwrap();
        cart.add_item(&dropped, 1, "L", "black").unwrap();
        carts.save_cart(&cart).await.unwrap();
        products.remove_product(dropped.id).await;

        let reader = CartSnapshotReader::new(carts, products);
        let snapshot = reader.load(user_id).await.unwrap();

        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.lines[0].product.as_ref(), Some(&kept));
        assert!(snapshot.lines[1].product.is_none());
        assert_eq!(snapshot.cart.lines.len(), 2);
    }
}
