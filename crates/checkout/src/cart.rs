//! Per-user cart management.

use common::{CartLineId, ProductId, UserId};
use domain::{Cart, CartError};
use store::{CartRepository, ProductRepository};

use crate::error::{CheckoutError, Result};

/// Maintains a user's cart against the catalog.
///
/// Stock checks here are advisory. Only the ledger reservation made at
/// checkout is authoritative.
pub struct CartService<C, P>
where
    C: CartRepository,
    P: ProductRepository,
{
    carts: C,
    products: P,
}

impl<C, P> CartService<C, P>
where
    C: CartRepository,
    P: ProductRepository,
{
    pub fn new(carts: C, products: P) -> Self {
        Self { carts, products }
    }

    /// Returns the user's cart, creating an empty one on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        if let Some(cart) = self.carts.get_cart(user_id).await? {
            return Ok(cart);
        }

        let cart = Cart::new(user_id);
        self.carts.save_cart(&cart).await?;
        tracing::debug!(cart_id = %cart.id, "cart created");
        Ok(cart)
    }

    /// Adds `quantity` of a product in the given size and color, merging
    /// into an existing matching line.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
        size: &str,
        color: &str,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity }.into());
        }
        if size.trim().is_empty() {
            return Err(CartError::MissingField("size").into());
        }
        if color.trim().is_empty() {
            return Err(CartError::MissingField("color").into());
        }

        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        let mut cart = self.get_cart(user_id).await?;
        cart.add_item(&product, quantity, size, color)?;
        self.carts.save_cart(&cart).await?;

        Ok(cart)
    }

    /// Sets the quantity of one line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity }.into());
        }

        let mut cart = self.existing_cart(user_id).await?;
        let product_id = cart
            .line(line_id)
            .ok_or(CheckoutError::CartLineNotFound(line_id))?
            .product_id;
        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        cart.update_quantity(line_id, &product, quantity)?;
        self.carts.save_cart(&cart).await?;

        Ok(cart)
    }

    /// Removes one line. Removing a line that is not there leaves the cart
    /// unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, line_id: CartLineId) -> Result<Cart> {
        let mut cart = self.existing_cart(user_id).await?;
        cart.remove_line(line_id);
        self.carts.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Removes every line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<Cart> {
        let mut cart = self.existing_cart(user_id).await?;
        cart.clear();
        self.carts.save_cart(&cart).await?;
        Ok(cart)
    }

    async fn existing_cart(&self, user_id: UserId) -> Result<Cart> {
        self.carts
            .get_cart(user_id)
            .await?
            .ok_or(CheckoutError::CartNotFound(user_id))
    }
}
