//! Startup catalog loading from a JSON file.

use std::path::Path;

use domain::Product;
use store::{ProductRepository, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read catalog seed {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid catalog seed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid catalog seed: product {name} has negative price {cents}")]
    NegativePrice { name: String, cents: i64 },

    #[error("failed to store seeded product: {0}")]
    Store(#[from] StoreError),
}

/// Parses a JSON array of products and saves each one. Existing products
/// with the same id are overwritten. Returns the number of products saved.
pub async fn seed_catalog<P>(products: &P, path: &Path) -> Result<usize, SeedError>
where
    P: ProductRepository,
{
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;

    load_catalog(products, &raw).await
}

/// Saves every product in a JSON array. Nothing is saved unless every
/// product is valid.
pub async fn load_catalog<P>(products: &P, raw: &str) -> Result<usize, SeedError>
where
    P: ProductRepository,
{
    let catalog: Vec<Product> = serde_json::from_str(raw)?;
    if let Some(product) = catalog.iter().find(|p| p.price.cents() < 0) {
        return Err(SeedError::NegativePrice {
            name: product.name.clone(),
            cents: product.price.cents(),
        });
    }

    for product in &catalog {
        products.save_product(product).await?;
    }

    tracing::info!(count = catalog.len(), "catalog seeded");
    Ok(catalog.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use store::InMemoryProductStore;

    #[tokio::test]
    async fn test_load_catalog_saves_products() {
        let id = ProductId::new();
        let raw = format!(
            r#"[{{"id": "{id}", "name": "Wool Coat", "price": 12000, "stock": 4,
                 "images": ["coat.jpg"], "sizes": ["S", "M"], "colors": ["navy"]}}]"#
        );
        let store = InMemoryProductStore::new();

        let count = load_catalog(&store, &raw).await.unwrap();

        assert_eq!(count, 1);
        let product = store.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.name, "Wool Coat");
        assert_eq!(product.price.cents(), 12_000);
        assert_eq!(product.stock, 4);
        assert_eq!(product.sold, 0);
    }

    #[tokio::test]
    async fn test_load_catalog_rejects_malformed_json() {
        let store = InMemoryProductStore::new();
        let result = load_catalog(&store, r#"{"name": "not an array"}"#).await;
        assert!(matches!(result, Err(SeedError::Parse(_))));
    }

    #[tokio::test]
    async fn test_load_catalog_rejects_negative_price() {
        let (good, bad) = (ProductId::new(), ProductId::new());
        let raw = format!(
            r#"[{{"id": "{good}", "name": "Scarf", "price": 2500, "stock": 3}},
                {{"id": "{bad}", "name": "Refund Hat", "price": -100, "stock": 3}}]"#
        );
        let store = InMemoryProductStore::new();

        let result = load_catalog(&store, &raw).await;

        assert!(matches!(
            result,
            Err(SeedError::NegativePrice { ref name, cents: -100 }) if name == "Refund Hat"
        ));
        assert_eq!(store.product_count().await, 0);
        assert!(store.get_product(good).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed_catalog_missing_file() {
        let store = InMemoryProductStore::new();
        let result = seed_catalog(&store, Path::new("/nonexistent/catalog.json")).await;
        assert!(matches!(result, Err(SeedError::Io { .. })));
    }
}
