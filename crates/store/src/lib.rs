pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryCartStore, InMemoryOrderStore, InMemoryProductStore, InMemoryStore};
pub use postgres::PostgresStore;
pub use query::{DEFAULT_PAGE_SIZE, OrderPage, OrderQuery};
pub use store::{
    CartRepository, OrderRepository, ProductRepository, StockLedger, StorefrontStore,
};
