use chrono::{DateTime, Utc};
use common::UserId;
use domain::{Order, OrderStatus};

/// Default number of orders per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Builder for constructing order queries.
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by owning user.
    pub user_id: Option<UserId>,

    /// Filter by fulfillment status.
    pub status: Option<OrderStatus>,

    /// Orders created at or after this instant.
    pub from_created_at: Option<DateTime<Utc>>,

    /// Orders created at or before this instant.
    pub to_created_at: Option<DateTime<Utc>>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one user's orders.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn from_created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_created_at = Some(timestamp);
        self
    }

    pub fn to_created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_created_at = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Selects a 1-based page of `page_size` orders. Page 0 is treated as 1.
    /// Offsets past the end of the address space saturate and match nothing.
    pub fn page(self, page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        self.limit(page_size).offset(page_size.saturating_mul(page - 1))
    }

    /// Returns true if `order` passes every filter (ignores paging).
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(user_id) = self.user_id
            && order.user_id != user_id
        {
            return false;
        }
        if let Some(status) = self.status
            && order.order_status != status
        {
            return false;
        }
        if let Some(from) = self.from_created_at
            && order.created_at < from
        {
            return false;
        }
        if let Some(to) = self.to_created_at
            && order.created_at > to
        {
            return false;
        }
        true
    }
}

/// One page of query results plus the unpaged match count.
#[derive(Debug, Clone, Default)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

impl OrderPage {
    /// Number of pages of `page_size` needed to hold `total` orders.
    pub fn page_count(&self, page_size: usize) -> u64 {
        if page_size == 0 {
            return 0;
        }
        self.total.div_ceil(page_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_for_user() {
        let id = UserId::new();
        let query = OrderQuery::for_user(id);

        assert_eq!(query.user_id, Some(id));
        assert!(query.status.is_none());
        assert!(query.limit.is_none());
    }

    #[test]
    fn query_builder_chain() {
        let from = Utc::now();
        let query = OrderQuery::new()
            .status(OrderStatus::Shipped)
            .from_created_at(from)
            .limit(10)
            .offset(5);

        assert_eq!(query.status, Some(OrderStatus::Shipped));
        assert_eq!(query.from_created_at, Some(from));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn page_translates_to_limit_and_offset() {
        let query = OrderQuery::new().page(3, DEFAULT_PAGE_SIZE);
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(40));

        let query = OrderQuery::new().page(0, 20);
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let query = OrderQuery::new().page(usize::MAX, DEFAULT_PAGE_SIZE);
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(usize::MAX));
    }

    #[test]
    fn page_count_rounds_up() {
        let page = OrderPage {
            orders: vec![],
            total: 41,
        };
        assert_eq!(page.page_count(20), 3);
        assert_eq!(OrderPage::default().page_count(20), 0);
    }
}
