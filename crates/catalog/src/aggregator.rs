//! Category price aggregation.

use rust_decimal::Decimal;
use tracing::debug;

use mercato_core::{CategoryId, RequestContext};

use crate::error::CatalogError;
use crate::store::ProductStore;

/// Computes the mean price of the products in a category.
///
/// Read-only: issues exactly one `list_by_category` call per request.
#[derive(Debug, Clone)]
pub struct CategoryAggregator<P> {
    products: P,
}

impl<P> CategoryAggregator<P>
where
    P: ProductStore,
{
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Arithmetic mean of the prices of all products tagged with `category_id`.
    ///
    /// An empty category is `CatalogError::EmptyCategory`, never zero.
    pub async fn average_price(
        &self,
        ctx: &RequestContext,
        category_id: CategoryId,
    ) -> Result<Decimal, CatalogError> {
        ctx.require_identity()?;
        let products = ctx
            .bound(self.products.list_by_category(category_id))
            .await??;

        debug!(
            request_id = %ctx.request_id(),
            category_id = %category_id,
            product_count = products.len(),
            "averaging category prices"
        );

        mean_price(products.iter().map(|p| p.price()))?
            .ok_or(CatalogError::EmptyCategory(category_id))
    }
}

/// Sum of `prices` divided by their count; `None` for an empty input.
pub fn mean_price<I>(prices: I) -> Result<Option<Decimal>, CatalogError>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut sum = Decimal::ZERO;
    let mut count: u64 = 0;
    for price in prices {
        sum = sum.checked_add(price).ok_or_else(overflow)?;
        count += 1;
    }

    if count == 0 {
        return Ok(None);
    }

    sum.checked_div(Decimal::from(count))
        .map(Some)
        .ok_or_else(overflow)
}

fn overflow() -> CatalogError {
    CatalogError::Validation("category price sum exceeds the decimal range".into())
}
