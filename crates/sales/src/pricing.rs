//! Order line pricing.
//!
//! Pricing is all-or-nothing: every quantity is checked before any product is
//! looked up, and one unknown product rejects the whole request. Line totals
//! are `unit price × quantity` in exact decimal arithmetic, summed in input
//! order.

use rust_decimal::Decimal;

use mercato_catalog::ProductStore;
use mercato_core::{RequestContext, StoreError};

use crate::error::OrderError;
use crate::order::{LineRequest, PricedLine};

/// Output of [`PricingEngine::price_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

#[derive(Debug, Clone)]
pub struct PricingEngine<P> {
    products: P,
}

impl<P> PricingEngine<P>
where
    P: ProductStore,
{
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Resolve current unit prices and compute line totals and the order total.
    ///
    /// Reads only; never writes.
    pub async fn price_lines(
        &self,
        ctx: &RequestContext,
        lines: &[LineRequest],
    ) -> Result<PricedOrder, OrderError> {
        let quantities = lines
            .iter()
            .map(validate_quantity)
            .collect::<Result<Vec<_>, _>>()?;

        let mut priced = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;

        for (line, quantity) in lines.iter().zip(quantities) {
            let product = match ctx.bound(self.products.get(line.product_id)).await? {
                Ok(product) => product,
                Err(StoreError::NotFound) => return Err(OrderError::InvalidProduct(line.product_id)),
                Err(e) => return Err(OrderError::Persistence(e)),
            };

            let price = line_total(product.price(), quantity).ok_or(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            })?;
            total = total.checked_add(price).ok_or(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            })?;

            priced.push(PricedLine {
                product_id: line.product_id,
                quantity,
                price,
            });
        }

        Ok(PricedOrder {
            lines: priced,
            total,
        })
    }
}

/// `unit_price × quantity`, or `None` on decimal overflow.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

fn validate_quantity(line: &LineRequest) -> Result<u32, OrderError> {
    u32::try_from(line.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(OrderError::InvalidQuantity {
            product_id: line.product_id,
            quantity: line.quantity,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mercato_catalog::{NewProduct, Product};
    use mercato_core::{CategoryId, ProductId};

    /// Read-only product lookup that counts calls.
    #[derive(Default)]
    struct FixedProducts {
        products: HashMap<ProductId, Product>,
        lookups: Mutex<u32>,
        fail_with: Option<StoreError>,
    }

    impl FixedProducts {
        fn with(prices: &[(u64, &str)]) -> Self {
            let products = prices
                .iter()
                .map(|(id, price)| {
                    let id = ProductId::new(*id);
                    let product = Product::from_parts(
                        id,
                        format!("product-{id}"),
                        price.parse().unwrap(),
                        CategoryId::new(1),
                    );
                    (id, product)
                })
                .collect();
            Self {
                products,
                ..Default::default()
            }
        }

        fn lookups(&self) -> u32 {
            *self.lookups.lock().unwrap()
        }
    }

    #[async_trait]
    impl ProductStore for FixedProducts {
        async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
            *self.lookups.lock().unwrap() += 1;
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.products.get(&id).cloned().ok_or(StoreError::NotFound)
        }

        async fn list_by_category(&self, _: CategoryId) -> Result<Vec<Product>, StoreError> {
            unimplemented!("not used by pricing")
        }

        async fn list(&self) -> Result<Vec<Product>, StoreError> {
            unimplemented!("not used by pricing")
        }

        async fn create(&self, _: NewProduct) -> Result<Product, StoreError> {
            unimplemented!("not used by pricing")
        }

        async fn update(&self, _: &Product) -> Result<(), StoreError> {
            unimplemented!("not used by pricing")
        }

        async fn delete(&self, _: ProductId) -> Result<(), StoreError> {
            unimplemented!("not used by pricing")
        }
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::anonymous()
    }

    #[tokio::test]
    async fn prices_lines_and_total() {
        let engine = PricingEngine::new(FixedProducts::with(&[(1, "10.00"), (2, "5.00")]));
        let priced = engine
            .price_lines(
                &ctx(),
                &[
                    LineRequest::new(ProductId::new(1), 2),
                    LineRequest::new(ProductId::new(2), 3),
                ],
            )
            .await
            .unwrap();

        let prices: Vec<_> = priced.lines.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![d("20.00"), d("15.00")]);
        assert_eq!(priced.total, d("35.00"));
    }

    #[tokio::test]
    async fn unknown_product_rejects_whole_batch() {
        let engine = PricingEngine::new(FixedProducts::with(&[(1, "10.00")]));
        let err = engine
            .price_lines(
                &ctx(),
                &[
                    LineRequest::new(ProductId::new(1), 1),
                    LineRequest::new(ProductId::new(999), 1),
                ],
            )
            .await
            .unwrap_err();

        assert_eq!(err, OrderError::InvalidProduct(ProductId::new(999)));
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected_before_any_lookup() {
        let engine = PricingEngine::new(FixedProducts::with(&[(1, "10.00")]));
        for quantity in [0, -3] {
            let err = engine
                .price_lines(
                    &ctx(),
                    &[
                        LineRequest::new(ProductId::new(1), 1),
                        LineRequest::new(ProductId::new(1), quantity),
                    ],
                )
                .await
                .unwrap_err();

            assert_eq!(
                err,
                OrderError::InvalidQuantity {
                    product_id: ProductId::new(1),
                    quantity
                }
            );
        }
        assert_eq!(engine.products.lookups(), 0);
    }

    #[tokio::test]
    async fn quantity_above_u32_is_rejected() {
        let engine = PricingEngine::new(FixedProducts::with(&[(1, "1")]));
        let err = engine
            .price_lines(&ctx(), &[LineRequest::new(ProductId::new(1), i64::from(u32::MAX) + 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidQuantity { .. }));
    }

    #[tokio::test]
    async fn store_failure_is_persistence_error() {
        let mut products = FixedProducts::with(&[(1, "1")]);
        products.fail_with = Some(StoreError::unavailable("connection refused"));
        let engine = PricingEngine::new(products);

        let err = engine
            .price_lines(&ctx(), &[LineRequest::new(ProductId::new(1), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Persistence(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn cancelled_context_prices_nothing() {
        let canceller = mercato_core::Canceller::new();
        let ctx = RequestContext::anonymous().with_cancel(canceller.signal());
        canceller.cancel();

        let engine = PricingEngine::new(FixedProducts::with(&[(1, "1")]));
        let err = engine
            .price_lines(&ctx, &[LineRequest::new(ProductId::new(1), 1)])
            .await
            .unwrap_err();

        assert_eq!(err, OrderError::Cancelled(mercato_core::Interrupted::Cancelled));
        assert_eq!(engine.products.lookups(), 0);
    }

    #[test]
    fn line_total_overflow_is_none() {
        assert_eq!(line_total(Decimal::MAX, 2), None);
        assert_eq!(line_total(d("0.10"), 3), Some(d("0.30")));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                .. ProptestConfig::default()
            })]

            /// Property: total equals Σ unit price × quantity over the requested lines.
            #[test]
            fn total_is_sum_of_unit_price_times_quantity(
                lines in prop::collection::vec((1u64..6, 1i64..1_000), 1..20),
                cents in prop::collection::vec(0i64..1_000_000, 5..=5),
            ) {
                let catalog: Vec<(u64, String)> = cents
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i as u64 + 1, Decimal::new(*c, 2).to_string()))
                    .collect();
                let refs: Vec<(u64, &str)> = catalog.iter().map(|(id, p)| (*id, p.as_str())).collect();
                let engine = PricingEngine::new(FixedProducts::with(&refs));

                let requests: Vec<LineRequest> = lines
                    .iter()
                    .map(|(id, qty)| LineRequest::new(ProductId::new(*id), *qty))
                    .collect();

                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                let priced = rt.block_on(engine.price_lines(&ctx(), &requests)).unwrap();

                let expected: Decimal = lines
                    .iter()
                    .map(|(id, qty)| Decimal::new(cents[(*id - 1) as usize], 2) * Decimal::from(*qty))
                    .sum();

                prop_assert_eq!(priced.total, expected);
                prop_assert_eq!(priced.lines.len(), requests.len());
                let line_sum: Decimal = priced.lines.iter().map(|l| l.price).sum();
                prop_assert_eq!(line_sum, priced.total);
            }
        }
    }
}
