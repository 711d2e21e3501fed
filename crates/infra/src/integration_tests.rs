//! Integration tests for the assembled order and catalog core.
//!
//! Tests: Catalog → Pricing → OrderStore → Notifier, over the in-memory stores.
//!
//! Verifies:
//! - Orders are priced from current catalog prices and keep that snapshot
//! - Nothing is written when validation, pricing or cancellation fails early
//! - A committed order survives a failed or interrupted notification
//! - Category averages are computed per category id

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use mercato_catalog::{
        CatalogError, CatalogService, CategoryAggregator, NewProduct, Product, ProductChanges, ProductStore,
    };
    use mercato_core::{
        Canceller, CategoryId, Entity, Identity, Interrupted, OrderItemId, ProductId, RequestContext, StoreError,
    };
    use mercato_parties::{CustomerProfile, CustomerService};
    use mercato_sales::{
        CONFIRMATION_SUBJECT, LineRequest, NotificationFailure, NotifyError, OrderError, OrderStore,
        OrderWorkflow, SmsAlert,
    };

    use crate::notify::{RecordingNotifier, SentMessage};
    use crate::store::{InMemoryCatalogStore, InMemoryCustomerStore, InMemoryOrderStore};

    type Workflow = OrderWorkflow<Arc<InMemoryCatalogStore>, Arc<InMemoryOrderStore>, Arc<RecordingNotifier>>;

    struct Harness {
        catalog: CatalogService<Arc<InMemoryCatalogStore>, Arc<InMemoryCatalogStore>>,
        aggregator: CategoryAggregator<Arc<InMemoryCatalogStore>>,
        orders: Arc<InMemoryOrderStore>,
        notifier: Arc<RecordingNotifier>,
        workflow: Workflow,
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn buyer() -> RequestContext {
        RequestContext::authenticated(Identity::new("buyer@example.com").unwrap())
    }

    fn setup_with(notifier: RecordingNotifier) -> Harness {
        let store = Arc::new(InMemoryCatalogStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(notifier);
        Harness {
            catalog: CatalogService::new(store.clone(), store.clone()),
            aggregator: CategoryAggregator::new(store.clone()),
            workflow: OrderWorkflow::new(store, orders.clone(), notifier.clone()),
            orders,
            notifier,
        }
    }

    fn setup() -> Harness {
        setup_with(RecordingNotifier::new())
    }

    /// Category 1 with product A at 10.00 and product B at 5.00.
    async fn seed(h: &Harness) -> (CategoryId, Product, Product) {
        let ctx = buyer();
        let category = h.catalog.create_category(&ctx, "Pantry").await.unwrap();
        let cat = *category.id();
        let a = h
            .catalog
            .create_product(&ctx, NewProduct::new("A", d("10.00"), cat).unwrap())
            .await
            .unwrap();
        let b = h
            .catalog
            .create_product(&ctx, NewProduct::new("B", d("5.00"), cat).unwrap())
            .await
            .unwrap();
        (cat, a, b)
    }

    #[tokio::test]
    async fn order_is_priced_persisted_and_confirmed() {
        let h = setup();
        let (cat, a, b) = seed(&h).await;
        assert_eq!(cat, CategoryId::new(1));

        let order = h
            .workflow
            .create_order(
                &buyer(),
                vec![LineRequest::new(*a.id(), 2), LineRequest::new(*b.id(), 3)],
            )
            .await
            .unwrap();

        let line_prices: Vec<Decimal> = order.items.iter().map(|i| i.price).collect();
        assert_eq!(line_prices, vec![d("20.00"), d("15.00")]);
        assert_eq!(order.total_price, d("35.00"));
        assert_eq!(order.total_price, order.item_sum());
        assert_eq!(order.purchaser.email, "buyer@example.com");

        let average = h
            .aggregator
            .average_price(&buyer(), cat)
            .await
            .unwrap();
        assert_eq!(average, d("7.50"));

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            SentMessage::Email { to, subject, body } => {
                assert_eq!(to, "buyer@example.com");
                assert_eq!(subject, CONFIRMATION_SUBJECT);
                assert!(body.contains(&format!("Order ID: {}", order.id)));
                assert!(body.contains("Total Price: 35.00"));
            }
            other => panic!("expected email, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_product_creates_nothing() {
        let h = setup();
        let (_, a, _) = seed(&h).await;

        let err = h
            .workflow
            .create_order(
                &buyer(),
                vec![LineRequest::new(*a.id(), 1), LineRequest::new(ProductId::new(999), 1)],
            )
            .await
            .unwrap_err();

        assert_eq!(err, OrderError::InvalidProduct(ProductId::new(999)));
        assert!(h.orders.list().await.unwrap().is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantity_creates_nothing() {
        let h = setup();
        let (_, a, b) = seed(&h).await;

        let err = h
            .workflow
            .create_order(
                &buyer(),
                vec![LineRequest::new(*a.id(), 1), LineRequest::new(*b.id(), 0)],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidQuantity { quantity: 0, .. }));
        assert!(h.orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_category_has_no_average() {
        let h = setup();
        let ctx = buyer();
        let empty = h.catalog.create_category(&ctx, "Empty").await.unwrap();

        let err = h.aggregator.average_price(&ctx, *empty.id()).await.unwrap_err();
        assert_eq!(err, CatalogError::EmptyCategory(*empty.id()));

        let err = h
            .aggregator
            .average_price(&ctx, CategoryId::new(404))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::EmptyCategory(CategoryId::new(404)));
    }

    #[tokio::test]
    async fn average_is_scoped_to_category() {
        let h = setup();
        let (cat, _, _) = seed(&h).await;
        let ctx = buyer();
        let other = h.catalog.create_category(&ctx, "Other").await.unwrap();
        h.catalog
            .create_product(&ctx, NewProduct::new("C", d("100"), *other.id()).unwrap())
            .await
            .unwrap();

        assert_eq!(h.aggregator.average_price(&ctx, cat).await.unwrap(), d("7.50"));
        assert_eq!(h.aggregator.average_price(&ctx, *other.id()).await.unwrap(), d("100"));
    }

    #[tokio::test]
    async fn order_items_keep_price_snapshot() {
        let h = setup();
        let (_, a, _) = seed(&h).await;
        let ctx = buyer();

        let order = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 3)])
            .await
            .unwrap();
        assert_eq!(order.items[0].price, d("30.00"));

        h.catalog
            .update_product(
                &ctx,
                *a.id(),
                ProductChanges {
                    price: Some(d("20.00")),
                    ..ProductChanges::default()
                },
            )
            .await
            .unwrap();

        let refetched = h.workflow.get_order(&ctx, order.id).await.unwrap();
        assert_eq!(refetched.items[0].price, d("30.00"));
        assert_eq!(refetched.total_price, d("30.00"));

        let second = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 3)])
            .await
            .unwrap();
        assert_eq!(second.items[0].price, d("60.00"));
    }

    #[tokio::test]
    async fn failed_notification_keeps_committed_order() {
        let h = setup();
        let (_, a, _) = seed(&h).await;
        h.notifier.fail_with(NotifyError::Transport("smtp down".into()));
        let ctx = buyer();

        let err = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 1)])
            .await
            .unwrap_err();

        let committed = err.committed_order().cloned().unwrap();
        assert!(matches!(
            err,
            OrderError::NotificationFailed {
                cause: NotificationFailure::Channel(NotifyError::Transport(_)),
                ..
            }
        ));
        assert_eq!(h.workflow.get_order(&ctx, committed.id).await.unwrap(), committed);
    }

    #[tokio::test]
    async fn sms_alert_follows_confirmation_email() {
        let store = Arc::new(InMemoryCatalogStore::new());
        let orders = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let workflow = OrderWorkflow::new(store.clone(), orders, notifier.clone()).with_sms_alert(SmsAlert {
            recipients: vec!["+254700000001".into()],
            sender_id: "MERCATO".into(),
        });
        let catalog = CatalogService::new(store.clone(), store);
        let ctx = buyer();
        let cat = catalog.create_category(&ctx, "Pantry").await.unwrap();
        let p = catalog
            .create_product(&ctx, NewProduct::new("A", d("2.50"), *cat.id()).unwrap())
            .await
            .unwrap();

        workflow
            .create_order(&buyer(), vec![LineRequest::new(*p.id(), 2)])
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], SentMessage::Email { .. }));
        match &sent[1] {
            SentMessage::Sms { recipients, sender_id, message } => {
                assert_eq!(recipients, &vec!["+254700000001".to_string()]);
                assert_eq!(sender_id, "MERCATO");
                assert!(message.contains("5.00"));
            }
            other => panic!("expected sms, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_before_persist_writes_nothing() {
        let h = setup();
        let (_, a, _) = seed(&h).await;
        let canceller = Canceller::new();
        let ctx = buyer().with_cancel(canceller.signal());
        canceller.cancel();

        let err = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 1)])
            .await
            .unwrap_err();

        assert_eq!(err, OrderError::Cancelled(Interrupted::Cancelled));
        assert!(h.orders.list().await.unwrap().is_empty());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_during_notification_is_tagged_as_interrupted() {
        let h = setup_with(RecordingNotifier::new().with_delay(Duration::from_secs(30)));
        let (_, a, _) = seed(&h).await;
        let ctx = buyer().with_timeout(Duration::from_secs(5));

        let err = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 1)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::NotificationFailed {
                cause: NotificationFailure::Interrupted(Interrupted::DeadlineExceeded),
                ..
            }
        ));
        let committed = err.committed_order().unwrap();
        assert_eq!(h.orders.get(committed.id).await.unwrap().id, committed.id);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn cancel_during_notification_is_tagged_as_interrupted() {
        let h = setup_with(RecordingNotifier::new().with_delay(Duration::from_secs(30)));
        let (_, a, _) = seed(&h).await;
        let canceller = Canceller::new();
        let ctx = buyer().with_cancel(canceller.signal());

        let create = h.workflow.create_order(&ctx, vec![LineRequest::new(*a.id(), 1)]);
        let cancel = async {
            // Wait until the order row exists, then cancel while the email is in flight.
            while h.orders.list().await.unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
            canceller.cancel();
        };
        let (result, ()) = tokio::join!(create, cancel);

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            OrderError::NotificationFailed {
                cause: NotificationFailure::Interrupted(Interrupted::Cancelled),
                ..
            }
        ));
        assert_eq!(h.orders.list().await.unwrap().len(), 1);
    }

    /// Product store that counts every call before delegating.
    struct CountingProducts {
        inner: Arc<InMemoryCatalogStore>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProductStore for CountingProducts {
        async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ProductStore::get(&*self.inner, id).await
        }

        async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Product>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_by_category(category_id).await
        }

        async fn list(&self) -> Result<Vec<Product>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ProductStore::list(&*self.inner).await
        }

        async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ProductStore::create(&*self.inner, product).await
        }

        async fn update(&self, product: &Product) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ProductStore::update(&*self.inner, product).await
        }

        async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ProductStore::delete(&*self.inner, id).await
        }
    }

    #[tokio::test]
    async fn missing_identity_is_rejected_before_any_store_call() {
        let products = Arc::new(CountingProducts {
            inner: Arc::new(InMemoryCatalogStore::new()),
            calls: AtomicUsize::new(0),
        });
        let orders = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let workflow = OrderWorkflow::new(products.clone(), orders.clone(), notifier.clone());

        let err = workflow
            .create_order(
                &RequestContext::anonymous(),
                vec![LineRequest::new(ProductId::new(1), 1)],
            )
            .await
            .unwrap_err();

        assert_eq!(err, OrderError::Unauthenticated);
        assert_eq!(products.calls.load(Ordering::SeqCst), 0);
        assert!(orders.list().await.unwrap().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn anonymous_catalog_reads_are_rejected_before_any_store_call() {
        let products = Arc::new(CountingProducts {
            inner: Arc::new(InMemoryCatalogStore::new()),
            calls: AtomicUsize::new(0),
        });
        let aggregator = CategoryAggregator::new(products.clone());
        let catalog = CatalogService::new(products.clone(), Arc::new(InMemoryCatalogStore::new()));
        let anonymous = RequestContext::anonymous();

        let err = aggregator
            .average_price(&anonymous, CategoryId::new(1))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::Unauthenticated);

        let err = catalog.list_products(&anonymous).await.unwrap_err();
        assert_eq!(err, CatalogError::Unauthenticated);
        assert_eq!(products.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_order_cascades_items() {
        let h = setup();
        let (_, a, b) = seed(&h).await;
        let ctx = buyer();
        let order = h
            .workflow
            .create_order(
                &ctx,
                vec![LineRequest::new(*a.id(), 1), LineRequest::new(*b.id(), 1)],
            )
            .await
            .unwrap();

        h.workflow.delete_order(&ctx, order.id).await.unwrap();

        assert_eq!(h.workflow.get_order(&ctx, order.id).await.unwrap_err(), OrderError::NotFound);
        assert_eq!(h.workflow.delete_order(&ctx, order.id).await.unwrap_err(), OrderError::NotFound);
    }

    #[tokio::test]
    async fn update_order_persists_verbatim() {
        let h = setup();
        let (_, a, _) = seed(&h).await;
        let ctx = buyer();
        let mut order = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 1)])
            .await
            .unwrap();

        order.items[0].quantity = 4;
        h.workflow.update_order(&ctx, order.clone()).await.unwrap();

        let stored = h.workflow.get_order(&ctx, order.id).await.unwrap();
        assert_eq!(stored.items[0].quantity, 4);
        // Not re-priced.
        assert_eq!(stored.items[0].price, d("10.00"));
        assert_eq!(stored.total_price, d("10.00"));
    }

    #[tokio::test]
    async fn update_order_without_items_is_rejected() {
        let h = setup();
        let (_, a, _) = seed(&h).await;
        let ctx = buyer();
        let mut order = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 1)])
            .await
            .unwrap();

        let before = order.clone();
        order.items.clear();
        let err = h.workflow.update_order(&ctx, order).await.unwrap_err();

        assert_eq!(err, OrderError::EmptyOrder);
        assert_eq!(h.workflow.get_order(&ctx, before.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn update_order_does_not_reuse_item_ids() {
        let h = setup();
        let (_, a, b) = seed(&h).await;
        let ctx = buyer();
        let mut first = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 1)])
            .await
            .unwrap();

        let mut added = first.items[0].clone();
        added.id = OrderItemId::new(first.items[0].id.get() + 1);
        added.product_id = *b.id();
        first.items.push(added);
        let first = h.workflow.update_order(&ctx, first).await.unwrap();

        let second = h
            .workflow
            .create_order(&ctx, vec![LineRequest::new(*a.id(), 1)])
            .await
            .unwrap();

        let first_ids: Vec<OrderItemId> = first.items.iter().map(|i| i.id).collect();
        assert!(second.items.iter().all(|i| !first_ids.contains(&i.id)));
        assert_eq!(h.workflow.get_order(&ctx, first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn catalog_rejects_dangling_references() {
        let h = setup();
        let (cat, _, _) = seed(&h).await;
        let ctx = buyer();

        let err = h
            .catalog
            .create_product(&ctx, NewProduct::new("X", d("1"), CategoryId::new(77)).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownCategory(CategoryId::new(77)));

        let err = h.catalog.delete_category(&ctx, cat).await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
    }

    #[tokio::test]
    async fn customer_profile_upsert_is_idempotent_per_email() {
        let customers = CustomerService::new(Arc::new(InMemoryCustomerStore::new()));
        let ctx = buyer();
        let profile = CustomerProfile {
            name: "Buyer".into(),
            email: "Buyer@Example.com".into(),
            verified_email: true,
            phone: Some("+254700000001".into()),
            picture: None,
        };

        let first = customers.upsert(&ctx, profile.clone()).await.unwrap();
        let second = customers.upsert(&ctx, profile).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "buyer@example.com");
        assert_eq!(
            customers.find_by_email(&ctx, "BUYER@example.com").await.unwrap().id,
            first.id
        );
    }
}
