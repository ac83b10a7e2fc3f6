//! End-to-end order flows against an in-memory store: checkout with
//! depletion and alerts, oversell rejection, and the tab lifecycle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tapline_core::catalog::{formats_for, pour_item, MarginOverrides};
use tapline_core::tax::TaxConfig;
use tapline_core::{ActorContext, Cart, Category, CoreError, Product, Role};
use tapline_engine::{
    AlertKind, AlertQueue, AlertSink, CheckoutService, DepletionEngine, EngineError, Settlement,
    StockAlert, TabLedger,
};
use tapline_store::{Store, StoreConfig};

const USER: &str = "venue-1";

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct RecordingSink {
    seen: Mutex<Vec<StockAlert>>,
}

impl RecordingSink {
    fn alerts(&self) -> Vec<StockAlert> {
        self.seen.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    fn deliver(&self, alert: &StockAlert) -> Result<(), String> {
        self.seen.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct Harness {
    store: Store,
    checkout: CheckoutService,
    ledger: TabLedger,
    sink: Arc<RecordingSink>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn harness() -> Harness {
    init_tracing();
    let store = Store::new(StoreConfig::in_memory()).await.unwrap();
    let sink = Arc::new(RecordingSink::default());
    let alerts = Arc::new(AlertQueue::new(sink.clone()));
    let config = TaxConfig::default();

    let checkout = CheckoutService::new(
        store.clone(),
        config.clone(),
        DepletionEngine::new(store.clone(), alerts.clone()),
    );
    let ledger = TabLedger::new(
        store.clone(),
        config,
        DepletionEngine::new(store.clone(), alerts),
    );

    Harness {
        store,
        checkout,
        ledger,
        sink,
    }
}

fn staff() -> ActorContext {
    ActorContext {
        user_id: "staff-1".to_string(),
        username: "dana".to_string(),
        role: Role::Staff,
    }
}

fn wine_bottle(quantity: i64) -> Product {
    Product {
        id: "wine-1".to_string(),
        name: "House Red".to_string(),
        category: Category::Wine,
        price_cents: 2100,
        quantity,
        unit_label: "bottles".to_string(),
        bottle_volume_ml: Some(750.0),
        origin: Some("Niagara, ON".to_string()),
        image_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn beer(quantity: i64) -> Product {
    Product {
        id: "beer-1".to_string(),
        name: "Lager".to_string(),
        category: Category::Beer,
        price_cents: 700,
        quantity,
        unit_label: "bottles".to_string(),
        bottle_volume_ml: Some(341.0),
        origin: None,
        image_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn wait_for_alerts(sink: &RecordingSink, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while sink.alerts().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("alerts were not delivered in time");
}

// =============================================================================
// Checkout Flow
// =============================================================================

#[tokio::test]
async fn test_checkout_sells_glasses_and_empties_the_bottle() {
    let h = harness().await;
    let product = wine_bottle(1);
    h.store.products().upsert(USER, &product).await.unwrap();

    // Glass (150 ml) at 180% margin over the per-serving cost: $11.76.
    let glass = &formats_for(Category::Wine)[0];
    let pour = pour_item(&product, glass, &MarginOverrides::new()).unwrap();
    assert_eq!(pour.price_cents, 1176);

    let mut cart = Cart::new();
    cart.add_recipe(&pour, 5).unwrap();

    let sale = h.checkout.checkout(USER, &cart, &staff()).await.unwrap();

    // Sale is persisted with a structured breakdown that sums to the total.
    let stored = h.store.sales().get(USER, &sale.id).await.unwrap().unwrap();
    assert_eq!(stored.subtotal_cents, 5 * 1176);
    let breakdown = stored.tax_breakdown.unwrap();
    assert_eq!(
        breakdown.primary_cents + breakdown.secondary_cents,
        stored.tax_cents
    );
    assert_eq!(stored.total_cents, stored.subtotal_cents + stored.tax_cents);

    // 5 x 150 ml drains the single bottle; partial bottles never survive.
    let after = h.store.products().get(USER, "wine-1").await.unwrap().unwrap();
    assert_eq!(after.quantity, 0);

    wait_for_alerts(&h.sink, 1).await;
    let alerts = h.sink.alerts();
    assert_eq!(alerts[0].kind, AlertKind::OutOfStock);
    assert_eq!(alerts[0].product_id, "wine-1");

    // Depletion left an audit entry.
    let logs = h.store.audit().list_for_product(USER, "wine-1", 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].previous_quantity, Some(1));
    assert_eq!(logs[0].new_quantity, 0);
}

#[tokio::test]
async fn test_oversell_rejected_before_any_write() {
    let h = harness().await;
    let product = wine_bottle(1);
    h.store.products().upsert(USER, &product).await.unwrap();

    let glass = &formats_for(Category::Wine)[0];
    let pour = pour_item(&product, glass, &MarginOverrides::new()).unwrap();

    // One bottle yields 5 glasses; asking for 6 is a rejection, not a panic.
    let mut cart = Cart::new();
    cart.add_recipe(&pour, 6).unwrap();

    let err = h.checkout.checkout(USER, &cart, &staff()).await.unwrap_err();
    match err {
        EngineError::Core(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 5);
            assert_eq!(requested, 6);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing was written anywhere.
    assert!(h.store.sales().list(USER).await.unwrap().is_empty());
    let after = h.store.products().get(USER, "wine-1").await.unwrap().unwrap();
    assert_eq!(after.quantity, 1);
    assert!(h.sink.alerts().is_empty());
}

#[tokio::test]
async fn test_lines_sharing_one_bottle_rejected_together() {
    let h = harness().await;
    let product = wine_bottle(1);
    h.store.products().upsert(USER, &product).await.unwrap();

    let glass = &formats_for(Category::Wine)[0];
    let pour = pour_item(&product, glass, &MarginOverrides::new()).unwrap();

    // Each line fits on its own: the whole bottle, and 3 of the 5 glasses
    // the bottle yields. Together they need two bottles.
    let mut cart = Cart::new();
    cart.add_product(&product, 1).unwrap();
    cart.add_recipe(&pour, 3).unwrap();

    let err = h.checkout.checkout(USER, &cart, &staff()).await.unwrap_err();
    match err {
        EngineError::Core(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 1);
            assert_eq!(requested, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(h.store.sales().list(USER).await.unwrap().is_empty());
    let after = h.store.products().get(USER, "wine-1").await.unwrap().unwrap();
    assert_eq!(after.quantity, 1);
    assert!(h.sink.alerts().is_empty());
}

#[tokio::test]
async fn test_empty_cart_rejected() {
    let h = harness().await;
    let err = h
        .checkout
        .checkout(USER, &Cart::new(), &staff())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::EmptyCart)));
}

// =============================================================================
// Tab Lifecycle
// =============================================================================

#[tokio::test]
async fn test_tab_open_merge_settle_close() {
    let h = harness().await;
    let product = beer(24);
    h.store.products().upsert(USER, &product).await.unwrap();

    let mut round1 = Cart::new();
    round1.add_product(&product, 2).unwrap();
    let tab = h
        .ledger
        .open(USER, "Table 4", Some("4111 1111 1111 1234"), round1.items)
        .await
        .unwrap();
    assert_eq!(tab.card_last4.as_deref(), Some("1234"));

    let mut round2 = Cart::new();
    round2.add_product(&product, 3).unwrap();
    let merged = h.ledger.merge(USER, &tab.id, round2.items).await.unwrap();
    assert_eq!(merged.subtotal_cents, 5 * 700);

    // An open tab cannot be closed without payment.
    let err = h.ledger.close(USER, &tab.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::TabStillOpen { .. })
    ));

    let settlement = h
        .ledger
        .settle(USER, &tab.id, "card", 500, &staff())
        .await
        .unwrap();
    let sale = match settlement {
        Settlement::Settled(sale) => sale,
        Settlement::AlreadySettled => panic!("first settlement must settle"),
    };
    assert_eq!(sale.subtotal_cents, 3500);
    assert_eq!(sale.tip_cents, 500);
    // Tax and total on the record come from the same breakdown.
    let breakdown = sale.tax_breakdown.as_ref().unwrap();
    assert_eq!(sale.tax_cents, breakdown.total_cents);
    assert_eq!(
        sale.total_cents,
        sale.subtotal_cents + sale.tax_cents + sale.tip_cents
    );

    // Five bottles left the shelf exactly once.
    let after = h.store.products().get(USER, "beer-1").await.unwrap().unwrap();
    assert_eq!(after.quantity, 19);

    h.ledger.close(USER, &tab.id).await.unwrap();
    assert!(h.ledger.open_tabs(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_settlement_is_idempotent() {
    let h = harness().await;
    let product = beer(24);
    h.store.products().upsert(USER, &product).await.unwrap();

    let mut cart = Cart::new();
    cart.add_product(&product, 4).unwrap();
    let tab = h.ledger.open(USER, "Dana", None, cart.items).await.unwrap();

    let first = h
        .ledger
        .settle(USER, &tab.id, "card", 0, &staff())
        .await
        .unwrap();
    assert!(matches!(first, Settlement::Settled(_)));

    let second = h
        .ledger
        .settle(USER, &tab.id, "card", 0, &staff())
        .await
        .unwrap();
    assert!(matches!(second, Settlement::AlreadySettled));

    // One sale, one depletion: stock moved exactly once.
    assert_eq!(h.store.sales().list(USER).await.unwrap().len(), 1);
    let after = h.store.products().get(USER, "beer-1").await.unwrap().unwrap();
    assert_eq!(after.quantity, 20);
}

#[tokio::test]
async fn test_merge_into_settled_tab_rejected() {
    let h = harness().await;
    let product = beer(24);
    h.store.products().upsert(USER, &product).await.unwrap();

    let mut cart = Cart::new();
    cart.add_product(&product, 1).unwrap();
    let tab = h.ledger.open(USER, "Dana", None, cart.items).await.unwrap();
    h.ledger
        .settle(USER, &tab.id, "cash", 0, &staff())
        .await
        .unwrap();

    let mut more = Cart::new();
    more.add_product(&product, 1).unwrap();
    let err = h.ledger.merge(USER, &tab.id, more.items).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::TabAlreadyPaid { .. })
    ));
}
