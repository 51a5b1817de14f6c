use std::{future::Future, time::Duration};

use accrual_client::{AccrualApi, AccrualConfig};
use accrual_engine::{
    db_types::{OrderIdError, OrderStatusType, Points},
    events::EventHooks,
    reconciliation::PollerConfig,
    AccountApi,
    AccrualPool,
    Closeable,
    OrderFlowApi,
    OrderFlowError,
    OrderManagement,
    OrderSubmission,
    PoolConfig,
    SqliteDatabase,
};
use serde_json::json;
use support::prepare_env::{prepare_test_env, random_db_path, tear_down};
use wiremock::{
    matchers::{method, path},
    Mock,
    MockServer,
    ResponseTemplate,
};

mod support;

fn fast_config(pool_size: usize) -> PoolConfig {
    PoolConfig::default()
        .with_pool_size(pool_size)
        .with_shutdown_grace_period(Duration::from_secs(2))
        .with_poller_config(PollerConfig { pace: Duration::from_millis(50), no_content_delay: Duration::from_millis(100) })
}

fn client_for(server: &MockServer) -> AccrualApi {
    let config = AccrualConfig::new(&server.uri()).with_retry_delays(vec![]);
    AccrualApi::new(config).expect("Could not create accrual client")
}

async fn accrual_reply(server: &MockServer, order: &str, status: &str, accrual: Option<f64>) {
    let body = match accrual {
        Some(a) => json!({ "order": order, "status": status, "accrual": a }),
        None => json!({ "order": order, "status": status }),
    };
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{order}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn first_reply(server: &MockServer, order: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{order}")))
        .respond_with(template)
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
}

async fn eventually<F: Fn() -> Fut, Fut: Future<Output = bool>>(check: F) {
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("Condition was not met within 10 seconds");
}

async fn settled(db: &SqliteDatabase) -> bool {
    db.fetch_unfinished_orders().await.unwrap().is_empty()
}

#[tokio::test]
async fn submitted_orders_are_reconciled() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let server = MockServer::start().await;
    first_reply(&server, "12345678903", ResponseTemplate::new(204)).await;
    accrual_reply(&server, "12345678903", "PROCESSED", Some(500.0)).await;
    accrual_reply(&server, "79927398713", "INVALID", None).await;
    first_reply(&server, "2377225624", ResponseTemplate::new(429).insert_header("Retry-After", "1")).await;
    accrual_reply(&server, "2377225624", "PROCESSED", Some(0.5)).await;

    let (pool, submitter) = AccrualPool::start(fast_config(2), client_for(&server), db.clone(), EventHooks::default());
    let orders = OrderFlowApi::new(db.clone(), submitter);
    let accounts = AccountApi::new(db.clone());
    let alice = accounts.create_account("alice").await.unwrap();
    let bob = accounts.create_account("bob").await.unwrap();

    for number in ["12345678903", " 79927398713 ", "2377225624"] {
        let submission = orders.submit_order(alice.id, number).await.unwrap();
        assert!(submission.is_new());
    }
    let again = orders.submit_order(alice.id, "12345678903").await.unwrap();
    assert!(matches!(again, OrderSubmission::AlreadySubmitted(_)));
    let err = orders.submit_order(bob.id, "12345678903").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderOwnedByAnotherUser(_)));
    let err = orders.submit_order(bob.id, "12345678904").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidOrderNumber(OrderIdError::BadChecksum(_))));

    eventually(|| settled(&db)).await;
    let balance = accounts.balance(alice.id).await.unwrap();
    assert_eq!(balance.current, Points::from_points(500) + Points::from(50));
    let history = orders.orders_for_user(alice.id).await.unwrap();
    assert_eq!(history.len(), 3);
    let invalid = history.iter().find(|o| o.order_id.as_str() == "79927398713").unwrap();
    assert_eq!(invalid.status, OrderStatusType::Invalid);
    assert!(invalid.accrual.is_zero());

    let summary = pool.shutdown().await;
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.aborted, 0);
    let err = orders.submit_order(bob.id, "4561261212345467").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Submission(_)));
    db.close().await.unwrap();
    tear_down(&url).await;
}

#[tokio::test]
async fn unfinished_orders_are_resubmitted() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let server = MockServer::start().await;
    accrual_reply(&server, "12345678903", "PROCESSED", Some(12.5)).await;
    accrual_reply(&server, "79927398713", "PROCESSED", Some(7.5)).await;
    let accounts = AccountApi::new(db.clone());
    let alice = accounts.create_account("alice").await.unwrap();

    // Orders recorded by a previous run that never got queued.
    let (pool, submitter) = AccrualPool::start(fast_config(1), client_for(&server), db.clone(), EventHooks::default());
    pool.shutdown().await;
    let stale = OrderFlowApi::new(db.clone(), submitter);
    for number in ["12345678903", "79927398713"] {
        let err = stale.submit_order(alice.id, number).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::Submission(_)));
    }
    assert_eq!(db.fetch_unfinished_orders().await.unwrap().len(), 2);

    let (pool, submitter) = AccrualPool::start(fast_config(2), client_for(&server), db.clone(), EventHooks::default());
    let orders = OrderFlowApi::new(db.clone(), submitter);
    assert_eq!(orders.resubmit_unfinished().await.unwrap(), 2);
    eventually(|| settled(&db)).await;
    assert_eq!(accounts.balance(alice.id).await.unwrap().current, Points::from_points(20));

    pool.shutdown().await;
    db.close().await.unwrap();
    tear_down(&url).await;
}

#[tokio::test]
async fn server_errors_stop_the_poller() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
    let accounts = AccountApi::new(db.clone());
    let alice = accounts.create_account("alice").await.unwrap();

    let (pool, submitter) = AccrualPool::start(fast_config(1), client_for(&server), db.clone(), EventHooks::default());
    let orders = OrderFlowApi::new(db.clone(), submitter);
    orders.submit_order(alice.id, "12345678903").await.unwrap();
    eventually(|| async { pool.active_pollers() == 0 }).await;

    let order = db.fetch_order(&"12345678903".into()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::New);
    assert!(accounts.balance(alice.id).await.unwrap().current.is_zero());
    let summary = pool.shutdown().await;
    assert_eq!(summary.failed, 1);
    db.close().await.unwrap();
    tear_down(&url).await;
}
