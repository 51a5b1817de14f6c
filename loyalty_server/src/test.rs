use std::{future::Future, time::Duration};

use accrual_client::AccrualConfig;
use accrual_engine::{
    db_types::{NewOrder, OrderId, OrderStatusType, Points},
    reconciliation::PollerConfig,
    AccountManagement,
    MemoryDatabase,
    OrderManagement,
    PoolConfig,
};
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock,
    MockServer,
    ResponseTemplate,
};

use crate::config::ServerConfig;

fn config_for(server: &MockServer) -> ServerConfig {
    let accrual = AccrualConfig::new(&server.uri()).with_retry_delays(vec![]);
    let pool = PoolConfig::default()
        .with_pool_size(2)
        .with_shutdown_grace_period(Duration::from_secs(2))
        .with_poller_config(PollerConfig { pace: Duration::from_millis(20), no_content_delay: Duration::from_millis(50) });
    ServerConfig::new("memory", accrual).with_pool_config(pool)
}

async fn accrual_reply(server: &MockServer, order: &str, status: &str, accrual: f64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/orders/{order}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "order": order, "status": status, "accrual": accrual })),
        )
        .mount(server)
        .await;
}

async fn eventually<F: Fn() -> Fut, Fut: Future<Output = bool>>(check: F) {
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("Condition was not met within 5 seconds");
}

async fn balance_is(db: &MemoryDatabase, user_id: i64, expected: Points) -> bool {
    db.fetch_user_account(user_id).await.unwrap().map(|a| a.balance == expected).unwrap_or(false)
}

async fn settled(db: &MemoryDatabase) -> bool {
    db.fetch_unfinished_orders().await.unwrap().is_empty()
}

mod worker {
    use super::*;
    use crate::accrual_worker::start_accrual_worker;

    #[tokio::test]
    async fn submitted_orders_are_credited() {
        let _ = env_logger::try_init();
        let server = MockServer::start().await;
        accrual_reply(&server, "12345678903", "PROCESSED", 500.0).await;
        let db = MemoryDatabase::new();
        let user = db.create_user_account("alice").await.unwrap();
        let config = config_for(&server).with_resubmit_on_start(false);

        let worker = start_accrual_worker(db.clone(), &config).unwrap();
        assert_eq!(worker.active_pollers(), 2);
        let submission = worker.orders().submit_order(user.id, " 12345678903 ").await.unwrap();
        assert!(submission.is_new());
        eventually(|| balance_is(&db, user.id, Points::from_points(500))).await;

        let balance = worker.accounts().balance(user.id).await.unwrap();
        assert_eq!(balance.current, Points::from_points(500));
        let summary = worker.shutdown().await;
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.aborted, 0);
        let order = db.fetch_order(&OrderId::from("12345678903")).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatusType::Processed);
    }

    #[tokio::test]
    async fn bad_order_numbers_never_reach_the_accrual_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(204)).expect(0).mount(&server).await;
        let db = MemoryDatabase::new();
        let user = db.create_user_account("bob").await.unwrap();
        let worker = start_accrual_worker(db.clone(), &config_for(&server)).unwrap();

        assert!(worker.orders().submit_order(user.id, "12345678904").await.is_err());
        assert!(worker.orders().submit_order(user.id, "").await.is_err());
        assert!(db.fetch_orders_for_user(user.id).await.unwrap().is_empty());
        worker.shutdown().await;
    }
}

mod server {
    use super::*;
    use crate::server::run_with_backend;

    #[tokio::test]
    async fn unfinished_orders_are_resumed_on_start() {
        let _ = env_logger::try_init();
        let server = MockServer::start().await;
        accrual_reply(&server, "79927398713", "PROCESSED", 120.5).await;
        accrual_reply(&server, "4561261212345467", "INVALID", 0.0).await;
        let db = MemoryDatabase::new();
        let user = db.create_user_account("carol").await.unwrap();
        for number in ["79927398713", "4561261212345467"] {
            db.insert_order(NewOrder::new(OrderId::from(number), user.id)).await.unwrap();
        }

        let watched = db.clone();
        let user_id = user.id;
        let shutdown = async move {
            eventually(|| settled(&watched)).await;
            assert!(balance_is(&watched, user_id, Points::from(12_050)).await);
        };
        let config = config_for(&server);
        let summary = tokio::time::timeout(Duration::from_secs(10), run_with_backend(db.clone(), &config, shutdown))
            .await
            .expect("Server did not stop in time")
            .unwrap();
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.abandoned_orders, 0);
        // The store is closed on the way out
        assert!(db.fetch_user_account(user.id).await.is_err());
    }

    #[tokio::test]
    async fn resubmission_can_be_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(204)).expect(0).mount(&server).await;
        let db = MemoryDatabase::new();
        let user = db.create_user_account("dave").await.unwrap();
        db.insert_order(NewOrder::new(OrderId::from("2377225624"), user.id)).await.unwrap();

        let config = config_for(&server).with_resubmit_on_start(false);
        let summary = run_with_backend(db.clone(), &config, async {
            tokio::time::sleep(Duration::from_millis(100)).await;
        })
        .await
        .unwrap();
        assert_eq!(summary.stopped, 2);
        assert_eq!(summary.abandoned_orders, 0);
    }
}
