use accrual_engine::{
    db_types::{InsertOrderResult, NewOrder, OrderId, OrderStatusType, Points},
    helpers::luhn::with_check_digit,
    AccountManagement,
    AccrualLedger,
    AccrualUpdate,
    Closeable,
    LedgerError,
    LoyaltyDatabase,
    OrderManagement,
    StorageError,
};
use support::prepare_env::{prepare_test_env, random_db_path, tear_down};

mod support;

fn oid(s: &str) -> OrderId {
    OrderId::parse_luhn(s).unwrap()
}

fn numbered(n: u32) -> OrderId {
    oid(&with_check_digit(&(1000 + n).to_string()).unwrap())
}

#[tokio::test]
async fn orders_and_accounts() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    assert_eq!(db.url(), url);
    let alice = db.create_user_account("alice").await.unwrap();
    let bob = db.create_user_account("bob").await.unwrap();
    assert_eq!(db.create_user_account("alice").await.unwrap_err(), StorageError::LoginTaken("alice".into()));
    assert_eq!(db.fetch_user_account_by_login("bob").await.unwrap(), Some(bob.clone()));
    assert!(alice.balance.is_zero() && alice.withdrawn.is_zero());

    let first = db.insert_order(NewOrder::new(oid("12345678903"), alice.id)).await.unwrap();
    let InsertOrderResult::Inserted(order) = first else { panic!("Order should be new") };
    assert_eq!(order.status, OrderStatusType::New);
    assert!(order.accrual.is_zero());
    let again = db.insert_order(NewOrder::new(oid("12345678903"), alice.id)).await.unwrap();
    assert!(matches!(again, InsertOrderResult::AlreadyExists(o) if o.id == order.id));
    let stolen = db.insert_order(NewOrder::new(oid("12345678903"), bob.id)).await.unwrap_err();
    assert_eq!(stolen, StorageError::DuplicateOrder(oid("12345678903")));
    let orphan = db.insert_order(NewOrder::new(oid("79927398713"), 9999)).await.unwrap_err();
    assert_eq!(orphan, StorageError::AccountNotFound(9999));

    db.insert_order(NewOrder::new(oid("79927398713"), alice.id)).await.unwrap();
    let orders = db.fetch_orders_for_user(alice.id).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order_id, oid("79927398713"));
    let unfinished = db.fetch_unfinished_orders().await.unwrap();
    assert_eq!(unfinished.iter().map(|o| o.order_id.clone()).collect::<Vec<_>>(), vec![
        oid("12345678903"),
        oid("79927398713")
    ]);
    db.close().await.unwrap();
    tear_down(&url).await;
}

#[tokio::test]
async fn accrual_ledger_is_atomic_and_idempotent() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let alice = db.create_user_account("alice").await.unwrap();
    let order_id = oid("12345678903");
    db.insert_order(NewOrder::new(order_id.clone(), alice.id)).await.unwrap();

    let upd = db.update_order_by_accrual(&order_id, OrderStatusType::Processing, Points::default()).await.unwrap();
    assert!(matches!(upd, AccrualUpdate::Applied { previous: OrderStatusType::New, .. }));
    assert!(upd.credited().is_zero());
    let accrual = Points::try_from_f64(729.98).unwrap();
    let upd = db.update_order_by_accrual(&order_id, OrderStatusType::Processed, accrual).await.unwrap();
    assert_eq!(upd.credited(), accrual);
    assert_eq!(upd.order().accrual, accrual);
    let upd = db.update_order_by_accrual(&order_id, OrderStatusType::Processed, accrual).await.unwrap();
    assert!(matches!(upd, AccrualUpdate::Unchanged(_)));

    let err = db.update_order_by_accrual(&order_id, OrderStatusType::Invalid, Points::default()).await.unwrap_err();
    assert!(matches!(err, LedgerError::StatusRegression { from: OrderStatusType::Processed, .. }));
    let missing = oid("79927398713");
    let err = db.update_order_by_accrual(&missing, OrderStatusType::Processed, accrual).await.unwrap_err();
    assert_eq!(err, LedgerError::OrderNotFound(missing));

    let alice = db.fetch_user_account(alice.id).await.unwrap().unwrap();
    assert_eq!(alice.balance, accrual);
    assert_eq!(alice.balance.to_string(), "729.98pts");
    assert!(db.fetch_unfinished_orders().await.unwrap().is_empty());
    db.close().await.unwrap();
    tear_down(&url).await;
}

#[tokio::test]
async fn withdrawals() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let alice = db.create_user_account("alice").await.unwrap();
    let earned = oid("12345678903");
    db.insert_order(NewOrder::new(earned.clone(), alice.id)).await.unwrap();
    db.update_order_by_accrual(&earned, OrderStatusType::Processed, Points::from_points(500)).await.unwrap();

    let spent = oid("2377225624");
    let err = db.register_withdrawal(alice.id, &spent, Points::from_points(501)).await.unwrap_err();
    assert_eq!(err, StorageError::InsufficientBalance {
        available: Points::from_points(500),
        requested: Points::from_points(501)
    });
    let err = db.register_withdrawal(alice.id, &spent, Points::default()).await.unwrap_err();
    assert_eq!(err, StorageError::InvalidAmount(Points::default()));
    let order = db.register_withdrawal(alice.id, &spent, Points::from_points(200)).await.unwrap();
    assert_eq!(order.withdrawal, Points::from_points(200));
    assert_eq!(order.status, OrderStatusType::Processed);
    let err = db.register_withdrawal(alice.id, &earned, Points::from_points(1)).await.unwrap_err();
    assert_eq!(err, StorageError::DuplicateOrder(earned));

    let alice = db.fetch_user_account(alice.id).await.unwrap().unwrap();
    assert_eq!(alice.balance, Points::from_points(300));
    assert_eq!(alice.withdrawn, Points::from_points(200));
    let withdrawals = db.fetch_withdrawals_for_user(alice.id).await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].order_id, spent);
    assert!(db.fetch_unfinished_orders().await.unwrap().is_empty());
    db.close().await.unwrap();
    tear_down(&url).await;
}

#[tokio::test]
async fn concurrent_accruals_are_all_applied() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let alice = db.create_user_account("alice").await.unwrap();
    let order_ids = (0..40).map(numbered).collect::<Vec<_>>();
    for order_id in &order_ids {
        db.insert_order(NewOrder::new(order_id.clone(), alice.id)).await.unwrap();
    }

    let tasks = order_ids
        .iter()
        .cloned()
        .map(|order_id| {
            let db = db.clone();
            tokio::spawn(async move {
                db.update_order_by_accrual(&order_id, OrderStatusType::Processing, Points::default()).await?;
                db.update_order_by_accrual(&order_id, OrderStatusType::Processed, Points::from_points(1)).await
            })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        let upd = task.await.unwrap().expect("Concurrent ledger update failed");
        assert_eq!(upd.credited(), Points::from_points(1));
    }

    let alice = db.fetch_user_account(alice.id).await.unwrap().unwrap();
    assert_eq!(alice.balance, Points::from_points(40));
    assert!(db.fetch_unfinished_orders().await.unwrap().is_empty());
    db.close().await.unwrap();
    tear_down(&url).await;
}

#[tokio::test]
async fn concurrent_withdrawals_never_overdraw() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let alice = db.create_user_account("alice").await.unwrap();
    let earned = numbered(0);
    db.insert_order(NewOrder::new(earned.clone(), alice.id)).await.unwrap();
    db.update_order_by_accrual(&earned, OrderStatusType::Processed, Points::from_points(100)).await.unwrap();

    let user_id = alice.id;
    let tasks = (1..=20)
        .map(|n| {
            let db = db.clone();
            tokio::spawn(async move { db.register_withdrawal(user_id, &numbered(n), Points::from_points(10)).await })
        })
        .collect::<Vec<_>>();
    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(StorageError::InsufficientBalance { .. }) => {},
            Err(e) => panic!("Unexpected withdrawal error: {e}"),
        }
    }
    assert_eq!(accepted, 10);
    let alice = db.fetch_user_account(user_id).await.unwrap().unwrap();
    assert!(alice.balance.is_zero());
    assert_eq!(alice.withdrawn, Points::from_points(100));
    db.close().await.unwrap();
    tear_down(&url).await;
}

#[tokio::test]
async fn oversized_credits_are_rejected() {
    let url = random_db_path();
    let mut db = prepare_test_env(&url).await;
    let alice = db.create_user_account("alice").await.unwrap();
    let (first, second) = (numbered(1), numbered(2));
    db.insert_order(NewOrder::new(first.clone(), alice.id)).await.unwrap();
    db.insert_order(NewOrder::new(second.clone(), alice.id)).await.unwrap();
    let huge = Points::try_from_f64(9.0e16).unwrap();
    db.update_order_by_accrual(&first, OrderStatusType::Processed, huge).await.unwrap();
    let err = db.update_order_by_accrual(&second, OrderStatusType::Processed, huge).await.unwrap_err();
    assert_eq!(err, LedgerError::BalanceOverflow { user_id: alice.id, credited: huge });
    assert_eq!(db.fetch_order(&second).await.unwrap().unwrap().status, OrderStatusType::New);
    assert_eq!(db.fetch_user_account(alice.id).await.unwrap().unwrap().balance, huge);
    db.close().await.unwrap();
    tear_down(&url).await;
}
