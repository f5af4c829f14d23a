//! End-to-end relay: table trigger -> `pg_notify` -> listener -> bus.

use std::sync::Arc;
use std::time::Duration;

use dealerhub_core::sync::{ChangeAction, ChangeNotice};
use dealerhub_events::bus::EventBus;
use dealerhub_events::listener::ChangeFeedListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

async fn insert_pricing(pool: &PgPool, dealer_id: i64, item_id: &str) {
    sqlx::query(
        "INSERT INTO dealer_pricing (dealer_id, item_type, item_id, item_name, sale_price_usd)
         VALUES ($1, 'boat_model', $2, 'Tour 28', 55000)",
    )
    .bind(dealer_id)
    .bind(item_id)
    .execute(pool)
    .await
    .unwrap();
}

/// Next notice for `table`, skipping others. `None` on timeout.
async fn next_for(
    rx: &mut broadcast::Receiver<ChangeNotice>,
    table: &str,
    wait: Duration,
) -> Option<ChangeNotice> {
    tokio::time::timeout(wait, async {
        loop {
            match rx.recv().await {
                Ok(notice) if notice.table == table => return notice,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .ok()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pricing_write_reaches_the_bus(pool: PgPool) {
    let (dealer_id,): (i64,) = sqlx::query_as(
        "INSERT INTO dealers (name, email) VALUES ('Dealer A', 'a@dealers.test') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let cancel = CancellationToken::new();
    let listener = tokio::spawn(
        ChangeFeedListener::new(pool.clone(), Arc::clone(&bus)).run(cancel.clone()),
    );

    // The LISTEN may not be registered yet; write until a notice arrives.
    let mut notice = None;
    for attempt in 0..50 {
        insert_pricing(&pool, dealer_id, &format!("item-{attempt}")).await;
        notice = next_for(&mut rx, "dealer_pricing", Duration::from_millis(200)).await;
        if notice.is_some() {
            break;
        }
    }
    let notice = notice.expect("trigger notice relayed to the bus");
    assert_eq!(notice.action, ChangeAction::Insert);
    assert_eq!(notice.dealer_id, Some(dealer_id.to_string()));
    assert!(notice.record_id.is_some());
    assert!(notice.timestamp > 0);

    // Deletes are relayed too, with the dealer taken from the old row.
    sqlx::query("DELETE FROM dealer_pricing WHERE dealer_id = $1")
        .bind(dealer_id)
        .execute(&pool)
        .await
        .unwrap();
    let deleted = loop {
        let notice = next_for(&mut rx, "dealer_pricing", Duration::from_secs(5))
            .await
            .expect("delete notice relayed");
        if notice.action == ChangeAction::Delete {
            break notice;
        }
    };
    assert_eq!(deleted.dealer_id, Some(dealer_id.to_string()));

    cancel.cancel();
    listener.await.unwrap();
}
