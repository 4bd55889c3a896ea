use std::sync::Arc;

use carepath_core::audit::{AuditContext, InMemoryAuditSink};
use carepath_core::domain::entity::EntityRef;
use carepath_core::domain::status::{BookingStatus, EntityKind, PaymentStatus, Status};
use carepath_core::errors::{ApplicationError, DomainError};
use carepath_core::lifecycle::TransitionValidator;
use carepath_core::ports::EntityStateStore;
use carepath_db::{connect_with_settings, migrations, SqlEntityStateStore, TransitionCoordinator};
use serde_json::Value;

type ContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

async fn file_store(path: &std::path::Path) -> ContractTestResult<SqlEntityStateStore> {
    pooled_file_store(path, 1).await
}

async fn pooled_file_store(
    path: &std::path::Path,
    max_connections: u32,
) -> ContractTestResult<SqlEntityStateStore> {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = connect_with_settings(&url, max_connections, 30)
        .await
        .map_err(|error| format!("connect {url}: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    Ok(SqlEntityStateStore::new(pool))
}

fn payment() -> EntityRef {
    EntityRef::new(EntityKind::Payment, "PAY-900")
}

fn status(value: PaymentStatus) -> Status {
    value.into()
}

#[tokio::test]
async fn payment_lifecycle_survives_reconnect_with_full_history() -> ContractTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let path = dir.path().join("carepath.db");
    let context = AuditContext::new(Some(payment()), "contract-1", "contract");

    {
        let coordinator = TransitionCoordinator::new(
            file_store(&path).await?,
            TransitionValidator::default(),
            InMemoryAuditSink::default(),
            3,
        );
        coordinator.open(&payment(), &context).await.map_err(|error| error.to_string())?;
        coordinator
            .request_transition(&payment(), status(PaymentStatus::Processing), &context)
            .await
            .map_err(|error| error.to_string())?;
        coordinator
            .request_transition(&payment(), status(PaymentStatus::Failed), &context)
            .await
            .map_err(|error| error.to_string())?;
    }

    let reopened = file_store(&path).await?;
    let state = reopened
        .load(&payment())
        .await
        .map_err(|error| error.to_string())?
        .ok_or_else(|| "payment should still exist after reconnect".to_owned())?;
    require_eq!(state.status, status(PaymentStatus::Failed));
    require_eq!(state.version, 3);

    let history = reopened.history(&payment()).await.map_err(|error| error.to_string())?;
    require_eq!(history.len(), 3, "one history row per stored version, got {}", history.len());
    require!(history[0].from.is_none(), "creation row should have no source status");
    require_eq!(history[2].from, Some(status(PaymentStatus::Processing)));

    let versions: Vec<u64> = history.iter().map(|record| record.version).collect();
    require_eq!(versions, vec![1, 2, 3]);

    let serialized =
        serde_json::to_value(&history[2]).map_err(|error| format!("serialize: {error}"))?;
    let to = serialized.get("to").ok_or_else(|| "to should be present".to_owned())?;
    require_eq!(to.get("kind").and_then(Value::as_str), Some("payment"));
    require_eq!(to.get("status").and_then(Value::as_str), Some("failed"));

    Ok(())
}

#[tokio::test]
async fn stale_version_is_rejected_and_leaves_row_unchanged() -> ContractTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let store = file_store(&dir.path().join("stale.db")).await?;

    store
        .create(&payment(), status(PaymentStatus::Pending))
        .await
        .map_err(|error| error.to_string())?;
    store
        .store(&payment(), status(PaymentStatus::Processing), 1)
        .await
        .map_err(|error| error.to_string())?;

    let stale = store.store(&payment(), status(PaymentStatus::Cancelled), 1).await;
    let expected = ApplicationError::Domain(DomainError::ConcurrentModification {
        entity: payment(),
        expected: 1,
        actual: 2,
    });
    require_eq!(stale, Err::<carepath_core::VersionedState, ApplicationError>(expected.clone()));

    let state = store
        .load(&payment())
        .await
        .map_err(|error| error.to_string())?
        .ok_or_else(|| "payment should exist".to_owned())?;
    require_eq!(state.status, status(PaymentStatus::Processing));
    require_eq!(state.version, 2);
    Ok(())
}

#[tokio::test]
async fn duplicate_create_is_a_persistence_failure() -> ContractTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let store = file_store(&dir.path().join("dup.db")).await?;

    store
        .create(&payment(), status(PaymentStatus::Pending))
        .await
        .map_err(|error| error.to_string())?;
    let duplicate = store.create(&payment(), status(PaymentStatus::Pending)).await;

    require!(
        matches!(duplicate, Err(ApplicationError::Persistence(_))),
        "second create should fail, got {duplicate:?}"
    );
    Ok(())
}

const WRITERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_on_separate_connections_lose_with_version_conflicts(
) -> ContractTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let store = Arc::new(pooled_file_store(&dir.path().join("contended.db"), 8).await?);

    for round in 0..5 {
        let booking = EntityRef::new(EntityKind::Booking, format!("BK-RACE-{round}"));
        store
            .create(&booking, BookingStatus::Pending.into())
            .await
            .map_err(|error| error.to_string())?;

        let mut writers = Vec::with_capacity(WRITERS);
        for _ in 0..WRITERS {
            let store = Arc::clone(&store);
            let booking = booking.clone();
            writers.push(tokio::spawn(async move {
                store.store(&booking, BookingStatus::Confirmed.into(), 1).await
            }));
        }

        let mut stored = 0;
        let mut conflicts = 0;
        for writer in writers {
            match writer.await.map_err(|error| format!("writer task: {error}"))? {
                Ok(state) => {
                    require_eq!(state.version, 2);
                    stored += 1;
                }
                Err(ApplicationError::Domain(DomainError::ConcurrentModification {
                    expected: 1,
                    actual: 2,
                    ..
                })) => conflicts += 1,
                Err(other) => {
                    return Err(format!(
                        "round {round}: writer failed outside the version check: {other:?}"
                    ));
                }
            }
        }
        require_eq!(stored, 1, "round {round}: exactly one writer should win, got {stored}");
        require_eq!(conflicts, WRITERS - 1);

        let history = store.history(&booking).await.map_err(|error| error.to_string())?;
        require_eq!(history.len(), 2, "round {round}: losers must not write history rows");
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_coordinated_transitions_resolve_without_persistence_errors(
) -> ContractTestResult {
    let dir = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let coordinator = Arc::new(TransitionCoordinator::new(
        pooled_file_store(&dir.path().join("coordinated.db"), 8).await?,
        TransitionValidator::default(),
        InMemoryAuditSink::default(),
        3,
    ));
    let booking = EntityRef::new(EntityKind::Booking, "BK-RACE-COORD");
    let context = AuditContext::new(Some(booking.clone()), "contract-race", "contract");
    coordinator.open(&booking, &context).await.map_err(|error| error.to_string())?;

    let mut requests = Vec::with_capacity(WRITERS);
    for _ in 0..WRITERS {
        let coordinator = Arc::clone(&coordinator);
        let booking = booking.clone();
        let context = context.clone();
        requests.push(tokio::spawn(async move {
            coordinator.request_transition(&booking, BookingStatus::Confirmed.into(), &context).await
        }));
    }

    let mut confirmed = 0;
    for request in requests {
        match request.await.map_err(|error| format!("request task: {error}"))? {
            Ok(_) => confirmed += 1,
            Err(ApplicationError::Domain(DomainError::TransitionDenied { .. })) => {}
            Err(other) => return Err(format!("unexpected failure: {other:?}")),
        }
    }
    require_eq!(confirmed, 1, "exactly one request should confirm the booking, got {confirmed}");

    let state = coordinator
        .store()
        .load(&booking)
        .await
        .map_err(|error| error.to_string())?
        .ok_or_else(|| "booking should exist".to_owned())?;
    require_eq!(state.status, Status::from(BookingStatus::Confirmed));
    require_eq!(state.version, 2);
    Ok(())
}
