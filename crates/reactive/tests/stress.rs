//! Concurrent writers against live observations.
//!
//! Every delivered value must correspond to a committed state, values must
//! arrive in commit order, and the last value must match a direct read once
//! the writers are done.

use lookout_core::{Row, Value};
use lookout_reactive::{ValueObservation, ValueStream};
use lookout_storage::{Store, TableSchema, Version};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WRITERS: usize = 50;
const WRITES_PER_THREAD: usize = 20;
const PLAYERS: u64 = 16;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn total(rows: &[Row], column: usize) -> i64 {
    rows.iter()
        .filter_map(|row| row.get(column).and_then(Value::as_i64))
        .sum()
}

/// Drains `stream` until it reports `version`, checking every value on the way.
fn follow(
    stream: &mut ValueStream<(Version, i64)>,
    version: Version,
    history: &BTreeMap<Version, i64>,
) -> i64 {
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut last: Option<(Version, i64)> = None;
    loop {
        assert!(Instant::now() < deadline, "observation did not reach version {}", version);
        let Some(item) = stream.recv_timeout(Duration::from_millis(100)) else {
            continue;
        };
        let (seen, value) = item.expect("observation failed");
        if let Some((previous, _)) = last {
            assert!(seen > previous, "version {} delivered after {}", seen, previous);
        }
        assert_eq!(history.get(&seen), Some(&value), "value at version {}", seen);
        last = Some((seen, value));
        if seen == version {
            return value;
        }
    }
}

#[test]
fn concurrent_writers_observe_committed_states() {
    init_tracing();
    let store = Store::in_memory();
    store
        .create_table(TableSchema::new("players", ["id", "score", "touches"]))
        .unwrap();

    // Totals of the score column at every committed version
    let history = Arc::new(Mutex::new(BTreeMap::new()));
    history.lock().insert(store.version().unwrap(), 0i64);

    let mut scores = ValueObservation::tracking(|tx| {
        let rows = tx.scan("players")?;
        Ok((tx.version(), total(&rows, 1)))
    })
    .values(&store);

    let writers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let store = store.clone();
            let history = Arc::clone(&history);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..WRITES_PER_THREAD {
                    let id = rng.gen_range(0..PLAYERS);
                    let score = rng.gen_range(-100i64..100);
                    store
                        .write(|tx| {
                            let touches = tx
                                .get("players", id)?
                                .and_then(|row| row.get(2).and_then(Value::as_i64))
                                .unwrap_or(0);
                            tx.upsert(
                                "players",
                                Row::new(
                                    id,
                                    vec![
                                        Value::Int64(id as i64),
                                        Value::Int64(score),
                                        Value::Int64(touches + 1),
                                    ],
                                ),
                            )?;
                            let sum = total(&tx.scan("players")?, 1);
                            history.lock().insert(tx.base_version() + 1, sum);
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    let final_version = store.version().unwrap();
    let history = history.lock().clone();
    assert_eq!(history.len(), WRITERS * WRITES_PER_THREAD + 1);
    assert_eq!(history.keys().next_back(), Some(&final_version));

    let delivered = follow(&mut scores, final_version, &history);
    let direct = store
        .read(|tx| tx.scan_columns("players", &["score"]))
        .map(|rows| total(&rows, 0))
        .unwrap();
    assert_eq!(delivered, direct);
}

#[test]
fn many_observations_with_concurrent_writers() {
    init_tracing();
    let store = Store::in_memory();
    store
        .create_table(TableSchema::new("players", ["id", "score", "touches"]))
        .unwrap();

    let mut streams: Vec<ValueStream<(Version, usize)>> = (0..8)
        .map(|_| {
            ValueObservation::tracking(|tx| Ok((tx.version(), tx.count("players")?)))
                .values(&store)
        })
        .collect();

    let writers: Vec<_> = (0..WRITERS / 5)
        .map(|n| {
            let store = store.clone();
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..WRITES_PER_THREAD {
                    let id = (n * WRITES_PER_THREAD + i) as u64;
                    let score = rng.gen_range(0i64..10);
                    store
                        .write(|tx| {
                            tx.insert(
                                "players",
                                Row::new(
                                    id,
                                    vec![Value::Int64(id as i64), Value::Int64(score), Value::Int64(1)],
                                ),
                            )
                            .map(|_| ())
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    let final_version = store.version().unwrap();
    let expected = (WRITERS / 5) * WRITES_PER_THREAD;
    for stream in &mut streams {
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut previous = 0;
        loop {
            assert!(Instant::now() < deadline, "observation stalled");
            let Some(item) = stream.recv_timeout(Duration::from_millis(100)) else {
                continue;
            };
            let (version, count) = item.unwrap();
            // One insert per commit after table creation
            assert!(count >= previous);
            assert_eq!(version as usize, count + 1);
            previous = count;
            if version == final_version {
                assert_eq!(count, expected);
                break;
            }
        }
    }
}
