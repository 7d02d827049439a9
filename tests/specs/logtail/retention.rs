//! Log tail specs
//!
//! Bounded retention and concurrent append/read.

use crate::prelude::*;
use std::thread;

fn record(n: usize) -> LogRecord {
    LogRecord::new(LogLevel::Info, format!("record {n}"), Default::default())
}

#[test]
fn bounded_tail_keeps_the_last_n_in_order() {
    let tail = LogTail::bounded(3);
    for n in 0..10 {
        tail.append(record(n));
    }

    let messages: Vec<String> = tail.snapshot().into_iter().map(|r| r.message).collect();
    assert_eq!(messages, vec!["record 7", "record 8", "record 9"]);
    assert_eq!(tail.evicted(), 7);
}

#[test]
fn unbounded_tail_keeps_everything() {
    let tail = LogTail::unbounded();
    for n in 0..500 {
        tail.append(record(n));
    }
    assert_eq!(tail.len(), 500);
}

#[test]
fn concurrent_writers_never_corrupt_the_tail() {
    let tail = Arc::new(LogTail::bounded(1_000));
    let writers: Vec<_> = (0..4)
        .map(|w| {
            let tail = Arc::clone(&tail);
            thread::spawn(move || {
                for n in 0..250 {
                    tail.append(record(w * 1_000 + n));
                }
            })
        })
        .collect();

    let reader = {
        let tail = Arc::clone(&tail);
        thread::spawn(move || {
            for _ in 0..50 {
                let snapshot = tail.snapshot();
                assert!(snapshot.len() <= 1_000);
                assert!(snapshot.iter().all(|r| r.message.starts_with("record ")));
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    let records = tail.snapshot();
    assert_eq!(records.len(), 1_000);
    for w in 0..4 {
        let mine: Vec<usize> = records
            .iter()
            .filter_map(|r| r.message.strip_prefix("record ")?.parse().ok())
            .filter(|n: &usize| n / 1_000 == w)
            .collect();
        assert!(mine.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
