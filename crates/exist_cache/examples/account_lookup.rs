// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fronts a slow account table with an exist cache.
//!
//! Many threads ask about the same accounts at once; the table is only queried once per
//! unknown account, and accounts created later are picked up on the next miss.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use exist_cache::{Context, ExistCache, Loader};
use parking_lot::RwLock;

struct AccountTable {
    ids: RwLock<HashSet<i64>>,
    queries: AtomicUsize,
}

impl Loader for AccountTable {
    fn load(&self, ctx: &Context, id: i64) -> bool {
        if ctx.is_cancelled() {
            return false;
        }
        self.queries.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        self.ids.read().contains(&id)
    }
}

struct SharedTable(Arc<AccountTable>);

impl Loader for SharedTable {
    fn load(&self, ctx: &Context, id: i64) -> bool {
        self.0.load(ctx, id)
    }
}

fn main() {
    let table = Arc::new(AccountTable {
        ids: RwLock::new((1..=100).collect()),
        queries: AtomicUsize::new(0),
    });

    let cache = ExistCache::builder()
        .loader(SharedTable(Arc::clone(&table)))
        .shard_count(16)
        .size(10_000)
        .eviction(true)
        .build()
        .expect("16 shards is a valid configuration");

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || {
                let ctx = Context::background().with_timeout(Duration::from_secs(1));
                (1..=20).filter(|id| cache.has(&ctx, *id)).count()
            })
        })
        .collect();

    for worker in workers {
        let found = worker.join().expect("worker panicked");
        println!("worker saw {found} existing accounts");
    }
    println!("table queried {} times for 20 distinct accounts", table.queries.load(Ordering::Relaxed));

    let ctx = Context::background();
    println!("account 500 exists: {}", cache.has(&ctx, 500));
    table.ids.write().insert(500);
    println!("account 500 exists after creation: {}", cache.has(&ctx, 500));

    cache.set(&ctx, 501);
    println!("account 501 seeded: {}", cache.has(&ctx, 501));
    println!("resident keys: {}", cache.len());
}
