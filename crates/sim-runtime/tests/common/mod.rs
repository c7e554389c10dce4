#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sim_core::{CellStore, MemoryStore, SimConfig, StoreError};
use sim_runtime::{builtin_config, demo, Region};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Builtin config with the demo world seeded for every region.
pub fn seeded() -> (SimConfig, MemoryStore) {
    let cfg = builtin_config();
    let store = demo::demo_store(&cfg);
    (cfg, store)
}

pub fn region(cfg: &SimConfig, index: usize) -> Region {
    Region::from_config(&cfg.regions[index]).expect("builtin region is complete")
}

/// Counts WARN events seen by the subscriber.
#[derive(Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Store that refuses writes to one table.
pub struct LockedTable {
    pub inner: MemoryStore,
    pub locked: String,
}

impl CellStore for LockedTable {
    fn read_value(&self, table: &str, row: &str, column: &str) -> Option<String> {
        self.inner.read_value(table, row, column)
    }

    fn write_value(
        &mut self,
        table: &str,
        row: &str,
        column: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if table == self.locked {
            return Err(StoreError::ReadOnly(table.to_string()));
        }
        self.inner.write_value(table, row, column, value)
    }
}
