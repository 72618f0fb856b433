// crates/requirement-gate-core/src/runtime/cache.rs
// ============================================================================
// Module: Requirement Gate Caches
// Description: Denial message deduplication and calculation result caching.
// Purpose: Keep parallel invocations quiet and avoid repeated expensive calculations.
// Dependencies: crate::{core, interfaces, telemetry}, serde_json
// ============================================================================

//! ## Overview
//! Both caches sit on a [`TtlStore`] handle. Every cache failure degrades to
//! the uncached behavior: the dedup cache answers "show the full message" and
//! the calculation cache recomputes. Failures are logged, never raised.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::core::Clock;
use crate::core::sha256_hex;
use crate::interfaces::CacheRecord;
use crate::interfaces::CalculatedValue;
use crate::interfaces::CalculatorError;
use crate::interfaces::TtlStore;
use crate::telemetry::EventLevel;
use crate::telemetry::EventSink;
use crate::telemetry::GateEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default dedup window for repeated denials (seconds).
pub const DEFAULT_DEDUP_TTL_SECS: u64 = 5;

// ============================================================================
// SECTION: Dedup Cache
// ============================================================================

/// Suppresses repeated identical denials across rapid parallel invocations.
#[derive(Clone)]
pub struct DedupCache {
    /// Backing store.
    store: Arc<dyn TtlStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Event sink for degraded paths.
    sink: Arc<dyn EventSink>,
}

impl DedupCache {
    /// Creates a dedup cache over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TtlStore>, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            clock,
            sink,
        }
    }

    /// Returns true when the full message should be shown for `key`.
    ///
    /// The answer is true only when no unexpired entry exists for `key`; the
    /// decision uses the entry timestamp, not message equality. A true answer
    /// records the message fingerprint so later calls within `ttl_secs` are
    /// suppressed.
    #[must_use]
    pub fn should_show_full_message(&self, key: &str, message: &str, ttl_secs: u64) -> bool {
        let now = self.clock.now();
        let fingerprint = sha256_hex(message.as_bytes());
        let mut show = true;
        let result = self.store.update(key, now, &mut |existing| {
            if existing.is_some_and(|record| record.is_fresh(now)) {
                show = false;
                return None;
            }
            Some(CacheRecord {
                value: Value::String(fingerprint.clone()),
                stored_at: now,
                ttl_secs,
            })
        });
        if let Err(err) = result {
            self.sink.record(
                &GateEvent::new("dedup_cache_unavailable", EventLevel::Warn, now).with_message(err.to_string()),
            );
            return true;
        }
        show
    }
}

// ============================================================================
// SECTION: Calculation Cache
// ============================================================================

/// Short-lived cache of calculator results.
#[derive(Clone)]
pub struct CalculationCache {
    /// Backing store.
    store: Arc<dyn TtlStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Event sink for degraded paths.
    sink: Arc<dyn EventSink>,
}

impl CalculationCache {
    /// Creates a calculation cache over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TtlStore>, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            clock,
            sink,
        }
    }

    /// Returns the cached value for `key`, computing and storing it when stale.
    ///
    /// # Errors
    ///
    /// Returns [`CalculatorError`] when `compute` fails. Cache failures are
    /// logged and never returned.
    pub fn get_or_compute<F>(&self, key: &str, ttl_secs: u64, compute: F) -> Result<CalculatedValue, CalculatorError>
    where
        F: FnOnce() -> Result<CalculatedValue, CalculatorError>,
    {
        let now = self.clock.now();
        match self.store.get(key) {
            Ok(Some(record)) if record.is_fresh(now) => {
                match serde_json::from_value::<CalculatedValue>(record.value) {
                    Ok(value) => return Ok(value),
                    Err(err) => self.degraded("calculation_cache_corrupt", &err.to_string()),
                }
            }
            Ok(_) => {}
            Err(err) => self.degraded("calculation_cache_unavailable", &err.to_string()),
        }
        let value = compute()?;
        match serde_json::to_value(&value) {
            Ok(payload) => {
                let stored_at = self.clock.now();
                let mut record = Some(CacheRecord {
                    value: payload,
                    stored_at,
                    ttl_secs,
                });
                if let Err(err) = self.store.update(key, stored_at, &mut |_| record.take()) {
                    self.degraded("calculation_cache_unavailable", &err.to_string());
                }
            }
            Err(err) => self.degraded("calculation_cache_corrupt", &err.to_string()),
        }
        Ok(value)
    }

    /// Records a degraded-cache event.
    fn degraded(&self, event: &'static str, message: &str) {
        self.sink.record(&GateEvent::new(event, EventLevel::Warn, self.clock.now()).with_message(message));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
