//! Geocoding abstraction layer with safety features
//!
//! Lookups are best-effort: a missing key, a failed request or an empty
//! result all end in the caller using a fallback coordinate, never in a
//! failed run.
//!
//! Configuration via GEOCODER_BACKEND env variable:
//! - "none" → no geocoder (all fallback coordinates)
//! - "mock" → MockGeocoder (tests, development)
//! - "here" → RateLimitedHereGeocoder (production, needs HERE_API_KEY)

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::{Config, GeocoderBackend};
use crate::services::here::HereClient;
use crate::types::Coordinates;

/// Geocoder trait - abstraction for all geocoding implementations
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocode an address to coordinates
    /// Returns None if address cannot be geocoded
    async fn geocode(&self, address: &str) -> Result<Option<GeocodingResult>>;

    /// Get the name of this geocoder implementation
    fn name(&self) -> &'static str;
}

/// Result of geocoding operation
#[derive(Debug, Clone)]
pub struct GeocodingResult {
    pub coordinates: Coordinates,
    /// Display name returned by geocoder
    pub display_name: String,
}

// ==========================================================================
// MockGeocoder Implementation
// ==========================================================================

/// Mock geocoder for testing - returns deterministic fake coordinates
pub struct MockGeocoder;

impl MockGeocoder {
    pub fn new() -> Self {
        Self
    }

    /// Generate deterministic coordinates from address hash, inside the
    /// Navegantes / Itajaí service area
    fn hash_to_coordinates(address: &str) -> Coordinates {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        address.trim().to_lowercase().hash(&mut hasher);
        let hash = hasher.finish();

        const LAT_MIN: f64 = -26.93;
        const LAT_MAX: f64 = -26.85;
        const LNG_MIN: f64 = -48.71;
        const LNG_MAX: f64 = -48.64;

        let lat_normalized = ((hash >> 32) as f64) / (u32::MAX as f64);
        let lng_normalized = ((hash & 0xFFFFFFFF) as f64) / (u32::MAX as f64);

        Coordinates {
            lat: LAT_MIN + lat_normalized * (LAT_MAX - LAT_MIN),
            lng: LNG_MIN + lng_normalized * (LNG_MAX - LNG_MIN),
        }
    }
}

impl Default for MockGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodingResult>> {
        Ok(Some(GeocodingResult {
            coordinates: Self::hash_to_coordinates(address),
            display_name: address.to_string(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ==========================================================================
// RateLimiter Implementation
// ==========================================================================

/// Rate limiter that enforces minimum interval between calls
pub struct RateLimiter {
    last_call: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// Wait until it's safe to make another call
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

// ==========================================================================
// CircuitBreaker Implementation
// ==========================================================================

/// Circuit breaker to prevent hammering a failing service
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    threshold: u32,
    last_failure: parking_lot::Mutex<Option<Instant>>,
    recovery_time: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_time: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            threshold,
            last_failure: parking_lot::Mutex::new(None),
            recovery_time,
        }
    }

    /// Check if circuit is open (blocking calls)
    pub fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return false;
        }
        match *self.last_failure.lock() {
            // Half-open: allow a retry once the recovery time has passed
            Some(last_time) => last_time.elapsed() < self.recovery_time,
            None => true,
        }
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(Instant::now());
    }

    /// Record a success (resets failure count)
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }
}

// ==========================================================================
// RateLimitedHereGeocoder Implementation
// ==========================================================================

/// Rate-limited HERE geocoder with circuit breaker protection
pub struct RateLimitedHereGeocoder {
    client: HereClient,
    rate_limiter: RateLimiter,
    pub(crate) circuit_breaker: CircuitBreaker,
}

impl RateLimitedHereGeocoder {
    pub fn with_config(
        base_url: &str,
        api_key: &str,
        rate_limit_interval: Duration,
        circuit_breaker_threshold: u32,
        circuit_breaker_recovery: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: HereClient::new(base_url, api_key)?,
            rate_limiter: RateLimiter::new(rate_limit_interval),
            circuit_breaker: CircuitBreaker::new(circuit_breaker_threshold, circuit_breaker_recovery),
        })
    }
}

#[async_trait]
impl Geocoder for RateLimitedHereGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodingResult>> {
        if self.circuit_breaker.is_open() {
            tracing::warn!("Circuit breaker is open, rejecting geocoding request");
            return Err(anyhow::anyhow!("Geocoding service temporarily unavailable (circuit breaker open)"));
        }

        self.rate_limiter.wait().await;

        match self.client.geocode(address).await {
            Ok(Some(found)) => {
                self.circuit_breaker.record_success();
                Ok(Some(GeocodingResult {
                    coordinates: found.coordinates,
                    display_name: found.title,
                }))
            }
            Ok(None) => {
                // No result found is not a failure
                self.circuit_breaker.record_success();
                Ok(None)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                tracing::error!("Geocoding failed for '{}': {}", address, e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "here"
    }
}

// ==========================================================================
// Factory function
// ==========================================================================

/// Create the configured geocoder, or None when lookups are disabled or the
/// HERE backend has no credential
pub fn create_geocoder(config: &Config) -> Result<Option<Box<dyn Geocoder>>> {
    match config.geocoder_backend {
        GeocoderBackend::None => {
            tracing::info!("Geocoding disabled, using fallback coordinates");
            Ok(None)
        }
        GeocoderBackend::Mock => {
            tracing::info!("Using MockGeocoder");
            Ok(Some(Box::new(MockGeocoder::new())))
        }
        GeocoderBackend::Here => match config.here_api_key.as_deref() {
            Some(key) => {
                tracing::info!("Using RateLimitedHereGeocoder");
                Ok(Some(Box::new(RateLimitedHereGeocoder::with_config(
                    &config.here_base_url,
                    key,
                    Duration::from_millis(config.here_rate_limit_ms),
                    config.here_cb_threshold,
                    Duration::from_secs(config.here_cb_recovery_secs),
                )?)))
            }
            None => {
                tracing::warn!("No HERE_API_KEY, using fallback coordinates");
                Ok(None)
            }
        },
    }
}
