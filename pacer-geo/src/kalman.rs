//! Scalar Kalman filters for GPS noise reduction.
//!
//! The correction pipeline runs three independent 1-D filters, one per
//! spatial axis (latitude, longitude, altitude), rather than a coupled
//! model with velocity state. Each step is the textbook scalar form:
//!
//! ```text
//! predict:  x' = x            P' = P + Q
//! update:   K  = P' / (P' + R)
//!           x'' = x' + K (z − x')
//!           P'' = (1 − K) P'
//! ```
//!
//! Filter state lives only for the duration of one correction request;
//! it is re-seeded from the participant's last corrected coordinates on
//! the next request.

use serde::{Deserialize, Serialize};

/// Process noise for the position axes (degrees²).
pub const Q_POSITION: f64 = 1e-3;
/// Default measurement noise for the position axes (degrees²).
pub const R_POSITION: f64 = 1e-2;
/// Process noise for the altitude axis (metres²).
pub const Q_ALTITUDE: f64 = 1e-2;
/// Default measurement noise for the altitude axis (metres²).
pub const R_ALTITUDE: f64 = 2.0;

/// Reported-accuracy divisor for the position axes: `R = max(a/10, R_pos)`.
const ACCURACY_SCALE_POSITION: f64 = 10.0;
/// Reported-accuracy divisor for the altitude axis: `R = max(a/5, R_alt)`.
const ACCURACY_SCALE_ALTITUDE: f64 = 5.0;

/// Seed covariance when the state comes from a previous request's
/// corrected coordinate rather than a fresh measurement. Wide on
/// purpose: the prior anchors continuity, but a possibly minutes-old
/// estimate must not drag a fresh fix (seconds of running covers tens
/// of metres).
const STALE_SEED_VARIANCE_POSITION: f64 = 1.0;
const STALE_SEED_VARIANCE_ALTITUDE: f64 = 100.0;

/// A single-axis scalar Kalman filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisFilter {
    x: f64,
    p: f64,
    q: f64,
    initialized: bool,
}

impl AxisFilter {
    pub fn new(process_noise: f64) -> Self {
        Self {
            x: 0.0,
            p: 0.0,
            q: process_noise,
            initialized: false,
        }
    }

    /// Initialise the state directly, bypassing the update step.
    /// Used both for the first measurement of a fresh filter and for
    /// seeding from a previously corrected coordinate.
    pub fn seed(&mut self, x: f64, p: f64) {
        self.x = x;
        self.p = p;
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current state estimate, if any measurement has been absorbed.
    pub fn estimate(&self) -> Option<f64> {
        self.initialized.then_some(self.x)
    }

    /// Current estimate covariance.
    pub fn covariance(&self) -> f64 {
        self.p
    }

    /// Absorb a measurement `z` with measurement noise `r` and return
    /// the new estimate. The first measurement seeds the state and is
    /// returned unchanged.
    pub fn step(&mut self, z: f64, r: f64) -> f64 {
        if !self.initialized {
            self.seed(z, r);
            return z;
        }

        // predict
        self.p += self.q;

        // update
        let k = self.p / (self.p + r);
        self.x += k * (z - self.x);
        self.p *= 1.0 - k;

        self.x
    }
}

/// How much to trust one measurement: the device-reported horizontal
/// accuracy (metres, bigger = worse) and an optional confidence factor
/// in `[0.1, 1.0]` (smaller = worse) that divides the measurement noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementTrust {
    pub accuracy_m: Option<f64>,
    pub confidence: Option<f64>,
}

impl MeasurementTrust {
    fn effective_r(&self, base_r: f64, accuracy_scale: f64) -> f64 {
        let mut r = base_r;
        if let Some(a) = self.accuracy_m {
            r = r.max(a / accuracy_scale);
        }
        if let Some(c) = self.confidence {
            r /= c.clamp(0.1, 1.0);
        }
        r
    }
}

/// Output of one [`GpsKalman::filter`] step.
#[derive(Debug, Clone, Copy)]
pub struct FilteredFix {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
}

/// The three-axis filter bundle applied to one participant's fixes
/// within a single correction request.
#[derive(Debug, Clone)]
pub struct GpsKalman {
    lat: AxisFilter,
    lon: AxisFilter,
    alt: AxisFilter,
}

impl GpsKalman {
    pub fn new() -> Self {
        Self {
            lat: AxisFilter::new(Q_POSITION),
            lon: AxisFilter::new(Q_POSITION),
            alt: AxisFilter::new(Q_ALTITUDE),
        }
    }

    /// Build a filter pre-seeded from previously corrected coordinates,
    /// so the first fix of this request is an update rather than an
    /// initialisation. The seed carries the stale-prior covariance, not
    /// the measurement noise.
    pub fn seeded(lat: f64, lon: f64, altitude: Option<f64>) -> Self {
        let mut filter = Self::new();
        filter.lat.seed(lat, STALE_SEED_VARIANCE_POSITION);
        filter.lon.seed(lon, STALE_SEED_VARIANCE_POSITION);
        if let Some(alt) = altitude {
            filter.alt.seed(alt, STALE_SEED_VARIANCE_ALTITUDE);
        }
        filter
    }

    /// Filter one raw fix. Axes without a measurement (altitude) keep
    /// their previous estimate, if any.
    pub fn filter(
        &mut self,
        lat: f64,
        lon: f64,
        altitude: Option<f64>,
        trust: MeasurementTrust,
    ) -> FilteredFix {
        let r_pos = trust.effective_r(R_POSITION, ACCURACY_SCALE_POSITION);
        let r_alt = trust.effective_r(R_ALTITUDE, ACCURACY_SCALE_ALTITUDE);

        let lat = self.lat.step(lat, r_pos);
        let lon = self.lon.step(lon, r_pos);
        let altitude = match altitude {
            Some(z) => Some(self.alt.step(z, r_alt)),
            None => self.alt.estimate(),
        };

        FilteredFix { lat, lon, altitude }
    }
}

impl Default for GpsKalman {
    fn default() -> Self {
        Self::new()
    }
}
