use super::axis::Axis;

/// Scalar Kalman filter with an identity motion model: the true state is
/// assumed to change slowly relative to the sampling interval, so the
/// prediction step only inflates the error covariance by the process noise.
#[derive(Debug, Clone, Copy)]
pub struct KalmanFilter {
    estimate: f64,
    covariance: f64,
    /// Process-noise variance
    q: f64,
    /// Measurement-noise variance
    r: f64,
    /// Covariance restored by [KalmanFilter::reset]
    initial_covariance: f64,
}

impl KalmanFilter {
    pub fn new(q: f64, r: f64, initial_covariance: f64) -> Self {
        Self {
            estimate: 0.0,
            covariance: initial_covariance,
            q,
            r,
            initial_covariance,
        }
    }

    /// Fold one measurement into the estimate and return the new estimate
    pub fn update(&mut self, measurement: f64) -> f64 {
        let predicted_covariance = self.covariance + self.q;
        let gain = predicted_covariance / (predicted_covariance + self.r);
        self.estimate += gain * (measurement - self.estimate);
        self.covariance = (1.0 - gain) * predicted_covariance;
        self.estimate
    }

    /// Reinitialize the estimate to zero and the covariance to its
    /// configured initial value
    pub fn reset(&mut self) {
        self.estimate = 0.0;
        self.covariance = self.initial_covariance;
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn covariance(&self) -> f64 {
        self.covariance
    }
}

/// One independent [KalmanFilter] per motion axis. No cross-axis coupling.
#[derive(Debug, Clone)]
pub struct FilterBank {
    filters: [KalmanFilter; 6],
}

impl FilterBank {
    pub fn new(q: f64, r: f64, initial_covariance: f64) -> Self {
        Self {
            filters: [KalmanFilter::new(q, r, initial_covariance); 6],
        }
    }

    pub fn update(&mut self, axis: Axis, measurement: f64) -> f64 {
        self.filters[axis.index()].update(measurement)
    }

    pub fn estimate(&self, axis: Axis) -> f64 {
        self.filters[axis.index()].estimate()
    }

    /// Latest smoothed estimate for all six axes
    pub fn estimates(&self) -> [f64; 6] {
        let mut values = [0.0; 6];
        for axis in Axis::ALL {
            values[axis.index()] = self.filters[axis.index()].estimate();
        }
        values
    }

    pub fn reset_axis(&mut self, axis: Axis) {
        self.filters[axis.index()].reset();
    }

    /// Reset all six filters, called on device (re)connect
    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut() {
            filter.reset();
        }
    }
}
