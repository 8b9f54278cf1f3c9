// Insert size estimation
//
// Online mean/variance of the fragment length distribution, updated from
// confidently mapped proper pairs as a side effect of paired-end mapping.
// Welford's one-pass algorithm; observations at or above the chimera cutoff
// are discarded. Callers stop feeding the estimator once `sample_size`
// reaches SAMPLE_SIZE_CAP, so the estimate settles early in the run.

/// Observations at least this far apart are assumed chimeric and ignored
const MAX_INSERT_OBSERVATION: usize = 2000;

/// Callers stop updating once this many samples have been consumed
pub const SAMPLE_SIZE_CAP: usize = 400;

#[derive(Debug, Clone)]
pub struct InsertSizeDistribution {
    pub mu: f32,
    pub sigma: f32,
    pub v: f32,
    pub sse: f32,
    pub sample_size: usize,
}

impl Default for InsertSizeDistribution {
    fn default() -> Self {
        InsertSizeDistribution {
            mu: 0.0,
            sigma: 0.0,
            v: 0.0,
            sse: 0.0,
            sample_size: 1,
        }
    }
}

impl InsertSizeDistribution {
    /// Consume one observed proper-pair distance
    pub fn update(&mut self, dist: usize) {
        if dist >= MAX_INSERT_OBSERVATION {
            return;
        }
        let dist = dist as f32;
        let e = dist - self.mu;
        self.mu += e / self.sample_size as f32;
        self.sse += e * (dist - self.mu);
        self.v = if self.sample_size > 1 {
            self.sse / (self.sample_size - 1) as f32
        } else {
            self.sse
        };
        self.sigma = self.v.sqrt();
        self.sample_size += 1;
        // Numeric anomalies are logged but never fatal; the estimate stays usable
        if self.mu < 0.0 {
            log::warn!(
                "insert size mean went negative: mu={} sigma={} sse={} samples={}",
                self.mu,
                self.sigma,
                self.sse,
                self.sample_size
            );
        }
        if self.sse < 0.0 {
            log::warn!(
                "insert size SSE went negative: mu={} sigma={} sse={} samples={}",
                self.mu,
                self.sigma,
                self.sse,
                self.sample_size
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn first_observation_sets_the_mean() {
        let mut isize_est = InsertSizeDistribution::default();
        isize_est.update(300);
        assert_eq!(isize_est.mu, 300.0);
        assert_eq!(isize_est.sigma, 0.0);
        assert_eq!(isize_est.sample_size, 2);
    }

    #[test]
    fn chimeric_observations_are_discarded() {
        let mut isize_est = InsertSizeDistribution::default();
        isize_est.update(300);
        isize_est.update(2000);
        isize_est.update(50_000);
        assert_eq!(isize_est.sample_size, 2);
        assert_eq!(isize_est.mu, 300.0);
    }

    #[test]
    fn converges_on_normal_samples() {
        let normal = Normal::new(300.0f32, 30.0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut isize_est = InsertSizeDistribution::default();
        // Mimic the drivers: stop feeding once the sample cap is reached
        while isize_est.sample_size < SAMPLE_SIZE_CAP {
            let d = normal.sample(&mut rng).max(0.0).round() as usize;
            isize_est.update(d);
        }
        assert_eq!(isize_est.sample_size, SAMPLE_SIZE_CAP);
        assert!((isize_est.mu - 300.0).abs() < 5.0, "mu={}", isize_est.mu);
        assert!(
            (isize_est.sigma - 30.0).abs() < 5.0,
            "sigma={}",
            isize_est.sigma
        );
    }

    #[test]
    fn variance_tracks_spread() {
        let mut isize_est = InsertSizeDistribution::default();
        for d in [280, 300, 320, 280, 300, 320, 280, 300, 320] {
            isize_est.update(d);
        }
        assert!((isize_est.mu - 300.0).abs() < 1.0);
        assert!(isize_est.sigma > 10.0 && isize_est.sigma < 25.0);
    }
}
