//! Fix generation: each virtual runner moves along the course polyline
//! at a per-runner speed, sampled every Δt with bounded uniform GPS
//! error. Seeded, so a configuration replays identically.

use pacer_contracts::{GpsFix, Timestamp};
use pacer_course::Course;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Degrees of latitude per metre on the spherical model.
const DEG_PER_METER_LAT: f64 = 1.0 / 111_194.93;

/// Simulated GPS error never exceeds this, whatever the config asks.
const MAX_ERROR_M: f64 = 10.0;

/// Per-runner speed multipliers, cycled by runner index. Mixed around
/// 1.0 so a field of runners spreads out the way a real pack does.
const SPEED_FACTORS: [f64; 8] = [0.95, 1.00, 1.03, 0.98, 1.05, 1.01, 0.97, 1.08];

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub runners: usize,
    /// Pace of a factor-1.0 runner, m/s.
    pub base_speed_mps: f64,
    /// Seconds between fixes.
    pub interval_s: f64,
    /// Requested per-axis error bound, metres (capped at 10 m).
    pub max_error_m: f64,
    pub seed: u64,
    /// Timestamp of every runner's first fix, Unix epoch seconds.
    pub start_epoch_s: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            runners: 4,
            base_speed_mps: 3.0,
            interval_s: 5.0,
            max_error_m: 5.0,
            seed: 42,
            start_epoch_s: 1_722_500_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualRunner {
    pub user_id: String,
    pub speed_factor: f64,
    pub fixes: Vec<GpsFix>,
}

/// Generate the whole field. Runner `i` runs at
/// `base_speed · SPEED_FACTORS[i mod 8]` and finishes after
/// `totalDistance / speed` seconds; the last fix lands exactly on the
/// finish.
pub fn generate_runners(course: &Course, config: &SimConfig) -> Vec<VirtualRunner> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let error_bound = config.max_error_m.clamp(0.0, MAX_ERROR_M);

    (0..config.runners)
        .map(|i| {
            let speed_factor = SPEED_FACTORS[i % SPEED_FACTORS.len()];
            let speed = config.base_speed_mps * speed_factor;
            let total_time = course.total_distance_m / speed;

            let mut fixes = Vec::new();
            let mut step = 0usize;
            loop {
                let t = (step as f64 * config.interval_s).min(total_time);
                let distance = speed * t;
                let location = course.location_at_distance(distance);

                let (err_lat_m, err_lon_m) = if error_bound > 0.0 {
                    (
                        rng.random_range(-error_bound..=error_bound),
                        rng.random_range(-error_bound..=error_bound),
                    )
                } else {
                    (0.0, 0.0)
                };

                fixes.push(GpsFix {
                    lat: location.lat + err_lat_m * DEG_PER_METER_LAT,
                    lon: location.lon
                        + err_lon_m * DEG_PER_METER_LAT / location.lat.to_radians().cos(),
                    altitude: location.elevation,
                    accuracy: Some(error_bound.max(1.0)),
                    speed: Some(speed),
                    heading: Some(location.bearing_deg),
                    timestamp: Timestamp::Epoch(config.start_epoch_s + t),
                });

                if t >= total_time {
                    break;
                }
                step += 1;
            }

            VirtualRunner {
                user_id: format!("runner-{:02}", i + 1),
                speed_factor,
                fixes,
            }
        })
        .collect()
}

/// Merge all runners' fixes into one chronological stream, the way the
/// field would reach a live server. Ties keep runner order.
pub fn interleave(runners: &[VirtualRunner]) -> Vec<(String, GpsFix)> {
    let mut stream: Vec<(String, GpsFix)> = runners
        .iter()
        .flat_map(|runner| {
            runner
                .fixes
                .iter()
                .map(|fix| (runner.user_id.clone(), fix.clone()))
        })
        .collect();

    stream.sort_by(|a, b| {
        let ta = epoch(&a.1);
        let tb = epoch(&b.1);
        ta.partial_cmp(&tb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    stream
}

fn epoch(fix: &GpsFix) -> f64 {
    fix.timestamp.to_epoch_seconds().unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SAMPLE_GPX;
    use pacer_course::{CourseOptions, build_course, parse_gpx};
    use pacer_geo::distance_m;

    fn course() -> Course {
        let track = parse_gpx(SAMPLE_GPX.as_bytes()).unwrap();
        build_course(&track, &CourseOptions::default()).unwrap()
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let course = course();
        let config = SimConfig::default();

        let a = generate_runners(&course, &config);
        let b = generate_runners(&course, &config);

        assert_eq!(a.len(), b.len());
        for (ra, rb) in a.iter().zip(&b) {
            assert_eq!(ra.user_id, rb.user_id);
            assert_eq!(ra.fixes.len(), rb.fixes.len());
            for (fa, fb) in ra.fixes.iter().zip(&rb.fixes) {
                assert_eq!(fa.lat, fb.lat);
                assert_eq!(fa.lon, fb.lon);
                assert_eq!(fa.timestamp, fb.timestamp);
            }
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let course = course();
        let a = generate_runners(&course, &SimConfig::default());
        let b = generate_runners(
            &course,
            &SimConfig {
                seed: 43,
                ..SimConfig::default()
            },
        );

        let same = a[0]
            .fixes
            .iter()
            .zip(&b[0].fixes)
            .all(|(fa, fb)| fa.lat == fb.lat && fa.lon == fb.lon);
        assert!(!same, "different seeds must perturb the fixes");
    }

    #[test]
    fn test_error_stays_within_bound() {
        let course = course();
        let config = SimConfig {
            max_error_m: 50.0, // requested above the cap
            ..SimConfig::default()
        };
        let runners = generate_runners(&course, &config);

        for runner in &runners {
            let speed = config.base_speed_mps * runner.speed_factor;
            for fix in &runner.fixes {
                let t = fix.timestamp.to_epoch_seconds().unwrap() - config.start_epoch_s;
                let ideal = course.location_at_distance(speed * t);
                let offset = distance_m(fix.lat, fix.lon, ideal.lat, ideal.lon);
                // Per-axis bound of 10 m → at most 10·√2 off the path
                assert!(offset <= 15.0, "offset {offset} m exceeds the cap");
            }
        }
    }

    #[test]
    fn test_runners_finish_exactly_at_total_distance() {
        let course = course();
        let config = SimConfig {
            max_error_m: 0.0,
            ..SimConfig::default()
        };
        let runners = generate_runners(&course, &config);

        for runner in &runners {
            let last = runner.fixes.last().unwrap();
            let finish = course.location_at_distance(course.total_distance_m);
            assert!(distance_m(last.lat, last.lon, finish.lat, finish.lon) < 0.5);

            let elapsed =
                last.timestamp.to_epoch_seconds().unwrap() - config.start_epoch_s;
            let expected = course.total_distance_m / (config.base_speed_mps * runner.speed_factor);
            assert!((elapsed - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_faster_factor_means_fewer_fixes() {
        let course = course();
        let config = SimConfig {
            runners: 3, // factors 0.95, 1.00, 1.03
            ..SimConfig::default()
        };
        let runners = generate_runners(&course, &config);

        assert!(runners[2].fixes.len() <= runners[1].fixes.len());
        assert!(runners[1].fixes.len() <= runners[0].fixes.len());
    }

    #[test]
    fn test_interleave_is_chronological() {
        let course = course();
        let runners = generate_runners(&course, &SimConfig::default());
        let stream = interleave(&runners);

        assert_eq!(
            stream.len(),
            runners.iter().map(|r| r.fixes.len()).sum::<usize>()
        );
        let mut last = f64::MIN;
        for (_, fix) in &stream {
            let t = fix.timestamp.to_epoch_seconds().unwrap();
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn test_heading_follows_the_course() {
        let course = course();
        let config = SimConfig {
            max_error_m: 0.0,
            ..SimConfig::default()
        };
        let runners = generate_runners(&course, &config);

        // The sample course runs due north; every heading is ~0°
        for fix in &runners[0].fixes {
            let heading = fix.heading.unwrap();
            assert!(heading < 1.0 || heading > 359.0, "heading {heading}");
        }
    }
}
