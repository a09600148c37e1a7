//! Course construction: interpolation to a uniform along-route spacing
//! and structural checkpoint tagging.

use pacer_geo::distance_m;

use crate::error::GpxError;
use crate::gpx::TrackPoint;
use crate::model::{Course, PointKind, RoutePoint};

/// An interpolated point that would land closer than this to the next
/// waypoint is dropped rather than duplicating it.
const DUPLICATE_EPSILON_M: f64 = 1.0;

/// Tuning for [`build_course`].
#[derive(Debug, Clone, Copy)]
pub struct CourseOptions {
    /// Maximum spacing between consecutive route points, metres.
    pub interpolation_interval_m: f64,
    /// When non-zero, only waypoints whose cumulative distance has
    /// reached `n × interval` become the n-th checkpoint; when zero,
    /// every original waypoint is a checkpoint.
    pub checkpoint_distance_interval_m: f64,
}

impl Default for CourseOptions {
    fn default() -> Self {
        Self {
            interpolation_interval_m: 100.0,
            checkpoint_distance_interval_m: 0.0,
        }
    }
}

struct Emitted {
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    original: bool,
}

/// Build the interpolated, checkpoint-tagged course from raw track
/// points.
///
/// Between each consecutive waypoint pair farther apart than the
/// interpolation interval `I`, `⌊d/I⌋` evenly spaced points are
/// inserted (minus any that would duplicate the pair's end point).
/// The first emitted point becomes START with checkpoint index 0, the
/// last FINISH; qualifying intermediate waypoints become `CP{n}` in
/// encounter order.
pub fn build_course(track: &[TrackPoint], options: &CourseOptions) -> Result<Course, GpxError> {
    if track.len() < 2 {
        return Err(GpxError::TooFewPoints(track.len()));
    }

    let interval = options.interpolation_interval_m;
    let mut emitted: Vec<Emitted> = Vec::with_capacity(track.len());
    emitted.push(Emitted {
        lat: track[0].lat,
        lon: track[0].lon,
        elevation: track[0].elevation,
        original: true,
    });

    for pair in track.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let d = distance_m(a.lat, a.lon, b.lat, b.lon);

        if interval > 0.0 && d > interval {
            let count = (d / interval).floor() as usize;
            for k in 1..=count {
                let along = k as f64 * interval;
                if d - along < DUPLICATE_EPSILON_M {
                    break;
                }
                let t = along / d;
                emitted.push(Emitted {
                    lat: a.lat + t * (b.lat - a.lat),
                    lon: a.lon + t * (b.lon - a.lon),
                    elevation: interpolate_elevation(a.elevation, b.elevation, t),
                    original: false,
                });
            }
        }

        emitted.push(Emitted {
            lat: b.lat,
            lon: b.lon,
            elevation: b.elevation,
            original: true,
        });
    }

    // Cumulative along-route distance over the emitted chain
    let mut cumulative: Vec<f64> = Vec::with_capacity(emitted.len());
    cumulative.push(0.0);
    for i in 1..emitted.len() {
        let (a, b) = (&emitted[i - 1], &emitted[i]);
        let step = distance_m(a.lat, a.lon, b.lat, b.lon);
        cumulative.push(cumulative[i - 1] + step);
    }

    let last = emitted.len() - 1;
    let mut next_cp_ordinal: i32 = 1;
    let mut points: Vec<RoutePoint> = Vec::with_capacity(emitted.len());

    for (i, e) in emitted.iter().enumerate() {
        let (kind, cp_id, cp_index) = if i == 0 {
            (PointKind::Start, Some("START".to_string()), Some(0))
        } else if i == last {
            (
                PointKind::Finish,
                Some("FINISH".to_string()),
                Some(next_cp_ordinal),
            )
        } else if e.original && qualifies_as_checkpoint(cumulative[i], next_cp_ordinal, options) {
            let tag = (
                PointKind::Checkpoint,
                Some(format!("CP{next_cp_ordinal}")),
                Some(next_cp_ordinal),
            );
            next_cp_ordinal += 1;
            tag
        } else {
            (PointKind::Interpolated, None, None)
        };

        points.push(RoutePoint {
            sequence: i as u32,
            lat: e.lat,
            lon: e.lon,
            elevation: e.elevation,
            distance_from_start_m: cumulative[i],
            kind,
            cp_id,
            cp_index,
        });
    }

    let total_distance_m = cumulative[last];
    Ok(Course {
        points,
        total_distance_m,
    })
}

fn qualifies_as_checkpoint(distance_from_start: f64, ordinal: i32, options: &CourseOptions) -> bool {
    let interval = options.checkpoint_distance_interval_m;
    interval == 0.0 || distance_from_start >= ordinal as f64 * interval
}

fn interpolate_elevation(a: Option<f64>, b: Option<f64>, t: f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + t * (y - x)),
        // Carry forward when only one side is known
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pt(lat: f64, lon: f64) -> TrackPoint {
        TrackPoint {
            lat,
            lon,
            elevation: None,
        }
    }

    #[test]
    fn test_interpolation_spacing_seoul_pair() {
        // ~200 m apart heading north; interval 100 m → exactly one
        // interpolated point near the midpoint
        let track = vec![pt(37.5663, 126.9779), pt(37.5681, 126.9779)];
        let course = build_course(&track, &CourseOptions::default()).unwrap();

        assert_eq!(course.points.len(), 3);
        let mid = &course.points[1];
        assert_eq!(mid.kind, PointKind::Interpolated);
        assert_relative_eq!(mid.lat, 37.5672, epsilon = 1e-4);
        assert_relative_eq!(mid.lon, 126.9779, epsilon = 1e-9);
        assert!((mid.distance_from_start_m - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_total_distance_matches_last_point() {
        let track = vec![pt(37.5663, 126.9779), pt(37.5681, 126.9779)];
        let course = build_course(&track, &CourseOptions::default()).unwrap();
        assert_eq!(
            course.total_distance_m,
            course.points.last().unwrap().distance_from_start_m
        );
        assert!((course.total_distance_m - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_every_waypoint_is_checkpoint_by_default() {
        // Four waypoints ~150 m apart
        let track = vec![
            pt(37.0, 127.0),
            pt(37.00135, 127.0),
            pt(37.0027, 127.0),
            pt(37.00405, 127.0),
        ];
        let course = build_course(&track, &CourseOptions::default()).unwrap();

        let tags: Vec<(Option<&str>, Option<i32>)> = course
            .checkpoints()
            .map(|p| (p.cp_id.as_deref(), p.cp_index))
            .collect();
        assert_eq!(
            tags,
            vec![
                (Some("START"), Some(0)),
                (Some("CP1"), Some(1)),
                (Some("CP2"), Some(2)),
                (Some("FINISH"), Some(3)),
            ]
        );
        assert_eq!(course.points[0].kind, PointKind::Start);
        assert_eq!(course.points.last().unwrap().kind, PointKind::Finish);
    }

    #[test]
    fn test_checkpoint_distance_interval_filters_waypoints() {
        // Waypoints at 0 / ~200 / ~400 / ~600 m; only the one past
        // 300 m qualifies as CP1
        let track = vec![
            pt(37.0, 127.0),
            pt(37.0018, 127.0),
            pt(37.0036, 127.0),
            pt(37.0054, 127.0),
        ];
        let options = CourseOptions {
            checkpoint_distance_interval_m: 300.0,
            ..CourseOptions::default()
        };
        let course = build_course(&track, &options).unwrap();

        let tags: Vec<(Option<&str>, Option<i32>)> = course
            .checkpoints()
            .map(|p| (p.cp_id.as_deref(), p.cp_index))
            .collect();
        assert_eq!(
            tags,
            vec![
                (Some("START"), Some(0)),
                (Some("CP1"), Some(1)),
                (Some("FINISH"), Some(2)),
            ]
        );
    }

    #[test]
    fn test_elevation_lerp_and_carry_forward() {
        let track = vec![
            TrackPoint {
                lat: 37.0,
                lon: 127.0,
                elevation: Some(10.0),
            },
            TrackPoint {
                lat: 37.0018,
                lon: 127.0,
                elevation: Some(30.0),
            },
            TrackPoint {
                lat: 37.0036,
                lon: 127.0,
                elevation: None,
            },
        ];
        let course = build_course(&track, &CourseOptions::default()).unwrap();

        // First gap lerps 10 → 30; mid point sits near 20
        let lerped = course.points[1].elevation.unwrap();
        assert!((lerped - 20.0).abs() < 0.5, "lerped elevation {lerped}");

        // Second gap carries the known side forward
        let carried = &course.points[3];
        assert_eq!(carried.kind, PointKind::Interpolated);
        assert_eq!(carried.elevation, Some(30.0));
    }

    #[test]
    fn test_short_segments_get_no_interpolation() {
        // ~50 m apart, below the 100 m interval
        let track = vec![pt(37.0, 127.0), pt(37.00045, 127.0)];
        let course = build_course(&track, &CourseOptions::default()).unwrap();
        assert_eq!(course.points.len(), 2);
    }

    #[test]
    fn test_build_rejects_single_point() {
        let track = vec![pt(37.0, 127.0)];
        assert!(matches!(
            build_course(&track, &CourseOptions::default()),
            Err(GpxError::TooFewPoints(1))
        ));
    }

    #[test]
    fn test_builder_output_passes_model_validation() {
        let track = vec![
            pt(37.5663, 126.9779),
            pt(37.5681, 126.9782),
            pt(37.5699, 126.9790),
        ];
        let course = build_course(&track, &CourseOptions::default()).unwrap();
        assert!(Course::from_points(course.points).is_ok());
    }
}

#[cfg(test)]
mod spacing_properties {
    use super::*;
    use pacer_geo::distance_m;
    use proptest::prelude::*;

    fn arbitrary_track() -> impl Strategy<Value = Vec<TrackPoint>> {
        // Latitude steps of 45–900 m with small longitude drift, which
        // covers segments both below and well above the interval
        prop::collection::vec((0.0004f64..0.008, -0.002f64..0.002), 2..20).prop_map(|steps| {
            let mut lat = 37.0;
            let mut lon = 127.0;
            let mut track = vec![TrackPoint {
                lat,
                lon,
                elevation: None,
            }];
            for (dlat, dlon) in steps {
                lat += dlat;
                lon += dlon;
                track.push(TrackPoint {
                    lat,
                    lon,
                    elevation: None,
                });
            }
            track
        })
    }

    proptest! {
        #[test]
        fn prop_spacing_never_exceeds_interval_plus_epsilon(track in arbitrary_track()) {
            let options = CourseOptions::default();
            let course = build_course(&track, &options).unwrap();

            for pair in course.points.windows(2) {
                let gap = distance_m(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon);
                prop_assert!(
                    gap <= options.interpolation_interval_m + 1.0 + 1e-6,
                    "gap {} m between {} and {}",
                    gap,
                    pair[0].sequence,
                    pair[1].sequence
                );
            }
        }

        #[test]
        fn prop_distances_monotonic_and_sequence_dense(track in arbitrary_track()) {
            let course = build_course(&track, &CourseOptions::default()).unwrap();

            for (i, point) in course.points.iter().enumerate() {
                prop_assert_eq!(point.sequence, i as u32);
            }
            for pair in course.points.windows(2) {
                prop_assert!(pair[1].distance_from_start_m >= pair[0].distance_from_start_m);
            }
            prop_assert!(course.total_distance_m.is_finite());

            // Re-validation through the model must agree
            prop_assert!(Course::from_points(course.points).is_ok());
        }
    }
}
