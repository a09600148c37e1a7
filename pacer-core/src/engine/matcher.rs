//! Projection-based map matching: pick the course segment that best
//! explains a filtered fix, by a weighted distance + bearing score.
//!
//! Projection runs in raw lat/lon space; at the ≤ 100 m segment lengths
//! the course model guarantees, the error against a proper local
//! projection is a few metres at most, well inside the match threshold.

use pacer_course::Course;
use pacer_geo::{bearing_deg, distance_m, heading_delta_deg};

/// Distance normaliser for the score: 100 m of cross-track error weighs
/// as much as a full 180° bearing mismatch.
const DISTANCE_NORM_M: f64 = 100.0;
const BEARING_NORM_DEG: f64 = 180.0;

#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// A fix farther than this from every segment is unmatched.
    pub match_distance_threshold_m: f64,
    pub weight_distance: f64,
    pub weight_bearing: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_distance_threshold_m: 100.0,
            weight_distance: 0.6,
            weight_bearing: 0.4,
        }
    }
}

/// The best-segment projection of one fix.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult {
    pub projected_lat: f64,
    pub projected_lon: f64,
    /// Index of the winning segment's first point.
    pub segment_index: usize,
    pub distance_to_route_m: f64,
    /// Zero when the fix carried no usable heading.
    pub bearing_diff_deg: f64,
    /// Along-route distance of the projected point.
    pub progress_distance_m: f64,
    pub matched: bool,
}

/// Project a fix onto every course segment and keep the lowest-scoring
/// candidate. Ties keep the earlier segment.
pub fn match_fix(
    course: &Course,
    lat: f64,
    lon: f64,
    heading: Option<f64>,
    config: &MatcherConfig,
) -> MatchResult {
    let points = &course.points;
    debug_assert!(points.len() >= 2);

    let mut best_score = f64::INFINITY;
    let mut best = MatchResult {
        projected_lat: lat,
        projected_lon: lon,
        segment_index: 0,
        distance_to_route_m: f64::INFINITY,
        bearing_diff_deg: 0.0,
        progress_distance_m: 0.0,
        matched: false,
    };

    for i in 0..points.len() - 1 {
        let a = &points[i];
        let b = &points[i + 1];

        let dlat = b.lat - a.lat;
        let dlon = b.lon - a.lon;
        let denom = dlat * dlat + dlon * dlon;

        // Zero-length segments degenerate to the point itself
        let t = if denom > 0.0 {
            (((lat - a.lat) * dlat + (lon - a.lon) * dlon) / denom).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let projected_lat = a.lat + t * dlat;
        let projected_lon = a.lon + t * dlon;
        let dist = distance_m(lat, lon, projected_lat, projected_lon);

        let bearing_diff = match heading {
            Some(h) if denom > 0.0 => {
                heading_delta_deg(h, bearing_deg(a.lat, a.lon, b.lat, b.lon))
            }
            _ => 0.0,
        };

        let score = config.weight_distance * (dist / DISTANCE_NORM_M)
            + config.weight_bearing * (bearing_diff / BEARING_NORM_DEG);

        if score < best_score {
            best_score = score;
            best = MatchResult {
                projected_lat,
                projected_lon,
                segment_index: i,
                distance_to_route_m: dist,
                bearing_diff_deg: bearing_diff,
                progress_distance_m: a.distance_from_start_m
                    + distance_m(a.lat, a.lon, projected_lat, projected_lon),
                matched: false,
            };
        }
    }

    best.matched = best.distance_to_route_m <= config.match_distance_threshold_m;
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_course::{CourseOptions, TrackPoint, build_course};

    fn northbound_course() -> Course {
        // ~400 m due north, interpolated at 100 m
        let track = vec![
            TrackPoint {
                lat: 37.0,
                lon: 127.0,
                elevation: None,
            },
            TrackPoint {
                lat: 37.0036,
                lon: 127.0,
                elevation: None,
            },
        ];
        build_course(&track, &CourseOptions::default()).unwrap()
    }

    fn out_and_back_course() -> Course {
        // ~200 m north then back south over the same ground
        let track = vec![
            TrackPoint {
                lat: 37.0,
                lon: 127.0,
                elevation: None,
            },
            TrackPoint {
                lat: 37.0018,
                lon: 127.0,
                elevation: None,
            },
            TrackPoint {
                lat: 37.0,
                lon: 127.0,
                elevation: None,
            },
        ];
        build_course(&track, &CourseOptions::default()).unwrap()
    }

    #[test]
    fn test_course_points_reproject_onto_themselves() {
        let course = northbound_course();
        let config = MatcherConfig::default();

        for point in &course.points {
            let result = match_fix(&course, point.lat, point.lon, None, &config);
            assert!(result.matched);
            assert!(result.distance_to_route_m < 0.01);
            assert!(
                (result.progress_distance_m - point.distance_from_start_m).abs() < 1.0,
                "point {} progressed {} vs stored {}",
                point.sequence,
                result.progress_distance_m,
                point.distance_from_start_m
            );
        }
    }

    #[test]
    fn test_nearby_fix_projects_onto_segment() {
        let course = northbound_course();
        // ~150 m along, ~9 m east of the line
        let result = match_fix(&course, 37.00135, 127.0001, None, &MatcherConfig::default());

        assert!(result.matched);
        assert_eq!(result.segment_index, 1);
        assert!((result.progress_distance_m - 150.0).abs() < 2.0);
        assert!(result.distance_to_route_m > 5.0 && result.distance_to_route_m < 15.0);
        // The projection parameter stayed inside the segment
        let a = &course.points[1];
        let b = &course.points[2];
        assert!(result.projected_lat >= a.lat && result.projected_lat <= b.lat);
    }

    #[test]
    fn test_far_fix_is_unmatched_but_still_reported() {
        let course = northbound_course();
        // ~1 km east of the course
        let result = match_fix(&course, 37.0018, 127.0113, None, &MatcherConfig::default());

        assert!(!result.matched);
        assert!(result.distance_to_route_m > 500.0);
        // Segment index and progress are still meaningful
        assert!(result.progress_distance_m >= 0.0);
    }

    #[test]
    fn test_heading_disambiguates_overlapping_segments() {
        let course = out_and_back_course();
        let config = MatcherConfig::default();
        let (lat, lon) = (37.0009, 127.000_02);

        let north = match_fix(&course, lat, lon, Some(0.0), &config);
        let south = match_fix(&course, lat, lon, Some(180.0), &config);

        // Northbound heading lands on the outbound half, southbound on
        // the return half
        assert!(
            north.progress_distance_m < 200.0,
            "north progressed {}",
            north.progress_distance_m
        );
        assert!(
            south.progress_distance_m > 200.0,
            "south progressed {}",
            south.progress_distance_m
        );
        assert!(north.bearing_diff_deg < 5.0);
        assert!(south.bearing_diff_deg < 5.0);
    }

    #[test]
    fn test_tie_breaks_to_lower_segment_index() {
        let course = out_and_back_course();
        // No heading: outbound and return segments score identically, so
        // the earlier segment must win
        let result = match_fix(&course, 37.0009, 127.0, None, &MatcherConfig::default());
        assert!(result.segment_index <= 1);
        assert!(result.progress_distance_m < 200.0);
    }

    #[test]
    fn test_endpoint_clamping_before_start() {
        let course = northbound_course();
        // South of the start point: projection clamps to the start
        let result = match_fix(&course, 36.9995, 127.0, None, &MatcherConfig::default());
        assert_eq!(result.segment_index, 0);
        assert!(result.progress_distance_m < 0.5);
    }
}
