//! The course model: ordered route points with structural checkpoint
//! tags and cumulative along-route distance.

use serde::{Deserialize, Serialize};

use pacer_geo::{bearing_deg, distance_m};

use crate::error::CourseError;

/// Structural role of a route point, assigned once by the builder.
/// Downstream code reads only this tag (plus `cp_id`/`cp_index`), never
/// the identifier strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointKind {
    Start,
    Interpolated,
    Checkpoint,
    Finish,
}

/// One point of the interpolated course polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub sequence: u32,
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub distance_from_start_m: f64,
    #[serde(rename = "type")]
    pub kind: PointKind,
    pub cp_id: Option<String>,
    pub cp_index: Option<i32>,
}

impl RoutePoint {
    pub fn is_checkpoint(&self) -> bool {
        self.cp_index.is_some()
    }
}

/// A point on the polyline resolved from an along-route distance.
#[derive(Debug, Clone, Copy)]
pub struct LocationAtDistance {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    /// Bearing of the segment the distance falls on, degrees.
    pub bearing_deg: f64,
    /// Index of the segment's first point.
    pub segment_index: usize,
}

/// The official race path: GPX waypoints plus interpolated points at a
/// uniform spacing, with checkpoints tagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub points: Vec<RoutePoint>,
    pub total_distance_m: f64,
}

impl Course {
    /// Assemble a course from pre-built points, checking the model
    /// invariants. The builder upholds these by construction; this path
    /// exists for data arriving from a cache or store.
    pub fn from_points(points: Vec<RoutePoint>) -> Result<Self, CourseError> {
        if points.len() < 2 {
            return Err(CourseError::TooFewPoints(points.len()));
        }

        let mut last_cp_index: Option<i32> = None;
        for (i, point) in points.iter().enumerate() {
            if point.sequence != i as u32 {
                return Err(CourseError::NonDenseSequence {
                    index: i,
                    expected: i as u32,
                    actual: point.sequence,
                });
            }
            if i > 0 && point.distance_from_start_m < points[i - 1].distance_from_start_m {
                return Err(CourseError::NonMonotonicDistance(i));
            }
            if let Some(cp_index) = point.cp_index {
                if last_cp_index.is_some_and(|last| cp_index <= last) {
                    return Err(CourseError::NonIncreasingCheckpointIndex(i));
                }
                last_cp_index = Some(cp_index);
            }
        }

        let first_ok = points.first().is_some_and(|p| p.kind == PointKind::Start);
        let last_ok = points.last().is_some_and(|p| p.kind == PointKind::Finish);
        if !first_ok || !last_ok {
            return Err(CourseError::UntaggedEndpoints);
        }

        let total_distance_m = points.last().map(|p| p.distance_from_start_m).unwrap_or(0.0);
        Ok(Self {
            points,
            total_distance_m,
        })
    }

    /// All checkpoint-bearing points (START, CP{n}, FINISH) in course order.
    pub fn checkpoints(&self) -> impl Iterator<Item = &RoutePoint> {
        self.points.iter().filter(|p| p.is_checkpoint())
    }

    /// Number of checkpoint-bearing points, START and FINISH included.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints().count()
    }

    /// Find the checkpoint with the given index, if present.
    pub fn checkpoint_at(&self, cp_index: i32) -> Option<&RoutePoint> {
        self.checkpoints().find(|p| p.cp_index == Some(cp_index))
    }

    /// Resolve a point on the polyline from an along-route distance.
    /// The distance is clamped into `[0, total_distance_m]`.
    pub fn location_at_distance(&self, distance_m_along: f64) -> LocationAtDistance {
        let d = distance_m_along.clamp(0.0, self.total_distance_m);

        // Binary search for the segment containing d
        let idx = self
            .points
            .partition_point(|p| p.distance_from_start_m <= d)
            .saturating_sub(1)
            .min(self.points.len() - 2);

        let a = &self.points[idx];
        let b = &self.points[idx + 1];
        let span = b.distance_from_start_m - a.distance_from_start_m;
        let t = if span > 0.0 {
            ((d - a.distance_from_start_m) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let lat = a.lat + t * (b.lat - a.lat);
        let lon = a.lon + t * (b.lon - a.lon);
        let elevation = match (a.elevation, b.elevation) {
            (Some(x), Some(y)) => Some(x + t * (y - x)),
            (Some(x), None) => Some(x),
            (None, Some(y)) => Some(y),
            (None, None) => None,
        };

        let bearing_deg = if distance_m(a.lat, a.lon, b.lat, b.lon) > 0.0 {
            bearing_deg(a.lat, a.lon, b.lat, b.lon)
        } else {
            0.0
        };

        LocationAtDistance {
            lat,
            lon,
            elevation,
            bearing_deg,
            segment_index: idx,
        }
    }
}
