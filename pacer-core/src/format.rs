//! Presentation helpers. Domain records carry raw seconds and metres;
//! anything human-readable is formatted here, at the edge.

/// `HH:MM:SS` from elapsed seconds (floored; negative clamps to zero).
pub fn format_duration_hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Pace over a stretch, as seconds per kilometre. `None` when the
/// distance is too short to divide by.
pub fn pace_seconds_per_km(distance_m: f64, elapsed_s: f64) -> Option<f64> {
    if distance_m < 1.0 {
        return None;
    }
    Some(elapsed_s / (distance_m / 1000.0))
}

/// `M'SS"/km` from seconds per kilometre.
pub fn format_pace_min_km(seconds_per_km: f64) -> String {
    let total = seconds_per_km.max(0.0).round() as u64;
    let minutes = total / 60;
    let secs = total % 60;
    format!("{minutes}'{secs:02}\"/km")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration_hms(0.0), "00:00:00");
        assert_eq!(format_duration_hms(59.9), "00:00:59");
        assert_eq!(format_duration_hms(3_671.0), "01:01:11");
        assert_eq!(format_duration_hms(36_000.0), "10:00:00");
        assert_eq!(format_duration_hms(-5.0), "00:00:00");
    }

    #[test]
    fn test_pace_computation() {
        assert_eq!(pace_seconds_per_km(1000.0, 300.0), Some(300.0));
        assert_eq!(pace_seconds_per_km(0.5, 10.0), None);
        let pace = pace_seconds_per_km(10_000.0, 3_000.0).unwrap();
        assert!((pace - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_pace_formatting() {
        assert_eq!(format_pace_min_km(300.0), "5'00\"/km");
        assert_eq!(format_pace_min_km(272.0), "4'32\"/km");
        assert_eq!(format_pace_min_km(59.4), "0'59\"/km");
    }
}
