//! The built-in sample course: seven waypoints heading due north from
//! Seoul City Hall, ~300 m apart. Built with default options it yields
//! checkpoints START, CP1..CP5, FINISH.

pub const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="pacer-sim">
  <trk>
    <name>Seoul City Hall North</name>
    <trkseg>
      <trkpt lat="37.5663" lon="126.9779"><ele>32</ele></trkpt>
      <trkpt lat="37.5690" lon="126.9779"><ele>34</ele></trkpt>
      <trkpt lat="37.5717" lon="126.9779"><ele>37</ele></trkpt>
      <trkpt lat="37.5744" lon="126.9779"><ele>36</ele></trkpt>
      <trkpt lat="37.5771" lon="126.9779"><ele>33</ele></trkpt>
      <trkpt lat="37.5798" lon="126.9779"><ele>31</ele></trkpt>
      <trkpt lat="37.5825" lon="126.9779"><ele>30</ele></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_course::{CourseOptions, build_course, parse_gpx};

    #[test]
    fn test_sample_course_checkpoint_layout() {
        let track = parse_gpx(SAMPLE_GPX.as_bytes()).unwrap();
        assert_eq!(track.len(), 7);

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
                (Some("CP3"), Some(3)),
                (Some("CP4"), Some(4)),
                (Some("CP5"), Some(5)),
                (Some("FINISH"), Some(6)),
            ]
        );
        assert!((course.total_distance_m - 1_801.0).abs() < 5.0);
    }
}
