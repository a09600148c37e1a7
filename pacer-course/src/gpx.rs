//! GPX 1.1 track extraction.
//!
//! Only `<trkpt lat="…" lon="…">` and its nested `<ele>` are consumed;
//! everything else in the document (metadata, waypoints, extensions) is
//! skipped. Namespace prefixes on element names are tolerated.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::GpxError;

/// Elevation value some exporters write when the elevation is unknown.
const ELEVATION_SENTINEL: f64 = -1.0;

/// One raw track point in document order, before interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
}

/// Parse GPX bytes into the ordered list of track points.
///
/// Fails with [`GpxError::TooFewPoints`] when the document holds fewer
/// than two track points, which can never form a course.
pub fn parse_gpx(bytes: &[u8]) -> Result<Vec<TrackPoint>, GpxError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut points: Vec<TrackPoint> = Vec::new();

    let mut in_trkpt = false;
    let mut in_ele = false;
    let mut lat: f64 = 0.0;
    let mut lon: f64 = 0.0;
    let mut elevation: Option<f64> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"trkpt" => {
                    (lat, lon) = read_coordinates(e)?;
                    elevation = None;
                    in_trkpt = true;
                }
                b"ele" if in_trkpt => in_ele = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if local_name(e.name().as_ref()) == b"trkpt" {
                    let (lat, lon) = read_coordinates(e)?;
                    points.push(TrackPoint {
                        lat,
                        lon,
                        elevation: None,
                    });
                }
            }
            Ok(Event::Text(ref t)) if in_ele => {
                let text = t.unescape().map_err(quick_xml::Error::from)?;
                let value: f64 =
                    text.trim()
                        .parse()
                        .map_err(|_| GpxError::InvalidNumber {
                            tag: "ele",
                            value: text.trim().to_string(),
                        })?;
                elevation = (value != ELEVATION_SENTINEL).then_some(value);
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"trkpt" if in_trkpt => {
                    points.push(TrackPoint {
                        lat,
                        lon,
                        elevation,
                    });
                    in_trkpt = false;
                }
                b"ele" => in_ele = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(GpxError::Xml(e)),
        }
        buf.clear();
    }

    if points.len() < 2 {
        return Err(GpxError::TooFewPoints(points.len()));
    }

    Ok(points)
}

/// Strip any namespace prefix from an element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn read_coordinates(e: &BytesStart<'_>) -> Result<(f64, f64), GpxError> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        match attr.key.as_ref() {
            b"lat" => lat = Some(parse_attr("lat", &attr.value)?),
            b"lon" => lon = Some(parse_attr("lon", &attr.value)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(GpxError::MissingCoordinate("lat"))?;
    let lon = lon.ok_or(GpxError::MissingCoordinate("lon"))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(GpxError::LatitudeOutOfRange(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(GpxError::LongitudeOutOfRange(lon));
    }

    Ok((lat, lon))
}

fn parse_attr(tag: &'static str, raw: &[u8]) -> Result<f64, GpxError> {
    let text = std::str::from_utf8(raw).map_err(|_| GpxError::InvalidNumber {
        tag,
        value: String::from_utf8_lossy(raw).into_owned(),
    })?;
    text.trim().parse().map_err(|_| GpxError::InvalidNumber {
        tag,
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_POINTS: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="pacer-test">
  <trk><trkseg>
    <trkpt lat="37.5663" lon="126.9779"><ele>32.0</ele></trkpt>
    <trkpt lat="37.5681" lon="126.9779"><ele>35.5</ele></trkpt>
  </trkseg></trk>
</gpx>"#;

    #[test]
    fn test_parses_track_points_in_order() {
        let points = parse_gpx(TWO_POINTS.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].lat, 37.5663);
        assert_eq!(points[0].elevation, Some(32.0));
        assert_eq!(points[1].lat, 37.5681);
        assert_eq!(points[1].elevation, Some(35.5));
    }

    #[test]
    fn test_self_closing_trkpt_has_no_elevation() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="37.0" lon="127.0"/>
            <trkpt lat="37.1" lon="127.0"/>
        </trkseg></trk></gpx>"#;
        let points = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].elevation, None);
    }

    #[test]
    fn test_elevation_sentinel_is_unknown() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="37.0" lon="127.0"><ele>-1</ele></trkpt>
            <trkpt lat="37.1" lon="127.0"><ele>12</ele></trkpt>
        </trkseg></trk></gpx>"#;
        let points = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(points[0].elevation, None);
        assert_eq!(points[1].elevation, Some(12.0));
    }

    #[test]
    fn test_namespaced_elements_are_recognised() {
        let gpx = r#"<g:gpx xmlns:g="http://www.topografix.com/GPX/1/1"><g:trk><g:trkseg>
            <g:trkpt lat="37.0" lon="127.0"><g:ele>5</g:ele></g:trkpt>
            <g:trkpt lat="37.1" lon="127.0"><g:ele>6</g:ele></g:trkpt>
        </g:trkseg></g:trk></g:gpx>"#;
        let points = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].elevation, Some(5.0));
    }

    #[test]
    fn test_single_point_rejected() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="37.0" lon="127.0"/>
        </trkseg></trk></gpx>"#;
        assert!(matches!(
            parse_gpx(gpx.as_bytes()),
            Err(GpxError::TooFewPoints(1))
        ));
    }

    #[test]
    fn test_missing_lon_rejected() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="37.0"/>
            <trkpt lat="37.1" lon="127.0"/>
        </trkseg></trk></gpx>"#;
        assert!(matches!(
            parse_gpx(gpx.as_bytes()),
            Err(GpxError::MissingCoordinate("lon"))
        ));
    }

    #[test]
    fn test_latitude_out_of_range_rejected() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="97.0" lon="127.0"/>
            <trkpt lat="37.1" lon="127.0"/>
        </trkseg></trk></gpx>"#;
        assert!(matches!(
            parse_gpx(gpx.as_bytes()),
            Err(GpxError::LatitudeOutOfRange(_))
        ));
    }

    #[test]
    fn test_garbage_elevation_rejected() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="37.0" lon="127.0"><ele>very high</ele></trkpt>
            <trkpt lat="37.1" lon="127.0"/>
        </trkseg></trk></gpx>"#;
        assert!(matches!(
            parse_gpx(gpx.as_bytes()),
            Err(GpxError::InvalidNumber { tag: "ele", .. })
        ));
    }
}
