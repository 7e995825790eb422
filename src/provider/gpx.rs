use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ProviderError;
use crate::types::coordinate::Coordinate;

/// Reads the track (or route) points of a GPX document in document order.
pub fn parse_track(bytes: &[u8]) -> Result<Vec<Coordinate>, ProviderError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut points = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| ProviderError::InvalidTrack(e.to_string()))?;

                if name_str == "trkpt" || name_str == "rtept" {
                    if let Some(point) = read_point(&e)? {
                        points.push(point);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProviderError::InvalidTrack(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if points.is_empty() {
        return Err(ProviderError::InvalidTrack(
            "No track points found in file".to_string(),
        ));
    }

    Ok(points)
}

fn read_point(e: &BytesStart<'_>) -> Result<Option<Coordinate>, ProviderError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ProviderError::InvalidTrack(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| ProviderError::InvalidTrack(e.to_string()))?;

        match attr.key.as_ref() {
            b"lat" => lat = value.trim().parse::<f64>().ok(),
            b"lon" => lon = value.trim().parse::<f64>().ok(),
            _ => {}
        }
    }

    let (Some(lat), Some(lon)) = (lat, lon) else {
        tracing::warn!("Skipping GPX point without lat/lon");
        return Ok(None);
    };

    let point = Coordinate::new(lat, lon);
    if !point.is_valid() {
        tracing::warn!("Skipping out-of-range GPX point {}, {}", lat, lon);
        return Ok(None);
    }

    Ok(Some(point))
}
