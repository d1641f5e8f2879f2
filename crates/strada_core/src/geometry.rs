use crate::{
    distance::{Distance, Meters},
    geopoint::GeoPoint,
    meters,
};

pub fn compute_geometry_distance(geometry: &[GeoPoint]) -> Distance<Meters> {
    let mut distance = meters!(0);
    for i in 0..geometry.len() - 1 {
        distance = distance + geometry[i].haversine_distance(&geometry[i + 1]);
    }

    distance
}

/// Geometry of a polyline traversed end-to-start.
pub fn reversed(geometry: &[GeoPoint]) -> Vec<GeoPoint> {
    geometry.iter().rev().copied().collect()
}

/// Append `next` to `polyline`, dropping the shared joint point so that the
/// concatenation of consecutive traversals stays free of duplicates.
pub fn append_geometry(polyline: &mut Vec<GeoPoint>, next: &[GeoPoint]) {
    let skip_joint = match (polyline.last(), next.first()) {
        (Some(last), Some(first)) => last == first,
        _ => false,
    };

    if skip_joint {
        polyline.extend_from_slice(&next[1..]);
    } else {
        polyline.extend_from_slice(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_sums_consecutive_hops() {
        let line = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.001),
            GeoPoint::new(0.0, 0.002),
        ];
        let d = compute_geometry_distance(&line);
        let direct = line[0].haversine_distance(&line[2]);
        // On a straight east-west line the hops add up to the direct distance.
        assert!((d.value() - direct.value()).abs() < 0.01);
    }

    #[test]
    fn append_drops_shared_joint() {
        let mut polyline = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)];
        append_geometry(
            &mut polyline,
            &[GeoPoint::new(0.0, 1.0), GeoPoint::new(1.0, 1.0)],
        );
        assert_eq!(polyline.len(), 3);
    }

    #[test]
    fn append_keeps_disjoint_geometries_whole() {
        let mut polyline = vec![GeoPoint::new(0.0, 0.0)];
        append_geometry(
            &mut polyline,
            &[GeoPoint::new(0.0, 1.0), GeoPoint::new(1.0, 1.0)],
        );
        assert_eq!(polyline.len(), 3);
    }
}
