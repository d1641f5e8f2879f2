use strada_core::gaps::GapPolicy;
use strada_core::geopoint::GeoPoint;

pub fn parse_point(input: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = input
        .split_once(',')
        .ok_or_else(|| String::from("expected lat,lng"))?;

    let lat: f64 = lat.trim().parse().map_err(|_| String::from("bad latitude"))?;
    let lng: f64 = lng.trim().parse().map_err(|_| String::from("bad longitude"))?;

    Ok(GeoPoint::new(lat, lng))
}

pub fn parse_gap_policy(input: &str) -> Result<GapPolicy, String> {
    match input {
        "auto" => Ok(GapPolicy::Auto),
        "manual" => Ok(GapPolicy::Manual),
        "skip" => Ok(GapPolicy::Skip),
        other => Err(format!("unknown gap policy: {other} (auto|manual|skip)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_point() {
        let point = parse_point("48.85, 2.35").unwrap();
        assert_eq!(point.lat, 48.85);
        assert_eq!(point.lng, 2.35);
    }

    #[test]
    fn rejects_malformed_points() {
        assert!(parse_point("48.85").is_err());
        assert!(parse_point("north,south").is_err());
    }

    #[test]
    fn parses_gap_policies() {
        assert_eq!(parse_gap_policy("skip").unwrap(), GapPolicy::Skip);
        assert!(parse_gap_policy("ignore").is_err());
    }
}
