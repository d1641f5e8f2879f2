//! OSM tag interpretation for the driving profile: which ways are drivable,
//! in which direction, and how fast.

use crate::osm::RawWay;

// https://wiki.openstreetmap.org/wiki/Key:highway
static DRIVABLE_HIGHWAYS: [&str; 15] = [
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "residential",
    "unclassified",
    "living_street",
    "service",
    "road",
];

static DENIED_HIGHWAYS: [&str; 14] = [
    "footway",
    "path",
    "cycleway",
    "pedestrian",
    "steps",
    "track",
    "bridleway",
    "corridor",
    "proposed",
    "construction",
    "abandoned",
    "platform",
    "raceway",
    "escape",
];

// https://wiki.openstreetmap.org/wiki/Tag:highway%3Dservice
static EXCLUDED_SERVICE: [&str; 3] = ["driveway", "parking_aisle", "emergency_access"];

// https://wiki.openstreetmap.org/wiki/Key:access
static RESTRICTED_ACCESS: [&str; 4] = ["private", "no", "customers", "delivery"];

static ONEWAYS: [&str; 4] = ["yes", "true", "1", "-1"];

/// Filtering options derived from the caller configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct WayFilter {
    pub include_service_roads: bool,
    pub include_private_roads: bool,
}

pub fn is_drivable(way: &RawWay, filter: &WayFilter) -> bool {
    let Some(highway) = way.get_tag("highway") else {
        return false;
    };

    if DENIED_HIGHWAYS.contains(&highway) || !DRIVABLE_HIGHWAYS.contains(&highway) {
        return false;
    }

    if highway == "service" {
        if !filter.include_service_roads {
            return false;
        }
        if let Some(service) = way.get_tag("service") {
            if EXCLUDED_SERVICE.contains(&service) {
                return false;
            }
        }
    }

    if !filter.include_private_roads {
        if let Some(access) = way.get_tag("access") {
            if RESTRICTED_ACCESS.contains(&access) {
                return false;
            }
        }
    }

    true
}

// https://wiki.openstreetmap.org/wiki/Key:oneway
pub fn is_oneway(way: &RawWay) -> bool {
    way.get_tag("oneway")
        .is_some_and(|value| ONEWAYS.contains(&value))
        || is_roundabout(way)
}

/// `oneway=-1` ways are drivable against their drawing order.
pub fn is_reversed_oneway(way: &RawWay) -> bool {
    way.has_tag("oneway", "-1")
}

// https://wiki.openstreetmap.org/wiki/Key:junction
fn is_roundabout(way: &RawWay) -> bool {
    way.has_tag("junction", "roundabout") || way.has_tag("junction", "circular")
}

pub fn default_speed_for_highway(highway: &str) -> f64 {
    match highway {
        "motorway" => 120.0,
        "motorway_link" => 70.0,

        "trunk" => 70.0,
        "trunk_link" => 70.0,

        "primary" => 60.0,
        "primary_link" => 60.0,

        "secondary" => 50.0,
        "secondary_link" => 40.0,

        "tertiary" => 30.0,
        "tertiary_link" => 30.0,

        "unclassified" => 30.0,
        "residential" => 30.0,
        "living_street" => 5.0,
        "service" => 20.0,

        "road" => 20.0,

        _ => 30.0,
    }
}

/// Average driving speed in km/h: tagged `maxspeed` when parseable,
/// otherwise the per-class default.
pub fn average_speed_kmh(way: &RawWay) -> f64 {
    if let Some(max_speed) = way.get_tag("maxspeed").and_then(parse_max_speed) {
        return max_speed;
    }

    default_speed_for_highway(way.get_tag("highway").unwrap_or(""))
}

// https://wiki.openstreetmap.org/wiki/Key:maxspeed
fn parse_max_speed(value: &str) -> Option<f64> {
    let value = value.trim();

    if let Some(mph) = value.strip_suffix("mph") {
        return mph.trim().parse::<f64>().ok().map(|v| v * 1.609_344);
    }

    match value {
        "walk" => Some(5.0),
        "none" => Some(130.0),
        _ => value.parse::<f64>().ok(),
    }
    .filter(|v| *v > 0.0)
}
