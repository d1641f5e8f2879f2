use strada_core::engine::{GenerationConfig, RouteGenerator};
use strada_core::error::{GenerationError, GenerationWarning};
use strada_core::gaps::GapResolution;
use strada_core::geopoint::GeoPoint;
use strada_core::osm::RawWay;
use strada_core::router::{ConnectorError, ConnectorRouter, NoRouter, RoutedConnector};

/// Routes every request as a straight line at 30 km/h, standing in for a
/// live routing service.
struct StraightRouter;

impl ConnectorRouter for StraightRouter {
    async fn route_between(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<RoutedConnector, ConnectorError> {
        let distance = from.haversine_distance(&to);
        Ok(RoutedConnector {
            geometry: vec![from, to],
            duration_s: distance.value() / (30.0 / 3.6),
            distance,
        })
    }
}

fn residential(points: &[(f64, f64)]) -> RawWay {
    way(points, &[("highway", "residential")])
}

fn way(points: &[(f64, f64)], tags: &[(&str, &str)]) -> RawWay {
    RawWay::new(
        points
            .iter()
            .map(|&(lat, lng)| GeoPoint::new(lat, lng))
            .collect(),
        tags,
    )
}

/// Four streets forming a closed block, roughly 111 m per side.
fn square_block() -> Vec<RawWay> {
    vec![
        residential(&[(0.0, 0.0), (0.001, 0.0)]),
        residential(&[(0.001, 0.0), (0.001, 0.001)]),
        residential(&[(0.001, 0.001), (0.0, 0.001)]),
        residential(&[(0.0, 0.001), (0.0, 0.0)]),
    ]
}

#[tokio::test]
async fn square_block_is_covered_without_deadhead() {
    let generator = RouteGenerator::new(NoRouter);
    let result = generator
        .generate(&square_block(), &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(result.chunks.len(), 1);
    assert!(result.totals.deadhead_distance.is_zero());
    assert!(result.gaps.is_empty());
    assert!(result.warnings.is_empty());

    // An Eulerian circuit closes on its start point.
    let polyline = &result.chunks[0].polyline;
    assert_eq!(polyline.first(), polyline.last());
}

#[tokio::test]
async fn dead_end_path_is_retraced_once() {
    // A-B-C with no branching: both ends are odd, so every street is
    // driven exactly twice.
    let generator = RouteGenerator::new(NoRouter);
    let result = generator
        .generate(
            &[residential(&[(0.0, 0.0), (0.001, 0.0), (0.001, 0.0015)])],
            &GenerationConfig::default(),
        )
        .await
        .unwrap();

    let street = result.totals.distance - result.totals.deadhead_distance;
    assert_eq!(result.totals.deadhead_distance, street);
}

#[tokio::test]
async fn chunk_duration_bounds_every_chunk() {
    let config = GenerationConfig {
        chunk_duration_s: 20.0,
        ..GenerationConfig::default()
    };
    let generator = RouteGenerator::new(NoRouter);
    let result = generator.generate(&square_block(), &config).await.unwrap();

    assert!(result.chunks.len() > 1);
    assert_eq!(result.totals.chunk_count, result.chunks.len());
    for chunk in &result.chunks {
        // No single side exceeds the target, so the bound holds strictly.
        assert!(chunk.duration_s <= 20.0 + f64::EPSILON);
    }

    // Consecutive chunks hand over at a shared coordinate.
    for pair in result.chunks.windows(2) {
        assert_eq!(pair[0].polyline.last(), pair[1].polyline.first());
    }

    let total: f64 = result.chunks.iter().map(|chunk| chunk.duration_s).sum();
    assert!((total - result.totals.duration_s).abs() < 1e-6);
}

#[tokio::test]
async fn disconnected_components_are_stitched_by_the_router() {
    let mut ways = square_block();
    // A second block ~1 km away.
    ways.push(residential(&[(0.01, 0.0), (0.011, 0.0)]));

    let generator = RouteGenerator::new(StraightRouter);
    let result = generator
        .generate(&ways, &GenerationConfig::default())
        .await
        .unwrap();

    assert!(result.warnings.is_empty());
    // The connector is driven at least twice and never counts as coverage.
    assert!(!result.totals.deadhead_distance.is_zero());

    let blocks_street: f64 = 5.0 * 111.0;
    let covered = result.totals.distance - result.totals.deadhead_distance;
    assert!((covered.value() - blocks_street).abs() < 5.0);
}

#[tokio::test]
async fn router_outage_degrades_to_straight_connectors() {
    let mut ways = square_block();
    ways.push(residential(&[(0.01, 0.0), (0.011, 0.0)]));

    let generator = RouteGenerator::new(NoRouter);
    let result = generator
        .generate(&ways, &GenerationConfig::default())
        .await
        .unwrap();

    assert!(result.warnings.iter().any(|warning| matches!(
        warning,
        GenerationWarning::ExternalRoutingFailure { .. }
    )));
    assert!(result.warnings.iter().any(|warning| matches!(
        warning,
        GenerationWarning::ConnectivityDegraded { .. }
    )));
}

#[tokio::test]
async fn coverage_mode_reports_and_resolves_near_miss_gaps() {
    let config = GenerationConfig {
        coverage_mode: true,
        ..GenerationConfig::default()
    };
    let generator = RouteGenerator::new(StraightRouter);
    let result = generator
        .generate(
            &[
                residential(&[(0.0, 0.0), (0.001, 0.0)]),
                residential(&[(0.0011, 0.0), (0.002, 0.0)]),
            ],
            &config,
        )
        .await
        .unwrap();

    assert_eq!(result.gaps.len(), 1);
    assert_eq!(result.gaps[0].resolution, GapResolution::Auto);
    // The inserted bridge makes the pair drivable as one route.
    assert!(result.totals.distance.value() > 200.0);
}

#[tokio::test]
async fn start_point_snaps_to_the_nearest_node() {
    let config = GenerationConfig {
        start_point: Some(GeoPoint::new(0.00098, 0.00102)),
        ..GenerationConfig::default()
    };
    let generator = RouteGenerator::new(NoRouter);
    let result = generator.generate(&square_block(), &config).await.unwrap();

    let start = result.chunks[0].polyline[0];
    assert_eq!(start, GeoPoint::new(0.001, 0.001));
}

#[tokio::test]
async fn oneway_streets_are_respected() {
    // A directed ring is Eulerian as-is.
    let ways = vec![
        way(&[(0.0, 0.0), (0.001, 0.0)], &[
            ("highway", "residential"),
            ("oneway", "yes"),
        ]),
        way(&[(0.001, 0.0), (0.001, 0.001)], &[
            ("highway", "residential"),
            ("oneway", "yes"),
        ]),
        way(&[(0.001, 0.001), (0.0, 0.0)], &[
            ("highway", "residential"),
            ("oneway", "yes"),
        ]),
    ];
    let generator = RouteGenerator::new(NoRouter);
    let result = generator
        .generate(&ways, &GenerationConfig::default())
        .await
        .unwrap();

    assert!(result.totals.deadhead_distance.is_zero());
}

#[tokio::test]
async fn non_drivable_ways_yield_empty_network() {
    let generator = RouteGenerator::new(NoRouter);
    let error = generator
        .generate(
            &[way(&[(0.0, 0.0), (0.001, 0.0)], &[("highway", "footway")])],
            &GenerationConfig::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, GenerationError::EmptyNetwork));
}

#[tokio::test]
async fn bad_configuration_fails_before_any_work() {
    let config = GenerationConfig {
        chunk_duration_s: -1.0,
        ..GenerationConfig::default()
    };
    let generator = RouteGenerator::new(NoRouter);
    let error = generator
        .generate(&square_block(), &config)
        .await
        .unwrap_err();
    assert!(matches!(error, GenerationError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn result_serializes_to_json() {
    let generator = RouteGenerator::new(NoRouter);
    let result = generator
        .generate(&square_block(), &GenerationConfig::default())
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["chunks"].is_array());
    assert!(json["totals"]["distance"].is_number());
    assert_eq!(json["totals"]["chunk_count"], 1);
}
