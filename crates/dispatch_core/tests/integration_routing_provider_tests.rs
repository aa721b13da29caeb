use dispatch_core::routing::{
    build_route_provider, CachedRouteProvider, NetworkRouteProvider, RoadNetwork, RouteProvider,
    RouteProviderKind, StraightLineRouteProvider, DEFAULT_SPEED_MPS,
};
use dispatch_core::spatial::{Coord, Location, NodeId};

#[test]
fn straight_line_provider_returns_route() {
    let provider = StraightLineRouteProvider::new(10.0);
    let route = provider
        .route(&Location::at(1, 0.0, 0.0), &Location::at(2, 300.0, 400.0))
        .expect("route");
    assert_eq!(route.distance_m, 500.0);
    assert_eq!(route.duration_ms, 50_000);
    assert_eq!(route.path, vec![NodeId(1), NodeId(2)]);
}

#[test]
fn route_provider_kind_default_is_straight_line() {
    assert_eq!(
        RouteProviderKind::default(),
        RouteProviderKind::StraightLine {
            speed_mps: DEFAULT_SPEED_MPS
        }
    );
}

#[test]
fn network_prefers_fast_detour_over_slow_direct_link() {
    let mut network = RoadNetwork::default();
    network.add_node(NodeId(0), Coord::new(0.0, 0.0));
    network.add_node(NodeId(1), Coord::new(1_000.0, 0.0));
    network.add_node(NodeId(2), Coord::new(500.0, 500.0));
    network.add_two_way_link(NodeId(0), NodeId(1), 1.0);
    network.add_two_way_link(NodeId(0), NodeId(2), 20.0);
    network.add_two_way_link(NodeId(2), NodeId(1), 20.0);

    let provider = NetworkRouteProvider::new(&network);
    let from = network.location_of(NodeId(0)).expect("node");
    let to = network.location_of(NodeId(1)).expect("node");
    let route = provider.route(&from, &to).expect("route");
    assert_eq!(route.path, vec![NodeId(0), NodeId(2), NodeId(1)]);
    assert!(route.distance_m > 1_000.0);
    assert!(route.duration_ms < 1_000_000);
}

#[test]
fn build_route_provider_network_is_usable() {
    let network = RoadNetwork::grid(3, 3, 100.0, 10.0);
    let provider = build_route_provider(&RouteProviderKind::Network {
        network: network.clone(),
    });
    let from = network.location_of(NodeId(0)).expect("corner");
    let to = network.location_of(NodeId(8)).expect("opposite corner");
    let route = provider.route(&from, &to).expect("route");
    assert_eq!(route.distance_m, 400.0);
    assert_eq!(route.duration_ms, 40_000);
    // Second lookup is served from the cache and must be identical.
    assert_eq!(provider.route(&from, &to), Some(route));
}

#[test]
fn cached_provider_falls_back_to_straight_line_when_asked() {
    let network = RoadNetwork::grid(2, 1, 100.0, 10.0);
    let island = Location::new(NodeId(99), Coord::new(1_000.0, 0.0));
    let from = network.location_of(NodeId(0)).expect("node");

    let strict = CachedRouteProvider::new(Box::new(NetworkRouteProvider::new(&network)), 16, false);
    assert!(strict.route(&from, &island).is_none());

    let lenient = CachedRouteProvider::new(Box::new(NetworkRouteProvider::new(&network)), 16, true);
    let route = lenient.route(&from, &island).expect("fallback route");
    assert_eq!(route.distance_m, 1_000.0);
}

#[test]
fn route_provider_kind_round_trips_through_json() {
    let kind = RouteProviderKind::Network {
        network: RoadNetwork::grid(2, 2, 50.0, 8.0),
    };
    let json = serde_json::to_string(&kind).expect("serialize");
    let back: RouteProviderKind = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, kind);
}
