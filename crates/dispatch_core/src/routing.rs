//! Pluggable route providers: trait abstraction for routing backends.
//!
//! Implementations, selectable via [`RouteProviderKind`]:
//!
//! - **`StraightLineRouteProvider`**: Euclidean distance at a constant speed. Zero setup.
//! - **`NetworkRouteProvider`**: fastest path over a directed road network (Dijkstra).
//!
//! Both can be wrapped in a [`CachedRouteProvider`]. The dispatch core only ever sees a
//! `&dyn RouteProvider`; how routes are computed belongs to the host.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use pathfinding::prelude::dijkstra;
use serde::{Deserialize, Serialize};

use crate::spatial::{Coord, Location, NodeId};

/// Average urban speed used when nothing better is configured: 40 km/h.
pub const DEFAULT_SPEED_MPS: f64 = 40.0 / 3.6;

/// Default route cache capacity for network routing.
const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 20_000;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Result of a route query between two locations.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteResult {
    /// Nodes visited, origin first.
    pub path: Vec<NodeId>,
    /// Network distance in metres.
    pub distance_m: f64,
    /// Free-flow travel time in milliseconds.
    pub duration_ms: u64,
}

/// Trait for routing backends. Must be deterministic for a fixed network state.
pub trait RouteProvider: Send + Sync {
    /// Route between two locations. Returns `None` if the destination is unreachable.
    fn route(&self, from: &Location, to: &Location) -> Option<RouteResult>;
}

fn travel_ms(distance_m: f64, speed_mps: f64) -> u64 {
    if distance_m <= 0.0 {
        return 0;
    }
    (distance_m / speed_mps * 1000.0).round() as u64
}

// ---------------------------------------------------------------------------
// Straight-line provider
// ---------------------------------------------------------------------------

/// Routes as the crow flies at a constant speed.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineRouteProvider {
    pub speed_mps: f64,
}

impl StraightLineRouteProvider {
    pub fn new(speed_mps: f64) -> Self {
        Self { speed_mps }
    }
}

impl Default for StraightLineRouteProvider {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_MPS)
    }
}

impl RouteProvider for StraightLineRouteProvider {
    fn route(&self, from: &Location, to: &Location) -> Option<RouteResult> {
        let distance_m = from.coord.distance(&to.coord);
        let path = if from.node == to.node {
            vec![from.node]
        } else {
            vec![from.node, to.node]
        };
        Some(RouteResult {
            path,
            distance_m,
            duration_ms: travel_ms(distance_m, self.speed_mps),
        })
    }
}

// ---------------------------------------------------------------------------
// Road network provider
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: NodeId,
    pub coord: Coord,
}

/// Directed link between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkLink {
    pub from: NodeId,
    pub to: NodeId,
    pub length_m: f64,
    pub freespeed_mps: f64,
}

/// Serializable road network description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
}

impl RoadNetwork {
    pub fn add_node(&mut self, id: NodeId, coord: Coord) {
        self.nodes.push(NetworkNode { id, coord });
    }

    /// Add links in both directions with the straight-line length between the endpoints.
    pub fn add_two_way_link(&mut self, a: NodeId, b: NodeId, freespeed_mps: f64) {
        let length_m = match (self.coord_of(a), self.coord_of(b)) {
            (Some(ca), Some(cb)) => ca.distance(&cb),
            _ => 0.0,
        };
        for (from, to) in [(a, b), (b, a)] {
            self.links.push(NetworkLink {
                from,
                to,
                length_m,
                freespeed_mps,
            });
        }
    }

    pub fn coord_of(&self, id: NodeId) -> Option<Coord> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.coord)
    }

    pub fn location_of(&self, id: NodeId) -> Option<Location> {
        self.coord_of(id).map(|coord| Location::new(id, coord))
    }

    /// Square lattice of `cols x rows` nodes, `spacing_m` apart, connected to their
    /// horizontal and vertical neighbours. Node ids are `row * cols + col`.
    pub fn grid(cols: u32, rows: u32, spacing_m: f64, freespeed_mps: f64) -> Self {
        let mut network = Self::default();
        for row in 0..rows {
            for col in 0..cols {
                network.add_node(
                    NodeId(row * cols + col),
                    Coord::new(col as f64 * spacing_m, row as f64 * spacing_m),
                );
            }
        }
        for row in 0..rows {
            for col in 0..cols {
                let id = NodeId(row * cols + col);
                if col + 1 < cols {
                    network.add_two_way_link(id, NodeId(row * cols + col + 1), freespeed_mps);
                }
                if row + 1 < rows {
                    network.add_two_way_link(id, NodeId((row + 1) * cols + col), freespeed_mps);
                }
            }
        }
        network
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: NodeId,
    duration_ms: u64,
    length_m: f64,
}

/// Fastest-path routing over a [`RoadNetwork`].
pub struct NetworkRouteProvider {
    adjacency: HashMap<NodeId, Vec<Edge>>,
}

impl NetworkRouteProvider {
    pub fn new(network: &RoadNetwork) -> Self {
        let mut adjacency: HashMap<NodeId, Vec<Edge>> = HashMap::new();
        for link in &network.links {
            adjacency.entry(link.from).or_default().push(Edge {
                to: link.to,
                duration_ms: travel_ms(link.length_m, link.freespeed_mps).max(1),
                length_m: link.length_m,
            });
        }
        // Stable successor order keeps equal-cost path choice deterministic.
        for edges in adjacency.values_mut() {
            edges.sort_by_key(|e| (e.to, e.duration_ms));
        }
        Self { adjacency }
    }

    fn fastest_edge(&self, from: NodeId, to: NodeId) -> Option<&Edge> {
        self.adjacency
            .get(&from)?
            .iter()
            .filter(|e| e.to == to)
            .min_by_key(|e| e.duration_ms)
    }
}

impl RouteProvider for NetworkRouteProvider {
    fn route(&self, from: &Location, to: &Location) -> Option<RouteResult> {
        let (path, duration_ms) = dijkstra(
            &from.node,
            |node| {
                self.adjacency
                    .get(node)
                    .map(|edges| edges.iter().map(|e| (e.to, e.duration_ms)).collect::<Vec<_>>())
                    .unwrap_or_else(Vec::new)
            },
            |node| *node == to.node,
        )?;
        let distance_m: f64 = path
            .windows(2)
            .filter_map(|pair| self.fastest_edge(pair[0], pair[1]))
            .map(|e| e.length_m)
            .sum();
        Some(RouteResult {
            path,
            distance_m,
            duration_ms,
        })
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// Cache key is `(from_node, to_node)` (directional). On inner failure the optional
/// straight-line fallback is tried before returning `None`.
pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    cache: Mutex<LruCache<(NodeId, NodeId), RouteResult>>,
    fallback_to_straight_line: bool,
}

impl CachedRouteProvider {
    pub fn new(inner: Box<dyn RouteProvider>, capacity: usize, fallback_to_straight_line: bool) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            fallback_to_straight_line,
        }
    }
}

impl RouteProvider for CachedRouteProvider {
    fn route(&self, from: &Location, to: &Location) -> Option<RouteResult> {
        let key = (from.node, to.node);

        // Fast path: cache hit
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Some(cached.clone());
            }
        }

        let result = self.inner.route(from, to).or_else(|| {
            if self.fallback_to_straight_line {
                StraightLineRouteProvider::default().route(from, to)
            } else {
                None
            }
        });

        if let Some(ref route) = result {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, route.clone());
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Factory: build a provider from RouteProviderKind
// ---------------------------------------------------------------------------

/// Which routing backend to use. Part of the serializable dispatch configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum RouteProviderKind {
    StraightLine { speed_mps: f64 },
    Network { network: RoadNetwork },
}

impl Default for RouteProviderKind {
    fn default() -> Self {
        RouteProviderKind::StraightLine {
            speed_mps: DEFAULT_SPEED_MPS,
        }
    }
}

/// Construct a boxed [`RouteProvider`] from a [`RouteProviderKind`] descriptor.
///
/// Straight-line routing is returned uncached; network routing is cached without fallback,
/// so unreachable destinations stay unreachable.
pub fn build_route_provider(kind: &RouteProviderKind) -> Box<dyn RouteProvider> {
    match kind {
        RouteProviderKind::StraightLine { speed_mps } => {
            Box::new(StraightLineRouteProvider::new(*speed_mps))
        }
        RouteProviderKind::Network { network } => Box::new(CachedRouteProvider::new(
            Box::new(NetworkRouteProvider::new(network)),
            DEFAULT_ROUTE_CACHE_CAPACITY,
            false,
        )),
    }
}
