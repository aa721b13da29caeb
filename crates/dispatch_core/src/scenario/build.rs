use bevy_ecs::prelude::{Mut, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::error::DispatchError;
use crate::fleet::Vehicle;
use crate::model::{Request, RequestId, VehicleId};
use crate::optimizer::{build_optimizer, DispatchOptimizer};
use crate::routing::{NetworkNode, RouteProviderKind};
use crate::runner::{
    DispatchFailure, OptimizerResource, PendingRequests, ReoptimizationQueue,
    SimulationEndTimeMs, TaskEndTracker,
};
use crate::scenario::params::ScenarioParams;
use crate::spatial::{Coord, Location, NodeId};
use crate::telemetry::DispatchTelemetry;

/// Maximum destination draws before accepting a trip shorter than `min_trip_m`.
const MAX_REJECTION_SAMPLING_ATTEMPTS: usize = 100;

/// Insert the clock, the optimizer and every resource the dispatch systems expect.
pub fn init_dispatch_world(
    world: &mut World,
    optimizer: Box<dyn DispatchOptimizer>,
    reoptimization_interval_ms: Option<u64>,
) {
    world.insert_resource(SimulationClock::default());
    world.insert_resource(OptimizerResource(optimizer));
    world.insert_resource(PendingRequests::default());
    world.insert_resource(ReoptimizationQueue::with_interval(reoptimization_interval_ms));
    world.insert_resource(TaskEndTracker::default());
    world.insert_resource(DispatchFailure::default());
    world.insert_resource(DispatchTelemetry::default());
}

/// Hand `vehicle` to the optimizer and schedule its start at `t0`.
pub fn spawn_vehicle(world: &mut World, vehicle: Vehicle) -> Result<(), DispatchError> {
    let (id, t0) = (vehicle.id, vehicle.t0);
    world.resource_mut::<OptimizerResource>().0.add_vehicle(vehicle)?;
    world.resource_scope(|world, mut tracker: Mut<TaskEndTracker>| {
        tracker.schedule(&mut world.resource_mut::<SimulationClock>(), id, t0);
    });
    Ok(())
}

/// Park `request` until its submission time fires.
pub fn submit_request(world: &mut World, request: Request) {
    world
        .resource_mut::<PendingRequests>()
        .0
        .insert(request.id, request);
    world.resource_mut::<SimulationClock>().schedule_at(
        request.submitted_at,
        EventKind::RequestSubmitted,
        Some(EventSubject::Request(request.id)),
    );
}

/// Draws locations either from the road network's nodes or uniformly from the area.
enum LocationSampler<'a> {
    Nodes(&'a [NetworkNode]),
    Area { size_m: f64, next_node: u32 },
}

impl<'a> LocationSampler<'a> {
    fn new(params: &'a ScenarioParams) -> Self {
        match &params.dispatch.routing {
            RouteProviderKind::Network { network } if !network.nodes.is_empty() => {
                LocationSampler::Nodes(&network.nodes)
            }
            _ => LocationSampler::Area {
                size_m: params.area_size_m.max(1.0),
                next_node: 0,
            },
        }
    }

    fn sample<R: Rng>(&mut self, rng: &mut R) -> Location {
        match self {
            LocationSampler::Nodes(nodes) => {
                let node = &nodes[rng.gen_range(0..nodes.len())];
                Location::new(node.id, node.coord)
            }
            LocationSampler::Area { size_m, next_node } => {
                let coord = Coord::new(rng.gen_range(0.0..*size_m), rng.gen_range(0.0..*size_m));
                let node = NodeId(*next_node);
                *next_node += 1;
                Location::new(node, coord)
            }
        }
    }

    fn sample_destination<R: Rng>(&mut self, rng: &mut R, origin: &Location, min_trip_m: f64) -> Location {
        let mut candidate = self.sample(rng);
        for _ in 0..MAX_REJECTION_SAMPLING_ATTEMPTS {
            if candidate.coord.distance(&origin.coord) >= min_trip_m {
                break;
            }
            candidate = self.sample(rng);
        }
        candidate
    }
}

/// Build a complete dispatch world from `params`: optimizer, fleet and request stream.
pub fn build_scenario(world: &mut World, params: ScenarioParams) -> Result<(), DispatchError> {
    let optimizer = build_optimizer(&params.dispatch)?;
    init_dispatch_world(world, optimizer, params.reoptimization_interval_ms);
    world.insert_resource(params.dispatch.clone());
    if let Some(end_ms) = params.simulation_end_time_ms {
        world.insert_resource(SimulationEndTimeMs(end_ms));
    }

    let seed = params.seed.unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sampler = LocationSampler::new(&params);

    for idx in 0..params.num_vehicles {
        let start = sampler.sample(&mut rng);
        spawn_vehicle(
            world,
            Vehicle::new(VehicleId(idx as u32), 0, params.shift_end_ms, start),
        )?;
    }

    let prebooked_fraction = params.prebooked_fraction.clamp(0.0, 1.0);
    for idx in 0..params.num_requests {
        let submitted_at = rng.gen_range(0..=params.request_window_ms);
        let origin = sampler.sample(&mut rng);
        let destination = sampler.sample_destination(&mut rng, &origin, params.min_trip_m);
        let mut request = Request::new(RequestId(idx as u32), submitted_at, origin, destination);
        if rng.gen_bool(prebooked_fraction) {
            let lead = rng.gen_range(0..=params.max_prebook_lead_ms);
            request = request.with_earliest_pickup_at(submitted_at + lead);
        }
        submit_request(world, request);
    }
    Ok(())
}
