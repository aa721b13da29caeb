use dispatch_core::fleet::Vehicle;
use dispatch_core::model::{Request, RequestId, VehicleId};
use dispatch_core::spatial::{Coord, Location, NodeId};
use dispatch_core::test_helpers::TEST_SHIFT_END_MS;

/// Builder for vehicle fixtures.
#[derive(Clone, Debug)]
pub struct VehicleBuilder {
    id: u32,
    location: Location,
    t0: u64,
    t1: u64,
}

impl VehicleBuilder {
    /// Vehicle `id` at the origin, on node `id`, working the default test shift.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            location: Location::at(id, 0.0, 0.0),
            t0: 0,
            t1: TEST_SHIFT_END_MS,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.location.coord = Coord::new(x, y);
        self
    }

    pub fn on(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_shift(mut self, t0: u64, t1: u64) -> Self {
        self.t0 = t0;
        self.t1 = t1;
        self
    }

    pub fn build(self) -> Vehicle {
        Vehicle::new(VehicleId(self.id), self.t0, self.t1, self.location)
    }
}

/// Builder for request fixtures.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    id: u32,
    submitted_at: u64,
    earliest_pickup_at: Option<u64>,
    origin: Location,
    destination: Location,
}

impl RequestBuilder {
    /// Request `id` submitted at time zero, from the origin to 1 km east.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            submitted_at: 0,
            earliest_pickup_at: None,
            origin: Location::new(NodeId(10_000 + 2 * id), Coord::new(0.0, 0.0)),
            destination: Location::new(NodeId(10_001 + 2 * id), Coord::new(1_000.0, 0.0)),
        }
    }

    pub fn submitted_at(mut self, timestamp_ms: u64) -> Self {
        self.submitted_at = timestamp_ms;
        self
    }

    pub fn earliest_pickup_at(mut self, timestamp_ms: u64) -> Self {
        self.earliest_pickup_at = Some(timestamp_ms);
        self
    }

    pub fn origin_at(mut self, x: f64, y: f64) -> Self {
        self.origin.coord = Coord::new(x, y);
        self
    }

    pub fn destination_at(mut self, x: f64, y: f64) -> Self {
        self.destination.coord = Coord::new(x, y);
        self
    }

    pub fn between(mut self, origin: Location, destination: Location) -> Self {
        self.origin = origin;
        self.destination = destination;
        self
    }

    pub fn build(self) -> Request {
        let request = Request::new(
            RequestId(self.id),
            self.submitted_at,
            self.origin,
            self.destination,
        );
        match self.earliest_pickup_at {
            Some(at) => request.with_earliest_pickup_at(at),
            None => request,
        }
    }
}
