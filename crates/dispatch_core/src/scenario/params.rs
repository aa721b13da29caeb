use crate::config::DispatchConfig;

/// Default side length of the square service area (metres).
const DEFAULT_AREA_SIZE_M: f64 = 10_000.0;

/// Default time window for request submissions: 1 hour (simulation ms).
const DEFAULT_REQUEST_WINDOW_MS: u64 = 60 * 60 * 1000;

/// Default vehicle operating window end: 3 hours (simulation ms).
const DEFAULT_SHIFT_END_MS: u64 = 3 * 60 * 60 * 1000;

/// Random scenario description: a fleet spread over a square area and requests submitted
/// uniformly over a time window.
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub num_vehicles: usize,
    pub num_requests: usize,
    /// RNG seed. `None` behaves like seed 0.
    pub seed: Option<u64>,
    /// Side of the square `[0, area) x [0, area)` that straight-line scenarios sample from.
    pub area_size_m: f64,
    /// Requests are submitted uniformly in `[0, request_window_ms]`.
    pub request_window_ms: u64,
    /// Every vehicle operates in `[0, shift_end_ms]`.
    pub shift_end_ms: u64,
    /// Share of requests booked ahead of time (0.0–1.0).
    pub prebooked_fraction: f64,
    /// Upper bound on how far ahead a pre-booked pickup may be.
    pub max_prebook_lead_ms: u64,
    /// Trips shorter than this are resampled (straight-line distance).
    pub min_trip_m: f64,
    /// Retry matching this often while requests stay unplanned. `None` matches only on
    /// submissions and vehicles becoming idle.
    pub reoptimization_interval_ms: Option<u64>,
    /// Optional simulation end time in ms. If set, runner stops when next event >= this time.
    pub simulation_end_time_ms: Option<u64>,
    pub dispatch: DispatchConfig,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            num_vehicles: 20,
            num_requests: 200,
            seed: None,
            area_size_m: DEFAULT_AREA_SIZE_M,
            request_window_ms: DEFAULT_REQUEST_WINDOW_MS,
            shift_end_ms: DEFAULT_SHIFT_END_MS,
            prebooked_fraction: 0.0,
            max_prebook_lead_ms: 30 * 60 * 1000,
            min_trip_m: 500.0,
            reoptimization_interval_ms: None,
            simulation_end_time_ms: None,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fleet_size(mut self, num_vehicles: usize) -> Self {
        self.num_vehicles = num_vehicles;
        self
    }

    pub fn with_request_count(mut self, num_requests: usize) -> Self {
        self.num_requests = num_requests;
        self
    }

    pub fn with_area_size_m(mut self, area_size_m: f64) -> Self {
        self.area_size_m = area_size_m;
        self
    }

    /// Set the request time window in hours (requests arrive uniformly in [0, hours]).
    pub fn with_request_window_hours(mut self, hours: u64) -> Self {
        self.request_window_ms = hours * 60 * 60 * 1000;
        self
    }

    pub fn with_shift_end_ms(mut self, shift_end_ms: u64) -> Self {
        self.shift_end_ms = shift_end_ms;
        self
    }

    /// Book `fraction` of requests up to `max_lead_ms` ahead.
    pub fn with_prebooking(mut self, fraction: f64, max_lead_ms: u64) -> Self {
        self.prebooked_fraction = fraction;
        self.max_prebook_lead_ms = max_lead_ms;
        self
    }

    pub fn with_reoptimization_interval_ms(mut self, interval_ms: u64) -> Self {
        self.reoptimization_interval_ms = Some(interval_ms);
        self
    }

    /// Set simulation end time in ms. Runner stops when the next event is at or after this time.
    pub fn with_simulation_end_time_ms(mut self, end_ms: u64) -> Self {
        self.simulation_end_time_ms = Some(end_ms);
        self
    }

    pub fn with_dispatch_config(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }
}
