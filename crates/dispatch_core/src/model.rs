//! Core records: requests, vehicles' tasks and schedules.

use crate::routing::RouteResult;
use crate::spatial::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u32);

/// A service demand awaiting a vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub id: RequestId,
    /// Simulation time the request was submitted.
    pub submitted_at: u64,
    /// Earliest time the passenger can be picked up; equals `submitted_at` unless pre-booked.
    pub earliest_pickup_at: u64,
    pub origin: Location,
    pub destination: Location,
}

impl Request {
    /// An immediate request: pickup possible from submission onwards.
    pub fn new(id: RequestId, submitted_at: u64, origin: Location, destination: Location) -> Self {
        Self {
            id,
            submitted_at,
            earliest_pickup_at: submitted_at,
            origin,
            destination,
        }
    }

    pub fn with_earliest_pickup_at(mut self, earliest_pickup_at: u64) -> Self {
        self.earliest_pickup_at = earliest_pickup_at.max(self.submitted_at);
        self
    }

    /// Time spent in the unplanned pool so far.
    pub fn waited_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.submitted_at)
    }
}

/// What a vehicle is doing during a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    Stay,
    Drive { route: RouteResult },
    Pickup { request: Request },
    Dropoff { request: Request },
}

/// Discriminant of [`TaskKind`], handy for assertions and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Stay,
    Drive,
    Pickup,
    Dropoff,
}

impl TaskKind {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskKind::Stay => TaskType::Stay,
            TaskKind::Drive { .. } => TaskType::Drive,
            TaskKind::Pickup { .. } => TaskType::Pickup,
            TaskKind::Dropoff { .. } => TaskType::Dropoff,
        }
    }

    /// The request served by this task (PICKUP and DROPOFF only).
    pub fn request(&self) -> Option<&Request> {
        match self {
            TaskKind::Pickup { request } | TaskKind::Dropoff { request } => Some(request),
            TaskKind::Stay | TaskKind::Drive { .. } => None,
        }
    }
}

/// One atomic unit of vehicle activity.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub kind: TaskKind,
    pub begin_at: u64,
    pub end_at: u64,
    /// Where the task happens; for DRIVE, where it ends.
    pub location: Location,
}

impl Task {
    pub fn stay(begin_at: u64, end_at: u64, location: Location) -> Self {
        Self {
            kind: TaskKind::Stay,
            begin_at,
            end_at,
            location,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.kind.task_type()
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_at.saturating_sub(self.begin_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    /// No task has begun yet.
    Planned,
    /// Exactly one task is current.
    Started,
    /// Every task has finished.
    Completed,
}

/// Ordered, time-contiguous task list owned by one vehicle.
///
/// Mutated only through the fleet model (`Fleet::commit` / `Fleet::advance`).
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub(crate) tasks: Vec<Task>,
    pub(crate) current: Option<usize>,
    pub(crate) status: ScheduleStatus,
    /// End of the owning vehicle's operating window.
    pub(crate) window_end: u64,
}

impl Schedule {
    /// A fresh schedule: one STAY covering the whole operating window.
    pub fn new(t0: u64, t1: u64, start: Location) -> Self {
        Self {
            tasks: vec![Task::stay(t0, t1.max(t0), start)],
            current: None,
            status: ScheduleStatus::Planned,
            window_end: t1,
        }
    }

    pub fn status(&self) -> ScheduleStatus {
        self.status
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current.and_then(|idx| self.tasks.get(idx))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn last_task(&self) -> Option<&Task> {
        self.tasks.last()
    }

    /// Tasks committed after the current one.
    pub fn future_tasks(&self) -> &[Task] {
        match self.current {
            Some(idx) => &self.tasks[idx + 1..],
            None if self.status == ScheduleStatus::Planned => &self.tasks,
            None => &[],
        }
    }

    /// Current task is an open STAY with nothing after it, begun inside the operating
    /// window. A STAY reached at or after the window end only parks the vehicle.
    pub fn is_idle(&self) -> bool {
        self.status == ScheduleStatus::Started
            && self.future_tasks().is_empty()
            && self.current_task().is_some_and(|task| {
                task.task_type() == TaskType::Stay && task.begin_at < self.window_end
            })
    }

    pub fn window_end(&self) -> u64 {
        self.window_end
    }

    /// `task[i].end_at == task[i + 1].begin_at` for every consecutive pair.
    pub fn is_contiguous(&self) -> bool {
        self.tasks
            .windows(2)
            .all(|pair| pair[0].end_at == pair[1].begin_at && pair[0].begin_at <= pair[0].end_at)
    }
}
