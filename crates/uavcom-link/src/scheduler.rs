use bytes::BytesMut;
use tracing::{debug, trace};
use uavcom_frame::{FrameLink, TransportHeader};
use uavcom_transport::ByteSink;

use crate::messages::ids;
use crate::vehicle::Vehicle;

/// Builds one outbound message body per scheduled run.
///
/// Implemented for any `FnMut(&Vehicle, u64, &mut BytesMut)`, so a closure
/// can be registered directly.
pub trait MessageProducer {
    /// Append the message body for `vehicle` at time `now_us` to `out`.
    fn produce(&mut self, vehicle: &Vehicle, now_us: u64, out: &mut BytesMut);
}

impl<F> MessageProducer for F
where
    F: FnMut(&Vehicle, u64, &mut BytesMut),
{
    fn produce(&mut self, vehicle: &Vehicle, now_us: u64, out: &mut BytesMut) {
        self(vehicle, now_us, out)
    }
}

/// One row of the schedule table.
pub struct ScheduleEntry {
    id: u32,
    divisor: u16,
    counter: u16,
    producer: Box<dyn MessageProducer>,
}

impl ScheduleEntry {
    pub fn new(id: u32, divisor: u16, producer: impl MessageProducer + 'static) -> Self {
        Self {
            id,
            divisor,
            counter: 0,
            producer: Box::new(producer),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Ticks between runs; zero disables the entry.
    pub fn divisor(&self) -> u16 {
        self.divisor
    }
}

impl std::fmt::Debug for ScheduleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleEntry")
            .field("id", &self.id)
            .field("divisor", &self.divisor)
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

/// Default divisors at the 1 kHz tick.
pub const DEFAULT_DIVISORS: [(u32, u16); 6] = [
    (ids::IMU, 2),
    (ids::VEHICLE_STATUS, 50),
    (ids::RC_DATA, 50),
    (ids::MOTOR_STATE, 3),
    (ids::GPS_DATA, 200),
    (ids::FILTERED_SENSOR_DATA, 3),
];

/// Rate-divided table of outbound producers.
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<ScheduleEntry>,
    body: BytesMut,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Entries run in insertion order.
    pub fn push(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Current divisor of the first entry with `id`.
    pub fn divisor(&self, id: u32) -> Option<u16> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.divisor)
    }

    /// Set the divisor of every entry with `id`. Returns false if none
    /// matched.
    pub fn set_divisor(&mut self, id: u32, divisor: u16) -> bool {
        let mut matched = false;
        for entry in self.entries.iter_mut().filter(|e| e.id == id) {
            entry.divisor = divisor;
            matched = true;
        }
        if matched {
            debug!(id = format_args!("{id:#x}"), divisor, "message rate divisor updated");
        }
        matched
    }

    /// Advance every entry by one tick and send what is due.
    ///
    /// Send failures are left to the link counters. Returns the number of
    /// producers that ran.
    pub fn tick<S: ByteSink + ?Sized>(
        &mut self,
        link: &mut FrameLink,
        tx: &mut S,
        vehicle: &Vehicle,
        now_us: u64,
    ) -> usize {
        let mut ran = 0usize;
        for entry in &mut self.entries {
            entry.counter = entry.counter.saturating_add(1);
            if entry.divisor == 0 || entry.counter < entry.divisor {
                continue;
            }
            entry.counter = 0;

            self.body.clear();
            entry.producer.produce(vehicle, now_us, &mut self.body);
            ran += 1;

            let header = TransportHeader::new(entry.id);
            if let Err(err) = link.send_message(tx, &header, &self.body) {
                trace!(id = format_args!("{:#x}", entry.id), error = %err, "scheduled send dropped");
            }
        }
        ran
    }
}
