use std::fmt;

use serde::Serialize;

use crate::config::DOUBLE_ROOM_CAPACITY;
use crate::evaluator::EvaluationError;

/// A fixed split of the ward into single and double rooms.
///
/// Always satisfies `single_rooms + 2 * double_rooms == total_beds` for the
/// ward it was built against; there is no way to mutate it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RoomConfiguration {
    single_rooms: u32,
    double_rooms: u32,
}

impl RoomConfiguration {
    pub fn new(single_rooms: u32, double_rooms: u32, total_beds: u32) -> Result<Self, EvaluationError> {
        let config = Self {
            single_rooms,
            double_rooms,
        };
        config.check(total_beds)?;
        Ok(config)
    }

    /// The configuration with `double_rooms` doubles and every other bed in
    /// a single room, if that many doubles fit
    pub fn with_double_rooms(double_rooms: u32, total_beds: u32) -> Option<Self> {
        let single_rooms = total_beds.checked_sub(DOUBLE_ROOM_CAPACITY.checked_mul(double_rooms)?)?;
        Some(Self {
            single_rooms,
            double_rooms,
        })
    }

    /// Baseline: as many double rooms as the ward holds (one single room
    /// picks up the odd bed when the total is odd)
    pub fn all_double(total_beds: u32) -> Self {
        Self {
            single_rooms: total_beds % DOUBLE_ROOM_CAPACITY,
            double_rooms: total_beds / DOUBLE_ROOM_CAPACITY,
        }
    }

    pub fn single_rooms(&self) -> u32 {
        self.single_rooms
    }

    pub fn double_rooms(&self) -> u32 {
        self.double_rooms
    }

    /// Every constructor has checked this against a `u32` ward total, so it
    /// cannot overflow
    pub fn total_beds(&self) -> u32 {
        self.single_rooms + DOUBLE_ROOM_CAPACITY * self.double_rooms
    }

    fn beds(&self) -> u64 {
        self.single_rooms as u64 + DOUBLE_ROOM_CAPACITY as u64 * self.double_rooms as u64
    }

    pub fn total_rooms(&self) -> u32 {
        self.single_rooms + self.double_rooms
    }

    /// Precondition for evaluating against a ward of `total_beds`
    pub fn check(&self, total_beds: u32) -> Result<(), EvaluationError> {
        let beds = self.beds();
        if beds != total_beds as u64 {
            return Err(EvaluationError::InvalidConfiguration {
                single_rooms: self.single_rooms,
                double_rooms: self.double_rooms,
                beds,
                total_beds,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RoomConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}S/{}D", self.single_rooms, self.double_rooms)
    }
}
