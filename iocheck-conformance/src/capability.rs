//! Capability resolution from a driver descriptor.

use std::collections::BTreeSet;

use iocheck_driver::DriverDescriptor;
use iocheck_schema::Kind;

use crate::types::SkipReason;

/// Direction of a round-trip scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Write a synthetic tree, read it back, compare objects.
    WriteThenRead,
    /// Read a fixture, write it again, compare bytes.
    ReadThenWrite,
}

/// What a driver class can do, derived once per suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub read_and_write: BTreeSet<Kind>,
    pub read_or_write: BTreeSet<Kind>,
    /// First supported kind, the root of everything the driver handles.
    pub highest: Option<Kind>,
    pub supports_lazy: bool,
    round_trip_eligible: BTreeSet<Kind>,
}

impl Capabilities {
    pub fn resolve(descriptor: &DriverDescriptor) -> Self {
        let readable = descriptor.readable_kinds();
        let writeable = descriptor.writeable_kinds();

        let read_and_write: BTreeSet<Kind> = readable.intersection(writeable).copied().collect();
        let read_or_write: BTreeSet<Kind> = readable.union(writeable).copied().collect();

        // Kinds needing read parameters cannot be read back without
        // driver-specific knowledge.
        let round_trip_eligible = read_and_write
            .iter()
            .copied()
            .filter(|kind| kind.is_container_root())
            .filter(|kind| {
                descriptor
                    .read_params_for(*kind)
                    .map_or(true, |params| params.is_empty())
            })
            .collect();

        Self {
            read_and_write,
            read_or_write,
            highest: descriptor.supported_kinds().first().copied(),
            supports_lazy: descriptor.supports_lazy(),
            round_trip_eligible,
        }
    }

    /// True if `kind` can be written then read back without
    /// driver-specific parameters.
    pub fn eligible_for_generic_round_trip(&self, kind: Kind) -> bool {
        self.round_trip_eligible.contains(&kind)
    }

    /// Gate a round-trip scenario. `Err` carries the reason to skip.
    pub fn able_to_write_or_read(
        &self,
        bijective: bool,
        hash_conserved: bool,
        direction: Direction,
    ) -> Result<Kind, SkipReason> {
        let highest = match self.highest {
            Some(kind) if self.eligible_for_generic_round_trip(kind) => kind,
            other => return Err(SkipReason::NotRoundTripEligible { highest: other }),
        };
        match direction {
            Direction::WriteThenRead if !bijective => Err(SkipReason::NotBijective),
            Direction::ReadThenWrite if !hash_conserved => {
                Err(SkipReason::HashConservationNotDeclared)
            }
            _ => Ok(highest),
        }
    }
}
