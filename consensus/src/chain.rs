//! Check that a block extends its predecessor.
//!
//! A block is chained to a previous block if all of the following hold (checked in this order):
//!
//! 1. It names the previous block as its parent.
//! 2. Its height is exactly one more than the previous block's.
//! 3. It was forged strictly later than the previous block.
//!
//! By default "later" compares timestamps. Chains forged under older rules compare the slots
//! derived from those timestamps instead, which [Linker] supports through [TimeOrdering::Slot].

use crate::{
    milestone::MilestoneConfig,
    slots::{slot_number, BlockTimeLookup},
    types::BlockRef,
    Error,
};
use std::fmt::Display;
use tracing::debug;

/// How a block's time is compared to its predecessor's.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TimeOrdering {
    /// The next block's timestamp must be greater.
    #[default]
    Timestamp,

    /// The next block's slot must be greater.
    Slot,
}

/// The first check a pair of blocks fails.
enum Failure {
    IdMismatch,
    HeightNotPlusOne,
    TimestampNotSmaller,
    SlotNotSmaller { previous: u64, next: u64 },
}

fn link_failure<D: PartialEq>(previous: &BlockRef<D>, next: &BlockRef<D>) -> Option<Failure> {
    if next.previous_block.as_ref() != Some(&previous.id) {
        return Some(Failure::IdMismatch);
    }
    if previous.height.checked_add(1) != Some(next.height) {
        return Some(Failure::HeightNotPlusOne);
    }
    None
}

fn render<D: Display>(previous: &BlockRef<D>, next: &BlockRef<D>, failure: Failure) -> String {
    let reason = match failure {
        Failure::IdMismatch => "previous block id mismatch".to_string(),
        Failure::HeightNotPlusOne => "height is not plus one".to_string(),
        Failure::TimestampNotSmaller => format!(
            "previous timestamp is not smaller: {} VS {}",
            previous.timestamp, next.timestamp
        ),
        Failure::SlotNotSmaller {
            previous: previous_slot,
            next: next_slot,
        } => format!(
            "previous slot is not smaller: {previous_slot} (derived from timestamp {}) VS \
             {next_slot} (derived from timestamp {})",
            previous.timestamp, next.timestamp
        ),
    };
    let parent = next
        .previous_block
        .as_ref()
        .map_or_else(|| "null".to_string(), ToString::to_string);
    let block = format!(
        "Block {{ height: {}, id: {}, previousBlock: {parent} }}",
        next.height, next.id
    );
    let previous_block = format!("{{ height: {}, id: {} }}", previous.height, previous.id);
    format!("{block} is not chained to the previous block {previous_block}: {reason}")
}

fn timestamp_failure<D: PartialEq>(previous: &BlockRef<D>, next: &BlockRef<D>) -> Option<Failure> {
    let failure = link_failure(previous, next);
    if failure.is_none() && previous.timestamp >= next.timestamp {
        return Some(Failure::TimestampNotSmaller);
    }
    failure
}

/// Returns true if `next` extends `previous`, comparing timestamps.
pub fn is_block_chained<D: PartialEq>(previous: &BlockRef<D>, next: &BlockRef<D>) -> bool {
    timestamp_failure(previous, next).is_none()
}

/// Describes why `next` does not extend `previous`, comparing timestamps.
///
/// # Panics
///
/// Panics if the blocks are chained.
pub fn block_not_chained_message<D: PartialEq + Display>(
    previous: &BlockRef<D>,
    next: &BlockRef<D>,
) -> String {
    match timestamp_failure(previous, next) {
        Some(failure) => render(previous, next, failure),
        None => panic!("block had no chain error"),
    }
}

/// Checks block linkage under a configurable [TimeOrdering].
///
/// [TimeOrdering::Slot] derives each block's slot at its own height, so it needs the milestone
/// configuration and the block timestamps at milestone boundaries.
pub struct Linker<'a, L: ?Sized> {
    config: &'a MilestoneConfig,
    lookup: &'a L,
    ordering: TimeOrdering,
}

impl<'a, L: BlockTimeLookup + ?Sized> Linker<'a, L> {
    /// Creates a linker comparing timestamps.
    pub fn new(config: &'a MilestoneConfig, lookup: &'a L) -> Self {
        Self {
            config,
            lookup,
            ordering: TimeOrdering::default(),
        }
    }

    /// Sets how block times are compared.
    pub fn with_ordering(mut self, ordering: TimeOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Returns the configured ordering.
    pub fn ordering(&self) -> TimeOrdering {
        self.ordering
    }

    fn slot<D>(&self, block: &BlockRef<D>) -> u64 {
        slot_number(self.lookup, block.timestamp, block.height, self.config)
    }

    fn failure<D: PartialEq>(&self, previous: &BlockRef<D>, next: &BlockRef<D>) -> Option<Failure> {
        if self.ordering == TimeOrdering::Timestamp {
            return timestamp_failure(previous, next);
        }
        if let Some(failure) = link_failure(previous, next) {
            return Some(failure);
        }
        let (previous_slot, next_slot) = (self.slot(previous), self.slot(next));
        if previous_slot >= next_slot {
            return Some(Failure::SlotNotSmaller {
                previous: previous_slot,
                next: next_slot,
            });
        }
        None
    }

    /// Returns true if `next` extends `previous`.
    pub fn is_chained<D: PartialEq>(&self, previous: &BlockRef<D>, next: &BlockRef<D>) -> bool {
        self.failure(previous, next).is_none()
    }

    /// Describes why `next` does not extend `previous`.
    ///
    /// # Panics
    ///
    /// Panics if the blocks are chained.
    pub fn not_chained_message<D: PartialEq + Display>(
        &self,
        previous: &BlockRef<D>,
        next: &BlockRef<D>,
    ) -> String {
        match self.failure(previous, next) {
            Some(failure) => render(previous, next, failure),
            None => panic!("block had no chain error"),
        }
    }

    /// Returns [Error::NotChained] if `next` does not extend `previous`.
    pub fn verify<D: PartialEq + Display>(
        &self,
        previous: &BlockRef<D>,
        next: &BlockRef<D>,
    ) -> Result<(), Error> {
        let Some(failure) = self.failure(previous, next) else {
            return Ok(());
        };
        let message = render(previous, next, failure);
        debug!(height = next.height, ordering = ?self.ordering, %message, "block not chained");
        Err(Error::NotChained(message))
    }
}
