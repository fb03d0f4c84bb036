//! Publish configuration snapshots.
//!
//! A [MilestoneConfig] is never mutated. To reconfigure a running node, validate a new
//! configuration and publish it: later calls to [Snapshots::current] observe the new snapshot
//! while callers still holding the previous one finish their work against it.

use crate::{milestone::MilestoneConfig, Error};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// The active configuration snapshot.
#[derive(Debug)]
pub struct Snapshots {
    active: RwLock<Arc<MilestoneConfig>>,
}

impl Snapshots {
    /// Validates `config` and makes it the active snapshot.
    pub fn new(config: MilestoneConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            active: RwLock::new(Arc::new(config)),
        })
    }

    /// Returns the active snapshot.
    pub fn current(&self) -> Arc<MilestoneConfig> {
        // The lock only guards an `Arc` swap, so a poisoned value is still consistent
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validates `config` and, if valid, replaces the active snapshot with it.
    ///
    /// A rejected configuration leaves the active snapshot unchanged.
    pub fn publish(&self, config: MilestoneConfig) -> Result<(), Error> {
        if let Err(err) = config.validate() {
            warn!(?err, "rejected configuration");
            return Err(err);
        }
        let milestones = config.milestones().len();
        let config = Arc::new(config);
        *self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
        info!(milestones, "published configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures::config, milestone::RawMilestone, round::calculate_round};
    use std::thread;

    fn validators(changes: &[(u64, u32)]) -> MilestoneConfig {
        config(
            changes
                .iter()
                .map(|&(height, active)| RawMilestone::at(height).active_validators(active))
                .collect(),
        )
    }

    #[test]
    fn test_publish() {
        let snapshots = Snapshots::new(validators(&[(0, 4)])).unwrap();
        let before = snapshots.current();
        assert_eq!(calculate_round(9, &before).unwrap().round, 3);

        snapshots.publish(validators(&[(0, 4), (9, 2)])).unwrap();
        let after = snapshots.current();
        assert_eq!(calculate_round(11, &after).unwrap().round, 4);

        // Readers holding the previous snapshot are unaffected
        assert_eq!(calculate_round(11, &before).unwrap().round, 3);
    }

    #[test]
    fn test_publish_rejected() {
        let snapshots = Snapshots::new(validators(&[(0, 4)])).unwrap();
        let before = snapshots.current();
        assert!(matches!(
            snapshots.publish(validators(&[(0, 4), (3, 2)])),
            Err(Error::InvalidMilestoneConfiguration { height: 3, .. })
        ));
        assert!(Arc::ptr_eq(&before, &snapshots.current()));
    }

    #[test]
    fn test_new_rejected() {
        assert!(Snapshots::new(validators(&[(0, 3), (2, 4)])).is_err());
    }

    #[test]
    fn test_concurrent_readers() {
        let snapshots = Arc::new(Snapshots::new(validators(&[(0, 4)])).unwrap());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let snapshots = snapshots.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let config = snapshots.current();
                        let active = config.milestone(1).active_validators;
                        assert!(active == 4 || active == 5);
                    }
                })
            })
            .collect();
        for active in [5, 4, 5] {
            snapshots.publish(validators(&[(0, active)])).unwrap();
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
