//! Module configuration.
//!
//! A [`ModuleConfig`] describes roles, delays, pools and triggers. After
//! construction the owner can only change it through a [`ConfigUpdate`]
//! that is queued, waits `config_update_delay`, and must then be finalized
//! within `config_update_grace_period` while the module is active. Pools
//! and triggers can only be added.

use std::collections::HashSet;

use bulwark_core::{Address, AssetId, TriggerId, U256, WAD, ZERO_ADDRESS};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Default withdrawal and unstake delay (7 days in seconds).
pub const DEFAULT_REDEMPTION_DELAY: u64 = 604_800;

/// Default wait before a queued configuration update can be finalized (2 days).
pub const DEFAULT_CONFIG_UPDATE_DELAY: u64 = 172_800;

/// Default window for finalizing a queued configuration update (1 day).
pub const DEFAULT_CONFIG_UPDATE_GRACE_PERIOD: u64 = 86_400;

/// Timing parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    /// Wait between queueing and completing a withdrawal (seconds).
    pub withdrawal_delay: u64,

    /// Wait between queueing and completing an unstake (seconds).
    pub unstake_delay: u64,

    /// Wait before a queued configuration update opens (seconds).
    pub config_update_delay: u64,

    /// How long a queued configuration update stays finalizable (seconds).
    pub config_update_grace_period: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            withdrawal_delay: DEFAULT_REDEMPTION_DELAY,
            unstake_delay: DEFAULT_REDEMPTION_DELAY,
            config_update_delay: DEFAULT_CONFIG_UPDATE_DELAY,
            config_update_grace_period: DEFAULT_CONFIG_UPDATE_GRACE_PERIOD,
        }
    }
}

/// A pool to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Underlying asset.
    pub asset: AssetId,

    /// Largest fraction of the pool one slash may remove (WAD).
    pub max_slash_percentage: U256,
}

/// A trigger to register.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Trigger identifier.
    pub trigger_id: TriggerId,

    /// Account allowed to slash once the trigger fires.
    pub payout_handler: Address,
}

/// Full module configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Account allowed to pause, unpause and update configuration.
    pub owner: Address,

    /// Account allowed to pause.
    pub pauser: Address,

    /// Timing parameters.
    pub delays: Delays,

    /// Pools in id order.
    pub pools: Vec<PoolConfig>,

    /// Registered triggers.
    pub triggers: Vec<TriggerConfig>,
}

impl ModuleConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> StateResult<()> {
        if self.owner == ZERO_ADDRESS {
            return Err(invalid("owner must be set"));
        }
        validate_pools(&self.pools)?;
        validate_triggers(&self.triggers)?;
        if self.pools.len() > usize::from(u16::MAX) {
            return Err(invalid("too many pools"));
        }
        Ok(())
    }

    /// Configuration after applying `update`.
    pub fn with_update(&self, update: &ConfigUpdate) -> ModuleConfig {
        let mut next = self.clone();
        next.pools.extend(update.pools.iter().cloned());
        next.triggers.extend(update.triggers.iter().cloned());
        if let Some(delays) = &update.delays {
            next.delays = delays.clone();
        }
        next
    }
}

/// Additions and delay changes applied by a finalized update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    /// Pools to append.
    pub pools: Vec<PoolConfig>,

    /// Triggers to register.
    pub triggers: Vec<TriggerConfig>,

    /// Replacement delays, if any.
    pub delays: Option<Delays>,
}

impl ConfigUpdate {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty() && self.triggers.is_empty() && self.delays.is_none()
    }
}

/// A configuration update waiting for its finalization window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedConfigUpdate {
    /// The update.
    pub update: ConfigUpdate,

    /// First timestamp at which it may be finalized.
    pub opens_at: u64,

    /// Last timestamp at which it may be finalized.
    pub closes_at: u64,
}

impl QueuedConfigUpdate {
    /// Whether `now` falls inside the finalization window.
    #[inline]
    pub fn is_open(&self, now: u64) -> bool {
        now >= self.opens_at && now <= self.closes_at
    }
}

/// Live configuration plus at most one queued update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configurator {
    config: ModuleConfig,
    queued: Option<QueuedConfigUpdate>,
}

impl Configurator {
    /// Wrap a validated configuration.
    pub fn new(config: ModuleConfig) -> StateResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            queued: None,
        })
    }

    /// Live configuration.
    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Queued update, if any.
    pub fn queued(&self) -> Option<&QueuedConfigUpdate> {
        self.queued.as_ref()
    }

    /// Queue an update, replacing any update already queued. Owner only.
    pub fn queue_update(
        &mut self,
        caller: &Address,
        update: ConfigUpdate,
        now: u64,
    ) -> StateResult<&QueuedConfigUpdate> {
        if caller != &self.config.owner {
            return Err(StateError::Unauthorized { caller: *caller });
        }
        if update.is_empty() {
            return Err(invalid("update changes nothing"));
        }
        self.config.with_update(&update).validate()?;

        let delays = &self.config.delays;
        let opens_at = now.saturating_add(delays.config_update_delay);
        let closes_at = opens_at.saturating_add(delays.config_update_grace_period);
        let queued = self.queued.insert(QueuedConfigUpdate {
            update,
            opens_at,
            closes_at,
        });
        Ok(&*queued)
    }

    /// The queued update, if its window is open at `now`.
    pub fn ready(&self, now: u64) -> StateResult<&ConfigUpdate> {
        let queued = self.queued.as_ref().ok_or(StateError::NoQueuedConfigUpdate)?;
        if !queued.is_open(now) {
            return Err(StateError::ConfigUpdateNotReady {
                opens_at: queued.opens_at,
                closes_at: queued.closes_at,
                now,
            });
        }
        Ok(&queued.update)
    }

    /// Apply the queued update if its window is open, returning it.
    pub fn finalize(&mut self, now: u64) -> StateResult<ConfigUpdate> {
        self.ready(now)?;
        let update = match self.queued.take() {
            Some(queued) => queued.update,
            None => return Err(StateError::NoQueuedConfigUpdate),
        };
        self.config = self.config.with_update(&update);
        Ok(update)
    }

    /// Drop the queued update, if any.
    pub fn discard(&mut self) -> Option<QueuedConfigUpdate> {
        self.queued.take()
    }
}

fn invalid(reason: &str) -> StateError {
    StateError::InvalidConfiguration {
        reason: reason.to_string(),
    }
}

fn validate_pools(pools: &[PoolConfig]) -> StateResult<()> {
    for (index, pool) in pools.iter().enumerate() {
        if pool.max_slash_percentage > WAD {
            return Err(StateError::InvalidConfiguration {
                reason: format!("pool {index} max slash percentage above 100%"),
            });
        }
    }
    Ok(())
}

fn validate_triggers(triggers: &[TriggerConfig]) -> StateResult<()> {
    let mut seen = HashSet::new();
    for trigger in triggers {
        if !seen.insert(trigger.trigger_id) {
            return Err(invalid("duplicate trigger id"));
        }
        if trigger.payout_handler == ZERO_ADDRESS {
            return Err(invalid("trigger without payout handler"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = [1u8; 20];

    fn config() -> ModuleConfig {
        ModuleConfig {
            owner: OWNER,
            pauser: [2u8; 20],
            delays: Delays {
                withdrawal_delay: 100,
                unstake_delay: 200,
                config_update_delay: 50,
                config_update_grace_period: 10,
            },
            pools: vec![PoolConfig {
                asset: [7u8; 20],
                max_slash_percentage: WAD / 2,
            }],
            triggers: vec![TriggerConfig {
                trigger_id: [9u8; 20],
                payout_handler: [3u8; 20],
            }],
        }
    }

    fn add_pool() -> ConfigUpdate {
        ConfigUpdate {
            pools: vec![PoolConfig {
                asset: [8u8; 20],
                max_slash_percentage: WAD,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_percentage() {
        let mut config = config();
        config.pools[0].max_slash_percentage = WAD + U256::one();
        assert!(matches!(
            config.validate(),
            Err(StateError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_trigger() {
        let mut config = config();
        let dup = config.triggers[0].clone();
        config.triggers.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_delays() {
        let delays = Delays::default();
        assert_eq!(delays.withdrawal_delay, DEFAULT_REDEMPTION_DELAY);
        assert_eq!(delays.config_update_grace_period, DEFAULT_CONFIG_UPDATE_GRACE_PERIOD);
    }

    #[test]
    fn test_queue_and_finalize_window() {
        let mut configurator = Configurator::new(config()).unwrap();
        let queued = configurator.queue_update(&OWNER, add_pool(), 1_000).unwrap();
        assert_eq!((queued.opens_at, queued.closes_at), (1_050, 1_060));

        let err = configurator.finalize(1_049).unwrap_err();
        assert!(matches!(err, StateError::ConfigUpdateNotReady { .. }));
        assert!(configurator.finalize(1_061).is_err());
        assert!(configurator.ready(1_061).is_err());
        assert_eq!(configurator.ready(1_050).unwrap(), &add_pool());
        assert!(configurator.queued().is_some());

        let update = configurator.finalize(1_060).unwrap();
        assert_eq!(update.pools.len(), 1);
        assert_eq!(configurator.config().pools.len(), 2);
        assert!(configurator.queued().is_none());
        assert_eq!(configurator.finalize(1_060), Err(StateError::NoQueuedConfigUpdate));
    }

    #[test]
    fn test_queue_owner_only() {
        let mut configurator = Configurator::new(config()).unwrap();
        let err = configurator.queue_update(&[5u8; 20], add_pool(), 0).unwrap_err();
        assert_eq!(err, StateError::Unauthorized { caller: [5u8; 20] });
    }

    #[test]
    fn test_queue_rejects_invalid_result() {
        let mut configurator = Configurator::new(config()).unwrap();
        let update = ConfigUpdate {
            triggers: config().triggers,
            ..Default::default()
        };
        assert!(configurator.queue_update(&OWNER, update, 0).is_err());
        assert!(configurator.queue_update(&OWNER, ConfigUpdate::default(), 0).is_err());
    }

    #[test]
    fn test_discard() {
        let mut configurator = Configurator::new(config()).unwrap();
        configurator.queue_update(&OWNER, add_pool(), 0).unwrap();
        assert!(configurator.discard().is_some());
        assert!(configurator.discard().is_none());
    }

    #[test]
    fn test_delay_update_applies() {
        let mut configurator = Configurator::new(config()).unwrap();
        let update = ConfigUpdate {
            delays: Some(Delays {
                withdrawal_delay: 1,
                ..config().delays
            }),
            ..Default::default()
        };
        configurator.queue_update(&OWNER, update, 0).unwrap();
        configurator.finalize(55).unwrap();
        assert_eq!(configurator.config().delays.withdrawal_delay, 1);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ModuleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
