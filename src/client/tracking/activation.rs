use rand::Rng;
use serenity::model::id::GuildId;
use std::collections::HashMap;
use std::fmt::Write;

use crate::client::tracking::errors::TrackingError;

/** Number of random bytes in a key. Keys are hex, so twice as many characters. */
const KEY_BYTES: usize = 8;

#[derive(Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    AlreadyActive,
    NoPendingKey,
    WrongKey,
}

/** Generates a fresh hex activation key. */
pub fn generate_key() -> String {
    let bytes: [u8; KEY_BYTES] = rand::thread_rng().gen();
    bytes.iter().fold(String::with_capacity(KEY_BYTES * 2), |mut key, byte| {
        let _ = write!(key, "{:02x}", byte);
        key
    })
}

/** Per-guild activation flags and the single pending key each guild may have. */
#[derive(Debug, Default)]
pub struct ActivationGate {
    active: HashMap<GuildId, bool>,
    pending: HashMap<GuildId, String>,
}

impl ActivationGate {
    pub fn new() -> ActivationGate {
        ActivationGate::default()
    }

    pub fn is_active(&self, guild_id: GuildId) -> bool {
        self.active.get(&guild_id).copied().unwrap_or(false)
    }

    pub fn set_active(&mut self, guild_id: GuildId, active: bool) {
        self.active.insert(guild_id, active);
    }

    pub fn ensure_active(&self, guild_id: GuildId) -> Result<(), TrackingError> {
        if self.is_active(guild_id) {
            Ok(())
        } else {
            Err(TrackingError::NotActivated)
        }
    }

    /** Issues a key for the guild, replacing any key still pending. */
    pub fn issue_key(&mut self, guild_id: GuildId) -> String {
        let key = generate_key();
        self.pending.insert(guild_id, key.clone());
        key
    }

    #[cfg(test)]
    pub fn pending_key(&self, guild_id: GuildId) -> Option<&str> {
        self.pending.get(&guild_id).map(String::as_str)
    }

    /// Checks a supplied key against the pending one.
    ///
    /// Any attempt that gets as far as comparing consumes the pending key. A wrong key
    /// explicitly leaves the guild inactive.
    pub fn activate(&mut self, guild_id: GuildId, supplied: &str) -> ActivationOutcome {
        if self.is_active(guild_id) {
            return ActivationOutcome::AlreadyActive;
        }
        let pending = match self.pending.remove(&guild_id) {
            Some(pending) => pending,
            None => return ActivationOutcome::NoPendingKey,
        };
        if supplied == pending {
            self.active.insert(guild_id, true);
            ActivationOutcome::Activated
        } else {
            self.active.insert(guild_id, false);
            ActivationOutcome::WrongKey
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(77);

    #[test]
    fn keys_are_hex_and_fresh() {
        let first = generate_key();
        let second = generate_key();

        assert_eq!(first.len(), KEY_BYTES * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(first, second);
    }

    #[test]
    fn activation_requires_a_requested_key() {
        let mut gate = ActivationGate::new();
        assert_eq!(gate.activate(GUILD, "anything"), ActivationOutcome::NoPendingKey);
        assert!(gate.ensure_active(GUILD).is_err());
    }

    #[test]
    fn correct_key_activates_and_is_consumed() {
        let mut gate = ActivationGate::new();
        let key = gate.issue_key(GUILD);

        assert_eq!(gate.activate(GUILD, &key), ActivationOutcome::Activated);
        assert!(gate.is_active(GUILD));
        assert_eq!(gate.pending_key(GUILD), None);
        assert!(gate.ensure_active(GUILD).is_ok());

        // The same key again does not activate anything.
        assert_ne!(gate.activate(GUILD, &key), ActivationOutcome::Activated);
        gate.set_active(GUILD, false);
        assert_eq!(gate.activate(GUILD, &key), ActivationOutcome::NoPendingKey);
    }

    #[test]
    fn wrong_key_forces_inactive_and_clears_key() {
        let mut gate = ActivationGate::new();
        let key = gate.issue_key(GUILD);

        assert_eq!(gate.activate(GUILD, "nope"), ActivationOutcome::WrongKey);
        assert!(!gate.is_active(GUILD));
        assert_eq!(gate.pending_key(GUILD), None);
        assert_eq!(gate.activate(GUILD, &key), ActivationOutcome::NoPendingKey);
    }

    #[test]
    fn new_request_replaces_pending_key() {
        let mut gate = ActivationGate::new();
        let first = gate.issue_key(GUILD);
        let second = gate.issue_key(GUILD);

        assert_eq!(gate.pending_key(GUILD), Some(second.as_str()));
        if first != second {
            assert_eq!(gate.activate(GUILD, &first), ActivationOutcome::WrongKey);
        }
    }

    #[test]
    fn already_active_guild_is_untouched() {
        let mut gate = ActivationGate::new();
        gate.set_active(GUILD, true);
        gate.issue_key(GUILD);

        assert_eq!(gate.activate(GUILD, "wrong"), ActivationOutcome::AlreadyActive);
        assert!(gate.is_active(GUILD));
        assert!(gate.pending_key(GUILD).is_some());
    }
}
