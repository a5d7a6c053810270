//! Client-local session state.
//!
//! A `SessionSnapshot` is what every guard and view reads: the current
//! identity plus whether that determination is still pending.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// Where the session lifecycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// The store exists but has not subscribed to the provider yet.
    Uninitialized,
    /// An identity change is in progress.
    Loading,
    /// An identity is signed in and its server session has been synced.
    Authenticated,
    /// Nobody is signed in.
    Anonymous,
}

impl SessionPhase {
    /// Returns true until the phase settles on authenticated or anonymous.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Loading)
    }
}

/// A point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    phase: SessionPhase,
    identity: Option<Identity>,
    /// Incremented on every transition into `Authenticated` and at the
    /// start of every sign-out.
    epoch: u64,
}

impl SessionSnapshot {
    /// The state before the provider observer is attached.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            identity: None,
            epoch: 0,
        }
    }

    /// Builds a snapshot directly, e.g. to evaluate guards against a fixed
    /// session state.
    #[must_use]
    pub fn new(phase: SessionPhase, identity: Option<Identity>, epoch: u64) -> Self {
        Self {
            phase,
            identity,
            epoch,
        }
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns the signed-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns the transition counter.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns true while no authorization decision may be made.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// Returns true once settled with an identity present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated && self.identity.is_some()
    }

    /// Returns true once settled with nobody signed in.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.phase == SessionPhase::Anonymous
    }

    /// Returns the phase the identity implies once nothing is in flight.
    #[must_use]
    pub(crate) fn settled_phase(&self) -> SessionPhase {
        if self.identity.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }

    pub(crate) fn with_phase(&self, phase: SessionPhase) -> Self {
        Self {
            phase,
            identity: self.identity.clone(),
            epoch: self.epoch,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::uninitialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Uid;

    fn ada() -> Identity {
        Identity::new(Uid::from("uid-ada"), Some("ada@example.com".to_string()))
    }

    #[test]
    fn uninitialized_counts_as_loading() {
        let snapshot = SessionSnapshot::uninitialized();
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
        assert!(!snapshot.is_anonymous());
    }

    #[test]
    fn loading_with_identity_is_not_authenticated() {
        let snapshot = SessionSnapshot::new(SessionPhase::Loading, Some(ada()), 1);
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
        assert_eq!(snapshot.settled_phase(), SessionPhase::Authenticated);
    }

    #[test]
    fn settled_states() {
        let signed_in = SessionSnapshot::new(SessionPhase::Authenticated, Some(ada()), 2);
        assert!(signed_in.is_authenticated());
        assert_eq!(signed_in.identity().map(Identity::uid), Some(&Uid::from("uid-ada")));

        let signed_out = SessionSnapshot::new(SessionPhase::Anonymous, None, 3);
        assert!(signed_out.is_anonymous());
        assert_eq!(signed_out.settled_phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn with_phase_keeps_identity_and_epoch() {
        let snapshot = SessionSnapshot::new(SessionPhase::Authenticated, Some(ada()), 4);
        let loading = snapshot.with_phase(SessionPhase::Loading);
        assert_eq!(loading.identity(), snapshot.identity());
        assert_eq!(loading.epoch(), 4);
        assert!(loading.is_loading());
    }

    #[test]
    fn phase_serialization_format() {
        let json = serde_json::to_string(&SessionPhase::Authenticated).expect("serialize");
        assert_eq!(json, "\"authenticated\"");
    }
}
