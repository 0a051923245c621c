use serde::{Deserialize, Serialize};

use crate::messages::UpdateMessage;

/// Our updates, staged through the pipeline: `proposed` (sent, unsigned),
/// `signed` (covered by a commit_sig we sent, awaiting the peer's
/// revocation), `acked` (the peer revoked; eligible for the next commitment
/// they sign for us). Every update sits in exactly one list at a time and
/// lists preserve insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalChanges {
    pub proposed: Vec<UpdateMessage>,
    pub signed: Vec<UpdateMessage>,
    pub acked: Vec<UpdateMessage>,
}

impl LocalChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total updates in flight across all stages.
    pub fn len(&self) -> usize {
        self.proposed.len() + self.signed.len() + self.acked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The peer's updates: `proposed` (received, unsigned) and `acked` (we
/// revoked our previous commitment against them; eligible for the next
/// commitment we sign for the peer). The peer's `signed` stage lives on
/// their side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChanges {
    pub proposed: Vec<UpdateMessage>,
    pub acked: Vec<UpdateMessage>,
}

impl RemoteChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.proposed.len() + self.acked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
