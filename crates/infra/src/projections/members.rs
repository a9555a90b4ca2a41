//! Member directory projection.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use shop_core::Aggregate;
use shop_events::EventEnvelope;
use shop_members::{Address, Member, MemberEvent, MemberId};

use super::{Projection, ProjectionError, StreamCursors, decode};
use crate::read_model::ReadModelStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReadModel {
    pub member_id: MemberId,
    pub name: String,
    pub address: Option<Address>,
}

/// Maintains the member directory. Also backs the duplicate-name check on join.
#[derive(Debug)]
pub struct MembersProjection<S> {
    store: S,
    cursors: StreamCursors,
}

impl<S> MembersProjection<S>
where
    S: ReadModelStore<MemberId, MemberReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, member_id: &MemberId) -> Option<MemberReadModel> {
        self.store.get(member_id)
    }

    pub fn list(&self) -> Vec<MemberReadModel> {
        self.store.list()
    }

    /// Members whose name is exactly `name`.
    pub fn find_by_name(&self, name: &str) -> Vec<MemberReadModel> {
        self.store.list().into_iter().filter(|m| m.name == name).collect()
    }

    fn apply_event(&self, event: MemberEvent) {
        match event {
            MemberEvent::MemberRegistered(e) => {
                self.store.upsert(
                    e.member_id,
                    MemberReadModel {
                        member_id: e.member_id,
                        name: e.name,
                        address: e.address,
                    },
                );
            }
            MemberEvent::MemberRenamed(e) => {
                if let Some(mut rm) = self.store.get(&e.member_id) {
                    rm.name = e.name;
                    self.store.upsert(e.member_id, rm);
                }
            }
        }
    }
}

impl<S> Projection for MembersProjection<S>
where
    S: ReadModelStore<MemberId, MemberReadModel>,
{
    fn aggregate_type(&self) -> &'static str {
        Member::AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != self.aggregate_type() {
            return Ok(());
        }

        self.cursors
            .advance(envelope.aggregate_id(), envelope.sequence_number(), || {
                let event: MemberEvent = decode(envelope)?;
                if event.member_id().0 != envelope.aggregate_id() {
                    return Err(ProjectionError::StreamMismatch(
                        "event member_id does not match envelope aggregate_id".to_string(),
                    ));
                }
                self.apply_event(event);
                Ok(())
            })
            .map(|_| ())
    }

    fn reset(&self) {
        self.cursors.clear();
        self.store.clear();
    }
}
