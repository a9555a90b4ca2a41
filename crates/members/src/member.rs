use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shop_core::{Aggregate, AggregateRoot, DomainError, DomainResult, TrackedAggregate};
use shop_events::Event;

use crate::address::Address;

shop_core::aggregate_id!(
    /// Member identifier.
    MemberId
);

/// Aggregate root: Member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    id: MemberId,
    name: String,
    address: Option<Address>,
    version: u64,
    created: bool,
    pending: Vec<MemberEvent>,
}

impl Member {
    /// Register a new member. Pending until committed.
    pub fn register(
        member_id: MemberId,
        name: impl Into<String>,
        address: Option<Address>,
    ) -> DomainResult<Self> {
        let mut member = Self::empty(member_id);
        member.record(MemberCommand::RegisterMember(RegisterMember {
            member_id,
            name: name.into(),
            address,
            occurred_at: Utc::now(),
        }))?;
        Ok(member)
    }

    pub fn id_typed(&self) -> MemberId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn rename(&mut self, name: impl Into<String>) -> DomainResult<()> {
        self.record(MemberCommand::ChangeName(ChangeName {
            member_id: self.id,
            name: name.into(),
            occurred_at: Utc::now(),
        }))
    }

    fn record(&mut self, command: MemberCommand) -> DomainResult<()> {
        let events = self.execute(&command)?;
        self.pending.extend(events);
        Ok(())
    }
}

impl AggregateRoot for Member {
    type Id = MemberId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterMember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMember {
    pub member_id: MemberId,
    pub name: String,
    pub address: Option<Address>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeName.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeName {
    pub member_id: MemberId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberCommand {
    RegisterMember(RegisterMember),
    ChangeName(ChangeName),
}

/// Event: MemberRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRegistered {
    pub member_id: MemberId,
    pub name: String,
    pub address: Option<Address>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MemberRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRenamed {
    pub member_id: MemberId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberEvent {
    MemberRegistered(MemberRegistered),
    MemberRenamed(MemberRenamed),
}

impl MemberEvent {
    pub fn member_id(&self) -> MemberId {
        match self {
            MemberEvent::MemberRegistered(e) => e.member_id,
            MemberEvent::MemberRenamed(e) => e.member_id,
        }
    }
}

impl Event for MemberEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MemberEvent::MemberRegistered(_) => "members.member.registered",
            MemberEvent::MemberRenamed(_) => "members.member.renamed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MemberEvent::MemberRegistered(e) => e.occurred_at,
            MemberEvent::MemberRenamed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Member {
    const AGGREGATE_TYPE: &'static str = "members.member";

    type Command = MemberCommand;
    type Event = MemberEvent;
    type Error = DomainError;

    fn empty(id: MemberId) -> Self {
        Self {
            id,
            name: String::new(),
            address: None,
            version: 0,
            created: false,
            pending: Vec::new(),
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MemberEvent::MemberRegistered(e) => {
                self.id = e.member_id;
                self.name = e.name.clone();
                self.address = e.address.clone();
                self.created = true;
            }
            MemberEvent::MemberRenamed(e) => {
                self.name = e.name.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MemberCommand::RegisterMember(cmd) => self.handle_register(cmd),
            MemberCommand::ChangeName(cmd) => self.handle_change_name(cmd),
        }
    }
}

impl TrackedAggregate for Member {
    fn pending_events(&self) -> &[MemberEvent] {
        &self.pending
    }

    fn take_pending_events(&mut self) -> Vec<MemberEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl Member {
    fn handle_register(&self, cmd: &RegisterMember) -> Result<Vec<MemberEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("member already registered"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(vec![MemberEvent::MemberRegistered(MemberRegistered {
            member_id: cmd.member_id,
            name: cmd.name.clone(),
            address: cmd.address.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_name(&self, cmd: &ChangeName) -> Result<Vec<MemberEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != cmd.member_id {
            return Err(DomainError::invariant("member_id mismatch"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.name == self.name {
            return Ok(vec![]);
        }
        Ok(vec![MemberEvent::MemberRenamed(MemberRenamed {
            member_id: cmd.member_id,
            name: cmd.name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
