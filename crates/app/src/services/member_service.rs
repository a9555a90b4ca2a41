use shop_core::DomainError;
use shop_events::EventBus;
use shop_infra::event_store::EventStore;
use shop_infra::projections::MemberReadModel;
use shop_members::{Address, Member, MemberId};

use super::{JsonEnvelope, ServiceError, Shop};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub address: Option<Address>,
}

impl NewMember {
    pub fn new(name: impl Into<String>, address: Option<Address>) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// Member registration and lookup. Member names are unique.
pub struct MemberService<'a, S, B> {
    shop: &'a Shop<S, B>,
}

impl<'a, S, B> MemberService<'a, S, B>
where
    S: EventStore,
    B: EventBus<JsonEnvelope>,
{
    pub(crate) fn new(shop: &'a Shop<S, B>) -> Self {
        Self { shop }
    }

    /// Register a member.
    ///
    /// Fails with [`DomainError::DuplicateMember`] when the name is taken. The
    /// name check and the commit run under one guard, so two concurrent joins
    /// with the same name cannot both succeed.
    pub fn join(&self, new_member: NewMember) -> Result<MemberId, ServiceError> {
        let _names = self.shop.member_names_guard()?;
        self.ensure_name_available(&new_member.name)?;

        let member_id = MemberId::generate();
        let mut member = Member::register(member_id, new_member.name, new_member.address)?;

        let mut uow = self.shop.unit_of_work();
        uow.stage(&mut member)?;
        self.shop.commit(uow)?;

        tracing::info!(%member_id, name = member.name(), "member joined");
        Ok(member_id)
    }

    /// Change a member's name, subject to the same uniqueness rule as `join`.
    pub fn update(&self, member_id: MemberId, name: impl Into<String>) -> Result<(), ServiceError> {
        let name = name.into();
        let _names = self.shop.member_names_guard()?;

        self.shop.retry_on_conflict("member.update", || {
            let mut member = self
                .shop
                .repository()
                .load::<Member>(member_id)?
                .ok_or_else(|| ServiceError::not_found("member", member_id))?;

            if member.name() != name {
                self.ensure_name_available(&name)?;
            }
            member.rename(name.clone())?;

            let mut uow = self.shop.unit_of_work();
            uow.stage(&mut member)?;
            self.shop.commit(uow)?;
            Ok(())
        })?;

        tracing::info!(%member_id, name = %name, "member renamed");
        Ok(())
    }

    pub fn find_members(&self) -> Vec<MemberReadModel> {
        self.shop.read_models().members.list()
    }

    pub fn find_one(&self, member_id: MemberId) -> Option<MemberReadModel> {
        self.shop.read_models().members.get(&member_id)
    }

    fn ensure_name_available(&self, name: &str) -> Result<(), ServiceError> {
        if self.shop.read_models().members.find_by_name(name).is_empty() {
            Ok(())
        } else {
            Err(DomainError::DuplicateMember.into())
        }
    }
}
