//! Members domain module (event-sourced).
//!
//! Registered shoppers and their postal addresses. Name uniqueness is a
//! cross-aggregate rule and is enforced by the member service, not here.

pub mod address;
pub mod member;

pub use address::Address;
pub use member::{
    ChangeName, Member, MemberCommand, MemberEvent, MemberId, MemberRegistered, MemberRenamed,
    RegisterMember,
};
