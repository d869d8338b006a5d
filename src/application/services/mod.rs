//! Application services

pub mod membership;
pub mod placement;

pub use membership::MembershipService;
pub use placement::PlacementService;
