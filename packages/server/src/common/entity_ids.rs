//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the application.

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Fiction entities (citizen proposals).
pub struct Fiction;

/// Marker type for Member entities (organization members).
pub struct Member;

/// Marker type for Space entities (participatory spaces).
pub struct Space;

/// Marker type for Organization entities (tenants).
pub struct Organization;

/// Marker type for Amendment entities (externally owned amendment records).
pub struct Amendment;

/// Marker type for Vote ledger rows.
pub struct Vote;

/// Marker type for Attachment entities (file metadata).
pub struct Attachment;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Fiction entities.
pub type FictionId = Id<Fiction>;

/// Typed ID for Member entities.
pub type MemberId = Id<Member>;

/// Typed ID for Space entities.
pub type SpaceId = Id<Space>;

/// Typed ID for Organization entities.
pub type OrganizationId = Id<Organization>;

/// Typed ID for Amendment entities.
pub type AmendmentId = Id<Amendment>;

/// Typed ID for Vote ledger rows.
pub type VoteId = Id<Vote>;

/// Typed ID for Attachment entities.
pub type AttachmentId = Id<Attachment>;
