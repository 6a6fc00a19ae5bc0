//! Sharing layer: invitations, bidirectional library visibility, and the
//! owned/shared-with-me merge.
//!
//! Accepting an invitation links two caregivers: each party's library items
//! get the other's id added to their visibility sets. A pair of users may be
//! linked through several shared profiles at once, so revocation only clears
//! cross-visibility after a full scan confirms no other shared profile still
//! links them.
//!
//! Every multi-step grant or revoke sequence records the sub-steps that
//! completed and, on mid-sequence failure, compensates by reversing them in
//! reverse order before propagating the error.

pub mod invitation;
pub mod merge;

pub use invitation::{Invitation, InvitationStatus};
pub use merge::{merge_sources, spawn_merge, MergedCollection};

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::exec::{self, BULK_SCAN_TIMEOUT, DEFAULT_MAX_ATTEMPTS, SINGLE_DOC_TIMEOUT};
use crate::models::ChildProfile;
use crate::record::Shareable;
use crate::remote::RemoteStore;

/// Bulk visibility operations over one shareable library.
#[async_trait]
pub trait LibraryVisibility: Send + Sync {
    /// Collection name, for logging and errors.
    fn label(&self) -> &'static str;

    /// Adds `grantee_id` to the visibility set of every item `owner_id`
    /// owns. Returns the number of items touched.
    async fn grant_all(&self, owner_id: &str, grantee_id: &str) -> Result<usize>;

    /// Inverse of [`LibraryVisibility::grant_all`].
    async fn revoke_all(&self, owner_id: &str, grantee_id: &str) -> Result<usize>;
}

/// [`LibraryVisibility`] over a remote store, using its field-level set
/// operations so concurrent edits to other fields are not clobbered.
pub struct RemoteLibrary<T: Shareable> {
    store: Arc<dyn RemoteStore<T>>,
}

impl<T: Shareable> RemoteLibrary<T> {
    pub fn new(store: Arc<dyn RemoteStore<T>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<T: Shareable> LibraryVisibility for RemoteLibrary<T> {
    fn label(&self) -> &'static str {
        T::kind().collection()
    }

    async fn grant_all(&self, owner_id: &str, grantee_id: &str) -> Result<usize> {
        exec::with_timeout(BULK_SCAN_TIMEOUT, async {
            let items = self.store.query_by_owner(owner_id).await?;
            let mut touched = 0;
            for item in &items {
                if item.shared_with().iter().any(|u| u == grantee_id) {
                    continue;
                }
                self.store.add_visibility(item.id(), grantee_id).await?;
                touched += 1;
            }
            Ok(touched)
        })
        .await
    }

    async fn revoke_all(&self, owner_id: &str, grantee_id: &str) -> Result<usize> {
        exec::with_timeout(BULK_SCAN_TIMEOUT, async {
            let items = self.store.query_by_owner(owner_id).await?;
            let mut touched = 0;
            for item in &items {
                if !item.shared_with().iter().any(|u| u == grantee_id) {
                    continue;
                }
                self.store.remove_visibility(item.id(), grantee_id).await?;
                touched += 1;
            }
            Ok(touched)
        })
        .await
    }
}

/// A completed sub-step, kept so a mid-sequence failure can be compensated.
enum Applied {
    InvitationWritten { prior: Invitation },
    ProfileShared { profile_id: Uuid, user_id: String },
    ProfileUnshared { profile_id: Uuid, user_id: String },
    Granted { library: usize, owner: String, grantee: String },
    Revoked { library: usize, owner: String, grantee: String },
}

/// Implements the invitation workflow and cross-visibility grants.
pub struct SharingService {
    profiles: Arc<dyn RemoteStore<ChildProfile>>,
    invitations: Arc<dyn RemoteStore<Invitation>>,
    libraries: Vec<Arc<dyn LibraryVisibility>>,
}

impl SharingService {
    pub fn new(
        profiles: Arc<dyn RemoteStore<ChildProfile>>,
        invitations: Arc<dyn RemoteStore<Invitation>>,
    ) -> Self {
        Self {
            profiles,
            invitations,
            libraries: Vec::new(),
        }
    }

    /// Registers a shareable library whose visibility follows profile links.
    pub fn with_library(mut self, library: Arc<dyn LibraryVisibility>) -> Self {
        self.libraries.push(library);
        self
    }

    /// Creates a pending invitation for a profile. Owner only.
    pub async fn create_invitation(
        &self,
        profile_id: Uuid,
        caller_id: &str,
    ) -> Result<Invitation> {
        let profile = self.get_profile(profile_id).await?;
        if profile.owner_id != caller_id {
            return Err(CoreError::AuthorizationDenied(format!(
                "{} does not own profile {}",
                caller_id, profile_id
            )));
        }

        let invitation = Invitation::new(profile_id, caller_id);
        let to_write = invitation.clone();
        exec::with_retry(DEFAULT_MAX_ATTEMPTS, || {
            let invitations = Arc::clone(&self.invitations);
            let to_write = to_write.clone();
            async move {
                exec::with_timeout(SINGLE_DOC_TIMEOUT, invitations.add(&to_write)).await
            }
        })
        .await?;

        tracing::info!(%profile_id, code = %invitation.code, "created sharing invitation");
        Ok(invitation)
    }

    /// Redeems a pending invitation by code, granting bidirectional
    /// cross-visibility between the owner and the caller.
    pub async fn accept_invitation(&self, code: &str, caller_id: &str) -> Result<Invitation> {
        let invitation = self.find_pending(code).await?;
        let owner = invitation.owner_id.clone();
        if owner == caller_id {
            return Err(CoreError::AuthorizationDenied(
                "cannot accept your own invitation".into(),
            ));
        }
        // the profile must still exist before any grant is attempted
        let profile = self.get_profile(invitation.profile_id).await?;

        let mut applied: Vec<Applied> = Vec::new();

        let prior = invitation.clone();
        let mut accepted = invitation;
        accepted.accept(caller_id);
        if let Err(e) = self.write_invitation(&accepted).await {
            self.compensate(applied).await;
            return Err(e);
        }
        applied.push(Applied::InvitationWritten { prior });

        if let Err(e) = self.profiles.add_visibility(profile.id, caller_id).await {
            self.compensate(applied).await;
            return Err(e);
        }
        applied.push(Applied::ProfileShared {
            profile_id: profile.id,
            user_id: caller_id.to_string(),
        });

        // bidirectional: each party sees the other's libraries
        for (idx, library) in self.libraries.iter().enumerate() {
            if let Err(e) = library.grant_all(&owner, caller_id).await {
                self.compensate(applied).await;
                return Err(e);
            }
            applied.push(Applied::Granted {
                library: idx,
                owner: owner.clone(),
                grantee: caller_id.to_string(),
            });

            if let Err(e) = library.grant_all(caller_id, &owner).await {
                self.compensate(applied).await;
                return Err(e);
            }
            applied.push(Applied::Granted {
                library: idx,
                owner: caller_id.to_string(),
                grantee: owner.clone(),
            });
        }

        tracing::info!(profile_id = %profile.id, invitee = caller_id, "invitation accepted");
        Ok(accepted)
    }

    /// Declines a pending invitation by code.
    pub async fn decline_invitation(&self, code: &str) -> Result<Invitation> {
        let mut invitation = self.find_pending(code).await?;
        invitation.decline();
        self.write_invitation(&invitation).await?;
        Ok(invitation)
    }

    /// Removes a member's access to a profile. Owner only.
    pub async fn revoke_access(
        &self,
        profile_id: Uuid,
        caller_id: &str,
        member_id: &str,
    ) -> Result<()> {
        let profile = self.get_profile(profile_id).await?;
        if profile.owner_id != caller_id {
            return Err(CoreError::AuthorizationDenied(format!(
                "{} does not own profile {}",
                caller_id, profile_id
            )));
        }
        if member_id == profile.owner_id {
            return Err(CoreError::CannotRevokeOwner);
        }
        self.remove_member(&profile, member_id).await
    }

    /// Self-removal from a profile shared with the caller.
    pub async fn leave_shared_profile(&self, profile_id: Uuid, caller_id: &str) -> Result<()> {
        let profile = self.get_profile(profile_id).await?;
        if profile.owner_id == caller_id {
            return Err(CoreError::OwnerCannotLeave);
        }
        self.remove_member(&profile, caller_id).await
    }

    // ==================== internals ====================

    async fn remove_member(&self, profile: &ChildProfile, member_id: &str) -> Result<()> {
        if !profile.shared_with.iter().any(|u| u == member_id) {
            return Err(CoreError::NotFound(format!(
                "{} is not a member of profile {}",
                member_id, profile.id
            )));
        }

        let mut applied: Vec<Applied> = Vec::new();

        if let Err(e) = self
            .profiles
            .remove_visibility(profile.id, member_id)
            .await
        {
            self.compensate(applied).await;
            return Err(e);
        }
        applied.push(Applied::ProfileUnshared {
            profile_id: profile.id,
            user_id: member_id.to_string(),
        });

        // a pair may be linked through several shared profiles; only clear
        // cross-visibility once no other profile still links them
        let owner = profile.owner_id.clone();
        let linked = match self.still_linked(&owner, member_id, profile.id).await {
            Ok(linked) => linked,
            Err(e) => {
                self.compensate(applied).await;
                return Err(e);
            }
        };
        if linked {
            tracing::debug!(
                owner = %owner,
                member = member_id,
                "another shared profile still links the pair, keeping library visibility"
            );
            return Ok(());
        }

        for (idx, library) in self.libraries.iter().enumerate() {
            if let Err(e) = library.revoke_all(&owner, member_id).await {
                self.compensate(applied).await;
                return Err(e);
            }
            applied.push(Applied::Revoked {
                library: idx,
                owner: owner.clone(),
                grantee: member_id.to_string(),
            });

            if let Err(e) = library.revoke_all(member_id, &owner).await {
                self.compensate(applied).await;
                return Err(e);
            }
            applied.push(Applied::Revoked {
                library: idx,
                owner: member_id.to_string(),
                grantee: owner.clone(),
            });
        }

        tracing::info!(profile_id = %profile.id, member = member_id, "membership removed");
        Ok(())
    }

    /// Whether any shared profile other than `excluding` still links the two
    /// users, in either direction. Scans everything both users own.
    async fn still_linked(&self, a: &str, b: &str, excluding: Uuid) -> Result<bool> {
        exec::with_timeout(BULK_SCAN_TIMEOUT, async {
            let mut profiles = self.profiles.query_by_owner(a).await?;
            profiles.extend(self.profiles.query_by_owner(b).await?);

            Ok(profiles.iter().any(|p| {
                p.id != excluding
                    && ((p.owner_id == a && p.shared_with.iter().any(|u| u == b))
                        || (p.owner_id == b && p.shared_with.iter().any(|u| u == a)))
            }))
        })
        .await
    }

    /// Single-document invitation write with the standard retry/timeout
    /// wrap.
    async fn write_invitation(&self, invitation: &Invitation) -> Result<()> {
        exec::with_retry(DEFAULT_MAX_ATTEMPTS, || {
            let invitations = Arc::clone(&self.invitations);
            let invitation = invitation.clone();
            async move {
                exec::with_timeout(SINGLE_DOC_TIMEOUT, invitations.update(&invitation)).await
            }
        })
        .await
    }

    async fn get_profile(&self, profile_id: Uuid) -> Result<ChildProfile> {
        self.profiles
            .get(profile_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("profile {}", profile_id)))
    }

    async fn find_pending(&self, code: &str) -> Result<Invitation> {
        let code = code.trim().to_uppercase();
        let matches = self.invitations.query("code", &code).await?;
        matches
            .into_iter()
            .find(|i| i.is_pending() && i.matches_code(&code))
            .ok_or_else(|| CoreError::NotFound(format!("pending invitation with code {}", code)))
    }

    /// Reverses completed sub-steps in reverse order. Compensation failures
    /// are logged, not propagated - the original error wins.
    async fn compensate(&self, mut applied: Vec<Applied>) {
        while let Some(step) = applied.pop() {
            let result = match &step {
                Applied::InvitationWritten { prior } => self.invitations.update(prior).await,
                Applied::ProfileShared {
                    profile_id,
                    user_id,
                } => self.profiles.remove_visibility(*profile_id, user_id).await,
                Applied::ProfileUnshared {
                    profile_id,
                    user_id,
                } => self.profiles.add_visibility(*profile_id, user_id).await,
                Applied::Granted {
                    library,
                    owner,
                    grantee,
                } => self.libraries[*library]
                    .revoke_all(owner, grantee)
                    .await
                    .map(|_| ()),
                Applied::Revoked {
                    library,
                    owner,
                    grantee,
                } => self.libraries[*library]
                    .grant_all(owner, grantee)
                    .await
                    .map(|_| ()),
            };
            if let Err(e) = result {
                tracing::error!(error = %e, "compensation step failed");
            }
        }
    }
}
