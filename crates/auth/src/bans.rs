//! Per-user bans: negative overrides keyed by (user, permission).
//!
//! Each (user, permission) pair moves through `Unbanned -> Banned -> Unbanned`
//! with no expiry. A ban stands independently of any role grant; combining the
//! two into a final decision is left to callers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gatekeep_core::{BanId, Clock, DomainResult, Entity, PermissionId};

use crate::permissions::Permission;
use crate::store::{EntityStore, StoreResultExt};
use crate::validation::{BanReason, UserRef};

/// Look-back window used by recent-ban queries when none is given.
pub const DEFAULT_RECENT_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBan {
    pub id: BanId,
    pub user_id: String,
    pub permission_id: PermissionId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UserBan {
    type Id = BanId;

    fn id(&self) -> BanId {
        self.id
    }
}

/// Validated input for a ban insert.
#[derive(Debug, Clone)]
pub struct NewBan {
    pub user: UserRef,
    pub permission_id: PermissionId,
    pub reason: BanReason,
    pub at: DateTime<Utc>,
}

/// A ban with its permission resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBanDetail {
    #[serde(flatten)]
    pub ban: UserBan,
    pub permission: Permission,
}

#[derive(Clone)]
pub struct BanService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S> BanService<S>
where
    S: EntityStore,
{
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Argument errors win over a missing permission, which wins over an
    /// existing ban.
    pub async fn ban_user(
        &self,
        user_id: &str,
        permission_id: PermissionId,
        reason: &str,
    ) -> DomainResult<UserBan> {
        let user = UserRef::parse(user_id)?;
        let permission_id = permission_id.ensure_positive()?;
        let reason = BanReason::parse(reason)?;

        self.store.permission_by_id(permission_id).await?;

        let ban = self
            .store
            .insert_ban(NewBan {
                user,
                permission_id,
                reason,
                at: self.clock.now(),
            })
            .await?;
        info!(
            ban_id = %ban.id,
            user_id = %ban.user_id,
            permission_id = %ban.permission_id,
            "user banned"
        );
        Ok(ban)
    }

    pub async fn unban_user(&self, user_id: &str, permission_id: PermissionId) -> DomainResult<()> {
        let user = UserRef::parse(user_id)?;
        let permission_id = permission_id.ensure_positive()?;
        self.store.delete_ban(&user, permission_id).await?;
        info!(user_id = %user, permission_id = %permission_id, "user unbanned");
        Ok(())
    }

    /// `Ok(false)` when no ban exists. Store failures are returned, never
    /// reported as "not banned".
    pub async fn is_user_banned(
        &self,
        user_id: &str,
        permission_id: PermissionId,
    ) -> DomainResult<bool> {
        let user = UserRef::parse(user_id)?;
        let permission_id = permission_id.ensure_positive()?;
        let found = self.store.ban_for(&user, permission_id).await.optional()?;
        debug!(user_id = %user, permission_id = %permission_id, banned = found.is_some(), "ban check");
        Ok(found.is_some())
    }

    pub async fn get_user_ban(&self, id: BanId) -> DomainResult<UserBanDetail> {
        let id = id.ensure_positive()?;
        let ban = self.store.ban_by_id(id).await?;
        let permission = self.store.permission_by_id(ban.permission_id).await?;
        Ok(UserBanDetail { ban, permission })
    }

    pub async fn get_user_bans(&self, user_id: &str) -> DomainResult<Vec<UserBan>> {
        let user = UserRef::parse(user_id)?;
        Ok(self.store.bans_for_user(&user).await?)
    }

    pub async fn get_all_user_bans(&self) -> DomainResult<Vec<UserBan>> {
        Ok(self.store.list_bans().await?)
    }

    /// Bans never expire, so every stored ban of the user is active.
    pub async fn get_active_user_bans(&self, user_id: &str) -> DomainResult<Vec<UserBanDetail>> {
        let user = UserRef::parse(user_id)?;
        let bans = self.store.bans_for_user(&user).await?;

        let mut out = Vec::with_capacity(bans.len());
        for ban in bans {
            // Permission deleted between the two reads: its bans went with it.
            if let Some(permission) = self.store.permission_by_id(ban.permission_id).await.optional()? {
                out.push(UserBanDetail { ban, permission });
            }
        }
        Ok(out)
    }

    /// Changes only the reason and the updated timestamp.
    pub async fn update_ban_reason(&self, id: BanId, reason: &str) -> DomainResult<UserBan> {
        let id = id.ensure_positive()?;
        let reason = BanReason::parse(reason)?;
        let ban = self
            .store
            .update_ban_reason(id, &reason, self.clock.now())
            .await?;
        info!(ban_id = %ban.id, "ban reason updated");
        Ok(ban)
    }

    /// Bans created within the trailing `days` window, newest first.
    ///
    /// `days == 0` falls back to [`DEFAULT_RECENT_DAYS`]; a `limit` of zero is
    /// treated as no limit.
    pub async fn get_recent_bans(&self, days: u32, limit: Option<usize>) -> DomainResult<Vec<UserBan>> {
        let days = if days == 0 { DEFAULT_RECENT_DAYS } else { days };
        let limit = limit.filter(|n| *n > 0);
        // A window reaching past the representable range has no lower bound.
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(Duration::days(i64::from(days)));
        Ok(self.store.bans_created_since(cutoff, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use gatekeep_core::DomainError;

    use super::*;
    use crate::permissions::PermissionService;
    use crate::store::failing::FailingStore;
    use crate::store::InMemoryEntityStore;

    struct StepClock(Mutex<DateTime<Utc>>);

    impl StepClock {
        fn starting_at(t: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct Fixture {
        bans: BanService<Arc<InMemoryEntityStore>>,
        perms: PermissionService<Arc<InMemoryEntityStore>>,
        clock: Arc<StepClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryEntityStore::new());
        let clock = StepClock::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        Fixture {
            bans: BanService::new(store.clone(), clock.clone()),
            perms: PermissionService::new(store),
            clock,
        }
    }

    #[tokio::test]
    async fn ban_check_unban_cycle() {
        let f = fixture();
        let p = f.perms.create_permission("create_game_room").await.unwrap();

        assert!(!f.bans.is_user_banned("alice", p.id).await.unwrap());
        f.bans.ban_user("alice", p.id, "spam").await.unwrap();
        assert!(f.bans.is_user_banned("alice", p.id).await.unwrap());
        assert!(!f.bans.is_user_banned("bob", p.id).await.unwrap());

        f.bans.unban_user("alice", p.id).await.unwrap();
        assert!(!f.bans.is_user_banned("alice", p.id).await.unwrap());

        // The cycle can repeat.
        f.bans.ban_user("alice", p.id, "spam again").await.unwrap();
        assert!(f.bans.is_user_banned("alice", p.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_ban_conflicts_and_keeps_first_reason() {
        let f = fixture();
        let p = f.perms.create_permission("create_game_room").await.unwrap();

        f.bans.ban_user("alice", p.id, "abuse").await.unwrap();
        let err = f.bans.ban_user("alice", p.id, "again").await.unwrap_err();
        assert!(err.is_conflict());

        let bans = f.bans.get_user_bans("alice").await.unwrap();
        assert_eq!(bans.len(), 1);
        assert_eq!(bans[0].reason, "abuse");
    }

    #[tokio::test]
    async fn ban_error_precedence() {
        let f = fixture();
        let missing = PermissionId::new(7);

        assert!(matches!(
            f.bans.ban_user("", missing, "spam").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            f.bans.ban_user("alice", missing, " ").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            f.bans.ban_user("alice", PermissionId::new(0), "spam").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(f.bans.ban_user("alice", missing, "spam").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn unban_without_ban_is_not_found() {
        let f = fixture();
        let p = f.perms.create_permission("ban_user").await.unwrap();
        assert!(f.bans.unban_user("alice", p.id).await.unwrap_err().is_not_found());
        assert!(matches!(
            f.bans.unban_user("", p.id).await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn update_reason_touches_only_reason_and_updated_at() {
        let f = fixture();
        let p = f.perms.create_permission("ban_user").await.unwrap();
        let ban = f.bans.ban_user("alice", p.id, "spam").await.unwrap();

        f.clock.advance(Duration::minutes(5));
        let updated = f.bans.update_ban_reason(ban.id, "repeated spam").await.unwrap();

        assert_eq!(updated.id, ban.id);
        assert_eq!(updated.user_id, ban.user_id);
        assert_eq!(updated.permission_id, ban.permission_id);
        assert_eq!(updated.created_at, ban.created_at);
        assert_eq!(updated.reason, "repeated spam");
        assert_eq!(updated.updated_at, ban.created_at + Duration::minutes(5));

        assert!(f.bans.update_ban_reason(BanId::new(99), "x").await.unwrap_err().is_not_found());
        assert!(matches!(
            f.bans.update_ban_reason(ban.id, "").await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn detail_views_resolve_permission() {
        let f = fixture();
        let p = f.perms.create_permission("view_roles").await.unwrap();
        let ban = f.bans.ban_user("alice", p.id, "spam").await.unwrap();

        let detail = f.bans.get_user_ban(ban.id).await.unwrap();
        assert_eq!(detail.ban, ban);
        assert_eq!(detail.permission, p);

        let active = f.bans.get_active_user_bans("alice").await.unwrap();
        assert_eq!(active, vec![detail]);
        assert!(f.bans.get_active_user_bans("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_permission_removes_its_bans() {
        let f = fixture();
        let p = f.perms.create_permission("view_roles").await.unwrap();
        f.bans.ban_user("alice", p.id, "spam").await.unwrap();

        f.perms.delete_permission(p.id).await.unwrap();
        assert!(f.bans.get_all_user_bans().await.unwrap().is_empty());
        assert!(!f.bans.is_user_banned("alice", p.id).await.unwrap());
    }

    #[tokio::test]
    async fn recent_bans_window_order_and_limit() {
        let f = fixture();
        let p = f.perms.create_permission("create_game_room").await.unwrap();

        f.bans.ban_user("old", p.id, "r").await.unwrap();
        f.clock.advance(Duration::days(40));
        let a = f.bans.ban_user("a", p.id, "r").await.unwrap();
        f.clock.advance(Duration::days(1));
        let b = f.bans.ban_user("b", p.id, "r").await.unwrap();
        f.clock.advance(Duration::hours(1));

        let recent = f.bans.get_recent_bans(0, None).await.unwrap();
        assert_eq!(recent, vec![b.clone(), a.clone()]);

        let capped = f.bans.get_recent_bans(30, Some(1)).await.unwrap();
        assert_eq!(capped, vec![b.clone()]);

        let uncapped = f.bans.get_recent_bans(30, Some(0)).await.unwrap();
        assert_eq!(uncapped.len(), 2);

        assert_eq!(f.bans.get_recent_bans(60, None).await.unwrap().len(), 3);
        assert!(f.bans.get_recent_bans(1, None).await.unwrap() == vec![b]);
    }

    #[tokio::test]
    async fn recent_bans_window_past_calendar_range_returns_everything() {
        let f = fixture();
        let p = f.perms.create_permission("create_game_room").await.unwrap();

        let old = f.bans.ban_user("old", p.id, "r").await.unwrap();
        f.clock.advance(Duration::days(400));
        let new = f.bans.ban_user("new", p.id, "r").await.unwrap();

        let all = f.bans.get_recent_bans(100_000_000, None).await.unwrap();
        assert_eq!(all, vec![new.clone(), old]);

        let capped = f.bans.get_recent_bans(u32::MAX, Some(1)).await.unwrap();
        assert_eq!(capped, vec![new]);
    }

    #[tokio::test]
    async fn store_failure_is_not_reported_as_absence() {
        let store = Arc::new(FailingStore::new());
        let clock = StepClock::starting_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let bans = BanService::new(store.clone(), clock);
        let perms = PermissionService::new(store.clone());

        let p = perms.create_permission("create_game_room").await.unwrap();
        bans.ban_user("alice", p.id, "abuse").await.unwrap();

        store.fail("permission_by_id");
        assert!(matches!(
            bans.get_active_user_bans("alice").await,
            Err(DomainError::Unavailable(_))
        ));

        store.fail("ban_for");
        assert!(matches!(
            bans.is_user_banned("alice", p.id).await,
            Err(DomainError::Unavailable(_))
        ));
        assert!(matches!(
            bans.is_user_banned("bob", p.id).await,
            Err(DomainError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn listings_are_in_id_order() {
        let f = fixture();
        let p1 = f.perms.create_permission("a").await.unwrap();
        let p2 = f.perms.create_permission("b").await.unwrap();

        let first = f.bans.ban_user("alice", p2.id, "r").await.unwrap();
        let second = f.bans.ban_user("bob", p1.id, "r").await.unwrap();
        let third = f.bans.ban_user("alice", p1.id, "r").await.unwrap();

        assert_eq!(
            f.bans.get_all_user_bans().await.unwrap(),
            vec![first.clone(), second, third.clone()]
        );
        assert_eq!(f.bans.get_user_bans("alice").await.unwrap(), vec![first, third]);
    }
}
