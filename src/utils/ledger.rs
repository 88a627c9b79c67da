// teamseat-service/src/utils/ledger.rs
//! Membership ledger: teams, their members and invite tokens.
//!
//! Every operation runs under one lock, so the seat check and the insert in
//! [`Ledger::admit_member`] cannot interleave with another admission in the
//! same process. Two processes pointed at the same storage directory do not
//! share that lock; the seat check is then check-then-insert with a small
//! race window, which is accepted for human-driven admission only.
//!
//! Records are written to disk before the in-memory index changes, so a failed
//! write leaves the previous state in place.
use crate::models::{
    InviteStatus, InviteToken, MemberStatus, ServiceError, Team, TeamMember, TeamStatus,
};
use crate::utils::tokens;
use derive_more::Display;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const TEAMS_DIR: &str = "teams";
const MEMBERS_DIR: &str = "team_members";
const TOKENS_DIR: &str = "invite_tokens";

// Why an admission was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Rejection {
    #[display(fmt = "Invalid or expired invite token")]
    InvalidToken,
    #[display(fmt = "This team subscription is no longer active")]
    TeamInactive,
    #[display(fmt = "This team is full (seats full). The team leader needs to contact support to add more seats.")]
    SeatsFull,
    #[display(fmt = "This email is already a member of this team")]
    DuplicateMember,
}

impl From<Rejection> for ServiceError {
    fn from(rejection: Rejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            Rejection::InvalidToken => ServiceError::NotFound(message),
            Rejection::TeamInactive => ServiceError::Inactive(message),
            Rejection::SeatsFull | Rejection::DuplicateMember => ServiceError::Conflict(message),
        }
    }
}

pub enum TeamCreation {
    Created(Team),
    AlreadyExists(Team),
}

pub enum Admission {
    Admitted(TeamMember),
    Refused(Rejection),
}

#[derive(Default)]
struct Tables {
    teams: HashMap<String, Team>,
    members: HashMap<String, TeamMember>,
    tokens: HashMap<String, InviteToken>,
}

impl Tables {
    fn active_members(&self, team_id: &str) -> impl Iterator<Item = &TeamMember> + '_ {
        let team_id = team_id.to_string();
        self.members
            .values()
            .filter(move |m| m.team_id == team_id && m.holds_seat())
    }

    fn find_active_member(&self, team_id: &str, email: &str) -> Option<&TeamMember> {
        self.active_members(team_id).find(|m| m.member_email == email)
    }

    // Same checks the admission does, in the same order
    fn check_admission(&self, token: &str, email: &str) -> Result<(Team, InviteToken), Rejection> {
        let invite = match self.tokens.get(token) {
            Some(invite) if invite.is_redeemable() => invite,
            _ => return Err(Rejection::InvalidToken),
        };

        let team = match self.teams.get(&invite.team_id) {
            Some(team) => team,
            None => return Err(Rejection::InvalidToken),
        };

        if !team.is_active() {
            return Err(Rejection::TeamInactive);
        }

        if self.active_members(&team.id).count() >= team.seat_limit as usize {
            return Err(Rejection::SeatsFull);
        }

        if self.find_active_member(&team.id, email).is_some() {
            return Err(Rejection::DuplicateMember);
        }

        Ok((team.clone(), invite.clone()))
    }
}

#[derive(Clone)]
pub struct Ledger {
    tables: Arc<Mutex<Tables>>,
    storage_dir: Option<PathBuf>,
}

// Read every JSON record in a directory; an unreadable record fails the load
fn load_records<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, ServiceError> {
    let mut records = Vec::new();

    if !dir.exists() {
        info!("Creating ledger directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| {
            error!("Failed to create ledger directory: {:?}", e);
            ServiceError::InternalServerError
        })?;
        return Ok(records);
    }

    for entry_result in fs::read_dir(dir).map_err(|e| {
        error!("Failed to read ledger directory: {:?}", e);
        ServiceError::InternalServerError
    })? {
        let entry = entry_result.map_err(|e| {
            error!("Failed to read directory entry: {:?}", e);
            ServiceError::InternalServerError
        })?;

        let path = entry.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            let content = fs::read_to_string(&path).map_err(|e| {
                error!("Failed to read ledger record {}: {:?}", path.display(), e);
                ServiceError::InternalServerError
            })?;

            let record = serde_json::from_str(&content).map_err(|e| {
                error!("Corrupt ledger record {}: {:?}", path.display(), e);
                ServiceError::InternalServerError
            })?;
            records.push(record);
        }
    }

    Ok(records)
}

impl Ledger {
    // Ledger that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            storage_dir: None,
        }
    }

    // Ledger persisted as one JSON file per record under `storage_dir`
    pub fn open(storage_dir: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let storage_dir = storage_dir.into();
        let mut tables = Tables::default();

        for team in load_records::<Team>(&storage_dir.join(TEAMS_DIR))? {
            tables.teams.insert(team.id.clone(), team);
        }
        for member in load_records::<TeamMember>(&storage_dir.join(MEMBERS_DIR))? {
            tables.members.insert(member.id.clone(), member);
        }
        for token in load_records::<InviteToken>(&storage_dir.join(TOKENS_DIR))? {
            tables.tokens.insert(token.token.clone(), token);
        }

        info!(
            "📒 Ledger loaded: {} teams, {} members, {} tokens",
            tables.teams.len(),
            tables.members.len(),
            tables.tokens.len()
        );

        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            storage_dir: Some(storage_dir),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, ServiceError> {
        self.tables.lock().map_err(|e| {
            error!("Ledger lock poisoned: {:?}", e);
            ServiceError::InternalServerError
        })
    }

    fn persist<T: Serialize>(&self, table: &str, key: &str, record: &T) -> Result<(), ServiceError> {
        let dir = match &self.storage_dir {
            Some(dir) => dir.join(table),
            None => return Ok(()),
        };

        fs::create_dir_all(&dir).map_err(|e| {
            error!("Failed to create ledger directory: {:?}", e);
            ServiceError::InternalServerError
        })?;

        let json = serde_json::to_string_pretty(record).map_err(|e| {
            error!("Failed to serialize {} record: {:?}", table, e);
            ServiceError::InternalServerError
        })?;

        // Write beside the record and rename over it, so readers never see half a file
        let path = dir.join(format!("{}.json", key));
        let staging = dir.join(format!("{}.json.tmp", key));
        fs::write(&staging, json).map_err(|e| {
            error!("Failed to save {} record {}: {:?}", table, key, e);
            ServiceError::InternalServerError
        })?;
        fs::rename(&staging, &path).map_err(|e| {
            error!("Failed to save {} record {}: {:?}", table, key, e);
            if let Err(e) = fs::remove_file(&staging) {
                warn!("Could not clean up {}: {:?}", staging.display(), e);
            }
            ServiceError::InternalServerError
        })
    }

    // Remove records written by an operation that failed part way
    fn discard(&self, written: &[(&str, String)]) {
        let dir = match &self.storage_dir {
            Some(dir) => dir,
            None => return,
        };
        for (table, key) in written {
            let path = dir.join(table).join(format!("{}.json", key));
            if let Err(e) = fs::remove_file(&path) {
                error!("Failed to roll back {}: {:?}", path.display(), e);
            }
        }
    }

    fn save_member(&self, tables: &mut Tables, member: TeamMember) -> Result<TeamMember, ServiceError> {
        self.persist(MEMBERS_DIR, &member.id, &member)?;
        tables.members.insert(member.id.clone(), member.clone());
        Ok(member)
    }

    /// Create a team with its invite token, unless the subscription already
    /// has a non-revoked team.
    pub fn create_team(&self, team: Team, token: InviteToken) -> Result<TeamCreation, ServiceError> {
        let mut tables = self.lock()?;

        if let Some(existing) = tables
            .teams
            .values()
            .find(|t| t.is_active() && t.billing_subscription_ref == team.billing_subscription_ref)
        {
            return Ok(TeamCreation::AlreadyExists(existing.clone()));
        }

        self.persist(TEAMS_DIR, &team.id, &team)?;
        self.persist(TOKENS_DIR, &token.token, &token)?;
        tables.tokens.insert(token.token.clone(), token);
        tables.teams.insert(team.id.clone(), team.clone());

        info!("✅ Saved team: {}", team.id);
        Ok(TeamCreation::Created(team))
    }

    pub fn find_team(&self, team_id: &str) -> Result<Option<Team>, ServiceError> {
        Ok(self.lock()?.teams.get(team_id).cloned())
    }

    pub fn find_active_team_by_subscription(&self, subscription_ref: &str) -> Result<Option<Team>, ServiceError> {
        Ok(self
            .lock()?
            .teams
            .values()
            .find(|t| t.is_active() && t.billing_subscription_ref == subscription_ref)
            .cloned())
    }

    // Most recent team for a subscription, revoked or not
    pub fn latest_team_by_subscription(&self, subscription_ref: &str) -> Result<Option<Team>, ServiceError> {
        Ok(self
            .lock()?
            .teams
            .values()
            .filter(|t| t.billing_subscription_ref == subscription_ref)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    pub fn active_teams_for_leader(&self, leader_email: &str) -> Result<Vec<Team>, ServiceError> {
        let mut teams: Vec<Team> = self
            .lock()?
            .teams
            .values()
            .filter(|t| t.is_active() && t.leader_email == leader_email)
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.created_at);
        Ok(teams)
    }

    /// Revoke a team and every member still holding a seat. Returns how many
    /// members were revoked. Safe to re-run on an already revoked team.
    pub fn revoke_team(&self, team_id: &str) -> Result<usize, ServiceError> {
        let mut tables = self.lock()?;

        let mut team = match tables.teams.get(team_id) {
            Some(team) => team.clone(),
            None => return Err(ServiceError::NotFound(format!("Team not found: {}", team_id))),
        };

        let holders: Vec<TeamMember> = tables.active_members(team_id).cloned().collect();
        let revoked = holders.len();
        for mut member in holders {
            member.status = MemberStatus::Revoked;
            member.invite_status = InviteStatus::Revoked;
            self.save_member(&mut tables, member)?;
        }

        if team.status != TeamStatus::Revoked {
            team.status = TeamStatus::Revoked;
            self.persist(TEAMS_DIR, &team.id, &team)?;
            tables.teams.insert(team.id.clone(), team);
        }

        info!("✅ Revoked team {} and {} members", team_id, revoked);
        Ok(revoked)
    }

    pub fn find_token(&self, token: &str) -> Result<Option<InviteToken>, ServiceError> {
        Ok(self.lock()?.tokens.get(token).cloned())
    }

    // Newest token of a team that can still admit someone
    pub fn redeemable_token_for_team(&self, team_id: &str) -> Result<Option<InviteToken>, ServiceError> {
        Ok(self
            .lock()?
            .tokens
            .values()
            .filter(|t| t.team_id == team_id && t.is_redeemable())
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    /// Read-only admission check. Returns the team the token admits into.
    pub fn check_admission(&self, token: &str, email: &str) -> Result<Team, ServiceError> {
        let tables = self.lock()?;
        let (team, _) = tables.check_admission(token, email)?;
        Ok(team)
    }

    /// Re-run the admission checks and insert the member in one critical
    /// section. A spent single-use token is replaced by a fresh one for the
    /// same team. Either every record is written or none is.
    pub fn admit_member(&self, token: &str, member: TeamMember) -> Result<Admission, ServiceError> {
        let mut tables = self.lock()?;

        let (team, mut invite) = match tables.check_admission(token, &member.member_email) {
            Ok(found) => found,
            Err(rejection) => return Ok(Admission::Refused(rejection)),
        };
        if member.team_id != team.id {
            error!("Member {} does not belong to token team {}", member.id, team.id);
            return Err(ServiceError::InternalServerError);
        }

        invite.consume();
        let replacement = if invite.used {
            Some(InviteToken::new(tokens::generate_token(), team.id.clone(), invite.policy))
        } else {
            None
        };

        // New records first; the spent token overwrites an existing file and goes last
        self.persist(MEMBERS_DIR, &member.id, &member)?;
        let mut written = vec![(MEMBERS_DIR, member.id.clone())];
        if let Some(fresh) = &replacement {
            if let Err(e) = self.persist(TOKENS_DIR, &fresh.token, fresh) {
                self.discard(&written);
                return Err(e);
            }
            written.push((TOKENS_DIR, fresh.token.clone()));
        }
        if invite.used {
            if let Err(e) = self.persist(TOKENS_DIR, &invite.token, &invite) {
                self.discard(&written);
                return Err(e);
            }
        }

        tables.members.insert(member.id.clone(), member.clone());
        if let Some(fresh) = replacement {
            debug!("Invite token for team {} spent, issued a new one", team.id);
            tables.tokens.insert(fresh.token.clone(), fresh);
            tables.tokens.insert(invite.token.clone(), invite);
        }

        info!("✅ Admitted {} to team {}", member.member_email, team.id);
        Ok(Admission::Admitted(member))
    }

    pub fn find_active_member(&self, team_id: &str, email: &str) -> Result<Option<TeamMember>, ServiceError> {
        Ok(self.lock()?.find_active_member(team_id, email).cloned())
    }

    pub fn active_members(&self, team_id: &str) -> Result<Vec<TeamMember>, ServiceError> {
        let mut members: Vec<TeamMember> = self.lock()?.active_members(team_id).cloned().collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    pub fn count_active_members(&self, team_id: &str) -> Result<usize, ServiceError> {
        Ok(self.lock()?.active_members(team_id).count())
    }

    // Seat holders whose onboarding or access tag is not confirmed yet
    pub fn pending_members(&self, team_id: &str) -> Result<Vec<TeamMember>, ServiceError> {
        Ok(self
            .active_members(team_id)?
            .into_iter()
            .filter(TeamMember::needs_sync)
            .collect())
    }

    // The community platform confirmed the member's access tag
    pub fn mark_tagged(&self, member_id: &str) -> Result<(), ServiceError> {
        let mut tables = self.lock()?;

        let mut member = match tables.members.get(member_id) {
            Some(member) => member.clone(),
            None => return Err(ServiceError::NotFound(format!("Member not found: {}", member_id))),
        };

        if !member.tag_pending {
            return Ok(());
        }

        member.tag_pending = false;
        self.save_member(&mut tables, member)?;
        Ok(())
    }

    /// Move every `invited` member of a team to `viewed`. Returns the count.
    pub fn mark_invited_as_viewed(&self, team_id: &str) -> Result<usize, ServiceError> {
        let mut tables = self.lock()?;

        let invited: Vec<TeamMember> = tables
            .active_members(team_id)
            .filter(|m| m.invite_status == InviteStatus::Invited)
            .cloned()
            .collect();

        let count = invited.len();
        for mut member in invited {
            member.invite_status = InviteStatus::Viewed;
            self.save_member(&mut tables, member)?;
        }

        Ok(count)
    }

    /// Advance a member's invite status. Returns false, and writes nothing,
    /// when `next` would not move the member forward.
    pub fn advance_invite_status(&self, member_id: &str, next: InviteStatus) -> Result<bool, ServiceError> {
        let mut tables = self.lock()?;

        let mut member = match tables.members.get(member_id) {
            Some(member) => member.clone(),
            None => return Err(ServiceError::NotFound(format!("Member not found: {}", member_id))),
        };

        if !member.invite_status.can_advance_to(next) {
            return Ok(false);
        }

        member.invite_status = next;
        self.save_member(&mut tables, member)?;
        Ok(true)
    }

    pub fn set_external_ref(&self, member_id: &str, external_ref: &str) -> Result<(), ServiceError> {
        let mut tables = self.lock()?;

        let mut member = match tables.members.get(member_id) {
            Some(member) => member.clone(),
            None => return Err(ServiceError::NotFound(format!("Member not found: {}", member_id))),
        };

        if member.member_external_ref.as_deref() == Some(external_ref) {
            return Ok(());
        }

        member.member_external_ref = Some(external_ref.to_string());
        self.save_member(&mut tables, member)?;
        Ok(())
    }

    // Release a member's seat; the row stays for history
    pub fn revoke_member(&self, member_id: &str) -> Result<TeamMember, ServiceError> {
        let mut tables = self.lock()?;

        let mut member = match tables.members.get(member_id) {
            Some(member) => member.clone(),
            None => return Err(ServiceError::NotFound(format!("Member not found: {}", member_id))),
        };

        member.status = MemberStatus::Revoked;
        member.invite_status = InviteStatus::Revoked;
        self.save_member(&mut tables, member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessType, TokenPolicy};
    use chrono::Utc;

    fn team(sub: &str, seat_limit: u32) -> Team {
        Team {
            id: uuid::Uuid::new_v4().to_string(),
            leader_email: "lead@example.com".to_string(),
            billing_customer_ref: "cus_1".to_string(),
            billing_subscription_ref: sub.to_string(),
            access_type: AccessType::Subscription,
            seat_limit,
            status: TeamStatus::Active,
            course_space_id: None,
            converted_from_individual: false,
            converted_at: None,
            created_at: Utc::now(),
        }
    }

    fn seeded(seat_limit: u32, policy: TokenPolicy) -> (Ledger, Team) {
        let ledger = Ledger::in_memory();
        let t = team("sub_1", seat_limit);
        let token = InviteToken::new("tok".to_string(), t.id.clone(), policy);
        ledger.create_team(t.clone(), token).unwrap();
        (ledger, t)
    }

    fn admit_as(ledger: &Ledger, team: &Team, email: &str, status: InviteStatus) -> Result<TeamMember, Rejection> {
        match ledger.admit_member("tok", TeamMember::new(&team.id, email, None, status)).unwrap() {
            Admission::Admitted(member) => Ok(member),
            Admission::Refused(rejection) => Err(rejection),
        }
    }

    fn admit(ledger: &Ledger, team: &Team, email: &str) -> Result<TeamMember, Rejection> {
        admit_as(ledger, team, email, InviteStatus::Active)
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("ledger-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn second_team_for_same_subscription_is_not_created() {
        let (ledger, first) = seeded(5, TokenPolicy::Shareable);
        let dup = team("sub_1", 5);
        let token = InviteToken::new("tok2".to_string(), dup.id.clone(), TokenPolicy::Shareable);
        match ledger.create_team(dup, token).unwrap() {
            TeamCreation::AlreadyExists(existing) => assert_eq!(existing.id, first.id),
            TeamCreation::Created(_) => panic!("duplicate team created"),
        }
        assert!(ledger.find_token("tok2").unwrap().is_none());
    }

    #[test]
    fn seat_limit_is_enforced_at_insert() {
        let (ledger, t) = seeded(2, TokenPolicy::Shareable);
        admit(&ledger, &t, "a@x.com").unwrap();
        admit(&ledger, &t, "b@x.com").unwrap();
        assert_eq!(admit(&ledger, &t, "c@x.com").unwrap_err(), Rejection::SeatsFull);
        assert_eq!(ledger.count_active_members(&t.id).unwrap(), 2);
    }

    #[test]
    fn revoked_members_free_their_seat() {
        let (ledger, t) = seeded(1, TokenPolicy::Shareable);
        let member = admit(&ledger, &t, "a@x.com").unwrap();
        ledger.revoke_member(&member.id).unwrap();
        admit(&ledger, &t, "a@x.com").unwrap();
        assert_eq!(ledger.count_active_members(&t.id).unwrap(), 1);
    }

    #[test]
    fn single_use_token_admits_once_and_is_replaced() {
        let (ledger, t) = seeded(5, TokenPolicy::SingleUse);
        admit(&ledger, &t, "a@x.com").unwrap();
        assert_eq!(admit(&ledger, &t, "b@x.com").unwrap_err(), Rejection::InvalidToken);
        assert!(ledger.find_token("tok").unwrap().unwrap().used);

        let fresh = ledger.redeemable_token_for_team(&t.id).unwrap().unwrap();
        assert_ne!(fresh.token, "tok");
        assert_eq!(fresh.policy, TokenPolicy::SingleUse);
        let next = TeamMember::new(&t.id, "b@x.com", None, InviteStatus::Active);
        assert!(matches!(
            ledger.admit_member(&fresh.token, next).unwrap(),
            Admission::Admitted(_)
        ));
    }

    #[test]
    fn shareable_token_is_never_replaced() {
        let (ledger, t) = seeded(5, TokenPolicy::Shareable);
        admit(&ledger, &t, "a@x.com").unwrap();
        assert_eq!(ledger.redeemable_token_for_team(&t.id).unwrap().unwrap().token, "tok");
    }

    #[test]
    fn revoke_team_cascades_and_is_repeatable() {
        let (ledger, t) = seeded(5, TokenPolicy::Shareable);
        admit(&ledger, &t, "a@x.com").unwrap();
        admit(&ledger, &t, "b@x.com").unwrap();

        assert_eq!(ledger.revoke_team(&t.id).unwrap(), 2);
        assert_eq!(ledger.revoke_team(&t.id).unwrap(), 0);
        assert!(!ledger.find_team(&t.id).unwrap().unwrap().is_active());
        assert!(ledger.find_active_team_by_subscription("sub_1").unwrap().is_none());
        assert_eq!(ledger.count_active_members(&t.id).unwrap(), 0);
    }

    #[test]
    fn invite_status_never_moves_backwards() {
        let (ledger, t) = seeded(5, TokenPolicy::Shareable);
        let m = admit_as(&ledger, &t, "a@x.com", InviteStatus::Invited).unwrap();
        assert!(ledger.advance_invite_status(&m.id, InviteStatus::Opened).unwrap());
        assert!(!ledger.advance_invite_status(&m.id, InviteStatus::Viewed).unwrap());
        assert_eq!(ledger.mark_invited_as_viewed(&t.id).unwrap(), 0);
        let stored = ledger.find_active_member(&t.id, "a@x.com").unwrap().unwrap();
        assert_eq!(stored.invite_status, InviteStatus::Opened);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = temp_dir();
        let t = team("sub_9", 3);
        {
            let ledger = Ledger::open(&dir).unwrap();
            let token = InviteToken::new("tok".to_string(), t.id.clone(), TokenPolicy::Shareable);
            ledger.create_team(t.clone(), token).unwrap();
            admit(&ledger, &t, "a@x.com").unwrap();
        }

        let reopened = Ledger::open(&dir).unwrap();
        assert_eq!(reopened.count_active_members(&t.id).unwrap(), 1);
        assert!(reopened.find_token("tok").unwrap().is_some());
        assert_eq!(
            reopened.find_active_team_by_subscription("sub_9").unwrap().unwrap().id,
            t.id
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn pending_members_include_untagged_seat_holders() {
        let (ledger, t) = seeded(5, TokenPolicy::Shareable);
        let tagged = admit(&ledger, &t, "a@x.com").unwrap();
        let untagged = admit(&ledger, &t, "b@x.com").unwrap();
        ledger.mark_tagged(&tagged.id).unwrap();

        let pending: Vec<String> = ledger
            .pending_members(&t.id)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(pending, vec![untagged.id]);
    }

    #[test]
    fn failed_token_write_leaves_no_member_behind() {
        let dir = temp_dir();
        let t = team("sub_7", 5);
        let ledger = Ledger::open(&dir).unwrap();
        let token = InviteToken::new("tok".to_string(), t.id.clone(), TokenPolicy::SingleUse);
        ledger.create_team(t.clone(), token).unwrap();

        // A directory where the token file should be makes the overwrite fail
        let token_file = dir.join(TOKENS_DIR).join("tok.json");
        fs::remove_file(&token_file).unwrap();
        fs::create_dir(&token_file).unwrap();

        let member = TeamMember::new(&t.id, "a@x.com", None, InviteStatus::Active);
        assert_eq!(
            ledger.admit_member("tok", member).err(),
            Some(ServiceError::InternalServerError)
        );
        assert_eq!(ledger.count_active_members(&t.id).unwrap(), 0);
        assert_eq!(fs::read_dir(dir.join(MEMBERS_DIR)).unwrap().count(), 0);
        let token_files = fs::read_dir(dir.join(TOKENS_DIR)).unwrap().count();
        assert_eq!(token_files, 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_record_fails_open() {
        let dir = temp_dir();
        {
            let ledger = Ledger::open(&dir).unwrap();
            let t = team("sub_8", 5);
            let token = InviteToken::new("tok".to_string(), t.id.clone(), TokenPolicy::Shareable);
            ledger.create_team(t.clone(), token).unwrap();
            admit(&ledger, &t, "a@x.com").unwrap();
        }
        let member_file = fs::read_dir(dir.join(MEMBERS_DIR)).unwrap().next().unwrap().unwrap().path();
        fs::write(&member_file, "{\"id\": \"trunc").unwrap();

        assert_eq!(Ledger::open(&dir).err(), Some(ServiceError::InternalServerError));

        fs::remove_dir_all(&dir).unwrap();
    }
}
