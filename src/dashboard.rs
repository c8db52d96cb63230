//! Dashboard synchronizer: keeps the in-memory roster and the admin login count
//! consistent with the server.
//!
//! A refresh fans out to the students list and (ADMIN only) the admin login list,
//! joins both and applies each branch independently. A failed branch is logged and
//! leaves its previous data in place; nothing is ever blanked by a failure.

use tracing::{info, warn};

use crate::api::{ApiClient, LoginRecord, Student};
use crate::error::ResourceError;
use crate::identity::Session;

/// Case-insensitive substring filter over name and email. An empty query keeps every row.
pub fn filter_roster<'a>(roster: &'a [Student], query: &str) -> Vec<&'a Student> {
    if query.is_empty() {
        return roster.iter().collect();
    }
    let needle = query.to_lowercase();
    roster.iter().filter(|s| s.matches_lowercase(&needle)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome {
    Applied { count: usize },
    /// Not attempted: no session, or the session is not ADMIN.
    Skipped,
    Failed(ResourceError),
    /// A newer refresh already applied its results.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub generation: u64,
    pub students: BranchOutcome,
    pub admin_logins: BranchOutcome,
}

#[derive(Debug, Default)]
pub struct Dashboard {
    roster: Vec<Student>,
    total_students: usize,
    total_logins: Option<usize>,
    logins_stale: bool,
    filter: String,
    issued: u64,
    applied: u64,
}

impl Dashboard {
    pub fn new() -> Self { Self::default() }

    pub fn roster(&self) -> &[Student] { &self.roster }

    pub fn total_students(&self) -> usize { self.total_students }

    /// Admin-visible login count; None until an ADMIN refresh succeeded.
    pub fn total_logins(&self) -> Option<usize> { self.total_logins }

    /// The last admin-login fetch failed and the count shown is from an earlier refresh.
    pub fn logins_stale(&self) -> bool { self.logins_stale }

    pub fn find(&self, id: i64) -> Option<&Student> { self.roster.iter().find(|s| s.id == id) }

    pub fn filter(&self) -> &str { &self.filter }

    pub fn set_filter(&mut self, query: &str) { self.filter = query.to_string(); }

    /// Rows to render: the roster under the active filter.
    pub fn visible(&self) -> Vec<&Student> { filter_roster(&self.roster, &self.filter) }

    /// Run both fetches concurrently and apply whatever succeeded.
    /// Without a session nothing is requested.
    pub async fn refresh(&mut self, api: &ApiClient, session: Option<&Session>) -> RefreshReport {
        let Some(session) = session else {
            return RefreshReport { generation: self.issued, students: BranchOutcome::Skipped, admin_logins: BranchOutcome::Skipped };
        };
        let generation = self.begin_refresh();
        let credential = &session.credential;
        let admin = session.is_admin();
        let (students, logins) = tokio::join!(api.list_students(credential), async {
            if admin { Some(api.list_admin_logins(credential).await) } else { None }
        });
        self.apply_refresh(generation, students, logins)
    }

    /// Reserve a generation number for a refresh about to be issued.
    pub fn begin_refresh(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Apply the results of refresh `generation`. Results not newer than the last applied
    /// generation are dropped so out-of-order responses cannot roll the view back.
    pub fn apply_refresh(
        &mut self,
        generation: u64,
        students: Result<Vec<Student>, ResourceError>,
        logins: Option<Result<Vec<LoginRecord>, ResourceError>>,
    ) -> RefreshReport {
        if generation <= self.applied {
            info!(target: "studentdesk::dashboard", generation, applied = self.applied, "dropping superseded refresh");
            return RefreshReport { generation, students: BranchOutcome::Superseded, admin_logins: BranchOutcome::Superseded };
        }
        self.applied = generation;

        let students = match students {
            Ok(list) => {
                self.total_students = list.len();
                self.roster = list;
                BranchOutcome::Applied { count: self.total_students }
            }
            Err(e) => {
                warn!(target: "studentdesk::dashboard", code = e.code(), "students fetch failed: {e}");
                BranchOutcome::Failed(e)
            }
        };

        let admin_logins = match logins {
            None => BranchOutcome::Skipped,
            Some(Ok(list)) => {
                self.total_logins = Some(list.len());
                self.logins_stale = false;
                BranchOutcome::Applied { count: list.len() }
            }
            Some(Err(e)) => {
                warn!(target: "studentdesk::dashboard", code = e.code(), "admin/logins fetch failed: {e}");
                self.logins_stale = true;
                BranchOutcome::Failed(e)
            }
        };

        RefreshReport { generation, students, admin_logins }
    }

    /// Drop everything; used when the session ends.
    pub fn clear(&mut self) {
        let issued = self.issued;
        *self = Self::default();
        // keep generations monotonic so late responses from the old session are dropped
        self.issued = issued;
        self.applied = issued;
    }
}
