//!
//! Action dispatcher
//! -----------------
//! Named entry points for every user-triggered event (login, signup, logout,
//! student actions, roster filtering, add/edit forms, login history). Each handler
//! calls the API, updates the session or the dashboard, and re-binds the
//! presentation before returning, so a UI layer can render straight after the call.
//!
//! States: Anonymous -> Authenticating -> Authenticated -> LoggingOut -> Anonymous.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::api::{ApiClient, LoginRecord, Student};
use crate::dashboard::{Dashboard, RefreshReport};
use crate::error::{AuthError, ResourceError, SignupError};
use crate::identity::{Capability, Session, SessionStore};
use crate::view::{AuthForms, DetailSection, DetailView, FormMode, FormTab, Notice, Presentation, StudentForm};

pub const MSG_LOGIN_MISSING: &str = "Please enter username/email and password.";
pub const MSG_LOGIN_OK: &str = "Login successful.";
pub const MSG_FILL_ALL: &str = "Please fill all fields.";
pub const MSG_SIGNUP_OK: &str = "Account created! You can now login.";
pub const MSG_ADMIN_MODIFY: &str = "Only admin can modify student data.";
pub const MSG_ADMIN_ADD: &str = "Only admin can add students.";
pub const MSG_ADMIN_HISTORY: &str = "Only admin can view login history.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    Anonymous,
    Authenticating,
    Authenticated,
    LoggingOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentAction {
    ViewExams,
    ViewFees,
    /// Exams and fees together.
    Details,
    Edit,
    Delete,
}

impl StudentAction {
    pub fn requires_admin(&self) -> bool { matches!(self, StudentAction::Edit | StudentAction::Delete) }

    pub fn as_str(&self) -> &'static str {
        match self {
            StudentAction::ViewExams => "view-exams",
            StudentAction::ViewFees => "view-fees",
            StudentAction::Details => "details",
            StudentAction::Edit => "edit",
            StudentAction::Delete => "delete",
        }
    }
}

impl Display for StudentAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StudentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view-exams" | "exams" => Ok(StudentAction::ViewExams),
            "view-fees" | "fees" => Ok(StudentAction::ViewFees),
            "details" | "view" => Ok(StudentAction::Details),
            "edit" => Ok(StudentAction::Edit),
            "delete" => Ok(StudentAction::Delete),
            other => Err(format!("unknown student action '{}'", other)),
        }
    }
}

/// Explicit user confirmation asked before destructive calls.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool { self(prompt) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated { capability: Capability, refresh: RefreshReport },
    Failed(AuthError),
    MissingFields,
    /// A session is already active or a login is in flight.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignupOutcome {
    Created,
    Failed(SignupError),
    MissingFields,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Detail(DetailView),
    EditForm(StudentForm),
    Deleted { id: i64, refresh: RefreshReport },
    /// The user declined the confirmation.
    Cancelled,
    /// Capability check failed; a warning notice is showing.
    Rejected,
    Failed(ResourceError),
    UnknownStudent(i64),
    NotAuthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Saved { student: Student, refresh: RefreshReport },
    Rejected,
    MissingFields,
    Failed(ResourceError),
    NotAuthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryOutcome {
    Loaded(Vec<LoginRecord>),
    Rejected,
    Failed(ResourceError),
    NotAuthenticated,
}

fn mutation_failure(verb: &str, e: &ResourceError) -> String {
    match e.status() {
        Some(status) => format!("Failed to {} student ({}).", verb, status),
        None => "Error connecting to server.".to_string(),
    }
}

pub struct Dispatcher {
    api: ApiClient,
    sessions: SessionStore,
    dashboard: Dashboard,
    view: Presentation,
    forms: AuthForms,
    notice: Option<Notice>,
    notice_seq: u64,
    state: ConsoleState,
}

impl Dispatcher {
    pub fn new(api: ApiClient, sessions: SessionStore) -> Self {
        Self {
            api,
            sessions,
            dashboard: Dashboard::new(),
            view: Presentation::default(),
            forms: AuthForms::default(),
            notice: None,
            notice_seq: 0,
            state: ConsoleState::Anonymous,
        }
    }

    pub fn api(&self) -> &ApiClient { &self.api }
    pub fn state(&self) -> ConsoleState { self.state }
    pub fn session(&self) -> Option<&Session> { self.sessions.current() }
    pub fn dashboard(&self) -> &Dashboard { &self.dashboard }
    pub fn presentation(&self) -> &Presentation { &self.view }
    pub fn forms(&self) -> &AuthForms { &self.forms }
    pub fn notice(&self) -> Option<&Notice> { self.notice.as_ref() }

    /// Bumped every time a notice is raised, even when it repeats the previous one.
    pub fn notice_seq(&self) -> u64 { self.notice_seq }

    pub fn dismiss_notice(&mut self) { self.notice = None; }

    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.notice_seq += 1;
    }

    pub fn show_form(&mut self, tab: FormTab) { self.forms.active = tab; }

    /// Re-derive every region from the current session and the rows on screen.
    fn rebind(&mut self) {
        match self.sessions.current() {
            Some(s) => self.view.apply_authenticated(s),
            None => self.view.apply_anonymous(),
        }
        let rows: Vec<i64> = self.dashboard.visible().iter().map(|s| s.id).collect();
        self.view.replace_rows(rows);
    }

    fn session_parts(&self) -> Option<(crate::identity::Credential, bool)> {
        self.sessions.current().map(|s| (s.credential.clone(), s.is_admin()))
    }

    // ---- session ----

    /// Startup: bring back a persisted session, if any, and load the dashboard for it.
    pub async fn restore_session(&mut self) -> Option<RefreshReport> {
        if self.sessions.restore().is_none() {
            self.state = ConsoleState::Anonymous;
            self.rebind();
            return None;
        }
        self.state = ConsoleState::Authenticated;
        self.rebind();
        Some(self.refresh().await)
    }

    /// Drop all in-memory state and start over from storage, as a page reload would.
    pub async fn reload(&mut self) -> Option<RefreshReport> {
        self.dashboard.clear();
        self.view = Presentation::default();
        self.forms = AuthForms::default();
        self.notice = None;
        self.restore_session().await
    }

    pub async fn submit_login(&mut self, login_id: &str, password: &str) -> LoginOutcome {
        if matches!(self.state, ConsoleState::Authenticated | ConsoleState::Authenticating) {
            debug!(target: "studentdesk::dispatch", state = ?self.state, "login ignored");
            return LoginOutcome::Ignored;
        }
        self.notice = None;
        self.forms.login_error = None;
        self.forms.login_id = login_id.trim().to_string();
        self.forms.login_password = password.to_string();
        let login_id = login_id.trim();
        if login_id.is_empty() || password.is_empty() {
            self.forms.login_error = Some(MSG_LOGIN_MISSING.to_string());
            return LoginOutcome::MissingFields;
        }

        self.state = ConsoleState::Authenticating;
        match self.sessions.login(&self.api, login_id, password).await {
            Ok(session) => {
                self.state = ConsoleState::Authenticated;
                self.rebind();
                self.set_notice(Notice::success(MSG_LOGIN_OK));
                let refresh = self.refresh().await;
                LoginOutcome::Authenticated { capability: session.capability, refresh }
            }
            Err(e) => {
                self.state = ConsoleState::Anonymous;
                warn!(target: "studentdesk::dispatch", code = e.code(), "login failed: {e}");
                self.forms.login_error = Some(e.user_message());
                LoginOutcome::Failed(e)
            }
        }
    }

    pub async fn submit_signup(&mut self, name: &str, email: &str, password: &str) -> SignupOutcome {
        self.notice = None;
        self.forms.login_error = None;
        self.forms.signup_name = name.trim().to_string();
        self.forms.signup_email = email.trim().to_string();
        self.forms.signup_password = password.to_string();
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            self.set_notice(Notice::danger(MSG_FILL_ALL));
            return SignupOutcome::MissingFields;
        }
        match self.api.register_account(name, email, password).await {
            Ok(()) => {
                info!(target: "studentdesk::dispatch", email, "account created");
                self.set_notice(Notice::success(MSG_SIGNUP_OK));
                self.forms.active = FormTab::Login;
                SignupOutcome::Created
            }
            Err(e) => {
                warn!(target: "studentdesk::dispatch", code = e.code(), "signup failed: {e}");
                self.set_notice(Notice::danger(e.user_message()));
                SignupOutcome::Failed(e)
            }
        }
    }

    pub fn logout(&mut self) {
        if self.state == ConsoleState::Authenticated {
            self.state = ConsoleState::LoggingOut;
        }
        self.sessions.logout();
        self.dashboard.clear();
        self.forms.clear_passwords();
        self.forms.login_error = None;
        self.notice = None;
        self.state = ConsoleState::Anonymous;
        self.rebind();
    }

    /// The console is closing: the durable session record must not outlive it.
    pub fn end_browsing_context(&mut self) {
        self.sessions.end_browsing_context();
        self.dashboard.clear();
        self.state = ConsoleState::Anonymous;
        self.rebind();
    }

    // ---- dashboard ----

    pub async fn refresh(&mut self) -> RefreshReport {
        let report = self.dashboard.refresh(&self.api, self.sessions.current()).await;
        self.rebind();
        report
    }

    /// Client-side only; never touches the network.
    pub fn filter_roster(&mut self, query: &str) -> Vec<Student> {
        self.dashboard.set_filter(query);
        self.rebind();
        self.dashboard.visible().into_iter().cloned().collect()
    }

    pub async fn invoke_student_action(&mut self, action: StudentAction, id: i64, confirm: &mut dyn Confirm) -> ActionOutcome {
        let Some((credential, admin)) = self.session_parts() else {
            return ActionOutcome::NotAuthenticated;
        };
        let Some(student) = self.dashboard.find(id).cloned() else {
            debug!(target: "studentdesk::dispatch", id, action = %action, "student not in roster");
            return ActionOutcome::UnknownStudent(id);
        };
        if action.requires_admin() && !admin {
            info!(target: "studentdesk::dispatch", id, action = %action, "rejected for non-admin session");
            self.set_notice(Notice::warning(MSG_ADMIN_MODIFY));
            return ActionOutcome::Rejected;
        }

        match action {
            StudentAction::ViewExams => {
                let exams = self.api.list_exams(&credential, id).await;
                ActionOutcome::Detail(DetailView { student, exams: DetailSection::from_result(exams), fees: DetailSection::NotRequested })
            }
            StudentAction::ViewFees => {
                let fees = self.api.list_fees(&credential, id).await;
                ActionOutcome::Detail(DetailView { student, exams: DetailSection::NotRequested, fees: DetailSection::from_result(fees) })
            }
            StudentAction::Details => {
                let (exams, fees) = tokio::join!(self.api.list_exams(&credential, id), self.api.list_fees(&credential, id));
                ActionOutcome::Detail(DetailView { student, exams: DetailSection::from_result(exams), fees: DetailSection::from_result(fees) })
            }
            StudentAction::Edit => ActionOutcome::EditForm(StudentForm::edit(&student)),
            StudentAction::Delete => {
                if !confirm.confirm(&format!("Delete student {}?", student.name)) {
                    return ActionOutcome::Cancelled;
                }
                match self.api.delete_student(&credential, id).await {
                    Ok(()) => {
                        info!(target: "studentdesk::dispatch", id, "student deleted");
                        self.set_notice(Notice::success("Student deleted."));
                        let refresh = self.refresh().await;
                        ActionOutcome::Deleted { id, refresh }
                    }
                    Err(e) => {
                        warn!(target: "studentdesk::dispatch", id, code = e.code(), "delete failed: {e}");
                        let msg = match e.status() {
                            Some(status) => format!("Failed to delete student (status {}).", status),
                            None => "Error while deleting student.".to_string(),
                        };
                        self.set_notice(Notice::danger(msg));
                        ActionOutcome::Failed(e)
                    }
                }
            }
        }
    }

    // ---- add / edit ----

    pub fn open_add_form(&mut self) -> Option<StudentForm> {
        let (_, admin) = self.session_parts()?;
        if !admin {
            self.set_notice(Notice::warning(MSG_ADMIN_ADD));
            return None;
        }
        Some(StudentForm::add())
    }

    pub async fn submit_student_form(&mut self, form: &StudentForm) -> FormOutcome {
        let Some((credential, admin)) = self.session_parts() else {
            return FormOutcome::NotAuthenticated;
        };
        if !admin {
            self.set_notice(Notice::warning(MSG_ADMIN_MODIFY));
            return FormOutcome::Rejected;
        }
        if !form.is_complete() {
            self.set_notice(Notice::danger(MSG_FILL_ALL));
            return FormOutcome::MissingFields;
        }
        let draft = form.draft();
        let (verb, result) = match form.mode {
            FormMode::Add => ("create", self.api.create_student(&credential, &draft).await),
            FormMode::Edit(id) => ("update", self.api.update_student(&credential, id, &draft).await),
        };
        match result {
            Ok(student) => {
                info!(target: "studentdesk::dispatch", id = student.id, verb, "student saved");
                let msg = if verb == "create" { "Student created." } else { "Student updated." };
                self.set_notice(Notice::success(msg));
                let refresh = self.refresh().await;
                FormOutcome::Saved { student, refresh }
            }
            Err(e) => {
                warn!(target: "studentdesk::dispatch", verb, code = e.code(), "save failed: {e}");
                self.set_notice(Notice::danger(mutation_failure(verb, &e)));
                FormOutcome::Failed(e)
            }
        }
    }

    // ---- admin ----

    pub async fn show_login_history(&mut self) -> HistoryOutcome {
        let Some((credential, admin)) = self.session_parts() else {
            return HistoryOutcome::NotAuthenticated;
        };
        if !admin {
            self.set_notice(Notice::danger(MSG_ADMIN_HISTORY));
            return HistoryOutcome::Rejected;
        }
        match self.api.list_admin_logins(&credential).await {
            Ok(list) => HistoryOutcome::Loaded(list),
            Err(e) => {
                warn!(target: "studentdesk::dispatch", code = e.code(), "login history failed: {e}");
                let msg = match e.status() {
                    Some(status) => format!("Failed to load login history ({}).", status),
                    None => "Error connecting to server.".to_string(),
                };
                self.set_notice(Notice::danger(msg));
                HistoryOutcome::Failed(e)
            }
        }
    }
}
