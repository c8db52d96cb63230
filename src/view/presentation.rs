use std::collections::BTreeMap;

use crate::identity::{Capability, Session};

/// Elements that only an ADMIN capability may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdminElement {
    AddStudentButton,
    ActionsColumn,
    TotalLoginsCard,
    /// Edit/delete cell of one roster row.
    RowActions(i64),
}

const STATIC_ADMIN_ELEMENTS: [AdminElement; 3] =
    [AdminElement::AddStudentButton, AdminElement::ActionsColumn, AdminElement::TotalLoginsCard];

/// Visibility of every UI region, derived from the current session.
///
/// Admin-only visibility is never toggled element by element: every bind pass
/// (including a row replacement after the roster is re-rendered) recomputes the
/// whole admin element set from the bound capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub auth_section_visible: bool,
    pub dashboard_visible: bool,
    pub identity_name: Option<String>,
    pub logout_visible: bool,
    pub login_history_visible: bool,
    bound: Option<Capability>,
    admin_elements: BTreeMap<AdminElement, bool>,
}

impl Default for Presentation {
    fn default() -> Self {
        let mut p = Self {
            auth_section_visible: true,
            dashboard_visible: false,
            identity_name: None,
            logout_visible: false,
            login_history_visible: false,
            bound: None,
            admin_elements: STATIC_ADMIN_ELEMENTS.iter().map(|e| (*e, false)).collect(),
        };
        p.recompute_admin();
        p
    }
}

impl Presentation {
    pub fn apply_authenticated(&mut self, session: &Session) {
        self.bound = Some(session.capability);
        self.auth_section_visible = false;
        self.dashboard_visible = true;
        self.identity_name = Some(session.identity.display_name().to_string());
        self.logout_visible = true;
        self.recompute_admin();
    }

    pub fn apply_anonymous(&mut self) {
        self.bound = None;
        self.auth_section_visible = true;
        self.dashboard_visible = false;
        self.identity_name = None;
        self.logout_visible = false;
        self.recompute_admin();
    }

    /// Register the rows currently rendered (dropping previous ones) and re-bind.
    pub fn replace_rows<I: IntoIterator<Item = i64>>(&mut self, ids: I) {
        self.admin_elements.retain(|e, _| !matches!(e, AdminElement::RowActions(_)));
        for id in ids {
            self.admin_elements.insert(AdminElement::RowActions(id), false);
        }
        self.recompute_admin();
    }

    fn recompute_admin(&mut self) {
        let admin = self.bound.map(|c| c.is_admin()).unwrap_or(false);
        for visible in self.admin_elements.values_mut() {
            *visible = admin;
        }
        self.login_history_visible = admin;
    }

    pub fn capability(&self) -> Option<Capability> { self.bound }

    /// Unregistered elements are hidden.
    pub fn is_visible(&self, el: AdminElement) -> bool {
        self.admin_elements.get(&el).copied().unwrap_or(false)
    }

    pub fn admin_elements(&self) -> impl Iterator<Item = (AdminElement, bool)> + '_ {
        self.admin_elements.iter().map(|(e, v)| (*e, *v))
    }

    pub fn any_admin_visible(&self) -> bool {
        self.admin_elements.values().any(|v| *v) || self.login_history_visible
    }
}
