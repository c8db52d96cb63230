use serde::Serialize;

use crate::api::{Student, StudentDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormTab {
    #[default]
    Login,
    Signup,
}

/// Input state of the login and signup forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForms {
    pub active: FormTab,
    pub login_id: String,
    pub login_password: String,
    pub signup_name: String,
    pub signup_email: String,
    pub signup_password: String,
    /// Field-local error under the login form.
    pub login_error: Option<String>,
}

impl AuthForms {
    pub fn clear_passwords(&mut self) {
        self.login_password.clear();
        self.signup_password.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "id", rename_all = "lowercase")]
pub enum FormMode {
    Add,
    Edit(i64),
}

/// Add/edit student form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentForm {
    pub mode: FormMode,
    pub name: String,
    pub email: String,
}

impl StudentForm {
    pub fn add() -> Self { Self { mode: FormMode::Add, name: String::new(), email: String::new() } }

    pub fn edit(student: &Student) -> Self {
        Self { mode: FormMode::Edit(student.id), name: student.name.clone(), email: student.email.clone() }
    }

    /// Presence check only.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }

    pub fn draft(&self) -> StudentDraft {
        StudentDraft { name: self.name.trim().to_string(), email: self.email.trim().to_string() }
    }
}
