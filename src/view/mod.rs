//! Rendering-agnostic view state: which regions are visible, the current notice,
//! the auth forms and the detail/form payloads a UI layer draws.

mod presentation;
mod notice;
mod forms;
mod detail;

pub use presentation::{AdminElement, Presentation};
pub use notice::{Notice, NoticeLevel};
pub use forms::{AuthForms, FormMode, FormTab, StudentForm};
pub use detail::{DetailSection, DetailView};
