mod common;

use std::time::Duration;

use anyhow::Result;

use common::{ADMIN_PASSWORD, ADMIN_USER, STANDARD_PASSWORD, STANDARD_USER};
use studentdesk::dispatcher::{ActionOutcome, FormOutcome, HistoryOutcome, StudentAction, MSG_ADMIN_ADD, MSG_ADMIN_HISTORY, MSG_ADMIN_MODIFY};
use studentdesk::error::ResourceError;
use studentdesk::view::{DetailSection, FormMode, NoticeLevel, StudentForm};

fn yes(_: &str) -> bool { true }
fn no(_: &str) -> bool { false }

#[tokio::test]
async fn standard_edit_is_rejected_without_network() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(STANDARD_USER, STANDARD_PASSWORD).await;
    mock.reset_hits();

    let out = d.invoke_student_action(StudentAction::Edit, 7, &mut yes).await;
    assert_eq!(out, ActionOutcome::Rejected);
    let out = d.invoke_student_action(StudentAction::Delete, 7, &mut yes).await;
    assert_eq!(out, ActionOutcome::Rejected);
    assert_eq!(d.notice().map(|n| (n.level, n.message.as_str())), Some((NoticeLevel::Warning, MSG_ADMIN_MODIFY)));
    assert!(mock.hits().is_empty());
    assert_eq!(d.dashboard().roster().len(), 7);
    assert_eq!(mock.student_ids().len(), 7);
    Ok(())
}

#[tokio::test]
async fn admin_delete_refetches_roster() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    mock.reset_hits();

    let mut asked = Vec::new();
    let mut confirm = |p: &str| {
        asked.push(p.to_string());
        true
    };
    let out = d.invoke_student_action(StudentAction::Delete, 3, &mut confirm).await;
    assert!(matches!(out, ActionOutcome::Deleted { id: 3, .. }), "got {out:?}");
    assert_eq!(asked, vec!["Delete student Chidi Obi?".to_string()]);

    let hits = mock.hits();
    assert_eq!(hits.first().map(String::as_str), Some("DELETE /api/students/3"));
    assert!(hits.contains(&"GET /api/students".to_string()));
    assert!(d.dashboard().find(3).is_none());
    assert_eq!(d.dashboard().total_students(), 6);
    assert_eq!(d.notice().map(|n| n.message.as_str()), Some("Student deleted."));
    Ok(())
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    mock.reset_hits();
    assert_eq!(d.invoke_student_action(StudentAction::Delete, 2, &mut no).await, ActionOutcome::Cancelled);
    assert!(mock.hits().is_empty());
    assert_eq!(d.dashboard().roster().len(), 7);
    Ok(())
}

#[tokio::test]
async fn failed_delete_keeps_roster_and_reports_status() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    mock.fail("DELETE", "/api/students/2", 500);
    let out = d.invoke_student_action(StudentAction::Delete, 2, &mut yes).await;
    assert_eq!(out, ActionOutcome::Failed(ResourceError::Status { status: 500 }));
    assert_eq!(d.notice().map(|n| (n.level, n.message.as_str())), Some((NoticeLevel::Danger, "Failed to delete student (status 500).")));
    assert!(d.dashboard().find(2).is_some());
    Ok(())
}

#[tokio::test]
async fn unreachable_delete_keeps_roster_and_reports_connection_error() -> Result<()> {
    let (mock, mut d) = common::start_with_timeout(Duration::from_millis(300)).await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    mock.stall("DELETE", "/api/students/2");
    let out = d.invoke_student_action(StudentAction::Delete, 2, &mut yes).await;
    assert!(matches!(out, ActionOutcome::Failed(ResourceError::Network(_))), "got {out:?}");
    assert_eq!(d.notice().map(|n| (n.level, n.message.as_str())), Some((NoticeLevel::Danger, "Error while deleting student.")));
    assert!(d.dashboard().find(2).is_some());
    assert_eq!(d.dashboard().total_students(), 7);
    Ok(())
}

#[tokio::test]
async fn failed_update_reports_status_and_keeps_old_row() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    let ActionOutcome::EditForm(mut form) = d.invoke_student_action(StudentAction::Edit, 2, &mut no).await else {
        panic!("expected an edit form");
    };
    form.name = "Benedict Ode".into();

    mock.fail("PUT", "/api/students/2", 500);
    mock.reset_hits();
    let out = d.submit_student_form(&form).await;
    assert_eq!(out, FormOutcome::Failed(ResourceError::Status { status: 500 }));
    assert_eq!(d.notice().map(|n| (n.level, n.message.as_str())), Some((NoticeLevel::Danger, "Failed to update student (500).")));
    assert_eq!(mock.hits(), vec!["PUT /api/students/2".to_string()]);
    assert_eq!(d.dashboard().find(2).map(|s| s.name.as_str()), Some("Ben Ode"));
    Ok(())
}

#[tokio::test]
async fn unreachable_save_reports_connection_error() -> Result<()> {
    let (mock, mut d) = common::start_with_timeout(Duration::from_millis(300)).await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    let mut form = d.open_add_form().expect("admin may add");
    form.name = "Hal Nguyen".into();
    form.email = "hal@students.org".into();

    mock.stall("POST", "/api/students");
    let out = d.submit_student_form(&form).await;
    assert!(matches!(out, FormOutcome::Failed(ResourceError::Network(_))), "got {out:?}");
    assert_eq!(d.notice().map(|n| (n.level, n.message.as_str())), Some((NoticeLevel::Danger, "Error connecting to server.")));
    assert_eq!(d.dashboard().total_students(), 7);
    Ok(())
}

#[tokio::test]
async fn unknown_ids_are_ignored() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    mock.reset_hits();
    assert_eq!(d.invoke_student_action(StudentAction::ViewExams, 99, &mut yes).await, ActionOutcome::UnknownStudent(99));
    assert!(mock.hits().is_empty());
    Ok(())
}

#[tokio::test]
async fn details_fetch_exams_and_fees_independently() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(STANDARD_USER, STANDARD_PASSWORD).await;

    let ActionOutcome::Detail(view) = d.invoke_student_action(StudentAction::Details, 3, &mut no).await else {
        panic!("expected a detail view");
    };
    let DetailSection::Loaded(exams) = &view.exams else { panic!("exams not loaded") };
    assert_eq!(exams.len(), 2);
    assert_eq!(exams[0].marks_obtained, 42.0);
    assert!(exams[1].semester.is_none());
    let DetailSection::Loaded(fees) = &view.fees else { panic!("fees not loaded") };
    assert!(!fees[0].paid);

    mock.fail("GET", "/api/students/3/fees", 500);
    let ActionOutcome::Detail(view) = d.invoke_student_action(StudentAction::Details, 3, &mut no).await else {
        panic!("expected a detail view");
    };
    assert!(view.exams.is_loaded());
    assert_eq!(view.fees, DetailSection::Failed(ResourceError::Status { status: 500 }));

    let ActionOutcome::Detail(view) = d.invoke_student_action(StudentAction::ViewExams, 1, &mut no).await else {
        panic!("expected a detail view");
    };
    assert_eq!(view.exams, DetailSection::Loaded(vec![]));
    assert_eq!(view.fees, DetailSection::NotRequested);
    Ok(())
}

#[tokio::test]
async fn admin_edit_opens_prefilled_form_and_saves() -> Result<()> {
    let (_mock, mut d) = common::start().await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;

    let ActionOutcome::EditForm(mut form) = d.invoke_student_action(StudentAction::Edit, 2, &mut no).await else {
        panic!("expected an edit form");
    };
    assert_eq!(form.mode, FormMode::Edit(2));
    assert_eq!(form.name, "Ben Ode");
    form.name = "Benedict Ode".into();

    let out = d.submit_student_form(&form).await;
    assert!(matches!(out, FormOutcome::Saved { .. }), "got {out:?}");
    assert_eq!(d.dashboard().find(2).map(|s| s.name.as_str()), Some("Benedict Ode"));
    assert_eq!(d.notice().map(|n| n.message.as_str()), Some("Student updated."));
    Ok(())
}

#[tokio::test]
async fn add_form_is_admin_only() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(STANDARD_USER, STANDARD_PASSWORD).await;
    assert!(d.open_add_form().is_none());
    assert_eq!(d.notice().map(|n| n.message.as_str()), Some(MSG_ADMIN_ADD));

    mock.reset_hits();
    let form = StudentForm { mode: FormMode::Add, name: "Hal".into(), email: "hal@students.org".into() };
    assert_eq!(d.submit_student_form(&form).await, FormOutcome::Rejected);
    assert!(mock.hits().is_empty());
    Ok(())
}

#[tokio::test]
async fn admin_adds_a_student() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;

    let mut form = d.open_add_form().expect("admin may add");
    assert_eq!(d.submit_student_form(&form).await, FormOutcome::MissingFields);
    assert_eq!(d.notice().map(|n| n.message.as_str()), Some("Please fill all fields."));

    form.name = "Hal Nguyen".into();
    form.email = "hal@students.org".into();
    let FormOutcome::Saved { student, .. } = d.submit_student_form(&form).await else { panic!("not saved") };
    assert_eq!(student.id, 8);
    assert_eq!(d.dashboard().total_students(), 8);
    assert_eq!(mock.student_ids().len(), 8);
    assert_eq!(d.notice().map(|n| n.message.as_str()), Some("Student created."));

    mock.fail("POST", "/api/students", 422);
    assert!(matches!(d.submit_student_form(&form).await, FormOutcome::Failed(_)));
    assert_eq!(d.notice().map(|n| n.message.as_str()), Some("Failed to create student (422)."));
    Ok(())
}

#[tokio::test]
async fn login_history_is_admin_only() -> Result<()> {
    let (mock, mut d) = common::start().await?;
    d.submit_login(STANDARD_USER, STANDARD_PASSWORD).await;
    mock.reset_hits();
    assert_eq!(d.show_login_history().await, HistoryOutcome::Rejected);
    assert_eq!(d.notice().map(|n| n.message.as_str()), Some(MSG_ADMIN_HISTORY));
    assert!(mock.hits().is_empty());
    d.logout();

    d.submit_login(ADMIN_USER, ADMIN_PASSWORD).await;
    let HistoryOutcome::Loaded(list) = d.show_login_history().await else { panic!("history not loaded") };
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].username, ADMIN_USER);
    Ok(())
}
