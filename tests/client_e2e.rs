//! The client core against a live in-process server: session persistence,
//! forced re-authentication on token rejection, client-side validation, the
//! all-or-nothing view loads, and the photo upload contract.

mod common;

use common::spawn_app;
use registrar::client::views::{
    load_classes_view, load_students_view, load_subjects_view, load_teachers_view, ViewState,
    NOT_ASSIGNED,
};
use registrar::client::{ApiClient, ClientError, Session};
use registrar::db::models::{
    ClassDraft, Credentials, ParentDraft, SchoolYearDraft, SectionDraft, SettingsDraft,
    StudentDraft, SubjectDraft, SubjectKind, TeacherDraft, UserDraft,
};
use registrar::policy::Role;
use std::path::Path;

fn user_draft(username: &str, role: Role) -> UserDraft {
    UserDraft {
        username: username.to_string(),
        email: format!("{username}@school.example"),
        name: username.to_string(),
        role,
        phone: None,
        address: None,
        photo: None,
        password: "pw123456".to_string(),
    }
}

fn credentials(username: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: "pw123456".to_string(),
    }
}

async fn signed_in_client(base: &str, state_dir: &Path, username: &str, role: Role) -> ApiClient {
    let api = ApiClient::new(base, Session::load(state_dir).unwrap());
    api.register(&user_draft(username, role)).await.unwrap();
    api.login(&credentials(username)).await.unwrap();
    api
}

#[tokio::test]
async fn login_persists_the_session_across_a_restart() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();

    let api = ApiClient::new(&base, Session::load(state_dir.path()).unwrap());
    api.register(&user_draft("head", Role::Admin)).await.unwrap();
    let identity = api.login(&credentials("head")).await.unwrap();
    assert_eq!(identity.role, Role::Admin);
    assert_eq!(identity.username, "head");
    drop(api);

    // A fresh process rehydrates the same identity and its token works.
    let session = Session::load(state_dir.path()).unwrap();
    assert_eq!(
        session.current_user().map(|identity| identity.username),
        Some("head".to_string())
    );
    let api = ApiClient::new(&base, session);
    let me = api.me().await.unwrap();
    assert_eq!(me.username, "head");
}

#[tokio::test]
async fn logout_destroys_the_stored_session() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "head", Role::Admin).await;

    api.logout().await.unwrap();
    assert!(api.session().current_user().is_none());
    assert!(!state_dir.path().join("session.json").exists());

    let err = api.me().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));
}

#[tokio::test]
async fn invalid_class_drafts_never_reach_the_network() {
    // Nothing is listening here: a request would surface as a network
    // error, so a validation error proves the call was cut off client-side.
    let state_dir = tempfile::tempdir().unwrap();
    let api = ApiClient::new(
        "http://127.0.0.1:1",
        Session::load(state_dir.path()).unwrap(),
    );

    for numeric in [0, 13] {
        let err = api
            .create_class(&ClassDraft {
                name: "Class X".to_string(),
                numeric,
                school_year_id: "y1".to_string(),
                sections: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)), "numeric {numeric}");
    }

    let err = api
        .create_class(&ClassDraft {
            name: "Class 1".to_string(),
            numeric: 1,
            school_year_id: String::new(),
            sections: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = api
        .create_subject(&SubjectDraft {
            name: "Maths".to_string(),
            code: "MTH".to_string(),
            class_id: String::new(),
            teacher_id: None,
            kind: SubjectKind::Mandatory,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[tokio::test]
async fn a_rejected_token_clears_the_session_and_forces_re_login() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "head", Role::Admin).await;
    let token = api.session().current_user().unwrap().token;

    // Invalidate the token behind the client's back.
    let raw = reqwest::Client::new();
    raw.post(format!("{base}/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let err = api.list_sections().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));
    assert!(api.session().current_user().is_none());
    assert!(!state_dir.path().join("session.json").exists());
}

#[tokio::test]
async fn insufficient_role_surfaces_unauthorized_and_keeps_the_session() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "pupil", Role::Student).await;

    let err = api
        .create_section(&SectionDraft {
            name: "A".to_string(),
            capacity: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));

    // 403 is not a logout: the identity is intact and reads still work.
    assert!(api.session().current_user().is_some());
    api.list_sections().await.unwrap();
}

#[tokio::test]
async fn server_validation_messages_come_back_verbatim() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "head", Role::Admin).await;

    let err = api.register(&user_draft("head", Role::Teacher)).await.unwrap_err();
    match err {
        ClientError::Validation(message) => {
            assert_eq!(message, "Username already registered")
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn view_loads_join_all_or_nothing() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "head", Role::Admin).await;

    let year = api
        .create_school_year(&SchoolYearDraft {
            year: "2024-25".to_string(),
            start_date: "2024-04-01".to_string(),
            end_date: "2025-03-31".to_string(),
            is_current: true,
        })
        .await
        .unwrap();
    let class = api
        .create_class(&ClassDraft {
            name: "Class 1".to_string(),
            numeric: 1,
            school_year_id: year.id.clone(),
            sections: vec![],
        })
        .await
        .unwrap();
    api.create_subject(&SubjectDraft {
        name: "Maths".to_string(),
        code: "MTH".to_string(),
        class_id: class.id.clone(),
        teacher_id: Some("gone-teacher".to_string()),
        kind: SubjectKind::Mandatory,
    })
    .await
    .unwrap();

    let ViewState::Ready(classes_view) = load_classes_view(&api).await else {
        panic!("classes view should be ready");
    };
    assert_eq!(
        classes_view.row_label(&classes_view.classes[0]),
        "Class 1 / 1 / 2024-25"
    );

    let ViewState::Ready(subjects_view) = load_subjects_view(&api).await else {
        panic!("subjects view should be ready");
    };
    assert_eq!(
        subjects_view.teacher_label(subjects_view.subjects[0].teacher_id.as_deref()),
        NOT_ASSIGNED
    );
    assert_eq!(subjects_view.class_label(&class.id), "Class 1");

    let ViewState::Ready(teachers_view) = load_teachers_view(&api).await else {
        panic!("teachers view should be ready");
    };
    assert!(teachers_view.teachers.is_empty());
    assert!(teachers_view.teacher_users.is_empty());

    // Kill the token: every fan-out fetch fails, so the join fails whole.
    let token = api.session().current_user().unwrap().token;
    reqwest::Client::new()
        .post(format!("{base}/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(load_classes_view(&api).await.is_failed());
}

#[tokio::test]
async fn students_view_resolves_enrollment_references_with_fallbacks() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "head", Role::Admin).await;

    let year = api
        .create_school_year(&SchoolYearDraft {
            year: "2024-25".to_string(),
            start_date: "2024-04-01".to_string(),
            end_date: "2025-03-31".to_string(),
            is_current: true,
        })
        .await
        .unwrap();
    assert_eq!(api.current_school_year().await.unwrap().id, year.id);

    let section = api
        .create_section(&SectionDraft {
            name: "A".to_string(),
            capacity: Some(40),
        })
        .await
        .unwrap();
    let class = api
        .create_class(&ClassDraft {
            name: "Class 1".to_string(),
            numeric: 1,
            school_year_id: year.id.clone(),
            sections: vec![section.id.clone()],
        })
        .await
        .unwrap();
    let student = api
        .create_student(&StudentDraft {
            name: "First Pupil".to_string(),
            roll_no: "1".to_string(),
            class_id: class.id.clone(),
            section_id: section.id.clone(),
            school_year_id: year.id.clone(),
            ..StudentDraft::default()
        })
        .await
        .unwrap();
    assert_eq!(student.roll_no, "1");

    let ViewState::Ready(view) = load_students_view(&api).await else {
        panic!("students view should be ready");
    };
    assert_eq!(view.students.len(), 1);
    assert_eq!(view.class_name(&class.id), "Class 1");
    assert_eq!(view.section_name(&section.id), "A");
    assert_eq!(view.year_label(&year.id), "2024-25");
    // Stale references degrade to the sentinel instead of failing the row.
    assert_eq!(view.section_name("gone-section"), "N/A");
    assert_eq!(view.class_name("gone-class"), "N/A");
}

#[tokio::test]
async fn settings_parents_and_dashboard_flow_through_the_typed_client() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "head", Role::Admin).await;

    let saved = api
        .save_settings(&SettingsDraft {
            school_name: "Hillcrest High".to_string(),
            school_code: None,
            address: None,
            phone: None,
            email: None,
            currency: "USD".to_string(),
            currency_symbol: "$".to_string(),
            timezone: "UTC".to_string(),
            language: "en".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(saved.school_name, "Hillcrest High");
    assert_eq!(api.get_settings().await.unwrap().school_name, "Hillcrest High");

    api.create_parent(&ParentDraft {
        user_id: None,
        name: "Pat Doe".to_string(),
        phone: "555-0100".to_string(),
        email: None,
        address: None,
        occupation: None,
        student_ids: vec![],
    })
    .await
    .unwrap();
    assert_eq!(api.list_parents().await.unwrap().len(), 1);

    let stats = api.dashboard_stats().await.unwrap();
    assert_eq!(stats["total_parents"], 1);
    assert_eq!(stats["total_students"], 0);
}

#[tokio::test]
async fn photo_upload_returns_a_servable_url() {
    let (base, _guard) = spawn_app().await;
    let state_dir = tempfile::tempdir().unwrap();
    let api = signed_in_client(&base, state_dir.path(), "head", Role::Admin).await;

    let url = api
        .upload_photo("portrait.png", b"fake png bytes".to_vec())
        .await
        .unwrap();
    assert!(url.starts_with("/uploads/"));

    let teacher = api
        .create_teacher(&TeacherDraft {
            name: "Jane Doe".to_string(),
            photo: Some(url.clone()),
            ..TeacherDraft::default()
        })
        .await
        .unwrap();
    assert_eq!(teacher.photo.as_deref(), Some(url.as_str()));

    let response = reqwest::Client::new()
        .get(format!("{base}{url}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().to_vec(), b"fake png bytes");
}
