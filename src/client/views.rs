//! Loading and submission state machines for the management screens.
//!
//! Each screen's data is a fixed fan-out of concurrent fetches joined
//! all-or-nothing: the view stays in `Loading` until every fetch settles,
//! and a single failure yields `Failed` rather than partial data. Display
//! lookups degrade to sentinels instead of failing when a reference does
//! not resolve against the loaded data.

use crate::client::error::ClientResult;
use crate::client::resources::ApiClient;
use crate::db::models::{Class, SchoolYear, Section, Student, Subject, Teacher, User};
use crate::policy::Role;

/// Rendered when a class's school year no longer resolves.
pub const NOT_AVAILABLE: &str = "N/A";
/// Rendered when a subject's teacher reference no longer resolves.
pub const NOT_ASSIGNED: &str = "Not Assigned";

/// Terminal states of a management view's load phase.
#[derive(Debug)]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ViewState::Failed(_))
    }
}

fn settle<T>(result: ClientResult<T>) -> ViewState<T> {
    match result {
        Ok(data) => ViewState::Ready(data),
        Err(e) => ViewState::Failed(e.to_string()),
    }
}

// -- Classes screen --

#[derive(Debug, Clone)]
pub struct ClassesViewData {
    pub classes: Vec<Class>,
    pub sections: Vec<Section>,
    pub school_years: Vec<SchoolYear>,
}

impl ClassesViewData {
    /// The year label for a class row, or "N/A" when the referenced school
    /// year is not among the loaded ones.
    pub fn year_label(&self, school_year_id: &str) -> &str {
        self.school_years
            .iter()
            .find(|year| year.id == school_year_id)
            .map(|year| year.year.as_str())
            .unwrap_or(NOT_AVAILABLE)
    }

    pub fn section_name(&self, section_id: &str) -> &str {
        self.sections
            .iter()
            .find(|section| section.id == section_id)
            .map(|section| section.name.as_str())
            .unwrap_or(NOT_AVAILABLE)
    }

    /// One table row: name, grade numeric, year label.
    pub fn row_label(&self, class: &Class) -> String {
        format!(
            "{} / {} / {}",
            class.name,
            class.numeric,
            self.year_label(&class.school_year_id)
        )
    }
}

pub async fn load_classes_view(api: &ApiClient) -> ViewState<ClassesViewData> {
    settle(
        tokio::try_join!(
            api.list_classes(None),
            api.list_sections(),
            api.list_school_years(),
        )
        .map(|(classes, sections, school_years)| ClassesViewData {
            classes,
            sections,
            school_years,
        }),
    )
}

// -- Subjects screen --

#[derive(Debug, Clone)]
pub struct SubjectsViewData {
    pub subjects: Vec<Subject>,
    pub classes: Vec<Class>,
    pub teachers: Vec<Teacher>,
}

impl SubjectsViewData {
    /// The teacher column for a subject row. A stale or absent reference
    /// renders "Not Assigned"; it never fails.
    pub fn teacher_label(&self, teacher_id: Option<&str>) -> &str {
        teacher_id
            .and_then(|id| self.teachers.iter().find(|teacher| teacher.id == id))
            .map(|teacher| teacher.name.as_str())
            .unwrap_or(NOT_ASSIGNED)
    }

    pub fn class_label(&self, class_id: &str) -> &str {
        self.classes
            .iter()
            .find(|class| class.id == class_id)
            .map(|class| class.name.as_str())
            .unwrap_or(NOT_AVAILABLE)
    }

    /// Subjects under the active class filter. A filter key that no longer
    /// matches a loaded class degrades to showing everything, so a removed
    /// class never silently orphans subjects.
    pub fn visible_subjects(&self, class_filter: Option<&str>) -> Vec<&Subject> {
        match class_filter {
            Some(class_id) if self.classes.iter().any(|class| class.id == class_id) => self
                .subjects
                .iter()
                .filter(|subject| subject.class_id == class_id)
                .collect(),
            _ => self.subjects.iter().collect(),
        }
    }
}

pub async fn load_subjects_view(api: &ApiClient) -> ViewState<SubjectsViewData> {
    settle(
        tokio::try_join!(
            api.list_subjects(None),
            api.list_classes(None),
            api.list_teachers(),
        )
        .map(|(subjects, classes, teachers)| SubjectsViewData {
            subjects,
            classes,
            teachers,
        }),
    )
}

// -- Teachers screen --

#[derive(Debug, Clone)]
pub struct TeachersViewData {
    pub teachers: Vec<Teacher>,
    /// Teacher-role users offered by the "link a login" selector.
    pub teacher_users: Vec<User>,
}

pub async fn load_teachers_view(api: &ApiClient) -> ViewState<TeachersViewData> {
    settle(
        tokio::try_join!(api.list_teachers(), api.list_users(Some(Role::Teacher)))
            .map(|(teachers, teacher_users)| TeachersViewData {
                teachers,
                teacher_users,
            }),
    )
}

// -- Students screen --

#[derive(Debug, Clone)]
pub struct StudentsViewData {
    pub students: Vec<Student>,
    pub classes: Vec<Class>,
    pub sections: Vec<Section>,
    pub school_years: Vec<SchoolYear>,
}

impl StudentsViewData {
    pub fn class_name(&self, class_id: &str) -> &str {
        self.classes
            .iter()
            .find(|class| class.id == class_id)
            .map(|class| class.name.as_str())
            .unwrap_or(NOT_AVAILABLE)
    }

    pub fn section_name(&self, section_id: &str) -> &str {
        self.sections
            .iter()
            .find(|section| section.id == section_id)
            .map(|section| section.name.as_str())
            .unwrap_or(NOT_AVAILABLE)
    }

    pub fn year_label(&self, school_year_id: &str) -> &str {
        self.school_years
            .iter()
            .find(|year| year.id == school_year_id)
            .map(|year| year.year.as_str())
            .unwrap_or(NOT_AVAILABLE)
    }
}

pub async fn load_students_view(api: &ApiClient) -> ViewState<StudentsViewData> {
    settle(
        tokio::try_join!(
            api.list_students(None),
            api.list_classes(None),
            api.list_sections(),
            api.list_school_years(),
        )
        .map(|(students, classes, sections, school_years)| StudentsViewData {
            students,
            classes,
            sections,
            school_years,
        }),
    )
}

// -- Submission guard --

/// One in-flight submission per form instance. `begin` refuses while a
/// submission is outstanding; the form re-enables the action on `finish`
/// whether the submission succeeded or not.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    in_flight: bool,
}

impl SubmitGuard {
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}
