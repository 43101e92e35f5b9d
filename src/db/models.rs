use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Deserializer, Serialize};

use crate::policy::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Column list matching `User::from_row`. The password hash is never selected.
pub const USER_COLUMNS: &str =
    "id, username, email, name, role, phone, address, photo, is_active, created_at, updated_at";

impl User {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            name: row.get(3)?,
            role: row.get(4)?,
            phone: row.get(5)?,
            address: row.get(6)?,
            photo: row.get(7)?,
            is_active: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

/// Registration payload. The password never appears on `User`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Login response: the bearer token plus the identity it was minted for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolYear {
    pub id: String,
    pub year: String,
    pub start_date: String,
    pub end_date: String,
    pub is_current: bool,
    pub created_at: String,
}

pub const SCHOOL_YEAR_COLUMNS: &str = "id, year, start_date, end_date, is_current, created_at";

impl SchoolYear {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(SchoolYear {
            id: row.get(0)?,
            year: row.get(1)?,
            start_date: row.get(2)?,
            end_date: row.get(3)?,
            is_current: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolYearDraft {
    pub year: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub capacity: Option<u32>,
    pub created_at: String,
}

pub const SECTION_COLUMNS: &str = "id, name, capacity, created_at";

impl Section {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Section {
            id: row.get(0)?,
            name: row.get(1)?,
            capacity: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDraft {
    pub name: String,
    #[serde(default, deserialize_with = "capacity_field")]
    pub capacity: Option<u32>,
}

/// Capacity arrives from forms either as a number or as a text field, and
/// an empty text field means "no capacity", not zero.
fn capacity_field<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse().map(Some).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub numeric: i64,
    pub school_year_id: String,
    pub sections: Vec<String>,
    pub created_at: String,
}

/// Columns matching `Class::from_row`. Section ids come from the
/// `class_sections` join and are filled in by the caller.
pub const CLASS_COLUMNS: &str = "id, name, numeric, school_year_id, created_at";

impl Class {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Class {
            id: row.get(0)?,
            name: row.get(1)?,
            numeric: row.get(2)?,
            school_year_id: row.get(3)?,
            sections: Vec::new(),
            created_at: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDraft {
    pub name: String,
    pub numeric: i64,
    pub school_year_id: String,
    #[serde(default)]
    pub sections: Vec<String>,
}

impl ClassDraft {
    /// Range and reference checks that run before any insert, and in the
    /// resource client before any network call.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Class name must not be empty".to_string());
        }
        if !(1..=12).contains(&self.numeric) {
            return Err(format!(
                "Class numeric must be between 1 and 12, got {}",
                self.numeric
            ));
        }
        if self.school_year_id.trim().is_empty() {
            return Err("A school year must be selected".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    #[default]
    Mandatory,
    Optional,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Mandatory => "mandatory",
            SubjectKind::Optional => "optional",
        }
    }
}

impl ToSql for SubjectKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for SubjectKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "mandatory" => Ok(SubjectKind::Mandatory),
            "optional" => Ok(SubjectKind::Optional),
            other => Err(FromSqlError::Other(
                format!("unknown subject type: {other}").into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: String,
    pub class_id: String,
    pub teacher_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: SubjectKind,
    pub created_at: String,
}

pub const SUBJECT_COLUMNS: &str = "id, name, code, class_id, teacher_id, type, created_at";

impl Subject {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subject {
            id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            class_id: row.get(3)?,
            teacher_id: row.get(4)?,
            kind: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectDraft {
    pub name: String,
    pub code: String,
    pub class_id: String,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: SubjectKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl ToSql for Gender {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Gender {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            s => Err(FromSqlError::Other(format!("unknown gender: {s}").into())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub designation: Option<String>,
    pub qualification: Option<String>,
    pub gender: Option<Gender>,
    pub dob: Option<String>,
    pub joining_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub salary: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

pub const TEACHER_COLUMNS: &str = "id, user_id, name, designation, qualification, gender, dob, \
     joining_date, phone, email, address, photo, salary, created_at, updated_at";

impl Teacher {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Teacher {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            designation: row.get(3)?,
            qualification: row.get(4)?,
            gender: row.get(5)?,
            dob: row.get(6)?,
            joining_date: row.get(7)?,
            phone: row.get(8)?,
            email: row.get(9)?,
            address: row.get(10)?,
            photo: row.get(11)?,
            salary: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeacherDraft {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub joining_date: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub salary: Option<f64>,
}

impl TeacherDraft {
    /// Copy name/email/phone from a selected user into the draft. This is a
    /// one-shot transform at selection time, not a live binding: later edits
    /// to the user do not flow back, and later manual edits to the draft
    /// survive until the next selection. Selecting again (even the same
    /// user) reseeds and overwrites those three fields.
    pub fn seed_from_user(&mut self, user: &User) {
        self.user_id = Some(user.id.clone());
        self.name = user.name.clone();
        self.email = Some(user.email.clone());
        self.phone = user.phone.clone();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub roll_no: String,
    pub class_id: String,
    pub section_id: String,
    pub school_year_id: String,
    pub gender: Option<Gender>,
    pub dob: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub admission_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub const STUDENT_COLUMNS: &str = "id, user_id, name, roll_no, class_id, section_id, \
     school_year_id, gender, dob, email, phone, address, photo, guardian_name, guardian_phone, \
     admission_date, created_at, updated_at";

impl Student {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Student {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            roll_no: row.get(3)?,
            class_id: row.get(4)?,
            section_id: row.get(5)?,
            school_year_id: row.get(6)?,
            gender: row.get(7)?,
            dob: row.get(8)?,
            email: row.get(9)?,
            phone: row.get(10)?,
            address: row.get(11)?,
            photo: row.get(12)?,
            guardian_name: row.get(13)?,
            guardian_phone: row.get(14)?,
            admission_date: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentDraft {
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    pub roll_no: String,
    pub class_id: String,
    pub section_id: String,
    pub school_year_id: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub admission_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub occupation: Option<String>,
    pub student_ids: Vec<String>,
    pub created_at: String,
}

pub const PARENT_COLUMNS: &str =
    "id, user_id, name, phone, email, address, occupation, student_ids, created_at";

impl Parent {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let student_ids: String = row.get(7)?;
        Ok(Parent {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            address: row.get(5)?,
            occupation: row.get(6)?,
            student_ids: serde_json::from_str(&student_ids).unwrap_or_default(),
            created_at: row.get(8)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentDraft {
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub student_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: String,
    pub school_name: String,
    pub school_code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub currency: String,
    pub currency_symbol: String,
    pub timezone: String,
    pub language: String,
    pub updated_at: String,
}

pub const SETTINGS_COLUMNS: &str = "id, school_name, school_code, address, phone, email, \
     currency, currency_symbol, timezone, language, updated_at";

impl Settings {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Settings {
            id: row.get(0)?,
            school_name: row.get(1)?,
            school_code: row.get(2)?,
            address: row.get(3)?,
            phone: row.get(4)?,
            email: row.get(5)?,
            currency: row.get(6)?,
            currency_symbol: row.get(7)?,
            timezone: row.get(8)?,
            language: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDraft {
    pub school_name: String,
    #[serde(default)]
    pub school_code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_capacity_is_absent_not_zero() {
        let draft: SectionDraft = serde_json::from_str(r#"{"name":"A","capacity":""}"#).unwrap();
        assert_eq!(draft.capacity, None);
    }

    #[test]
    fn numeric_capacity_survives() {
        let draft: SectionDraft = serde_json::from_str(r#"{"name":"A","capacity":40}"#).unwrap();
        assert_eq!(draft.capacity, Some(40));
    }

    #[test]
    fn string_capacity_is_parsed() {
        let draft: SectionDraft = serde_json::from_str(r#"{"name":"A","capacity":"25"}"#).unwrap();
        assert_eq!(draft.capacity, Some(25));
    }

    #[test]
    fn missing_capacity_is_absent() {
        let draft: SectionDraft = serde_json::from_str(r#"{"name":"A"}"#).unwrap();
        assert_eq!(draft.capacity, None);
    }

    fn class_draft(numeric: i64, school_year_id: &str) -> ClassDraft {
        ClassDraft {
            name: "Class 5".into(),
            numeric,
            school_year_id: school_year_id.into(),
            sections: vec![],
        }
    }

    #[test]
    fn class_numeric_must_be_within_grade_range() {
        assert!(class_draft(1, "y1").validate().is_ok());
        assert!(class_draft(12, "y1").validate().is_ok());
        assert!(class_draft(0, "y1").validate().is_err());
        assert!(class_draft(13, "y1").validate().is_err());
    }

    #[test]
    fn class_requires_a_school_year_selection() {
        assert!(class_draft(5, "").validate().is_err());
        assert!(class_draft(5, "  ").validate().is_err());
    }

    #[test]
    fn subject_kind_defaults_to_mandatory() {
        let draft: SubjectDraft =
            serde_json::from_str(r#"{"name":"Maths","code":"MTH","class_id":"c1"}"#).unwrap();
        assert_eq!(draft.kind, SubjectKind::Mandatory);
    }

    #[test]
    fn subject_kind_serializes_as_type() {
        let subject = Subject {
            id: "s1".into(),
            name: "Maths".into(),
            code: "MTH".into(),
            class_id: "c1".into(),
            teacher_id: None,
            kind: SubjectKind::Optional,
            created_at: "2024-01-01".into(),
        };
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json["type"], "optional");
    }

    fn sample_user() -> User {
        User {
            id: "u1".into(),
            username: "jdoe".into(),
            email: "jdoe@school.example".into(),
            name: "Jane Doe".into(),
            role: Role::Teacher,
            phone: Some("555-0101".into()),
            address: None,
            photo: None,
            is_active: true,
            created_at: "2024-01-01".into(),
            updated_at: "2024-01-01".into(),
        }
    }

    #[test]
    fn seed_copies_name_email_phone_once() {
        let user = sample_user();
        let mut draft = TeacherDraft::default();
        draft.seed_from_user(&user);

        assert_eq!(draft.user_id.as_deref(), Some("u1"));
        assert_eq!(draft.name, "Jane Doe");
        assert_eq!(draft.email.as_deref(), Some("jdoe@school.example"));
        assert_eq!(draft.phone.as_deref(), Some("555-0101"));
    }

    #[test]
    fn manual_edits_survive_until_next_selection() {
        let user = sample_user();
        let mut draft = TeacherDraft::default();
        draft.seed_from_user(&user);

        // Seeding is not a live binding: edits stick.
        draft.name = "J. Doe, M.Ed.".to_string();
        draft.phone = Some("555-9999".into());
        assert_eq!(draft.name, "J. Doe, M.Ed.");
        assert_eq!(draft.phone.as_deref(), Some("555-9999"));
    }

    #[test]
    fn reselecting_reseeds_and_overwrites_edits() {
        let user = sample_user();
        let mut draft = TeacherDraft::default();
        draft.seed_from_user(&user);
        draft.name = "J. Doe, M.Ed.".to_string();

        // Selecting the same user again overwrites the edited fields.
        draft.seed_from_user(&user);
        assert_eq!(draft.name, "Jane Doe");
        assert_eq!(draft.phone.as_deref(), Some("555-0101"));
    }
}
