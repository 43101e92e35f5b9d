use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::error::{ClientError, ClientResult};
use crate::client::session::{Identity, Session};
use crate::db::models::{
    Class, ClassDraft, Credentials, Parent, ParentDraft, SchoolYear, SchoolYearDraft, Section,
    SectionDraft, Settings, SettingsDraft, Student, StudentDraft, Subject, SubjectDraft, Teacher,
    TeacherDraft, Token, User, UserDraft,
};
use crate::policy::Role;

/// Typed client over the REST surface. Every call attaches the session's
/// bearer token; the first 401 clears the stored session so the caller can
/// route back to the login boundary. Nothing is retried automatically.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        let base_url = base_url.into();
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // -- Auth --

    pub async fn login(&self, credentials: &Credentials) -> ClientResult<Identity> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(credentials)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let token: Token = self.decode(response).await?;

        let identity = Identity {
            id: token.user.id,
            username: token.user.username,
            name: token.user.name,
            role: token.user.role,
            token: token.access_token,
        };
        self.session.store(identity.clone());
        Ok(identity)
    }

    /// End the session. The local identity is destroyed even when the
    /// server round trip fails; a dangling server-side session just expires.
    pub async fn logout(&self) -> ClientResult<()> {
        if self.session.token().is_some() {
            let _ = self.authorized(self.http.post(self.url("/api/auth/logout"))).send().await;
        }
        self.session.clear();
        Ok(())
    }

    pub async fn register(&self, draft: &UserDraft) -> ClientResult<User> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(draft)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        self.decode(response).await
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.get_json("/api/auth/me").await
    }

    // -- School years --

    pub async fn list_school_years(&self) -> ClientResult<Vec<SchoolYear>> {
        self.get_json("/api/school-years").await
    }

    pub async fn current_school_year(&self) -> ClientResult<SchoolYear> {
        self.get_json("/api/school-years/current").await
    }

    pub async fn create_school_year(&self, draft: &SchoolYearDraft) -> ClientResult<SchoolYear> {
        self.post_json("/api/school-years", draft).await
    }

    // -- Sections --

    pub async fn list_sections(&self) -> ClientResult<Vec<Section>> {
        self.get_json("/api/sections").await
    }

    pub async fn create_section(&self, draft: &SectionDraft) -> ClientResult<Section> {
        self.post_json("/api/sections", draft).await
    }

    // -- Classes --

    pub async fn list_classes(&self, school_year_id: Option<&str>) -> ClientResult<Vec<Class>> {
        match school_year_id {
            Some(year_id) => {
                self.get_json(&format!("/api/classes?school_year_id={year_id}")).await
            }
            None => self.get_json("/api/classes").await,
        }
    }

    /// Create a class. The draft is validated here before any request is
    /// issued: an out-of-range grade numeric or a missing school year never
    /// reaches the network.
    pub async fn create_class(&self, draft: &ClassDraft) -> ClientResult<Class> {
        draft.validate().map_err(ClientError::Validation)?;
        self.post_json("/api/classes", draft).await
    }

    // -- Subjects --

    pub async fn list_subjects(&self, class_id: Option<&str>) -> ClientResult<Vec<Subject>> {
        match class_id {
            Some(class_id) => self.get_json(&format!("/api/subjects?class_id={class_id}")).await,
            None => self.get_json("/api/subjects").await,
        }
    }

    /// Create a subject. A class selection is required up front; the
    /// teacher reference is passed through as-is and may be stale by the
    /// time the server sees it.
    pub async fn create_subject(&self, draft: &SubjectDraft) -> ClientResult<Subject> {
        if draft.class_id.trim().is_empty() {
            return Err(ClientError::Validation("A class must be selected".into()));
        }
        self.post_json("/api/subjects", draft).await
    }

    // -- Teachers --

    pub async fn list_teachers(&self) -> ClientResult<Vec<Teacher>> {
        self.get_json("/api/teachers").await
    }

    pub async fn create_teacher(&self, draft: &TeacherDraft) -> ClientResult<Teacher> {
        if draft.name.trim().is_empty() {
            return Err(ClientError::Validation("Teacher name must not be empty".into()));
        }
        self.post_json("/api/teachers", draft).await
    }

    /// Upload a photo, returning its URL. Failures here are `Upload` errors
    /// so the surrounding form can proceed without a photo.
    pub async fn upload_photo(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<String> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .authorized(self.http.post(self.url("/api/upload")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(ClientError::Unauthenticated);
        }
        if !status.is_success() {
            let detail = detail_message(response).await
                .unwrap_or_else(|| format!("Server returned {status}"));
            return Err(ClientError::Upload(detail));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;
        body.get("url")
            .and_then(|url| url.as_str())
            .map(String::from)
            .ok_or_else(|| ClientError::Upload("Malformed upload response".into()))
    }

    // -- Users --

    pub async fn list_users(&self, role: Option<Role>) -> ClientResult<Vec<User>> {
        match role {
            Some(role) => self.get_json(&format!("/api/users?role={}", role.as_str())).await,
            None => self.get_json("/api/users").await,
        }
    }

    // -- Students --

    pub async fn list_students(&self, class_id: Option<&str>) -> ClientResult<Vec<Student>> {
        match class_id {
            Some(class_id) => self.get_json(&format!("/api/students?class_id={class_id}")).await,
            None => self.get_json("/api/students").await,
        }
    }

    pub async fn create_student(&self, draft: &StudentDraft) -> ClientResult<Student> {
        self.post_json("/api/students", draft).await
    }

    // -- Parents --

    pub async fn list_parents(&self) -> ClientResult<Vec<Parent>> {
        self.get_json("/api/parents").await
    }

    pub async fn create_parent(&self, draft: &ParentDraft) -> ClientResult<Parent> {
        self.post_json("/api/parents", draft).await
    }

    // -- Settings and dashboard --

    pub async fn get_settings(&self) -> ClientResult<Settings> {
        self.get_json("/api/settings").await
    }

    pub async fn save_settings(&self, draft: &SettingsDraft) -> ClientResult<Settings> {
        self.post_json("/api/settings", draft).await
    }

    pub async fn dashboard_stats(&self) -> ClientResult<serde_json::Value> {
        self.get_json("/api/dashboard/stats").await
    }

    // -- Plumbing --

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self
            .authorized(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        self.decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self
            .authorized(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        self.decode(response).await
    }

    /// Map a response to the error taxonomy. A 401 is the single trigger
    /// for dropping the stored session; a 403 leaves it intact.
    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClientError::Network(e.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(ClientError::Unauthenticated);
        }
        if status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized);
        }
        if status.is_client_error() {
            let detail = detail_message(response).await
                .unwrap_or_else(|| format!("Request failed with {status}"));
            return Err(ClientError::Validation(detail));
        }
        Err(ClientError::Network(format!("Server returned {status}")))
    }
}

/// Pull the `detail` field out of an error body, the shape every 4xx from
/// the service carries.
async fn detail_message(response: reqwest::Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("detail")?.as_str().map(String::from)
}
