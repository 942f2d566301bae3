use crate::common::{Config, MaskLensError, Result};
use crate::core::password::validate_password;
use crate::service::protocol::{
    AdminDashboardResponse, AdminStatsResponse, CreateUserRequest, EmotionListResponse,
    EmotionRecord, ErrorEnvelope, LoginRequest, LoginResponse, RegisterRequest,
    ToggleMaskLogicResponse, UserListResponse, UserRecord, WeeklySummaryRaw,
};
use crate::storage::{Role, SessionStore};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Outcome of the privileged-endpoint probe, consumed by the
/// authorization guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Forbidden,
    Unauthorized,
    /// Transport failure or an unexpected status.
    Failed,
}

pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    store: SessionStore,
}

impl ApiClient {
    pub fn new(config: &Config, store: SessionStore) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("masklens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.server.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer_token(&self) -> Result<String> {
        self.store.token().ok_or(MaskLensError::Unauthenticated)
    }

    /// The one place a 401 is handled for every protected call: clear the
    /// session and report Unauthenticated so the caller re-routes to login.
    fn gate_unauthorized(&self, status: StatusCode) -> Result<()> {
        if status == StatusCode::UNAUTHORIZED {
            if let Err(e) = self.store.clear() {
                tracing::warn!("Failed to clear session after 401: {}", e);
            }
            return Err(MaskLensError::Unauthenticated);
        }
        Ok(())
    }

    fn gate(&self, status: StatusCode, body: &str) -> Result<()> {
        self.gate_unauthorized(status)?;
        if status == StatusCode::FORBIDDEN {
            return Err(MaskLensError::Forbidden);
        }
        if !status.is_success() {
            return Err(MaskLensError::InvalidResponse(
                ErrorEnvelope::message_or_status(body, status.as_u16()),
            ));
        }
        Ok(())
    }

    fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
        serde_json::from_str(body)
            .map_err(|e| MaskLensError::InvalidResponse(format!("Malformed body: {}", e)))
    }

    fn get_protected<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.bearer_token()?;
        let resp = self.http.get(self.url(path)).bearer_auth(&token).send()?;
        let status = resp.status();
        let body = resp.text()?;
        self.gate(status, &body)?;
        Self::parse_body(&body)
    }

    fn post_protected<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let token = self.bearer_token()?;
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&token)
            .json(body)
            .send()?;
        let status = resp.status();
        let text = resp.text()?;
        self.gate(status, &text)?;
        Self::parse_body(&text)
    }

    fn delete_protected(&self, path: &str) -> Result<()> {
        let token = self.bearer_token()?;
        let resp = self.http.delete(self.url(path)).bearer_auth(&token).send()?;
        let status = resp.status();
        let body = resp.text()?;
        self.gate(status, &body)
    }

    // ===== Accounts =====

    /// Self-registration. Field and password checks run before anything is
    /// sent; validation failures never reach the network.
    pub fn register(&self, fullname: &str, email: &str, password: &str) -> Result<()> {
        check_required(&[("fullname", fullname), ("email", email), ("password", password)])?;
        if let Some(violation) = validate_password(password) {
            return Err(MaskLensError::Validation(violation.to_string()));
        }

        let request = RegisterRequest {
            fullname: fullname.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        let resp = self.http.post(self.url("/register")).json(&request).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(MaskLensError::InvalidResponse(
                ErrorEnvelope::message_or_status(&body, status.as_u16()),
            ));
        }
        Ok(())
    }

    /// Login and persist the session token plus the display fields the
    /// server hands back.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        check_required(&[("email", email), ("password", password)])?;

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let resp = self.http.post(self.url("/login")).json(&request).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(MaskLensError::InvalidResponse(
                ErrorEnvelope::message_or_status(&body, status.as_u16()),
            ));
        }

        let login: LoginResponse = Self::parse_body(&body)?;
        let role = match login.role.as_deref() {
            Some("admin") => Some(Role::Admin),
            Some(_) => Some(Role::User),
            None => None,
        };
        self.store
            .set_session(&login.access_token, login.fullname.as_deref(), role)?;
        Ok(login)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()
    }

    // ===== Classification =====

    /// Upload a PNG snapshot to `/predict`. Returns the raw status and body
    /// for the response interpreter; only the 401 policy is applied here so
    /// error bodies still reach the interpreter intact.
    pub fn predict(&self, png: Vec<u8>) -> Result<(u16, String)> {
        let token = self.bearer_token()?;

        let part = Part::bytes(png)
            .file_name("captured_image.png")
            .mime_str("image/png")?;
        let form = Form::new().part("image", part);

        let resp = self
            .http
            .post(self.url("/predict"))
            .bearer_auth(&token)
            .multipart(form)
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        self.gate_unauthorized(status)?;
        Ok((status.as_u16(), body))
    }

    // ===== History =====

    pub fn my_emotions(&self) -> Result<Vec<EmotionRecord>> {
        let list: EmotionListResponse = self.get_protected("/my_emotions")?;
        Ok(list.emotions)
    }

    pub fn weekly_summary(&self) -> Result<WeeklySummaryRaw> {
        self.get_protected("/weekly_summary")
    }

    // ===== Admin =====

    /// Authenticated probe of the privileged dashboard endpoint. Never
    /// errors; every failure mode collapses into a `ProbeOutcome` for the
    /// guard to interpret.
    pub fn admin_probe(&self) -> ProbeOutcome {
        let token = match self.store.token() {
            Some(token) => token,
            None => return ProbeOutcome::Unauthorized,
        };

        let resp = self
            .http
            .get(self.url("/admin/dashboard"))
            .bearer_auth(&token)
            .send();

        match resp {
            Ok(resp) => match resp.status() {
                status if status.is_success() => ProbeOutcome::Success,
                StatusCode::FORBIDDEN => ProbeOutcome::Forbidden,
                StatusCode::UNAUTHORIZED => ProbeOutcome::Unauthorized,
                _ => ProbeOutcome::Failed,
            },
            Err(e) => {
                tracing::debug!("Admin probe transport failure: {}", e);
                ProbeOutcome::Failed
            }
        }
    }

    pub fn admin_dashboard(&self) -> Result<AdminDashboardResponse> {
        self.get_protected("/admin/dashboard")
    }

    pub fn admin_users(&self) -> Result<Vec<UserRecord>> {
        let list: UserListResponse = self.get_protected("/admin/users")?;
        Ok(list.users)
    }

    /// Admin-initiated user creation. Runs the exact same password policy
    /// as self-registration.
    pub fn admin_create_user(
        &self,
        fullname: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<()> {
        check_required(&[("fullname", fullname), ("email", email), ("password", password)])?;
        if let Some(violation) = validate_password(password) {
            return Err(MaskLensError::Validation(violation.to_string()));
        }

        let request = CreateUserRequest {
            fullname: fullname.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        };

        let _: serde_json::Value = self.post_protected("/admin/users/create", &request)?;
        Ok(())
    }

    pub fn admin_delete_user(&self, user_id: i64) -> Result<()> {
        self.delete_protected(&format!("/admin/users/{}", user_id))
    }

    pub fn admin_emotions(&self) -> Result<Vec<EmotionRecord>> {
        let list: EmotionListResponse = self.get_protected("/admin/emotions")?;
        Ok(list.emotions)
    }

    pub fn admin_delete_emotion(&self, emotion_id: i64) -> Result<()> {
        self.delete_protected(&format!("/admin/emotions/{}", emotion_id))
    }

    pub fn admin_stats(&self) -> Result<AdminStatsResponse> {
        self.get_protected("/admin/stats")
    }

    pub fn toggle_mask_logic(&self) -> Result<ToggleMaskLogicResponse> {
        let resp = self
            .http
            .post(self.url("/admin/toggle_mask_logic"))
            .bearer_auth(&self.bearer_token()?)
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        self.gate(status, &body)?;
        Self::parse_body(&body)
    }
}

fn check_required(fields: &[(&str, &str)]) -> Result<()> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(MaskLensError::Validation(format!("{} is required", name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn client_over_tempdir() -> (TempDir, ApiClient) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new_with_path(dir.path().to_path_buf()).unwrap();
        let client = ApiClient::new(&Config::default(), store).unwrap();
        (dir, client)
    }

    #[test]
    fn required_field_check_names_the_field() {
        let err = check_required(&[("email", "a@b.c"), ("password", "")]).unwrap_err();
        assert!(matches!(err, MaskLensError::Validation(msg) if msg == "password is required"));
    }

    #[test]
    fn unauthorized_reply_clears_the_session() {
        let (_dir, client) = client_over_tempdir();
        client.store().set_session("tok", None, None).unwrap();

        let err = client.gate(StatusCode::UNAUTHORIZED, "").unwrap_err();
        assert!(matches!(err, MaskLensError::Unauthenticated));
        assert!(client.store().token().is_none());
    }

    #[test]
    fn forbidden_reply_keeps_the_session() {
        let (_dir, client) = client_over_tempdir();
        client.store().set_session("tok", None, None).unwrap();

        let err = client.gate(StatusCode::FORBIDDEN, "").unwrap_err();
        assert!(matches!(err, MaskLensError::Forbidden));
        // Insufficient privilege is not an invalid credential; the
        // session survives.
        assert_eq!(client.store().token().as_deref(), Some("tok"));
    }
}
