//! Typed access to the back office REST endpoints.
//!
//! Every call goes through `SessionManager::authenticated_request`, so an
//! expired token anywhere ends the session in one place. Bodies are returned
//! as JSON values; the console renders them as-is.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::multipart::Form;
use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::request::RequestOptions;
use super::ApiError;
use crate::auth::SessionManager;
use crate::models::{ProfileUpdate, Resource, UserProfile};

const DASHBOARD_SUMMARY_PATH: &str = "/api/admin/dashboard/summary";
const RECENT_ORDERS_PATH: &str = "/api/admin/dashboard/recent_orders";
const SALES_DATA_PATH: &str = "/api/admin/dashboard/sales_data";
const ORDERS_DATA_PATH: &str = "/api/admin/dashboard/orders_data";
const REPORTS_PATH: &str = "/api/admin/reports";
const SITE_USER_STATUS_PATH: &str = "/api/admin/update_siteuser_status";

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    user: UserProfile,
}

/// Dashboard widgets, fetched together
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub summary: Value,
    pub recent_orders: Value,
    pub sales: Value,
    pub orders: Value,
}

/// Admin API on top of a session.
/// Clone is cheap - the session manager is shared.
#[derive(Clone)]
pub struct AdminApi {
    session: SessionManager,
}

impl AdminApi {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Return the response if successful, or an error carrying its body
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn request(&self, path: &str, options: RequestOptions) -> Result<Value> {
        let method = options.method.clone();
        let response = self.session.authenticated_request(path, options).await?;
        let response = Self::check_response(response).await?;

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", path))?;
        debug!(%method, path, bytes = text.len(), "Response received");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    /// GET any backend path (or absolute URL) and decode the JSON body
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(path, RequestOptions::get()).await
    }

    // ===== Records =====

    pub async fn list(&self, resource: Resource) -> Result<Value> {
        self.get(resource.collection_path()).await
    }

    pub async fn show(&self, resource: Resource, id: i64) -> Result<Value> {
        self.get(&resource.record_path(id)).await
    }

    pub async fn create(&self, resource: Resource, body: Value) -> Result<Value> {
        self.request(resource.collection_path(), RequestOptions::post().json(body))
            .await
    }

    /// Create a record with file uploads (product or category images)
    pub async fn create_with_files(&self, resource: Resource, form: Form) -> Result<Value> {
        Self::ensure_uploads(resource)?;
        self.request(resource.collection_path(), RequestOptions::post().multipart(form))
            .await
    }

    pub async fn update(&self, resource: Resource, id: i64, body: Value) -> Result<Value> {
        self.request(&resource.update_path(id), RequestOptions::put().json(body))
            .await
    }

    /// Update a record with file uploads. Multipart bodies cannot be sent
    /// with PUT, so the form is POSTed with a `_method=PUT` override.
    pub async fn update_with_files(
        &self,
        resource: Resource,
        id: i64,
        form: Form,
    ) -> Result<Value> {
        Self::ensure_uploads(resource)?;
        let form = form.text("_method", "PUT");
        self.request(&resource.update_path(id), RequestOptions::post().multipart(form))
            .await
    }

    fn ensure_uploads(resource: Resource) -> Result<()> {
        anyhow::ensure!(
            resource.uploads_files(),
            "{} records do not accept file uploads",
            resource.title()
        );
        Ok(())
    }

    pub async fn delete(&self, resource: Resource, id: i64) -> Result<Value> {
        self.request(&resource.delete_path(id), RequestOptions::delete())
            .await
    }

    /// Activate or block a storefront user
    pub async fn set_site_user_status(&self, id: i64, status: &str) -> Result<Value> {
        let path = format!("{}/{}", SITE_USER_STATUS_PATH, id);
        self.request(&path, RequestOptions::put().json(serde_json::json!({ "status": status })))
            .await
    }

    // ===== Dashboard & reports =====

    pub async fn dashboard_summary(&self) -> Result<Value> {
        self.get(DASHBOARD_SUMMARY_PATH).await
    }

    pub async fn recent_orders(&self) -> Result<Value> {
        self.get(RECENT_ORDERS_PATH).await
    }

    pub async fn sales_data(&self) -> Result<Value> {
        self.get(SALES_DATA_PATH).await
    }

    pub async fn orders_data(&self) -> Result<Value> {
        self.get(ORDERS_DATA_PATH).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let (summary, recent_orders, sales, orders) = futures::try_join!(
            self.dashboard_summary(),
            self.recent_orders(),
            self.sales_data(),
            self.orders_data(),
        )?;
        Ok(Dashboard {
            summary,
            recent_orders,
            sales,
            orders,
        })
    }

    /// Sales report, optionally limited to an inclusive date range
    pub async fn sales_report(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<Value> {
        self.get(&Self::report_path(range)).await
    }

    fn report_path(range: Option<(NaiveDate, NaiveDate)>) -> String {
        match range {
            Some((start, end)) => format!(
                "{}?start_date={}&end_date={}",
                REPORTS_PATH,
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            None => REPORTS_PATH.to_string(),
        }
    }

    // ===== Profile =====

    pub async fn profile(&self) -> Result<Value> {
        let path = self.session.settings().profile_path.clone();
        self.get(&path).await
    }

    /// Save the signed-in admin's profile and refresh the cached copy
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let path = self.session.settings().profile_update_path.clone();
        let body = serde_json::to_value(update).context("Failed to serialize profile update")?;
        let value = self.request(&path, RequestOptions::put().json(body)).await?;

        let parsed: ProfileResponse =
            serde_json::from_value(value).context("Failed to parse profile update response")?;
        self.session
            .set_user(Some(parsed.user.clone()))
            .context("Failed to store updated profile")?;
        Ok(parsed.user)
    }
}
