//! HTTP client for the User Directory

use async_trait::async_trait;
use enroll_common::{EnrollError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::{
    endpoints, transport_error, CreateUserRequest, DeleteUsersRequest, DirectoryUser,
    UpdateUserRequest, UserDirectory, UserQuery,
};

pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    #[tracing::instrument(skip(self))]
    async fn find_users(&self, query: &UserQuery) -> Result<Vec<DirectoryUser>> {
        let mut params = Vec::new();
        if let Some(ref email) = query.email {
            params.push(("email", email.as_str()));
        }
        if let Some(ref employer_id) = query.employer_id {
            params.push(("employer_id", employer_id.as_str()));
        }

        self.client
            .get(endpoints::users_url(&self.base_url))
            .query(&params)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transport_error)?
            .json()
            .await
            .map_err(transport_error)
    }

    #[tracing::instrument(skip(self))]
    async fn get_user(&self, id: &str) -> Result<DirectoryUser> {
        let response = self
            .client
            .get(endpoints::user_url(&self.base_url, id))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(EnrollError::NotFound(format!("User '{}' was not found.", id)));
        }

        response
            .error_for_status()
            .map_err(transport_error)?
            .json()
            .await
            .map_err(transport_error)
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email, access_type = ?request.access_type))]
    async fn create_user(&self, request: &CreateUserRequest) -> Result<bool> {
        self.client
            .post(endpoints::users_url(&self.base_url))
            .json(request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transport_error)?;

        Ok(true)
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.id))]
    async fn update_user(&self, request: &UpdateUserRequest) -> Result<bool> {
        self.client
            .patch(endpoints::user_url(&self.base_url, &request.id))
            .json(&request.fields)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transport_error)?;

        Ok(true)
    }

    #[tracing::instrument(skip(self, request), fields(employer_id = %request.employer_id, kept = request.ids.len()))]
    async fn delete_users(&self, request: &DeleteUsersRequest) -> Result<bool> {
        self.client
            .delete(endpoints::users_url(&self.base_url))
            .json(request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transport_error)?;

        Ok(true)
    }
}
