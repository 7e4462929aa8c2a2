//! Directory endpoint URL builders

/// `GET /employers?name=`
pub fn employers_url(base_url: &str) -> String {
    format!("{}/employers", base_url.trim_end_matches('/'))
}

/// `GET /users`, `POST /users` and `DELETE /users`
pub fn users_url(base_url: &str) -> String {
    format!("{}/users", base_url.trim_end_matches('/'))
}

/// `GET /users/{id}` and `PATCH /users/{id}`
pub fn user_url(base_url: &str, id: &str) -> String {
    format!("{}/{}", users_url(base_url), id)
}
