use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt;

use crate::auth::basic_auth_header;
use crate::cli_utils;

#[derive(Debug)]
pub struct HttpError {
    status: u16,
    message: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl Error for HttpError {}

/// Client for the animal tracking API. Sends Basic credentials with every
/// request once they are attached.
pub struct ChiptrackClient {
    client: Client,
    base_url: String,
    authorization: Option<String>,
}

impl ChiptrackClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            authorization: None,
        }
    }

    /// Attaches Basic credentials to every subsequent request.
    pub fn with_credentials(mut self, email: &str, password: &str) -> Self {
        self.authorization = Some(basic_auth_header(email, password));
        self
    }

    /// Constructs a full API URL from a path
    pub fn api_url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.authorization {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }

    /// Makes a GET request and handles the response
    pub async fn get<T>(&self, path: &str) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let url = self.api_url(path);
        let response = self.request(Method::GET, &url).send().await?;
        self.handle_response(response).await
    }

    /// Makes a POST request with JSON body and handles the response
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Box<dyn Error>>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let url = self.api_url(path);
        let response = self.request(Method::POST, &url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// Makes a POST request without body and handles the response
    pub async fn post_empty<T>(&self, path: &str) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let url = self.api_url(path);
        let response = self.request(Method::POST, &url).send().await?;
        self.handle_response(response).await
    }

    /// Makes a PUT request with JSON body and handles the response
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Box<dyn Error>>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let url = self.api_url(path);
        let response = self.request(Method::PUT, &url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// Makes a DELETE request and handles the response (no body expected)
    pub async fn delete(&self, path: &str) -> Result<(), Box<dyn Error>> {
        let url = self.api_url(path);
        let response = self.request(Method::DELETE, &url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Box::new(error_from(response).await))
        }
    }

    /// Handles HTTP response, deserializing success or returning error
    async fn handle_response<T>(&self, response: Response) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Box::new(error_from(response).await))
        }
    }
}

/// Extracts the server's `msg` field when the error body is structured,
/// falling back to the raw body.
async fn error_from(response: Response) -> HttpError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("msg")
                .and_then(|msg| msg.as_str())
                .map(String::from)
        })
        .unwrap_or(body);
    let message = if message.is_empty() {
        "No error details".to_string()
    } else {
        message
    };
    HttpError { status, message }
}

/// Execute an HTTP operation and exit on error with formatted message
pub async fn execute_or_exit<T, F, Fut>(operation: F, context: &str) -> T
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, Box<dyn Error>>>,
{
    match operation().await {
        Ok(result) => result,
        Err(e) => cli_utils::exit_with_error(&format!("{}: {}", context, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_joins_at_the_root() {
        let client = ChiptrackClient::new("http://localhost:8080".to_string());
        assert_eq!(
            client.api_url("/accounts/1"),
            "http://localhost:8080/accounts/1"
        );
        assert_eq!(
            client.api_url("registration"),
            "http://localhost:8080/registration"
        );
    }

    #[test]
    fn api_url_tolerates_trailing_slash_in_base() {
        let client = ChiptrackClient::new("http://localhost:8080/".to_string());
        assert_eq!(client.api_url("animals"), "http://localhost:8080/animals");
    }
}
