use std::str::FromStr;

use crate::{ApiResponseOrError, Credentials, OpenAiError};
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    multipart::Form,
    Client, Method, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Clone)]
pub struct OpenAiClient {
    credentials: Credentials,
    client: Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenAiClient({})", self.credentials.base_url())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiErrorWrapper {
    error: OpenAiError,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Empty {}

/// Sort order for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

/// Query for a single page of a list endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListQuery {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl ListQuery {
    pub fn newest(limit: u32) -> Self {
        Self {
            order: Order::Desc,
            limit: Some(limit),
            after: None,
        }
    }
}

impl OpenAiClient {
    pub fn new(credentials: Credentials) -> ApiResponseOrError<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", credentials.api_key()))
                .map_err(|e| OpenAiError::new(e.to_string(), "config".to_string()))?,
        );
        headers.insert(
            HeaderName::from_str("OpenAI-Beta")
                .map_err(|e| OpenAiError::new(e.to_string(), "config".to_string()))?,
            HeaderValue::from_static("assistants=v2"),
        );
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            credentials,
            client,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.credentials.base_url(), route)
    }

    async fn request_inner<S>(
        &self,
        method: Method,
        route: &str,
        query: Option<&ListQuery>,
        body: Option<S>,
    ) -> Result<Response, reqwest::Error>
    where
        S: Serialize,
    {
        let url = self.url(route);
        tracing::debug!("OpenAI Request[{}] {}", method, url);

        let mut request = self.client.request(method.clone(), url.clone());

        if let Some(query) = query {
            request = request.query(query);
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;

        tracing::debug!(
            "OpenAI Response[{}] {} {url}",
            method,
            response.status().as_str()
        );
        Ok(response)
    }

    async fn decode<T>(response: Response) -> ApiResponseOrError<T>
    where
        T: DeserializeOwned,
    {
        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }
        Err(Self::decode_error(response).await)
    }

    async fn decode_error(response: Response) -> OpenAiError {
        let status = response.status();
        let result = match response.text().await {
            Ok(text) => text,
            Err(e) => return e.into(),
        };
        if let Ok(api_response) = serde_json::from_str::<OpenAiErrorWrapper>(&result) {
            api_response.error
        } else if result.is_empty() {
            OpenAiError::new(status.to_string(), "unknown".to_string())
        } else {
            OpenAiError::new(result, "unknown".to_string())
        }
    }

    pub async fn request<S, R, T>(
        &self,
        method: Method,
        route: R,
        body: Option<S>,
    ) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        S: Serialize,
        T: DeserializeOwned,
    {
        let response = self.request_inner(method, route.as_ref(), None, body).await?;
        Self::decode(response).await
    }

    pub async fn get<R, T>(&self, route: R) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        T: DeserializeOwned,
    {
        self.request::<(), R, T>(Method::GET, route, None).await
    }

    pub async fn post<S, R, T>(&self, route: R, body: S) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        S: Serialize,
        T: DeserializeOwned,
    {
        self.request(Method::POST, route, Some(body)).await
    }

    /// Posts a JSON body and returns the raw response bytes, for endpoints
    /// that answer with binary payloads such as synthesized audio.
    pub async fn post_raw<S, R>(&self, route: R, body: S) -> ApiResponseOrError<Bytes>
    where
        R: AsRef<str>,
        S: Serialize,
    {
        let response = self
            .request_inner(Method::POST, route.as_ref(), None, Some(body))
            .await?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        Ok(response.bytes().await?)
    }

    pub async fn post_multipart<R, T>(&self, route: R, form: Form) -> ApiResponseOrError<T>
    where
        R: AsRef<str>,
        T: DeserializeOwned,
    {
        let url = self.url(route.as_ref());
        tracing::debug!("OpenAI Request[POST multipart] {}", url);

        let response = self.client.post(url.clone()).multipart(form).send().await?;

        tracing::debug!(
            "OpenAI Response[POST multipart] {} {url}",
            response.status().as_str()
        );
        Self::decode(response).await
    }

    pub async fn delete<R>(&self, route: R) -> ApiResponseOrError<Empty>
    where
        R: AsRef<str>,
    {
        self.request::<(), R, Empty>(Method::DELETE, route, None)
            .await
    }

    /// Fetches one page of a list endpoint. Pagination beyond the page is
    /// left to the caller.
    pub async fn list_page<R, T>(&self, route: R, query: &ListQuery) -> ApiResponseOrError<List<T>>
    where
        R: AsRef<str>,
        T: DeserializeOwned,
    {
        let response = self
            .request_inner::<()>(Method::GET, route.as_ref(), Some(query), None)
            .await?;
        Self::decode(response).await
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct List<T> {
    pub first_id: Option<String>,
    pub last_id: Option<String>,
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}
