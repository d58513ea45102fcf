use std::any::Any;
use std::collections::BTreeMap;

use serde::Serialize;

use super::EventInterface;

pub const HTTP_INTERFACE: &str = "sentry.interfaces.Http";

/// The HTTP request being served when the event occurred.
///
/// Populated by a builder helper; the core never captures requests itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HttpInterface {
    url: String,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_string: Option<String>,
    cookies: BTreeMap<String, String>,
    headers: BTreeMap<String, Vec<String>>,
    data: BTreeMap<String, Vec<String>>,
    env: BTreeMap<String, String>,
}

impl HttpInterface {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a header value; repeated headers keep every value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Add a form parameter value.
    #[must_use]
    pub fn with_data(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.entry(name.into()).or_default().push(value.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn headers(&self) -> &BTreeMap<String, Vec<String>> {
        &self.headers
    }

    pub fn data(&self) -> &BTreeMap<String, Vec<String>> {
        &self.data
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

impl EventInterface for HttpInterface {
    fn interface_name(&self) -> &'static str {
        HTTP_INTERFACE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
