//! Outgoing request description
//!
//! Requests are plain data so they can be replayed after a reconnect. The URL
//! never carries a query string; parameters live in `query` (GET) or `form`
//! (POST) so signers can see them.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a query parameter, replacing any existing value for `name`.
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.set_query(name, value);
        self
    }

    /// Add a form body parameter, replacing any existing value for `name`.
    pub fn form(mut self, name: &str, value: impl ToString) -> Self {
        set_param(&mut self.form, name, value.to_string());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn set_query(&mut self, name: &str, value: impl ToString) {
        set_param(&mut self.query, name, value.to_string());
    }

    /// Add a parameter to the part of the request that carries parameters
    /// for this method: query string for GET, form body otherwise.
    pub fn set_param(&mut self, name: &str, value: impl ToString) {
        if self.method == Method::GET {
            set_param(&mut self.query, name, value.to_string());
        } else {
            set_param(&mut self.form, name, value.to_string());
        }
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        find_param(&self.query, name)
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        find_param(&self.form, name)
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// All query and form parameters, in that order.
    pub fn signing_params(&self) -> Vec<(String, String)> {
        self.query.iter().chain(self.form.iter()).cloned().collect()
    }
}

fn set_param(params: &mut Vec<(String, String)>, name: &str, value: String) {
    match params.iter_mut().find(|(k, _)| k == name) {
        Some(existing) => existing.1 = value,
        None => params.push((name.to_string(), value)),
    }
}

fn find_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_replaces_existing_value() {
        let mut request = ApiRequest::get("https://api.twitter.com/1.1/search/tweets.json")
            .query("q", "rust")
            .query("count", 100);
        request.set_query("max_id", "102");
        request.set_query("max_id", "99");

        assert_eq!(request.query_value("q"), Some("rust"));
        assert_eq!(request.query_value("count"), Some("100"));
        assert_eq!(request.query_value("max_id"), Some("99"));
        assert_eq!(request.query.len(), 3);
    }

    #[test]
    fn set_param_targets_query_for_get_and_form_for_post() {
        let mut get = ApiRequest::get("https://example.test/a");
        get.set_param("tweet_mode", "extended");
        assert_eq!(get.query_value("tweet_mode"), Some("extended"));
        assert!(get.form.is_empty());

        let mut post = ApiRequest::post("https://example.test/b");
        post.set_param("tweet_mode", "extended");
        assert_eq!(post.form_value("tweet_mode"), Some("extended"));
        assert!(post.query.is_empty());
    }

    #[test]
    fn signing_params_include_query_and_form() {
        let request = ApiRequest::post("https://example.test/c")
            .query("a", "1")
            .form("b", "2");
        assert_eq!(
            request.signing_params(),
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
        );
        assert!(!request.is_get());
    }
}
