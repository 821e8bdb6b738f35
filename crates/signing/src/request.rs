use std::collections::HashMap;

use http::Method;
use serde::Serialize;

use crate::error::{Result, SigningError};

/// Read-only description of an outgoing request, as handed over by the
/// transport layer.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    base_path: String,
    path_template: String,
    path_parameters: HashMap<String, String>,
    query_parameters: Vec<(String, Vec<String>)>,
    header_parameters: Vec<(String, String)>,
    body: Option<String>,
}

impl RequestDescriptor {
    pub fn new(
        method: Method,
        base_path: impl Into<String>,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            method,
            base_path: base_path.into(),
            path_template: path_template.into(),
            path_parameters: HashMap::new(),
            query_parameters: Vec::new(),
            header_parameters: Vec::new(),
            body: None,
        }
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    /// Adds a query value. Repeating a name appends to that name's values.
    pub fn with_query_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.query_parameters.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => values.push(value),
            None => self.query_parameters.push((name, vec![value])),
        }
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_parameters.push((name.into(), value.into()));
        self
    }

    /// Serializes `body` as compact JSON. These are the bytes that get digested,
    /// so the transport must send exactly [`RequestDescriptor::body`].
    pub fn with_json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let serialized = serde_json::to_string(body)
            .map_err(|e| SigningError::Configuration(format!("serializing request body: {e}")))?;
        self.body = Some(serialized);
        Ok(self)
    }

    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    pub fn path_parameters(&self) -> &HashMap<String, String> {
        &self.path_parameters
    }

    pub fn query_parameters(&self) -> &[(String, Vec<String>)] {
        &self.query_parameters
    }

    pub fn header_parameters(&self) -> &[(String, String)] {
        &self.header_parameters
    }

    /// Case-insensitive header lookup. The first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_parameters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}
