//! In-memory transport that replays scripted responses and records every call.

use crate::transport::{Method, StreamResponse, Transport};
use crate::{BoxStream, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    streams: Mutex<VecDeque<StreamResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<Value>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            streams: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push_stream(&self, run_id: Option<&str>, body: BoxStream<'static, Bytes>) {
        self.streams.lock().unwrap().push_back(StreamResponse {
            run_id: run_id.map(str::to_string),
            body,
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: Method, path: &str, body: Option<&Value>) {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        _headers: Option<&HashMap<String, String>>,
    ) -> Result<Value> {
        self.record(method, path, body);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted request to {}", path))
    }

    async fn open_stream(&self, path: &str, body: &Value) -> Result<StreamResponse> {
        self.record(Method::POST, path, Some(body));
        Ok(self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted stream to {}", path)))
    }
}

pub(crate) fn api_error(status: u16, code: &str) -> Error {
    Error::Api {
        status,
        code: code.to_string(),
        message: format!("{} ({})", code, status),
        details: None,
    }
}
