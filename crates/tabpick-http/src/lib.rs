// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tabpick_app::{HEADER_LIST_FIELD, POPUP_LIST_FIELD, PackedLists};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Anything other than exactly `"POST"` is a GET.
    pub fn from_name(name: &str) -> Self {
        if name == "POST" { Self::Post } else { Self::Get }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    #[error("server returned {0}")]
    Status(u16),
    #[error("request failed before a response arrived: {0}")]
    Transport(String),
}

impl RequestFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            Self::Transport(_) => None,
        }
    }
}

/// Fire-and-forget HTTP requests reporting back through callbacks.
#[derive(Debug, Clone)]
pub struct Requester {
    http: HttpClient,
}

impl Requester {
    /// `timeout` of `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { http })
    }

    /// Issues the request on a worker thread. `on_complete` runs for a 200
    /// response; any other status, or a transport failure, goes to `on_error`.
    pub fn make_request<C, E>(
        &self,
        url: &str,
        method: &str,
        on_complete: C,
        on_error: E,
    ) -> JoinHandle<()>
    where
        C: FnOnce(Response) + Send + 'static,
        E: FnOnce(RequestFailure) + Send + 'static,
    {
        let requester = self.clone();
        let url = url.to_owned();
        let method = Method::from_name(method);
        thread::spawn(move || match requester.send(&url, method) {
            Ok(response) => on_complete(response),
            Err(failure) => on_error(failure),
        })
    }

    /// Blocking form of [`Requester::make_request`].
    pub fn send(&self, url: &str, method: Method) -> Result<Response, RequestFailure> {
        debug!(url, method = method.as_str(), "sending request");
        let request = match method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
        };
        let response = request.send().map_err(|error| {
            warn!(url, %error, "request failed");
            RequestFailure::Transport(error.to_string())
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url, status = status.as_u16(), "request rejected");
            return Err(RequestFailure::Status(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|error| RequestFailure::Transport(error.to_string()))?;
        Ok(Response {
            status: status.as_u16(),
            body,
        })
    }
}

/// Appends both packed lists to `base` as query pairs.
pub fn submission_url(base: &str, lists: &PackedLists) -> Result<Url> {
    let mut url =
        Url::parse(base).with_context(|| format!("invalid submit url {base:?}"))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        bail!("submit url {base:?} must be an http:// or https:// address");
    }
    url.query_pairs_mut()
        .append_pair(HEADER_LIST_FIELD, &lists.headers)
        .append_pair(POPUP_LIST_FIELD, &lists.popups);
    Ok(url)
}
