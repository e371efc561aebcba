// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::sync::mpsc::Sender;
use tabpick_app::PackedLists;
use tabpick_http::{Method, Requester, submission_url};
use tabpick_tui::{AppRuntime, InternalEvent, SubmitDisposition, SubmitOutcome};
use tracing::info;

/// Where submitted lists go.
pub struct SubmitRuntime {
    target: Option<SubmitTarget>,
}

struct SubmitTarget {
    requester: Requester,
    url: String,
    method: Method,
}

impl SubmitRuntime {
    /// Keeps submissions local; they are printed when the editor exits.
    pub fn local() -> Self {
        Self { target: None }
    }

    pub fn http(requester: Requester, url: impl Into<String>, method: Method) -> Self {
        Self {
            target: Some(SubmitTarget {
                requester,
                url: url.into(),
                method,
            }),
        }
    }
}

impl AppRuntime for SubmitRuntime {
    fn submit(
        &mut self,
        lists: &PackedLists,
        tx: Sender<InternalEvent>,
    ) -> Result<SubmitDisposition> {
        let Some(target) = &self.target else {
            return Ok(SubmitDisposition::Stored);
        };

        let url = submission_url(&target.url, lists)?;
        info!(%url, method = target.method.as_str(), "sending submission");

        let error_tx = tx.clone();
        // Detached; completion is reported through the channel.
        let _handle = target.requester.make_request(
            url.as_str(),
            target.method.as_str(),
            move |response| {
                let _ = tx.send(InternalEvent::SubmitFinished(SubmitOutcome::Accepted {
                    status: response.status,
                }));
            },
            move |failure| {
                let _ = error_tx.send(InternalEvent::SubmitFinished(SubmitOutcome::Rejected {
                    reason: failure.to_string(),
                }));
            },
        );
        Ok(SubmitDisposition::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::SubmitRuntime;
    use anyhow::Result;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tabpick_app::PackedLists;
    use tabpick_http::{Method, Requester};
    use tabpick_tui::{AppRuntime, InternalEvent, SubmitDisposition, SubmitOutcome};
    use tiny_http::{Response, Server};

    fn lists() -> PackedLists {
        PackedLists {
            headers: "r1c1;".to_owned(),
            popups: "a1b2;".to_owned(),
        }
    }

    fn serve_once(status: u16) -> Result<(String, thread::JoinHandle<Option<String>>)> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow::anyhow!("start mock server: {error}"))?;
        let addr = server.server_addr().to_string();
        let handle = thread::spawn(move || {
            let request = server.recv().ok()?;
            let url = request.url().to_owned();
            let _ = request.respond(Response::from_string("ok").with_status_code(status));
            Some(url)
        });
        Ok((format!("http://{addr}/convert"), handle))
    }

    #[test]
    fn local_runtime_stores_without_events() -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let disposition = SubmitRuntime::local().submit(&lists(), tx)?;
        assert_eq!(disposition, SubmitDisposition::Stored);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn http_runtime_reports_accepted_submission() -> Result<()> {
        let (url, server) = serve_once(200)?;
        let mut runtime = SubmitRuntime::http(Requester::new(None)?, url, Method::Get);

        let (tx, rx) = mpsc::channel();
        assert_eq!(runtime.submit(&lists(), tx)?, SubmitDisposition::Pending);

        let event = rx.recv_timeout(Duration::from_secs(10))?;
        assert_eq!(
            event,
            InternalEvent::SubmitFinished(SubmitOutcome::Accepted { status: 200 })
        );
        let seen = server.join().map_err(|_| anyhow::anyhow!("server panicked"))?;
        assert_eq!(
            seen.as_deref(),
            Some("/convert?hlist=r1c1%3B&plist=a1b2%3B")
        );
        Ok(())
    }

    #[test]
    fn http_runtime_reports_rejected_status() -> Result<()> {
        let (url, server) = serve_once(500)?;
        let mut runtime =
            SubmitRuntime::http(Requester::new(Some(Duration::from_secs(5)))?, url, Method::Post);

        let (tx, rx) = mpsc::channel();
        runtime.submit(&lists(), tx)?;

        let event = rx.recv_timeout(Duration::from_secs(10))?;
        assert_eq!(
            event,
            InternalEvent::SubmitFinished(SubmitOutcome::Rejected {
                reason: "server returned 500".to_owned(),
            })
        );
        let _ = server.join();
        Ok(())
    }

    #[test]
    fn invalid_url_fails_synchronously() -> Result<()> {
        let mut runtime = SubmitRuntime::http(Requester::new(None)?, "not a url", Method::Get);
        let (tx, _rx) = mpsc::channel();
        assert!(runtime.submit(&lists(), tx).is_err());
        Ok(())
    }
}
