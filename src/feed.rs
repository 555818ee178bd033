//! Repository feed: fetch and render.
//!
//! Fetches the public repository listing for the configured user
//! (`GET <endpoint>/users/<user>/repos`) and renders each returned record,
//! in response order, through the compiled `repo` template into a single
//! container fragment.
//!
//! The flow is a one-shot state machine:
//!
//! ```text
//! Idle → Fetching → Rendered { count }
//!                 ↘ Failed { reason }
//! ```
//!
//! Failure (network error, non-success status, unknown template id) is an
//! explicit outcome, not a panic: the fragment comes back with zero entries
//! and the caller decides what to show the user. No retry, no pagination,
//! at most one in-flight request.

use crate::config::FeedConfig;
use crate::templates::{TemplateError, TemplateId, TemplateRegistry};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Unexpected status {0}")]
    Status(u16),
    #[error("Malformed response body: {0}")]
    Body(String),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

/// Where a feed run currently stands. `Rendered` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Fetching,
    Rendered { count: usize },
    Failed { reason: String },
}

/// Everything a feed run produced: the container fragment plus the terminal
/// state. On failure the fragment is the empty container.
#[derive(Debug)]
pub struct FeedOutcome {
    pub fragment: String,
    pub state: FeedState,
}

/// A one-shot fetch-and-render run against the configured endpoint.
pub struct Feed {
    config: FeedConfig,
    state: FeedState,
    agent: ureq::Agent,
}

impl Feed {
    pub fn new(config: FeedConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("sitekit/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            config,
            state: FeedState::Idle,
            agent,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    /// Drive the state machine to a terminal state and return the outcome.
    ///
    /// Never returns `Err` for fetch problems — those become
    /// `FeedState::Failed` with an empty fragment, so a flaky network cannot
    /// take the caller down.
    pub fn run(&mut self, registry: &TemplateRegistry) -> FeedOutcome {
        self.state = FeedState::Fetching;
        let outcome = match self.fetch() {
            Ok(records) => match render_records(registry, &self.config, &records) {
                Ok(fragment) => FeedOutcome {
                    fragment,
                    state: FeedState::Rendered {
                        count: records.len(),
                    },
                },
                Err(err) => failed(err),
            },
            Err(err) => failed(err),
        };
        self.state = outcome.state.clone();
        outcome
    }

    /// One GET to the repository listing. Records pass through untransformed.
    fn fetch(&self) -> Result<Vec<Value>, FeedError> {
        let url = format!(
            "{}/users/{}/repos",
            self.config.endpoint.trim_end_matches('/'),
            self.config.user
        );
        let response = match self.agent.get(&url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => return Err(FeedError::Status(code)),
            Err(ureq::Error::Transport(err)) => {
                return Err(FeedError::Transport(err.to_string()));
            }
        };
        let records: Vec<Value> = response
            .into_json()
            .map_err(|e| FeedError::Body(e.to_string()))?;
        Ok(records)
    }
}

fn failed(err: FeedError) -> FeedOutcome {
    FeedOutcome {
        fragment: empty_container(),
        state: FeedState::Failed {
            reason: err.to_string(),
        },
    }
}

fn empty_container() -> String {
    "<div class=\"repos\"><ul></ul></div>\n".to_string()
}

/// Render records in response order into the container fragment.
/// Exactly one appended entry per record.
pub fn render_records(
    registry: &TemplateRegistry,
    config: &FeedConfig,
    records: &[Value],
) -> Result<String, FeedError> {
    let template = registry.get(&TemplateId::new(config.template.clone()))?;
    let mut fragment = String::from("<div class=\"repos\"><ul>");
    for record in records {
        fragment.push_str(&template.render(record));
    }
    fragment.push_str("</ul></div>\n");
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplatesConfig;
    use crate::templates;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn registry_with_repo_template() -> TemplateRegistry {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("templates");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("repo.tpl"),
            "<li><a href=\"<%- data.html_url %>\"><%= data.name %></a></li>",
        )
        .unwrap();
        templates::compile_dir(tmp.path(), &TemplatesConfig::default()).unwrap()
    }

    fn records(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"name": format!("repo-{i}"), "html_url": format!("https://x/{i}")}))
            .collect()
    }

    #[test]
    fn renders_one_fragment_per_record_in_order() {
        let registry = registry_with_repo_template();
        let fragment =
            render_records(&registry, &FeedConfig::default(), &records(3)).unwrap();
        assert_eq!(fragment.matches("<li>").count(), 3);
        let a = fragment.find("repo-0").unwrap();
        let b = fragment.find("repo-1").unwrap();
        let c = fragment.find("repo-2").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn zero_records_is_empty_container() {
        let registry = registry_with_repo_template();
        let fragment = render_records(&registry, &FeedConfig::default(), &[]).unwrap();
        assert_eq!(fragment, "<div class=\"repos\"><ul></ul></div>\n");
    }

    #[test]
    fn unknown_template_is_error() {
        let registry = TemplateRegistry::default();
        let err = render_records(&registry, &FeedConfig::default(), &records(1)).unwrap_err();
        assert!(matches!(err, FeedError::Template(_)));
    }

    #[test]
    fn record_fields_pass_through_untransformed() {
        let registry = registry_with_repo_template();
        let rec = vec![json!({"name": "a&b", "html_url": "https://x"})];
        let fragment = render_records(&registry, &FeedConfig::default(), &rec).unwrap();
        // escaped by the template, not validated or reshaped by the feed
        assert!(fragment.contains("a&amp;b"));
    }

    #[test]
    fn failed_fetch_yields_zero_fragments_and_failed_state() {
        // Port 9 (discard) refuses connections; a transport failure must not
        // escape as a panic or Err.
        let mut feed = Feed::new(FeedConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..FeedConfig::default()
        });
        assert_eq!(*feed.state(), FeedState::Idle);
        let registry = registry_with_repo_template();
        let outcome = feed.run(&registry);
        assert_eq!(outcome.fragment.matches("<li>").count(), 0);
        assert!(matches!(outcome.state, FeedState::Failed { .. }));
        assert!(matches!(feed.state(), FeedState::Failed { .. }));
    }

    #[test]
    fn non_success_status_yields_zero_fragments() {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(
                b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        });

        let mut feed = Feed::new(FeedConfig {
            endpoint: format!("http://{addr}"),
            ..FeedConfig::default()
        });
        let registry = registry_with_repo_template();
        let outcome = feed.run(&registry);
        server.join().unwrap();

        assert_eq!(outcome.fragment, "<div class=\"repos\"><ul></ul></div>\n");
        match outcome.state {
            FeedState::Failed { reason } => assert!(reason.contains("500")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_template_fails_the_run_not_the_caller() {
        let mut feed = Feed::new(FeedConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            template: "nope".to_string(),
            ..FeedConfig::default()
        });
        let outcome = feed.run(&TemplateRegistry::default());
        assert!(matches!(outcome.state, FeedState::Failed { .. }));
        assert_eq!(outcome.fragment, "<div class=\"repos\"><ul></ul></div>\n");
    }
}
