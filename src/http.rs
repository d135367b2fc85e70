use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("HTTP status {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },
    #[error("request failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: usize, last: Box<HttpError> },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl HttpError {
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Exhausted { last, .. } => last.status(),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(6),
            attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

pub(crate) fn get_text_with_retries(
    url: &str,
    query: &[(&str, &str)],
    policy: RetryPolicy,
) -> Result<String, HttpError> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    let mut last_error = None;
    for attempt in 1..=attempts {
        let mut request = agent.get(url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        debug!(url, attempt, "sending request");

        let error = match request.call() {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| HttpError::Decode(err.to_string()));
            }
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim().chars().take(240).collect::<String>();
                let error = HttpError::Status { status, body };
                if !should_retry_http_status(status) {
                    return Err(error);
                }
                error
            }
            Err(ureq::Error::Transport(err)) => HttpError::Transport(err.to_string()),
        };

        if attempt < attempts {
            thread::sleep(policy.retry_delay);
        }
        last_error = Some(error);
    }

    let last = last_error.unwrap_or_else(|| {
        HttpError::Transport("exhausted attempts without a concrete error".to_string())
    });
    Err(HttpError::Exhausted {
        attempts,
        last: Box::new(last),
    })
}
