//! # Quotegate Client
//!
//! Runs the full exchange against a server: receive a challenge, search
//! for a nonce, submit it, and collect the quote. The puzzle search runs
//! on the blocking thread pool so a hard challenge cannot stall the
//! runtime.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use quotegate_pow::{Challenge, PowError};
use quotegate_protocol::{framing, wire, FrameError, WireError};

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(std::io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Pow(#[from] PowError),

    #[error("solver task failed: {0}")]
    Solver(#[from] tokio::task::JoinError),

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error("request deadline exceeded")]
    Deadline,
}

/// A quote requester.
#[derive(Debug, Clone)]
pub struct Client {
    server_addr: String,
    deadline: Duration,
}

impl Client {
    /// Client for the given `host:port`, with a 30 second deadline over
    /// the whole exchange.
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            deadline: Duration::from_secs(30),
        }
    }

    /// Override the total per-request deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Run one full exchange and return the quote text.
    ///
    /// A server refusal (ban or rejected solution) surfaces as
    /// [`ClientError::Rejected`] carrying the server's message.
    pub async fn request_quote(&self) -> Result<String, ClientError> {
        timeout(self.deadline, self.exchange())
            .await
            .map_err(|_| ClientError::Deadline)?
    }

    async fn exchange(&self) -> Result<String, ClientError> {
        let mut stream = TcpStream::connect(&self.server_addr)
            .await
            .map_err(ClientError::Connect)?;

        let first = wire::Message::decode_frame(&framing::read_frame(&mut stream).await?)?;
        let challenge: Challenge = match first.kind()? {
            wire::MessageKind::Challenge => first.expect_challenge()?.try_into()?,
            wire::MessageKind::Error => {
                return Err(ClientError::Rejected(first.expect_error()?.message))
            }
            other => {
                return Err(ClientError::Wire(WireError::UnexpectedKind {
                    expected: wire::MessageKind::Challenge,
                    actual: other,
                }))
            }
        };

        debug!(difficulty = challenge.difficulty(), "solving challenge");
        let nonce = tokio::task::spawn_blocking(move || challenge.solve()).await??;

        let answer = wire::Message::solution(&wire::Solution { nonce });
        framing::write_frame(&mut stream, &answer.encode_frame()).await?;

        let reply = wire::Message::decode_frame(&framing::read_frame(&mut stream).await?)?;
        match reply.kind()? {
            wire::MessageKind::Quote => Ok(reply.expect_quote()?.text),
            wire::MessageKind::Error => {
                Err(ClientError::Rejected(reply.expect_error()?.message))
            }
            other => Err(ClientError::Wire(WireError::UnexpectedKind {
                expected: wire::MessageKind::Quote,
                actual: other,
            })),
        }
    }
}
