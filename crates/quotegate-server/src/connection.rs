//! One-shot connection handler.
//!
//! Each accepted connection runs this state machine exactly once:
//! classify the client, issue a challenge, await one framed solution,
//! answer with a quote or an error, close. Nothing survives the
//! connection; the challenge lives and dies as a local of the handler.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use quotegate_limiter::ClientAction;
use quotegate_pow::{Challenge, PowError};
use quotegate_protocol::{framing, wire, FrameError, WireError};

use crate::difficulty::difficulty_for_rate;
use crate::server::ServerState;

pub(crate) const BAN_MESSAGE: &str =
    "You are temporarily banned due to suspicious activity.";
pub(crate) const INVALID_SOLUTION_MESSAGE: &str = "Invalid solution";

/// Failures while driving one exchange.
///
/// Attribution matters: only faults that cleanly implicate the client
/// (malformed messages, wrong message kind, a nonce that fails the
/// puzzle) count against its error intensity. Transport failures and
/// deadlines do not, because the client cannot be distinguished from the
/// network there.
#[derive(Debug, Error)]
enum ExchangeError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Pow(#[from] PowError),
}

impl ExchangeError {
    fn is_client_fault(&self) -> bool {
        match self {
            ExchangeError::Wire(_) | ExchangeError::Pow(_) => true,
            ExchangeError::Frame(_) => false,
        }
    }
}

/// Drive one accepted connection to completion.
pub(crate) async fn handle_connection<S>(mut stream: S, peer: SocketAddr, state: Arc<ServerState>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let client_ip = peer.ip().to_string();

    let action = state.limiter.classify(&client_ip);
    if action == ClientAction::Ban {
        info!(client = %client_ip, "refusing banned client");
        let refusal = wire::Message::error(BAN_MESSAGE);
        let _ = framing::write_frame(&mut stream, &refusal.encode_frame()).await;
        // Slow the retry loop down without blocking other handlers.
        tokio::time::sleep(state.config.ban_delay).await;
        return;
    }

    let request_count = state.limiter.on_request(&client_ip);
    let mut difficulty = difficulty_for_rate(request_count);
    if action == ClientAction::RaiseDifficulty {
        difficulty += 1;
    }
    debug!(client = %client_ip, request_count, difficulty, "issuing challenge");

    let challenge = match Challenge::generate(difficulty) {
        Ok(challenge) => challenge,
        Err(error) => {
            warn!(client = %client_ip, %error, "challenge generation failed");
            return;
        }
    };

    match timeout(
        state.config.exchange_timeout,
        serve_challenge(&mut stream, &challenge, &state),
    )
    .await
    {
        Ok(Ok(())) => debug!(client = %client_ip, "quote served"),
        Ok(Err(error)) if error.is_client_fault() => {
            let error_count = state.limiter.on_error(&client_ip);
            info!(client = %client_ip, error_count, %error, "rejecting exchange");
            let reply = wire::Message::error(INVALID_SOLUTION_MESSAGE);
            let _ = framing::write_frame(&mut stream, &reply.encode_frame()).await;
        }
        Ok(Err(error)) => debug!(client = %client_ip, %error, "connection aborted"),
        Err(_elapsed) => debug!(client = %client_ip, "exchange deadline exceeded"),
    }
}

/// Send the challenge, await exactly one framed solution, verify it, and
/// reply with a quote.
async fn serve_challenge<S>(
    stream: &mut S,
    challenge: &Challenge,
    state: &ServerState,
) -> Result<(), ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let offer = wire::Message::challenge(&wire::Challenge::from(challenge));
    framing::write_frame(stream, &offer.encode_frame()).await?;

    let body = framing::read_frame(stream).await?;
    let message = wire::Message::decode_frame(&body)?;
    let solution = message.expect_solution()?;
    challenge.verify(&solution.nonce)?;

    let quote = wire::Quote {
        text: state.quotes.next().to_string(),
    };
    framing::write_frame(stream, &wire::Message::quote(&quote).encode_frame()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::quotes::QuoteBook;
    use quotegate_limiter::RateLimiter;
    use std::time::Duration;

    fn test_state() -> Arc<ServerState> {
        let config = ServerConfig {
            ban_delay: Duration::from_millis(1),
            ..Default::default()
        };
        Arc::new(ServerState {
            limiter: RateLimiter::new(config.limiter.clone()),
            quotes: QuoteBook::embedded(),
            config,
        })
    }

    fn peer(ip: &str) -> SocketAddr {
        format!("{ip}:40000").parse().unwrap()
    }

    async fn read_message<S>(stream: &mut S) -> wire::Message
    where
        S: AsyncRead + Unpin,
    {
        let body = framing::read_frame(stream).await.unwrap();
        wire::Message::decode_frame(&body).unwrap()
    }

    #[tokio::test]
    async fn test_valid_solution_earns_a_quote() {
        let state = test_state();
        let (server_side, mut client_side) = tokio::io::duplex(4096);

        let handler = tokio::spawn(handle_connection(
            server_side,
            peer("192.0.2.1"),
            Arc::clone(&state),
        ));

        let challenge: Challenge = read_message(&mut client_side)
            .await
            .expect_challenge()
            .unwrap()
            .try_into()
            .unwrap();
        let nonce = challenge.solve().unwrap();

        let answer = wire::Message::solution(&wire::Solution { nonce });
        framing::write_frame(&mut client_side, &answer.encode_frame())
            .await
            .unwrap();

        let quote = read_message(&mut client_side)
            .await
            .expect_quote()
            .unwrap();
        assert!(!quote.text.is_empty());
        handler.await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_message_kind_is_a_client_fault() {
        let state = test_state();
        let (server_side, mut client_side) = tokio::io::duplex(4096);

        let handler = tokio::spawn(handle_connection(
            server_side,
            peer("192.0.2.2"),
            Arc::clone(&state),
        ));

        let _challenge = read_message(&mut client_side).await;
        let wrong = wire::Message::quote(&wire::Quote {
            text: "not a solution".to_string(),
        });
        framing::write_frame(&mut client_side, &wrong.encode_frame())
            .await
            .unwrap();

        let reply = read_message(&mut client_side).await;
        assert_eq!(
            reply.expect_error().unwrap().message,
            INVALID_SOLUTION_MESSAGE
        );
        handler.await.unwrap();

        // The fault was recorded against the client.
        assert_eq!(state.limiter.tracked_clients(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_mid_exchange_is_not_a_fault() {
        let state = test_state();
        let (server_side, mut client_side) = tokio::io::duplex(4096);

        let handler = tokio::spawn(handle_connection(
            server_side,
            peer("192.0.2.3"),
            Arc::clone(&state),
        ));

        let _challenge = read_message(&mut client_side).await;
        drop(client_side);
        handler.await.unwrap();

        // Repeated silent disconnects never raise difficulty.
        for _ in 0..10 {
            let (server_side, mut client_side) = tokio::io::duplex(4096);
            let handler = tokio::spawn(handle_connection(
                server_side,
                peer("192.0.2.3"),
                Arc::clone(&state),
            ));
            let _challenge = read_message(&mut client_side).await;
            drop(client_side);
            handler.await.unwrap();
        }
        assert_ne!(
            state.limiter.classify("192.0.2.3"),
            ClientAction::Ban
        );
    }

    #[tokio::test]
    async fn test_banned_client_gets_refusal_before_challenge() {
        let state = test_state();
        for _ in 0..11 {
            state.limiter.on_error("192.0.2.4");
        }

        let (server_side, mut client_side) = tokio::io::duplex(4096);
        let handler = tokio::spawn(handle_connection(
            server_side,
            peer("192.0.2.4"),
            Arc::clone(&state),
        ));

        let refusal = read_message(&mut client_side).await;
        assert_eq!(refusal.expect_error().unwrap().message, BAN_MESSAGE);
        handler.await.unwrap();
    }
}
