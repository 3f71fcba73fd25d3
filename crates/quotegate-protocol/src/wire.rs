//! Typed wire messages.
//!
//! The schema is a tag-value encoding compatible with the Protocol Buffers
//! wire format, so clients in other languages interoperate as long as the
//! field numbers below are honored. Decoders skip unknown fields, which
//! keeps the schema evolvable.
//!
//! Every frame body is one outer [`Message`] carrying a kind tag and the
//! serialized inner message.

use prost::Message as _;

use crate::error::WireError;

/// Curve identifier carried in every challenge.
pub const CURVE_NAME: &str = "P-256";

/// Discriminates the payload of a [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageKind {
    Challenge = 0,
    Solution = 1,
    Quote = 2,
    Error = 3,
}

/// Outer envelope: a kind tag plus the serialized inner message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(int32, tag = "1")]
    pub kind: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

/// Server-issued puzzle: a point on the named curve plus the required
/// number of leading zero hash bits. Coordinates are minimal big-endian.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Challenge {
    #[prost(bytes = "vec", tag = "1")]
    pub qx: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub qy: Vec<u8>,
    #[prost(string, tag = "3")]
    pub curve: String,
    #[prost(int32, tag = "4")]
    pub difficulty: i32,
}

/// Client's answer: the solving nonce as a minimal big-endian integer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Solution {
    #[prost(bytes = "vec", tag = "1")]
    pub nonce: Vec<u8>,
}

/// The payload a successful exchange is rewarded with.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Quote {
    #[prost(string, tag = "1")]
    pub text: String,
}

/// Human-readable refusal sent before closing.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorReply {
    #[prost(string, tag = "1")]
    pub message: String,
}

impl Message {
    /// Wrap a challenge.
    pub fn challenge(inner: &Challenge) -> Self {
        Self::wrap(MessageKind::Challenge, inner)
    }

    /// Wrap a solution.
    pub fn solution(inner: &Solution) -> Self {
        Self::wrap(MessageKind::Solution, inner)
    }

    /// Wrap a quote.
    pub fn quote(inner: &Quote) -> Self {
        Self::wrap(MessageKind::Quote, inner)
    }

    /// Wrap an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::wrap(
            MessageKind::Error,
            &ErrorReply {
                message: message.into(),
            },
        )
    }

    fn wrap(kind: MessageKind, inner: &impl prost::Message) -> Self {
        Self {
            kind: kind as i32,
            payload: inner.encode_to_vec(),
        }
    }

    /// The validated kind tag.
    pub fn kind(&self) -> Result<MessageKind, WireError> {
        MessageKind::try_from(self.kind).map_err(|_| WireError::UnknownKind(self.kind))
    }

    /// Serialize for use as a frame body.
    pub fn encode_frame(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Deserialize from a frame body.
    pub fn decode_frame(buf: &[u8]) -> Result<Self, WireError> {
        Ok(Self::decode(buf)?)
    }

    /// Decode the payload as a [`Challenge`], checking the kind tag.
    pub fn expect_challenge(&self) -> Result<Challenge, WireError> {
        self.expect_payload(MessageKind::Challenge)
    }

    /// Decode the payload as a [`Solution`], checking the kind tag.
    pub fn expect_solution(&self) -> Result<Solution, WireError> {
        self.expect_payload(MessageKind::Solution)
    }

    /// Decode the payload as a [`Quote`], checking the kind tag.
    pub fn expect_quote(&self) -> Result<Quote, WireError> {
        self.expect_payload(MessageKind::Quote)
    }

    /// Decode the payload as an [`ErrorReply`], checking the kind tag.
    pub fn expect_error(&self) -> Result<ErrorReply, WireError> {
        self.expect_payload(MessageKind::Error)
    }

    fn expect_payload<T>(&self, want: MessageKind) -> Result<T, WireError>
    where
        T: prost::Message + Default,
    {
        let actual = self.kind()?;
        if actual != want {
            return Err(WireError::UnexpectedKind {
                expected: want,
                actual,
            });
        }
        Ok(T::decode(self.payload.as_slice())?)
    }
}
