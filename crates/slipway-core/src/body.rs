use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{LocalBoxStream, Stream, StreamExt, TryStreamExt};
use serde::Serialize;

type Chunks = LocalBoxStream<'static, anyhow::Result<Bytes>>;

/// Payload of a request or response.
///
/// Requests built from invocation events are always `Once`. A handler may answer with a
/// `Stream`, but a platform reply is one document, so adapters drain it with
/// [`Body::collect`]. Chunks need not be `Send`.
pub enum Body {
    Once(Bytes),
    Stream(Chunks),
}

impl Body {
    pub fn empty() -> Self {
        Body::Once(Bytes::new())
    }

    pub fn stream<S>(chunks: S) -> Self
    where
        S: Stream<Item = Bytes> + 'static,
    {
        Body::Stream(chunks.map(Ok::<_, anyhow::Error>).boxed_local())
    }

    /// A stream whose chunks may fail. The first failure aborts [`Body::collect`].
    pub fn try_stream<S, E: 'static>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + 'static,
        anyhow::Error: From<E>,
    {
        Body::Stream(chunks.map_err(anyhow::Error::from).boxed_local())
    }

    pub fn json<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        Ok(Body::from(serde_json::to_vec(value)?))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    /// Bytes of a buffered body.
    ///
    /// # Panics
    ///
    /// On a `Stream` body. Use [`Body::collect`] when the variant is not known.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Once(bytes) => bytes,
            Body::Stream(_) => panic!("as_bytes called on a streaming body"),
        }
    }

    /// Buffer the whole body.
    pub async fn collect(self) -> anyhow::Result<Bytes> {
        let mut chunks = match self {
            Body::Once(bytes) => return Ok(bytes),
            Body::Stream(chunks) => chunks,
        };
        let mut buffer = BytesMut::new();
        while let Some(chunk) = chunks.try_next().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.freeze())
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Once(bytes) => write!(f, "Body::Once({} bytes)", bytes.len()),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Once(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Once(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Once(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Once(Bytes::from_static(text.as_bytes()))
    }
}
