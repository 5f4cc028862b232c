// Copyright (c) 2026 Betanet
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Browse protocol wire codec for `/betanet/browse/1.0.0`.
//!
//! One canonical request per stream, half-close, one canonical response,
//! close. Framing and stream lifecycle are handled by the request-response
//! behaviour; this codec bounds and (de)serializes the payloads.

use crate::core::{
    codec::{decode_canonical_limited, encode_canonical},
    rules::MAX_CONTENT_BYTES,
    types::{BrowseRequest, BrowseResponse},
};
use async_trait::async_trait;
use futures::prelude::*;
use libp2p::{request_response, StreamProtocol};
use std::io;

/// Upper bound on an encoded request (requests carry only IDs).
pub const MAX_REQUEST_BYTES: usize = 4 * 1024;

/// Upper bound on an encoded response (one content blob plus envelope).
pub const MAX_RESPONSE_BYTES: usize = MAX_CONTENT_BYTES + 4 * 1024;

async fn read_bounded<T>(io: &mut T, max: usize) -> io::Result<Vec<u8>>
where
    T: AsyncRead + Unpin + Send,
{
    let mut buf = Vec::new();
    io.take((max + 1) as u64).read_to_end(&mut buf).await?;
    if buf.len() > max {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "message too large"));
    }
    Ok(buf)
}

/// Codec for the browse request/response protocol.
#[derive(Clone, Default)]
pub struct BrowseCodec;

#[async_trait]
impl request_response::Codec for BrowseCodec {
    type Protocol = StreamProtocol;
    type Request = BrowseRequest;
    type Response = BrowseResponse;

    async fn read_request<T>(
        &mut self,
        _protocol: &StreamProtocol,
        io: &mut T,
    ) -> io::Result<Self::Request>
    where
        T: AsyncRead + Unpin + Send,
    {
        let buf = read_bounded(io, MAX_REQUEST_BYTES).await?;
        decode_canonical_limited(&buf, MAX_REQUEST_BYTES)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad request"))
    }

    async fn read_response<T>(
        &mut self,
        _protocol: &StreamProtocol,
        io: &mut T,
    ) -> io::Result<Self::Response>
    where
        T: AsyncRead + Unpin + Send,
    {
        let buf = read_bounded(io, MAX_RESPONSE_BYTES).await?;
        decode_canonical_limited(&buf, MAX_RESPONSE_BYTES)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad response"))
    }

    async fn write_request<T>(
        &mut self,
        _protocol: &StreamProtocol,
        io: &mut T,
        req: Self::Request,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        let bytes = encode_canonical(&req)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "encode request"))?;
        io.write_all(&bytes).await
    }

    async fn write_response<T>(
        &mut self,
        _protocol: &StreamProtocol,
        io: &mut T,
        resp: Self::Response,
    ) -> io::Result<()>
    where
        T: AsyncWrite + Unpin + Send,
    {
        let bytes = encode_canonical(&resp)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "encode response"))?;
        io.write_all(&bytes).await
    }
}
