// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Network transports carrying serialized records to a Logstash endpoint.

use crate::errors::Creation;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::debug;

#[async_trait]
pub trait Transport: Send {
    /// Writes one serialized document.
    async fn write(&mut self, document: &[u8]) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum TransportKind {
    #[display("tcp")]
    Tcp,
    #[default]
    #[display("udp")]
    Udp,
}

impl FromStr for TransportKind {
    type Err = Creation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(Creation::UnknownTransport(s.to_string())),
        }
    }
}

impl TransportKind {
    /// Reads the `transport` route option, defaulting to UDP when absent.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, Creation> {
        options
            .get("transport")
            .map_or(Ok(Self::default()), |value| value.parse())
    }
}

/// Newline-delimited documents over one TCP connection.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub async fn connect(address: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        debug!("Connected to {address} over tcp");
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write(&mut self, document: &[u8]) -> io::Result<()> {
        let mut framed = Vec::with_capacity(document.len() + 1);
        framed.extend_from_slice(document);
        framed.push(b'\n');
        self.stream.write_all(&framed).await
    }
}

/// One datagram per document.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn connect(address: &str) -> io::Result<Self> {
        let remote = resolve(address).await?;
        let local: SocketAddr = if remote.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        debug!("Sending to {address} over udp");
        Ok(Self { socket })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn write(&mut self, document: &[u8]) -> io::Result<()> {
        let sent = self.socket.send(document).await?;
        if sent < document.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("datagram truncated: sent {sent} of {} bytes", document.len()),
            ));
        }
        Ok(())
    }
}

async fn resolve(address: &str) -> io::Result<SocketAddr> {
    lookup_host(address).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {address}"),
        )
    })
}

/// Opens a transport of the given kind to `address` (`host:port`).
pub async fn connect(kind: TransportKind, address: &str) -> io::Result<Box<dyn Transport>> {
    Ok(match kind {
        TransportKind::Tcp => Box::new(TcpTransport::connect(address).await?),
        TransportKind::Udp => Box::new(UdpTransport::connect(address).await?),
    })
}
