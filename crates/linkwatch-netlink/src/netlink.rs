//! rtnetlink change signal
//!
//! Binds a `NETLINK_ROUTE` socket to the link (and optionally address)
//! multicast groups. Every datagram the kernel sends is a hint that the
//! interface table may have changed; its contents only feed debug logs,
//! since the reconciler re-enumerates anyway.

use std::io;

use linkwatch_core::traits::{ChangeSignal, ChangeStream};
use netlink_packet_core::{NetlinkMessage, NetlinkPayload};
use netlink_packet_route::RtnlMessage;
use netlink_sys::{AsyncSocket, AsyncSocketExt, SocketAddr, TokioSocket, protocols::NETLINK_ROUTE};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

/// Change signal fed by rtnetlink multicast notifications
///
/// Notices are coalesced: while one is waiting to be consumed, further
/// datagrams do not queue more.
#[derive(Debug, Clone)]
pub struct NetlinkChangeSignal {
    groups: u32,
}

impl NetlinkChangeSignal {
    /// Watch link changes, plus IPv4/IPv6 address changes if asked
    pub fn new(watch_addresses: bool) -> Self {
        let mut groups = libc::RTMGRP_LINK as u32;
        if watch_addresses {
            groups |= (libc::RTMGRP_IPV4_IFADDR | libc::RTMGRP_IPV6_IFADDR) as u32;
        }
        Self { groups }
    }

    /// Multicast group mask the socket is bound to
    pub fn groups(&self) -> u32 {
        self.groups
    }

    fn open(&self) -> io::Result<TokioSocket> {
        let mut socket = TokioSocket::new(NETLINK_ROUTE)?;
        socket
            .socket_mut()
            .bind(&SocketAddr::new(0, self.groups))?;
        Ok(socket)
    }
}

impl ChangeSignal for NetlinkChangeSignal {
    /// Open a socket and forward its notifications
    ///
    /// Must be called from within a Tokio runtime. If the socket cannot be
    /// opened, the error is logged and the returned stream is already
    /// ended.
    fn watch(&self) -> ChangeStream {
        let (tx, rx) = mpsc::channel(1);
        match self.open() {
            Ok(socket) => {
                debug!(groups = self.groups, "Subscribed to rtnetlink notifications");
                tokio::spawn(monitor(socket, tx));
            }
            Err(e) => {
                error!("Failed to open rtnetlink socket: {}", e);
            }
        }
        Box::pin(ReceiverStream::new(rx))
    }

    fn signal_name(&self) -> &'static str {
        "netlink"
    }
}

/// Receive loop; ends when the stream is dropped or the socket fails
async fn monitor(mut socket: TokioSocket, tx: mpsc::Sender<()>) {
    loop {
        let received = tokio::select! {
            received = socket.recv_from_full() => received,
            _ = tx.closed() => {
                debug!("Change stream dropped, closing rtnetlink socket");
                return;
            }
        };

        match received {
            Ok((datagram, _)) => {
                debug!(messages = ?describe(&datagram), "rtnetlink notification");
            }
            Err(e) if e.raw_os_error() == Some(libc::ENOBUFS) => {
                // Notifications were dropped; one more pass covers them.
                warn!("rtnetlink receive buffer overrun");
            }
            Err(e) => {
                error!("rtnetlink receive failed: {}", e);
                return;
            }
        }

        match tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => return,
        }
    }
}

/// Label each message in a datagram
fn describe(datagram: &[u8]) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    let mut offset = 0;

    while offset < datagram.len() {
        let message = match NetlinkMessage::<RtnlMessage>::deserialize(&datagram[offset..]) {
            Ok(message) => message,
            Err(_) => {
                kinds.push("undecodable");
                break;
            }
        };

        kinds.push(match message.payload {
            NetlinkPayload::InnerMessage(RtnlMessage::NewLink(_)) => "new-link",
            NetlinkPayload::InnerMessage(RtnlMessage::DelLink(_)) => "del-link",
            NetlinkPayload::InnerMessage(RtnlMessage::NewAddress(_)) => "new-address",
            NetlinkPayload::InnerMessage(RtnlMessage::DelAddress(_)) => "del-address",
            _ => "other",
        });

        let length = message.header.length as usize;
        if length == 0 {
            break;
        }
        // NLMSG_ALIGN
        offset += (length + 3) & !3;
    }

    kinds
}
