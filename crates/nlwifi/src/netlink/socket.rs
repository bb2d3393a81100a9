//! The byte transport under [`NlState`](super::NlState).

use std::future::Future;
use std::os::unix::io::{AsRawFd, RawFd};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::config::TransportConfig;
use super::error::{Error, Result};

/// Byte transport underneath a socket manager.
///
/// [`NetlinkSocket`] is the kernel-backed implementation; tests drive the
/// manager through an in-memory one.
pub trait Transport: Send {
    /// Send one complete netlink message.
    fn send(&self, msg: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive one datagram (a batch of netlink messages).
    fn recv(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Local port id assigned by the kernel.
    fn port_id(&self) -> u32;

    /// Join a multicast group.
    fn add_membership(&mut self, group: u32) -> Result<()>;

    /// Leave a multicast group.
    fn drop_membership(&mut self, group: u32) -> Result<()>;
}

/// `NETLINK_GENERIC` socket registered with the tokio reactor.
pub struct NetlinkSocket {
    fd: AsyncFd<Socket>,
    port_id: u32,
    /// Effective `SO_RCVBUF`; each read allocates this much so one call
    /// drains a full dump batch.
    read_size: usize,
}

impl NetlinkSocket {
    /// Open, bind and configure a socket per `config`.
    pub fn open(config: &TransportConfig) -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_GENERIC)?;
        socket.set_non_blocking(true)?;
        if let Some(size) = config.recv_buffer {
            set_rcvbuf(socket.as_raw_fd(), size)?;
        }

        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let port_id = addr.port_number();

        if config.ext_ack {
            if let Err(e) = socket.set_ext_ack(true) {
                // Pre-4.12 kernels: errors arrive without text.
                tracing::debug!("extended ack unavailable: {}", e);
            }
        }

        let read_size = get_rcvbuf(socket.as_raw_fd())?;
        let fd = AsyncFd::new(socket)?;
        tracing::debug!(port_id, read_size, "nl80211 transport bound");
        Ok(Self {
            fd,
            port_id,
            read_size,
        })
    }
}

impl Transport for NetlinkSocket {
    async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut ready = self.fd.ready(Interest::WRITABLE).await?;
            if let Ok(sent) = ready.try_io(|sock| sock.get_ref().send(msg, 0)) {
                sent?;
                return Ok(());
            }
        }
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.read_size);
        loop {
            let mut ready = self.fd.ready(Interest::READABLE).await?;
            if let Ok(read) = ready.try_io(|sock| sock.get_ref().recv(&mut buf, 0)) {
                read?;
                return Ok(buf.to_vec());
            }
        }
    }

    fn port_id(&self) -> u32 {
        self.port_id
    }

    fn add_membership(&mut self, group: u32) -> Result<()> {
        Ok(self.fd.get_mut().add_membership(group)?)
    }

    fn drop_membership(&mut self, group: u32) -> Result<()> {
        Ok(self.fd.get_mut().drop_membership(group)?)
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

fn set_rcvbuf(fd: RawFd, size: usize) -> Result<()> {
    let value = libc::c_int::try_from(size)
        .map_err(|_| Error::InvalidArgument(format!("receive buffer too large: {}", size)))?;
    // SAFETY: fd is a valid open socket and value outlives the call; the
    // length passed matches the pointed-to c_int.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

fn get_rcvbuf(fd: RawFd) -> Result<usize> {
    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: fd is a valid open socket; value and len are valid for writes
    // and len holds the size of value.
    let ret = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    if ret < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    Ok(usize::try_from(value).unwrap_or(0).max(MIN_RECV_BUFFER))
}

/// Floor for the per-read buffer, one page plus headroom for a dump batch.
const MIN_RECV_BUFFER: usize = 8192;
