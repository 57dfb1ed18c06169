//! Where a remote link connects to, or a listener binds.

use std::{fmt, io, path::PathBuf};

use {
    pinion_config::{PinConfig, TransportKind},
    pinion_protocol::{DEFAULT_HOST, DEFAULT_PORT},
    tokio::{
        io::{AsyncRead, AsyncWrite},
        net::{TcpListener, TcpStream},
    },
};

use crate::error::{Context, Error};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    /// A Unix domain socket.
    Local { path: PathBuf },
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    pub(crate) async fn connect(&self) -> io::Result<Stream> {
        match self {
            Self::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                stream.set_nodelay(true)?;
                let (reader, writer) = stream.into_split();
                Ok(Stream::new(reader, writer))
            },
            #[cfg(unix)]
            Self::Local { path } => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                let (reader, writer) = stream.into_split();
                Ok(Stream::new(reader, writer))
            },
            #[cfg(not(unix))]
            Self::Local { .. } => Err(unsupported()),
        }
    }

    pub(crate) async fn bind(&self) -> io::Result<Acceptor> {
        match self {
            Self::Tcp { host, port } => {
                let listener = TcpListener::bind((host.as_str(), *port)).await?;
                Ok(Acceptor::Tcp(listener))
            },
            #[cfg(unix)]
            Self::Local { path } => {
                remove_stale_socket(path)?;
                let listener = tokio::net::UnixListener::bind(path)?;
                Ok(Acceptor::Local {
                    listener,
                    path: path.clone(),
                })
            },
            #[cfg(not(unix))]
            Self::Local { .. } => Err(unsupported()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Local { path } => write!(f, "local://{}", path.display()),
        }
    }
}

impl TryFrom<&PinConfig> for Endpoint {
    type Error = Error;

    fn try_from(cfg: &PinConfig) -> Result<Self, Error> {
        match cfg.transport {
            TransportKind::Tcp => Ok(Self::tcp(
                cfg.host.as_deref().unwrap_or(DEFAULT_HOST),
                cfg.port.unwrap_or(DEFAULT_PORT),
            )),
            TransportKind::Local => cfg
                .path
                .clone()
                .map(Self::local)
                .with_context(|| format!("local transport for pin {:?} needs a path", cfg.pin)),
        }
    }
}

pub(crate) type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Both halves of a connected socket.
pub(crate) struct Stream {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl Stream {
    fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

pub(crate) enum Acceptor {
    Tcp(TcpListener),
    #[cfg(unix)]
    Local {
        listener: tokio::net::UnixListener,
        path: PathBuf,
    },
}

impl Acceptor {
    /// Accept one connection, returning it with a printable peer address.
    pub async fn accept(&self) -> io::Result<(Stream, String)> {
        match self {
            Self::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                stream.set_nodelay(true)?;
                let (reader, writer) = stream.into_split();
                Ok((Stream::new(reader, writer), addr.to_string()))
            },
            #[cfg(unix)]
            Self::Local { listener, path } => {
                let (stream, _) = listener.accept().await?;
                let (reader, writer) = stream.into_split();
                Ok((Stream::new(reader, writer), path.display().to_string()))
            },
        }
    }

    /// The endpoint actually bound; resolves port 0 to the assigned port.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self {
            Self::Tcp(listener) => {
                let addr = listener.local_addr()?;
                Ok(Endpoint::tcp(addr.ip().to_string(), addr.port()))
            },
            #[cfg(unix)]
            Self::Local { path, .. } => Ok(Endpoint::local(path.clone())),
        }
    }
}

#[cfg(unix)]
impl Drop for Acceptor {
    fn drop(&mut self) {
        if let Self::Local { path, .. } = self {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) -> io::Result<()> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => std::fs::remove_file(path),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a socket", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "local socket transport requires a Unix platform",
    )
}
