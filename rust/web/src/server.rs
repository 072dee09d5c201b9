use crate::config::Config;
use crate::handlers;
use crate::middleware::with_request_logging;
use flipcard_engine::{Board, BoardError};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::reply::{Reply, Response};
use warp::Filter;

const DEFAULT_FLIP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    flip_timeout: Duration,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            flip_timeout: DEFAULT_FLIP_TIMEOUT,
        }
    }

    pub fn with_flip_timeout(mut self, flip_timeout: Duration) -> Self {
        self.flip_timeout = flip_timeout;
        self
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0).with_flip_timeout(Duration::from_secs(2))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn flip_timeout(&self) -> Duration {
        self.flip_timeout
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self::new(config.host.clone(), config.port).with_flip_timeout(config.flip_timeout())
    }
}

/// Everything a request handler needs: the configuration and the one shared board.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    board: Arc<Board>,
}

impl AppContext {
    pub fn new(config: ServerConfig, board: Board) -> Self {
        Self {
            config,
            board: Arc::new(board),
        }
    }

    pub fn from_file(config: ServerConfig, path: impl AsRef<Path>) -> Result<Self, ServerError> {
        Ok(Self::new(config, Board::from_file(path)?))
    }

    pub fn new_for_tests(board_text: &str) -> Self {
        Self::new(
            ServerConfig::for_tests(),
            Board::parse(board_text).expect("test board"),
        )
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn board(&self) -> Arc<Board> {
        Arc::clone(&self.board)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Board error: {0}")]
    Board(#[from] BoardError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(address = %addr, "board server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task))
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(io_err) = err
            .source()
            .and_then(|source| source.downcast_ref::<std::io::Error>())
        {
            return ServerError::BindError(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }

        ServerError::ConfigError(err.to_string())
    }

    /// All routes, wrapped in request logging.
    pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let board = context.board();
        let health = warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(move || handlers::health(&board).into_response());

        with_request_logging(health.or(Self::board_routes(context)).unify()).boxed()
    }

    fn board_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let board = context.board();
        let wait = context.config().flip_timeout();

        let index = warp::path::end().and(warp::get()).then(handlers::index);

        let look = warp::path!("look" / String)
            .and(warp::get())
            .and(Self::with_board(board.clone()))
            .then(|player: String, board: Arc<Board>| handlers::look(board, player));

        let flip = warp::path!("flip" / String / String)
            .and(warp::post())
            .and(Self::with_board(board.clone()))
            .then(move |player: String, position: String, board: Arc<Board>| {
                handlers::flip(board, player, position, wait)
            });

        let replace = warp::path!("replace" / String / String / String)
            .and(warp::post())
            .and(Self::with_board(board))
            .then(
                |player: String, from: String, to: String, board: Arc<Board>| {
                    handlers::replace(board, player, from, to)
                },
            );

        index
            .or(look)
            .unify()
            .or(flip)
            .unify()
            .or(replace)
            .unify()
            .boxed()
    }

    fn with_board(
        board: Arc<Board>,
    ) -> impl Filter<Extract = (Arc<Board>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&board))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        tracing::info!(address = %self.addr, "board server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
