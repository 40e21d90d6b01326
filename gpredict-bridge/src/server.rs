use crate::{
    Error, Result,
    config::ServerConfig,
    controller::Controller,
    session,
};
use bus::Publisher;
use log::Level;
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// How long `stop` waits for its wake-up connection to the listener.
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Back-off after a failed `accept`.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

struct Shared {
    stop: AtomicBool,
    /// Clone of the connection being served, used to end it from `stop`.
    active: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn active(&self) -> MutexGuard<'_, Option<TcpStream>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A controller listening for one tracking client at a time.
///
/// The listening socket is bound before [`start`](Server::start) returns; a
/// worker thread then accepts clients and runs their sessions one after the
/// other until [`stop`](Server::stop) is called or the server is dropped.
pub struct Server {
    component: &'static str,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Server {
    pub fn start<C: Controller>(
        config: &ServerConfig,
        controller: C,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        config.validate()?;

        let component = controller.name();
        let bind_error = |source| Error::Bind {
            address: config.address(),
            source,
        };

        // std enables SO_REUSEADDR on Unix listeners.
        let listener = TcpListener::bind((config.host.as_str(), config.port)).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let level = if config.verbose {
            Level::Info
        } else {
            Level::Debug
        };

        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            active: Mutex::new(None),
        });
        let worker_shared = Arc::clone(&shared);

        let worker = thread::Builder::new()
            .name(format!("{}-server", component))
            .spawn(move || supervise(listener, controller, publisher, worker_shared, level))
            .map_err(Error::Spawn)?;

        log::info!("[{}] listening on {}", component, local_addr);

        Ok(Self {
            component,
            local_addr,
            shared,
            worker: Some(worker),
        })
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Address the listener is bound to, with the real port if `0` was
    /// configured.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Disconnects the client, if any, closes the listener and waits for the
    /// worker to finish. Calling it again does nothing.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        log::info!("[{}] stopping", self.component);
        self.shared.stop.store(true, Ordering::SeqCst);

        {
            // Holding the lock keeps the worker from installing a new session
            // between the check and the wake-up.
            let active = self.shared.active();
            match active.as_ref() {
                Some(stream) => {
                    if let Err(e) = stream.shutdown(Shutdown::Both) {
                        log::debug!("[{}] client shutdown failed: {}", self.component, e);
                    }
                }
                None => self.wake_listener(),
            }
        }

        if worker.join().is_err() {
            log::error!("[{}] worker thread panicked", self.component);
        }

        log::info!("[{}] stopped", self.component);
    }

    /// Connects to our own listener so a blocked `accept` returns.
    fn wake_listener(&self) {
        let mut target = self.local_addr;
        if target.ip().is_unspecified() {
            let loopback: IpAddr = match target.ip() {
                IpAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
                IpAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
            };
            target.set_ip(loopback);
        }

        match TcpStream::connect_timeout(&target, WAKE_TIMEOUT) {
            Ok(stream) => drop(stream),
            Err(e) => log::debug!("[{}] wake-up connection failed: {}", self.component, e),
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

fn supervise<C: Controller>(
    listener: TcpListener,
    mut controller: C,
    publisher: Arc<dyn Publisher>,
    shared: Arc<Shared>,
    level: Level,
) {
    let component = controller.name();
    controller.on_start(&*publisher);

    while !shared.stop.load(Ordering::SeqCst) {
        log::debug!("[{}] waiting for connection", component);

        let (mut stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                if shared.stop.load(Ordering::SeqCst) {
                    break;
                }
                log::warn!("[{}] accept failed: {}", component, e);
                thread::sleep(ACCEPT_RETRY_DELAY);
                continue;
            }
        };

        {
            let mut active = shared.active();
            if shared.stop.load(Ordering::SeqCst) {
                break;
            }

            match stream.try_clone() {
                Ok(clone) => *active = Some(clone),
                Err(e) => {
                    log::warn!("[{}] dropping {}: {}", component, peer, e);
                    continue;
                }
            }
        }

        log::info!("[{}] connected from {}", component, peer);
        controller.on_connect();

        session::run(&mut stream, &mut controller, &*publisher, &shared.stop, level);

        shared.active().take();
        // The peer may already be gone.
        let _ = stream.shutdown(Shutdown::Both);
        log::info!("[{}] disconnected from {}", component, peer);
    }

    log::debug!("[{}] listener closed", component);
}
