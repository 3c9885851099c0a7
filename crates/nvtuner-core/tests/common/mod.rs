// Scripted stand-in for a router, shared by the integration suites.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nvtuner_core::{NotificationBus, Router, SessionConfig, SessionManager};
use nvtuner_ssh::{CommandOutput, ConnectParams, Connector, Error, ErrorSink, Transport};
use secrecy::SecretString;

#[derive(Default)]
pub struct FakeRouter {
    responses: Mutex<HashMap<String, CommandOutput>>,
    failing: Mutex<HashSet<String>>,
    pub executed: Mutex<Vec<String>>,
    pub keepalives: AtomicUsize,
    pub connects: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    refuse: AtomicBool,
    exec_delay: Mutex<Duration>,
    sinks: Mutex<Vec<ErrorSink>>,
    /// One flag per transport handed out, `true` once closed.
    pub closed: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeRouter {
    /// Answers `hostname` and `uname -o` like an Asuswrt-Merlin build.
    pub fn merlin() -> Arc<Self> {
        let router = Arc::new(Self::default());
        router.respond("hostname", "RT-AX88U\n");
        router.respond("uname -o", "ASUSWRT-Merlin\n");
        router
    }

    pub fn respond(&self, command: &str, stdout: &str) {
        self.respond_full(command, stdout, "");
    }

    pub fn respond_full(&self, command: &str, stdout: &str, stderr: &str) {
        self.responses.lock().unwrap().insert(
            command.to_owned(),
            CommandOutput {
                stdout: stdout.to_owned(),
                stderr: stderr.to_owned(),
                exit_status: Some(0),
            },
        );
    }

    pub fn fail(&self, command: &str) {
        self.failing.lock().unwrap().insert(command.to_owned());
    }

    pub fn refuse_logins(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn set_exec_delay(&self, delay: Duration) {
        *self.exec_delay.lock().unwrap() = delay;
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Report an error through the sink of the `index`th connection.
    pub fn raise(&self, index: usize, error: Error) {
        self.sinks.lock().unwrap()[index].send(error).unwrap();
    }

    pub fn is_closed(&self, index: usize) -> bool {
        self.closed.lock().unwrap()[index].load(Ordering::SeqCst)
    }
}

pub struct FakeConnector(pub Arc<FakeRouter>);

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        params: &ConnectParams,
        errors: ErrorSink,
    ) -> Result<Box<dyn Transport>, Error> {
        let router = &self.0;
        router.connects.fetch_add(1, Ordering::SeqCst);
        if router.refuse.load(Ordering::SeqCst) {
            return Err(Error::Authentication {
                username: params.auth.username().to_owned(),
            });
        }
        let closed = Arc::new(AtomicBool::new(false));
        router.closed.lock().unwrap().push(Arc::clone(&closed));
        router.sinks.lock().unwrap().push(errors);
        Ok(Box::new(FakeTransport {
            router: Arc::clone(router),
            closed,
        }))
    }
}

struct FakeTransport {
    router: Arc<FakeRouter>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn exec(&self, command: &str) -> Result<CommandOutput, Error> {
        let router = &self.router;
        let now = router.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        router.max_in_flight.fetch_max(now, Ordering::SeqCst);
        router.executed.lock().unwrap().push(command.to_owned());

        let delay = *router.exec_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        router.in_flight.fetch_sub(1, Ordering::SeqCst);

        if router.failing.lock().unwrap().contains(command) {
            return Err(Error::Channel("channel closed by peer".into()));
        }
        let canned = router.responses.lock().unwrap().get(command).cloned();
        Ok(canned.unwrap_or(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_status: Some(0),
        }))
    }

    async fn keepalive(&self) -> Result<(), Error> {
        self.router.keepalives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub fn password_router() -> Router {
    Router {
        username: Some("admin".into()),
        password: Some(SecretString::from("hunter2".to_string())),
        nickname: Some("lab".into()),
        ..Router::new("192.168.50.1", 22)
    }
}

pub fn session(router: &Arc<FakeRouter>, config: SessionConfig) -> (SessionManager, NotificationBus) {
    let bus = NotificationBus::with_capacity(1024);
    let manager = SessionManager::new(
        config,
        Arc::new(FakeConnector(Arc::clone(router))),
        bus.clone(),
    );
    (manager, bus)
}
