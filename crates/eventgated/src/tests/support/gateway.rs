//! Full gateway running on a background thread.

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::client::Response;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use eventgate_config::Config;

use crate::collector::LoggingSink;
use crate::process::launch::{LaunchPlan, ServiceDeps, run_gateway_with};

use super::{RecordingHealthReporter, RecordingMetrics, TestConfigLoader, TestShutdownSignal, WAIT};

pub type ClientSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Gateway launched through the production launch sequence.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub reporter: Arc<RecordingHealthReporter>,
    pub metrics: Arc<RecordingMetrics>,
    shutdown: TestShutdownSignal,
    thread: Option<JoinHandle<Result<(), String>>>,
}

impl RunningGateway {
    pub fn launch(config: Config) -> Self {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let metrics = Arc::new(RecordingMetrics::default());
        let shutdown = TestShutdownSignal::default();
        let plan = LaunchPlan {
            shutdown: shutdown.clone(),
            services: ServiceDeps {
                loader: TestConfigLoader::with_config(config),
                reporter: Arc::clone(&reporter) as _,
                metrics: Arc::clone(&metrics) as _,
                sink: Arc::new(LoggingSink),
            },
        };
        let thread = thread::spawn(move || run_gateway_with(plan).map_err(|error| error.to_string()));
        let addr = reporter
            .wait_for_listener(WAIT)
            .expect("gateway should report its listener");
        Self {
            addr,
            reporter,
            metrics,
            shutdown,
            thread: Some(thread),
        }
    }

    /// Opens a WebSocket carrying the given identity headers.
    pub fn connect(
        &self,
        headers: &[(&'static str, &str)],
    ) -> Result<(ClientSocket, Response), tungstenite::Error> {
        let mut request = format!("ws://{}/", self.addr)
            .into_client_request()
            .expect("valid client request");
        for (name, value) in headers {
            request.headers_mut().insert(
                *name,
                HeaderValue::from_str(value).expect("valid header value"),
            );
        }
        tungstenite::connect(request)
    }

    /// Requests shutdown and waits for the launch sequence to return.
    pub fn stop(&mut self) -> Result<(), String> {
        self.shutdown.trigger();
        match self.thread.take() {
            Some(thread) => thread.join().expect("gateway thread panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.stop();
        }
    }
}

/// Reads frames until a data frame arrives.
pub fn read_data(client: &mut ClientSocket) -> Message {
    loop {
        let message = client.read().expect("read from gateway");
        if message.is_text() || message.is_binary() {
            return message;
        }
    }
}
