use super::client::CameraClient;
use crate::cameras::gopro::{self, ProtocolVersion};
use crate::error::ImportError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

/// What this session last told the camera about turbo mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurboState {
    Off,
    On,
    /// Switched off after an interrupt; it is not turned on again.
    Closed,
}

/// A probed camera and the state of its turbo transfer mode.
///
/// Turbo mode must not outlive the process. Enabling and disabling hold the state lock for
/// the whole request, so the interrupt guard waits for a request in flight and then sees what
/// the camera was actually told. The camera receives the disable request exactly once.
#[derive(Debug)]
pub struct DeviceSession {
    client: Arc<CameraClient>,
    pub model: String,
    pub firmware: String,
    pub version: ProtocolVersion,
    supports_turbo: bool,
    turbo: Mutex<TurboState>,
}

impl DeviceSession {
    /// Queries the info endpoint. A camera that does not answer is not there.
    pub async fn open(client: Arc<CameraClient>) -> Result<Self, ImportError> {
        let info = client.info().await.map_err(|err| {
            warn!(control = %client.endpoints().control, error = %err, "Camera did not answer");
            ImportError::NoCameraDetected
        })?;
        let (version, supports_turbo) = gopro::network_profile(&info.info.firmware_version);
        info!(
            model = %info.info.model_name,
            firmware = %info.info.firmware_version,
            ?version,
            supports_turbo,
            "Camera probed"
        );
        Ok(Self {
            client,
            model: info.info.model_name,
            firmware: info.info.firmware_version,
            version,
            supports_turbo,
            turbo: Mutex::new(TurboState::Off),
        })
    }

    pub fn client(&self) -> &CameraClient {
        &self.client
    }

    pub async fn fast_mode_enabled(&self) -> bool {
        *self.turbo.lock().await == TurboState::On
    }

    /// Turns turbo mode on where the firmware supports it. A failure only slows the run down.
    pub async fn enable_fast_mode(&self) {
        if !self.supports_turbo {
            return;
        }
        let mut state = self.turbo.lock().await;
        if *state != TurboState::Off {
            return;
        }
        match self.client.set_turbo(true).await {
            Ok(()) => {
                *state = TurboState::On;
                info!(model = %self.model, firmware = %self.firmware, "Fast mode enabled");
            }
            Err(err) => warn!(error = %err, "Could not enable fast mode, continuing without it"),
        }
    }

    /// Turns turbo mode off if this session turned it on. Returns whether a request was sent.
    pub async fn disable_fast_mode(&self) -> bool {
        let mut state = self.turbo.lock().await;
        self.switch_off(&mut *state, TurboState::Off).await
    }

    /// Like [`disable_fast_mode`](Self::disable_fast_mode), and keeps turbo mode from being
    /// enabled afterwards.
    async fn close(&self) -> bool {
        let mut state = self.turbo.lock().await;
        self.switch_off(&mut *state, TurboState::Closed).await
    }

    async fn switch_off(&self, state: &mut TurboState, next: TurboState) -> bool {
        let was_on = *state == TurboState::On;
        *state = next;
        if !was_on {
            return false;
        }
        match self.client.set_turbo(false).await {
            Ok(()) => info!(model = %self.model, "Fast mode disabled"),
            Err(err) => warn!(error = %err, "Could not disable fast mode"),
        }
        true
    }
}

pub type InterruptSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// What happens when the process is asked to stop mid-run.
pub struct Interrupt {
    pub signal: InterruptSignal,
    pub on_exit: Box<dyn FnOnce() + Send>,
}

impl Interrupt {
    /// Ctrl-C or SIGTERM, then exit with status 130.
    pub fn process() -> Self {
        Self {
            signal: Box::pin(shutdown_signal()),
            on_exit: Box::new(|| std::process::exit(130)),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Handle to a running interrupt guard.
pub struct InterruptGuard {
    finished: oneshot::Sender<()>,
}

impl InterruptGuard {
    /// Tells the guard the run is over. The guard lets go of the session but keeps waiting for
    /// the signal, so an interrupt after the run still reaches the exit hook.
    pub fn release(self) {
        let _ = self.finished.send(());
    }
}

/// Waits for the interrupt, turns turbo mode off and runs the exit hook. In-flight transfers
/// are abandoned. An enable or disable request that is in flight when the signal arrives is
/// awaited first.
pub fn spawn_interrupt_guard(session: Arc<DeviceSession>, interrupt: Interrupt) -> InterruptGuard {
    let (finished, run_over) = oneshot::channel::<()>();
    let Interrupt {
        mut signal,
        on_exit,
    } = interrupt;

    tokio::spawn(async move {
        tokio::select! {
            () = &mut signal => {
                warn!("Interrupted, shutting down");
                session.close().await;
                on_exit();
                return;
            }
            _ = run_over => {}
        }
        drop(session);
        signal.await;
        debug!("Interrupted after the run");
        on_exit();
    });
    InterruptGuard { finished }
}
