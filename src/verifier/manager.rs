//! Singleton lifecycle for the challenge widget.
//!
//! The manager owns the only live widget in the process. Callers ask for a
//! ready handle; reuse is the cheap common case, and every create/teardown
//! path funnels through one slot so a second render can never start while
//! one is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::handle::{VerifierHandle, WidgetMode};
use super::retry::{FailureClass, RetryPolicy};
use crate::error::Error;
use crate::provider::{
    ChallengeWidget, ContainerHost, IdentityProvider, ProviderError, WidgetConfig, WidgetEvent,
};

const DEFAULT_TEARDOWN_SETTLE_MS: u64 = 100;
const DEFAULT_MOUNT_SETTLE_MS: u64 = 50;

/// Caller handlers for widget events. All optional; state transitions happen
/// regardless.
#[derive(Default)]
pub struct WidgetCallbacks {
    on_solved: Option<Box<dyn Fn(String) + Send + Sync>>,
    on_expired: Option<Box<dyn Fn() + Send + Sync>>,
    on_error: Option<Box<dyn Fn(String) + Send + Sync>>,
}

impl WidgetCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_solved(mut self, handler: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_solved = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn on_expired(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_expired = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn on_error(mut self, handler: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }
}

/// Settle timing for the manager.
///
/// The delays give the provider's own asynchronous teardown and the container
/// mutation time to land before a new render is requested; the ordering
/// guarantee (teardown fully observable before recreation) is the contract,
/// the durations are tunable.
#[derive(Clone, Copy, Debug)]
pub struct ManagerConfig {
    teardown_settle: Duration,
    mount_settle: Duration,
}

impl ManagerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            teardown_settle: Duration::from_millis(DEFAULT_TEARDOWN_SETTLE_MS),
            mount_settle: Duration::from_millis(DEFAULT_MOUNT_SETTLE_MS),
        }
    }

    #[must_use]
    pub fn with_teardown_settle_ms(mut self, millis: u64) -> Self {
        self.teardown_settle = Duration::from_millis(millis);
        self
    }

    #[must_use]
    pub fn with_mount_settle_ms(mut self, millis: u64) -> Self {
        self.mount_settle = Duration::from_millis(millis);
        self
    }

    #[must_use]
    pub fn teardown_settle(&self) -> Duration {
        self.teardown_settle
    }

    #[must_use]
    pub fn mount_settle(&self) -> Duration {
        self.mount_settle
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Slot {
    widget: Option<Arc<dyn ChallengeWidget>>,
    handle: Option<VerifierHandle>,
    pump: Option<JoinHandle<()>>,
}

pub struct VerifierManager {
    provider: Arc<dyn IdentityProvider>,
    host: Arc<dyn ContainerHost>,
    policy: RetryPolicy,
    config: ManagerConfig,
    // The slot lock is the render gate: one render in flight process-wide.
    slot: Mutex<Slot>,
    initialized: Arc<AtomicBool>,
    rendering: AtomicBool,
}

impl VerifierManager {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        host: Arc<dyn ContainerHost>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            provider,
            host,
            policy: RetryPolicy,
            config,
            slot: Mutex::new(Slot::default()),
            initialized: Arc::new(AtomicBool::new(false)),
            rendering: AtomicBool::new(false),
        }
    }

    /// Return the live handle, or tear down and create a fresh one.
    ///
    /// Callers arriving while a render is in flight wait on the slot lock and
    /// re-check reuse once it settles, so they all observe the settled
    /// outcome without triggering a second render.
    ///
    /// # Errors
    /// `Conflict` when the provider reports a widget already rendered in the
    /// container (state is force-cleaned first), `Configuration` for missing
    /// provider configuration, `Transient` otherwise. State is `Empty` after
    /// any failure.
    pub async fn get_or_create(
        &self,
        container_key: &str,
        mode: WidgetMode,
        callbacks: WidgetCallbacks,
    ) -> Result<VerifierHandle, Error> {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = self.reusable(&slot, container_key, mode) {
            debug!(container = container_key, "reusing live verifier");
            return Ok(handle);
        }
        self.render_locked(&mut slot, container_key, mode, callbacks)
            .await
    }

    /// Tear down and recreate unconditionally, bypassing reuse.
    ///
    /// # Errors
    /// Same failure modes as [`Self::get_or_create`].
    pub async fn force_refresh(
        &self,
        container_key: &str,
        mode: WidgetMode,
        callbacks: WidgetCallbacks,
    ) -> Result<VerifierHandle, Error> {
        let mut slot = self.slot.lock().await;
        self.render_locked(&mut slot, container_key, mode, callbacks)
            .await
    }

    /// Idempotent full teardown. Never errors; each step is individually
    /// guarded.
    pub async fn cleanup(&self) {
        let mut slot = self.slot.lock().await;
        self.teardown_locked(&mut slot).await;
    }

    /// True iff a reusable handle exists and no render is in flight.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && !self.rendering.load(Ordering::SeqCst)
    }

    fn reusable(&self, slot: &Slot, container_key: &str, mode: WidgetMode) -> Option<VerifierHandle> {
        if !self.initialized.load(Ordering::SeqCst) {
            return None;
        }
        let handle = slot.handle.as_ref()?;
        if handle.container_id() == container_key
            && handle.mode() == mode
            && self.host.has_widget(container_key)
        {
            Some(handle.clone())
        } else {
            None
        }
    }

    async fn render_locked(
        &self,
        slot: &mut Slot,
        container_key: &str,
        mode: WidgetMode,
        callbacks: WidgetCallbacks,
    ) -> Result<VerifierHandle, Error> {
        self.teardown_locked(slot).await;
        self.rendering.store(true, Ordering::SeqCst);

        match self.attempt_render(container_key, mode).await {
            Ok((widget, events, widget_id)) => {
                self.host.mark_rendered(container_key);
                let handle = VerifierHandle::new(widget_id, container_key.to_string(), mode);
                slot.widget = Some(widget);
                slot.handle = Some(handle.clone());
                slot.pump = Some(self.spawn_pump(events, callbacks));
                self.rendering.store(false, Ordering::SeqCst);
                self.initialized.store(true, Ordering::SeqCst);
                debug!(
                    widget_id = handle.widget_id(),
                    container = container_key,
                    "verifier ready"
                );
                Ok(handle)
            }
            Err(err) => {
                let class = self.policy.classify(&err);
                // Teardown resets both flags, leaving the slot Empty on every
                // failure path.
                self.teardown_locked(slot).await;
                match class {
                    FailureClass::Conflict => {
                        warn!(
                            container = container_key,
                            "widget already rendered, state inconsistent: {err}"
                        );
                        Err(Error::Conflict)
                    }
                    FailureClass::Fatal => Err(Error::Configuration(err.to_string())),
                    FailureClass::Transient => Err(Error::Transient(err.to_string())),
                }
            }
        }
    }

    async fn attempt_render(
        &self,
        container_key: &str,
        mode: WidgetMode,
    ) -> Result<
        (
            Arc<dyn ChallengeWidget>,
            mpsc::UnboundedReceiver<WidgetEvent>,
            String,
        ),
        ProviderError,
    > {
        // Let the provider's asynchronous teardown finish before touching the
        // container again.
        sleep(self.config.teardown_settle()).await;
        self.host.ensure(container_key, mode.is_visible());
        sleep(self.config.mount_settle()).await;

        let (sender, events) = mpsc::unbounded_channel();
        let widget = self
            .provider
            .create_verifier(
                container_key,
                WidgetConfig {
                    size: mode.size(),
                    events: sender,
                },
            )
            .await?;
        let widget_id = widget.render().await?;
        Ok((widget, events, widget_id))
    }

    fn spawn_pump(
        &self,
        mut events: mpsc::UnboundedReceiver<WidgetEvent>,
        callbacks: WidgetCallbacks,
    ) -> JoinHandle<()> {
        let initialized = Arc::clone(&self.initialized);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    WidgetEvent::Solved { token } => {
                        debug!("challenge solved");
                        if let Some(on_solved) = &callbacks.on_solved {
                            on_solved(token);
                        }
                    }
                    WidgetEvent::Expired => {
                        warn!("challenge expired, verifier must be recreated");
                        initialized.store(false, Ordering::SeqCst);
                        if let Some(on_expired) = &callbacks.on_expired {
                            on_expired();
                        }
                    }
                    WidgetEvent::Errored { message } => {
                        warn!("challenge widget error: {message}");
                        initialized.store(false, Ordering::SeqCst);
                        if let Some(on_error) = &callbacks.on_error {
                            on_error(message);
                        }
                    }
                }
            }
        })
    }

    async fn teardown_locked(&self, slot: &mut Slot) {
        if let Some(pump) = slot.pump.take() {
            pump.abort();
        }
        if let Some(widget) = slot.widget.take() {
            // An already-cleared widget may error here; ignore it so the rest
            // of the teardown still runs.
            if let Err(err) = widget.clear().await {
                debug!("ignoring widget clear failure: {err}");
            }
        }
        if let Some(handle) = slot.handle.take() {
            self.host.clear(handle.container_id());
        }
        self.initialized.store(false, Ordering::SeqCst);
        self.rendering.store(false, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::SeqCst)
    }
}
