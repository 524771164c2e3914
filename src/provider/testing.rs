//! In-memory identity provider double recording call counts, used by the
//! lifecycle and challenge tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

use super::identity::{
    ChallengeKind, ChallengeWidget, IdentityProvider, ProviderError, WidgetConfig, WidgetEvent,
};

#[derive(Default)]
pub(crate) struct FakeState {
    pub renders: AtomicUsize,
    pub clears: AtomicUsize,
    pub sends: AtomicUsize,
    pub confirms: AtomicUsize,
    render_failure: Mutex<Option<ProviderError>>,
    send_failure: Mutex<Option<ProviderError>>,
    confirm_failure: Mutex<Option<ProviderError>>,
    events: Mutex<Option<UnboundedSender<WidgetEvent>>>,
}

impl FakeState {
    pub fn fail_next_render(&self, err: ProviderError) {
        *self.render_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_next_send(&self, err: ProviderError) {
        *self.send_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_next_confirm(&self, err: ProviderError) {
        *self.confirm_failure.lock().unwrap() = Some(err);
    }

    /// Fire a widget event as the provider would.
    pub fn emit(&self, event: WidgetEvent) {
        if let Some(sender) = self.events.lock().unwrap().as_ref() {
            let _ = sender.send(event);
        }
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn confirm_count(&self) -> usize {
        self.confirms.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeProvider {
    pub state: Arc<FakeState>,
}

impl FakeProvider {
    pub fn new() -> (Arc<Self>, Arc<FakeState>) {
        let state = Arc::new(FakeState::default());
        (
            Arc::new(Self {
                state: Arc::clone(&state),
            }),
            state,
        )
    }
}

struct FakeWidget {
    state: Arc<FakeState>,
}

#[async_trait]
impl ChallengeWidget for FakeWidget {
    async fn render(&self) -> Result<String, ProviderError> {
        if let Some(err) = self.state.render_failure.lock().unwrap().take() {
            return Err(err);
        }
        let n = self.state.renders.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("widget-{n}"))
    }

    async fn clear(&self) -> Result<(), ProviderError> {
        self.state.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn create_verifier(
        &self,
        _container_id: &str,
        config: WidgetConfig,
    ) -> Result<Arc<dyn ChallengeWidget>, ProviderError> {
        *self.state.events.lock().unwrap() = Some(config.events);
        Ok(Arc::new(FakeWidget {
            state: Arc::clone(&self.state),
        }))
    }

    async fn send_code(
        &self,
        _identifier: &str,
        _kind: ChallengeKind,
        _widget_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        if let Some(err) = self.state.send_failure.lock().unwrap().take() {
            return Err(err);
        }
        self.state.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn confirm_code(
        &self,
        _identifier: &str,
        _code: &str,
        _kind: ChallengeKind,
    ) -> Result<(), ProviderError> {
        if let Some(err) = self.state.confirm_failure.lock().unwrap().take() {
            return Err(err);
        }
        self.state.confirms.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
