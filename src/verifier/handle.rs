//! Verifier handle and widget presentation mode.

use std::time::Instant;

use crate::provider::WidgetSize;

/// Widget presentation selected by the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WidgetMode {
    Visible,
    Invisible,
}

impl WidgetMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Invisible => "invisible",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "visible" => Some(Self::Visible),
            "invisible" => Some(Self::Invisible),
            _ => None,
        }
    }

    pub(crate) fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }

    /// Map onto the provider's size vocabulary.
    pub(crate) fn size(self) -> WidgetSize {
        match self {
            Self::Visible => WidgetSize::Normal,
            Self::Invisible => WidgetSize::Invisible,
        }
    }
}

/// Opaque reference to a rendered, interactive challenge widget.
///
/// At most one live handle exists process-wide; the lifecycle manager owns
/// the singleton and hands out clones.
#[derive(Clone, Debug)]
pub struct VerifierHandle {
    widget_id: String,
    container_id: String,
    mode: WidgetMode,
    created_at: Instant,
}

impl VerifierHandle {
    pub(crate) fn new(widget_id: String, container_id: String, mode: WidgetMode) -> Self {
        Self {
            widget_id,
            container_id,
            mode,
            created_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    #[must_use]
    pub fn mode(&self) -> WidgetMode {
        self.mode
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}
