use std::{path::PathBuf, time::Duration};

use tokio::time::Instant;

pub const DEFAULT_BANNER_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerAction {
    CopyPath { key: char, path: PathBuf },
}

impl BannerAction {
    pub fn copy_path(key: char, path: impl Into<PathBuf>) -> Self {
        Self::CopyPath {
            key,
            path: path.into(),
        }
    }

    pub fn key(&self) -> char {
        match self {
            Self::CopyPath { key, .. } => *key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub kind: BannerKind,
    pub expires_at: Instant,
    pub action: Option<BannerAction>,
}

/// Holds the one feedback banner on screen. A new banner replaces the old
/// one and restarts the dismiss clock.
#[derive(Debug)]
pub struct BannerSlot {
    current: Option<Banner>,
    duration: Duration,
}

impl BannerSlot {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    pub fn show(&mut self, kind: BannerKind, message: impl Into<String>) {
        self.show_with_action(kind, message, None);
    }

    pub fn show_with_action(
        &mut self,
        kind: BannerKind,
        message: impl Into<String>,
        action: Option<BannerAction>,
    ) {
        let message = message.into();
        tracing::debug!(kind = ?kind, message = %message, "banner_shown");
        self.current = Some(Banner {
            message,
            kind,
            expires_at: Instant::now() + self.duration,
            action,
        });
    }

    pub fn current(&self) -> Option<&Banner> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Drop the banner once it has expired. Returns whether it was dropped.
    pub fn prune(&mut self, now: Instant) -> bool {
        if self
            .current
            .as_ref()
            .is_some_and(|banner| banner.expires_at <= now)
        {
            self.current = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn banner_expires_after_duration() {
        let mut slot = BannerSlot::new(Duration::from_secs(4));
        slot.show(BannerKind::Success, "Registro removido com sucesso.");
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!slot.prune(Instant::now()));
        assert!(slot.current().is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(slot.prune(Instant::now()));
        assert!(slot.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_banner_restarts_clock() {
        let mut slot = BannerSlot::new(Duration::from_secs(4));
        slot.show(BannerKind::Info, "primeiro");
        tokio::time::advance(Duration::from_secs(3)).await;
        slot.show_with_action(
            BannerKind::Success,
            "segundo",
            Some(BannerAction::copy_path('c', "/tmp/a.xlsx")),
        );
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!slot.prune(Instant::now()));
        let banner = slot.current().expect("banner");
        assert_eq!(banner.message, "segundo");
        assert_eq!(banner.action.as_ref().map(BannerAction::key), Some('c'));
    }
}
