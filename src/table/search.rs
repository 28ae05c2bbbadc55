use std::time::Duration;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time::Instant};

use super::TableEvent;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(350);

/// Turns raw keystrokes into a committed search term once typing pauses.
pub struct SearchDebouncer {
    raw: String,
    committed: String,
    quiet: Duration,
    seq: u64,
    timer: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            raw: String::new(),
            committed: String::new(),
            quiet,
            seq: 0,
            timer: None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// Record a keystroke and re-arm the commit timer.
    pub fn input(&mut self, text: impl Into<String>, tx: &UnboundedSender<TableEvent>) {
        self.raw = text.into();
        self.cancel();
        let seq = self.seq;
        let deadline = Instant::now() + self.quiet;
        let tx = tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(TableEvent::SearchCommitted { seq });
        }));
    }

    /// Apply a fired timer. Returns the new committed term when it changed.
    pub fn commit(&mut self, seq: u64) -> Option<String> {
        if seq != self.seq {
            tracing::trace!(seq, current = self.seq, "stale_search_commit");
            return None;
        }
        self.timer = None;
        let term = self.raw.trim().to_string();
        if term == self.committed {
            return None;
        }
        self.committed = term.clone();
        Some(term)
    }

    /// Abort the pending timer; a commit already queued becomes stale.
    pub fn cancel(&mut self) {
        self.seq = self.seq.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn reset(&mut self) {
        self.cancel();
        self.raw.clear();
        self.committed.clear();
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    fn take_commit(event: TableEvent) -> u64 {
        match event {
            TableEvent::SearchCommitted { seq } => seq,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_commits_once() {
        let (tx, mut rx) = unbounded_channel();
        let mut search = SearchDebouncer::new(DEFAULT_QUIET_PERIOD);
        let typed = ["j", "jo", "joã", "joão", " joão "];
        for text in typed {
            search.input(text, &tx);
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        let seq = take_commit(rx.recv().await.expect("timer fires"));
        assert_eq!(search.commit(seq).as_deref(), Some("joão"));
        assert_eq!(search.committed(), "joão");

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_commits_before_quiet_period() {
        let (tx, mut rx) = unbounded_channel();
        let mut search = SearchDebouncer::new(DEFAULT_QUIET_PERIOD);
        search.input("ana", &tx);
        tokio::time::advance(Duration::from_millis(349)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert!(search.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_term_is_not_recommitted() {
        let (tx, mut rx) = unbounded_channel();
        let mut search = SearchDebouncer::new(DEFAULT_QUIET_PERIOD);
        search.input("setor", &tx);
        let seq = take_commit(rx.recv().await.expect("timer fires"));
        assert_eq!(search.commit(seq).as_deref(), Some("setor"));

        search.input("setor  ", &tx);
        let seq = take_commit(rx.recv().await.expect("timer fires"));
        assert_eq!(search.commit(seq), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_pending_commit() {
        let (tx, mut rx) = unbounded_channel();
        let mut search = SearchDebouncer::new(DEFAULT_QUIET_PERIOD);
        search.input("joão", &tx);
        search.reset();
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(search.raw(), "");
        assert_eq!(search.committed(), "");
        assert!(!search.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn queued_commit_is_stale_after_cancel() {
        let (tx, mut rx) = unbounded_channel();
        let mut search = SearchDebouncer::new(DEFAULT_QUIET_PERIOD);
        search.input("ana", &tx);
        let seq = take_commit(rx.recv().await.expect("timer fires"));
        search.cancel();
        assert_eq!(search.commit(seq), None);
        assert_eq!(search.committed(), "");
    }
}
