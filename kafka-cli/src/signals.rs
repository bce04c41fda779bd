use std::fmt;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("interrupt"),
            TerminationSignal::Terminate => f.write_str("terminated"),
        }
    }
}

/// Non-blocking view of the shutdown slot. Yields the signal at most once.
pub struct ShutdownToken {
    rx: watch::Receiver<Option<TerminationSignal>>,
    taken: bool,
}

impl ShutdownToken {
    pub fn try_take(&mut self) -> Option<TerminationSignal> {
        if self.taken {
            return None;
        }
        let signal = *self.rx.borrow_and_update();
        self.taken = signal.is_some();
        signal
    }
}

pub struct ShutdownTrigger {
    tx: watch::Sender<Option<TerminationSignal>>,
}

impl ShutdownTrigger {
    /// Only the first signal is kept.
    pub fn fire(&self, signal: TerminationSignal) {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(signal);
            true
        });
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownToken) {
    let (tx, rx) = watch::channel(None);
    (
        ShutdownTrigger { tx },
        ShutdownToken { rx, taken: false },
    )
}

pub struct SignalWatcher;

impl SignalWatcher {
    /// Registers SIGINT and SIGTERM handlers and returns the token they fire into.
    /// Must be called from within a tokio runtime.
    pub fn install() -> std::io::Result<ShutdownToken> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let (trigger, token) = shutdown_channel();

        tokio::spawn(async move {
            let received = tokio::select! {
                Some(()) = sigint.recv() => TerminationSignal::Interrupt,
                Some(()) = sigterm.recv() => TerminationSignal::Terminate,
                else => {
                    error!("signal streams closed before any signal arrived");
                    return;
                }
            };
            info!("received {}", received);
            trigger.fire(received);
        });

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_empty_until_fired() {
        let (_trigger, mut token) = shutdown_channel();
        assert_eq!(token.try_take(), None);
        assert_eq!(token.try_take(), None);
    }

    #[test]
    fn test_signal_taken_at_most_once() {
        let (trigger, mut token) = shutdown_channel();
        trigger.fire(TerminationSignal::Interrupt);

        assert_eq!(token.try_take(), Some(TerminationSignal::Interrupt));
        assert_eq!(token.try_take(), None);
    }

    #[test]
    fn test_first_signal_wins() {
        let (trigger, mut token) = shutdown_channel();
        trigger.fire(TerminationSignal::Terminate);
        trigger.fire(TerminationSignal::Interrupt);

        assert_eq!(token.try_take(), Some(TerminationSignal::Terminate));
    }

    #[test]
    fn test_signal_survives_dropped_trigger() {
        let (trigger, mut token) = shutdown_channel();
        trigger.fire(TerminationSignal::Interrupt);
        drop(trigger);

        assert_eq!(token.try_take(), Some(TerminationSignal::Interrupt));
    }

    #[tokio::test]
    async fn test_install_does_not_fire_without_signal() {
        let mut token = SignalWatcher::install().expect("signal handlers install");
        tokio::task::yield_now().await;
        assert_eq!(token.try_take(), None);
    }
}
