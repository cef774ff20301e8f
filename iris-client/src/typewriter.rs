//! Character-by-character reveal of the interpretation text

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

/// Default delay between revealed characters
pub const DEFAULT_TICK: Duration = Duration::from_millis(20);

/// Incremental reveal, advanced one step per [`Typewriter::tick`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Typewriter {
    chars: Vec<char>,
    shown: usize,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with new text
    pub fn set_text(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.shown = 0;
    }

    /// Reveal one more character; `false` once everything is shown
    pub fn tick(&mut self) -> bool {
        if self.is_done() {
            return false;
        }
        self.shown += 1;
        true
    }

    pub fn visible(&self) -> String {
        self.chars[..self.shown].iter().collect()
    }

    pub fn is_done(&self) -> bool {
        self.shown >= self.chars.len()
    }

    /// Run a reveal on a timer; text sent through the returned driver
    /// restarts the reveal from the first character
    pub fn drive(period: Duration) -> TypewriterDriver {
        let (input_tx, mut input_rx) = watch::channel(String::new());
        let (output_tx, output_rx) = watch::channel(String::new());
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut writer = Typewriter::new();
            let mut ticker = interval(period);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = input_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let text = input_rx.borrow_and_update().clone();
                        writer.set_text(&text);
                        output_tx.send_replace(writer.visible());
                        ticker.reset();
                    }
                    _ = ticker.tick(), if !writer.is_done() => {
                        writer.tick();
                        output_tx.send_replace(writer.visible());
                    }
                }
            }
        });

        TypewriterDriver {
            input: input_tx,
            output: output_rx,
            cancel,
            task,
        }
    }
}

/// Handle to a running reveal; dropping it stops the timer
pub struct TypewriterDriver {
    input: watch::Sender<String>,
    output: watch::Receiver<String>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TypewriterDriver {
    /// Replace the text being revealed
    pub fn show(&self, text: impl Into<String>) {
        self.input.send_replace(text.into());
    }

    /// Text revealed so far
    pub fn visible(&self) -> String {
        self.output.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.output.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TypewriterDriver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
