use crossbeam_channel::Sender;

/// Notifications emitted while a compilation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Status(String),
    /// Percentage in `0..=100`, never decreasing within one compilation.
    Progress(u8),
    Finished { success: bool, message: String },
}

/// Sends [`BuildEvent`]s, ignoring a disconnected receiver.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: Option<Sender<BuildEvent>>,
    progress: u8,
}

impl Notifier {
    pub fn new(sender: Sender<BuildEvent>) -> Self {
        Self {
            sender: Some(sender),
            progress: 0,
        }
    }

    /// A notifier that drops every event.
    pub fn silent() -> Self {
        Self {
            sender: None,
            progress: 0,
        }
    }

    fn send(&self, event: BuildEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    pub fn status(&self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        self.send(BuildEvent::Status(text));
    }

    /// Reports `percent` unless it would move progress backwards.
    pub fn progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent < self.progress {
            return;
        }
        self.progress = percent;
        self.send(BuildEvent::Progress(percent));
    }

    pub fn finished(&self, success: bool, message: impl Into<String>) {
        self.send(BuildEvent::Finished {
            success,
            message: message.into(),
        });
    }
}
