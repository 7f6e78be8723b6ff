use floor_flow_shared::collaborators::{NotificationEvent, NotificationSink};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

/// Hands events to the delivery worker without waiting. A full queue drops
/// the event.
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<NotificationEvent>,
}

impl NotificationSink for ChannelNotifier {
    fn dispatch(&self, event: NotificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    "notification queue full; dropping {} for user {}",
                    event.kind(),
                    event.recipient()
                );
            },
            Err(TrySendError::Closed(event)) => {
                tracing::warn!("notification worker stopped; dropping {}", event.kind());
            },
        }
    }
}

/// Spawns the delivery worker. It exits once every notifier clone is dropped
/// and yields the number of delivered events.
pub fn spawn_notification_worker(capacity: usize) -> (ChannelNotifier, JoinHandle<usize>) {
    let (sender, mut receiver) = mpsc::channel::<NotificationEvent>(capacity.max(1));
    let handle = tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(event) = receiver.recv().await {
            match deliver(&event) {
                Ok(()) => delivered += 1,
                Err(err) => tracing::error!("notification delivery failed: {err}"),
            }
        }
        tracing::info!("notification worker stopped after {delivered} deliveries");
        delivered
    });
    (ChannelNotifier { sender }, handle)
}

fn deliver(event: &NotificationEvent) -> serde_json::Result<()> {
    let payload = serde_json::to_string(event)?;
    tracing::info!("notify user {} ({}): {payload}", event.recipient(), event.kind());
    Ok(())
}
