use tracing::{debug, warn};
use uuid::Uuid;

/// Actions a notification can offer back to the user. `Snooze` round-trips
/// through the message channel into the engine, arbitrarily after the
/// notification fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Snooze,
    Dismiss,
}

impl NotifyAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Snooze => "snooze",
            Self::Dismiss => "dismiss",
        }
    }
}

/// Notification-emission collaborator. Emission is best-effort: platform
/// permission or capability absence degrades to no notification, never to
/// an error reaching the engine.
pub trait Notifier {
    fn available(&self) -> bool;

    fn show(&self, title: &str, body: &str, correlation_id: Uuid, actions: &[NotifyAction]);
}

/// Used when notifications are disabled or unsupported; the engine still
/// checks `available()` before composing anything.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn available(&self) -> bool {
        false
    }

    fn show(&self, _title: &str, _body: &str, _correlation_id: Uuid, _actions: &[NotifyAction]) {}
}

/// Desktop notifications via the platform notification service.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn available(&self) -> bool {
        true
    }

    fn show(&self, title: &str, body: &str, correlation_id: Uuid, actions: &[NotifyAction]) {
        let mut body = body.to_string();
        if actions.contains(&NotifyAction::Snooze) {
            body.push_str("\n(type `snooze <minutes>` in the watch console to snooze)");
        }

        let result = notify_rust::Notification::new()
            .summary(title)
            .body(&body)
            .appname("tickler")
            .show();

        match result {
            Ok(_) => debug!(id = %correlation_id, "desktop notification shown"),
            Err(err) => {
                warn!(id = %correlation_id, error = %err, "desktop notification unavailable");
            }
        }
    }
}
