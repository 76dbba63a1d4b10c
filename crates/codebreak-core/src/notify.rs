//! Notification routing.
//!
//! Maps a timer completion to the delivery channels the active profile has
//! enabled. Channel implementations (sound, popup, screen flash, tray
//! message) are collaborators behind [`NotificationChannel`]; one channel
//! failing never blocks the others, and a full-screen foreground application
//! suppresses delivery entirely when the platform probe can tell us so.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::profile::{NotificationType, Profile};

type ChannelError = Box<dyn std::error::Error + Send + Sync>;

/// A rendered reminder ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn for_kind(kind: NotificationType) -> Self {
        Self {
            kind,
            title: kind.label().to_string(),
            message: kind.message().to_string(),
        }
    }
}

/// Which profile switch gates a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelGate {
    Sound,
    Popup,
    Flash,
    /// Delivered whenever the notification itself is enabled.
    Always,
}

/// A single delivery mechanism.
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    fn gate(&self) -> ChannelGate {
        ChannelGate::Always
    }

    fn deliver(&self, notification: &Notification) -> Result<(), ChannelError>;
}

/// Asks the platform whether a full-screen application is in the foreground.
pub trait ForegroundProbe: Send + Sync {
    fn fullscreen_app_active(&self) -> Result<bool, ChannelError>;
}

/// Probe for platforms without a usable check: never suppresses.
pub struct NoProbe;

impl ForegroundProbe for NoProbe {
    fn fullscreen_app_active(&self) -> Result<bool, ChannelError> {
        Ok(false)
    }
}

/// Channel that reports deliveries through the log; the default sink when no
/// platform channels are wired up.
pub struct LogChannel;

impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, notification: &Notification) -> Result<(), ChannelError> {
        info!(kind = ?notification.kind, "{}: {}", notification.title, notification.message);
        Ok(())
    }
}

/// Routes timer completions to enabled channels, filtered by the current
/// profile's settings.
pub struct NotificationRouter {
    channels: Vec<Box<dyn NotificationChannel>>,
    probe: Box<dyn ForegroundProbe>,
    /// Value snapshot of the active profile, refreshed on ProfileChanged.
    profile: Mutex<Option<Profile>>,
}

impl NotificationRouter {
    pub fn new(
        channels: Vec<Box<dyn NotificationChannel>>,
        probe: Box<dyn ForegroundProbe>,
    ) -> Arc<Self> {
        Arc::new(Self {
            channels,
            probe,
            profile: Mutex::new(None),
        })
    }

    /// Refresh the profile snapshot the router filters against.
    pub fn set_profile(&self, profile: Option<Profile>) {
        *lock(&self.profile) = profile;
    }

    /// Deliver a reminder through every applicable channel. Returns the
    /// number of channels that accepted it.
    pub fn dispatch(&self, kind: NotificationType) -> usize {
        let profile = lock(&self.profile).clone();

        // No profile means no filter.
        if let Some(ref profile) = profile {
            if !profile.is_notification_enabled(kind) {
                debug!(kind = ?kind, profile = %profile.name, "reminder disabled, skipping");
                return 0;
            }
        }

        match self.probe.fullscreen_app_active() {
            Ok(true) => {
                debug!(kind = ?kind, "full-screen application active, suppressing reminder");
                return 0;
            }
            Ok(false) => {}
            // An unusable probe must not silence reminders.
            Err(e) => debug!(error = %e, "foreground probe failed, showing anyway"),
        }

        let notification = Notification::for_kind(kind);
        let mut delivered = 0;
        for channel in &self.channels {
            if !channel_enabled(channel.gate(), profile.as_ref()) {
                continue;
            }
            match channel.deliver(&notification) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "notification channel failed")
                }
            }
        }
        delivered
    }

    /// Re-dispatch `kind` after `minutes`, without blocking the caller.
    /// Best-effort: there is no cancellation once scheduled.
    pub fn snooze(self: &Arc<Self>, kind: NotificationType, minutes: u32) {
        info!(kind = ?kind, minutes, "snoozing reminder");
        let router = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(minutes) * 60)).await;
            router.dispatch(kind);
        });
    }
}

fn channel_enabled(gate: ChannelGate, profile: Option<&Profile>) -> bool {
    let Some(profile) = profile else {
        return true;
    };
    match gate {
        ChannelGate::Sound => profile.sound_enabled,
        ChannelGate::Popup => profile.popup_enabled,
        ChannelGate::Flash => profile.flash_enabled,
        ChannelGate::Always => true,
    }
}

// A poisoned lock still holds a consistent snapshot.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingChannel {
        name: &'static str,
        gate: ChannelGate,
        delivered: Arc<AtomicUsize>,
    }

    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            self.name
        }
        fn gate(&self) -> ChannelGate {
            self.gate
        }
        fn deliver(&self, _: &Notification) -> Result<(), ChannelError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingChannel;

    impl NotificationChannel for FailingChannel {
        fn name(&self) -> &str {
            "broken"
        }
        fn deliver(&self, _: &Notification) -> Result<(), ChannelError> {
            Err("speaker missing".into())
        }
    }

    struct FullscreenProbe(bool);

    impl ForegroundProbe for FullscreenProbe {
        fn fullscreen_app_active(&self) -> Result<bool, ChannelError> {
            Ok(self.0)
        }
    }

    struct BrokenProbe;

    impl ForegroundProbe for BrokenProbe {
        fn fullscreen_app_active(&self) -> Result<bool, ChannelError> {
            Err("no display server".into())
        }
    }

    fn recording(
        name: &'static str,
        gate: ChannelGate,
    ) -> (Box<dyn NotificationChannel>, Arc<AtomicUsize>) {
        let delivered = Arc::new(AtomicUsize::new(0));
        let channel = RecordingChannel {
            name,
            gate,
            delivered: Arc::clone(&delivered),
        };
        (Box::new(channel), delivered)
    }

    #[test]
    fn dispatch_without_profile_hits_every_channel() {
        let (sound, sound_count) = recording("sound", ChannelGate::Sound);
        let (tray, tray_count) = recording("tray", ChannelGate::Always);
        let router = NotificationRouter::new(vec![sound, tray], Box::new(NoProbe));

        assert_eq!(router.dispatch(NotificationType::Rest), 2);
        assert_eq!(sound_count.load(Ordering::SeqCst), 1);
        assert_eq!(tray_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disabled_reminder_kind_is_skipped() {
        let (tray, tray_count) = recording("tray", ChannelGate::Always);
        let router = NotificationRouter::new(vec![tray], Box::new(NoProbe));
        router.set_profile(Some(Profile::new("Test")));

        // Only Rest is enabled on a fresh profile.
        assert_eq!(router.dispatch(NotificationType::Water), 0);
        assert_eq!(router.dispatch(NotificationType::Rest), 1);
        assert_eq!(tray_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn profile_gates_filter_channels() {
        let (sound, sound_count) = recording("sound", ChannelGate::Sound);
        let (flash, flash_count) = recording("flash", ChannelGate::Flash);
        let (tray, tray_count) = recording("tray", ChannelGate::Always);
        let router = NotificationRouter::new(vec![sound, flash, tray], Box::new(NoProbe));

        let mut profile = Profile::new("Test");
        profile.sound_enabled = false;
        router.set_profile(Some(profile));

        assert_eq!(router.dispatch(NotificationType::Rest), 2);
        assert_eq!(sound_count.load(Ordering::SeqCst), 0);
        assert_eq!(flash_count.load(Ordering::SeqCst), 1);
        assert_eq!(tray_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fullscreen_foreground_suppresses_delivery() {
        let (tray, tray_count) = recording("tray", ChannelGate::Always);
        let router = NotificationRouter::new(vec![tray], Box::new(FullscreenProbe(true)));

        assert_eq!(router.dispatch(NotificationType::Rest), 0);
        assert_eq!(tray_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn broken_probe_defaults_to_showing() {
        let (tray, tray_count) = recording("tray", ChannelGate::Always);
        let router = NotificationRouter::new(vec![tray], Box::new(BrokenProbe));

        assert_eq!(router.dispatch(NotificationType::Rest), 1);
        assert_eq!(tray_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_channel_does_not_block_the_rest() {
        let (tray, tray_count) = recording("tray", ChannelGate::Always);
        let router =
            NotificationRouter::new(vec![Box::new(FailingChannel), tray], Box::new(NoProbe));

        assert_eq!(router.dispatch(NotificationType::Rest), 1);
        assert_eq!(tray_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn snooze_redispatches_after_the_delay() {
        let (tray, tray_count) = recording("tray", ChannelGate::Always);
        let router = NotificationRouter::new(vec![tray], Box::new(NoProbe));

        router.snooze(NotificationType::Rest, 5);
        tokio::time::sleep(Duration::from_secs(4 * 60)).await;
        assert_eq!(tray_count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(tray_count.load(Ordering::SeqCst), 1);
    }
}
