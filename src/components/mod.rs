// Export components
pub mod calendar_feed;
pub mod calendar_watch;
pub mod notifier;

pub use calendar_feed::{CalendarEvent, EventSource, IcsFeed};
pub use calendar_watch::CalendarScheduler;
pub use notifier::{DiscordNotifier, Notifier};
