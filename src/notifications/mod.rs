//! Generic Pub/Sub Notification System
//! 
//! A process-wide event bus connecting the extension manager, the backend
//! updater and any UI surface that wants to follow them.
//! 
//! # Architecture
//! 
//! - **Publishers**: components that emit events (activation pipeline, lifecycle, backend updater)
//! - **Subscribers**: components that handle events
//! - **AsyncNotificationManager**: routes events to subscribers
//! - **Events**: typed messages identified by a stable event name
//! 
//! # Example Usage
//! 
//! ```no_run
//! use extman::notifications::{AsyncNotificationManager, ExtensionEvent, NotificationManager};
//! 
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = AsyncNotificationManager::<ExtensionEvent>::new();
//! manager.publish(ExtensionEvent::unloaded("conversational")).await?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod manager;
pub mod events;
pub mod error;


pub use traits::{
    CallbackSubscriber, DeliveryStats, EventFilter, NotificationManager, OverflowAction,
    Publisher, RateLimit, Subscriber,
};
pub use manager::{AsyncNotificationManager, SubscriberStats};
pub use events::{ExtensionEvent, NotificationEvent};
pub use error::{NotificationError, NotificationResult};
