//! Generic Async Notification Manager
//! 
//! Central coordinator for the pub/sub notification system. Manages subscriber
//! registration, event routing, rate limiting, and delivery statistics.
//! 
//! Subscribers are delivered to in subscription order. The subscriber table is
//! only locked while routing decisions are made, never while a handler runs,
//! so a handler may itself publish on the same manager.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tokio::time::timeout;
use log::{debug, warn, error};

use crate::notifications::traits::{
    NotificationManager, Subscriber, RateLimit, OverflowAction, DeliveryStats
};
use crate::notifications::events::NotificationEvent;
use crate::notifications::error::{NotificationError, NotificationResult};

/// Subscriber information with rate limiting and statistics
struct SubscriberInfo<T> 
where 
    T: NotificationEvent
{
    subscriber: Arc<dyn Subscriber<T>>,
    rate_limit: Option<RateLimit>,
    last_event_times: VecDeque<Instant>,
    stats: SubscriberStats,
}

/// Statistics for individual subscribers
#[derive(Debug, Clone, Default)]
pub struct SubscriberStats {
    pub events_received: u64,
    pub events_processed: u64,
    pub events_dropped: u64,
    pub processing_failures: u64,
    pub total_processing_time_us: u64,
    pub last_event_at: Option<SystemTime>,
}

/// Routing decision taken under the subscriber lock
enum Route<T: NotificationEvent> {
    Deliver(Arc<dyn Subscriber<T>>),
    Filtered,
    Dropped,
    Overflow(u32),
}

/// Generic async notification manager
pub struct AsyncNotificationManager<T> 
where 
    T: NotificationEvent
{
    subscribers: Arc<RwLock<IndexMap<String, SubscriberInfo<T>>>>,
    global_stats: Arc<RwLock<DeliveryStats>>,
    default_timeout: Duration,
    shutdown: Arc<RwLock<bool>>,
    max_subscribers: Option<usize>,
}

impl<T> AsyncNotificationManager<T> 
where 
    T: NotificationEvent
{
    /// Create a new notification manager
    pub fn new() -> Self {
        Self::with_config(Duration::from_secs(5), Some(1000))
    }
    
    /// Create a new notification manager with custom configuration
    pub fn with_config(default_timeout: Duration, max_subscribers: Option<usize>) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(IndexMap::new())),
            global_stats: Arc::new(RwLock::new(DeliveryStats::default())),
            default_timeout,
            shutdown: Arc::new(RwLock::new(false)),
            max_subscribers,
        }
    }
    
    async fn is_shutting_down(&self) -> bool {
        *self.shutdown.read().await
    }
    
    /// Check rate limiting for a subscriber, recording the event when admitted
    fn admit(info: &mut SubscriberInfo<T>) -> Result<(), (OverflowAction, u32)> {
        let Some(rate_limit) = &info.rate_limit else {
            return Ok(());
        };

        let now = Instant::now();
        while let Some(&front) = info.last_event_times.front() {
            if now.duration_since(front) >= Duration::from_secs(1) {
                info.last_event_times.pop_front();
            } else {
                break;
            }
        }

        if info.last_event_times.len() >= rate_limit.max_events_per_second as usize {
            return Err((rate_limit.overflow_action, rate_limit.max_events_per_second));
        }

        info.last_event_times.push_back(now);
        Ok(())
    }

    fn route(info: &mut SubscriberInfo<T>, event: &T) -> Route<T> {
        if !info.subscriber.should_receive(event) {
            return Route::Filtered;
        }
        match Self::admit(info) {
            Ok(()) => {
                info.stats.events_received += 1;
                info.stats.last_event_at = Some(SystemTime::now());
                Route::Deliver(Arc::clone(&info.subscriber))
            }
            Err((OverflowAction::Drop, _)) => {
                info.stats.events_dropped += 1;
                Route::Dropped
            }
            Err((OverflowAction::Error, limit)) => Route::Overflow(limit),
        }
    }

    /// Run one handler with the delivery timeout and fold the outcome into its stats
    async fn deliver(
        &self,
        subscriber_id: &str,
        subscriber: Arc<dyn Subscriber<T>>,
        event: T,
    ) -> NotificationResult<()> {
        let start_time = Instant::now();
        let outcome = timeout(self.default_timeout, subscriber.handle_event(event)).await;
        let elapsed = start_time.elapsed();

        let result = match outcome {
            Ok(Ok(())) => {
                debug!("Delivered {} event to '{}' in {:?}", T::kind(), subscriber_id, elapsed);
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Subscriber '{}' failed to process event: {}", subscriber_id, e);
                Err(NotificationError::delivery_failed(subscriber_id, e.to_string()))
            }
            Err(_) => {
                error!("Timeout delivering event to subscriber '{}'", subscriber_id);
                Err(NotificationError::timeout("event_delivery", self.default_timeout.as_millis() as u64))
            }
        };

        let mut subscribers = self.subscribers.write().await;
        if let Some(info) = subscribers.get_mut(subscriber_id) {
            info.stats.total_processing_time_us += elapsed.as_micros() as u64;
            match result {
                Ok(()) => info.stats.events_processed += 1,
                Err(_) => info.stats.processing_failures += 1,
            }
        }

        result
    }

    /// Get delivery statistics
    pub async fn get_stats(&self) -> DeliveryStats {
        self.global_stats.read().await.clone()
    }
    
    /// Get subscriber-specific statistics
    pub async fn get_subscriber_stats(&self, subscriber_id: &str) -> Option<SubscriberStats> {
        let subscribers = self.subscribers.read().await;
        subscribers.get(subscriber_id).map(|info| info.stats.clone())
    }
    
    /// List all subscriber IDs in subscription order
    pub async fn list_subscribers(&self) -> Vec<String> {
        let subscribers = self.subscribers.read().await;
        subscribers.keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl<T> NotificationManager<T> for AsyncNotificationManager<T> 
where 
    T: NotificationEvent
{
    async fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) -> NotificationResult<()> {
        if self.is_shutting_down().await {
            return Err(NotificationError::SystemShutdown);
        }
        
        let subscriber_id = subscriber.subscriber_id().to_string();
        let mut subscribers = self.subscribers.write().await;
        
        if let Some(max) = self.max_subscribers {
            if subscribers.len() >= max {
                return Err(NotificationError::generic(
                    format!("Maximum number of subscribers ({}) reached", max)
                ));
            }
        }
        
        if subscribers.contains_key(&subscriber_id) {
            return Err(NotificationError::subscriber_already_exists(subscriber_id));
        }
        
        let rate_limit = subscriber.rate_limit();
        subscribers.insert(subscriber_id.clone(), SubscriberInfo {
            subscriber,
            rate_limit,
            last_event_times: VecDeque::new(),
            stats: SubscriberStats::default(),
        });
        debug!("Subscribed '{}' to {} notifications", subscriber_id, T::kind());
        
        Ok(())
    }
    
    async fn unsubscribe(&self, subscriber_id: &str) -> NotificationResult<()> {
        let mut subscribers = self.subscribers.write().await;
        
        if subscribers.shift_remove(subscriber_id).is_some() {
            debug!("Unsubscribed '{}' from notifications", subscriber_id);
            Ok(())
        } else {
            Err(NotificationError::subscriber_not_found(subscriber_id))
        }
    }
    
    async fn publish(&self, event: T) -> NotificationResult<()> {
        if self.is_shutting_down().await {
            return Err(NotificationError::SystemShutdown);
        }

        let start_time = Instant::now();
        let mut targets = Vec::new();
        let mut failure_count = 0u64;
        {
            let mut subscribers = self.subscribers.write().await;
            for (subscriber_id, info) in subscribers.iter_mut() {
                match Self::route(info, &event) {
                    Route::Deliver(subscriber) => targets.push((subscriber_id.clone(), subscriber)),
                    Route::Filtered => {}
                    Route::Dropped => {
                        debug!("Rate limit exceeded for subscriber '{}', event dropped", subscriber_id);
                    }
                    Route::Overflow(limit) => {
                        failure_count += 1;
                        warn!("{}", NotificationError::rate_limit_exceeded(subscriber_id.as_str(), limit));
                    }
                }
            }
        }

        let mut delivery_count = 0u64;
        for (subscriber_id, subscriber) in targets {
            match self.deliver(&subscriber_id, subscriber, event.clone()).await {
                Ok(()) => delivery_count += 1,
                Err(e) => {
                    failure_count += 1;
                    warn!("Failed to deliver event to '{}': {}", subscriber_id, e);
                }
            }
        }

        let total_time = start_time.elapsed();
        let mut global_stats = self.global_stats.write().await;
        global_stats.events_published += 1;
        global_stats.events_delivered += delivery_count;
        global_stats.delivery_failures += failure_count;
        if delivery_count > 0 {
            let avg_time = total_time.as_micros() as u64 / delivery_count;
            global_stats.avg_delivery_time_us = (global_stats.avg_delivery_time_us + avg_time) / 2;
        }

        debug!("Published {} to {} subscribers ({} failed) in {:?}",
               event.event_name(), delivery_count, failure_count, total_time);

        Ok(())
    }
    
    async fn publish_to(&self, event: T, subscriber_id: &str) -> NotificationResult<()> {
        if self.is_shutting_down().await {
            return Err(NotificationError::SystemShutdown);
        }

        let route = {
            let mut subscribers = self.subscribers.write().await;
            match subscribers.get_mut(subscriber_id) {
                Some(info) => Self::route(info, &event),
                None => return Err(NotificationError::subscriber_not_found(subscriber_id)),
            }
        };

        let result = match route {
            Route::Deliver(subscriber) => self.deliver(subscriber_id, subscriber, event).await,
            Route::Filtered | Route::Dropped => Ok(()),
            Route::Overflow(limit) => Err(NotificationError::rate_limit_exceeded(subscriber_id, limit)),
        };

        let mut global_stats = self.global_stats.write().await;
        global_stats.events_published += 1;
        match &result {
            Ok(()) => global_stats.events_delivered += 1,
            Err(_) => global_stats.delivery_failures += 1,
        }
        result
    }
    
    async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
    
    async fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers.read().await.contains_key(subscriber_id)
    }
    
    async fn shutdown(&self) -> NotificationResult<()> {
        *self.shutdown.write().await = true;
        
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.len();
        subscribers.clear();
        
        debug!("Notification manager shutdown complete ({} subscribers removed)", removed);
        Ok(())
    }

    async fn get_stats(&self) -> DeliveryStats {
        AsyncNotificationManager::get_stats(self).await
    }
}

impl<T> Default for AsyncNotificationManager<T> 
where 
    T: NotificationEvent
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AsyncNotificationManager<T> 
where 
    T: NotificationEvent
{
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            global_stats: Arc::clone(&self.global_stats),
            default_timeout: self.default_timeout,
            shutdown: Arc::clone(&self.shutdown),
            max_subscribers: self.max_subscribers,
        }
    }
}

impl<T> std::fmt::Debug for AsyncNotificationManager<T>
where
    T: NotificationEvent
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncNotificationManager")
            .field("default_timeout", &self.default_timeout)
            .field("max_subscribers", &self.max_subscribers)
            .finish_non_exhaustive()
    }
}
