//! Item watching and subscriber resolution.

pub mod participation;
pub mod resolver;
pub mod store;

pub use resolver::{
    SubscriptionReason, WatchSignals, count_subscribers, is_subscribed, subscribers,
    subscription_reason, unset_item_watch, watch_item,
};
