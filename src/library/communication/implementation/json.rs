//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! This module allows implementors of traits that allow raw access to underlying messaging
//! systems to provide the higher-level traits relying on serialization. It does so by
//! providing a number of marker traits which, when implemented, provide default
//! implementations of the higher-level traits by translating between lower-level serialized
//! data and higher-level strongly typed data using [`serde_json`]. In the future, this
//! allows for an easy exchange of the serialization algorithm by changing the marker traits.

use super::super::event::{
    Notification, NotificationPublisher, QueueDescriptorExtension, QueueEntry,
    RawNotificationPublisher, RawQueueEntry, RoutingKey,
};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::Deserialize;

/// Marker trait providing a default [`NotificationPublisher`] implementation based on [`serde_json`]
pub trait JsonNotificationPublisher: RawNotificationPublisher + Send + Sync {}

#[async_trait]
impl<P> NotificationPublisher for P
where
    P: JsonNotificationPublisher,
{
    /// Serializes the notification using [`serde_json::to_string`]
    async fn publish<N: Notification + Send + Sync>(&self, notification: &N) -> EmptyResult {
        let data = serde_json::to_string(notification)?;
        self.publish_raw(data.as_bytes(), N::queue(), None, None)
            .await
    }

    /// Serializes the notification using [`serde_json::to_string`]
    async fn publish_with_extension<N: Notification + Send + Sync>(
        &self,
        notification: &N,
        extension: QueueDescriptorExtension,
    ) -> EmptyResult {
        let data = serde_json::to_string(notification)?;
        self.publish_raw(data.as_bytes(), N::queue(), Some(extension), None)
            .await
    }

    /// Serializes the notification using [`serde_json::to_string`]
    async fn publish_keyed<N: Notification + Send + Sync>(
        &self,
        notification: &N,
        routing: RoutingKey,
    ) -> EmptyResult {
        let data = serde_json::to_string(notification)?;
        self.publish_raw(data.as_bytes(), N::queue(), None, Some(routing))
            .await
    }
}

/// Marker trait providing a default [`QueueEntry`] implementation based on [`serde_json`]
pub trait JsonQueueEntry: RawQueueEntry {}

impl<E> QueueEntry for E
where
    E: JsonQueueEntry,
{
    /// Parses the payload using [`serde_json::from_slice`]
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>,
    {
        serde_json::from_slice(self.payload()).map_err(Into::into)
    }
}
