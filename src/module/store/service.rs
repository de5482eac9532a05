use super::StoreDirectory;
use crate::harness::Service;
use crate::library::communication::request::Responder;
use crate::library::communication::CommunicationFactory;
use std::marker::PhantomData;

/// Service answering [`StoreInfoRequests`](crate::domain::request::StoreInfoRequest)
/// through a [`StoreDirectory`]
pub struct StoreInfoResponderService<F: CommunicationFactory> {
    phantom: PhantomData<F>,
}

impl<F> Service<F> for StoreInfoResponderService<F>
where
    F: CommunicationFactory + Send + Sync,
{
    const NAME: &'static str = "StoreInfoResponderService";
    type Instance = Responder<StoreDirectory, F::NotificationPublisher>;
    type Config = StoreDirectory;

    fn instantiate(factory: F, config: &Self::Config) -> Self::Instance {
        Responder::new(config.clone(), factory.notification_publisher())
    }
}
