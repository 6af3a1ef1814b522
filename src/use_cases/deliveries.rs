use bigdecimal::BigDecimal;
use std::sync::Arc;

use crate::domain::{Delivery, DeliveryDetails};
use crate::error::CheckoutResult;
use crate::ports::DeliveryRepository;

pub struct DeliveryService {
    delivery_repository: Arc<dyn DeliveryRepository>,
}

impl DeliveryService {
    pub fn new(delivery_repository: Arc<dyn DeliveryRepository>) -> Self {
        Self {
            delivery_repository,
        }
    }

    /// Persists the delivery together with its server-computed fee.
    pub async fn register(&self, details: &DeliveryDetails, fee: &BigDecimal) -> CheckoutResult<Delivery> {
        let delivery = self.delivery_repository.insert(details, fee).await?;
        tracing::debug!(delivery_id = %delivery.id, fee = %delivery.fee, "Delivery registered");
        Ok(delivery)
    }
}
