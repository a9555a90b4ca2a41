use serde::{Deserialize, Serialize};

use shop_members::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Ready,
    Completed,
}

/// Shipping leg of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    address: Address,
    status: DeliveryStatus,
}

impl Delivery {
    /// A delivery waiting to be shipped.
    pub fn ready(address: Address) -> Self {
        Self {
            address,
            status: DeliveryStatus::Ready,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == DeliveryStatus::Completed
    }

    pub(crate) fn complete(&mut self) {
        self.status = DeliveryStatus::Completed;
    }
}
