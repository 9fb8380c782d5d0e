use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!(error = %err, "Dropping checkout event");
        }
    }
}

// Payment lifecycle events raised by checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PaymentCompleted {
        order_number: String,
        payment_id: Uuid,
    },
    PaymentAwaitingAuthorization {
        order_number: String,
        payment_id: Uuid,
    },
    PaymentFailed {
        order_number: String,
        message: String,
    },
    CardSaved {
        card_id: Uuid,
    },
    OrderRegistered(String),
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::PaymentCompleted {
                order_number,
                payment_id,
            } => {
                info!(%order_number, %payment_id, "Payment completed");
            }
            Event::PaymentAwaitingAuthorization {
                order_number,
                payment_id,
            } => {
                info!(%order_number, %payment_id, "Payment awaiting customer authorization");
            }
            Event::PaymentFailed {
                order_number,
                message,
            } => {
                warn!(%order_number, %message, "Payment failed");
            }
            Event::CardSaved { card_id } => {
                info!(%card_id, "Card saved for reuse");
            }
            Event::OrderRegistered(order_number) => {
                info!(%order_number, "Order registered");
            }
        }
    }

    info!("Event processing loop stopped");
}
