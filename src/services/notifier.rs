// src/services/notifier.rs
//
// Fire-and-forget notification dispatch. Senders only push a message onto
// a channel; a worker task spawned at startup resolves the reservation and
// emits the "notification requested" signal. Nothing here is ever awaited
// inside a mutating transaction, and a delivery failure never becomes a
// caller-visible error.
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum Notification {
    ReservationConfirmation { reservation_id: Uuid },
    ReservationReminder { reservation_id: Uuid },
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Spawns the dispatch worker and returns a handle for senders.
    pub fn spawn(pool: PgPool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_worker(pool, rx));
        Self { tx }
    }

    /// Handle with no worker behind it; everything sent is dropped.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    pub fn reservation_confirmation(&self, reservation_id: Uuid) {
        self.send(Notification::ReservationConfirmation { reservation_id });
    }

    pub fn reservation_reminder(&self, reservation_id: Uuid) {
        self.send(Notification::ReservationReminder { reservation_id });
    }

    fn send(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!(?notification, "Notification worker is gone, dropping notification");
        }
    }
}

async fn dispatch_worker(pool: PgPool, mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        if let Err(e) = dispatch(&pool, notification).await {
            warn!(?notification, error = %e, "Failed to dispatch notification");
        }
    }
}

async fn dispatch(pool: &PgPool, notification: Notification) -> Result<(), sqlx::Error> {
    let (kind, reservation_id) = match notification {
        Notification::ReservationConfirmation { reservation_id } => {
            ("reservation_confirmation", reservation_id)
        }
        Notification::ReservationReminder { reservation_id } => {
            ("reservation_reminder", reservation_id)
        }
    };

    let row: Option<(String, Option<String>, Option<String>)> = sqlx::query_as(
        r#"SELECT r.reservation_number, c.business_name, c.email
           FROM reservations r
           JOIN customers c ON c.customer_id = r.customer_id
           WHERE r.reservation_id = $1"#,
    )
    .bind(reservation_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((reservation_number, _, email)) => {
            info!(
                kind,
                %reservation_id,
                reservation_number,
                recipient = email.as_deref().unwrap_or("unknown"),
                "Notification requested"
            );
        }
        None => {
            warn!(kind, %reservation_id, "Notification target no longer exists");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_after_worker_gone_does_not_panic() {
        let notifier = Notifier::disconnected();
        notifier.reservation_confirmation(Uuid::new_v4());
        notifier.reservation_reminder(Uuid::new_v4());
    }
}
