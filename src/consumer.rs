use std::{future::Future, sync::Arc};

use tokio::task::{JoinError, JoinSet};
use tokio_stream::{Stream, StreamExt as _};
use tracing::{error, info, warn};

use crate::{
    classifier::Classify,
    reading::Reading,
    status::StatusUpdate,
    transport::StatusTransport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryOutcome {
    Delivered,
    Failed,
}

/// Counters collected while consuming a reading stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    pub readings: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl ConsumerStats {
    fn record(&mut self, joined: Result<DeliveryOutcome, JoinError>) {
        match joined {
            Ok(DeliveryOutcome::Delivered) => self.delivered += 1,
            Ok(DeliveryOutcome::Failed) => self.failed += 1,
            Err(err) => {
                error!(error = %err, "Delivery task aborted");
                self.failed += 1;
            }
        }
    }
}

/// Classifies readings and hands each resulting status update to a transport.
///
/// Every delivery runs as its own task, so a slow or failing send never holds up
/// the next reading. Deliveries may complete out of order.
pub struct StreamConsumer {
    classifier: Arc<dyn Classify>,
    transport: Arc<dyn StatusTransport>,
}

impl StreamConsumer {
    pub fn new(classifier: Arc<dyn Classify>, transport: Arc<dyn StatusTransport>) -> Self {
        Self {
            classifier,
            transport,
        }
    }

    pub fn status_update(&self, reading: Reading) -> StatusUpdate {
        let state = self.classifier.classify(&reading);
        StatusUpdate::new(reading.device_id, state, reading.attributes)
    }

    /// Consumes `readings` until the stream ends or `shutdown` resolves, then waits
    /// for in-flight deliveries.
    pub async fn run<S, F>(&self, readings: S, shutdown: F) -> ConsumerStats
    where
        S: Stream<Item = Reading>,
        F: Future<Output = ()>,
    {
        tokio::pin!(readings);
        tokio::pin!(shutdown);

        let mut in_flight = JoinSet::new();
        let mut stats = ConsumerStats::default();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping consumer");
                    break;
                }
                next = readings.next() => {
                    let Some(reading) = next else {
                        info!("Reading stream ended");
                        break;
                    };
                    stats.readings += 1;

                    let update = self.status_update(reading);
                    in_flight.spawn(deliver(Arc::clone(&self.transport), update));
                }
            }

            while let Some(joined) = in_flight.try_join_next() {
                stats.record(joined);
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            stats.record(joined);
        }

        info!(
            readings = stats.readings,
            delivered = stats.delivered,
            failed = stats.failed,
            "Consumer stopped"
        );
        stats
    }
}

async fn deliver(transport: Arc<dyn StatusTransport>, update: StatusUpdate) -> DeliveryOutcome {
    let device_id = update.device_id_str().unwrap_or_default().to_string();
    let state = update.state_str().unwrap_or_default().to_string();

    match transport.send(update).await {
        Ok(delivery) => {
            info!(
                device_id = %device_id,
                state = %state,
                status = delivery.status,
                observed_at = %delivery.record.observed_at,
                "Delivered status update"
            );
            DeliveryOutcome::Delivered
        }
        Err(err) => {
            warn!(
                device_id = %device_id,
                state = %state,
                error = %err,
                "Failed to deliver status update"
            );
            DeliveryOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Mutex,
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::{
        classifier::ThresholdClassifier,
        error::TransportError,
        reading::Attributes,
        status::{OperationalState, StatusRecord},
        transport::{Delivery, MockStatusTransport},
    };

    fn reading(device_id: &str, acceleration: f64) -> Reading {
        let mut attributes = Attributes::new();
        attributes.insert("acceleration".to_string(), json!(acceleration));
        Reading::new(device_id, attributes)
    }

    fn accepted(update: &StatusUpdate) -> Delivery {
        Delivery {
            status: 200,
            record: StatusRecord {
                device_id: update.device_id_str().unwrap().to_string(),
                state: update.state_str().unwrap().parse().unwrap(),
                payload: Attributes::new(),
                observed_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_status_update_carries_classification_and_payload() {
        let consumer = StreamConsumer::new(
            Arc::new(ThresholdClassifier::default()),
            Arc::new(MockStatusTransport::new()),
        );

        let update = consumer.status_update(reading("AA:BB", 1500.0));

        assert_eq!(update.device_id_str(), Some("AA:BB"));
        assert_eq!(update.state_str(), Some("running"));
        assert_eq!(update.payload, Some(json!({"acceleration": 1500.0})));
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_stop_consumption() {
        let mut transport = MockStatusTransport::new();
        transport
            .expect_send()
            .withf(|update: &StatusUpdate| update.device_id_str() == Some("AA:01"))
            .times(1)
            .returning(|_| {
                Err(TransportError::Timeout {
                    url: "http://localhost:5100/update_status".to_string(),
                })
            });
        transport
            .expect_send()
            .withf(|update: &StatusUpdate| update.device_id_str() == Some("AA:02"))
            .times(2)
            .returning(|update| Ok(accepted(&update)));

        let consumer = StreamConsumer::new(
            Arc::new(ThresholdClassifier::default()),
            Arc::new(transport),
        );
        let readings = tokio_stream::iter(vec![
            reading("AA:01", 1500.0),
            reading("AA:02", 10.0),
            reading("AA:02", 2000.0),
        ]);

        let stats = consumer.run(readings, std::future::pending()).await;

        assert_eq!(
            stats,
            ConsumerStats {
                readings: 3,
                delivered: 2,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_infinite_stream() {
        let mut transport = MockStatusTransport::new();
        transport
            .expect_send()
            .returning(|update| Ok(accepted(&update)));

        let consumer = StreamConsumer::new(
            Arc::new(|_: &Reading| OperationalState::Idle),
            Arc::new(transport),
        );
        let readings = tokio_stream::iter(std::iter::repeat_with(|| reading("AA:BB", 0.0)))
            .throttle(Duration::from_millis(5));

        let stats = consumer
            .run(readings, tokio::time::sleep(Duration::from_millis(100)))
            .await;

        assert!(stats.readings > 0);
        assert_eq!(stats.delivered, stats.readings);
        assert_eq!(stats.failed, 0);
    }

    /// Holds deliveries for one device and records completion order.
    struct SlowForDevice {
        slow_device: &'static str,
        completed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StatusTransport for SlowForDevice {
        async fn send(&self, update: StatusUpdate) -> Result<Delivery, TransportError> {
            let device_id = update.device_id_str().unwrap().to_string();
            if device_id == self.slow_device {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            self.completed.lock().unwrap().push(device_id);
            Ok(accepted(&update))
        }
    }

    #[tokio::test]
    async fn test_slow_delivery_does_not_block_other_devices() {
        let transport = Arc::new(SlowForDevice {
            slow_device: "AA:SLOW",
            completed: Mutex::new(Vec::new()),
        });
        let consumer = StreamConsumer::new(
            Arc::new(ThresholdClassifier::default()),
            transport.clone(),
        );
        let readings = tokio_stream::iter(vec![
            reading("AA:SLOW", 1500.0),
            reading("AA:01", 0.0),
            reading("AA:02", 0.0),
        ]);

        let stats = consumer.run(readings, std::future::pending()).await;

        assert_eq!(stats.delivered, 3);
        let completed = transport.completed.lock().unwrap().clone();
        assert_eq!(completed.last().map(String::as_str), Some("AA:SLOW"));
    }
}
