pub mod ruuvi;

use anyhow::{Context as _, Result};
use beacon_status::reading::Reading;
use btleplug::{
    api::{Central, CentralEvent, Peripheral as _},
    platform::Adapter,
};
use macaddr::MacAddr6;
use tokio::sync::mpsc;
use tokio_stream::StreamExt as _;
use tracing::debug;

use crate::ble::ruuvi::{RUUVI_MANUFACTURER_DATA_COMPANY_ID, decode_ruuvi_manufacturer_data};

/// Forwards decoded RuuviTag advertisements to `sender` until the adapter's event
/// stream ends or the receiver is dropped.
pub async fn forward_readings(adapter: Adapter, sender: mpsc::Sender<Reading>) -> Result<()> {
    let mut events = adapter
        .events()
        .await
        .context("failed to subscribe to BLE events")?;

    while let Some(event) = events.next().await {
        let CentralEvent::ManufacturerDataAdvertisement {
            id,
            manufacturer_data,
        } = event
        else {
            continue;
        };

        let Some(data) = manufacturer_data.get(&RUUVI_MANUFACTURER_DATA_COMPANY_ID) else {
            continue;
        };

        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(err) => {
                debug!(peripheral = ?id, error = %err, "BLE peripheral not available");
                continue;
            }
        };

        let mac_address: MacAddr6 = peripheral.address().into_inner().into();

        let attributes = match decode_ruuvi_manufacturer_data(data) {
            Ok(a) => a,
            Err(err) => {
                debug!(%mac_address, error = %format!("{err:#}"), "failed to decode RuuviTag data");
                continue;
            }
        };

        if sender
            .send(Reading::new(mac_address.to_string(), attributes))
            .await
            .is_err()
        {
            break;
        }
    }

    Ok(())
}
