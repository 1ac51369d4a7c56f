use anyhow::{Result, bail};
use beacon_status::reading::Attributes;
use serde_json::{Value, json};

// Ref: https://docs.ruuvi.com/communication/bluetooth-advertisements
pub const RUUVI_MANUFACTURER_DATA_COMPANY_ID: u16 = 0x0499;

const RAWV1_DATA_FORMAT: u8 = 0x03;
const RAWV2_DATA_FORMAT: u8 = 0x05;

const RAWV1_LEN: usize = 14;
const RAWV2_LEN: usize = 24;

/// Decodes RuuviTag manufacturer data (company id already stripped) into reading attributes.
///
/// Values the tag reports as "not available" are left out.
pub fn decode_ruuvi_manufacturer_data(manufacturer_data: &[u8]) -> Result<Attributes> {
    let Some(&data_format) = manufacturer_data.first() else {
        bail!("RuuviTag manufacturer data is empty");
    };

    match data_format {
        RAWV1_DATA_FORMAT => decode_rawv1(manufacturer_data),
        RAWV2_DATA_FORMAT => decode_rawv2(manufacturer_data),
        _ => bail!("unsupported RuuviTag data format: 0x{data_format:02x}"),
    }
}

fn decode_rawv1(data: &[u8]) -> Result<Attributes> {
    if data.len() < RAWV1_LEN {
        bail!(
            "RuuviTag RAWv1 data too short: expected at least {RAWV1_LEN} bytes, got {}",
            data.len()
        )
    }

    let humidity = data[1] as f64 * 0.5;
    let temperature_magnitude = (data[2] & 0x7f) as f64 + data[3] as f64 / 100.0;
    let temperature = if data[2] & 0x80 != 0 {
        -temperature_magnitude
    } else {
        temperature_magnitude
    };
    let pressure = u16::from_be_bytes([data[4], data[5]]);
    let acceleration = [
        i16::from_be_bytes([data[6], data[7]]),
        i16::from_be_bytes([data[8], data[9]]),
        i16::from_be_bytes([data[10], data[11]]),
    ];
    let battery = u16::from_be_bytes([data[12], data[13]]);

    let mut attributes = Attributes::new();
    insert(&mut attributes, "data_format", Some(json!(3)));
    insert(&mut attributes, "humidity", Some(json!(round2(humidity))));
    insert(&mut attributes, "temperature", Some(json!(round2(temperature))));
    insert(&mut attributes, "pressure", Some(json!(decode_pressure(pressure))));
    insert_acceleration(&mut attributes, acceleration);
    insert(&mut attributes, "battery", Some(json!(battery)));

    Ok(attributes)
}

fn decode_rawv2(data: &[u8]) -> Result<Attributes> {
    if data.len() < RAWV2_LEN {
        bail!(
            "RuuviTag RAWv2 data too short: expected at least {RAWV2_LEN} bytes, got {}",
            data.len()
        )
    }

    let temperature = i16::from_be_bytes([data[1], data[2]]);
    let humidity = u16::from_be_bytes([data[3], data[4]]);
    let pressure = u16::from_be_bytes([data[5], data[6]]);
    let acceleration = [
        i16::from_be_bytes([data[7], data[8]]),
        i16::from_be_bytes([data[9], data[10]]),
        i16::from_be_bytes([data[11], data[12]]),
    ];
    let power_info = u16::from_be_bytes([data[13], data[14]]);
    let movement_counter = data[15];
    let measurement_sequence_number = u16::from_be_bytes([data[16], data[17]]);
    let mac = &data[18..24];

    let battery_bits = power_info >> 5;
    let tx_power_bits = power_info & 0x1f;

    let mut attributes = Attributes::new();
    insert(&mut attributes, "data_format", Some(json!(5)));
    insert(
        &mut attributes,
        "humidity",
        (humidity != u16::MAX).then(|| json!(round2(humidity as f64 * 0.0025))),
    );
    insert(
        &mut attributes,
        "temperature",
        (temperature != i16::MIN).then(|| json!(round2(temperature as f64 * 0.005))),
    );
    insert(
        &mut attributes,
        "pressure",
        (pressure != u16::MAX).then(|| json!(decode_pressure(pressure))),
    );
    insert_acceleration(&mut attributes, acceleration);
    insert(
        &mut attributes,
        "tx_power",
        (tx_power_bits != 0x1f).then(|| json!(-40 + 2 * tx_power_bits as i32)),
    );
    insert(
        &mut attributes,
        "battery",
        (battery_bits != 0x7ff).then(|| json!(1600 + battery_bits as u32)),
    );
    insert(
        &mut attributes,
        "movement_counter",
        (movement_counter != u8::MAX).then(|| json!(movement_counter)),
    );
    insert(
        &mut attributes,
        "measurement_sequence_number",
        (measurement_sequence_number != u16::MAX).then(|| json!(measurement_sequence_number)),
    );
    insert(
        &mut attributes,
        "mac",
        mac.iter()
            .any(|&b| b != 0xff)
            .then(|| json!(mac.iter().map(|b| format!("{b:02x}")).collect::<String>())),
    );

    Ok(attributes)
}

fn insert(attributes: &mut Attributes, name: &str, value: Option<Value>) {
    if let Some(value) = value {
        attributes.insert(name.to_string(), value);
    }
}

/// Adds the per-axis values and their magnitude, all in mG.
fn insert_acceleration(attributes: &mut Attributes, [x, y, z]: [i16; 3]) {
    if [x, y, z].contains(&i16::MIN) {
        return;
    }

    let (fx, fy, fz) = (x as f64, y as f64, z as f64);
    let total = (fx * fx + fy * fy + fz * fz).sqrt();

    insert(attributes, "acceleration", Some(json!(total)));
    insert(attributes, "acceleration_x", Some(json!(x)));
    insert(attributes, "acceleration_y", Some(json!(y)));
    insert(attributes, "acceleration_z", Some(json!(z)));
}

/// Pa offset by 50000 on the wire; reported in hPa.
fn decode_pressure(v: u16) -> f64 {
    round2((v as f64 + 50_000.0) / 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
