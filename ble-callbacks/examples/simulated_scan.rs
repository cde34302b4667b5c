use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Poll;
use std::thread;
use std::time::Duration;

use ble_callbacks::{
    AddressType, AdvertisementData, BluetoothUuid, Emit, Executor, Peripheral, RadioState, Value,
};
use futures_lite::future;
use tracing::info;
use tracing::metadata::LevelFilter;

fn main() -> Result<(), Box<dyn Error>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let executor = Executor::new("main");
    let stopped = Rc::new(Cell::new(false));

    let callback = Value::function({
        let stopped = stopped.clone();
        move |_, args| {
            match args.first().and_then(Value::as_str) {
                Some("discover") => info!(
                    "{} ({}): {:?}",
                    args[1].as_str().unwrap_or("(unknown)"),
                    args[6].as_f64().unwrap_or_default(),
                    args[5],
                ),
                Some("scanStop") => stopped.set(true),
                Some(name) => info!("{name}: {:?}", &args[1..]),
                None => {}
            }
        }
    });

    let mut emit = Emit::default();
    emit.wrap(&executor, Value::object::<&str>([]), callback)?;
    let emit = Arc::new(emit);

    let radio = thread::Builder::new()
        .name(String::from("radio"))
        .spawn({
            let emit = emit.clone();
            move || simulate_radio(&emit)
        })?;

    // Each callback run yields back here, so the flag is checked after every event.
    executor.block_on(future::poll_fn(|_| {
        if stopped.get() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }));

    let _ = radio.join();
    Ok(())
}

fn simulate_radio(emit: &Emit) {
    emit.radio_state(RadioState::PoweredOn);
    info!("Bluetooth is now powered on, starting scan");
    emit.scan_state(true);

    for n in 0..5u8 {
        let peripheral = Peripheral {
            address: format!("c0:ff:ee:00:00:{n:02x}"),
            address_type: AddressType::Random,
            connectable: n % 2 == 0,
            advertisement: AdvertisementData {
                local_name: Some(format!("sensor-{n}")),
                tx_power_level: Some(-4),
                service_uuids: vec![BluetoothUuid::Uuid16(btuuid::BluetoothUuid16::new(0x180f))],
                ..Default::default()
            },
        };
        emit.scan(peripheral.address.clone(), -40 - i16::from(n) * 5, &peripheral);
        thread::sleep(Duration::from_millis(100));
    }

    emit.scan_state(false);
}
