use std::sync::Arc;

use btuuid::BluetoothUuid;
use callback_bridge::{Deliver, Dispatcher, DispatcherOptions, Result, Value};
use local_executor::Executor;
use tracing::trace;

use crate::event::Event;
use crate::peripheral::{DiscoveredCharacteristic, Peripheral, PeripheralId, RadioState};

/// The name given to dispatchers created by [`Emit::wrap()`].
pub const DISPATCHER_NAME: &str = "ble-callbacks";

/// Delivers Bluetooth LE events to a single callback on the consumer thread.
///
/// Every emit method may be called from any thread. The event data is copied before the call
/// returns and converted to callback arguments on the consumer thread. The first argument is
/// always the event name (see [`Event::name()`]).
///
/// An `Emit` that has not been wrapped, or has been cleared, silently drops events.
///
/// To emit from several threads, share the `Emit` in an [`Arc`] after wrapping it.
#[derive(Default)]
pub struct Emit {
    deliver: Option<Arc<dyn Deliver>>,
}

impl std::fmt::Debug for Emit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emit")
            .field("wrapped", &self.is_wrapped())
            .finish()
    }
}

impl Emit {
    /// Creates an `Emit` that hands its events to `deliver`.
    pub fn new(deliver: Arc<dyn Deliver>) -> Self {
        Emit {
            deliver: Some(deliver),
        }
    }

    /// Binds `receiver` and `callback` on the current thread, which must own `executor`.
    ///
    /// A previously wrapped dispatcher is released and, if nothing else shares it, torn down.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InvalidArgument`](callback_bridge::ErrorKind::InvalidArgument)
    /// if `receiver` is not an object or function, or `callback` is not a function. The
    /// previous binding is kept in that case.
    pub fn wrap(&mut self, executor: &Executor, receiver: Value, callback: Value) -> Result<()> {
        let options = DispatcherOptions::new().with_name(DISPATCHER_NAME);
        let dispatcher = Dispatcher::with_options(executor, receiver, callback, options)?;
        self.deliver = Some(Arc::new(dispatcher));
        Ok(())
    }

    /// Releases the current binding. Later events are dropped.
    pub fn clear(&mut self) {
        self.deliver = None;
    }

    /// Whether events currently have somewhere to go.
    pub fn is_wrapped(&self) -> bool {
        self.deliver.is_some()
    }

    /// Submits an already built event.
    pub fn emit(&self, event: Event) {
        let Some(deliver) = &self.deliver else {
            trace!(event = event.name(), "no callback bound, dropping event");
            return;
        };

        trace!(event = event.name(), "emitting");
        deliver.deliver(Box::new(move |_| event.into_args()));
    }

    /// `stateChange`
    pub fn radio_state(&self, state: RadioState) {
        self.emit(Event::StateChange(state));
    }

    /// `scanStart` or `scanStop`
    pub fn scan_state(&self, started: bool) {
        self.emit(Event::ScanStateChange { started });
    }

    /// `discover`
    pub fn scan(&self, id: impl Into<PeripheralId>, rssi: i16, peripheral: &Peripheral) {
        self.emit(Event::Discover {
            id: id.into(),
            rssi,
            peripheral: peripheral.clone(),
        });
    }

    /// `connect`, with `error` set if the connection failed.
    pub fn connected(&self, id: impl Into<PeripheralId>, error: Option<&str>) {
        self.emit(Event::Connect {
            id: id.into(),
            error: error.map(str::to_owned),
        });
    }

    /// `disconnect`
    pub fn disconnected(&self, id: impl Into<PeripheralId>) {
        self.emit(Event::Disconnect { id: id.into() });
    }

    /// `rssiUpdate`
    pub fn rssi(&self, id: impl Into<PeripheralId>, rssi: i16) {
        self.emit(Event::RssiUpdate { id: id.into(), rssi });
    }

    /// `servicesDiscover`
    pub fn services_discovered(&self, id: impl Into<PeripheralId>, services: &[BluetoothUuid]) {
        self.emit(Event::ServicesDiscover {
            id: id.into(),
            services: services.to_vec(),
        });
    }

    /// `includedServicesDiscover`
    pub fn included_services_discovered(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        services: &[BluetoothUuid],
    ) {
        self.emit(Event::IncludedServicesDiscover {
            id: id.into(),
            service,
            services: services.to_vec(),
        });
    }

    /// `characteristicsDiscover`
    pub fn characteristics_discovered(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        characteristics: &[DiscoveredCharacteristic],
    ) {
        self.emit(Event::CharacteristicsDiscover {
            id: id.into(),
            service,
            characteristics: characteristics.to_vec(),
        });
    }

    /// `read`, for both read responses and notifications.
    pub fn read(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        data: &[u8],
        is_notification: bool,
    ) {
        self.emit(Event::Read {
            id: id.into(),
            service,
            characteristic,
            data: data.to_vec(),
            is_notification,
        });
    }

    /// `write`
    pub fn write(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
    ) {
        self.emit(Event::Write {
            id: id.into(),
            service,
            characteristic,
        });
    }

    /// `notify`, with the new notification state.
    pub fn notify(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        state: bool,
    ) {
        self.emit(Event::Notify {
            id: id.into(),
            service,
            characteristic,
            state,
        });
    }

    /// `descriptorsDiscover`
    pub fn descriptors_discovered(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        descriptors: &[BluetoothUuid],
    ) {
        self.emit(Event::DescriptorsDiscover {
            id: id.into(),
            service,
            characteristic,
            descriptors: descriptors.to_vec(),
        });
    }

    /// `valueRead`
    pub fn read_value(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        descriptor: BluetoothUuid,
        data: &[u8],
    ) {
        self.emit(Event::ValueRead {
            id: id.into(),
            service,
            characteristic,
            descriptor,
            data: data.to_vec(),
        });
    }

    /// `valueWrite`
    pub fn write_value(
        &self,
        id: impl Into<PeripheralId>,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        descriptor: BluetoothUuid,
    ) {
        self.emit(Event::ValueWrite {
            id: id.into(),
            service,
            characteristic,
            descriptor,
        });
    }

    /// `handleRead`
    pub fn read_handle(&self, id: impl Into<PeripheralId>, handle: u16, data: &[u8]) {
        self.emit(Event::HandleRead {
            id: id.into(),
            handle,
            data: data.to_vec(),
        });
    }

    /// `handleWrite`
    pub fn write_handle(&self, id: impl Into<PeripheralId>, handle: u16) {
        self.emit(Event::HandleWrite { id: id.into(), handle });
    }
}
