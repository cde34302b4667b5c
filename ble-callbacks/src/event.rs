//! The closed set of events an event source can emit.

use btuuid::BluetoothUuid;
use callback_bridge::Value;

use crate::peripheral::{
    AdvertisementData, DiscoveredCharacteristic, Peripheral, PeripheralId, RadioState,
};
use crate::util::uuid_string;

/// One event, with all of its data owned so it can cross to the consumer thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StateChange(RadioState),
    ScanStateChange {
        started: bool,
    },
    Discover {
        id: PeripheralId,
        rssi: i16,
        peripheral: Peripheral,
    },
    Connect {
        id: PeripheralId,
        error: Option<String>,
    },
    Disconnect {
        id: PeripheralId,
    },
    RssiUpdate {
        id: PeripheralId,
        rssi: i16,
    },
    ServicesDiscover {
        id: PeripheralId,
        services: Vec<BluetoothUuid>,
    },
    IncludedServicesDiscover {
        id: PeripheralId,
        service: BluetoothUuid,
        services: Vec<BluetoothUuid>,
    },
    CharacteristicsDiscover {
        id: PeripheralId,
        service: BluetoothUuid,
        characteristics: Vec<DiscoveredCharacteristic>,
    },
    Read {
        id: PeripheralId,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        data: Vec<u8>,
        is_notification: bool,
    },
    Write {
        id: PeripheralId,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
    },
    Notify {
        id: PeripheralId,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        state: bool,
    },
    DescriptorsDiscover {
        id: PeripheralId,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        descriptors: Vec<BluetoothUuid>,
    },
    ValueRead {
        id: PeripheralId,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        descriptor: BluetoothUuid,
        data: Vec<u8>,
    },
    ValueWrite {
        id: PeripheralId,
        service: BluetoothUuid,
        characteristic: BluetoothUuid,
        descriptor: BluetoothUuid,
    },
    HandleRead {
        id: PeripheralId,
        handle: u16,
        data: Vec<u8>,
    },
    HandleWrite {
        id: PeripheralId,
        handle: u16,
    },
}

impl Event {
    /// The name passed as the first callback argument.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StateChange(_) => "stateChange",
            Event::ScanStateChange { started: true } => "scanStart",
            Event::ScanStateChange { started: false } => "scanStop",
            Event::Discover { .. } => "discover",
            Event::Connect { .. } => "connect",
            Event::Disconnect { .. } => "disconnect",
            Event::RssiUpdate { .. } => "rssiUpdate",
            Event::ServicesDiscover { .. } => "servicesDiscover",
            Event::IncludedServicesDiscover { .. } => "includedServicesDiscover",
            Event::CharacteristicsDiscover { .. } => "characteristicsDiscover",
            Event::Read { .. } => "read",
            Event::Write { .. } => "write",
            Event::Notify { .. } => "notify",
            Event::DescriptorsDiscover { .. } => "descriptorsDiscover",
            Event::ValueRead { .. } => "valueRead",
            Event::ValueWrite { .. } => "valueWrite",
            Event::HandleRead { .. } => "handleRead",
            Event::HandleWrite { .. } => "handleWrite",
        }
    }

    /// The peripheral the event concerns, if any.
    pub fn peripheral_id(&self) -> Option<&PeripheralId> {
        match self {
            Event::StateChange(_) | Event::ScanStateChange { .. } => None,
            Event::Discover { id, .. }
            | Event::Connect { id, .. }
            | Event::Disconnect { id }
            | Event::RssiUpdate { id, .. }
            | Event::ServicesDiscover { id, .. }
            | Event::IncludedServicesDiscover { id, .. }
            | Event::CharacteristicsDiscover { id, .. }
            | Event::Read { id, .. }
            | Event::Write { id, .. }
            | Event::Notify { id, .. }
            | Event::DescriptorsDiscover { id, .. }
            | Event::ValueRead { id, .. }
            | Event::ValueWrite { id, .. }
            | Event::HandleRead { id, .. }
            | Event::HandleWrite { id, .. } => Some(id),
        }
    }

    /// Builds the callback argument list: the event name followed by the event's data.
    ///
    /// The values are bound to the calling thread, so this runs on the consumer.
    pub fn into_args(self) -> Vec<Value> {
        let mut args = vec![Value::from(self.name())];

        match self {
            Event::StateChange(state) => args.push(state.as_str().into()),
            Event::ScanStateChange { .. } => {}
            Event::Discover {
                id,
                rssi,
                peripheral,
            } => args.extend([
                Value::from(id),
                peripheral.address.into(),
                peripheral.address_type.as_str().into(),
                peripheral.connectable.into(),
                advertisement(peripheral.advertisement),
                rssi.into(),
            ]),
            Event::Connect { id, error } => {
                args.extend([Value::from(id), error.map_or(Value::Null, Value::from)])
            }
            Event::Disconnect { id } => args.push(Value::from(id)),
            Event::RssiUpdate { id, rssi } => args.extend([Value::from(id), rssi.into()]),
            Event::ServicesDiscover { id, services } => {
                args.extend([Value::from(id), uuid_array(&services)])
            }
            Event::IncludedServicesDiscover {
                id,
                service,
                services,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                uuid_array(&services),
            ]),
            Event::CharacteristicsDiscover {
                id,
                service,
                characteristics,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                Value::array(characteristics.iter().map(|characteristic| {
                    Value::object([
                        ("uuid", uuid_value(&characteristic.uuid)),
                        (
                            "properties",
                            Value::array(
                                characteristic
                                    .properties
                                    .iter()
                                    .map(|property| property.as_str().into()),
                            ),
                        ),
                    ])
                })),
            ]),
            Event::Read {
                id,
                service,
                characteristic,
                data,
                is_notification,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                uuid_value(&characteristic),
                Value::buffer(data),
                is_notification.into(),
            ]),
            Event::Write {
                id,
                service,
                characteristic,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                uuid_value(&characteristic),
            ]),
            Event::Notify {
                id,
                service,
                characteristic,
                state,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                uuid_value(&characteristic),
                state.into(),
            ]),
            Event::DescriptorsDiscover {
                id,
                service,
                characteristic,
                descriptors,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                uuid_value(&characteristic),
                uuid_array(&descriptors),
            ]),
            Event::ValueRead {
                id,
                service,
                characteristic,
                descriptor,
                data,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                uuid_value(&characteristic),
                uuid_value(&descriptor),
                Value::buffer(data),
            ]),
            Event::ValueWrite {
                id,
                service,
                characteristic,
                descriptor,
            } => args.extend([
                Value::from(id),
                uuid_value(&service),
                uuid_value(&characteristic),
                uuid_value(&descriptor),
            ]),
            Event::HandleRead { id, handle, data } => {
                args.extend([Value::from(id), handle.into(), Value::buffer(data)])
            }
            Event::HandleWrite { id, handle } => args.extend([Value::from(id), handle.into()]),
        }

        args
    }
}

impl From<PeripheralId> for Value {
    fn from(id: PeripheralId) -> Self {
        Value::String(id.to_string())
    }
}

fn uuid_value(uuid: &BluetoothUuid) -> Value {
    Value::String(uuid_string(uuid))
}

fn uuid_array(uuids: &[BluetoothUuid]) -> Value {
    Value::array(uuids.iter().map(uuid_value))
}

fn advertisement(data: AdvertisementData) -> Value {
    Value::object([
        ("localName", data.local_name.into()),
        ("txPowerLevel", data.tx_power_level.into()),
        (
            "manufacturerData",
            data.manufacturer_data.map_or(Value::Undefined, Value::buffer),
        ),
        (
            "serviceData",
            Value::array(data.service_data.into_iter().map(|(uuid, data)| {
                Value::object([("uuid", uuid_value(&uuid)), ("data", Value::buffer(data))])
            })),
        ),
        ("serviceUuids", uuid_array(&data.service_uuids)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripheral::{AddressType, CharacteristicProperty};

    const BATTERY: BluetoothUuid = BluetoothUuid::Uuid16(btuuid::BluetoothUuid16::new(0x180f));
    const LEVEL: BluetoothUuid = BluetoothUuid::Uuid16(btuuid::BluetoothUuid16::new(0x2a19));
    const CCCD: BluetoothUuid = BluetoothUuid::Uuid16(btuuid::BluetoothUuid16::new(0x2902));

    fn id() -> PeripheralId {
        PeripheralId::from("AA:BB:CC:DD:EE:FF")
    }

    #[test]
    fn scan_state_events_carry_only_a_name() {
        assert_eq!(
            Event::ScanStateChange { started: true }.into_args(),
            [Value::from("scanStart")]
        );
        assert_eq!(
            Event::ScanStateChange { started: false }.into_args(),
            [Value::from("scanStop")]
        );
    }

    #[test]
    fn discover_builds_advertisement_object() {
        let peripheral = Peripheral {
            address: String::from("aa:bb:cc:dd:ee:ff"),
            address_type: AddressType::Random,
            connectable: true,
            advertisement: AdvertisementData {
                local_name: Some(String::from("Sensor")),
                tx_power_level: None,
                manufacturer_data: Some(vec![0x4c, 0x00, 0x02]),
                service_data: vec![(BATTERY, vec![99])],
                service_uuids: vec![BATTERY],
            },
        };

        let args = Event::Discover {
            id: id(),
            rssi: -40,
            peripheral,
        }
        .into_args();

        assert_eq!(args.len(), 7);
        assert_eq!(args[0], Value::from("discover"));
        assert_eq!(args[1], Value::from("AA:BB:CC:DD:EE:FF"));
        assert_eq!(args[2], Value::from("aa:bb:cc:dd:ee:ff"));
        assert_eq!(args[3], Value::from("random"));
        assert_eq!(args[4], Value::from(true));
        assert_eq!(args[6], Value::from(-40i16));

        let adv = args[5].as_object().unwrap();
        assert_eq!(adv.get("localName"), Value::from("Sensor"));
        assert!(adv.get("txPowerLevel").is_undefined());
        assert_eq!(adv.get("manufacturerData"), Value::buffer([0x4cu8, 0x00, 0x02]));
        assert_eq!(adv.get("serviceUuids"), Value::array([Value::from("180f")]));

        let service_data = adv.get("serviceData");
        let entry = service_data.as_array().unwrap()[0].as_object().unwrap().clone();
        assert_eq!(entry.get("uuid"), Value::from("180f"));
        assert_eq!(entry.get("data"), Value::buffer([99u8]));
    }

    #[test]
    fn connect_error_is_null_when_absent() {
        let ok = Event::Connect {
            id: id(),
            error: None,
        };
        assert_eq!(ok.into_args()[2], Value::Null);

        let failed = Event::Connect {
            id: id(),
            error: Some(String::from("connection timeout")),
        };
        assert_eq!(failed.into_args()[2], Value::from("connection timeout"));
    }

    #[test]
    fn characteristics_carry_property_names() {
        let args = Event::CharacteristicsDiscover {
            id: id(),
            service: BATTERY,
            characteristics: vec![DiscoveredCharacteristic {
                uuid: LEVEL,
                properties: CharacteristicProperty::from_bits(0x12),
            }],
        }
        .into_args();

        assert_eq!(args[2], Value::from("180f"));
        let characteristic = args[3].as_array().unwrap()[0].as_object().unwrap().clone();
        assert_eq!(characteristic.get("uuid"), Value::from("2a19"));
        assert_eq!(
            characteristic.get("properties"),
            Value::array([Value::from("read"), Value::from("notify")])
        );
    }

    #[test]
    fn descriptor_events_name_the_full_path() {
        let args = Event::ValueRead {
            id: id(),
            service: BATTERY,
            characteristic: LEVEL,
            descriptor: CCCD,
            data: vec![1, 0],
        }
        .into_args();

        assert_eq!(
            args,
            [
                Value::from("valueRead"),
                Value::from("AA:BB:CC:DD:EE:FF"),
                Value::from("180f"),
                Value::from("2a19"),
                Value::from("2902"),
                Value::buffer([1u8, 0]),
            ]
        );
    }

    #[test]
    fn handle_events_use_numeric_handles() {
        let args = Event::HandleWrite {
            id: id(),
            handle: 0x002a,
        }
        .into_args();
        assert_eq!(
            args,
            [
                Value::from("handleWrite"),
                Value::from("AA:BB:CC:DD:EE:FF"),
                Value::from(42u16),
            ]
        );
    }

    #[test]
    fn peripheral_id_is_exposed_for_peripheral_events() {
        assert!(Event::StateChange(RadioState::PoweredOn).peripheral_id().is_none());
        assert_eq!(
            Event::Disconnect { id: id() }.peripheral_id(),
            Some(&id())
        );
    }
}
