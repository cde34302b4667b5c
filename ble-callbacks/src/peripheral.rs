//! The Bluetooth LE vocabulary carried by events.
//!
//! These are plain owned values. They are built by the event source on its own thread and
//! copied into each event.

use btuuid::BluetoothUuid;
use uuid::Uuid;

/// An opaque identifier for a peripheral, such as `"AA:BB:CC:DD:EE:FF"` or a platform UUID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeripheralId(String);

impl PeripheralId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeripheralId {
    fn from(id: &str) -> Self {
        PeripheralId(id.to_owned())
    }
}

impl From<String> for PeripheralId {
    fn from(id: String) -> Self {
        PeripheralId(id)
    }
}

/// Platform identifiers are rendered as lowercase hex without dashes.
impl From<Uuid> for PeripheralId {
    fn from(id: Uuid) -> Self {
        PeripheralId(id.simple().to_string())
    }
}

/// The power state of the local Bluetooth radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl RadioState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioState::Unknown => "unknown",
            RadioState::Resetting => "resetting",
            RadioState::Unsupported => "unsupported",
            RadioState::Unauthorized => "unauthorized",
            RadioState::PoweredOff => "poweredOff",
            RadioState::PoweredOn => "poweredOn",
        }
    }
}

/// How a peripheral's address was assigned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    Public,
    Random,
    #[default]
    Unknown,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Public => "public",
            AddressType::Random => "random",
            AddressType::Unknown => "unknown",
        }
    }
}

/// A peripheral as seen in one advertisement.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Peripheral {
    /// The device address, if the platform exposes it.
    pub address: String,
    pub address_type: AddressType,
    /// Set to true for connectable advertising packets
    pub connectable: bool,
    pub advertisement: AdvertisementData,
}

/// Data included in a Bluetooth advertisement or scan reponse.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdvertisementData {
    /// The (possibly shortened) local name of the device (CSS §A.1.2)
    pub local_name: Option<String>,
    /// Transmitted power level (CSS §A.1.5)
    pub tx_power_level: Option<i16>,
    /// Manufacturer specific data, company identifier included (CSS §A.1.4)
    pub manufacturer_data: Option<Vec<u8>>,
    /// Service associated data (CSS §A.1.11)
    pub service_data: Vec<(BluetoothUuid, Vec<u8>)>,
    /// Advertised GATT service UUIDs (CSS §A.1.1)
    pub service_uuids: Vec<BluetoothUuid>,
}

/// A GATT characteristic property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CharacteristicProperty {
    Broadcast,
    Read,
    WriteWithoutResponse,
    Write,
    Notify,
    Indicate,
    AuthenticatedSignedWrites,
    ExtendedProperties,
}

impl CharacteristicProperty {
    const ALL: [CharacteristicProperty; 8] = [
        CharacteristicProperty::Broadcast,
        CharacteristicProperty::Read,
        CharacteristicProperty::WriteWithoutResponse,
        CharacteristicProperty::Write,
        CharacteristicProperty::Notify,
        CharacteristicProperty::Indicate,
        CharacteristicProperty::AuthenticatedSignedWrites,
        CharacteristicProperty::ExtendedProperties,
    ];

    /// The bit for this property in the characteristic declaration (Core Spec Vol 3, Part G,
    /// §3.3.1.1).
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Decodes the properties field of a characteristic declaration, lowest bit first.
    pub fn from_bits(bits: u8) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|property| bits & property.bit() != 0)
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CharacteristicProperty::Broadcast => "broadcast",
            CharacteristicProperty::Read => "read",
            CharacteristicProperty::WriteWithoutResponse => "writeWithoutResponse",
            CharacteristicProperty::Write => "write",
            CharacteristicProperty::Notify => "notify",
            CharacteristicProperty::Indicate => "indicate",
            CharacteristicProperty::AuthenticatedSignedWrites => "authenticatedSignedWrites",
            CharacteristicProperty::ExtendedProperties => "extendedProperties",
        }
    }
}

/// A characteristic found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCharacteristic {
    pub uuid: BluetoothUuid,
    pub properties: Vec<CharacteristicProperty>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_property_bits() {
        assert_eq!(
            CharacteristicProperty::from_bits(0x12),
            [CharacteristicProperty::Read, CharacteristicProperty::Notify]
        );
        assert_eq!(CharacteristicProperty::from_bits(0xff).len(), 8);
        assert!(CharacteristicProperty::from_bits(0).is_empty());
        assert_eq!(CharacteristicProperty::ExtendedProperties.bit(), 0x80);
    }

    #[test]
    fn peripheral_id_from_platform_uuid() {
        let uuid = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
        assert_eq!(
            PeripheralId::from(uuid).as_str(),
            "123456789abcdef0123456789abcdef0"
        );
        assert_eq!(
            PeripheralId::from("AA:BB:CC:DD:EE:FF").to_string(),
            "AA:BB:CC:DD:EE:FF"
        );
    }
}
