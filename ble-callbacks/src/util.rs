use btuuid::BluetoothUuid;

/// Formats a GATT UUID as lowercase hex without dashes, using the short form for 16 and 32-bit
/// UUIDs.
pub fn uuid_string(uuid: &BluetoothUuid) -> String {
    match uuid {
        BluetoothUuid::Uuid16(uuid) => format!("{:04x}", uuid.to_u16()),
        BluetoothUuid::Uuid32(uuid) => format!("{:08x}", uuid.to_u32()),
        BluetoothUuid::Uuid128(uuid) => format!("{:032x}", uuid.to_u128()),
    }
}
