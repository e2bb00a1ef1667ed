//! Sensor parameter record and its 166-byte wire layout.
//!
//! The layout is declared once, as a table of `(name, offset, type)` entries.
//! The same table generates the [`ParameterRecord`] struct, the public
//! [`LAYOUT`] schema and the encode/decode routines, so a field's offset is
//! written in exactly one place.
//!
//! Multi-byte integers are little-endian. IP and MAC arrays are copied in
//! network (raw) byte order. Bytes not covered by a field (2..=70 and 165)
//! are written as zero and ignored on decode.

use crate::error::IlidarError;
use crate::protocol::PARAMS_LEN;
use crate::types::RejectReason;
use crate::Result;
use byteorder::{ByteOrder, LittleEndian};
use std::net::Ipv4Addr;

/// How a field's bytes map to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Copied byte for byte (single bytes, IP and MAC arrays).
    Raw,
    /// One or more little-endian integers.
    LittleEndian,
}

/// One entry of the record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub encoding: Encoding,
}

/// A fixed-width value stored contiguously in the record.
pub trait WireValue: Sized {
    const WIDTH: usize;
    const ENCODING: Encoding;

    /// Read from exactly `WIDTH` bytes.
    fn read(src: &[u8]) -> Self;

    /// Write into exactly `WIDTH` bytes.
    fn write(&self, dst: &mut [u8]);
}

impl WireValue for u8 {
    const WIDTH: usize = 1;
    const ENCODING: Encoding = Encoding::Raw;

    fn read(src: &[u8]) -> Self {
        src[0]
    }

    fn write(&self, dst: &mut [u8]) {
        dst[0] = *self;
    }
}

impl WireValue for u16 {
    const WIDTH: usize = 2;
    const ENCODING: Encoding = Encoding::LittleEndian;

    fn read(src: &[u8]) -> Self {
        LittleEndian::read_u16(src)
    }

    fn write(&self, dst: &mut [u8]) {
        LittleEndian::write_u16(dst, *self);
    }
}

impl WireValue for u32 {
    const WIDTH: usize = 4;
    const ENCODING: Encoding = Encoding::LittleEndian;

    fn read(src: &[u8]) -> Self {
        LittleEndian::read_u32(src)
    }

    fn write(&self, dst: &mut [u8]) {
        LittleEndian::write_u32(dst, *self);
    }
}

impl<const N: usize> WireValue for [u8; N] {
    const WIDTH: usize = N;
    const ENCODING: Encoding = Encoding::Raw;

    fn read(src: &[u8]) -> Self {
        let mut out = [0u8; N];
        out.copy_from_slice(src);
        out
    }

    fn write(&self, dst: &mut [u8]) {
        dst.copy_from_slice(self);
    }
}

impl<const N: usize> WireValue for [u16; N] {
    const WIDTH: usize = 2 * N;
    const ENCODING: Encoding = Encoding::LittleEndian;

    fn read(src: &[u8]) -> Self {
        let mut out = [0u16; N];
        LittleEndian::read_u16_into(src, &mut out);
        out
    }

    fn write(&self, dst: &mut [u8]) {
        LittleEndian::write_u16_into(self, dst);
    }
}

fn read_field<T: WireValue>(src: &[u8], offset: usize) -> T {
    T::read(&src[offset..offset + T::WIDTH])
}

fn write_field<T: WireValue>(value: &T, dst: &mut [u8], offset: usize) {
    value.write(&mut dst[offset..offset + T::WIDTH]);
}

macro_rules! parameter_record {
    ($(
        $(#[$meta:meta])*
        $field:ident: $ty:ty = $name:literal @ $offset:literal
    ),+ $(,)?) => {
        /// Sensor configuration as exchanged with `get_params` / `set_params`.
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct ParameterRecord {
            $( $(#[$meta])* pub $field: $ty, )+
        }

        /// Byte layout of [`ParameterRecord`], in offset order.
        pub const LAYOUT: &[FieldSpec] = &[
            $( FieldSpec {
                name: $name,
                offset: $offset,
                width: <$ty as WireValue>::WIDTH,
                encoding: <$ty as WireValue>::ENCODING,
            }, )+
        ];

        impl ParameterRecord {
            /// Decode a record from a device read.
            ///
            /// Fails with `DecodeTruncated` if `src` is shorter than 166 bytes;
            /// trailing bytes past 166 are ignored.
            pub fn decode(src: &[u8]) -> Result<Self> {
                if src.len() < PARAMS_LEN {
                    return Err(IlidarError::DecodeTruncated { len: src.len() });
                }
                Ok(Self {
                    $( $field: read_field::<$ty>(src, $offset), )+
                })
            }

            /// Encode into the 166-byte wire form. Unmapped bytes are zero.
            pub fn encode(&self) -> [u8; PARAMS_LEN] {
                let mut dst = [0u8; PARAMS_LEN];
                $( write_field(&self.$field, &mut dst, $offset); )+
                dst
            }
        }
    };
}

parameter_record! {
    sensor_sn: u16 = "SensorSn" @ 0,
    capture_mode: u8 = "CaptureMode" @ 71,
    capture_row: u8 = "CaptureRow" @ 72,
    /// Shutter times per capture phase.
    capture_shutter: [u16; 5] = "CaptureShutter" @ 73,
    capture_limit: [u16; 2] = "CaptureLimit" @ 83,
    capture_period_us: u32 = "CapturePeriodUs" @ 87,
    capture_seq: u8 = "CaptureSeq" @ 91,
    data_output: u8 = "DataOutput" @ 92,
    data_baud: u32 = "DataBaud" @ 93,
    data_sensor_ip: [u8; 4] = "DataSensorIp" @ 97,
    data_dest_ip: [u8; 4] = "DataDestIp" @ 101,
    data_subnet: [u8; 4] = "DataSubnet" @ 105,
    data_gateway: [u8; 4] = "DataGateway" @ 109,
    data_port: u16 = "DataPort" @ 113,
    data_mac_addr: [u8; 6] = "DataMacAddr" @ 115,
    sync: u8 = "Sync" @ 121,
    sync_trig_delay_us: u32 = "SyncTrigDelayUs" @ 122,
    /// Illumination delay per emitter.
    sync_ill_delay_us: [u16; 15] = "SyncIllDelayUs" @ 126,
    sync_trig_trim_us: u8 = "SyncTrigTrimUs" @ 156,
    sync_ill_trim_us: u8 = "SyncIllTrimUs" @ 157,
    sync_output_delay_us: u16 = "SyncOutputDelayUs" @ 158,
    arb: u8 = "Arb" @ 160,
    arb_timeout: u32 = "ArbTimeout" @ 161,
}

impl ParameterRecord {
    pub fn sensor_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.data_sensor_ip)
    }

    pub fn dest_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.data_dest_ip)
    }

    pub fn subnet(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.data_subnet)
    }

    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.data_gateway)
    }

    /// MAC address as colon-separated hex, e.g. `00:1a:2b:3c:4d:5e`.
    pub fn mac_string(&self) -> String {
        self.data_mac_addr
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Check the fields a write must never zero out.
    ///
    /// A sensor that accepts a zero IP or MAC drops off the network and has
    /// to be recovered by hand, so such records are refused up front.
    pub fn check_writable(&self) -> std::result::Result<(), RejectReason> {
        if self.data_sensor_ip == [0; 4] {
            return Err(RejectReason::ZeroSensorIp);
        }
        if self.data_mac_addr == [0; 6] {
            return Err(RejectReason::ZeroMac);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_record() -> ParameterRecord {
        ParameterRecord {
            sensor_sn: 0x1234,
            capture_mode: 2,
            capture_row: 160,
            capture_shutter: [100, 200, 300, 400, 500],
            capture_limit: [10, 0xBEEF],
            capture_period_us: 100_000,
            capture_seq: 1,
            data_output: 3,
            data_baud: 921_600,
            data_sensor_ip: [192, 168, 5, 200],
            data_dest_ip: [192, 168, 5, 2],
            data_subnet: [255, 255, 255, 0],
            data_gateway: [192, 168, 5, 1],
            data_port: 7256,
            data_mac_addr: [0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e],
            sync: 1,
            sync_trig_delay_us: 0xDEADBEEF,
            sync_ill_delay_us: [7; 15],
            sync_trig_trim_us: 4,
            sync_ill_trim_us: 5,
            sync_output_delay_us: 0x0102,
            arb: 1,
            arb_timeout: 0x0A0B0C0D,
        }
    }

    #[test]
    fn test_layout_in_bounds_and_disjoint() {
        let mut end = 0;
        for field in LAYOUT {
            assert!(field.offset >= end, "{} overlaps previous field", field.name);
            end = field.offset + field.width;
            assert!(end <= PARAMS_LEN, "{} runs past the record", field.name);
        }
        assert_eq!(LAYOUT.len(), 23);
        assert_eq!(end, 165);
    }

    #[test]
    fn test_encode_byte_positions() {
        let bytes = sample_record().encode();
        assert_eq!(&bytes[0..2], &[0x34, 0x12]);
        assert_eq!(bytes[71], 2);
        assert_eq!(bytes[72], 160);
        assert_eq!(&bytes[73..75], &100u16.to_le_bytes());
        assert_eq!(&bytes[81..83], &500u16.to_le_bytes());
        assert_eq!(&bytes[85..87], &[0xEF, 0xBE]);
        assert_eq!(&bytes[87..91], &100_000u32.to_le_bytes());
        assert_eq!(&bytes[97..101], &[192, 168, 5, 200]);
        assert_eq!(&bytes[113..115], &7256u16.to_le_bytes());
        assert_eq!(&bytes[115..121], &[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]);
        assert_eq!(&bytes[122..126], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&bytes[158..160], &[0x02, 0x01]);
        assert_eq!(bytes[160], 1);
        assert_eq!(&bytes[161..165], &[0x0D, 0x0C, 0x0B, 0x0A]);
    }

    #[test]
    fn test_reserved_bytes_zero() {
        let bytes = sample_record().encode();
        assert!(bytes[2..71].iter().all(|&b| b == 0));
        assert_eq!(bytes[165], 0);
    }

    #[test]
    fn test_decode_ignores_reserved_bytes() {
        let mut bytes = sample_record().encode();
        bytes[2..71].fill(0xAA);
        bytes[165] = 0xFF;
        assert_eq!(ParameterRecord::decode(&bytes).unwrap(), sample_record());
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = sample_record().encode();
        match ParameterRecord::decode(&bytes[..165]) {
            Err(IlidarError::DecodeTruncated { len }) => assert_eq!(len, 165),
            other => panic!("expected DecodeTruncated, got {:?}", other),
        }
        assert!(ParameterRecord::decode(&[]).is_err());
    }

    #[test]
    fn test_clone_matches_codec_copy() {
        let original = sample_record();
        let mut copy = original.clone();
        assert_eq!(copy, ParameterRecord::decode(&original.encode()).unwrap());

        copy.data_sensor_ip[3] = 1;
        copy.capture_shutter[0] = 0;
        assert_eq!(original.data_sensor_ip, [192, 168, 5, 200]);
        assert_eq!(original.capture_shutter[0], 100);
    }

    #[test]
    fn test_accessors() {
        let r = sample_record();
        assert_eq!(r.sensor_ip(), Ipv4Addr::new(192, 168, 5, 200));
        assert_eq!(r.subnet(), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(r.mac_string(), "00:1a:2b:3c:4d:5e");
    }

    #[test]
    fn test_check_writable() {
        assert_eq!(sample_record().check_writable(), Ok(()));

        let mut r = sample_record();
        r.data_sensor_ip = [0; 4];
        r.data_mac_addr = [0; 6];
        assert_eq!(r.check_writable(), Err(RejectReason::ZeroSensorIp));

        let mut r = sample_record();
        r.data_mac_addr = [0; 6];
        assert_eq!(r.check_writable(), Err(RejectReason::ZeroMac));
    }

    fn arb_record() -> impl Strategy<Value = ParameterRecord> {
        let capture = (
            any::<u16>(),
            any::<u8>(),
            any::<u8>(),
            any::<[u16; 5]>(),
            any::<[u16; 2]>(),
            any::<u32>(),
            any::<u8>(),
        );
        let data = (
            any::<u8>(),
            any::<u32>(),
            any::<[u8; 4]>(),
            any::<[u8; 4]>(),
            any::<[u8; 4]>(),
            any::<[u8; 4]>(),
            any::<u16>(),
            any::<[u8; 6]>(),
        );
        let sync = (
            any::<u8>(),
            any::<u32>(),
            any::<[u16; 15]>(),
            any::<u8>(),
            any::<u8>(),
            any::<u16>(),
            any::<u8>(),
            any::<u32>(),
        );
        (capture, data, sync).prop_map(|(c, d, s)| ParameterRecord {
            sensor_sn: c.0,
            capture_mode: c.1,
            capture_row: c.2,
            capture_shutter: c.3,
            capture_limit: c.4,
            capture_period_us: c.5,
            capture_seq: c.6,
            data_output: d.0,
            data_baud: d.1,
            data_sensor_ip: d.2,
            data_dest_ip: d.3,
            data_subnet: d.4,
            data_gateway: d.5,
            data_port: d.6,
            data_mac_addr: d.7,
            sync: s.0,
            sync_trig_delay_us: s.1,
            sync_ill_delay_us: s.2,
            sync_trig_trim_us: s.3,
            sync_ill_trim_us: s.4,
            sync_output_delay_us: s.5,
            arb: s.6,
            arb_timeout: s.7,
        })
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(record in arb_record()) {
            let bytes = record.encode();
            prop_assert_eq!(ParameterRecord::decode(&bytes).unwrap(), record);
        }

        #[test]
        fn prop_short_input_never_decodes(len in 0usize..PARAMS_LEN) {
            let bytes = vec![0xFFu8; len];
            let is_truncated = matches!(
                ParameterRecord::decode(&bytes),
                Err(IlidarError::DecodeTruncated { .. })
            );
            prop_assert!(is_truncated);
        }
    }
}
