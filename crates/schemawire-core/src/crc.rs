//! Named CRC lookup (`crc16_modbus`, `crc16_ccitt_false`, ...).
//!
//! A CRC name is `crc<bits>_<variant>`. Only the 16-bit family is required;
//! the variant selects one of the `crc` crate's published `Algorithm<u16>`
//! constants. CRC algorithm internals (the table-driven computation itself)
//! are out of scope here — we only name and invoke them.

use crc::{Algorithm, Crc};

use crate::error::SchemaError;

/// A resolved CRC algorithm, ready to checksum bytes.
pub struct CrcAlgorithm {
    crc: Crc<u16>,
}

impl std::fmt::Debug for CrcAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrcAlgorithm").finish_non_exhaustive()
    }
}

impl CrcAlgorithm {
    /// Checksum `data`, returning the result widened to `u64` (the common
    /// shape `Value::UInt` and CRC field comparisons use).
    #[must_use]
    pub fn checksum(&self, data: &[u8]) -> u64 {
        u64::from(self.crc.checksum(data))
    }
}

/// Resolve a schema CRC name (`crc16_modbus`) to a concrete algorithm.
///
/// `field` is only used to annotate the returned error.
pub fn lookup(name: &str, field: &str) -> Result<CrcAlgorithm, SchemaError> {
    let (bits, variant) = name.split_once('_').ok_or_else(|| SchemaError::BadCrcName {
        field: field.to_string(),
        name: name.to_string(),
        reason: "expected crc<bits>_<variant>".to_string(),
    })?;

    let algorithm: &'static Algorithm<u16> = match (bits, variant) {
        ("crc16", "modbus") => &crc::CRC_16_MODBUS,
        ("crc16", "ccitt_false") => &crc::CRC_16_IBM_3740,
        ("crc16", "arc") => &crc::CRC_16_ARC,
        ("crc16", "ibm_sdlc") | ("crc16", "x_25") => &crc::CRC_16_IBM_SDLC,
        ("crc16", "kermit") => &crc::CRC_16_KERMIT,
        ("crc16", "xmodem") => &crc::CRC_16_XMODEM,
        ("crc16", "dnp") => &crc::CRC_16_DNP,
        ("crc16", "usb") => &crc::CRC_16_USB,
        ("crc16", "aug_ccitt") => &crc::CRC_16_SPI_FUJITSU,
        ("crc16", "buypass") => &crc::CRC_16_UMTS,
        ("crc16", "cdma2000") => &crc::CRC_16_CDMA2000,
        ("crc16", "dds_110") => &crc::CRC_16_DDS_110,
        ("crc16", "dect_r") => &crc::CRC_16_DECT_R,
        ("crc16", "dect_x") => &crc::CRC_16_DECT_X,
        ("crc16", "en_13757") => &crc::CRC_16_EN_13757,
        ("crc16", "genibus") => &crc::CRC_16_GENIBUS,
        ("crc16", "maxim") => &crc::CRC_16_MAXIM_DOW,
        ("crc16", "mcrf4xx") => &crc::CRC_16_MCRF4XX,
        ("crc16", "riello") => &crc::CRC_16_RIELLO,
        ("crc16", "t10_dif") => &crc::CRC_16_T10_DIF,
        ("crc16", "teledisk") => &crc::CRC_16_TELEDISK,
        ("crc16", "tms37157") => &crc::CRC_16_TMS37157,
        ("crc16", "crc_a") => &crc::CRC_16_ISO_IEC_14443_3_A,
        (bits, _) if bits != "crc16" => {
            return Err(SchemaError::BadCrcName {
                field: field.to_string(),
                name: name.to_string(),
                reason: format!("unsupported crc width {bits:?}"),
            });
        },
        _ => {
            return Err(SchemaError::BadCrcName {
                field: field.to_string(),
                name: name.to_string(),
                reason: format!("unknown crc16 variant {variant:?}"),
            });
        },
    };

    Ok(CrcAlgorithm { crc: Crc::<u16>::new(algorithm) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modbus_checksum_of_empty_is_all_ones() {
        let algo = lookup("crc16_modbus", "f").unwrap();
        assert_eq!(algo.checksum(&[]), 0xFFFF);
    }

    #[test]
    fn known_variant_names_resolve() {
        for name in [
            "crc16_arc",
            "crc16_aug_ccitt",
            "crc16_buypass",
            "crc16_ccitt_false",
            "crc16_cdma2000",
            "crc16_dds_110",
            "crc16_dect_r",
            "crc16_dect_x",
            "crc16_dnp",
            "crc16_en_13757",
            "crc16_genibus",
            "crc16_maxim",
            "crc16_mcrf4xx",
            "crc16_riello",
            "crc16_t10_dif",
            "crc16_teledisk",
            "crc16_tms37157",
            "crc16_usb",
            "crc16_crc_a",
            "crc16_kermit",
            "crc16_modbus",
            "crc16_x_25",
            "crc16_xmodem",
            "crc16_ibm_sdlc",
        ] {
            assert!(lookup(name, "f").is_ok(), "{name} should resolve");
        }
    }

    #[test]
    fn unknown_bit_width_is_rejected() {
        assert!(lookup("crc32_modbus", "f").is_err());
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(lookup("crc16_bogus", "f").is_err());
    }

    #[test]
    fn malformed_name_without_underscore_is_rejected() {
        assert!(lookup("crc16modbus", "f").is_err());
    }

    #[test]
    fn modbus_matches_known_test_vector() {
        // "123456789" is the standard CRC check-value fixture.
        let algo = lookup("crc16_modbus", "f").unwrap();
        assert_eq!(algo.checksum(b"123456789"), 0x4B37);
    }
}
