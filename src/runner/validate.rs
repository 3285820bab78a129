//! Status validation

use crate::nfs::StatusCode;

/// Wildcard pattern accepting every status
pub const ANY_STATUS: &str = "*";

/// Check an actual status against a loadfile pattern
///
/// `*` matches everything. A pattern starting with `0x` matches only the
/// exact hex value that follows. Anything else never matches, including a
/// `0x` prefix with no digits or with trailing garbage.
pub fn check_status(expected: &str, actual: StatusCode) -> bool {
    if expected == ANY_STATUS {
        return true;
    }

    match expected.strip_prefix("0x") {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            let digits = hex.trim_start_matches('0');
            if digits.is_empty() {
                return actual == 0;
            }
            u64::from_str_radix(digits, 16).is_ok_and(|value| value == u64::from(actual))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::{nfs3, nlm4};

    const SAMPLE: [StatusCode; 12] = [
        0,
        1,
        2,
        0x11,
        0x42,
        0xff,
        10001,
        10008,
        0x7fff_ffff,
        0x8000_0000,
        0xffff_fffe,
        u32::MAX,
    ];

    #[test]
    fn test_wildcard_matches_everything() {
        for actual in SAMPLE {
            assert!(check_status("*", actual));
        }
    }

    #[test]
    fn test_hex_matches_exactly() {
        for expected in SAMPLE {
            for actual in SAMPLE {
                let short = format!("0x{:x}", expected);
                let padded = format!("0x{:08x}", expected);
                let upper = format!("0x{:X}", expected);
                assert_eq!(check_status(&short, actual), actual == expected);
                assert_eq!(check_status(&padded, actual), actual == expected);
                assert_eq!(check_status(&upper, actual), actual == expected);
            }
        }
    }

    #[test]
    fn test_other_forms_never_match() {
        let patterns = [
            "", "0", "2", "OK", "NFS3_OK", "0X0", "x0", " 0x0", "**", "0x", "0xg", "0x0 ",
            "0x1z", "-0x1",
        ];
        for pattern in patterns {
            for actual in SAMPLE {
                assert!(!check_status(pattern, actual), "{:?} matched {}", pattern, actual);
            }
        }
    }

    #[test]
    fn test_wider_than_status_never_matches() {
        assert!(!check_status("0x100000000", 0));
        assert!(!check_status("0x1ffffffff", u32::MAX));
        assert!(check_status("0x00000000ffffffff", u32::MAX));
        assert!(!check_status("0xffffffffffffffffff", u32::MAX));
    }

    #[test]
    fn test_status_universes_share_the_validator() {
        assert!(check_status("0x00000002", nfs3::ERR_NOENT));
        assert!(check_status("0x00000001", nlm4::DENIED));
        assert!(!check_status("0x00000000", nlm4::DENIED));
    }
}
