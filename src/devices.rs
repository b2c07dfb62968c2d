//! Known device-emulation profiles
//!
//! Each profile carries the viewport, device scale factor, mobile flag, and
//! user agent that the pipeline applies through
//! `Emulation.setDeviceMetricsOverride` and `Network.setUserAgentOverride`.

use crate::error::{Error, Result};

/// A device-emulation profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceDescriptor {
    /// Profile name as accepted by the `emulate_device` option
    pub name: &'static str,
    /// Viewport width in CSS pixels
    pub width: u32,
    /// Viewport height in CSS pixels
    pub height: u32,
    /// Device scale factor
    pub scale_factor: f64,
    /// Whether the device reports as mobile
    pub mobile: bool,
    /// User agent string
    pub user_agent: &'static str,
}

const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
const IPAD_UA: &str = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
const GALAXY_UA: &str = "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

static DEVICES: &[DeviceDescriptor] = &[
    DeviceDescriptor {
        name: "iPhone SE",
        width: 375,
        height: 667,
        scale_factor: 2.0,
        mobile: true,
        user_agent: IPHONE_UA,
    },
    DeviceDescriptor {
        name: "iPhone X",
        width: 375,
        height: 812,
        scale_factor: 3.0,
        mobile: true,
        user_agent: IPHONE_UA,
    },
    DeviceDescriptor {
        name: "iPhone 13",
        width: 390,
        height: 844,
        scale_factor: 3.0,
        mobile: true,
        user_agent: IPHONE_UA,
    },
    DeviceDescriptor {
        name: "iPhone 13 Pro Max",
        width: 428,
        height: 926,
        scale_factor: 3.0,
        mobile: true,
        user_agent: IPHONE_UA,
    },
    DeviceDescriptor {
        name: "iPad",
        width: 810,
        height: 1080,
        scale_factor: 2.0,
        mobile: true,
        user_agent: IPAD_UA,
    },
    DeviceDescriptor {
        name: "iPad Pro 11",
        width: 834,
        height: 1194,
        scale_factor: 2.0,
        mobile: true,
        user_agent: IPAD_UA,
    },
    DeviceDescriptor {
        name: "Pixel 5",
        width: 393,
        height: 851,
        scale_factor: 2.75,
        mobile: true,
        user_agent: ANDROID_UA,
    },
    DeviceDescriptor {
        name: "Pixel 7",
        width: 412,
        height: 915,
        scale_factor: 2.625,
        mobile: true,
        user_agent: ANDROID_UA,
    },
    DeviceDescriptor {
        name: "Galaxy S8",
        width: 360,
        height: 740,
        scale_factor: 3.0,
        mobile: true,
        user_agent: GALAXY_UA,
    },
    DeviceDescriptor {
        name: "Galaxy S21",
        width: 360,
        height: 800,
        scale_factor: 3.0,
        mobile: true,
        user_agent: GALAXY_UA,
    },
];

/// Look up a device profile by name (case-insensitive).
///
/// Unknown names fail with [`Error::UnsupportedDevice`] before any
/// navigation happens.
pub fn lookup(name: &str) -> Result<&'static DeviceDescriptor> {
    DEVICES
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnsupportedDevice(name.to_string()))
}

/// Names of all known device profiles
pub fn names() -> Vec<&'static str> {
    DEVICES.iter().map(|d| d.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_device() {
        let device = lookup("iPhone X").unwrap();
        assert_eq!(device.width, 375);
        assert_eq!(device.height, 812);
        assert_eq!(device.scale_factor, 3.0);
        assert!(device.mobile);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("iphone x").unwrap().name, "iPhone X");
        assert_eq!(lookup("PIXEL 5").unwrap().name, "Pixel 5");
    }

    #[test]
    fn test_lookup_unknown_device() {
        let err = lookup("Nokia 3310").unwrap_err();
        assert!(matches!(err, Error::UnsupportedDevice(name) if name == "Nokia 3310"));
    }

    #[test]
    fn test_names_cover_table() {
        let names = names();
        assert!(names.contains(&"iPhone X"));
        assert!(names.contains(&"Galaxy S21"));
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_profiles_are_plausible() {
        for device in DEVICES {
            assert!(device.width > 0 && device.height > 0, "{}", device.name);
            assert!(device.scale_factor >= 1.0, "{}", device.name);
            assert!(!device.user_agent.is_empty(), "{}", device.name);
        }
    }
}
