//! Network interface handles and the IFNAMSIZ name encoding used by set
//! elements and comparisons.

use std::ffi::CString;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BuilderError, Error};

/// Encodes an interface name the way the kernel stores it: IFNAMSIZ bytes,
/// null padded.
pub fn encode_ifname(name: &str) -> Result<Vec<u8>, BuilderError> {
    if name.len() >= libc::IFNAMSIZ {
        return Err(BuilderError::InterfaceNameTooLong);
    }
    let mut encoded = vec![0u8; libc::IFNAMSIZ];
    encoded[..name.len()].copy_from_slice(name.as_bytes());
    Ok(encoded)
}

/// A resolved handle to a kernel network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub index: u32,
}

impl Interface {
    /// Looks up the interface index for a given interface name.
    pub fn by_name(name: &str) -> Result<Interface, Error> {
        let c_name =
            CString::new(name).map_err(|_| Error::UnknownInterface(name.to_string()))?;
        let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
        if index == 0 {
            return Err(Error::UnknownInterface(name.to_string()));
        }
        Ok(Interface {
            name: name.to_string(),
            index,
        })
    }
}

/// Interface details surfaced on the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub mtu: u32,
    pub mac: String,
    pub up: bool,
    pub zone: Option<String>,
}

const IFF_UP: u32 = 0x1;
const IFF_LOOPBACK: u32 = 0x8;

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// Enumerates the host's interfaces from sysfs, loopbacks excluded. The
/// `zone` column is left empty; callers fill it from the zone registry.
pub fn list_interfaces() -> io::Result<Vec<InterfaceInfo>> {
    let mut result = Vec::new();
    for entry in fs::read_dir("/sys/class/net")? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let base = entry.path();

        let flags = read_trimmed(&base.join("flags"))
            .and_then(|s| u32::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .unwrap_or(0);
        if flags & IFF_LOOPBACK != 0 {
            continue;
        }

        let mtu = read_trimmed(&base.join("mtu"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let mac = read_trimmed(&base.join("address")).unwrap_or_default();

        result.push(InterfaceInfo {
            name,
            mtu,
            mac,
            up: flags & IFF_UP != 0,
            zone: None,
        });
    }
    Ok(result)
}
