// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fonts registered under the Windows `Fonts` key.

#![allow(unsafe_code, reason = "the registry is only reachable through FFI")]

use std::path::PathBuf;

use windows::{
    core::{w, PCWSTR, PWSTR},
    Win32::{
        Foundation::{ERROR_NO_MORE_ITEMS, ERROR_SUCCESS},
        System::Registry::{
            RegCloseKey, RegEnumValueW, RegOpenKeyExW, HKEY, HKEY_CURRENT_USER,
            HKEY_LOCAL_MACHINE, KEY_READ, REG_EXPAND_SZ, REG_SZ,
        },
    },
};

const FONTS_KEY: PCWSTR = w!("SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Fonts");

/// Longest value name the registry allows, in UTF-16 code units.
const MAX_VALUE_NAME: usize = 16_384;

/// Longest file path read from a value, in UTF-16 code units.
const MAX_VALUE_DATA: usize = 1024;

/// Returns every registration of the machine and the current user.
///
/// Relative file names are resolved against the Windows font directory.
pub(super) fn registered_font_files() -> Vec<(String, PathBuf)> {
    let fonts_dir = std::env::var_os("WINDIR")
        .map_or_else(|| PathBuf::from("C:\\Windows"), PathBuf::from)
        .join("Fonts");
    let mut files = Vec::new();
    for root in [HKEY_LOCAL_MACHINE, HKEY_CURRENT_USER] {
        let Some(key) = FontsKey::open(root) else {
            continue;
        };
        for (name, file) in key.values() {
            let file = PathBuf::from(file);
            let path = if file.is_absolute() {
                file
            } else {
                fonts_dir.join(file)
            };
            files.push((name, path));
        }
    }
    log::debug!("{} registered font files", files.len());
    files
}

/// Open registry key, closed on drop.
struct FontsKey(HKEY);

impl FontsKey {
    fn open(root: HKEY) -> Option<Self> {
        let mut key = HKEY::default();
        // SAFETY: `FONTS_KEY` is a static terminated string and `key` is only
        // written by the call.
        let status = unsafe { RegOpenKeyExW(root, FONTS_KEY, 0, KEY_READ, &mut key) };
        if status != ERROR_SUCCESS {
            log::debug!("cannot open the fonts key: {status:?}");
            return None;
        }
        Some(Self(key))
    }

    /// Returns the string values of the key as name and data.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Both buffers are far smaller than u32::MAX."
    )]
    fn values(&self) -> Vec<(String, String)> {
        let mut values = Vec::new();
        let mut name = vec![0_u16; MAX_VALUE_NAME];
        let mut data = vec![0_u16; MAX_VALUE_DATA];
        for index in 0_u32.. {
            let mut name_len = name.len() as u32;
            let mut data_len = (data.len() * 2) as u32;
            let mut kind = 0_u32;
            // SAFETY: the lengths describe the buffers, which outlive the call.
            let status = unsafe {
                RegEnumValueW(
                    self.0,
                    index,
                    PWSTR(name.as_mut_ptr()),
                    &mut name_len,
                    None,
                    Some(core::ptr::from_mut(&mut kind)),
                    Some(data.as_mut_ptr().cast::<u8>()),
                    Some(core::ptr::from_mut(&mut data_len)),
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            // Values too long for the buffers are skipped.
            if status != ERROR_SUCCESS || (kind != REG_SZ.0 && kind != REG_EXPAND_SZ.0) {
                continue;
            }
            let name = String::from_utf16_lossy(&name[..(name_len as usize).min(name.len())]);
            let units = (data_len as usize / 2).min(data.len());
            let file = String::from_utf16_lossy(&data[..units]);
            let file = file.trim_end_matches('\0');
            if !file.is_empty() {
                values.push((name, file.to_owned()));
            }
        }
        values
    }
}

impl Drop for FontsKey {
    fn drop(&mut self) {
        // SAFETY: the key was opened by `RegOpenKeyExW` and is closed once.
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}
